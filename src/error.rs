use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Configuration errors. All of these surface while a validator or gate is
/// being built, never while a request is being checked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error("Unsupported OpenAPI / Swagger version={0}")]
    UnsupportedVersion(String),

    #[error("Invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    #[error("Not a valid method={0}")]
    InvalidMethod(String),

    #[error("Path={0} not found from OpenAPI document")]
    PathNotFound(String),

    #[error("Path={path} with method={method} not found from OpenAPI document")]
    OperationNotFound { method: String, path: String },

    #[error("Unsupported $ref={0}")]
    UnsupportedReference(String),

    #[error("Object not found with $ref={0}")]
    ReferenceNotFound(String),

    #[error("Circular $ref={0}")]
    CircularReference(String),

    #[error("Object with $ref={reference} has an unexpected shape: {reason}")]
    InvalidReferenceTarget { reference: String, reason: String },

    #[error("{0}")]
    SchemaShape(String),

    #[error("Unrecognized parameter location={0}")]
    UnrecognizedLocation(String),

    #[error("No response object found with statusCode={0}")]
    NoResponseObject(u16),

    #[error("Failed to compile JSON schema: {0}")]
    SchemaCompilation(String),

    #[error("Failed to load OpenAPI document: {0}")]
    Load(String),
}

/// One failing field as reported by the validation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// JSON pointer into the validated request/response, e.g. `/body/input`.
    pub instance_path: String,
    /// JSON pointer into the compiled schema.
    pub schema_path: String,
    /// The violated keyword, e.g. `required` or `pattern`.
    pub keyword: String,
    /// Keyword specific details, e.g. `{"missingProperty": "input"}`.
    pub params: Value,
    pub message: String,
}

/// A request or response that does not conform to its contract.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub data: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, data: Vec<FieldError>) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    /// HTTP status classification of a contract violation.
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// Failure modes of a response gate invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseCheckError {
    /// The response object itself could not be understood.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Lookup(#[from] ContractError),

    #[error(transparent)]
    Violation(#[from] ValidationError),
}
