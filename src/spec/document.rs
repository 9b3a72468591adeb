use crate::api_validator::HttpMethod;
use crate::error::ContractError;
use crate::schema::SchemaNode;
use indexmap::IndexMap;
use openapiv3::ReferenceOr;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

const SUPPORTED_VERSIONS: &str = "^3.0.0";

/// A parsed OpenAPI 3.0 document.
///
/// `paths` is parsed into typed path items (declaration order preserved);
/// the untouched JSON tree is kept alongside for `$ref` lookups.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    version: String,
    paths: IndexMap<String, PathItem>,
    raw: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<ReferenceOr<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, ReferenceOr<Response>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Kept as written; an unknown location is rejected when the parameter
    /// schema is built.
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub headers: IndexMap<String, ReferenceOr<Header>>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// Schema of the `application/json` media type, if declared.
pub fn json_schema(content: &IndexMap<String, MediaType>) -> Option<&SchemaNode> {
    content
        .get("application/json")
        .and_then(|media_type| media_type.schema.as_ref())
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::GET => self.get.as_ref(),
            HttpMethod::PUT => self.put.as_ref(),
            HttpMethod::POST => self.post.as_ref(),
            HttpMethod::DELETE => self.delete.as_ref(),
            HttpMethod::OPTIONS => self.options.as_ref(),
            HttpMethod::HEAD => self.head.as_ref(),
            HttpMethod::PATCH => self.patch.as_ref(),
            HttpMethod::TRACE => self.trace.as_ref(),
        }
    }

    /// Declared operations in method order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }
}

impl OpenApiDocument {
    /// Parses a document tree, rejecting anything that is not OpenAPI 3.0.x.
    pub fn from_value(raw: Value) -> Result<Self, ContractError> {
        let version = check_version(&raw)?;

        let paths_value = raw
            .get("paths")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let paths: IndexMap<String, PathItem> = serde_json::from_value(paths_value)
            .map_err(|e| ContractError::InvalidDocument(format!("Failed to parse paths: {}", e)))?;

        Ok(Self {
            version,
            paths,
            raw,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn paths(&self) -> &IndexMap<String, PathItem> {
        &self.paths
    }

    /// Exact-key lookup of a path item.
    pub fn path_item(&self, path: &str) -> Result<&PathItem, ContractError> {
        self.paths
            .get(path)
            .ok_or_else(|| ContractError::PathNotFound(path.to_string()))
    }

    /// Exact-key lookup of `paths[path][method]`.
    pub fn operation(&self, method: &str, path: &str) -> Result<&Operation, ContractError> {
        let parsed = HttpMethod::from_str(method)
            .map_err(|_| ContractError::InvalidMethod(method.to_string()))?;
        self.paths
            .get(path)
            .and_then(|item| item.operation(parsed))
            .ok_or_else(|| ContractError::OperationNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }
}

fn check_version(raw: &Value) -> Result<String, ContractError> {
    let declared = raw.get("openapi").and_then(Value::as_str);
    let Some(declared) = declared else {
        let legacy = raw
            .get("swagger")
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_else(|| "undefined".to_string());
        return Err(ContractError::UnsupportedVersion(legacy));
    };

    let requirement = VersionReq::parse(SUPPORTED_VERSIONS)
        .map_err(|e| ContractError::InvalidDocument(e.to_string()))?;
    match Version::parse(declared) {
        Ok(version) if requirement.matches(&version) => Ok(declared.to_string()),
        _ => Err(ContractError::UnsupportedVersion(declared.to_string())),
    }
}
