pub mod api_validator;
pub mod engine;
pub mod error;
pub mod formats;
pub mod options;
pub mod schema;
pub mod spec;
pub mod validators;

pub use api_validator::{HttpMethod, OpenApiValidator, RequestRouter, RouteOutcome};
pub use engine::{errors_text, JsonSchemaCompiler, JsonSchemaMatcher, SchemaCompiler, SchemaMatcher};
pub use error::{ContractError, FieldError, ResponseCheckError, ValidationError};
pub use formats::{default_formats, FormatChecker, FormatTable};
pub use options::ValidatorOptions;
pub use schema::{normalize_schema, walk_schema, SchemaNode};
pub use spec::{load_document, parse_document, OpenApiDocument, ResolveReference};
pub use validators::{
    build_parameter_schemas, resolve_parameters, GateOutcome, RequestGate, RequestParts,
    ResponseGate, ResponseParts,
};
