pub mod document;
pub mod loader;
pub mod reference_resolver;

pub use document::{
    json_schema, Header, MediaType, OpenApiDocument, Operation, Parameter, PathItem, RequestBody,
    Response,
};
pub use loader::{load_document, parse_document};
pub use reference_resolver::{resolve_pointer, ResolveReference};
