pub mod model;
pub mod normalizer;
pub mod walker;

pub use model::{AdditionalProperties, SchemaItems, SchemaNode, SchemaType};
pub use normalizer::normalize_schema;
pub use walker::{walk_schema, walk_schema_with, SchemaVisitor};
