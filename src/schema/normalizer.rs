use super::model::{SchemaItems, SchemaNode, SchemaType};
use super::walker::{walk_schema_with, SchemaVisitor};
use crate::error::ContractError;
use crate::spec::{OpenApiDocument, ResolveReference};

/// Converts an OpenAPI 3.0 schema tree into plain JSON Schema.
///
/// Every node is first resolved (references may appear at any depth), then:
/// - `type` or `items` written as a list is rejected;
/// - `nullable: true` on a single `type` becomes `[type, "null"]`;
/// - `nullable` is always dropped.
///
/// `nullable: false` adds no explicit non-null constraint; with a typed node
/// the engine rejects `null` anyway, without a type it accepts it.
///
/// References are expanded inline, so a schema reachable from itself fails
/// with [`ContractError::CircularReference`].
pub fn normalize_schema(
    schema: &SchemaNode,
    document: &OpenApiDocument,
) -> Result<SchemaNode, ContractError> {
    let mut normalizer = Normalizer {
        document,
        expanding: Vec::new(),
        pushed: Vec::new(),
    };
    walk_schema_with(schema, &mut normalizer)
}

struct Normalizer<'d> {
    document: &'d OpenApiDocument,
    /// Pointers whose targets are currently being walked.
    expanding: Vec<String>,
    /// How many pointers each entered node added to `expanding`.
    pushed: Vec<usize>,
}

impl Normalizer<'_> {
    /// Follows a chain of references to a concrete node.
    fn expand(&mut self, node: &SchemaNode) -> Result<SchemaNode, ContractError> {
        let mut current = node.clone();
        let mut pushed = 0;
        while let Some(reference) = current.reference.clone() {
            if self.expanding.contains(&reference) {
                return Err(ContractError::CircularReference(reference));
            }
            let resolved = current.resolve(self.document)?.into_owned();
            self.expanding.push(reference);
            pushed += 1;
            current = resolved;
        }
        self.pushed.push(pushed);
        Ok(current)
    }
}

impl SchemaVisitor for Normalizer<'_> {
    type Error = ContractError;

    fn enter(&mut self, node: &SchemaNode) -> Result<SchemaNode, ContractError> {
        let mut node = self.expand(node)?;

        if matches!(node.schema_type, Some(SchemaType::Multiple(_))) {
            return Err(ContractError::SchemaShape(
                "Type field in schema must not be an array".to_string(),
            ));
        }
        if matches!(node.items.as_deref(), Some(SchemaItems::Tuple(_))) {
            return Err(ContractError::SchemaShape(
                "Items field in schema must not be an array".to_string(),
            ));
        }

        if node.nullable.take() == Some(true) {
            if let Some(SchemaType::Single(primitive)) = &node.schema_type {
                node.schema_type = Some(SchemaType::Multiple(vec![
                    primitive.clone(),
                    "null".to_string(),
                ]));
            }
        }

        Ok(node)
    }

    fn leave(&mut self, _node: &SchemaNode) {
        let pushed = self.pushed.pop().unwrap_or_default();
        let keep = self.expanding.len().saturating_sub(pushed);
        self.expanding.truncate(keep);
    }
}
