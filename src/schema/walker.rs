use super::model::{AdditionalProperties, SchemaItems, SchemaNode};

/// Stateful traversal hooks for [`walk_schema_with`].
///
/// `enter` maps a node before its children are walked; `leave` runs with the
/// same input node once the whole subtree below it is done.
pub trait SchemaVisitor {
    type Error;

    fn enter(&mut self, node: &SchemaNode) -> Result<SchemaNode, Self::Error>;

    fn leave(&mut self, _node: &SchemaNode) {}
}

struct MapVisitor<'f, F>(&'f mut F);

impl<E, F> SchemaVisitor for MapVisitor<'_, F>
where
    F: FnMut(&SchemaNode) -> Result<SchemaNode, E>,
{
    type Error = E;

    fn enter(&mut self, node: &SchemaNode) -> Result<SchemaNode, E> {
        (self.0)(node)
    }
}

/// Applies `mapper` to every node of the tree, pre-order, and returns the
/// transformed copy. The input tree is never modified.
///
/// Nested positions visited: `properties`, `allOf`, `anyOf`, `oneOf`,
/// `items` (single and tuple form), `not` and `additionalProperties` when it
/// holds a schema. The mapper runs before recursion, so positions introduced by
/// the mapper (e.g. a resolved `$ref`) are walked as well.
pub fn walk_schema<E, F>(schema: &SchemaNode, mapper: &mut F) -> Result<SchemaNode, E>
where
    F: FnMut(&SchemaNode) -> Result<SchemaNode, E>,
{
    walk_schema_with(schema, &mut MapVisitor(mapper))
}

/// Same traversal as [`walk_schema`], driving a [`SchemaVisitor`].
pub fn walk_schema_with<V: SchemaVisitor>(
    schema: &SchemaNode,
    visitor: &mut V,
) -> Result<SchemaNode, V::Error> {
    let mut node = visitor.enter(schema)?;

    if let Some(properties) = node.properties.as_mut() {
        for value in properties.values_mut() {
            *value = walk_schema_with(value, visitor)?;
        }
    }

    for list in [&mut node.all_of, &mut node.any_of, &mut node.one_of] {
        if let Some(schemas) = list.as_mut() {
            for schema in schemas.iter_mut() {
                *schema = walk_schema_with(schema, visitor)?;
            }
        }
    }

    if let Some(items) = node.items.as_mut() {
        match items.as_mut() {
            SchemaItems::Single(item) => *item = walk_schema_with(item, visitor)?,
            SchemaItems::Tuple(tuple) => {
                for item in tuple.iter_mut() {
                    *item = walk_schema_with(item, visitor)?;
                }
            }
        }
    }

    if let Some(not) = node.not.as_mut() {
        **not = walk_schema_with(not, visitor)?;
    }

    if let Some(AdditionalProperties::Schema(additional)) = node.additional_properties.as_mut() {
        **additional = walk_schema_with(additional, visitor)?;
    }

    visitor.leave(schema);
    Ok(node)
}
