use crate::error::ContractError;
use crate::schema::SchemaNode;
use crate::spec::document::OpenApiDocument;
use openapiv3::ReferenceOr;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;

/// Only references into the same document's `components` are followed.
pub const COMPONENTS_PREFIX: &str = "#/components/";

/// Resolves same-document `$ref`s to the object they designate.
///
/// This covers OpenAPI structure references as well as schema references:
/// ```yaml
/// parameters:
///   - $ref: "#/components/parameters/PageLimit"   # ReferenceOr<Parameter>
/// schema:
///   $ref: "#/components/schemas/User"             # SchemaNode with a pointer
/// ```
/// Non-reference inputs come back borrowed and unchanged. Resolution is a pure
/// lookup; a dangling pointer is an error, never an empty result.
pub trait ResolveReference<T: Clone> {
    fn resolve<'a>(&'a self, document: &'a OpenApiDocument) -> Result<Cow<'a, T>, ContractError>;
}

/// Looks up the raw JSON node a pointer designates.
pub fn resolve_pointer<'a>(
    document: &'a OpenApiDocument,
    reference: &str,
) -> Result<&'a Value, ContractError> {
    if !reference.starts_with(COMPONENTS_PREFIX) {
        return Err(ContractError::UnsupportedReference(reference.to_string()));
    }
    // "#/components/x/y" -> "/components/x/y"
    let pointer = &reference[1..];

    document
        .raw()
        .pointer(pointer)
        .ok_or_else(|| ContractError::ReferenceNotFound(reference.to_string()))
}

/// Internal helper that implements the resolution logic
fn resolve_logic<T: DeserializeOwned>(
    document: &OpenApiDocument,
    reference: &str,
) -> Result<T, ContractError> {
    let target = resolve_pointer(document, reference)?;
    T::deserialize(target).map_err(|e| ContractError::InvalidReferenceTarget {
        reference: reference.to_string(),
        reason: e.to_string(),
    })
}

impl<T> ResolveReference<T> for ReferenceOr<T>
where
    T: DeserializeOwned + Clone,
{
    fn resolve<'a>(&'a self, document: &'a OpenApiDocument) -> Result<Cow<'a, T>, ContractError> {
        match self {
            ReferenceOr::Item(item) => Ok(Cow::Borrowed(item)),
            ReferenceOr::Reference { reference } => {
                resolve_logic(document, reference).map(Cow::Owned)
            }
        }
    }
}

impl ResolveReference<SchemaNode> for SchemaNode {
    fn resolve<'a>(
        &'a self,
        document: &'a OpenApiDocument,
    ) -> Result<Cow<'a, SchemaNode>, ContractError> {
        match &self.reference {
            None => Ok(Cow::Borrowed(self)),
            Some(reference) => resolve_logic(document, reference).map(Cow::Owned),
        }
    }
}
