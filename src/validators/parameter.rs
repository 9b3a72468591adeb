use crate::error::ContractError;
use crate::schema::SchemaNode;
use crate::spec::{OpenApiDocument, Parameter, ResolveReference};
use indexmap::IndexMap;
use openapiv3::ReferenceOr;
use std::str::FromStr;

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    /// Field of the request attribute bag holding this location's values.
    pub fn request_field(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "headers",
            Self::Path => "params",
            Self::Cookie => "cookies",
        }
    }
}

impl FromStr for ParameterLocation {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "path" => Ok(Self::Path),
            "cookie" => Ok(Self::Cookie),
            other => Err(ContractError::UnrecognizedLocation(other.to_string())),
        }
    }
}

/// Object schemas for every parameter bucket of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchemas {
    /// Path parameters (e.g., /users/{id})
    pub params: SchemaNode,
    /// Query parameters (e.g., ?page=1&limit=10)
    pub query: SchemaNode,
    /// Header parameters, keyed by lower-cased name
    pub headers: SchemaNode,
    pub cookies: SchemaNode,
}

impl Default for ParameterSchemas {
    fn default() -> Self {
        Self {
            params: SchemaNode::object(IndexMap::new(), Vec::new()),
            query: SchemaNode::object(IndexMap::new(), Vec::new()),
            headers: SchemaNode::object(IndexMap::new(), Vec::new()),
            cookies: SchemaNode::object(IndexMap::new(), Vec::new()),
        }
    }
}

impl ParameterSchemas {
    fn bucket_mut(&mut self, location: ParameterLocation) -> &mut SchemaNode {
        match location {
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.headers,
            ParameterLocation::Path => &mut self.params,
            ParameterLocation::Cookie => &mut self.cookies,
        }
    }

    fn bucket(&self, location: ParameterLocation) -> &SchemaNode {
        match location {
            ParameterLocation::Query => &self.query,
            ParameterLocation::Header => &self.headers,
            ParameterLocation::Path => &self.params,
            ParameterLocation::Cookie => &self.cookies,
        }
    }

    /// True when at least one cookie parameter was declared.
    pub fn has_cookies(&self) -> bool {
        self.cookies
            .properties
            .as_ref()
            .is_some_and(|properties| !properties.is_empty())
    }

    /// Iterates `(request field, schema)` pairs; the cookie bucket is only
    /// included when cookie parameters exist.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &SchemaNode)> {
        let cookies = self.has_cookies().then_some(ParameterLocation::Cookie);
        [
            ParameterLocation::Query,
            ParameterLocation::Header,
            ParameterLocation::Path,
        ]
        .into_iter()
        .chain(cookies)
        .map(move |location| (location.request_field(), self.bucket(location)))
    }
}

/// Merges path-level and operation-level parameters into one list.
///
/// Parameters are keyed by name; an operation-level parameter replaces a
/// path-level one of the same name outright.
pub fn resolve_parameters(
    document: &OpenApiDocument,
    path_parameters: &[ReferenceOr<Parameter>],
    operation_parameters: &[ReferenceOr<Parameter>],
) -> Result<Vec<Parameter>, ContractError> {
    let mut by_name: IndexMap<String, Parameter> = IndexMap::new();
    for parameter_ref in path_parameters.iter().chain(operation_parameters) {
        let parameter = parameter_ref.resolve(document)?.into_owned();
        by_name.insert(parameter.name.clone(), parameter);
    }
    Ok(by_name.into_values().collect())
}

/// Groups parameters by location into one object schema per bucket.
///
/// Header names are lower-cased; other locations keep their case. Required
/// names are appended in declaration order.
pub fn build_parameter_schemas(parameters: &[Parameter]) -> Result<ParameterSchemas, ContractError> {
    let mut schemas = ParameterSchemas::default();

    for parameter in parameters {
        let location = ParameterLocation::from_str(&parameter.location)?;
        let name = match location {
            ParameterLocation::Header => parameter.name.to_lowercase(),
            _ => parameter.name.clone(),
        };
        let schema = parameter.schema.clone().unwrap_or_else(SchemaNode::any);

        let bucket = schemas.bucket_mut(location);
        bucket
            .properties
            .get_or_insert_with(IndexMap::new)
            .insert(name.clone(), schema);
        if parameter.required {
            bucket.required.get_or_insert_with(Vec::new).push(name);
        }
    }

    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn parameter(name: &str, location: &str, required: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            location: location.to_string(),
            required,
            schema: Some(SchemaNode::from_value(json!({"type": "string"})).unwrap()),
        }
    }

    fn document() -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": "3.0.0",
            "paths": {},
            "components": {
                "parameters": {
                    "Limit": {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn header_names_are_lowercased() {
        let schemas = build_parameter_schemas(&[parameter("X-Param", "header", true)]).unwrap();
        assert_eq!(
            schemas.headers.to_value().unwrap(),
            json!({
                "type": "object",
                "properties": {"x-param": {"type": "string"}},
                "required": ["x-param"]
            })
        );
    }

    #[test]
    fn other_locations_keep_case() {
        let schemas = build_parameter_schemas(&[
            parameter("Q", "query", false),
            parameter("Id", "path", true),
            parameter("Session", "cookie", true),
        ])
        .unwrap();
        assert!(schemas.query.properties.as_ref().unwrap().contains_key("Q"));
        assert_eq!(schemas.query.required, None);
        assert_eq!(schemas.params.required, Some(vec!["Id".to_string()]));
        assert_eq!(schemas.cookies.required, Some(vec!["Session".to_string()]));
    }

    #[test]
    fn parameters_in_one_bucket_are_merged() {
        let schemas = build_parameter_schemas(&[
            parameter("q1", "query", true),
            parameter("q2", "query", false),
            parameter("q3", "query", true),
        ])
        .unwrap();
        let keys: Vec<&String> = schemas.query.properties.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["q1", "q2", "q3"]);
        assert_eq!(
            schemas.query.required,
            Some(vec!["q1".to_string(), "q3".to_string()])
        );
    }

    #[test]
    fn missing_schema_defaults_to_any() {
        let mut bare = parameter("free", "query", false);
        bare.schema = None;
        let schemas = build_parameter_schemas(&[bare]).unwrap();
        assert_eq!(schemas.query.properties.unwrap()["free"], SchemaNode::any());
    }

    #[rstest]
    #[case("invalid")]
    #[case("body")]
    #[case("Query")]
    fn unknown_location_is_rejected(#[case] location: &str) {
        assert_eq!(
            build_parameter_schemas(&[parameter("p", location, false)]).unwrap_err(),
            ContractError::UnrecognizedLocation(location.to_string())
        );
    }

    #[test]
    fn cookie_bucket_only_reported_when_declared() {
        let without = build_parameter_schemas(&[parameter("q", "query", false)]).unwrap();
        assert!(!without.has_cookies());
        let fields: Vec<&str> = without.fields().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["query", "headers", "params"]);

        let with = build_parameter_schemas(&[parameter("session", "cookie", true)]).unwrap();
        assert!(with.has_cookies());
        assert_eq!(with.fields().count(), 4);
    }

    #[test]
    fn fields_carry_the_bucket_of_their_location() {
        let schemas = build_parameter_schemas(&[
            parameter("X-Trace", "header", true),
            parameter("session", "cookie", false),
        ])
        .unwrap();
        let fields: IndexMap<&str, &SchemaNode> = schemas.fields().collect();
        assert_eq!(
            fields.keys().copied().collect::<Vec<_>>(),
            vec!["query", "headers", "params", "cookies"]
        );
        assert_eq!(fields["headers"], &schemas.headers);
        assert_eq!(fields["cookies"], &schemas.cookies);
        assert!(fields["headers"]
            .properties
            .as_ref()
            .unwrap()
            .contains_key("x-trace"));
    }

    #[rstest]
    #[case(ParameterLocation::Query, "query")]
    #[case(ParameterLocation::Header, "headers")]
    #[case(ParameterLocation::Path, "params")]
    #[case(ParameterLocation::Cookie, "cookies")]
    fn request_field_names(#[case] location: ParameterLocation, #[case] field: &str) {
        assert_eq!(location.request_field(), field);
    }

    #[test]
    fn operation_parameter_replaces_path_parameter() {
        let doc = document();
        let path_level = vec![
            ReferenceOr::Item(Parameter {
                name: "foo".to_string(),
                location: "query".to_string(),
                required: true,
                schema: Some(SchemaNode::from_value(json!({"type": "string", "minLength": 3})).unwrap()),
            }),
            ReferenceOr::Item(parameter("bar", "header", false)),
        ];
        let operation_level = vec![ReferenceOr::Item(Parameter {
            name: "foo".to_string(),
            location: "query".to_string(),
            required: false,
            schema: Some(SchemaNode::from_value(json!({"type": "integer"})).unwrap()),
        })];

        let resolved = resolve_parameters(&doc, &path_level, &operation_level).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0], match &operation_level[0] {
            ReferenceOr::Item(item) => item.clone(),
            ReferenceOr::Reference { .. } => unreachable!(),
        });
        assert_eq!(resolved[1].name, "bar");
    }

    #[test]
    fn referenced_parameters_are_resolved() {
        let doc = document();
        let operation_level = vec![ReferenceOr::Reference {
            reference: "#/components/parameters/Limit".to_string(),
        }];
        let resolved = resolve_parameters(&doc, &[], &operation_level).unwrap();
        assert_eq!(resolved[0].name, "limit");
        assert_eq!(resolved[0].location, "query");
    }
}
