use crate::engine::{errors_text, SchemaCompiler, SchemaMatcher};
use crate::error::{ContractError, ResponseCheckError, ValidationError};
use crate::schema::{normalize_schema, SchemaNode};
use crate::spec::{json_schema, OpenApiDocument, ResolveReference, Response};
use crate::validators::request::lowercase_keys;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

const CONTENT_TYPE: &str = "content-type";
/// Vendor extension keys (`x-...`) may sit next to status keys.
const EXTENSION_PREFIX: &str = "x-";

/// Canonical `{statusCode, body, headers}` view of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseParts {
    pub status_code: u16,
    pub body: Value,
    pub headers: Map<String, Value>,
}

impl ResponseParts {
    pub fn new(status_code: u16, body: Value, headers: Map<String, Value>) -> Self {
        Self {
            status_code,
            body,
            headers,
        }
    }

    /// Accepts `statusCode` or `status` for the code and `body` or `data`
    /// for the payload.
    pub fn from_value(response: &Value) -> Result<Self, ResponseCheckError> {
        let status_code = response
            .get("statusCode")
            .or_else(|| response.get("status"))
            .and_then(status_from_value);
        let body = response
            .get("body")
            .filter(|body| !body.is_null())
            .or_else(|| response.get("data"))
            .filter(|data| !data.is_null());
        let headers = response.get("headers").and_then(Value::as_object);

        match (status_code, body, headers) {
            (Some(status_code), Some(body), Some(headers)) => {
                Ok(Self::new(status_code, body.clone(), headers.clone()))
            }
            _ => Err(ResponseCheckError::Usage(
                "statusCode, body or header values not found from response".to_string(),
            )),
        }
    }

    fn to_instance(&self) -> Value {
        let mut instance = Map::new();
        instance.insert("body".to_string(), self.body.clone());
        instance.insert("headers".to_string(), Value::Object(lowercase_keys(&self.headers)));
        Value::Object(instance)
    }
}

fn status_from_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// How a key of an operation's `responses` map applies to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKey {
    Exact(u16),
    /// `4XX` and friends; holds the leading digit.
    Class(u16),
    Default,
}

impl StatusKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key == "default" {
            return Some(Self::Default);
        }
        let bytes = key.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        if bytes[1..].eq_ignore_ascii_case(b"XX") {
            return match bytes[0] {
                digit @ b'1'..=b'5' => Some(Self::Class(u16::from(digit - b'0'))),
                _ => None,
            };
        }
        key.parse().ok().map(Self::Exact)
    }
}

/// Compiled response checker bound to one operation.
pub struct ResponseGate<M> {
    method: String,
    path: String,
    exact: HashMap<u16, M>,
    classes: HashMap<u16, M>,
    default: Option<M>,
}

impl<M: SchemaMatcher> ResponseGate<M> {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Finds the matcher for a status: exact code, then `NXX` class, then
    /// `default`.
    fn matcher_for(&self, status_code: u16) -> Result<&M, ContractError> {
        self.exact
            .get(&status_code)
            .or_else(|| self.classes.get(&(status_code / 100)))
            .or(self.default.as_ref())
            .ok_or(ContractError::NoResponseObject(status_code))
    }

    /// Checks a response given as a JSON attribute bag.
    pub fn check(&self, response: &Value) -> Result<(), ResponseCheckError> {
        let parts = ResponseParts::from_value(response)?;
        self.check_parts(&parts)
    }

    pub fn check_parts(&self, response: &ResponseParts) -> Result<(), ResponseCheckError> {
        let matcher = self.matcher_for(response.status_code)?;
        matcher.check(&response.to_instance()).map_err(|errors| {
            log::trace!(
                "response {} of {} {} rejected with {} error(s)",
                response.status_code,
                self.method,
                self.path,
                errors.len()
            );
            let text = errors_text(&errors, "response");
            ResponseCheckError::Violation(ValidationError::new(
                format!("Error while validating response: {}", text),
                errors,
            ))
        })
    }
}

/// Combined `{body, headers}` schema of one response object.
pub fn build_response_schema(
    document: &OpenApiDocument,
    response: &Response,
) -> Result<SchemaNode, ContractError> {
    let body = match json_schema(&response.content) {
        Some(schema) => schema.resolve(document)?.into_owned(),
        None => SchemaNode::any(),
    };

    let mut header_properties = IndexMap::new();
    let mut header_required = Vec::new();
    for (name, header_ref) in &response.headers {
        let name = name.to_lowercase();
        if name == CONTENT_TYPE {
            continue;
        }
        let header = header_ref.resolve(document)?;
        let schema = header.schema.clone().unwrap_or_else(SchemaNode::any);
        header_properties.insert(name.clone(), schema);
        if header.required {
            header_required.push(name);
        }
    }

    let mut properties = IndexMap::new();
    properties.insert("body".to_string(), body);
    properties.insert(
        "headers".to_string(),
        SchemaNode::object(header_properties, header_required),
    );
    Ok(SchemaNode {
        properties: Some(properties),
        required: Some(vec!["headers".to_string(), "body".to_string()]),
        ..SchemaNode::default()
    })
}

/// Builds a response gate for `method` + `path`, compiling every declared
/// response entry up front.
pub fn build_response_gate<C: SchemaCompiler>(
    document: &OpenApiDocument,
    compiler: &C,
    method: &str,
    path: &str,
) -> Result<ResponseGate<C::Matcher>, ContractError> {
    document.path_item(path)?;
    let operation = document.operation(method, path)?;

    let mut gate = ResponseGate {
        method: method.to_string(),
        path: path.to_string(),
        exact: HashMap::new(),
        classes: HashMap::new(),
        default: None,
    };

    for (key, response_ref) in &operation.responses {
        if key.starts_with(EXTENSION_PREFIX) {
            continue;
        }
        let status = StatusKey::parse(key).ok_or_else(|| {
            ContractError::InvalidDocument(format!(
                "Unrecognized response status={} for {} {}",
                key, method, path
            ))
        })?;
        let response = response_ref.resolve(document)?;
        let schema = build_response_schema(document, &response)?;
        let matcher = compiler.compile(&normalize_schema(&schema, document)?)?;

        match status {
            StatusKey::Exact(code) => {
                gate.exact.insert(code, matcher);
            }
            StatusKey::Class(class) => {
                gate.classes.insert(class, matcher);
            }
            StatusKey::Default => gate.default = Some(matcher),
        }
    }

    log::debug!(
        "compiled response gate for {} {} ({} response entries)",
        method,
        path,
        operation.responses.len()
    );
    Ok(gate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("200", Some(StatusKey::Exact(200)))]
    #[case("3XX", Some(StatusKey::Class(3)))]
    #[case("4xx", Some(StatusKey::Class(4)))]
    #[case("default", Some(StatusKey::Default))]
    #[case("9XX", None)]
    #[case("ok", None)]
    #[case("20", None)]
    fn status_keys(#[case] key: &str, #[case] expected: Option<StatusKey>) {
        assert_eq!(StatusKey::parse(key), expected);
    }

    #[rstest]
    #[case(json!({"statusCode": 200, "body": {}, "headers": {}}), 200)]
    #[case(json!({"status": 201, "data": [], "headers": {}}), 201)]
    #[case(json!({"status": "204", "body": "", "headers": {}}), 204)]
    #[case(json!({"statusCode": 200, "body": null, "data": {"a": 1}, "headers": {}}), 200)]
    fn response_parts_accept_both_spellings(#[case] raw: Value, #[case] status: u16) {
        let parts = ResponseParts::from_value(&raw).unwrap();
        assert_eq!(parts.status_code, status);
    }

    #[rstest]
    #[case(json!({"body": {}, "headers": {}}))]
    #[case(json!({"statusCode": 200, "headers": {}}))]
    #[case(json!({"statusCode": 200, "body": null, "headers": {}}))]
    #[case(json!({"statusCode": 200, "body": null, "data": null, "headers": {}}))]
    #[case(json!({"statusCode": 200, "body": {}}))]
    #[case(json!({"statusCode": "abc", "body": {}, "headers": {}}))]
    fn unrecognizable_responses_are_usage_errors(#[case] raw: Value) {
        assert_eq!(
            ResponseParts::from_value(&raw).unwrap_err(),
            ResponseCheckError::Usage(
                "statusCode, body or header values not found from response".to_string()
            )
        );
    }

    #[test]
    fn response_schema_skips_content_type_and_lowercases_headers() {
        let document = OpenApiDocument::from_value(json!({
            "openapi": "3.0.0",
            "paths": {},
            "components": {
                "headers": {"Trace": {"required": true, "schema": {"type": "string"}}}
            }
        }))
        .unwrap();
        let response: Response = serde_json::from_value(json!({
            "headers": {
                "Content-Type": {"schema": {"type": "string"}},
                "X-Trace-Id": {"$ref": "#/components/headers/Trace"},
                "X-Optional": {}
            },
            "content": {"application/json": {"schema": {"type": "object"}}}
        }))
        .unwrap();

        let schema = build_response_schema(&document, &response).unwrap();
        assert_eq!(
            schema.to_value().unwrap(),
            json!({
                "properties": {
                    "body": {"type": "object"},
                    "headers": {
                        "type": "object",
                        "properties": {"x-trace-id": {"type": "string"}, "x-optional": {}},
                        "required": ["x-trace-id"]
                    }
                },
                "required": ["headers", "body"]
            })
        );
    }

    #[test]
    fn unrecognized_status_key_fails_construction() {
        let document = OpenApiDocument::from_value(json!({
            "openapi": "3.0.0",
            "paths": {"/x": {"get": {"responses": {"ok": {}}}}}
        }))
        .unwrap();
        let compiler = crate::engine::JsonSchemaCompiler::new(crate::formats::default_formats());
        assert!(matches!(
            build_response_gate(&document, &compiler, "get", "/x"),
            Err(ContractError::InvalidDocument(_))
        ));
    }

    #[test]
    fn null_body_falls_back_to_data() {
        let parts = ResponseParts::from_value(&json!({
            "statusCode": 200,
            "body": null,
            "data": {"a": 1},
            "headers": {}
        }))
        .unwrap();
        assert_eq!(parts.body, json!({"a": 1}));
    }

    #[test]
    fn extension_keys_next_to_status_keys_are_skipped() {
        let document = OpenApiDocument::from_value(json!({
            "openapi": "3.0.0",
            "paths": {"/x": {"get": {"responses": {
                "200": {"content": {"application/json": {"schema": {"type": "object"}}}},
                "x-note": {"description": "vendor"}
            }}}}
        }))
        .unwrap();
        let compiler = crate::engine::JsonSchemaCompiler::new(crate::formats::default_formats());
        let gate = build_response_gate(&document, &compiler, "get", "/x").unwrap();

        assert_eq!(
            gate.check(&json!({"statusCode": 200, "body": {}, "headers": {}})),
            Ok(())
        );
        assert_eq!(gate.exact.len(), 1);
        assert!(gate.classes.is_empty());
        assert!(gate.default.is_none());
    }
}
