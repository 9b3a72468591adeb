use crate::engine::{errors_text, SchemaCompiler, SchemaMatcher};
use crate::error::{ContractError, ValidationError};
use crate::schema::{normalize_schema, SchemaNode};
use crate::spec::{json_schema, OpenApiDocument, ResolveReference};
use crate::validators::parameter::{build_parameter_schemas, resolve_parameters};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The parts of an HTTP request a gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub query: Map<String, Value>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_cookies: Option<Map<String, Value>>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cookies
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_signed_cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.signed_cookies
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Signed cookies merged over plain ones. `None` when neither map exists.
    pub fn merged_cookies(&self) -> Option<Map<String, Value>> {
        match (&self.cookies, &self.signed_cookies) {
            (None, None) => None,
            (plain, signed) => {
                let mut merged = plain.clone().unwrap_or_default();
                if let Some(signed) = signed {
                    merged.extend(signed.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                Some(merged)
            }
        }
    }

    /// The JSON object the compiled request schema is checked against.
    /// Header names are lower-cased to match the schema.
    pub fn to_instance(&self) -> Value {
        let mut instance = Map::new();
        if let Some(body) = &self.body {
            instance.insert("body".to_string(), body.clone());
        }
        instance.insert("query".to_string(), Value::Object(self.query.clone()));
        instance.insert("headers".to_string(), Value::Object(lowercase_keys(&self.headers)));
        instance.insert("params".to_string(), Value::Object(self.params.clone()));
        if let Some(cookies) = self.merged_cookies() {
            instance.insert("cookies".to_string(), Value::Object(cookies));
        }
        Value::Object(instance)
    }
}

pub(crate) fn lowercase_keys(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(name, value)| (name.to_lowercase(), value.clone()))
        .collect()
}

/// Result of running a request through a gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Advance,
    Reject(ValidationError),
}

/// Compiled request checker bound to one operation.
pub struct RequestGate<M> {
    method: String,
    path: String,
    matcher: M,
}

impl<M: SchemaMatcher> RequestGate<M> {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checks a request against the operation's contract.
    pub fn check(&self, request: &RequestParts) -> Result<(), ValidationError> {
        match self.matcher.check(&request.to_instance()) {
            Ok(()) => {
                log::trace!("request to {} {} conforms", self.method, self.path);
                Ok(())
            }
            Err(errors) => {
                log::trace!(
                    "request to {} {} rejected with {} error(s)",
                    self.method,
                    self.path,
                    errors.len()
                );
                let text = errors_text(&errors, "request");
                Err(ValidationError::new(
                    format!("Error while validating request: {}", text),
                    errors,
                ))
            }
        }
    }

    /// Same as [`check`](Self::check), expressed as an advance/reject signal.
    pub fn gate(&self, request: &RequestParts) -> GateOutcome {
        match self.check(request) {
            Ok(()) => GateOutcome::Advance,
            Err(err) => GateOutcome::Reject(err),
        }
    }
}

/// Assembles the combined request schema of an operation (before
/// normalization).
pub fn build_request_schema(
    document: &OpenApiDocument,
    method: &str,
    path: &str,
) -> Result<SchemaNode, ContractError> {
    let path_item = document.path_item(path)?;
    let operation = document.operation(method, path)?;

    let (body_schema, body_required) = match &operation.request_body {
        Some(body_ref) => {
            let body = body_ref.resolve(document)?;
            let schema = match json_schema(&body.content) {
                Some(schema) => schema.resolve(document)?.into_owned(),
                None => SchemaNode::any(),
            };
            (schema, body.required)
        }
        None => (SchemaNode::any(), false),
    };

    let parameters = resolve_parameters(document, &path_item.parameters, &operation.parameters)?;
    let parameter_schemas = build_parameter_schemas(&parameters)?;

    let mut properties = IndexMap::new();
    properties.insert("body".to_string(), body_schema);
    let mut required = Vec::new();
    for (field, schema) in parameter_schemas.fields() {
        properties.insert(field.to_string(), schema.clone());
        required.push(field.to_string());
    }
    if body_required {
        required.push("body".to_string());
    }

    Ok(SchemaNode {
        properties: Some(properties),
        required: Some(required),
        ..SchemaNode::default()
    })
}

/// Builds a request gate for `method` + `path`. All lookups, normalization
/// and compilation happen here; the gate itself only runs the matcher.
pub fn build_request_gate<C: SchemaCompiler>(
    document: &OpenApiDocument,
    compiler: &C,
    method: &str,
    path: &str,
) -> Result<RequestGate<C::Matcher>, ContractError> {
    let schema = build_request_schema(document, method, path)?;
    let normalized = normalize_schema(&schema, document)?;
    let matcher = compiler.compile(&normalized)?;
    log::debug!("compiled request gate for {} {}", method, path);

    Ok(RequestGate {
        method: method.to_string(),
        path: path.to_string(),
        matcher,
    })
}
