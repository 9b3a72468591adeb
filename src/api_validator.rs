use crate::engine::{JsonSchemaCompiler, SchemaCompiler, SchemaMatcher};
use crate::error::{ContractError, ValidationError};
use crate::options::ValidatorOptions;
use crate::spec::OpenApiDocument;
use crate::validators::{
    build_request_gate, build_response_gate, RequestGate, RequestParts, ResponseGate,
};
use matchit::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP methods supported by OpenAPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    TRACE,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        Self::GET,
        Self::PUT,
        Self::POST,
        Self::DELETE,
        Self::OPTIONS,
        Self::HEAD,
        Self::PATCH,
        Self::TRACE,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::PATCH => "PATCH",
            Self::HEAD => "HEAD",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
        }
    }

    /// Key of this method inside an OpenAPI path item.
    pub fn key(&self) -> &'static str {
        match self {
            Self::GET => "get",
            Self::POST => "post",
            Self::PUT => "put",
            Self::DELETE => "delete",
            Self::PATCH => "patch",
            Self::HEAD => "head",
            Self::OPTIONS => "options",
            Self::TRACE => "trace",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::GET),
            "POST" => Ok(Self::POST),
            "PUT" => Ok(Self::PUT),
            "DELETE" => Ok(Self::DELETE),
            "PATCH" => Ok(Self::PATCH),
            "HEAD" => Ok(Self::HEAD),
            "OPTIONS" => Ok(Self::OPTIONS),
            "TRACE" => Ok(Self::TRACE),
            _ => Err(()),
        }
    }
}

/// Entry point: holds a checked document and hands out request and
/// response gates for its operations.
pub struct OpenApiValidator<C = JsonSchemaCompiler> {
    document: OpenApiDocument,
    compiler: C,
}

impl OpenApiValidator<JsonSchemaCompiler> {
    /// Parses `raw` and rejects anything that is not OpenAPI 3.0.x.
    pub fn new(raw: Value, options: ValidatorOptions) -> Result<Self, ContractError> {
        let document = OpenApiDocument::from_value(raw)?;
        Ok(Self::from_document(document, options))
    }

    pub fn from_document(document: OpenApiDocument, options: ValidatorOptions) -> Self {
        let compiler = JsonSchemaCompiler::new(options.format_table());
        Self::with_compiler(document, compiler)
    }
}

impl<C: SchemaCompiler> OpenApiValidator<C> {
    /// Uses a caller supplied schema engine.
    pub fn with_compiler(document: OpenApiDocument, compiler: C) -> Self {
        log::debug!(
            "validator ready for OpenAPI {} document with {} path(s)",
            document.version(),
            document.paths().len()
        );
        Self { document, compiler }
    }

    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }

    /// Request gate for the operation at exactly `method` + `path`.
    pub fn validate(&self, method: &str, path: &str) -> Result<RequestGate<C::Matcher>, ContractError> {
        build_request_gate(&self.document, &self.compiler, method, path)
    }

    /// Response gate for the operation at exactly `method` + `path`.
    pub fn validate_response(
        &self,
        method: &str,
        path: &str,
    ) -> Result<ResponseGate<C::Matcher>, ContractError> {
        build_response_gate(&self.document, &self.compiler, method, path)
    }

    /// Request gates for every declared operation, dispatched by runtime path.
    pub fn router(&self) -> Result<RequestRouter<C::Matcher>, ContractError> {
        RequestRouter::build(&self.document, &self.compiler)
    }
}

/// Outcome of routing a request through [`RequestRouter::route`].
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// No declared path matched; the request was not checked.
    PassThrough,
    Checked {
        template: String,
        result: Result<(), ValidationError>,
    },
}

struct PathRoute<M> {
    template: String,
    matcher: Router<()>,
    /// Matcher placeholder index to template parameter name.
    names: Vec<String>,
    gates: HashMap<HttpMethod, RequestGate<M>>,
}

/// Finds the first declared path template matching a runtime path and runs
/// that operation's request gate.
pub struct RequestRouter<M> {
    routes: Vec<PathRoute<M>>,
}

impl<M: SchemaMatcher> RequestRouter<M> {
    fn build<C>(document: &OpenApiDocument, compiler: &C) -> Result<Self, ContractError>
    where
        C: SchemaCompiler<Matcher = M>,
    {
        let mut routes = Vec::with_capacity(document.paths().len());
        for (template, item) in document.paths() {
            let (pattern, names) = to_route_pattern(template);
            let mut matcher = Router::new();
            matcher.insert(pattern.as_str(), ()).map_err(|e| {
                ContractError::InvalidDocument(format!(
                    "Failed to add route '{}': {}",
                    template, e
                ))
            })?;

            let mut gates = HashMap::new();
            for (method, _) in item.operations() {
                let gate = build_request_gate(document, compiler, method.key(), template)?;
                gates.insert(method, gate);
            }
            log::debug!("routing {} as {} ({} operation(s))", template, pattern, gates.len());

            routes.push(PathRoute {
                template: template.clone(),
                matcher,
                names,
                gates,
            });
        }
        Ok(Self { routes })
    }

    /// Checks `request` against the operation whose template matches `path`.
    ///
    /// Path parameters captured from the runtime path are added to
    /// `request.params` unless the caller already set them.
    pub fn route(
        &self,
        method: &str,
        path: &str,
        request: &RequestParts,
    ) -> Result<RouteOutcome, ContractError> {
        let parsed = HttpMethod::from_str(method)
            .map_err(|_| ContractError::InvalidMethod(method.to_string()))?;

        for route in &self.routes {
            let Ok(matched) = route.matcher.at(path) else {
                continue;
            };
            let gate = route
                .gates
                .get(&parsed)
                .ok_or_else(|| ContractError::OperationNotFound {
                    method: method.to_string(),
                    path: route.template.clone(),
                })?;

            let mut request = request.clone();
            for (placeholder, value) in matched.params.iter() {
                let Some(name) = placeholder_index(placeholder).and_then(|i| route.names.get(i)) else {
                    continue;
                };
                request
                    .params
                    .entry(name.clone())
                    .or_insert_with(|| Value::String(value.to_string()));
            }

            log::trace!("{} {} matched {}", method, path, route.template);
            return Ok(RouteOutcome::Checked {
                template: route.template.clone(),
                result: gate.check(&request),
            });
        }

        log::debug!("{} {} matched no declared path, passing through", method, path);
        Ok(RouteOutcome::PassThrough)
    }
}

/// Rewrites `/items/{id}` as `/items/{p0}` and returns the parameter names
/// in placeholder order. Each placeholder matches one path segment.
fn to_route_pattern(template: &str) -> (String, Vec<String>) {
    let mut pattern = String::with_capacity(template.len());
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        pattern.push_str(&rest[..open]);
        pattern.push_str(&format!("{{p{}}}", names.len()));
        names.push(rest[open + 1..close].to_string());
        rest = &rest[close + 1..];
    }
    pattern.push_str(rest);
    (pattern, names)
}

fn placeholder_index(placeholder: &str) -> Option<usize> {
    placeholder.strip_prefix('p')?.parse().ok()
}
