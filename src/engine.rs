use crate::error::{ContractError, FieldError};
use crate::formats::{FormatChecker, FormatTable, NumberCheck};
use crate::schema::{walk_schema, SchemaNode};
use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::{LazyLocation, Location};
use jsonschema::{Draft, Keyword, ValidationError as EngineError, Validator};
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::sync::Arc;

/// Keyword the compiler attaches next to `format` when the format is a
/// number format, so the engine checks numbers too.
const NUMBER_FORMAT_KEYWORD: &str = "x-number-format";

/// A compiled schema. Read-only and safe to share between threads.
pub trait SchemaMatcher: Send + Sync {
    fn check(&self, instance: &Value) -> Result<(), Vec<FieldError>>;
}

/// Turns a normalized schema into a [`SchemaMatcher`].
pub trait SchemaCompiler {
    type Matcher: SchemaMatcher;

    fn compile(&self, schema: &SchemaNode) -> Result<Self::Matcher, ContractError>;
}

/// [`SchemaCompiler`] backed by the `jsonschema` crate (Draft 7, formats
/// asserted).
#[derive(Debug, Clone)]
pub struct JsonSchemaCompiler {
    formats: FormatTable,
}

/// A compiled Draft 7 validator.
pub struct JsonSchemaMatcher {
    validator: Validator,
}

impl JsonSchemaCompiler {
    pub fn new(formats: FormatTable) -> Self {
        Self { formats }
    }

    fn number_formats(&self) -> Arc<Vec<(String, NumberCheck)>> {
        Arc::new(
            self.formats
                .iter()
                .filter_map(|(name, checker)| match checker {
                    FormatChecker::Number(check) => Some((name.clone(), check.clone())),
                    FormatChecker::String(_) => None,
                })
                .collect(),
        )
    }

    /// Marks nodes whose `format` names a number format.
    fn annotate_number_formats(&self, schema: &SchemaNode) -> SchemaNode {
        let mut mark = |node: &SchemaNode| -> Result<SchemaNode, Infallible> {
            let mut node = node.clone();
            let number_format = node
                .extra
                .get("format")
                .and_then(Value::as_str)
                .filter(|name| matches!(self.formats.get(*name), Some(FormatChecker::Number(_))))
                .map(str::to_string);
            if let Some(name) = number_format {
                node.extra
                    .insert(NUMBER_FORMAT_KEYWORD.to_string(), Value::String(name));
            }
            Ok(node)
        };
        match walk_schema(schema, &mut mark) {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }
}

impl SchemaCompiler for JsonSchemaCompiler {
    type Matcher = JsonSchemaMatcher;

    fn compile(&self, schema: &SchemaNode) -> Result<JsonSchemaMatcher, ContractError> {
        let schema_json = self
            .annotate_number_formats(schema)
            .to_value()
            .map_err(|e| ContractError::SchemaCompilation(e.to_string()))?;

        let number_formats = self.number_formats();
        let options = jsonschema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(true)
            .with_keyword(
                NUMBER_FORMAT_KEYWORD,
                keyword_factory(move |_parent, value, path| {
                    number_format_keyword(&number_formats, value, path)
                }),
            );
        let options = self
            .formats
            .iter()
            .fold(options, |options, (name, checker)| match checker {
                FormatChecker::String(check) => {
                    let check = check.clone();
                    options.with_format(name.clone(), move |value: &str| check(value))
                }
                FormatChecker::Number(_) => options,
            });

        let validator = options
            .build(&schema_json)
            .map_err(|e| ContractError::SchemaCompilation(e.to_string()))?;
        Ok(JsonSchemaMatcher { validator })
    }
}

impl SchemaMatcher for JsonSchemaMatcher {
    fn check(&self, instance: &Value) -> Result<(), Vec<FieldError>> {
        if self.validator.is_valid(instance) {
            return Ok(());
        }
        let errors: Vec<FieldError> = self.validator.iter_errors(instance).map(field_error).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Pins the higher-ranked signature the engine expects from a keyword factory.
fn keyword_factory<F>(factory: F) -> F
where
    F: for<'a> Fn(&'a Map<String, Value>, &'a Value, Location) -> Result<Box<dyn Keyword>, EngineError<'a>>
        + Send
        + Sync
        + 'static,
{
    factory
}

fn number_format_keyword<'a>(
    formats: &[(String, NumberCheck)],
    value: &'a Value,
    path: Location,
) -> Result<Box<dyn Keyword>, EngineError<'a>> {
    let checker = value
        .as_str()
        .and_then(|name| formats.iter().find(|(known, _)| known == name));
    match checker {
        Some((name, check)) => Ok(Box::new(NumberFormat {
            name: name.clone(),
            check: check.clone(),
            schema_path: path,
        })),
        None => Err(EngineError::custom(
            Location::new(),
            path,
            value,
            format!("unknown number format {}", value),
        )),
    }
}

struct NumberFormat {
    name: String,
    check: NumberCheck,
    schema_path: Location,
}

impl Keyword for NumberFormat {
    fn validate<'i>(&self, instance: &'i Value, location: &LazyLocation) -> Result<(), EngineError<'i>> {
        if self.is_valid(instance) {
            return Ok(());
        }
        Err(EngineError::custom(
            self.schema_path.clone(),
            location.into(),
            instance,
            format!("{} is not a \"{}\"", instance, self.name),
        ))
    }

    fn is_valid(&self, instance: &Value) -> bool {
        match instance {
            Value::Number(n) => (self.check)(n),
            _ => true,
        }
    }
}

fn field_error(error: EngineError<'_>) -> FieldError {
    let instance_path = error.instance_path.to_string();
    let schema_path = error.schema_path.to_string();
    let (keyword, params) = keyword_and_params(&error.kind, &schema_path);
    FieldError {
        message: error.to_string(),
        instance_path,
        schema_path,
        keyword,
        params,
    }
}

fn keyword_and_params(kind: &ValidationErrorKind, schema_path: &str) -> (String, Value) {
    let keyword = schema_path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    match kind {
        ValidationErrorKind::Required { property } => {
            ("required".to_string(), json!({ "missingProperty": property }))
        }
        ValidationErrorKind::Pattern { pattern } => (keyword, json!({ "pattern": pattern })),
        ValidationErrorKind::MinLength { limit } | ValidationErrorKind::MaxLength { limit } => {
            (keyword, json!({ "limit": limit }))
        }
        ValidationErrorKind::Format { format } => (keyword, json!({ "format": format })),
        ValidationErrorKind::Custom { .. } => ("format".to_string(), json!({})),
        _ => (keyword, json!({})),
    }
}

/// Renders engine errors as one line, e.g.
/// `request.body "input" is a required property, request.query.q1 ...`.
pub fn errors_text(errors: &[FieldError], data_var: &str) -> String {
    errors
        .iter()
        .map(|error| {
            let location: String = error
                .instance_path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| format!(".{}", segment))
                .collect();
            format!("{}{} {}", data_var, location, error.message)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::default_formats;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn compiler() -> JsonSchemaCompiler {
        JsonSchemaCompiler::new(default_formats())
    }

    fn compile(compiler: &JsonSchemaCompiler, schema: Value) -> JsonSchemaMatcher {
        compiler.compile(&SchemaNode::from_value(schema).unwrap()).unwrap()
    }

    #[rstest]
    fn reports_missing_required_property(compiler: JsonSchemaCompiler) {
        let matcher = compile(
            &compiler,
            json!({"properties": {"body": {"required": ["input"]}}, "required": ["body"]}),
        );
        assert!(matcher.check(&json!({"body": {"input": "x"}})).is_ok());

        let errors = matcher.check(&json!({"body": {}})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/body");
        assert_eq!(errors[0].keyword, "required");
        assert_eq!(errors[0].params, json!({"missingProperty": "input"}));
    }

    #[rstest]
    fn keyword_is_taken_from_schema_path(compiler: JsonSchemaCompiler) {
        let matcher = compile(
            &compiler,
            json!({"properties": {"q": {"type": "string", "pattern": "^abc"}}}),
        );
        let errors = matcher.check(&json!({"q": "xyz"})).unwrap_err();
        assert_eq!(errors[0].keyword, "pattern");
        assert_eq!(errors[0].instance_path, "/q");
        assert_eq!(errors[0].params, json!({"pattern": "^abc"}));

        let errors = matcher.check(&json!({"q": 1})).unwrap_err();
        assert_eq!(errors[0].keyword, "type");
    }

    #[rstest]
    #[case(json!(123), true)]
    #[case(json!(2147483648i64), false)]
    #[case(json!(1.5), false)]
    #[case(json!("123"), true)]
    fn number_formats_are_enforced(
        compiler: JsonSchemaCompiler,
        #[case] value: Value,
        #[case] valid: bool,
    ) {
        let matcher = compile(&compiler, json!({"format": "int32"}));
        assert_eq!(matcher.check(&value).is_ok(), valid);
    }

    #[rstest]
    fn number_format_errors_are_reported_as_format(compiler: JsonSchemaCompiler) {
        let matcher = compile(
            &compiler,
            json!({"properties": {"i": {"type": "integer", "format": "int32"}}}),
        );
        let errors = matcher.check(&json!({"i": 2147483648i64})).unwrap_err();
        assert_eq!(errors[0].keyword, "format");
        assert_eq!(errors[0].instance_path, "/i");
    }

    #[rstest]
    #[case("date", json!("2015-08-02"), true)]
    #[case("date", json!("98-01-01"), false)]
    #[case("byte", json!("aGVsbG8="), true)]
    #[case("byte", json!("aGVsbG8"), false)]
    #[case("password", json!("x"), true)]
    fn string_formats_are_enforced(
        compiler: JsonSchemaCompiler,
        #[case] format: &str,
        #[case] value: Value,
        #[case] valid: bool,
    ) {
        let matcher = compile(&compiler, json!({"type": "string", "format": format}));
        assert_eq!(matcher.check(&value).is_ok(), valid);
    }

    #[test]
    fn errors_text_renders_dotted_paths() {
        let errors = vec![
            FieldError {
                instance_path: "/body".to_string(),
                schema_path: "/properties/body/required".to_string(),
                keyword: "required".to_string(),
                params: json!({"missingProperty": "input"}),
                message: "\"input\" is a required property".to_string(),
            },
            FieldError {
                instance_path: String::new(),
                schema_path: "/required".to_string(),
                keyword: "required".to_string(),
                params: json!({"missingProperty": "cookies"}),
                message: "\"cookies\" is a required property".to_string(),
            },
        ];
        assert_eq!(
            errors_text(&errors, "request"),
            "request.body \"input\" is a required property, request \"cookies\" is a required property"
        );
    }
}
