use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde_json::Number;
use std::fmt;
use std::sync::Arc;

pub type StringCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type NumberCheck = Arc<dyn Fn(&Number) -> bool + Send + Sync>;

/// A named `format` predicate handed to the validation engine.
///
/// String checkers only see string instances, number checkers only numbers;
/// other instance types pass.
#[derive(Clone)]
pub enum FormatChecker {
    String(StringCheck),
    Number(NumberCheck),
}

impl FormatChecker {
    pub fn string<F>(check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::String(Arc::new(check))
    }

    pub fn number<F>(check: F) -> Self
    where
        F: Fn(&Number) -> bool + Send + Sync + 'static,
    {
        Self::Number(Arc::new(check))
    }
}

impl fmt::Debug for FormatChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(_) => f.write_str("FormatChecker::String(..)"),
            Self::Number(_) => f.write_str("FormatChecker::Number(..)"),
        }
    }
}

pub type FormatTable = IndexMap<String, FormatChecker>;

fn fits_integer(n: &Number, min: i128, max: i128) -> bool {
    if let Some(i) = n.as_i64() {
        return (min..=max).contains(&i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return (min..=max).contains(&i128::from(u));
    }
    n.as_f64()
        .is_some_and(|f| f.fract() == 0.0 && f >= min as f64 && f <= max as f64)
}

fn is_int32(n: &Number) -> bool {
    fits_integer(n, i128::from(i32::MIN), i128::from(i32::MAX))
}

fn is_int64(n: &Number) -> bool {
    fits_integer(n, i128::from(i64::MIN), i128::from(i64::MAX))
}

fn is_float(n: &Number) -> bool {
    n.as_f64()
        .is_some_and(|f| f.is_finite() && f.abs() <= f64::from(f32::MAX))
}

fn is_byte(s: &str) -> bool {
    s.len() % 4 == 0 && STANDARD.decode(s).is_ok()
}

/// Formats OpenAPI defines on top of JSON Schema.
pub fn default_formats() -> FormatTable {
    let mut table = FormatTable::new();
    table.insert("int32".to_string(), FormatChecker::number(is_int32));
    table.insert("int64".to_string(), FormatChecker::number(is_int64));
    table.insert("float".to_string(), FormatChecker::number(is_float));
    table.insert("double".to_string(), FormatChecker::number(|_| true));
    table.insert("byte".to_string(), FormatChecker::string(is_byte));
    table.insert("binary".to_string(), FormatChecker::string(|_| true));
    table.insert("password".to_string(), FormatChecker::string(|_| true));
    table
}
