use crate::formats::{default_formats, FormatChecker, FormatTable};

/// Options accepted when building an [`OpenApiValidator`](crate::OpenApiValidator).
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// Format checkers merged over (and overriding) the built-in table.
    pub formats: FormatTable,
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, name: impl Into<String>, checker: FormatChecker) -> Self {
        self.formats.insert(name.into(), checker);
        self
    }

    /// Built-in formats with the user supplied ones applied on top.
    pub fn format_table(&self) -> FormatTable {
        let mut table = default_formats();
        for (name, checker) in &self.formats {
            table.insert(name.clone(), checker.clone());
        }
        table
    }
}
