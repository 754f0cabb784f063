//! Error types for SCSV parsing, casting and row mutation.

use thiserror::Error;

/// SCSV operation result type.
pub type Result<T> = std::result::Result<T, ScsvError>;

/// Every failure the core can report.
///
/// Nothing is recovered locally: a parse either yields a complete document or
/// one of these, and a failed mutation leaves the document untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScsvError {
    /// A type token matches no known type name or alias
    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    /// Malformed annotation header line, or a schema with no columns
    /// (`line` is `None` when no single line is at fault)
    #[error("Schema syntax error{}: {message}", line_suffix(.line))]
    SchemaSyntax {
        line: Option<usize>,
        message: String,
    },

    /// The `@@` separator is absent or appears more than once
    #[error("Header separator \"@@\" {0}")]
    MissingSeparator(String),

    /// Data header column set differs from the schema column set
    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),

    /// Wrong number of fields in a data line, or wrong column set in a row update
    #[error("Row arity error{}: {message}", line_suffix(.line))]
    RowArity { line: Option<usize>, message: String },

    /// Text cannot be cast to the column's declared type
    #[error(
        "Cannot cast '{value}' to {expected}{}: {reason}",
        context_suffix(.column, .line)
    )]
    TypeCast {
        value: String,
        expected: String,
        reason: String,
        column: Option<String>,
        line: Option<usize>,
    },

    /// An already-typed value does not match the column's declared type
    #[error("Type mismatch in column '{column}': expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: String,
        got: String,
    },

    /// Row index outside `[0, len)`
    #[error("Row index {index} out of range (rows: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Column name not present in the schema
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// The CSV writer rejected a record while serializing
    #[error("Failed to write record: {0}")]
    Write(String),
}

impl ScsvError {
    /// Create a schema syntax error for a 1-based header line.
    pub fn schema_syntax(line: usize, message: impl Into<String>) -> Self {
        Self::SchemaSyntax {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Create a schema syntax error for a schema without columns.
    pub fn empty_schema(message: impl Into<String>) -> Self {
        Self::SchemaSyntax {
            line: None,
            message: message.into(),
        }
    }

    /// Create a column mismatch error.
    pub fn column_mismatch(message: impl Into<String>) -> Self {
        Self::ColumnMismatch(message.into())
    }

    /// Create a row arity error without line context.
    pub fn row_arity(message: impl Into<String>) -> Self {
        Self::RowArity {
            line: None,
            message: message.into(),
        }
    }

    /// Create a cast error without column or line context.
    pub fn type_cast(
        value: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeCast {
            value: value.into(),
            expected: expected.into(),
            reason: reason.into(),
            column: None,
            line: None,
        }
    }

    /// Attach the column name to cast and mismatch errors. Other variants
    /// pass through.
    pub fn with_column(mut self, name: &str) -> Self {
        match &mut self {
            Self::TypeCast { column, .. } => *column = Some(name.to_string()),
            Self::TypeMismatch { column, .. } => *column = name.to_string(),
            _ => {}
        }
        self
    }

    /// Attach a 1-based source line to cast and arity errors.
    pub fn with_line(mut self, number: usize) -> Self {
        match &mut self {
            Self::TypeCast { line, .. } | Self::RowArity { line, .. } => *line = Some(number),
            _ => {}
        }
        self
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" on line {}", line),
        None => String::new(),
    }
}

fn context_suffix(column: &Option<String>, line: &Option<usize>) -> String {
    let mut suffix = String::new();
    if let Some(column) = column {
        suffix.push_str(&format!(" in column '{}'", column));
    }
    suffix.push_str(&line_suffix(line));
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_cast_display_with_context() {
        let err = ScsvError::type_cast("twelve", "integer", "invalid digit")
            .with_column("age")
            .with_line(7);

        let msg = err.to_string();
        assert!(msg.contains("'twelve'"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("column 'age'"));
        assert!(msg.contains("line 7"));
    }

    #[test]
    fn test_with_line_ignores_unrelated_variants() {
        let err = ScsvError::UnknownColumn("x".to_string()).with_line(3);
        assert_eq!(err, ScsvError::UnknownColumn("x".to_string()));
    }

    #[test]
    fn test_schema_syntax_display() {
        assert_eq!(
            ScsvError::schema_syntax(2, "column name is empty").to_string(),
            "Schema syntax error on line 2: column name is empty"
        );
        assert_eq!(
            ScsvError::empty_schema("schema declares no columns").to_string(),
            "Schema syntax error: schema declares no columns"
        );
    }

    #[test]
    fn test_row_arity_display() {
        let err = ScsvError::row_arity("expected 3 fields, got 2").with_line(5);
        assert_eq!(
            err.to_string(),
            "Row arity error on line 5: expected 3 fields, got 2"
        );
    }
}
