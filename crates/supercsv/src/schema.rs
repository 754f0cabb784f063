//! Schema: the ordered column name → type mapping from the annotation header.
//!
//! A schema is fixed once a document exists. Its column order is the order of
//! every row and of serialized output.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, ScsvError};
use crate::types::{resolve_type_name, ColumnType};

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name (case-sensitive, unique within a schema)
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Immutable, ordered set of typed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema from columns in order.
    ///
    /// Fails with [`ScsvError::SchemaSyntax`] on an empty list (`line: None`),
    /// or on an empty name, a duplicate name, or a name that cannot be written
    /// back into an annotation header (`line` = 1-based column position).
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ScsvError::empty_schema("schema declares no columns"));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            validate_name(&column.name).map_err(|msg| ScsvError::schema_syntax(idx + 1, msg))?;
            if positions.insert(column.name.clone(), idx).is_some() {
                return Err(ScsvError::schema_syntax(
                    idx + 1,
                    format!("duplicate column name '{}'", column.name),
                ));
            }
        }

        Ok(Self { columns, positions })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of a column in schema order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("column name is empty".to_string());
    }
    if name.trim() != name {
        return Err(format!("column name '{}' has surrounding whitespace", name));
    }
    if name.contains(':') || name.contains('\n') || name.contains('\r') {
        return Err(format!("column name '{}' contains ':' or a line break", name));
    }
    Ok(())
}

/// Parse annotation header lines (`name: type`) into a schema.
///
/// Blank lines are skipped. Each other line is split at its first colon and
/// both sides are trimmed. Line numbers in errors are 1-based positions in
/// `lines`.
pub fn parse_header<I, S>(lines: I) -> Result<Schema>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut columns: Vec<Column> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        let (name, type_token) = line.split_once(':').ok_or_else(|| {
            ScsvError::schema_syntax(line_no, format!("expected 'name: type', got '{}'", line))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ScsvError::schema_syntax(line_no, "column name is empty"));
        }
        if let Some(first) = seen.insert(name.to_string(), line_no) {
            return Err(ScsvError::schema_syntax(
                line_no,
                format!("duplicate column name '{}' (first declared on line {})", name, first),
            ));
        }

        let column_type = resolve_type_name(type_token)?;
        columns.push(Column::new(name, column_type));
    }

    if columns.is_empty() {
        return Err(ScsvError::empty_schema("annotation header declares no columns"));
    }

    debug!("Parsed annotation header with {} columns", columns.len());
    Schema::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarType;

    #[test]
    fn test_parse_header_in_order() {
        let schema = parse_header(["name: string", "", "  age :INT ", "adult: b", "tags: arr<i>"])
            .unwrap();

        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["name", "age", "adult", "tags"]);
        assert_eq!(schema.column_type("age"), Some(ColumnType::Integer));
        assert_eq!(schema.column_type("adult"), Some(ColumnType::Boolean));
        assert_eq!(
            schema.column_type("tags"),
            Some(ColumnType::Array(ScalarType::Integer))
        );
        assert_eq!(schema.position("adult"), Some(2));
        assert_eq!(schema.column_type("Age"), None);
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_header(["name: string", "age int"]).unwrap_err();
        assert!(matches!(err, ScsvError::SchemaSyntax { line: Some(2), .. }));
    }

    #[test]
    fn test_empty_name() {
        let err = parse_header(["  : string"]).unwrap_err();
        assert!(matches!(err, ScsvError::SchemaSyntax { line: Some(1), .. }));
    }

    #[test]
    fn test_duplicate_name() {
        let err = parse_header(["id: int", "id: string"]).unwrap_err();
        match err {
            ScsvError::SchemaSyntax { line, message } => {
                assert_eq!(line, Some(2));
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let schema = parse_header(["id: int", "ID: string"]).unwrap();
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let err = parse_header(["id: interger"]).unwrap_err();
        assert_eq!(err, ScsvError::UnknownType("interger".to_string()));
    }

    #[test]
    fn test_empty_header() {
        assert!(matches!(
            parse_header(["", "  "]),
            Err(ScsvError::SchemaSyntax { line: None, .. })
        ));
    }

    #[test]
    fn test_direct_construction_validates() {
        assert!(Schema::new(vec![Column::new("a", ColumnType::Integer)]).is_ok());
        assert!(matches!(
            Schema::new(vec![]),
            Err(ScsvError::SchemaSyntax { line: None, .. })
        ));
        assert!(Schema::new(vec![
            Column::new("a", ColumnType::Integer),
            Column::new("a", ColumnType::Float),
        ])
        .is_err());
        assert!(Schema::new(vec![Column::new(" a", ColumnType::Integer)]).is_err());
        assert!(Schema::new(vec![Column::new("a:b", ColumnType::Integer)]).is_err());
    }

    #[test]
    fn test_schema_serializes_columns() {
        let schema = parse_header(["id: int", "tags: array"]).unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "columns": [
                    {"name": "id", "type": "integer"},
                    {"name": "tags", "type": "array"},
                ]
            })
        );
    }
}
