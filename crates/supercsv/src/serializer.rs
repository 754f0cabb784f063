//! Rendering a document back to SCSV text.
//!
//! Output layout:
//!
//! ```text
//! name: string
//! age: integer
//!
//! @@
//!
//! name,age
//! John,27
//! ```
//!
//! Type names are written in their canonical form, lowercase unless
//! [`TypeCase::Upper`] is requested. Fields are quoted only when a reader
//! could otherwise split or skip them.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::error::{Result, ScsvError};
use crate::parser::SEPARATOR;

/// Letter case of type names in the annotation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCase {
    #[default]
    Lower,
    Upper,
}

/// Serializer settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    pub type_case: TypeCase,
}

impl SerializeOptions {
    pub fn with_type_case(mut self, type_case: TypeCase) -> Self {
        self.type_case = type_case;
        self
    }
}

/// Serialize with default options.
pub fn serialize(doc: &Document) -> Result<String> {
    serialize_with(doc, &SerializeOptions::default())
}

/// Serialize with explicit options.
pub fn serialize_with(doc: &Document, options: &SerializeOptions) -> Result<String> {
    let schema = doc.schema();
    let mut out = String::new();

    for column in schema.columns() {
        let type_name = match options.type_case {
            TypeCase::Lower => column.column_type.to_string(),
            TypeCase::Upper => column.column_type.to_string().to_uppercase(),
        };
        out.push_str(&format!("{}: {}\n", column.name, type_name));
    }

    out.push('\n');
    out.push_str(SEPARATOR);
    out.push_str("\n\n");

    let mut records = Vec::new();
    let names: Vec<&str> = schema.names().collect();
    write_record(&mut records, &names)?;

    for row in doc.read_all() {
        let fields: Vec<String> = row.values().iter().map(|v| v.to_text()).collect();
        write_record(&mut records, &fields)?;
    }

    let records = String::from_utf8(records).map_err(|e| ScsvError::Write(e.to_string()))?;
    out.push_str(&records);

    debug!(
        "Serialized {} rows x {} columns ({} bytes)",
        doc.len(),
        schema.len(),
        out.len()
    );
    Ok(out)
}

/// Append one `\n`-terminated CSV record to `buf`.
fn write_record<S: AsRef<str>>(buf: &mut Vec<u8>, fields: &[S]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(quote_style(fields))
        .from_writer(buf);

    writer
        .write_record(fields.iter().map(|f| f.as_ref()))
        .map_err(|e| ScsvError::Write(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| ScsvError::Write(e.to_string()))
}

/// The writer quotes delimiters, quotes and line feeds on its own. A lone
/// field that is blank or reads as the separator must be quoted too, or its
/// line would be skipped or mistaken for `@@` on the way back in. Carriage
/// returns are quoted so readers that end records on `\r` keep the field
/// whole.
fn quote_style<S: AsRef<str>>(fields: &[S]) -> QuoteStyle {
    let lone_needs_quotes = match fields {
        [lone] => {
            let trimmed = lone.as_ref().trim();
            trimmed.is_empty() || trimmed == SEPARATOR
        }
        _ => false,
    };
    if lone_needs_quotes || fields.iter().any(|f| f.as_ref().contains('\r')) {
        QuoteStyle::Always
    } else {
        QuoteStyle::Necessary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RowInput;
    use crate::schema::{Column, Schema};
    use crate::types::{ColumnType, ScalarType};

    #[test]
    fn test_layout() {
        let schema = Schema::new(vec![
            Column::new("name", ColumnType::String),
            Column::new("age", ColumnType::Integer),
            Column::new("adult", ColumnType::Boolean),
        ])
        .unwrap();
        let mut doc = Document::new(schema);
        doc.insert_row(RowInput::new().with("name", "John").with("age", 27).with("adult", true))
            .unwrap();

        assert_eq!(
            serialize(&doc).unwrap(),
            "name: string\nage: integer\nadult: boolean\n\n@@\n\nname,age,adult\nJohn,27,1\n"
        );
    }

    #[test]
    fn test_upper_case_types() {
        let schema = Schema::new(vec![Column::new(
            "ids",
            ColumnType::Array(ScalarType::Integer),
        )])
        .unwrap();
        let doc = Document::new(schema);
        let options = SerializeOptions::default().with_type_case(TypeCase::Upper);
        assert!(serialize_with(&doc, &options)
            .unwrap()
            .starts_with("ids: ARRAY<INTEGER>\n"));
    }

    fn record(fields: &[&str]) -> String {
        let mut buf = Vec::new();
        write_record(&mut buf, fields).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_record_quoting() {
        assert_eq!(record(&["plain", "a,b"]), "plain,\"a,b\"\n");
        assert_eq!(record(&["say \"hi\"", "x"]), "\"say \"\"hi\"\"\",x\n");
        assert_eq!(record(&["two\nlines", "x"]), "\"two\nlines\",x\n");
        assert_eq!(record(&["", "x"]), ",x\n");
        assert_eq!(record(&["@@", "x"]), "@@,x\n");
    }

    #[test]
    fn test_lone_field_quoting() {
        assert_eq!(record(&["plain"]), "plain\n");
        assert_eq!(record(&[""]), "\"\"\n");
        assert_eq!(record(&["  "]), "\"  \"\n");
        assert_eq!(record(&["@@"]), "\"@@\"\n");
        assert_eq!(record(&[" @@ "]), "\" @@ \"\n");
    }

    #[test]
    fn test_carriage_return_forces_quotes() {
        assert_eq!(record(&["a\rb", "1"]), "\"a\rb\",\"1\"\n");
    }
}
