//! Document parsing: SCSV text → [`Document`].
//!
//! 1. Split at the one line that reads `@@` (after trimming).
//! 2. Parse the lines above it as the annotation header.
//! 3. The first non-blank record below it is the data header, a permutation
//!    of the schema's column names.
//! 4. Every further non-blank record is a row. Fields are cast with the type
//!    of their data-header column and stored in schema order.
//!
//! Records are read with the `csv` crate, so double-quoted fields may contain
//! commas, doubled quotes and line breaks. Parsing is all-or-nothing.

use csv::{ReaderBuilder, StringRecord};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::document::Document;
use crate::error::{Result, ScsvError};
use crate::schema::{parse_header, Schema};
use crate::types::{cast, Value};

/// The line separating the annotation header from the data section.
pub const SEPARATOR: &str = "@@";

/// Parse SCSV text into a document.
pub fn parse(text: &str) -> Result<Document> {
    let (header, data, data_first_line) = split_sections(text)?;
    let schema = Arc::new(parse_header(header.lines())?);
    let rows = parse_data(&schema, data, data_first_line)?;

    debug!(
        "Parsed SCSV document: {} columns, {} rows",
        schema.len(),
        rows.len()
    );
    Ok(Document::from_values(schema, rows))
}

/// Returns the header text, the data text and the 1-based line number where
/// the data text starts.
fn split_sections(text: &str) -> Result<(&str, &str, usize)> {
    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if line.trim() == SEPARATOR {
            let header = &text[..offset];
            let data = &text[offset + line.len()..];
            return Ok((header, data, idx + 2));
        }
        offset += line.len();
    }
    Err(ScsvError::MissingSeparator("not found".to_string()))
}

fn parse_data(schema: &Schema, data: &str, first_line: usize) -> Result<Vec<Vec<Value>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());
    let mut record = StringRecord::new();
    let mut layout: Option<Vec<usize>> = None;
    let mut rows = Vec::new();
    let mut newlines = 0usize;

    loop {
        let start = reader.position().byte() as usize;
        let more = reader
            .read_record(&mut record)
            .map_err(|e| ScsvError::row_arity(format!("malformed record: {}", e)))?;
        if !more {
            break;
        }
        let end = reader.position().byte() as usize;

        let raw = data.get(start..end).unwrap_or_default();
        let lead = raw.len() - raw.trim_start().len();
        let line = first_line + newlines + raw[..lead].matches('\n').count();
        newlines += raw.matches('\n').count();

        match raw.trim() {
            "" => continue,
            SEPARATOR => {
                return Err(ScsvError::MissingSeparator(format!(
                    "appears more than once (again on line {})",
                    line
                )))
            }
            _ => {}
        }

        match &layout {
            None => layout = Some(data_header_layout(schema, &record)?),
            Some(layout) => {
                let values = cast_record(schema, layout, &record, line)?;
                trace!("Parsed row {} from line {}", rows.len(), line);
                rows.push(values);
            }
        }
    }

    if layout.is_none() {
        return Err(ScsvError::column_mismatch("data section has no data header"));
    }
    Ok(rows)
}

/// Map each schema column to its field index in the data header.
fn data_header_layout(schema: &Schema, record: &StringRecord) -> Result<Vec<usize>> {
    let mut positions: Vec<Option<usize>> = vec![None; schema.len()];
    let mut unknown = Vec::new();

    for (data_idx, name) in record.iter().map(str::trim).enumerate() {
        match schema.position(name) {
            Some(schema_idx) => {
                if positions[schema_idx].replace(data_idx).is_some() {
                    return Err(ScsvError::column_mismatch(format!(
                        "column '{}' listed more than once in data header",
                        name
                    )));
                }
            }
            None => unknown.push(name),
        }
    }

    let missing: Vec<&str> = schema
        .names()
        .zip(positions.iter())
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name)
        .collect();

    if !unknown.is_empty() || !missing.is_empty() {
        let mut problems = Vec::new();
        if !unknown.is_empty() {
            problems.push(format!("not annotated: {}", unknown.join(", ")));
        }
        if !missing.is_empty() {
            problems.push(format!("annotated but absent: {}", missing.join(", ")));
        }
        return Err(ScsvError::column_mismatch(problems.join("; ")));
    }

    Ok(positions.into_iter().flatten().collect())
}

fn cast_record(
    schema: &Schema,
    layout: &[usize],
    record: &StringRecord,
    line: usize,
) -> Result<Vec<Value>> {
    if record.len() != layout.len() {
        return Err(ScsvError::row_arity(format!(
            "expected {} fields, got {}",
            layout.len(),
            record.len()
        ))
        .with_line(line));
    }

    schema
        .columns()
        .iter()
        .zip(layout)
        .map(|(column, &field_idx)| {
            let raw = record.get(field_idx).unwrap_or_default();
            cast(raw, column.column_type).map_err(|e| e.with_column(&column.name).with_line(line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = "name: string\nage: int\nadult: bool\n\n@@\n\nname,age,adult\n\"John\",27,1\n\"Robert\",13,0\n";

    #[test]
    fn test_split_sections() {
        let (header, data, line) = split_sections("a: int\n @@ \r\na\n1\n").unwrap();
        assert_eq!(header, "a: int\n");
        assert_eq!(data, "a\n1\n");
        assert_eq!(line, 3);
    }

    #[test]
    fn test_parse_people() {
        let doc = parse(PEOPLE).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc[0]["name"], Value::from("John"));
        assert_eq!(doc[0]["age"], Value::Integer(27));
        assert_eq!(doc[0]["adult"], Value::Boolean(true));
        assert_eq!(doc[1]["name"], Value::from("Robert"));
        assert_eq!(doc[1]["age"], Value::Integer(13));
        assert_eq!(doc[1]["adult"], Value::Boolean(false));
    }

    #[test]
    fn test_missing_separator() {
        let err = parse("name: string\n\nname\nJohn\n").unwrap_err();
        assert!(matches!(err, ScsvError::MissingSeparator(_)));
    }

    #[test]
    fn test_duplicate_separator() {
        let err = parse("a: int\n@@\na\n1\n@@\n2\n").unwrap_err();
        match err {
            ScsvError::MissingSeparator(msg) => assert!(msg.contains("line 5"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_quoted_separator_is_data() {
        let doc = parse("a: string\n@@\na\n\"@@\"\n").unwrap();
        assert_eq!(doc[0]["a"], Value::from("@@"));
    }

    #[test]
    fn test_reordered_data_header() {
        let doc = parse("name: string\nage: int\n@@\nage , name\n27,John\n").unwrap();
        let names: Vec<&str> = doc.schema().names().collect();
        assert_eq!(names, vec!["name", "age"]);
        assert_eq!(doc[0].values(), &[Value::from("John"), Value::Integer(27)]);
    }

    #[test]
    fn test_column_mismatch() {
        let missing = parse("a: int\nb: int\n@@\na\n1\n").unwrap_err();
        assert!(matches!(missing, ScsvError::ColumnMismatch(ref m) if m.contains("absent: b")));

        let unknown = parse("a: int\n@@\na,c\n1,2\n").unwrap_err();
        assert!(matches!(unknown, ScsvError::ColumnMismatch(ref m) if m.contains("not annotated: c")));

        let doubled = parse("a: int\n@@\na,a\n1,2\n").unwrap_err();
        assert!(matches!(doubled, ScsvError::ColumnMismatch(_)));

        let absent = parse("a: int\n@@\n\n  \n").unwrap_err();
        assert!(matches!(absent, ScsvError::ColumnMismatch(_)));
    }

    #[test]
    fn test_row_arity_reports_line() {
        let err = parse("a: int\nb: int\n@@\na,b\n1,2\n\n3\n").unwrap_err();
        assert_eq!(
            err,
            ScsvError::RowArity {
                line: Some(7),
                message: "expected 2 fields, got 1".to_string(),
            }
        );
    }

    #[test]
    fn test_cast_error_reports_column_and_line() {
        let err = parse("age: int\n\n@@\n\nage\ntwelve\n").unwrap_err();
        match err {
            ScsvError::TypeCast { value, column, line, .. } => {
                assert_eq!(value, "twelve");
                assert_eq!(column.as_deref(), Some("age"));
                assert_eq!(line, Some(6));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let doc = parse("a: int\r\nb: string\r\n\r\n@@\r\n\r\n\r\na,b\r\n1,x\r\n\r\n2,y\r\n\r\n").unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc[1]["a"], Value::Integer(2));
        assert_eq!(doc[1]["b"], Value::from("y"));
    }

    #[test]
    fn test_quoted_fields_with_commas() {
        let doc = parse("tags: array\nnote: str\n@@\ntags,note\n\"a,b,c\",\"x, y\"\n").unwrap();
        assert_eq!(
            doc[0]["tags"],
            Value::Array(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(doc[0]["note"], Value::from("x, y"));
    }

    #[test]
    fn test_header_only_document() {
        let doc = parse("a: int\n@@\na\n").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.schema().len(), 1);
    }
}
