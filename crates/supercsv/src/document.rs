//! The typed row store.
//!
//! A [`Document`] owns a [`Schema`] and an ordered list of [`Row`]s. Rows can
//! only change through the document's CRUD methods, each of which builds and
//! validates the complete new row before touching stored state. A failed call
//! leaves the document exactly as it was.

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Index;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, ScsvError};
use crate::schema::Schema;
use crate::serializer::serialize;
use crate::types::{cast, check, ColumnType, Scalar, Value};

// ============================================================================
// Row
// ============================================================================

/// One schema-conformant record. Holds exactly one value per schema column,
/// in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Row {
    /// Value of a column, or `None` for a name outside the schema.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.position(column).map(|idx| &self.values[idx])
    }

    /// Values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.schema.names().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy this row into a typed input, e.g. to edit and write it back.
    pub fn to_input(&self) -> RowInput {
        self.iter()
            .map(|(name, value)| (name, FieldValue::Typed(value.clone())))
            .collect()
    }
}

impl Index<&str> for Row {
    type Output = Value;

    /// Panics if `column` is not in the schema.
    fn index(&self, column: &str) -> &Value {
        match self.get(column) {
            Some(value) => value,
            None => panic!("no column named '{}' in row", column),
        }
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Row input
// ============================================================================

/// A field supplied to an update or insert.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Cell text, cast with the column's type
    Raw(String),
    /// Already-typed value, checked against the column's type
    Typed(Value),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Raw(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Raw(v)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Typed(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Typed(Value::Integer(v))
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Typed(Value::Integer(v as i64))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Typed(Value::Float(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Typed(Value::Boolean(v))
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::Typed(Value::Datetime(v))
    }
}

impl From<Vec<Scalar>> for FieldValue {
    fn from(v: Vec<Scalar>) -> Self {
        FieldValue::Typed(Value::Array(v))
    }
}

impl From<BTreeMap<String, Scalar>> for FieldValue {
    fn from(v: BTreeMap<String, Scalar>) -> Self {
        FieldValue::Typed(Value::Object(v))
    }
}

/// Column → value mapping for `insert_row` / `update_row`.
///
/// ```
/// use supercsv::RowInput;
///
/// let row = RowInput::new()
///     .with("name", "Ann")
///     .with("age", 31)
///     .with("adult", "1");
/// assert_eq!(row.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowInput {
    fields: Vec<(String, FieldValue)>,
}

impl RowInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((column.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RowInput
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for RowInput
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(fields: [(K, V); N]) -> Self {
        fields.into_iter().collect()
    }
}

impl<K, V> From<HashMap<K, V>> for RowInput
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(fields: HashMap<K, V>) -> Self {
        fields.into_iter().collect()
    }
}

impl From<&Row> for RowInput {
    fn from(row: &Row) -> Self {
        row.to_input()
    }
}

// ============================================================================
// Document
// ============================================================================

/// An SCSV document: one schema plus typed rows in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Document {
    /// Create an empty document.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: Vec::new(),
        }
    }

    /// Assemble a document from values already cast in schema order.
    pub(crate) fn from_values(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|values| Row {
                schema: Arc::clone(&schema),
                values,
            })
            .collect();
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `index`.
    pub fn get(&self, index: usize) -> Result<&Row> {
        self.rows.get(index).ok_or(ScsvError::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    /// All rows in stored order. Each call starts a fresh pass; the borrow
    /// keeps the document unchanged while the iterator lives.
    pub fn read_all(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Replace the row at `index` wholesale.
    pub fn update_row(&mut self, index: usize, input: impl Into<RowInput>) -> Result<()> {
        self.check_index(index)?;
        let row = self.build_row(input.into())?;
        self.rows[index] = row;
        debug!("Replaced row {}", index);
        Ok(())
    }

    /// Same as [`Document::update_row`]; the write half of `doc[i]`.
    pub fn set(&mut self, index: usize, input: impl Into<RowInput>) -> Result<()> {
        self.update_row(index, input)
    }

    /// Replace one field of the row at `index`.
    pub fn update_field(
        &mut self,
        index: usize,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        self.check_index(index)?;
        let position = self
            .schema
            .position(column)
            .ok_or_else(|| ScsvError::UnknownColumn(column.to_string()))?;
        let column_type = self.schema.columns()[position].column_type;
        let value = resolve_field(column, column_type, value.into())?;

        self.rows[index].values[position] = value;
        debug!("Updated field '{}' of row {}", column, index);
        Ok(())
    }

    /// Append a row.
    pub fn insert_row(&mut self, input: impl Into<RowInput>) -> Result<()> {
        let row = self.build_row(input.into())?;
        self.rows.push(row);
        debug!("Inserted row {}", self.rows.len() - 1);
        Ok(())
    }

    /// Remove the row at `index`; later rows move down by one.
    pub fn remove_row(&mut self, index: usize) -> Result<Row> {
        self.check_index(index)?;
        let removed = self.rows.remove(index);
        debug!("Removed row {} ({} remaining)", index, self.rows.len());
        Ok(removed)
    }

    /// Render as SCSV text with default options.
    pub fn to_scsv(&self) -> Result<String> {
        serialize(self)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(ScsvError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            })
        }
    }

    /// Validate a complete input against the schema and produce a row.
    fn build_row(&self, input: RowInput) -> Result<Row> {
        let mut seen = HashSet::with_capacity(input.fields.len());
        let mut slots: Vec<Option<Value>> = vec![None; self.schema.len()];

        for (name, field) in input.fields {
            if !seen.insert(name.clone()) {
                return Err(ScsvError::row_arity(format!(
                    "column '{}' supplied more than once",
                    name
                )));
            }
            let position = self.schema.position(&name).ok_or_else(|| {
                ScsvError::row_arity(format!("column '{}' is not in the schema", name))
            })?;
            let column_type = self.schema.columns()[position].column_type;
            slots[position] = Some(resolve_field(&name, column_type, field)?);
        }

        let missing: Vec<&str> = self
            .schema
            .names()
            .zip(slots.iter())
            .filter(|(_, slot)| slot.is_none())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(ScsvError::row_arity(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Row {
            schema: Arc::clone(&self.schema),
            values: slots.into_iter().flatten().collect(),
        })
    }
}

fn resolve_field(column: &str, column_type: ColumnType, field: FieldValue) -> Result<Value> {
    match field {
        FieldValue::Raw(text) => cast(&text, column_type).map_err(|e| e.with_column(column)),
        FieldValue::Typed(value) => {
            check(&value, column_type).map_err(|e| e.with_column(column))?;
            Ok(value)
        }
    }
}

impl Index<usize> for Document {
    type Output = Row;

    /// Panics if `index` is out of range, like slice indexing.
    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
