//! Column types and typed values.
//!
//! SCSV has seven column types. Each one has a canonical name, a set of
//! case-insensitive aliases accepted in the annotation header, a cast rule
//! (cell text to [`Value`]) and a format rule (the exact inverse).
//!
//! | Type | Aliases | Cell text |
//! |---|---|---|
//! | integer | `integer`, `int`, `i` | `-42` |
//! | float | `float`, `f` | `3.5`, `27` |
//! | string | `string`, `str`, `s` | anything |
//! | boolean | `boolean`, `bool`, `b` | `1` or `0` |
//! | array | `array`, `arr`, `a` | `a,b,c` (escapes `\\`, `\,`, `\"`) |
//! | object | `object`, `obj`, `o` | `{"k":"v","n":1}` |
//! | datetime | `datetime`, `dt`, `d` | `2024-01-15T08:30:00.250` |
//!
//! Arrays carry a scalar element type written `array<elem>` (`arr<int>`). A
//! bare `array` holds strings.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScsvError};

/// The one datetime layout SCSV reads and writes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Array element separator inside a cell.
pub const ARRAY_DELIMITER: char = ',';

const ARRAY_ESCAPE: char = '\\';
const EMPTY_ELEMENT: &str = "\"\"";

// ============================================================================
// Type names
// ============================================================================

/// Element type of an `array` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Integer,
    Float,
    #[default]
    String,
    Boolean,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Boolean => "boolean",
        }
    }

    /// Cast a single array element. String elements are taken literally.
    pub fn cast(&self, raw: &str) -> Result<Scalar> {
        match self {
            ScalarType::Integer => cast_integer(raw).map(Scalar::Integer),
            ScalarType::Float => cast_float(raw).map(Scalar::Float),
            ScalarType::String => Ok(Scalar::String(raw.to_string())),
            ScalarType::Boolean => cast_boolean(raw).map(Scalar::Boolean),
        }
    }
}

/// The seven SCSV column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    /// Flat sequence of scalars of one element type
    Array(ScalarType),
    /// Flat string-keyed map of scalars
    Object,
    Datetime,
}

/// Alias → type. Every token appears once; `array` entries carry the default
/// element type.
const ALIAS_TABLE: &[(&str, ColumnType)] = &[
    ("integer", ColumnType::Integer),
    ("int", ColumnType::Integer),
    ("i", ColumnType::Integer),
    ("float", ColumnType::Float),
    ("f", ColumnType::Float),
    ("string", ColumnType::String),
    ("str", ColumnType::String),
    ("s", ColumnType::String),
    ("boolean", ColumnType::Boolean),
    ("bool", ColumnType::Boolean),
    ("b", ColumnType::Boolean),
    ("array", ColumnType::Array(ScalarType::String)),
    ("arr", ColumnType::Array(ScalarType::String)),
    ("a", ColumnType::Array(ScalarType::String)),
    ("object", ColumnType::Object),
    ("obj", ColumnType::Object),
    ("o", ColumnType::Object),
    ("datetime", ColumnType::Datetime),
    ("dt", ColumnType::Datetime),
    ("d", ColumnType::Datetime),
];

static ALIASES: Lazy<HashMap<&'static str, ColumnType>> =
    Lazy::new(|| ALIAS_TABLE.iter().copied().collect());

impl ColumnType {
    /// All column types with default parameters.
    pub fn all() -> Vec<ColumnType> {
        vec![
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::String,
            ColumnType::Boolean,
            ColumnType::Array(ScalarType::String),
            ColumnType::Object,
            ColumnType::Datetime,
        ]
    }

    /// Canonical lowercase name, without the array element type.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Boolean => "boolean",
            ColumnType::Array(_) => "array",
            ColumnType::Object => "object",
            ColumnType::Datetime => "datetime",
        }
    }

    /// Header tokens accepted for this type.
    pub fn aliases(&self) -> Vec<&'static str> {
        ALIAS_TABLE
            .iter()
            .filter(|(_, ty)| ty.name() == self.name())
            .map(|(alias, _)| *alias)
            .collect()
    }

    /// The scalar counterpart of this type, if it has one.
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            ColumnType::Integer => Some(ScalarType::Integer),
            ColumnType::Float => Some(ScalarType::Float),
            ColumnType::String => Some(ScalarType::String),
            ColumnType::Boolean => Some(ScalarType::Boolean),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ColumnType::Array(_) | ColumnType::Object)
    }
}

/// Resolve a header type token, case-insensitively, to a column type.
///
/// Accepts every alias plus the `array<elem>` form, where `elem` is itself an
/// alias of a scalar type.
pub fn resolve_type_name(token: &str) -> Result<ColumnType> {
    let trimmed = token.trim();
    let lowered = trimmed.to_lowercase();
    let unknown = || ScsvError::UnknownType(trimmed.to_string());

    if let Some((base, rest)) = lowered.split_once('<') {
        let inner = rest.strip_suffix('>').ok_or_else(unknown)?;
        match ALIASES.get(base.trim()) {
            Some(ColumnType::Array(_)) => {}
            _ => return Err(unknown()),
        }
        let item = ALIASES
            .get(inner.trim())
            .and_then(ColumnType::as_scalar)
            .ok_or_else(unknown)?;
        return Ok(ColumnType::Array(item));
    }

    ALIASES.get(lowered.as_str()).copied().ok_or_else(unknown)
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Array(ScalarType::String) => write!(f, "array"),
            ColumnType::Array(item) => write!(f, "array<{}>", item.name()),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for ColumnType {
    type Err = ScsvError;

    fn from_str(s: &str) -> Result<Self> {
        resolve_type_name(s)
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        resolve_type_name(&raw).map_err(de::Error::custom)
    }
}

// ============================================================================
// Values
// ============================================================================

/// A scalar held by an array element or an object entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Integer(_) => ScalarType::Integer,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::String(_) => ScalarType::String,
            Scalar::Boolean(_) => ScalarType::Boolean,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Scalar::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Integer(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::String(v) => serde_json::Value::String(v.clone()),
            Scalar::Boolean(v) => serde_json::Value::Bool(*v),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Integer(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

/// A typed cell value. One shape per column type, so a value can only ever be
/// checked against a column, never silently reinterpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Array(Vec<Scalar>),
    Object(BTreeMap<String, Scalar>),
    Datetime(NaiveDateTime),
}

impl Value {
    /// Short shape name used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Datetime(_) => "datetime",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Scalar>> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Datetime(v) => Some(*v),
            _ => None,
        }
    }

    /// Render the cell text for this value. Only meaningful for values that
    /// passed [`check`] against their column.
    pub fn to_text(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(v) => format_string(v),
            Value::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
            Value::Array(items) => format_array(items),
            Value::Object(map) => format_object(map),
            Value::Datetime(v) => v.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(v: Vec<Scalar>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Scalar>> for Value {
    fn from(v: BTreeMap<String, Scalar>) -> Self {
        Value::Object(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Datetime(v)
    }
}

// ============================================================================
// Cast / format / check
// ============================================================================

/// Cast cell text to a typed value of `column_type`.
pub fn cast(raw: &str, column_type: ColumnType) -> Result<Value> {
    match column_type {
        ColumnType::Integer => cast_integer(raw).map(Value::Integer),
        ColumnType::Float => cast_float(raw).map(Value::Float),
        ColumnType::String => Ok(Value::String(strip_quotes(raw).to_string())),
        ColumnType::Boolean => cast_boolean(raw).map(Value::Boolean),
        ColumnType::Array(item) => cast_array(raw, item).map(Value::Array),
        ColumnType::Object => cast_object(raw).map(Value::Object),
        ColumnType::Datetime => cast_datetime(raw).map(Value::Datetime),
    }
}

/// Render `value` as cell text for `column_type`. Inverse of [`cast`].
pub fn format(value: &Value, column_type: ColumnType) -> Result<String> {
    check(value, column_type)?;
    Ok(value.to_text())
}

/// Check an already-typed value against a column type.
///
/// Fails with [`ScsvError::TypeMismatch`] on a shape mismatch, a wrongly
/// typed array element, or a non-finite float. The column name is left empty
/// for the caller to fill in with [`ScsvError::with_column`].
pub fn check(value: &Value, column_type: ColumnType) -> Result<()> {
    let mismatch = |got: String| ScsvError::TypeMismatch {
        column: String::new(),
        expected: column_type.to_string(),
        got,
    };

    match (value, column_type) {
        (Value::Integer(_), ColumnType::Integer)
        | (Value::String(_), ColumnType::String)
        | (Value::Boolean(_), ColumnType::Boolean)
        | (Value::Datetime(_), ColumnType::Datetime) => Ok(()),
        (Value::Float(v), ColumnType::Float) => {
            if v.is_finite() {
                Ok(())
            } else {
                Err(mismatch(format!("non-finite float {}", v)))
            }
        }
        (Value::Array(items), ColumnType::Array(item_type)) => {
            for (idx, item) in items.iter().enumerate() {
                if item.scalar_type() != item_type || !item.is_finite() {
                    return Err(mismatch(format!(
                        "array element {} of type {}",
                        idx,
                        item.scalar_type().name()
                    )));
                }
            }
            Ok(())
        }
        (Value::Object(map), ColumnType::Object) => {
            match map.iter().find(|(_, v)| !v.is_finite()) {
                Some((key, _)) => Err(mismatch(format!("non-finite float at key '{}'", key))),
                None => Ok(()),
            }
        }
        (other, _) => Err(mismatch(other.kind().to_string())),
    }
}

fn cast_integer(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| ScsvError::type_cast(raw, "integer", e.to_string()))
}

fn cast_float(raw: &str) -> Result<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| ScsvError::type_cast(raw, "float", e.to_string()))?;
    if !value.is_finite() {
        return Err(ScsvError::type_cast(raw, "float", "value is not finite"));
    }
    Ok(value)
}

fn cast_boolean(raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ScsvError::type_cast(
            raw,
            "boolean",
            "boolean literals are 1 and 0",
        )),
    }
}

fn cast_datetime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).map_err(|e| {
        ScsvError::type_cast(raw, "datetime", format!("{} (expected {})", e, DATETIME_FORMAT))
    })
}

/// Strip one layer of matching `"` or `'` quotes.
fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Add one layer of quotes to strings that [`strip_quotes`] would otherwise alter.
fn format_string(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return format!("{quote}{value}{quote}");
        }
    }
    value.to_string()
}

fn cast_array(raw: &str, item_type: ScalarType) -> Result<Vec<Scalar>> {
    let expected = ColumnType::Array(item_type).to_string();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    split_array(raw)
        .ok_or_else(|| {
            ScsvError::type_cast(raw, expected.as_str(), "dangling escape at end of array")
        })?
        .iter()
        .map(|element| {
            item_type
                .cast(element)
                .map_err(|e| ScsvError::type_cast(raw, expected.as_str(), e.to_string()))
        })
        .collect()
}

/// Split array text on unescaped delimiters, resolving escapes and the empty
/// element marker. Returns `None` on a trailing lone escape.
fn split_array(raw: &str) -> Option<Vec<String>> {
    let mut elements = Vec::new();
    let mut token = String::new();
    let mut escaped = false;
    let mut chars = raw.chars();

    let finish = |token: &mut String, escaped: bool| {
        if !escaped && token.as_str() == EMPTY_ELEMENT {
            token.clear();
        }
        std::mem::take(token)
    };

    while let Some(ch) = chars.next() {
        match ch {
            ARRAY_ESCAPE => {
                token.push(chars.next()?);
                escaped = true;
            }
            ARRAY_DELIMITER => {
                elements.push(finish(&mut token, escaped));
                escaped = false;
            }
            other => token.push(other),
        }
    }
    elements.push(finish(&mut token, escaped));

    Some(elements)
}

fn format_array(items: &[Scalar]) -> String {
    let mut out = String::new();
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(ARRAY_DELIMITER);
        }
        match item {
            Scalar::String(text) if text.is_empty() => out.push_str(EMPTY_ELEMENT),
            Scalar::String(text) => {
                for ch in text.chars() {
                    if matches!(ch, ARRAY_ESCAPE | ARRAY_DELIMITER | '"') {
                        out.push(ARRAY_ESCAPE);
                    }
                    out.push(ch);
                }
            }
            Scalar::Integer(v) => out.push_str(&v.to_string()),
            Scalar::Float(v) => out.push_str(&v.to_string()),
            Scalar::Boolean(v) => out.push(if *v { '1' } else { '0' }),
        }
    }
    out
}

fn cast_object(raw: &str) -> Result<BTreeMap<String, Scalar>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ScsvError::type_cast(raw, "object", e.to_string()))?;
    let serde_json::Value::Object(entries) = parsed else {
        return Err(ScsvError::type_cast(raw, "object", "expected a JSON object"));
    };

    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let scalar = match value {
            serde_json::Value::String(v) => Scalar::String(v),
            serde_json::Value::Bool(v) => Scalar::Boolean(v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Scalar::Integer(v),
                None => Scalar::Float(n.as_f64().ok_or_else(|| {
                    ScsvError::type_cast(raw, "object", format!("unsupported number at key '{}'", key))
                })?),
            },
            other => {
                return Err(ScsvError::type_cast(
                    raw,
                    "object",
                    format!("value at key '{}' is not a scalar: {}", key, other),
                ))
            }
        };
        map.insert(key, scalar);
    }
    Ok(map)
}

fn format_object(map: &BTreeMap<String, Scalar>) -> String {
    let entries: serde_json::Map<String, serde_json::Value> = map
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    serde_json::Value::Object(entries).to_string()
}
