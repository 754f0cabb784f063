//! SuperCSV (SCSV): CSV with a typed column schema.
//!
//! An SCSV file has two sections split by a line holding exactly `@@`:
//!
//! ```text
//! name: string
//! age: int
//! adult: bool
//!
//! @@
//!
//! name,age,adult
//! "John",27,1
//! "Robert",13,0
//! ```
//!
//! The annotation header declares the schema. The data section starts with a
//! data header (a permutation of the schema's column names) followed by one
//! line per row. Every cell is cast to its column's type on load, and every
//! mutation is validated against the schema, so a [`Document`] never holds a
//! row that does not match it.
//!
//! # Modules
//!
//! - [`types`]: column types, aliases, cast/format between text and [`Value`]
//! - [`schema`]: annotation header parsing and the immutable [`Schema`]
//! - [`parser`]: full document parsing
//! - [`document`]: the typed row store with CRUD access
//! - [`serializer`]: rendering a document back to SCSV text
//!
//! This crate performs no I/O. See `supercsv_store` for file-backed documents.

pub mod document;
pub mod error;
pub mod parser;
pub mod schema;
pub mod serializer;
pub mod types;

pub use document::{Document, FieldValue, Row, RowInput};
pub use error::{Result, ScsvError};
pub use parser::{parse, SEPARATOR};
pub use schema::{parse_header, Column, Schema};
pub use serializer::{serialize, serialize_with, SerializeOptions, TypeCase};
pub use types::{cast, check, format, resolve_type_name, ColumnType, Scalar, ScalarType, Value};
