//! Flexo Core - Core abstractions and types for the record store
//!
//! This crate provides the fundamental traits and types that all other
//! Flexo crates depend on. It defines:
//!
//! - `Field` and the schema registry - the 14 fixed record columns
//! - `RawTable` - loosely typed tables exchanged with storage and callers
//! - `Record` / `Table` - the canonical, normalized shape
//! - `normalize` - column completion, date and quantity coercion
//! - `TableBackend` - trait for storage backends (CSV, relational)
//! - `Connection` - trait for SQL connections used by the relational backend

mod backend;
mod connection;
mod error;
pub mod filter;
pub mod normalize;
mod record;
pub mod schema;
mod table_id;
mod types;
pub mod validation;

pub use backend::*;
pub use connection::*;
pub use error::*;
pub use filter::{FilteredRecords, RecordFilter, DEFAULT_ROW_CAP};
pub use normalize::normalize;
pub use record::*;
pub use schema::{Field, FieldKind};
pub use table_id::*;
pub use types::*;
pub use validation::{FormProblem, RecordEdit, RecordForm, RecordPatch, ValidationErrors};
