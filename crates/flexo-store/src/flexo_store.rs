//! Table stores and the table manager
//!
//! Two interchangeable backends implement [`flexo_core::TableBackend`]:
//! [`CsvStore`] writes one CSV file per table, [`RelationalStore`] one SQL
//! table per table over a PostgreSQL or SQLite connection. [`TableManager`]
//! picks one at startup from a [`StoreConfig`] and is the only thing callers
//! talk to.

mod config;
mod csv_store;
mod manager;
mod relational_store;

pub use config::{BackendRequest, PostgresSettings, StoreConfig};
pub use csv_store::CsvStore;
pub use manager::{BackendSelection, TableManager};
pub use relational_store::{Dialect, RelationalStore};
