//! SQLite connection for the relational store

mod connection;

pub use connection::{SqliteConnection, SqliteTransaction};
