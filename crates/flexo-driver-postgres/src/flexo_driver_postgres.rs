//! PostgreSQL connection for the relational store

mod connection;
mod tls;

pub use connection::{PostgresConnectOptions, PostgresConnection};
pub use tls::{SslMode, TlsError, build_tls_connector};
