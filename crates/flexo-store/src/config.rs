//! Store configuration from environment variables

use flexo_core::{FlexoError, Result};
use flexo_driver_postgres::{PostgresConnectOptions, SslMode};
use serde::Serialize;
use std::path::PathBuf;

pub const USE_NEON_VAR: &str = "USE_NEON";
pub const SQLITE_PATH_VAR: &str = "FLEXO_SQLITE_PATH";
pub const DATA_DIR_VAR: &str = "FLEXO_DATA_DIR";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Raw PostgreSQL settings as found in the environment.
///
/// Fields stay optional here; missing ones are reported when a connection is
/// attempted so the manager can fall back instead of refusing to start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostgresSettings {
    pub host: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    pub port: Option<String>,
    pub ssl_mode: Option<String>,
}

impl PostgresSettings {
    /// Validate and build connection options.
    ///
    /// Fails with a configuration error that names every missing variable.
    pub fn connect_options(&self) -> Result<PostgresConnectOptions> {
        let required = [
            ("PGHOST", &self.host),
            ("PGUSER", &self.user),
            ("PGPASSWORD", &self.password),
            ("PGDATABASE", &self.database),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(FlexoError::Configuration(format!(
                "missing PostgreSQL settings: {}",
                missing.join(", ")
            )));
        }

        let port = match self.port.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PG_PORT,
            Some(raw) => raw.parse().map_err(|_| {
                FlexoError::Configuration(format!("PGPORT is not a valid port: '{}'", raw))
            })?,
        };
        let ssl_mode = match self.ssl_mode.as_deref() {
            None => SslMode::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e| FlexoError::Configuration(format!("PGSSLMODE: {}", e)))?,
        };

        Ok(PostgresConnectOptions {
            host: self.host.clone().unwrap_or_default(),
            port,
            database: self.database.clone().unwrap_or_default(),
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            ssl_mode,
        })
    }
}

/// Which backend the configuration asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendRequest {
    Csv,
    Postgres(PostgresSettings),
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    /// Directory for CSV files, also used when falling back
    pub data_dir: PathBuf,
    pub backend: BackendRequest,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            backend: BackendRequest::Csv,
        }
    }
}

impl StoreConfig {
    pub fn csv(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend: BackendRequest::Csv,
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    ///
    /// `USE_NEON` wins over `FLEXO_SQLITE_PATH`; with neither set the CSV
    /// store is used.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let backend = if lookup(USE_NEON_VAR).is_some_and(|v| is_truthy(&v)) {
            BackendRequest::Postgres(PostgresSettings {
                host: lookup("PGHOST"),
                user: lookup("PGUSER"),
                password: lookup("PGPASSWORD"),
                database: lookup("PGDATABASE"),
                port: lookup("PGPORT"),
                ssl_mode: lookup("PGSSLMODE"),
            })
        } else if let Some(path) = lookup(SQLITE_PATH_VAR).filter(|v| !v.trim().is_empty()) {
            BackendRequest::Sqlite {
                path: PathBuf::from(path),
            }
        } else {
            BackendRequest::Csv
        };

        Self { data_dir, backend }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> StoreConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_selects_csv_in_default_dir() {
        let config = config(&[]);
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn use_neon_accepts_common_truthy_spellings() {
        for value in ["1", "true", "YES", " True "] {
            let config = config(&[("USE_NEON", value)]);
            assert!(matches!(config.backend, BackendRequest::Postgres(_)), "{value}");
        }
        for value in ["0", "false", "no", ""] {
            assert_eq!(config(&[("USE_NEON", value)]).backend, BackendRequest::Csv);
        }
    }

    #[test]
    fn postgres_wins_over_sqlite() {
        let config = config(&[("USE_NEON", "1"), ("FLEXO_SQLITE_PATH", "flexo.db")]);
        assert!(matches!(config.backend, BackendRequest::Postgres(_)));

        let config = self::config(&[("FLEXO_SQLITE_PATH", "flexo.db"), ("FLEXO_DATA_DIR", "/tmp/x")]);
        assert_eq!(
            config.backend,
            BackendRequest::Sqlite {
                path: PathBuf::from("flexo.db")
            }
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn missing_credentials_are_all_named() {
        let settings = PostgresSettings {
            host: Some("db.example.com".into()),
            user: Some("flexo".into()),
            ..Default::default()
        };
        let err = settings.connect_options().unwrap_err();
        assert!(err.is_configuration());
        let message = err.to_string();
        assert!(message.contains("PGPASSWORD"));
        assert!(message.contains("PGDATABASE"));
        assert!(!message.contains("PGHOST"));
    }

    #[test]
    fn complete_settings_build_options_with_defaults() {
        let settings = PostgresSettings {
            host: Some("db.example.com".into()),
            user: Some("flexo".into()),
            password: Some("secret".into()),
            database: Some("erp".into()),
            ..Default::default()
        };
        let options = settings.connect_options().unwrap();
        assert_eq!(options.port, 5432);
        assert_eq!(options.ssl_mode, SslMode::Prefer);

        let settings = PostgresSettings {
            port: Some("not-a-port".into()),
            ..settings
        };
        assert!(settings.connect_options().unwrap_err().is_configuration());
    }

    #[test]
    fn password_is_never_serialized() {
        let config = config(&[("USE_NEON", "1"), ("PGPASSWORD", "secret")]);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
