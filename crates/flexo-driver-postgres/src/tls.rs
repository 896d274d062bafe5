//! PostgreSQL TLS Support
//!
//! Maps libpq-style `sslmode` values onto tokio-postgres settings and builds
//! the native-tls connector used for encrypted sessions.

use native_tls::{TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// The sslmode value is not one libpq knows
    #[error("unknown sslmode '{0}'")]
    UnknownMode(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

/// libpq `sslmode` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// tokio-postgres only distinguishes disable/prefer/require; verification
    /// strength is applied on the connector instead
    pub fn to_pg(self) -> tokio_postgres::config::SslMode {
        use tokio_postgres::config::SslMode as PgSslMode;
        match self {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Allow | SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
        }
    }

    pub fn uses_tls(self) -> bool {
        self != SslMode::Disable
    }
}

impl FromStr for SslMode {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "" | "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(SslMode::VerifyFull),
            other => Err(TlsError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a TLS connector for the given mode.
///
/// `require` behaves like libpq without a root certificate: the channel is
/// encrypted but the server certificate is not checked. `verify-ca` checks
/// the chain only, `verify-full` also the hostname.
pub fn build_tls_connector(mode: SslMode) -> Result<MakeTlsConnector, TlsError> {
    let mut builder = NativeTlsConnector::builder();
    configure_verification(&mut builder, mode);

    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    debug!(mode = %mode, "TLS connector built");
    Ok(MakeTlsConnector::new(connector))
}

fn configure_verification(builder: &mut TlsConnectorBuilder, mode: SslMode) {
    match mode {
        SslMode::Disable | SslMode::Allow | SslMode::Prefer | SslMode::Require => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyFull => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sslmode_parses_libpq_spellings() {
        assert_eq!("disable".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert_eq!("Require".parse::<SslMode>().unwrap(), SslMode::Require);
        assert_eq!("verify_full".parse::<SslMode>().unwrap(), SslMode::VerifyFull);
        assert_eq!("".parse::<SslMode>().unwrap(), SslMode::Prefer);
        assert!("sometimes".parse::<SslMode>().is_err());
    }

    #[test]
    fn sslmode_maps_to_tokio_postgres() {
        use tokio_postgres::config::SslMode as PgSslMode;
        assert!(matches!(SslMode::Allow.to_pg(), PgSslMode::Prefer));
        assert!(matches!(SslMode::VerifyCa.to_pg(), PgSslMode::Require));
        assert!(matches!(SslMode::Disable.to_pg(), PgSslMode::Disable));
        assert!(!SslMode::Disable.uses_tls());
    }

    #[test]
    fn sslmode_round_trips_through_display() {
        for mode in [SslMode::Prefer, SslMode::VerifyCa, SslMode::VerifyFull] {
            assert_eq!(mode.to_string().parse::<SslMode>().unwrap(), mode);
        }
    }
}
