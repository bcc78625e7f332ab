//! Configuration loading and validation for the fieldseal service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::auth::derive_signing_secret;
use crate::crypto::EncryptionKey;

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Standard base64 of the 32-byte field encryption key. **Required.**
    pub encryption_key: String,

    /// Secret for HS256 token signatures. Derived from the encryption key when unset.
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default = "default_access_lifetime")]
    pub access_token_lifetime_secs: u64,

    /// Refresh token lifetime in seconds. Must exceed the access lifetime.
    #[serde(default = "default_refresh_lifetime")]
    pub refresh_token_lifetime_secs: u64,

    /// Path to the JSON array of user records served by the bundled store. **Required.**
    pub users_file: String,

    /// HTTP header naming the record kind on `/fields/*` requests.
    #[serde(default = "default_record_kind_header")]
    pub record_kind_header: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// OTLP gRPC endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_access_lifetime() -> u64 {
    24 * 60 * 60
}
fn default_refresh_lifetime() -> u64 {
    7 * 24 * 60 * 60
}
fn default_record_kind_header() -> String {
    "X-Record-Kind".into()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The decoded field encryption key.
    ///
    /// # Errors
    ///
    /// Returns an error unless `ENCRYPTION_KEY` is base64 of exactly 32 bytes.
    pub fn encryption_key(&self) -> Result<EncryptionKey> {
        EncryptionKey::from_base64(&self.encryption_key).context("ENCRYPTION_KEY is invalid")
    }

    /// The HS256 signing secret: `TOKEN_SECRET` if set, else derived from the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key must be derived and is invalid.
    pub fn signing_secret(&self) -> Result<Vec<u8>> {
        match &self.token_secret {
            Some(secret) => Ok(secret.as_bytes().to_vec()),
            None => derive_signing_secret(&self.encryption_key()?)
                .context("failed to derive token signing secret"),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.encryption_key, "ENCRYPTION_KEY")?;
        ensure_non_empty(&self.users_file, "USERS_FILE")?;
        ensure_non_empty(&self.record_kind_header, "RECORD_KIND_HEADER")?;
        if let Some(secret) = &self.token_secret {
            ensure_non_empty(secret, "TOKEN_SECRET")?;
        }
        self.encryption_key()?;

        if self.access_token_lifetime_secs == 0 {
            anyhow::bail!("ACCESS_TOKEN_LIFETIME_SECS must be > 0");
        }
        if self.access_token_lifetime_secs >= self.refresh_token_lifetime_secs {
            anyhow::bail!(
                "ACCESS_TOKEN_LIFETIME_SECS must be shorter than REFRESH_TOKEN_LIFETIME_SECS"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("refresh_token_lifetime_secs", &self.refresh_token_lifetime_secs)
            .field("users_file", &self.users_file)
            .field("record_kind_header", &self.record_kind_header)
            .field("listen_port", &self.listen_port)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn valid() -> Config {
        Config {
            encryption_key: STANDARD.encode([b'a'; 32]),
            token_secret: None,
            access_token_lifetime_secs: default_access_lifetime(),
            refresh_token_lifetime_secs: default_refresh_lifetime(),
            users_file: "/etc/fieldseal/users.json".into(),
            record_kind_header: default_record_kind_header(),
            listen_port: default_listen_port(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_access_lifetime(), 86_400);
        assert_eq!(default_refresh_lifetime(), 604_800);
        assert_eq!(default_record_kind_header(), "X-Record-Kind");
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_key: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_key() {
        let cfg = Config {
            encryption_key: STANDARD.encode([1u8; 16]),
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("ENCRYPTION_KEY"));
    }

    #[test]
    fn validate_rejects_inverted_lifetimes() {
        let cfg = Config {
            access_token_lifetime_secs: default_refresh_lifetime(),
            refresh_token_lifetime_secs: default_access_lifetime(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_token_secret() {
        let cfg = Config {
            token_secret: Some("  ".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn signing_secret_prefers_explicit_value() {
        let cfg = Config {
            token_secret: Some("explicit".into()),
            ..valid()
        };
        assert_eq!(cfg.signing_secret().unwrap(), b"explicit".to_vec());
        assert_eq!(valid().signing_secret().unwrap().len(), 32);
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = Config {
            token_secret: Some("explicit".into()),
            ..valid()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains(&cfg.encryption_key));
        assert!(!dbg.contains("explicit"));
    }
}
