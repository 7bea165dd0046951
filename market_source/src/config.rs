//! Per-source credentials and connection settings.
//!
//! Deserialized from the `[sources.<id>]` tables of the engine config file.
//! Missing sections, empty strings, and obvious placeholders all count as
//! "no credentials": the corresponding adapter is constructed inert rather
//! than failing startup.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Failure to read or parse the sources config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Credential sections for every known source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub okx: ExchangeKeys,
    pub binance: ExchangeKeys,
    pub yahoo: SnapshotKeys,
    pub tushare: TokenKeys,
}

impl SourcesConfig {
    /// Parses a `[sources]`-shaped TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// API-key style credentials for a spot exchange.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeKeys {
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    /// Extra passphrase some exchanges require (OKX does, Binance does not).
    pub passphrase: Option<SecretString>,
    /// Route requests at the exchange's demo/testnet environment.
    pub sandbox: bool,
    /// Optional `host:port` HTTP proxy for this source only.
    pub proxy: Option<String>,
}

/// Settings for a credential-less snapshot source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotKeys {
    /// Optional `host:port` HTTP proxy for this source only.
    pub proxy: Option<String>,
}

/// Single-token credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenKeys {
    pub token: Option<SecretString>,
    /// Optional `host:port` HTTP proxy for this source only.
    pub proxy: Option<String>,
}

/// Returns the secret only when it holds a usable value. Empty strings and
/// `your_..._here` placeholders left over from a config template count as
/// absent.
pub fn usable(secret: &Option<SecretString>) -> Option<&SecretString> {
    secret.as_ref().filter(|s| {
        let v = s.expose_secret();
        !v.trim().is_empty() && !v.starts_with("your_")
    })
}
