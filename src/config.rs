use std::collections::HashSet;

use anyhow::{Context, bail};
use serde::Deserialize;

/// Env vars this process recognizes. Anything else under one of these
/// prefixes, or one of these bare names misspelled, is a fatal startup
/// error rather than a silently-ignored typo.
const KNOWN_VARS: &[&str] = &[
    "NSI_AURA_HOST",
    "NSI_AURA_PORT",
    "NSI_AURA_CERTIFICATE",
    "NSI_AURA_PRIVATE_KEY",
    "CA_CERTIFICATES",
    "VERIFY_REQUESTS",
    "DATABASE_URI",
    "STATIC_DIRECTORY",
    "NSA_SCHEME",
    "NSA_HOST",
    "NSA_PORT",
    "NSA_PATH_PREFIX",
    "NSI_PROVIDER_URL",
    "NSI_PROVIDER_ID",
    "NSI_DDS_URL",
    "SQL_LOGGING",
    "LOG_LEVEL",
];

const RECOGNIZED_PREFIXES: &[&str] = &["NSI_AURA_", "NSA_", "NSI_PROVIDER_", "NSI_DDS_"];

#[derive(Debug, Deserialize)]
struct RawConfig {
    nsi_aura_host: String,
    nsi_aura_port: u16,
    nsi_aura_certificate: String,
    nsi_aura_private_key: String,
    ca_certificates: Option<String>,
    #[serde(default = "default_true")]
    verify_requests: bool,
    database_uri: String,
    static_directory: String,
    nsa_scheme: String,
    nsa_host: String,
    nsa_port: u16,
    nsa_path_prefix: String,
    nsi_provider_url: String,
    nsi_provider_id: String,
    nsi_dds_url: String,
    #[serde(default)]
    sql_logging: bool,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved, validated configuration. Constructed once at startup and
/// shared read-only through [`crate::context::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub certificate_path: String,
    pub private_key_path: String,
    pub ca_certificates: Option<String>,
    pub verify_requests: bool,
    pub database_uri: String,
    pub static_directory: String,
    pub nsa_scheme: String,
    pub nsa_host: String,
    pub nsa_port: u16,
    pub nsa_path_prefix: String,
    pub provider_url: String,
    pub provider_id: String,
    pub dds_url: String,
    pub sql_logging: bool,
    pub log_level: log::LevelFilter,
}

impl Config {
    /// Load and validate configuration from the process environment.
    /// Any recognized-prefix variable not on the allow-list, a missing
    /// required variable, or an unsupported `DATABASE_URI` scheme is a
    /// fatal error.
    pub fn load() -> anyhow::Result<Self> {
        reject_unknown_vars()?;

        let raw: RawConfig = envy::from_env().context("reading configuration from environment")?;

        if !raw.database_uri.starts_with("sqlite://") && !raw.database_uri.starts_with("postgresql://")
        {
            bail!(
                "DATABASE_URI must start with sqlite:// or postgresql://, got: {}",
                raw.database_uri
            );
        }

        let log_level = raw
            .log_level
            .parse()
            .with_context(|| format!("invalid LOG_LEVEL: {}", raw.log_level))?;

        Ok(Self {
            host: raw.nsi_aura_host,
            port: raw.nsi_aura_port,
            certificate_path: raw.nsi_aura_certificate,
            private_key_path: raw.nsi_aura_private_key,
            ca_certificates: raw.ca_certificates,
            verify_requests: raw.verify_requests,
            database_uri: raw.database_uri,
            static_directory: raw.static_directory,
            nsa_scheme: raw.nsa_scheme,
            nsa_host: raw.nsa_host,
            nsa_port: raw.nsa_port,
            nsa_path_prefix: raw.nsa_path_prefix,
            provider_url: raw.nsi_provider_url,
            provider_id: raw.nsi_provider_id,
            dds_url: raw.nsi_dds_url,
            sql_logging: raw.sql_logging,
            log_level,
        })
    }

    /// The externally-reachable callback URL advertised to the provider as
    /// `replyTo`.
    pub fn reply_to_url(&self) -> String {
        format!(
            "{}://{}:{}{}/api/nsi/callback/",
            self.nsa_scheme, self.nsa_host, self.nsa_port, self.nsa_path_prefix
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn reject_unknown_vars() -> anyhow::Result<()> {
    let known: HashSet<&str> = KNOWN_VARS.iter().copied().collect();

    for (key, _) in std::env::vars() {
        let under_recognized_prefix = RECOGNIZED_PREFIXES.iter().any(|p| key.starts_with(p));
        if under_recognized_prefix && !known.contains(key.as_str()) {
            bail!("unrecognized configuration variable: {key}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_to_url_shape() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 8443,
            certificate_path: String::new(),
            private_key_path: String::new(),
            ca_certificates: None,
            verify_requests: true,
            database_uri: "sqlite://nsi-aura.db".to_string(),
            static_directory: "/etc/nsi-aura/templates".to_string(),
            nsa_scheme: "https".to_string(),
            nsa_host: "ra.example".to_string(),
            nsa_port: 443,
            nsa_path_prefix: String::new(),
            provider_url: "https://aggregator.example/nsi/services/CS2".to_string(),
            provider_id: "urn:ogf:network:aggregator.example:2024:nsa".to_string(),
            dds_url: "https://dds.example/dds".to_string(),
            sql_logging: false,
            log_level: log::LevelFilter::Info,
        };
        assert_eq!(
            config.reply_to_url(),
            "https://ra.example:443/api/nsi/callback/"
        );
    }
}
