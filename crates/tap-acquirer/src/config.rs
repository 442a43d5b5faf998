//! Acquirer service configuration

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AcquirerConfig {
    /// HTTP API listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Issuer ISO 8583 endpoint to dial for authorizations
    #[serde(default = "default_issuer_addr")]
    pub issuer_addr: String,
}

fn default_http_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_issuer_addr() -> String {
    "127.0.0.1:8583".to_string()
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            issuer_addr: default_issuer_addr(),
        }
    }
}

impl AcquirerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
