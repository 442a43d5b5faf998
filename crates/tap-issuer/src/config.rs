//! Issuer service configuration

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    /// HTTP API listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// ISO 8583 authorization endpoint listen address
    #[serde(default = "default_iso8583_addr")]
    pub iso8583_addr: String,

    /// Card personalizer base URL; card flashing is disabled when unset
    #[serde(default)]
    pub personalizer_url: Option<String>,
}

fn default_http_addr() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_iso8583_addr() -> String {
    "127.0.0.1:8583".to_string()
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            iso8583_addr: default_iso8583_addr(),
            personalizer_url: None,
        }
    }
}

impl IssuerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
