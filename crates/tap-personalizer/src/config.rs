//! Personalizer service configuration

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizerConfig {
    /// HTTP API listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Substring of the PC/SC reader name to bind to
    #[serde(default)]
    pub reader_name: String,
}

fn default_http_addr() -> String {
    "127.0.0.1:8082".to_string()
}

impl Default for PersonalizerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            reader_name: String::new(),
        }
    }
}

impl PersonalizerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
