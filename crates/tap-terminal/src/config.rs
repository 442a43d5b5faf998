//! Terminal configuration

use std::path::Path;

use serde::Deserialize;
use tap_card::KernelKind;

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalConfig {
    /// Index of reader to use, -1 for interactive selection
    #[serde(default = "default_reader_index")]
    pub reader_index: i32,

    /// ID of merchant to create payment for
    #[serde(default)]
    pub merchant_id: String,

    /// URL of the acquirer service
    #[serde(default = "default_acquirer_url")]
    pub acquirer_url: String,

    /// URL of the receipt printer; printing is skipped when unset
    #[serde(default)]
    pub printer_url: String,

    /// Default amount in minor units; 0 prompts on the console
    #[serde(default)]
    pub default_amount: i64,

    /// Which contactless kernel to run: "ftdc" or "universal"
    #[serde(default = "default_kernel")]
    pub kernel: String,
}

fn default_reader_index() -> i32 {
    -1
}

fn default_acquirer_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_kernel() -> String {
    "ftdc".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            reader_index: default_reader_index(),
            merchant_id: String::new(),
            acquirer_url: default_acquirer_url(),
            printer_url: String::new(),
            default_amount: 0,
            kernel: default_kernel(),
        }
    }
}

impl TerminalConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn kernel_kind(&self) -> anyhow::Result<KernelKind> {
        self.kernel
            .parse()
            .map_err(|message: String| anyhow::anyhow!(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: TerminalConfig = serde_yaml::from_str("merchant_id: m1").unwrap();
        assert_eq!(config.reader_index, -1);
        assert_eq!(config.kernel, "ftdc");
        assert_eq!(config.kernel_kind().unwrap(), KernelKind::Ftdc);
    }

    #[test]
    fn test_full_file() {
        let yaml = "
reader_index: 0
merchant_id: m1
acquirer_url: http://localhost:9000
printer_url: http://localhost:9100
default_amount: 250
kernel: universal
";
        let config: TerminalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.reader_index, 0);
        assert_eq!(config.default_amount, 250);
        assert_eq!(config.kernel_kind().unwrap(), KernelKind::Universal);
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let config: TerminalConfig = serde_yaml::from_str("kernel: mystery").unwrap();
        assert!(config.kernel_kind().is_err());
    }
}
