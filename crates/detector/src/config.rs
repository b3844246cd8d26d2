use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scan behavior knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Search other files of the diff for a construct that left its file
    pub cross_file_search: bool,

    /// Evaluate subscriptions on the rayon thread pool
    pub parallel: bool,

    /// Files larger than this are treated as unreadable
    pub max_file_bytes: usize,

    /// Used for subscriptions that leave `trigger_on_duplicate` unset
    pub default_trigger_on_duplicate: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cross_file_search: false,
            parallel: true,
            max_file_bytes: 2 * 1024 * 1024,
            default_trigger_on_duplicate: false,
        }
    }
}

impl ScanConfig {
    /// Single-threaded evaluation, handy for debugging and deterministic logs
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Enable the cross-file stage of the semantic matcher
    pub fn with_cross_file_search() -> Self {
        Self {
            cross_file_search: true,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_file_bytes == 0 {
            return Err("max_file_bytes must be > 0".to_string());
        }
        Ok(())
    }

    /// Parse and validate a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate().map_err(DetectorError::InvalidConfig)?;
        Ok(config)
    }

    /// Read a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        assert!(ScanConfig::default().validate().is_ok());
        assert!(ScanConfig::sequential().validate().is_ok());
        assert!(ScanConfig::with_cross_file_search().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanConfig {
            max_file_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_file_bytes = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ScanConfig::from_toml_str("cross_file_search = true\n").unwrap();
        assert!(config.cross_file_search);
        assert!(config.parallel);
        assert_eq!(config.max_file_bytes, ScanConfig::default().max_file_bytes);
    }

    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            ScanConfig::from_toml_str("parallel = \"yes\""),
            Err(DetectorError::ConfigParse(_))
        ));
        assert!(matches!(
            ScanConfig::from_toml_str("max_file_bytes = 0"),
            Err(DetectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "parallel = false\nmax_file_bytes = 4096").unwrap();
        let config = ScanConfig::load(file.path()).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.max_file_bytes, 4096);

        assert!(matches!(
            ScanConfig::load("/definitely/not/here.toml"),
            Err(DetectorError::IoError(_))
        ));
    }
}
