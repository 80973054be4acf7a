//! Strategy configuration utilities

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Load configuration from TOML file
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct StrategyProfile {
        name: String,
        enabled: bool,
        log_level: Option<String>,
    }

    #[test]
    fn test_load_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"multi_path\"\nenabled = false").unwrap();

        let config: StrategyProfile = load_config(file.path()).unwrap();
        assert_eq!(config.name, "multi_path");
        assert!(!config.enabled);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result: Result<StrategyProfile> = load_config("/nonexistent/strategy.toml");
        assert!(result.is_err());
    }
}
