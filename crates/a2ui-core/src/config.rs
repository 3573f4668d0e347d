use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What `finish()` does when its last-resort whole-buffer parse fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishMode {
    /// Swallow the failure (logged at debug level).
    #[default]
    Lenient,
    /// Report the failure through `MessageSink::on_error`.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblerConfig {
    #[serde(default)]
    pub finish_mode: FinishMode,
    #[serde(default = "default_error_preview_chars")]
    pub error_preview_chars: usize,
}

fn default_error_preview_chars() -> usize {
    100
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            finish_mode: FinishMode::default(),
            error_preview_chars: default_error_preview_chars(),
        }
    }
}

impl AssemblerConfig {
    pub fn strict() -> Self {
        Self {
            finish_mode: FinishMode::Strict,
            ..Self::default()
        }
    }
}

/// Top-level configuration file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2uiConfig {
    #[serde(default)]
    pub assembler: AssemblerConfig,
}

/// Load configuration from a JSON file. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<A2uiConfig, ConfigError> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(A2uiConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: A2uiConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &A2uiConfig) -> Result<(), ConfigError> {
    if config.assembler.error_preview_chars == 0 {
        return Err(ConfigError::Invalid(
            "assembler.errorPreviewChars must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(prefix: &str) -> std::path::PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("{}-{}-{}.json", prefix, std::process::id(), ts))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_config(&unique_temp_file("a2ui-missing")).unwrap();
        assert_eq!(cfg.assembler.finish_mode, FinishMode::Lenient);
        assert_eq!(cfg.assembler.error_preview_chars, 100);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = unique_temp_file("a2ui-cfg");
        std::fs::write(&path, r#"{"assembler":{"finishMode":"strict"}}"#)
            .expect("failed to write config");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.assembler.finish_mode, FinishMode::Strict);
        assert_eq!(cfg.assembler.error_preview_chars, 100);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn zero_preview_is_invalid() {
        let path = unique_temp_file("a2ui-bad");
        std::fs::write(&path, r#"{"assembler":{"errorPreviewChars":0}}"#)
            .expect("failed to write config");
        let err = load_config(&path).unwrap_err();
        assert_eq!(err.code(), "A2UI_E_CONFIG_INVALID");
        let _ = std::fs::remove_file(&path);
    }
}
