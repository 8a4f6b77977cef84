use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOURCE_CONTAINER: &str = "general";
pub const DEFAULT_CHECKPOINT_CONTAINER: &str = "checkpoint";
pub const DEFAULT_CHECKPOINT_KEY: &str = "checkpoint.txt";
pub const DEFAULT_PACE_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    S3,
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub region: Option<String>,
    // Custom endpoint for S3-compatible stores (MinIO, LocalStack)
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub source_container: String,
    pub checkpoint_container: String,
    pub checkpoint_key: String,
    // Delay before each listed object is reported, in milliseconds
    pub pace_ms: u64,
    pub s3: S3Settings,
    pub local_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            source_container: DEFAULT_SOURCE_CONTAINER.to_string(),
            checkpoint_container: DEFAULT_CHECKPOINT_CONTAINER.to_string(),
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.to_string(),
            pace_ms: DEFAULT_PACE_MS,
            s3: S3Settings::default(),
            local_root: PathBuf::from("blobmark-data"),
        }
    }
}

impl Config {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("source_container", &self.source_container),
            ("checkpoint_container", &self.checkpoint_container),
            ("checkpoint_key", &self.checkpoint_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    // serde_yaml rejects empty documents
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_well_known_names() {
        let cfg = Config::default();
        assert_eq!(cfg.backend, BackendKind::S3);
        assert_eq!(cfg.source_container, "general");
        assert_eq!(cfg.checkpoint_container, "checkpoint");
        assert_eq!(cfg.checkpoint_key, "checkpoint.txt");
        assert_eq!(cfg.pace(), Duration::from_secs(2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let cfg = parse_config(
            r#"
backend: local
local_root: /var/lib/blobmark
pace_ms: 0
s3:
  endpoint: http://127.0.0.1:9000
"#,
        )
        .unwrap();

        assert_eq!(cfg.backend, BackendKind::Local);
        assert_eq!(cfg.local_root, PathBuf::from("/var/lib/blobmark"));
        assert_eq!(cfg.pace_ms, 0);
        assert_eq!(cfg.s3.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert!(!cfg.s3.force_path_style);
        assert_eq!(cfg.source_container, "general");
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_config("\n").unwrap(), Config::default());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            parse_config("backend: azure"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn blank_checkpoint_key_fails_validation() {
        let cfg = Config {
            checkpoint_key: "  ".to_string(),
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("checkpoint_key"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/blobmark.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/blobmark.yaml"));
    }
}
