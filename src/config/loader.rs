use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::MintflowConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["mintflow.toml", "config/mintflow.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// 显式路径必须存在；未指定时依次查找默认路径，均不存在则使用内置默认值。
pub fn load_config(path: Option<PathBuf>) -> Result<MintflowConfig, ConfigError> {
    if let Some(explicit) = path {
        return try_load_file(&explicit)?.ok_or(ConfigError::Missing(explicit));
    }

    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if let Some(config) = try_load_file(&candidate)? {
            return Ok(config);
        }
    }

    Ok(MintflowConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<MintflowConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: MintflowConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&config).map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!(target: "config", path = %path.display(), "已加载配置文件");

    Ok(Some(config))
}

fn validate(config: &MintflowConfig) -> Result<(), String> {
    if config.network.confirm_max_attempts == 0 {
        return Err("network.confirm_max_attempts 必须大于 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    #[test]
    fn loads_explicit_file() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("mintflow.toml");
        fs::write(
            &path,
            r#"
                [network]
                rpc_url = "http://127.0.0.1:8899"

                [token]
                initial_supply = "42"

                [logging]
                json = true
            "#,
        )
        .expect("write config");

        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.token.initial_supply, Decimal::from(42));
        assert!(config.logging.json);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("absent.toml");
        assert!(matches!(
            load_config(Some(path.clone())),
            Err(ConfigError::Missing(missing)) if missing == path
        ));
    }

    #[test]
    fn malformed_file_reports_path() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("broken.toml");
        fs::write(&path, "[token\ndecimals = ").expect("write config");
        match load_config(Some(path.clone())) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_confirm_attempts_is_rejected() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("mintflow.toml");
        fs::write(&path, "[network]\nconfirm_max_attempts = 0\n").expect("write config");
        match load_config(Some(path.clone())) {
            Err(ConfigError::Invalid { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bundled_template_parses_to_defaults() {
        let template = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/mintflow.toml"));
        let config: MintflowConfig = toml::from_str(template).expect("parse template");
        assert_eq!(config, MintflowConfig::default());
    }
}
