use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "pixshop";
const APP_CONFIG_FILE: &str = "config.json";
const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub device_pixel_ratio: Option<f64>,
}

impl AppConfig {
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .unwrap_or(1.0)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

/// First non-empty API key among the supported environment variables.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "pixshop",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/pixshop/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("pixshop", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/pixshop/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("pixshop", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn load_reads_overrides_from_xdg_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(APP_CONFIG_FILE),
            r#"{ "model": "custom-image-model", "request_timeout_secs": 30, "device_pixel_ratio": 2.0 }"#,
        )
        .unwrap();

        let config = load_app_config_with(Some(root.path()), None);
        assert_eq!(config.model.as_deref(), Some("custom-image-model"));
        assert_eq!(config.request_timeout_secs, Some(30));
        assert_eq!(config.device_pixel_ratio(), 2.0);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn load_falls_back_to_defaults_on_invalid_json() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(APP_CONFIG_FILE), "{ not json").unwrap();

        let config = load_app_config_with(Some(root.path()), None);
        assert!(config.model.is_none());
        assert_eq!(config.device_pixel_ratio(), 1.0);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let root = tempfile::tempdir().unwrap();
        let config = load_app_config_with(Some(root.path()), None);
        assert!(config.export_dir.is_none());
    }

    #[test]
    fn device_pixel_ratio_rejects_non_positive_values() {
        let config = AppConfig {
            device_pixel_ratio: Some(-1.0),
            ..AppConfig::default()
        };
        assert_eq!(config.device_pixel_ratio(), 1.0);
    }
}
