use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{Result, WizardError},
    submission::DEFAULT_REFERENCE_PREFIX,
    utils::persistence::{read_optional, write_atomic},
};

pub const HOME_ENV_VAR: &str = "ADMISSION_WIZARD_HOME";
const APP_DIR_NAME: &str = "admission_wizard";
const CONFIG_FILE_NAME: &str = "config.json";

/// User-tunable settings for a wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Where the draft store lives. Defaults to the resolved base directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "WizardConfig::default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
    #[serde(default = "WizardConfig::default_reference_prefix")]
    pub reference_prefix: String,
    #[serde(default = "WizardConfig::default_color_enabled")]
    pub color_enabled: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            autosave_interval_secs: Self::default_autosave_interval_secs(),
            reference_prefix: Self::default_reference_prefix(),
            color_enabled: Self::default_color_enabled(),
        }
    }
}

impl WizardConfig {
    pub fn default_autosave_interval_secs() -> u64 {
        30
    }

    pub fn default_reference_prefix() -> String {
        DEFAULT_REFERENCE_PREFIX.into()
    }

    pub fn default_color_enabled() -> bool {
        true
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    pub fn resolve_data_dir(&self, base: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| base.to_path_buf())
    }
}

/// Base directory for config and store files.
///
/// `ADMISSION_WIZARD_HOME` wins, then the platform data directory, then `./.admission_wizard`.
pub fn resolve_base_dir() -> PathBuf {
    if let Some(home) = env::var_os(HOME_ENV_VAR).filter(|value| !value.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR_NAME)))
}

/// Handles persistence for [`WizardConfig`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn with_base_dir(base: &Path) -> Self {
        Self::new(base.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(&self) -> Result<WizardConfig> {
        match read_optional(&self.path)? {
            Some(data) => serde_json::from_str(&data).map_err(|err| {
                WizardError::Config(format!("{}: {}", self.path.display(), err))
            }),
            None => Ok(WizardConfig::default()),
        }
    }

    pub fn save(&self, config: &WizardConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| WizardError::Config(err.to_string()))?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let manager = ConfigManager::with_base_dir(dir.path());
        let config = manager.load().expect("load");
        assert_eq!(config, WizardConfig::default());
        assert_eq!(config.autosave_interval(), Duration::from_secs(30));
        assert_eq!(config.reference_prefix, "APP");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let manager = ConfigManager::with_base_dir(dir.path());
        let config = WizardConfig {
            data_dir: Some(dir.path().join("drafts")),
            autosave_interval_secs: 5,
            reference_prefix: "ADM".into(),
            color_enabled: false,
        };
        manager.save(&config).expect("save");
        assert_eq!(manager.load().expect("load"), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let manager = ConfigManager::with_base_dir(dir.path());
        fs::write(manager.path(), r#"{ "color_enabled": false }"#).expect("seed");
        let config = manager.load().expect("load");
        assert!(!config.color_enabled);
        assert_eq!(config.autosave_interval_secs, 30);
        assert_eq!(config.resolve_data_dir(dir.path()), dir.path());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempdir().expect("tempdir");
        let manager = ConfigManager::with_base_dir(dir.path());
        fs::write(manager.path(), "{").expect("seed");
        assert!(matches!(manager.load(), Err(WizardError::Config(_))));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = WizardConfig {
            autosave_interval_secs: 0,
            ..WizardConfig::default()
        };
        assert_eq!(config.autosave_interval(), Duration::from_secs(1));
    }
}
