use crate::models::UserConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Prefix of environment variables overriding configuration values,
/// e.g. `COSTSHEET_RATES__EXCHANGE_RATE=37.2`
pub const ENV_PREFIX: &str = "COSTSHEET";

/// Configuration manager for the YAML settings file.
///
/// Settings are layered: built-in defaults, then `CostSheet Config.yaml`, then
/// `COSTSHEET_*` environment variables. Only [`save_user_config`](Self::save_user_config)
/// ever writes the file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "CostSheet Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join("CostSheet Config.yaml"),
            config_dir,
        })
    }

    /// Load the user configuration including environment overrides.
    ///
    /// # Returns
    /// The merged UserConfig; defaults fill anything not set
    pub fn load_user_config(&self) -> Result<UserConfig> {
        self.load_with_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load the user configuration with a caller-supplied environment source.
    ///
    /// Exposed so tests can inject variables without touching the process environment.
    pub fn load_with_environment(&self, environment: Environment) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
        }

        let settings = Config::builder()
            .add_source(
                File::from(self.user_config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!("Loaded user config from {}", self.user_config_path);
        Ok(config)
    }

    /// Save the user configuration file.
    ///
    /// # Arguments
    /// * `config` - The UserConfig to save
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the path of the YAML settings file.
    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.user_config_path().as_str().ends_with("CostSheet Config.yaml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let config = manager.load_with_environment(no_env()).unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn test_load_save_user_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = UserConfig::default();
        config.rates.exchange_rate = 37.25;
        manager.save_user_config(&config).unwrap();

        let loaded = manager.load_with_environment(no_env()).unwrap();
        assert_eq!(loaded.rates.exchange_rate, 37.25);
        assert_eq!(loaded.rates.shipping_rate, 50000.0);
    }

    #[test]
    fn test_output_dir_survives_save() {
        let (manager, temp_dir) = create_test_config_manager();
        let exports = Utf8PathBuf::try_from(temp_dir.path().join("exports")).unwrap();

        let mut config = UserConfig::default();
        config.export.output_dir = Some(exports.clone());
        manager.save_user_config(&config).unwrap();

        let loaded = manager.load_with_environment(no_env()).unwrap();
        assert_eq!(loaded.export.output_dir, Some(exports));
    }
}
