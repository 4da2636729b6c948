use crate::models::{BridgeSettings, UserConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment};
use std::fs;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "ConfigBridge Settings.yaml";

/// Environment prefix for overrides, e.g. `CONFIGBRIDGE_SETTINGS__DEBUG_MODE=true`.
pub const ENV_PREFIX: &str = "CONFIGBRIDGE_SETTINGS";

/// Configuration manager for loading and saving the YAML settings file.
///
/// Load order, later layers winning:
/// 1. [`BridgeSettings::default`]
/// 2. `ConfigBridge Settings.yaml` (missing file is fine)
/// 3. `CONFIGBRIDGE_SETTINGS__<FIELD>` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (e.g., "ConfigBridge Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Load the settings file without environment overrides.
    ///
    /// # Returns
    /// The loaded UserConfig, or default if the file doesn't exist
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(UserConfig::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let config: UserConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(config)
    }

    /// Save the settings file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Rewrite the settings file with every field present, defaults filled in.
    ///
    /// Only the file layer is saved; environment overrides never are.
    pub fn write_file_settings(&self) -> Result<UserConfig> {
        let config = self.load_user_config()?;
        self.save_user_config(&config)?;
        Ok(config)
    }

    /// Effective settings: file (or defaults) with process environment overrides.
    pub fn load_settings(&self) -> Result<BridgeSettings> {
        let file_settings = self.load_user_config()?.settings;
        apply_overrides(&file_settings, settings_environment())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Environment source for `CONFIGBRIDGE_SETTINGS__<FIELD>` variables.
///
/// List fields take comma separated values. Scalars are parsed into
/// numbers and booleans where they look like one.
pub fn settings_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("steam_userdata_paths")
        .with_list_parse_key("config_subdirs")
}

/// Layer `environment` over `base` and deserialize the result.
pub fn apply_overrides(base: &BridgeSettings, environment: Environment) -> Result<BridgeSettings> {
    let base = Config::try_from(base).context("Failed to convert settings into config layer")?;

    let settings: BridgeSettings = Config::builder()
        .add_source(base)
        .add_source(environment)
        .build()
        .context("Failed to build layered settings")?
        .try_deserialize()
        .context("Invalid settings override in environment")?;

    Ok(settings)
}
