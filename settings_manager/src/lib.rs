//! Configuration management for earshot
//!
//! Settings are read from a TOML file and overridden by `EARSHOT_*`
//! environment variables (nested keys joined with `__`, e.g.
//! `EARSHOT_SPATIALIZER__SPEED_OF_SOUND=340`).

use audio::EngineConfig;
use config::{Config, Environment, File, FileFormat};
use dsp_core::kernel::KernelParameters;
use dsp_core::Error;
use filter::EqualizerParameters;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use spatial::SpatializerConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "EARSHOT";

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sample rate in Hz, fixed for a session
    pub sample_rate: u32,

    /// Frames per processing block
    pub block_size: usize,

    /// Output channels; the spatializer needs at least two
    pub channels: usize,

    /// Frames pulled from a source per resampler refill
    pub pull_buffer_frames: usize,

    /// Delay line capacity per ear, in samples
    pub max_delay_samples: usize,

    /// Parameter snapshots queued per node
    pub parameter_queue_capacity: usize,

    /// Events queued between the audio thread and the control plane
    pub event_queue_capacity: usize,

    /// Period of scheduled parameter updates, in milliseconds
    pub kernel_update_ms: u64,

    pub spatializer: SpatializerConfig,

    pub equalizer: EqualizerParameters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: dsp_core::SAMPLE_RATE,
            block_size: dsp_core::BLOCK_SIZE,
            channels: dsp_core::CHANNELS,
            pull_buffer_frames: 1025,
            max_delay_samples: 8192,
            parameter_queue_capacity: 16,
            event_queue_capacity: 64,
            kernel_update_ms: 20,
            spatializer: SpatializerConfig::default(),
            equalizer: EqualizerParameters::default(),
        }
    }
}

impl Settings {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if !(8000..=192_000).contains(&self.sample_rate) {
            return Err(Error::Config(format!(
                "sample_rate {} is outside 8000..=192000",
                self.sample_rate
            )));
        }
        if self.block_size == 0 {
            return Err(Error::Config("block_size must be positive".to_string()));
        }
        if self.channels < 2 {
            return Err(Error::Config(format!(
                "channels must be at least 2, got {}",
                self.channels
            )));
        }
        if self.pull_buffer_frames < 2 {
            return Err(Error::Config("pull_buffer_frames must be at least 2".to_string()));
        }
        if self.max_delay_samples <= self.block_size {
            return Err(Error::Config(format!(
                "max_delay_samples ({}) must exceed block_size ({})",
                self.max_delay_samples, self.block_size
            )));
        }
        if self.parameter_queue_capacity == 0 || self.event_queue_capacity == 0 {
            return Err(Error::Config("queue capacities must be positive".to_string()));
        }
        if self.kernel_update_ms == 0 {
            return Err(Error::Config("kernel_update_ms must be positive".to_string()));
        }

        let spatializer = &self.spatializer;
        if !(spatializer.speed_of_sound > 0.0)
            || !(spatializer.reference_distance > 0.0)
            || !(spatializer.absorption_distance > 0.0)
            || !(spatializer.max_filter_frequency > 0.0)
        {
            return Err(Error::Config(
                "spatializer distances, speed and frequency must be positive".to_string(),
            ));
        }

        self.equalizer
            .validate(self.sample_rate)
            .map_err(|e| Error::Config(format!("equalizer: {}", e)))
    }

    /// Engine shape and queue sizes
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            channels: self.channels,
            parameter_queue_capacity: self.parameter_queue_capacity,
            event_queue_capacity: self.event_queue_capacity,
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    settings: Settings,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Load `<config dir>/earshot/config.toml`, falling back to defaults
    pub fn new() -> Result<Self, Error> {
        let mut config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Failed to determine config directory".to_string()))?;
        config_dir.push("earshot");

        Self::with_file(config_dir.join("config.toml"))
    }

    /// Create a ConfigManager backed by a custom file path
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::load(path, None)
    }

    /// Like [`with_file`](Self::with_file), with environment variables taken
    /// from `env` instead of the process
    pub fn load<P: AsRef<Path>>(
        path: P,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, Error> {
        let config_file = path.as_ref().to_path_buf();
        if !config_file.exists() {
            debug!("Config file {:?} not found, using defaults", config_file);
        }

        let settings = Self::load_layered(&config_file, env)?;
        settings.validate()?;
        info!("Loaded settings from {:?}", config_file);

        Ok(Self {
            settings,
            config_file,
        })
    }

    fn load_layered(path: &Path, env: Option<HashMap<String, String>>) -> Result<Settings, Error> {
        let mut builder = Config::builder();
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
            builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to the config file
    pub fn save(&self) -> Result<(), Error> {
        let toml = toml::to_string_pretty(&self.settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        // Ensure parent directory exists
        if let Some(parent) = self.config_file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        fs::write(&self.config_file, toml)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        debug!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    /// Get the current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings after validating them
    pub fn update_settings(&mut self, new_settings: Settings) -> Result<(), Error> {
        new_settings.validate()?;
        self.settings = new_settings;
        Ok(())
    }

    /// Current settings as pretty TOML
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(&self.settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter::FilterType;
    use spatial::CombineMode;
    use tempfile::tempdir;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.block_size, 1024);
        assert_eq!(settings.channels, 2);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.engine_config().block_size, 1024);
    }

    #[test]
    fn inconsistent_sizes_are_rejected() {
        let small_delay = Settings {
            max_delay_samples: 512,
            ..Default::default()
        };
        assert!(small_delay.validate().is_err());

        let mono = Settings {
            channels: 1,
            ..Default::default()
        };
        assert!(mono.validate().is_err());

        let mut bad_eq = Settings::default();
        bad_eq.equalizer.q = 0.0;
        assert!(bad_eq.validate().is_err());
    }

    #[test]
    fn save_and_load() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = ConfigManager::load(&config_path, no_env()).unwrap();
        let mut settings = config.settings().clone();
        settings.block_size = 512;
        settings.spatializer.combine_mode = CombineMode::Cascade;
        settings.equalizer.filter_type = FilterType::Highshelf;
        config.update_settings(settings.clone()).unwrap();

        config.save().unwrap();
        assert!(config_path.exists());

        let loaded = ConfigManager::load(&config_path, no_env()).unwrap();
        assert_eq!(loaded.settings(), &settings);
    }

    #[test]
    fn file_not_found_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let nonexistent_path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigManager::load(&nonexistent_path, no_env()).unwrap();
        assert_eq!(config.settings(), &Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "block_size = 256\n\n[spatializer]\npropagation_delay = true\n",
        )
        .unwrap();

        let config = ConfigManager::load(&config_path, no_env()).unwrap();
        assert_eq!(config.settings().block_size, 256);
        assert!(config.settings().spatializer.propagation_delay);
        assert_eq!(config.settings().spatializer.speed_of_sound, 343.0);
        assert_eq!(config.settings().sample_rate, 48000);
    }

    #[test]
    fn environment_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "sample_rate = 44100\n").unwrap();

        let env = HashMap::from([
            ("EARSHOT_SAMPLE_RATE".to_string(), "96000".to_string()),
            (
                "EARSHOT_SPATIALIZER__SPEED_OF_SOUND".to_string(),
                "340".to_string(),
            ),
        ]);
        let config = ConfigManager::load(&config_path, Some(env)).unwrap();
        assert_eq!(config.settings().sample_rate, 96000);
        assert_eq!(config.settings().spatializer.speed_of_sound, 340.0);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "block_size = \"lots\"\n").unwrap();

        assert!(matches!(
            ConfigManager::load(&config_path, no_env()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn settings_print_as_toml() {
        let temp_dir = tempdir().unwrap();
        let config = ConfigManager::load(temp_dir.path().join("none.toml"), no_env()).unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("sample_rate = 48000"));
        assert!(text.contains("[spatializer]"));
    }
}
