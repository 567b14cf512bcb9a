//! Audio configuration.
//!
//! Settings can come from three places, applied in this order:
//! 1. A TOML file whose `[audio]` table holds the keys below
//! 2. Registry-style `audio.*` key/value pairs (see [`AudioConfig::set`])
//! 3. Environment variables named after the key, e.g. `AUDIO_MASTER_VOLUME`

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Hardware voice limit.
pub const MAX_HARDWARE_VOICES: usize = 32;

/// Default speed of sound in air at 20 degrees celsius (m/s).
pub const DEFAULT_SPEED_OF_SOUND: f32 = 343.3;

/// Default listener reverb preset name.
pub const DEFAULT_LISTENER_PRESET: &str = "EFX_REVERB_PRESET_GENERIC";

/// Every recognised configuration key.
pub const CONFIG_KEYS: [&str; 12] = [
    "audio.device_name",
    "audio.master_volume",
    "audio.enable_efx",
    "audio.efx_reverb_engine",
    "audio.enable_obstruction",
    "audio.enable_reflection_panning",
    "audio.doppler_factor",
    "audio.speed_of_sound",
    "audio.default_listener_efx_preset",
    "audio.force_listener_efx_preset",
    "audio.engine_controls_environmental_audio",
    "audio.max_voices",
];

/// Which reverb model the EFX path drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EfxReverbEngine {
    /// No reverb effect.
    #[serde(rename = "NONE")]
    None,
    /// Standard reverb (no reflection panning, echo or modulation).
    #[serde(rename = "REVERB")]
    Reverb,
    /// EAX-style reverb with the full parameter set.
    #[default]
    #[serde(rename = "EAXREVERB")]
    EaxReverb,
}

impl EfxReverbEngine {
    /// Name used in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Reverb => "REVERB",
            Self::EaxReverb => "EAXREVERB",
        }
    }
}

impl FromStr for EfxReverbEngine {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "REVERB" => Ok(Self::Reverb),
            "EAXREVERB" => Ok(Self::EaxReverb),
            _ => Err(()),
        }
    }
}

/// Audio engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Preferred output device ("" = system default).
    pub device_name: String,
    /// Master volume (0.0 - 1.0).
    pub master_volume: f32,
    /// Enable the environmental effects extension.
    pub enable_efx: bool,
    /// Reverb model used when EFX is enabled.
    pub efx_reverb_engine: EfxReverbEngine,
    /// Low-pass the direct path of sounds blocked by geometry.
    pub enable_obstruction: bool,
    /// Pan early reflections towards nearby surfaces.
    pub enable_reflection_panning: bool,
    /// Global Doppler factor.
    pub doppler_factor: f32,
    /// Speed of sound in metres per second.
    pub speed_of_sound: f32,
    /// Reverb preset used for the listener when nothing else applies.
    pub default_listener_efx_preset: String,
    /// Reverb preset forced on the listener ("" = none).
    pub force_listener_efx_preset: String,
    /// Let the engine pick the listener environment from the scene.
    pub engine_controls_environmental_audio: bool,
    /// Number of hardware voices to request.
    pub max_voices: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            master_volume: 1.0,
            enable_efx: true,
            efx_reverb_engine: EfxReverbEngine::EaxReverb,
            enable_obstruction: false,
            enable_reflection_panning: false,
            doppler_factor: 1.0,
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            default_listener_efx_preset: DEFAULT_LISTENER_PRESET.to_string(),
            force_listener_efx_preset: String::new(),
            engine_controls_environmental_audio: true,
            max_voices: MAX_HARDWARE_VOICES,
        }
    }
}

/// On-disk layout: everything lives under an `[audio]` table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    audio: AudioConfig,
}

impl AudioConfig {
    /// Load configuration from a file.
    /// Returns defaults if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Audio config {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded audio config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse audio config: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read audio config: {e}");
                Self::default()
            },
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        let mut config = file.audio;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = toml::to_string_pretty(&ConfigFile {
            audio: self.clone(),
        })?;
        fs::write(path, contents).map_err(io_err)?;

        info!("Saved audio config to {}", path.display());
        Ok(())
    }

    /// Set a value by its registry key (e.g. `audio.master_volume`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();

        match key {
            "audio.device_name" => self.device_name = value.to_string(),
            "audio.master_volume" => self.master_volume = value.parse().map_err(|_| invalid())?,
            "audio.enable_efx" => self.enable_efx = parse_bool(value).ok_or_else(invalid)?,
            "audio.efx_reverb_engine" => {
                self.efx_reverb_engine = value.parse().map_err(|()| invalid())?;
            },
            "audio.enable_obstruction" => {
                self.enable_obstruction = parse_bool(value).ok_or_else(invalid)?;
            },
            "audio.enable_reflection_panning" => {
                self.enable_reflection_panning = parse_bool(value).ok_or_else(invalid)?;
            },
            "audio.doppler_factor" => self.doppler_factor = value.parse().map_err(|_| invalid())?,
            "audio.speed_of_sound" => self.speed_of_sound = value.parse().map_err(|_| invalid())?,
            "audio.default_listener_efx_preset" => {
                self.default_listener_efx_preset = value.to_string();
            },
            "audio.force_listener_efx_preset" => {
                self.force_listener_efx_preset = value.to_string();
            },
            "audio.engine_controls_environmental_audio" => {
                self.engine_controls_environmental_audio =
                    parse_bool(value).ok_or_else(invalid)?;
            },
            "audio.max_voices" => self.max_voices = value.parse().map_err(|_| invalid())?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        self.validate();
        Ok(())
    }

    /// Get a value by its registry key, formatted as text.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "audio.device_name" => self.device_name.clone(),
            "audio.master_volume" => self.master_volume.to_string(),
            "audio.enable_efx" => self.enable_efx.to_string(),
            "audio.efx_reverb_engine" => self.efx_reverb_engine.name().to_string(),
            "audio.enable_obstruction" => self.enable_obstruction.to_string(),
            "audio.enable_reflection_panning" => self.enable_reflection_panning.to_string(),
            "audio.doppler_factor" => self.doppler_factor.to_string(),
            "audio.speed_of_sound" => self.speed_of_sound.to_string(),
            "audio.default_listener_efx_preset" => self.default_listener_efx_preset.clone(),
            "audio.force_listener_efx_preset" => self.force_listener_efx_preset.clone(),
            "audio.engine_controls_environmental_audio" => {
                self.engine_controls_environmental_audio.to_string()
            },
            "audio.max_voices" => self.max_voices.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Apply overrides from `(NAME, value)` pairs, where `NAME` is the key
    /// upper-cased with dots replaced by underscores.
    /// Unparsable values are skipped with a warning.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(key) = CONFIG_KEYS
                .iter()
                .find(|key| env_name(key) == name.as_ref())
            else {
                continue;
            };
            match self.set(key, value.as_ref()) {
                Ok(()) => debug!("Audio config override {key} = {}", value.as_ref()),
                Err(e) => warn!("Ignoring override: {e}"),
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.doppler_factor = self.doppler_factor.max(0.0);
        if self.speed_of_sound.is_nan() || self.speed_of_sound <= 0.0 {
            self.speed_of_sound = DEFAULT_SPEED_OF_SOUND;
        }
        self.max_voices = self.max_voices.clamp(1, MAX_HARDWARE_VOICES);
    }

    /// Whether the environmental acoustics pipeline should run at all.
    #[must_use]
    pub fn efx_active(&self) -> bool {
        self.enable_efx && self.efx_reverb_engine != EfxReverbEngine::None
    }
}

/// Environment variable name for a configuration key.
#[must_use]
pub fn env_name(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
