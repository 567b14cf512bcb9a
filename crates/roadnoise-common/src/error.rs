//! Error types for the roadnoise audio engine.

use std::path::PathBuf;
use thiserror::Error;

/// The scarce resource a capacity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityKind {
    /// PCM buffer cache slots.
    Buffers,
    /// Logical audio sources.
    Sources,
    /// Trigger index slots for one trigger kind.
    TriggerIndex,
    /// Gain index slots for one modulator kind.
    GainIndex,
    /// Pitch index slots for one modulator kind.
    PitchIndex,
    /// Sounds in a single soundscript template.
    TemplateSounds,
}

impl std::fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Buffers => "buffers",
            Self::Sources => "sources",
            Self::TriggerIndex => "trigger index",
            Self::GainIndex => "gain index",
            Self::PitchIndex => "pitch index",
            Self::TemplateSounds => "template sounds",
        };
        f.write_str(name)
    }
}

/// Top-level error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The output device could not be opened.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The engine is in the disabled state.
    #[error("Audio engine is disabled")]
    Disabled,

    /// An asset could not be decoded.
    #[error("Failed to decode '{path}': {reason}")]
    DecodeFailed {
        /// Asset path.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// An asset could not be opened or read.
    #[error("Failed to read '{path}': {source}")]
    IoFailed {
        /// Asset path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A fixed-capacity table is full.
    #[error("Capacity exceeded for {kind} (max: {max})")]
    CapacityExceeded {
        /// Which table overflowed.
        kind: CapacityKind,
        /// Its capacity.
        max: usize,
    },

    /// No soundscript template with this name is registered.
    #[error("Unknown soundscript template '{0}'")]
    UnknownTemplate(String),

    /// The template cannot be instantiated (base template).
    #[error("Soundscript template '{0}' has no trigger source")]
    InvalidTemplate(String),

    /// The underlying audio API reported an error.
    #[error("Audio API error in {context}: {message}")]
    Api {
        /// Operation that failed.
        context: &'static str,
        /// API message.
        message: String,
    },
}

impl AudioError {
    /// Creates an API error.
    pub fn api(context: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            context,
            message: message.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key is not one of the recognised `audio.*` names.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Value could not be parsed for the key.
    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Reading or writing the configuration file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type alias for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
