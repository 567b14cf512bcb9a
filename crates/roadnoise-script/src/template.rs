//! Soundscript templates.
//!
//! A template is immutable once its block has been parsed. Instances share
//! it and read sound names, pitches and modulation factors from it.

use thiserror::Error;

use crate::kinds::{parse_modulator, ModulatorKind, TriggerKind};

/// Maximum number of `sound` entries per template.
pub const MAX_SOUNDS_PER_TEMPLATE: usize = 16;

/// A rejected attribute line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// Blank line.
    #[error("empty attribute")]
    Empty,

    /// Known key with too few values.
    #[error("'{0}' is missing values")]
    MissingValue(String),

    /// Key not recognised.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// Unrecognised trigger name.
    #[error("unknown trigger source '{0}'")]
    UnknownTrigger(String),

    /// Unrecognised modulator name.
    #[error("unknown modulation source '{0}'")]
    UnknownModulator(String),

    /// The sound list is full.
    #[error("too many sounds (max: {MAX_SOUNDS_PER_TEMPLATE})")]
    TooManySounds,

    /// Pitched sounds must be listed in strictly increasing pitch.
    #[error("sound pitch {pitch} does not exceed the previous pitch {previous}")]
    PitchNotIncreasing {
        /// Pitch of the previous entry.
        previous: f32,
        /// Rejected pitch.
        pitch: f32,
    },
}

/// Maps a raw modulator value `v` to `square·v² + multiplier·v + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polynomial {
    /// Constant term.
    pub offset: f32,
    /// Linear term.
    pub multiplier: f32,
    /// Quadratic term.
    pub square: f32,
}

impl Default for Polynomial {
    fn default() -> Self {
        Self {
            offset: 0.0,
            multiplier: 1.0,
            square: 0.0,
        }
    }
}

impl Polynomial {
    /// Evaluate at `v`.
    #[must_use]
    pub fn eval(&self, v: f32) -> f32 {
        v * v * self.square + v * self.multiplier + self.offset
    }
}

/// One sound file with the engine pitch it was recorded at.
///
/// A nominal pitch of 0 marks an unpitched sample: it always plays at full
/// pitch gain and never has its pitch changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEntry {
    /// Asset name.
    pub file: String,
    /// Nominal pitch, 0 when unpitched.
    pub pitch: f32,
}

impl SoundEntry {
    /// Whether the sample follows the pitch modulator.
    #[must_use]
    pub fn is_pitched(&self) -> bool {
        self.pitch != 0.0
    }
}

/// A parsed soundscript block.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundScriptTemplate {
    name: String,
    file_name: String,
    group: Option<String>,
    base: bool,

    trigger: Option<TriggerKind>,
    gain_source: Option<ModulatorKind>,
    gain_factors: Polynomial,
    pitch_source: Option<ModulatorKind>,
    pitch_factors: Polynomial,
    unpitchable: bool,

    sounds: Vec<SoundEntry>,
    start_sound: Option<SoundEntry>,
    stop_sound: Option<SoundEntry>,
}

// unparsable numbers (e.g. "unpitched") read as 0
fn parse_real(s: &str) -> f32 {
    s.parse().unwrap_or(0.0)
}

impl SoundScriptTemplate {
    /// Creates an empty template.
    #[must_use]
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, group: Option<&str>, base: bool) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            group: group.map(str::to_string),
            base,
            trigger: None,
            gain_source: None,
            gain_factors: Polynomial::default(),
            pitch_source: None,
            pitch_factors: Polynomial::default(),
            unpitchable: false,
            sounds: Vec::new(),
            start_sound: None,
            stop_sound: None,
        }
    }

    /// Creates a template that starts from the attributes of `base`.
    #[must_use]
    pub fn derived_from(base: &Self, name: impl Into<String>, file_name: impl Into<String>, group: Option<&str>) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            group: group.map(str::to_string),
            base: false,
            ..base.clone()
        }
    }

    /// Apply one attribute line, already split into tokens.
    pub fn set_parameter(&mut self, params: &[&str]) -> Result<(), AttributeError> {
        let Some((&key, values)) = params.split_first() else {
            return Err(AttributeError::Empty);
        };
        let missing = || AttributeError::MissingValue(key.to_string());

        match key {
            "trigger_source" => {
                let name = values.first().ok_or_else(missing)?;
                let kind = TriggerKind::from_name(name).ok_or_else(|| AttributeError::UnknownTrigger(name.to_string()))?;
                self.trigger = Some(kind);
            },
            "gain_source" | "pitch_source" => {
                let name = values.first().ok_or_else(missing)?;
                let kind = parse_modulator(name).ok_or_else(|| AttributeError::UnknownModulator(name.to_string()))?;
                if key == "gain_source" {
                    self.gain_source = kind;
                } else {
                    self.pitch_source = kind;
                }
            },
            "gain_factors" | "pitch_factors" => {
                if values.len() < 2 {
                    return Err(missing());
                }
                let factors = if key == "gain_factors" {
                    &mut self.gain_factors
                } else {
                    &mut self.pitch_factors
                };
                factors.offset = parse_real(values[0]);
                factors.multiplier = parse_real(values[1]);
                if let Some(square) = values.get(2) {
                    factors.square = parse_real(square);
                }
            },
            "start_sound" | "stop_sound" => {
                let [pitch, file, ..] = values else {
                    return Err(missing());
                };
                let entry = SoundEntry {
                    file: (*file).to_string(),
                    pitch: parse_real(pitch),
                };
                if key == "start_sound" {
                    self.start_sound = Some(entry);
                } else {
                    self.stop_sound = Some(entry);
                }
            },
            "sound" => {
                let [pitch, file, ..] = values else {
                    return Err(missing());
                };
                self.push_sound(parse_real(pitch), file)?;
            },
            "unpitchable" => self.unpitchable = true,
            _ => return Err(AttributeError::UnknownAttribute(key.to_string())),
        }
        Ok(())
    }

    fn push_sound(&mut self, pitch: f32, file: &str) -> Result<(), AttributeError> {
        if self.sounds.len() >= MAX_SOUNDS_PER_TEMPLATE {
            return Err(AttributeError::TooManySounds);
        }
        if pitch == 0.0 {
            self.unpitchable = true;
        }
        if let Some(previous) = self.sounds.last() {
            if !self.unpitchable && pitch <= previous.pitch {
                return Err(AttributeError::PitchNotIncreasing {
                    previous: previous.pitch,
                    pitch,
                });
            }
        }
        self.sounds.push(SoundEntry {
            file: file.to_string(),
            pitch,
        });
        Ok(())
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Soundscript file the template came from.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Resource group of the soundscript file.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Whether the template was loaded in base mode.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.base
    }

    /// Bound trigger. `None` marks a template that supplies defaults only.
    #[must_use]
    pub fn trigger(&self) -> Option<TriggerKind> {
        self.trigger
    }

    /// Modulator driving gain.
    #[must_use]
    pub fn gain_source(&self) -> Option<ModulatorKind> {
        self.gain_source
    }

    /// Modulator driving pitch. Always `None` for unpitchable templates.
    #[must_use]
    pub fn pitch_source(&self) -> Option<ModulatorKind> {
        if self.unpitchable {
            None
        } else {
            self.pitch_source
        }
    }

    /// Gain polynomial.
    #[must_use]
    pub fn gain_factors(&self) -> Polynomial {
        self.gain_factors
    }

    /// Pitch polynomial.
    #[must_use]
    pub fn pitch_factors(&self) -> Polynomial {
        self.pitch_factors
    }

    /// Whether pitch modulation is ignored.
    #[must_use]
    pub fn is_unpitchable(&self) -> bool {
        self.unpitchable
    }

    /// Looped sounds in declaration order.
    #[must_use]
    pub fn sounds(&self) -> &[SoundEntry] {
        &self.sounds
    }

    /// Sound played once on start.
    #[must_use]
    pub fn start_sound(&self) -> Option<&SoundEntry> {
        self.start_sound.as_ref()
    }

    /// Sound played once on stop.
    #[must_use]
    pub fn stop_sound(&self) -> Option<&SoundEntry> {
        self.stop_sound.as_ref()
    }

    /// Gain for a raw modulator value, clamped to `[0, 1]`.
    #[must_use]
    pub fn gain_for(&self, value: f32) -> f32 {
        self.gain_factors.eval(value).clamp(0.0, 1.0)
    }

    /// Pitch for a raw modulator value, never negative.
    #[must_use]
    pub fn pitch_for(&self, value: f32) -> f32 {
        self.pitch_factors.eval(value).max(0.0)
    }
}
