//! Environmental acoustics.
//!
//! - [`presets`]: reverb coefficient sets and the bundled library
//! - [`reverb`]: effect variants per reverb engine and preset interpolation
//! - [`reflections`]: early reflection pan, delay and gain from raycasts
//! - [`obstruction`]: low-pass filtering of blocked direct paths

pub mod obstruction;
pub mod presets;
pub mod reflections;
pub mod reverb;

pub use obstruction::{is_obstructed, ObstructionState, OBSTRUCTION_GAIN, OBSTRUCTION_GAIN_HF};
pub use presets::{PresetLibrary, ReverbProperties, PRESET_PREFIX};
pub use reflections::EarlyReflections;
pub use reverb::{ReverbEffect, ReverbInterpolator, StandardReverb, INTERPOLATION_TIME};

/// Air absorption factor in air.
pub const AIR_ABSORPTION_AIR: f32 = 1.0;

/// Air absorption factor under water.
pub const AIR_ABSORPTION_WATER: f32 = 0.00668;

/// Speed of sound under water, in metres per second.
pub const SPEED_OF_SOUND_WATER: f32 = 1522.0;
