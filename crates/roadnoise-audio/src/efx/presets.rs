//! Reverb property sets and the bundled preset library.
//!
//! The layout matches the EAX reverb model. Presets are looked up by their
//! full name, e.g. `EFX_REVERB_PRESET_CAVE`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Prefix shared by every bundled preset name.
pub const PRESET_PREFIX: &str = "EFX_REVERB_PRESET_";

/// Upper bound the reverb model accepts for the reflections gain.
pub const MAX_REFLECTIONS_GAIN: f32 = 3.16;

/// Number of interpolated coefficients in a [`ReverbProperties`].
pub const COEFFICIENT_COUNT: usize = 27;

/// A full set of EAX-style reverb coefficients.
///
/// Field names follow the EAX reverb parameters. Gains are linear, times are
/// in seconds, reference frequencies in Hz.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbProperties {
    pub density: f32,
    pub diffusion: f32,
    pub gain: f32,
    pub gain_hf: f32,
    pub gain_lf: f32,
    pub decay_time: f32,
    pub decay_hf_ratio: f32,
    pub decay_lf_ratio: f32,
    pub reflections_gain: f32,
    pub reflections_delay: f32,
    pub reflections_pan: [f32; 3],
    pub late_reverb_gain: f32,
    pub late_reverb_delay: f32,
    pub late_reverb_pan: [f32; 3],
    pub echo_time: f32,
    pub echo_depth: f32,
    pub modulation_time: f32,
    pub modulation_depth: f32,
    pub air_absorption_gain_hf: f32,
    pub hf_reference: f32,
    pub lf_reference: f32,
    pub room_rolloff_factor: f32,
    pub decay_hf_limit: bool,
}

impl Default for ReverbProperties {
    fn default() -> Self {
        Self::from_table(&GENERIC.0, GENERIC.1)
    }
}

impl ReverbProperties {
    /// Build from the 20 scalar coefficients of a preset table row.
    /// Both pan vectors start at zero.
    #[must_use]
    pub const fn from_table(v: &[f32; 20], decay_hf_limit: bool) -> Self {
        Self {
            density: v[0],
            diffusion: v[1],
            gain: v[2],
            gain_hf: v[3],
            gain_lf: v[4],
            decay_time: v[5],
            decay_hf_ratio: v[6],
            decay_lf_ratio: v[7],
            reflections_gain: v[8],
            reflections_delay: v[9],
            reflections_pan: [0.0; 3],
            late_reverb_gain: v[10],
            late_reverb_delay: v[11],
            late_reverb_pan: [0.0; 3],
            echo_time: v[12],
            echo_depth: v[13],
            modulation_time: v[14],
            modulation_depth: v[15],
            air_absorption_gain_hf: v[16],
            hf_reference: v[17],
            lf_reference: v[18],
            room_rolloff_factor: v[19],
            decay_hf_limit,
        }
    }

    /// Flatten into a coefficient vector. The flag is stored as 0.0 or 1.0.
    #[must_use]
    pub fn to_coefficients(&self) -> [f32; COEFFICIENT_COUNT] {
        [
            self.density,
            self.diffusion,
            self.gain,
            self.gain_hf,
            self.gain_lf,
            self.decay_time,
            self.decay_hf_ratio,
            self.decay_lf_ratio,
            self.reflections_gain,
            self.reflections_delay,
            self.reflections_pan[0],
            self.reflections_pan[1],
            self.reflections_pan[2],
            self.late_reverb_gain,
            self.late_reverb_delay,
            self.late_reverb_pan[0],
            self.late_reverb_pan[1],
            self.late_reverb_pan[2],
            self.echo_time,
            self.echo_depth,
            self.modulation_time,
            self.modulation_depth,
            self.air_absorption_gain_hf,
            self.hf_reference,
            self.lf_reference,
            self.room_rolloff_factor,
            if self.decay_hf_limit { 1.0 } else { 0.0 },
        ]
    }

    /// Rebuild from a coefficient vector, rounding the flag.
    #[must_use]
    pub fn from_coefficients(c: &[f32; COEFFICIENT_COUNT]) -> Self {
        Self {
            density: c[0],
            diffusion: c[1],
            gain: c[2],
            gain_hf: c[3],
            gain_lf: c[4],
            decay_time: c[5],
            decay_hf_ratio: c[6],
            decay_lf_ratio: c[7],
            reflections_gain: c[8],
            reflections_delay: c[9],
            reflections_pan: [c[10], c[11], c[12]],
            late_reverb_gain: c[13],
            late_reverb_delay: c[14],
            late_reverb_pan: [c[15], c[16], c[17]],
            echo_time: c[18],
            echo_depth: c[19],
            modulation_time: c[20],
            modulation_depth: c[21],
            air_absorption_gain_hf: c[22],
            hf_reference: c[23],
            lf_reference: c[24],
            room_rolloff_factor: c[25],
            decay_hf_limit: c[26].round() >= 1.0,
        }
    }
}

type PresetRow = ([f32; 20], bool);

// density, diffusion, gain, gain_hf, gain_lf, decay_time, decay_hf_ratio, decay_lf_ratio,
// reflections_gain, reflections_delay, late_reverb_gain, late_reverb_delay, echo_time,
// echo_depth, modulation_time, modulation_depth, air_absorption_gain_hf, hf_reference,
// lf_reference, room_rolloff_factor
const GENERIC: PresetRow = ([1.0, 1.0, 0.3162, 0.8913, 1.0, 1.49, 0.83, 1.0, 0.05, 0.007, 1.2589, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true);

const BUILTIN: &[(&str, PresetRow)] = &[
    ("GENERIC", GENERIC),
    ("PADDEDCELL", ([0.1715, 1.0, 0.3162, 0.001, 1.0, 0.17, 0.1, 1.0, 0.25, 0.001, 1.2691, 0.002, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("ROOM", ([0.4287, 1.0, 0.3162, 0.5929, 1.0, 0.4, 0.83, 1.0, 0.1503, 0.002, 1.0629, 0.003, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("BATHROOM", ([0.1715, 1.0, 0.3162, 0.2512, 1.0, 1.49, 0.54, 1.0, 0.6531, 0.007, 3.2734, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("LIVINGROOM", ([0.9766, 1.0, 0.3162, 0.001, 1.0, 0.5, 0.1, 1.0, 0.2051, 0.003, 0.2805, 0.004, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("STONEROOM", ([1.0, 1.0, 0.3162, 0.7079, 1.0, 2.31, 0.64, 1.0, 0.4411, 0.012, 1.1003, 0.017, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("AUDITORIUM", ([1.0, 1.0, 0.3162, 0.5781, 1.0, 4.32, 0.59, 1.0, 0.4032, 0.02, 0.717, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CONCERTHALL", ([1.0, 1.0, 0.3162, 0.5623, 1.0, 3.92, 0.7, 1.0, 0.2427, 0.02, 0.9977, 0.029, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CAVE", ([1.0, 1.0, 0.3162, 1.0, 1.0, 2.91, 1.3, 1.0, 0.5, 0.015, 0.7063, 0.022, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("ARENA", ([1.0, 1.0, 0.3162, 0.4477, 1.0, 7.24, 0.33, 1.0, 0.2612, 0.02, 1.0186, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("HANGAR", ([1.0, 1.0, 0.3162, 0.3162, 1.0, 10.05, 0.23, 1.0, 0.5, 0.02, 1.256, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CARPETEDHALLWAY", ([0.4287, 1.0, 0.3162, 0.01, 1.0, 0.3, 0.1, 1.0, 0.1215, 0.002, 0.1531, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("HALLWAY", ([0.3645, 1.0, 0.3162, 0.7079, 1.0, 1.49, 0.59, 1.0, 0.2458, 0.007, 1.6615, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("STONECORRIDOR", ([1.0, 1.0, 0.3162, 0.7612, 1.0, 2.7, 0.79, 1.0, 0.2472, 0.013, 1.5758, 0.02, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("ALLEY", ([1.0, 0.3, 0.3162, 0.7328, 1.0, 1.49, 0.86, 1.0, 0.25, 0.007, 0.9954, 0.011, 0.125, 0.95, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("FOREST", ([1.0, 0.3, 0.3162, 0.0224, 1.0, 1.49, 0.54, 1.0, 0.0525, 0.162, 0.7682, 0.088, 0.125, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CITY", ([1.0, 0.5, 0.3162, 0.3981, 1.0, 1.49, 0.67, 1.0, 0.073, 0.007, 0.1427, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("MOUNTAINS", ([1.0, 0.27, 0.3162, 0.0562, 1.0, 1.49, 0.21, 1.0, 0.0407, 0.3, 0.1919, 0.1, 0.25, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("QUARRY", ([1.0, 1.0, 0.3162, 0.3162, 1.0, 1.49, 0.83, 1.0, 0.0, 0.061, 1.7783, 0.025, 0.125, 0.7, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("PLAIN", ([1.0, 0.21, 0.3162, 0.1, 1.0, 1.49, 0.5, 1.0, 0.0585, 0.179, 0.1089, 0.1, 0.25, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("PARKINGLOT", ([1.0, 1.0, 0.3162, 1.0, 1.0, 1.65, 1.5, 1.0, 0.2082, 0.008, 0.2652, 0.012, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("SEWERPIPE", ([0.3071, 0.8, 0.3162, 0.3162, 1.0, 2.81, 0.14, 1.0, 1.6387, 0.014, 3.2471, 0.021, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("UNDERWATER", ([0.3645, 1.0, 0.3162, 0.01, 1.0, 1.49, 0.1, 1.0, 0.5963, 0.007, 7.0795, 0.011, 0.25, 0.0, 1.18, 0.348, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("DRUGGED", ([0.4287, 0.5, 0.3162, 1.0, 1.0, 8.39, 1.39, 1.0, 0.876, 0.002, 3.1081, 0.03, 0.25, 0.0, 0.25, 1.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("DIZZY", ([0.3645, 0.6, 0.3162, 0.631, 1.0, 17.23, 0.56, 1.0, 0.1392, 0.02, 0.4937, 0.03, 0.25, 1.0, 0.81, 0.31, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("PSYCHOTIC", ([0.0625, 0.5, 0.3162, 0.8404, 1.0, 7.56, 0.91, 1.0, 0.4864, 0.02, 2.4378, 0.03, 0.25, 0.0, 4.0, 1.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("CASTLE_SMALLROOM", ([1.0, 0.89, 0.3162, 0.3981, 0.1, 1.22, 0.83, 0.31, 0.8913, 0.022, 1.9953, 0.011, 0.138, 0.08, 0.25, 0.0, 0.9943, 5168.6, 139.5, 0.0], true)),
    ("CASTLE_HALL", ([1.0, 0.81, 0.3162, 0.2818, 0.1778, 3.14, 0.79, 0.62, 0.1778, 0.056, 1.122, 0.024, 0.25, 0.0, 0.25, 0.0, 0.9943, 5168.6, 139.5, 0.0], true)),
    ("CASTLE_COURTYARD", ([1.0, 0.42, 0.3162, 0.4467, 0.1995, 2.13, 0.61, 0.23, 0.2239, 0.16, 0.7079, 0.036, 0.25, 0.37, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("FACTORY_HALL", ([0.4287, 0.75, 0.3162, 0.7079, 0.631, 7.43, 0.51, 1.31, 0.0631, 0.073, 0.8913, 0.027, 0.25, 0.07, 0.25, 0.0, 0.9943, 3762.6, 362.5, 0.0], true)),
    ("FACTORY_ALCOVE", ([0.3645, 0.59, 0.2512, 0.7943, 0.5012, 3.14, 0.65, 1.31, 1.4125, 0.01, 1.0, 0.038, 0.114, 0.1, 0.25, 0.0, 0.9943, 3762.6, 362.5, 0.0], true)),
    ("SPORT_EMPTYSTADIUM", ([1.0, 1.0, 0.3162, 0.4467, 0.7943, 6.26, 0.51, 1.1, 0.0631, 0.183, 0.3981, 0.038, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("SPORT_SQUASHCOURT", ([1.0, 0.75, 0.3162, 0.3162, 0.7943, 2.22, 0.91, 1.16, 0.4467, 0.007, 0.7943, 0.011, 0.126, 0.19, 0.25, 0.0, 0.9943, 7176.9, 211.2, 0.0], true)),
    ("PREFAB_WORKSHOP", ([0.4287, 1.0, 0.3162, 0.1413, 0.3981, 0.76, 1.0, 1.0, 1.0, 0.012, 1.122, 0.012, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("PREFAB_CARAVAN", ([0.4287, 1.0, 0.3162, 0.0891, 0.1259, 0.43, 1.5, 1.0, 1.0, 0.012, 1.9953, 0.012, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("DOME_TOMB", ([1.0, 0.79, 0.3162, 0.3548, 0.2239, 4.18, 0.21, 0.1, 0.3868, 0.03, 1.6788, 0.022, 0.177, 0.19, 0.25, 0.0, 0.9943, 2854.4, 20.0, 0.0], false)),
    ("PIPE_LARGE", ([1.0, 1.0, 0.3162, 0.3548, 0.2239, 8.45, 0.41, 1.0, 0.5012, 0.032, 1.122, 0.047, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("SPACESTATION_HALL", ([0.4287, 0.87, 0.3162, 0.631, 0.5623, 7.11, 0.38, 1.17, 0.3981, 0.035, 1.122, 0.019, 0.25, 0.25, 0.25, 0.0, 0.9943, 3316.1, 458.2, 0.0], true)),
    ("OUTDOORS_BACKYARD", ([1.0, 0.45, 0.3162, 0.2512, 0.5012, 1.12, 0.34, 0.46, 0.4467, 0.069, 0.7079, 0.023, 0.218, 0.34, 0.25, 0.0, 0.9943, 4399.1, 242.9, 0.0], false)),
    ("OUTDOORS_ROLLINGPLAINS", ([1.0, 0.0, 0.3162, 0.0112, 0.631, 2.13, 0.21, 0.46, 0.1778, 0.3, 0.4467, 0.019, 0.25, 1.0, 0.25, 0.0, 0.9943, 4399.1, 242.9, 0.0], false)),
    ("OUTDOORS_DEEPCANYON", ([1.0, 0.74, 0.3162, 0.1778, 0.631, 3.89, 0.21, 0.46, 0.3162, 0.223, 0.3548, 0.019, 0.25, 1.0, 0.25, 0.0, 0.9943, 4399.1, 242.9, 0.0], false)),
    ("OUTDOORS_CREEK", ([1.0, 0.35, 0.3162, 0.1778, 0.5012, 2.13, 0.21, 0.46, 0.3981, 0.115, 0.1995, 0.031, 0.218, 0.34, 0.25, 0.0, 0.9943, 4399.1, 242.9, 0.0], false)),
    ("OUTDOORS_VALLEY", ([1.0, 0.28, 0.3162, 0.0282, 0.1585, 2.88, 0.26, 0.35, 0.1413, 0.263, 0.3981, 0.1, 0.25, 0.34, 0.25, 0.0, 0.9943, 2854.4, 107.5, 0.0], false)),
    ("MOOD_HEAVEN", ([1.0, 0.94, 0.3162, 0.7943, 0.4467, 5.04, 1.12, 0.56, 0.2427, 0.02, 1.2589, 0.029, 0.25, 0.08, 2.742, 0.05, 0.9977, 5000.0, 250.0, 0.0], true)),
    ("MOOD_HELL", ([1.0, 0.57, 0.3162, 0.3548, 0.4467, 3.57, 0.49, 2.0, 0.0, 0.02, 1.4125, 0.03, 0.11, 0.04, 2.109, 0.52, 0.9943, 5000.0, 139.5, 0.0], false)),
    ("MOOD_MEMORY", ([1.0, 0.85, 0.3162, 0.631, 0.3548, 4.06, 0.82, 0.56, 0.0398, 0.0, 1.122, 0.0, 0.25, 0.0, 0.474, 0.45, 0.9886, 5000.0, 250.0, 0.0], false)),
    ("DRIVING_COMMENTATOR", ([1.0, 0.0, 0.3162, 0.5623, 0.5012, 2.42, 0.88, 0.68, 0.1995, 0.093, 0.2512, 0.017, 0.25, 1.0, 0.25, 0.0, 0.9886, 5000.0, 250.0, 0.0], true)),
    ("DRIVING_PITGARAGE", ([0.4287, 0.59, 0.3162, 0.7079, 0.5623, 1.72, 0.93, 0.87, 0.5623, 0.0, 1.2589, 0.016, 0.25, 0.11, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], false)),
    ("DRIVING_INCAR_RACER", ([0.0832, 0.8, 0.3162, 1.0, 0.7943, 0.17, 2.0, 0.41, 1.7783, 0.007, 0.7079, 0.015, 0.25, 0.0, 0.25, 0.0, 0.9943, 10268.2, 251.0, 0.0], true)),
    ("DRIVING_INCAR_SPORTS", ([0.0832, 0.8, 0.3162, 0.631, 1.0, 0.17, 0.75, 0.41, 1.0, 0.01, 0.5623, 0.0, 0.25, 0.0, 0.25, 0.0, 0.9943, 10268.2, 251.0, 0.0], true)),
    ("DRIVING_INCAR_LUXURY", ([0.256, 1.0, 0.3162, 0.1, 0.5012, 0.13, 0.41, 0.46, 0.7943, 0.01, 1.5849, 0.01, 0.25, 0.0, 0.25, 0.0, 0.9943, 10268.2, 251.0, 0.0], true)),
    ("DRIVING_FULLGRANDSTAND", ([1.0, 1.0, 0.3162, 0.2818, 0.631, 3.01, 1.37, 1.28, 0.3548, 0.09, 0.1778, 0.049, 0.25, 0.0, 0.25, 0.0, 0.9943, 10420.2, 250.0, 0.0], false)),
    ("DRIVING_EMPTYGRANDSTAND", ([1.0, 1.0, 0.3162, 1.0, 0.7943, 4.62, 1.75, 1.4, 0.2082, 0.09, 0.2512, 0.049, 0.25, 0.0, 0.25, 0.0, 0.9943, 10420.2, 250.0, 0.0], false)),
    ("DRIVING_TUNNEL", ([1.0, 0.81, 0.3162, 0.3981, 0.8913, 3.42, 0.94, 1.31, 0.7079, 0.051, 0.7079, 0.047, 0.214, 0.05, 0.25, 0.0, 0.9943, 5000.0, 155.3, 0.0], true)),
    ("CITY_STREETS", ([1.0, 0.78, 0.3162, 0.7079, 0.8913, 1.79, 1.12, 0.91, 0.2818, 0.046, 0.1995, 0.028, 0.25, 0.2, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CITY_SUBWAY", ([1.0, 0.74, 0.3162, 0.7079, 0.8913, 3.01, 1.23, 0.91, 0.7079, 0.046, 1.2589, 0.028, 0.125, 0.21, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0], true)),
    ("CITY_MUSEUM", ([1.0, 0.82, 0.3162, 0.1778, 0.1778, 3.28, 1.4, 0.57, 0.2512, 0.039, 0.8913, 0.034, 0.13, 0.17, 0.25, 0.0, 0.9943, 2854.4, 107.5, 0.0], false)),
    ("CITY_LIBRARY", ([1.0, 0.82, 0.3162, 0.2818, 0.0891, 2.76, 0.89, 0.41, 0.3548, 0.029, 0.8913, 0.02, 0.13, 0.17, 0.25, 0.0, 0.9943, 2854.4, 107.5, 0.0], false)),
    ("CITY_UNDERPASS", ([1.0, 0.82, 0.3162, 0.4467, 0.8913, 3.57, 1.12, 0.91, 0.3981, 0.059, 0.8913, 0.037, 0.25, 0.14, 0.25, 0.0, 0.992, 5000.0, 250.0, 0.0], true)),
    ("CITY_ABANDONED", ([1.0, 0.69, 0.3162, 0.7943, 0.8913, 3.28, 1.17, 0.91, 0.4467, 0.044, 0.2818, 0.024, 0.25, 0.2, 0.25, 0.0, 0.9966, 5000.0, 250.0, 0.0], true)),
];

/// Named reverb presets.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: AHashMap<String, ReverbProperties>,
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PresetLibrary {
    /// The bundled presets.
    #[must_use]
    pub fn builtin() -> Self {
        let presets = BUILTIN
            .iter()
            .map(|(name, (values, limit))| {
                (
                    format!("{PRESET_PREFIX}{name}"),
                    ReverbProperties::from_table(values, *limit),
                )
            })
            .collect();
        Self { presets }
    }

    /// Look up a preset by its full name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReverbProperties> {
        self.presets.get(name)
    }

    /// Register or replace a preset.
    pub fn insert(&mut self, name: impl Into<String>, properties: ReverbProperties) {
        self.presets.insert(name.into(), properties);
    }

    /// All preset names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of presets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let lib = PresetLibrary::builtin();
        assert!(lib.len() >= 50);
        let cave = lib.get("EFX_REVERB_PRESET_CAVE").expect("cave");
        assert!((cave.decay_time - 2.91).abs() < 1e-6);
        assert!(!cave.decay_hf_limit);
        assert!(lib.get("EFX_REVERB_PRESET_DRIVING_TUNNEL").is_some());
        assert!(lib.get("CAVE").is_none());
    }

    #[test]
    fn test_default_is_generic() {
        let lib = PresetLibrary::builtin();
        assert_eq!(Some(&ReverbProperties::default()), lib.get("EFX_REVERB_PRESET_GENERIC"));
    }

    #[test]
    fn test_coefficients_preserve_values() {
        let mut props = ReverbProperties::default();
        props.reflections_pan = [0.25, 0.0, -0.5];
        let back = ReverbProperties::from_coefficients(&props.to_coefficients());
        assert_eq!(back, props);
    }

    #[test]
    fn test_flag_rounds() {
        let mut c = ReverbProperties::default().to_coefficients();
        c[COEFFICIENT_COUNT - 1] = 0.6;
        assert!(ReverbProperties::from_coefficients(&c).decay_hf_limit);
        c[COEFFICIENT_COUNT - 1] = 0.4;
        assert!(!ReverbProperties::from_coefficients(&c).decay_hf_limit);
    }

    #[test]
    fn test_names_sorted() {
        let lib = PresetLibrary::builtin();
        let names = lib.names();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert!(names.iter().all(|n| n.starts_with(PRESET_PREFIX)));
    }
}
