//! Reverb effect variants and smooth transitions between presets.

use roadnoise_common::EfxReverbEngine;
use serde::{Deserialize, Serialize};

use super::presets::{ReverbProperties, COEFFICIENT_COUNT};

/// Time constant of the preset interpolation, in seconds.
pub const INTERPOLATION_TIME: f32 = 0.333;

/// Parameters of the standard (non-EAX) reverb effect.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardReverb {
    pub density: f32,
    pub diffusion: f32,
    pub gain: f32,
    pub gain_hf: f32,
    pub decay_time: f32,
    pub decay_hf_ratio: f32,
    pub reflections_gain: f32,
    pub reflections_delay: f32,
    pub late_reverb_gain: f32,
    pub late_reverb_delay: f32,
    pub air_absorption_gain_hf: f32,
    pub room_rolloff_factor: f32,
    pub decay_hf_limit: bool,
}

impl From<&ReverbProperties> for StandardReverb {
    fn from(p: &ReverbProperties) -> Self {
        Self {
            density: p.density,
            diffusion: p.diffusion,
            gain: p.gain,
            gain_hf: p.gain_hf,
            decay_time: p.decay_time,
            decay_hf_ratio: p.decay_hf_ratio,
            reflections_gain: p.reflections_gain,
            reflections_delay: p.reflections_delay,
            late_reverb_gain: p.late_reverb_gain,
            late_reverb_delay: p.late_reverb_delay,
            air_absorption_gain_hf: p.air_absorption_gain_hf,
            room_rolloff_factor: p.room_rolloff_factor,
            decay_hf_limit: p.decay_hf_limit,
        }
    }
}

/// The effect loaded into the listener's effect slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReverbEffect {
    /// Standard reverb, no panning.
    Standard(StandardReverb),
    /// EAX reverb with reflection and late reverb panning.
    Eax(ReverbProperties),
}

impl ReverbEffect {
    /// Build the effect for a reverb engine. `None` when reverb is off.
    #[must_use]
    pub fn for_engine(engine: EfxReverbEngine, properties: &ReverbProperties) -> Option<Self> {
        match engine {
            EfxReverbEngine::None => None,
            EfxReverbEngine::Reverb => Some(Self::Standard(properties.into())),
            EfxReverbEngine::EaxReverb => Some(Self::Eax(*properties)),
        }
    }

    /// Reflections gain of either variant.
    #[must_use]
    pub fn reflections_gain(&self) -> f32 {
        match self {
            Self::Standard(r) => r.reflections_gain,
            Self::Eax(r) => r.reflections_gain,
        }
    }
}

/// Moves the active reverb coefficients towards a target preset.
///
/// Each step closes a fraction `min(dt / INTERPOLATION_TIME, 1)` of the
/// remaining distance on every coefficient.
#[derive(Debug, Clone, Default)]
pub struct ReverbInterpolator {
    current: Option<[f32; COEFFICIENT_COUNT]>,
    target: Option<ReverbProperties>,
}

impl ReverbInterpolator {
    /// Creates an interpolator with no reverb.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preset to move towards. `None` turns reverb off.
    pub fn set_target(&mut self, target: Option<ReverbProperties>) {
        self.target = target;
    }

    /// The preset being approached.
    #[must_use]
    pub fn target(&self) -> Option<&ReverbProperties> {
        self.target.as_ref()
    }

    /// Raw coefficients, with the flag not yet rounded.
    #[must_use]
    pub fn coefficients(&self) -> Option<&[f32; COEFFICIENT_COUNT]> {
        self.current.as_ref()
    }

    /// Current properties.
    #[must_use]
    pub fn current(&self) -> Option<ReverbProperties> {
        self.current.as_ref().map(ReverbProperties::from_coefficients)
    }

    /// Advance by `dt` seconds and return the new properties.
    ///
    /// Without a target the state is cleared. The first step after a dry
    /// period jumps straight to the target.
    pub fn step(&mut self, dt: f32) -> Option<ReverbProperties> {
        let Some(target) = self.target else {
            self.current = None;
            return None;
        };
        let target = target.to_coefficients();

        let alpha = (dt / INTERPOLATION_TIME).clamp(0.0, 1.0);
        if self.current.is_none() || alpha >= 1.0 {
            self.current = Some(target);
            return self.current();
        }

        if let Some(current) = self.current.as_mut() {
            for (c, t) in current.iter_mut().zip(target) {
                *c += (t - *c) * alpha;
            }
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efx::presets::PresetLibrary;
    use proptest::prelude::*;

    fn preset(name: &str) -> ReverbProperties {
        *PresetLibrary::builtin()
            .get(&format!("EFX_REVERB_PRESET_{name}"))
            .expect("preset")
    }

    fn max_relative_gap(interp: &ReverbInterpolator, from: &ReverbProperties, to: &ReverbProperties) -> f32 {
        let c = interp.coefficients().expect("active");
        let a = from.to_coefficients();
        let b = to.to_coefficients();
        c.iter()
            .zip(a.iter().zip(b.iter()))
            .filter(|(_, (a, b))| a != b)
            .map(|(c, (a, b))| (c - b).abs() / (a - b).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_engine_variants() {
        let p = preset("CAVE");
        assert!(ReverbEffect::for_engine(EfxReverbEngine::None, &p).is_none());
        assert!(matches!(
            ReverbEffect::for_engine(EfxReverbEngine::Reverb, &p),
            Some(ReverbEffect::Standard(_))
        ));
        assert_eq!(
            ReverbEffect::for_engine(EfxReverbEngine::EaxReverb, &p),
            Some(ReverbEffect::Eax(p))
        );
    }

    #[test]
    fn test_first_step_snaps() {
        let mut interp = ReverbInterpolator::new();
        interp.set_target(Some(preset("CAVE")));
        assert_eq!(interp.step(0.016), Some(preset("CAVE")));
    }

    #[test]
    fn test_no_target_clears() {
        let mut interp = ReverbInterpolator::new();
        interp.set_target(Some(preset("CAVE")));
        interp.step(0.016);
        interp.set_target(None);
        assert_eq!(interp.step(0.016), None);
        assert!(interp.coefficients().is_none());
    }

    #[test]
    fn test_generic_to_cave_convergence() {
        let generic = preset("GENERIC");
        let cave = preset("CAVE");
        let mut interp = ReverbInterpolator::new();
        interp.set_target(Some(generic));
        interp.step(0.0);
        interp.set_target(Some(cave));

        let dt = INTERPOLATION_TIME / 10.0;
        for _ in 0..10 {
            interp.step(dt);
        }
        assert!(max_relative_gap(&interp, &generic, &cave) <= 0.37);

        for _ in 0..40 {
            interp.step(dt);
        }
        assert!(max_relative_gap(&interp, &generic, &cave) <= 0.01);
    }

    #[test]
    fn test_large_step_reaches_target() {
        let mut interp = ReverbInterpolator::new();
        interp.set_target(Some(preset("GENERIC")));
        interp.step(0.0);
        interp.set_target(Some(preset("FOREST")));
        assert_eq!(interp.step(1.0), Some(preset("FOREST")));
    }

    proptest! {
        #[test]
        fn prop_step_contracts(
            from in 0usize..20,
            to in 0usize..20,
            dt in 0.0f32..INTERPOLATION_TIME,
        ) {
            let lib = PresetLibrary::builtin();
            let names = lib.names();
            let a = *lib.get(names[from]).expect("a");
            let b = *lib.get(names[to]).expect("b");

            let mut interp = ReverbInterpolator::new();
            interp.set_target(Some(a));
            interp.step(0.0);
            let before = *interp.coefficients().expect("current");
            interp.set_target(Some(b));
            interp.step(dt);
            let after = interp.coefficients().expect("current");

            let factor = 1.0 - dt / INTERPOLATION_TIME;
            for ((old, new), target) in before.iter().zip(after).zip(b.to_coefficients()) {
                let bound = factor * (old - target).abs();
                prop_assert!((new - target).abs() <= bound + bound.abs() * 1e-5 + 1e-3);
            }
        }
    }
}
