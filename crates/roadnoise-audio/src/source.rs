//! Logical audio sources and the audibility function.

use glam::Vec3;
use roadnoise_common::ActorId;

use crate::buffer_cache::BufferId;

/// Distance beyond which a source is inaudible.
pub const MAX_DISTANCE: f32 = 500.0;

/// Distance under which a source plays at full gain.
pub const REFERENCE_DISTANCE: f32 = 7.5;

/// Inverse-distance rolloff.
pub const ROLLOFF_FACTOR: f32 = 1.0;

/// Handle to a source owned by the voice manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u32);

impl SourceId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index in the manager's source array.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What changed on a source. Selects the hardware fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// Playback was requested.
    Play,
    /// Playback was stopped.
    Stop,
    /// Gain changed.
    Gain,
    /// Loop flag changed.
    Loop,
    /// Pitch changed.
    Pitch,
    /// Position changed.
    Position,
    /// Velocity changed.
    Velocity,
    /// Enabled flag changed.
    Enable,
}

/// A logical sound.
///
/// Sources are unbounded in number. Only the most audible ones hold one of
/// the hardware voices at any time.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub(crate) buffer: BufferId,
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) gain: f32,
    pub(crate) pitch: f32,
    pub(crate) looping: bool,
    pub(crate) enabled: bool,
    pub(crate) should_play: bool,
    pub(crate) audibility: f32,
    pub(crate) voice: Option<usize>,
    pub(crate) owner: ActorId,
    pub(crate) obstructed: bool,
}

impl AudioSource {
    pub(crate) fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            gain: 1.0,
            pitch: 1.0,
            looping: false,
            enabled: true,
            should_play: false,
            audibility: 0.0,
            voice: None,
            owner: ActorId::UNKNOWN,
            obstructed: false,
        }
    }

    /// Buffer played by this source.
    #[must_use]
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Gain in `[0, 1]`.
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Pitch multiplier.
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Whether the source loops.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the source is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether playback has been requested and not finished.
    #[must_use]
    pub fn should_play(&self) -> bool {
        self.should_play
    }

    /// Cached audibility.
    #[must_use]
    pub fn audibility(&self) -> f32 {
        self.audibility
    }

    /// Index of the hardware voice, if one is assigned.
    #[must_use]
    pub fn voice(&self) -> Option<usize> {
        self.voice
    }

    /// Actor owning this source.
    #[must_use]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// Whether the direct path was obstructed on the last tick.
    #[must_use]
    pub fn is_obstructed(&self) -> bool {
        self.obstructed
    }

    /// Audibility relative to a listener at `listener`.
    #[must_use]
    pub fn compute_audibility(&self, listener: Vec3) -> f32 {
        if !self.enabled || !self.should_play || self.gain == 0.0 {
            return 0.0;
        }
        attenuate(self.gain, self.position.distance(listener))
    }
}

/// Inverse-distance clamped attenuation of `gain` at `distance`.
#[must_use]
pub fn attenuate(gain: f32, distance: f32) -> f32 {
    if distance >= MAX_DISTANCE {
        return 0.0;
    }
    if distance <= REFERENCE_DISTANCE {
        return gain;
    }
    gain * REFERENCE_DISTANCE / (REFERENCE_DISTANCE + ROLLOFF_FACTOR * (distance - REFERENCE_DISTANCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(gain: f32, position: Vec3) -> AudioSource {
        let mut s = AudioSource::new(BufferId::new(0));
        s.gain = gain;
        s.position = position;
        s.should_play = true;
        s
    }

    #[test]
    fn test_reference_distance_is_full_gain() {
        assert_eq!(attenuate(0.8, REFERENCE_DISTANCE), 0.8);
        assert_eq!(attenuate(0.8, 0.0), 0.8);
    }

    #[test]
    fn test_max_distance_is_silent() {
        assert_eq!(attenuate(1.0, MAX_DISTANCE), 0.0);
        assert_eq!(attenuate(1.0, MAX_DISTANCE * 2.0), 0.0);
    }

    #[test]
    fn test_just_inside_max_distance() {
        let eps = 0.01;
        let d = MAX_DISTANCE - eps;
        let expected =
            REFERENCE_DISTANCE / (REFERENCE_DISTANCE + ROLLOFF_FACTOR * (MAX_DISTANCE - REFERENCE_DISTANCE - eps));
        assert!((attenuate(1.0, d) - expected).abs() < 1e-6);
        assert!(attenuate(1.0, d) > 0.0);
    }

    #[test]
    fn test_inverse_distance() {
        // 7.5 / (7.5 + 7.5) = 0.5
        assert!((attenuate(1.0, 15.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_flags_silence_source() {
        let s = playing(1.0, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(s.compute_audibility(Vec3::ZERO), 1.0);

        let mut off = s.clone();
        off.enabled = false;
        assert_eq!(off.compute_audibility(Vec3::ZERO), 0.0);

        let mut idle = s.clone();
        idle.should_play = false;
        assert_eq!(idle.compute_audibility(Vec3::ZERO), 0.0);

        let mut mute = s;
        mute.gain = 0.0;
        assert_eq!(mute.compute_audibility(Vec3::ZERO), 0.0);
    }
}
