//! The underlying 3D audio API as a capability object.
//!
//! [`AudioBackend`] covers the device, voices, buffers and listener.
//! [`EfxExtension`] is the optional environmental effects table, queried
//! once at start-up through [`AudioBackend::efx`].

pub mod headless;
#[cfg(feature = "rodio-backend")]
pub mod rodio;

use glam::Vec3;
use roadnoise_common::AudioResult;

use crate::efx::reverb::ReverbEffect;
use crate::wav::PcmData;

/// Opaque hardware voice handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub u32);

/// Opaque PCM buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Opaque auxiliary effect slot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectSlotHandle(pub u32);

/// Opaque filter handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub u32);

/// Playback state reported for a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// Never played since the buffer was bound.
    #[default]
    Initial,
    /// Currently producing sound.
    Playing,
    /// Stopped, either explicitly or because a one-shot ended.
    Stopped,
}

/// Listener pose written to the API every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    /// World position.
    pub position: Vec3,
    /// Unit forward vector.
    pub forward: Vec3,
    /// Unit up vector.
    pub up: Vec3,
    /// World velocity, used for doppler.
    pub velocity: Vec3,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            velocity: Vec3::ZERO,
        }
    }
}

/// Core 3D audio API.
pub trait AudioBackend {
    /// Human readable device name.
    fn device_name(&self) -> &str;

    /// Allocate up to `requested` voices. Fewer may be returned.
    fn generate_voices(&mut self, requested: usize) -> Vec<VoiceHandle>;

    /// Upload PCM data.
    fn create_buffer(&mut self, pcm: &PcmData) -> AudioResult<BufferHandle>;

    /// Bind a buffer to a voice. The voice must be stopped.
    fn set_voice_buffer(&mut self, voice: VoiceHandle, buffer: BufferHandle);

    /// Per-voice gain.
    fn set_voice_gain(&mut self, voice: VoiceHandle, gain: f32);

    /// Per-voice pitch multiplier.
    fn set_voice_pitch(&mut self, voice: VoiceHandle, pitch: f32);

    /// Per-voice loop flag.
    fn set_voice_looping(&mut self, voice: VoiceHandle, looping: bool);

    /// Per-voice world position.
    fn set_voice_position(&mut self, voice: VoiceHandle, position: Vec3);

    /// Per-voice world velocity.
    fn set_voice_velocity(&mut self, voice: VoiceHandle, velocity: Vec3);

    /// Distance attenuation parameters.
    fn set_voice_distance_model(&mut self, voice: VoiceHandle, reference: f32, max: f32, rolloff: f32);

    /// Start playback from the beginning.
    fn voice_play(&mut self, voice: VoiceHandle);

    /// Stop playback.
    fn voice_stop(&mut self, voice: VoiceHandle);

    /// Current playback state.
    fn voice_state(&self, voice: VoiceHandle) -> VoiceState;

    /// Listener pose.
    fn set_listener(&mut self, listener: &Listener);

    /// Global listener gain.
    fn set_listener_gain(&mut self, gain: f32);

    /// Global doppler factor.
    fn set_doppler_factor(&mut self, factor: f32);

    /// Global speed of sound in metres per second.
    fn set_speed_of_sound(&mut self, speed: f32);

    /// Let time pass. Real devices play on their own and ignore this.
    fn advance(&mut self, _dt: f32) {}

    /// Environmental effects, if the device supports them.
    fn efx(&mut self) -> Option<&mut dyn EfxExtension> {
        None
    }
}

/// Environmental effects API.
pub trait EfxExtension {
    /// Create an auxiliary effect slot.
    fn create_effect_slot(&mut self) -> AudioResult<EffectSlotHandle>;

    /// Load reverb parameters into a slot.
    fn load_reverb(&mut self, slot: EffectSlotHandle, effect: &ReverbEffect) -> AudioResult<()>;

    /// Detach any effect from a slot.
    fn clear_slot(&mut self, slot: EffectSlotHandle);

    /// Create a low-pass filter.
    fn create_lowpass_filter(&mut self, gain: f32, gain_hf: f32) -> AudioResult<FilterHandle>;

    /// Attach or detach the direct-path filter of a voice.
    fn set_direct_filter(&mut self, voice: VoiceHandle, filter: Option<FilterHandle>);

    /// Route a voice to an effect slot, or disconnect it.
    fn set_aux_send(&mut self, voice: VoiceHandle, slot: Option<EffectSlotHandle>);

    /// Per-voice air absorption factor.
    fn set_air_absorption(&mut self, voice: VoiceHandle, factor: f32);
}
