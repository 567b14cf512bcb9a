//! Headless backend.
//!
//! Keeps a software mirror of everything a real device would hold and
//! advances playback time on [`AudioBackend::advance`], so one-shot voices
//! finish on their own. Used by tests and the simulation binary.

use glam::Vec3;
use roadnoise_common::{AudioError, AudioResult};
use tracing::{debug, info};

use super::{
    AudioBackend, BufferHandle, EfxExtension, EffectSlotHandle, FilterHandle, Listener, VoiceHandle,
    VoiceState,
};
use crate::efx::reverb::ReverbEffect;
use crate::wav::PcmData;

/// Mirrored state of one hardware voice.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessVoice {
    /// Bound buffer.
    pub buffer: Option<BufferHandle>,
    /// Gain.
    pub gain: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Loop flag.
    pub looping: bool,
    /// World position.
    pub position: Vec3,
    /// World velocity.
    pub velocity: Vec3,
    /// Reference distance of the distance model.
    pub reference_distance: f32,
    /// Max distance of the distance model.
    pub max_distance: f32,
    /// Rolloff of the distance model.
    pub rolloff: f32,
    /// Playback state.
    pub state: VoiceState,
    /// Seconds of buffer consumed since the last play.
    pub elapsed: f32,
    /// Number of play calls.
    pub play_count: u32,
    /// Number of stop calls.
    pub stop_count: u32,
    /// Direct-path filter.
    pub filter: Option<FilterHandle>,
    /// Auxiliary send.
    pub aux_send: Option<EffectSlotHandle>,
    /// Air absorption factor.
    pub air_absorption: f32,
}

impl Default for HeadlessVoice {
    fn default() -> Self {
        Self {
            buffer: None,
            gain: 1.0,
            pitch: 1.0,
            looping: false,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            reference_distance: 1.0,
            max_distance: f32::MAX,
            rolloff: 1.0,
            state: VoiceState::Initial,
            elapsed: 0.0,
            play_count: 0,
            stop_count: 0,
            filter: None,
            aux_send: None,
            air_absorption: 0.0,
        }
    }
}

/// Low-pass filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessFilter {
    /// Broadband gain.
    pub gain: f32,
    /// High-frequency gain.
    pub gain_hf: f32,
}

/// Software stand-in for an audio device.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    name: String,
    voice_limit: usize,
    efx_supported: bool,
    fail_effect_slots: bool,
    voices: Vec<HeadlessVoice>,
    buffer_durations: Vec<f32>,
    slots: Vec<Option<ReverbEffect>>,
    filters: Vec<HeadlessFilter>,
    listener: Listener,
    listener_gain: f32,
    doppler_factor: f32,
    speed_of_sound: f32,
}

impl HeadlessBackend {
    /// A device with `voice_limit` voices and EFX support.
    pub fn new(voice_limit: usize) -> Self {
        info!("Headless audio device initialized ({voice_limit} voices)");
        Self {
            name: "headless".to_string(),
            voice_limit,
            efx_supported: true,
            fail_effect_slots: false,
            voices: Vec::new(),
            buffer_durations: Vec::new(),
            slots: Vec::new(),
            filters: Vec::new(),
            listener: Listener::default(),
            listener_gain: 1.0,
            doppler_factor: 1.0,
            speed_of_sound: 343.3,
        }
    }

    /// A device that yields no voices at all.
    pub fn disconnected() -> Self {
        let mut backend = Self::new(0);
        backend.name = "disconnected".to_string();
        backend.efx_supported = false;
        backend
    }

    /// A device without the EFX extension.
    pub fn without_efx(voice_limit: usize) -> Self {
        let mut backend = Self::new(voice_limit);
        backend.efx_supported = false;
        backend
    }

    /// Make effect slot creation fail, leaving filters working.
    #[must_use]
    pub fn with_failing_effect_slots(mut self) -> Self {
        self.fail_effect_slots = true;
        self
    }

    /// All allocated voices, in handle order.
    #[must_use]
    pub fn voices(&self) -> &[HeadlessVoice] {
        &self.voices
    }

    /// One voice by handle.
    #[must_use]
    pub fn voice(&self, voice: VoiceHandle) -> Option<&HeadlessVoice> {
        self.voices.get(voice.0 as usize)
    }

    /// Number of uploaded buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffer_durations.len()
    }

    /// Effect currently loaded in a slot.
    #[must_use]
    pub fn slot_effect(&self, slot: EffectSlotHandle) -> Option<&ReverbEffect> {
        self.slots.get(slot.0 as usize).and_then(Option::as_ref)
    }

    /// Number of effect slots created.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Parameters of a filter.
    #[must_use]
    pub fn filter(&self, filter: FilterHandle) -> Option<HeadlessFilter> {
        self.filters.get(filter.0 as usize).copied()
    }

    /// Last listener pose.
    #[must_use]
    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Global listener gain.
    #[must_use]
    pub fn listener_gain(&self) -> f32 {
        self.listener_gain
    }

    /// Global doppler factor.
    #[must_use]
    pub fn doppler_factor(&self) -> f32 {
        self.doppler_factor
    }

    /// Global speed of sound.
    #[must_use]
    pub fn speed_of_sound(&self) -> f32 {
        self.speed_of_sound
    }

    /// Voices currently playing.
    #[must_use]
    pub fn playing_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.state == VoiceState::Playing)
            .count()
    }

    fn voice_mut(&mut self, voice: VoiceHandle) -> Option<&mut HeadlessVoice> {
        self.voices.get_mut(voice.0 as usize)
    }
}

impl AudioBackend for HeadlessBackend {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn generate_voices(&mut self, requested: usize) -> Vec<VoiceHandle> {
        let available = self.voice_limit.saturating_sub(self.voices.len());
        let count = requested.min(available);
        let first = self.voices.len();
        self.voices
            .extend(std::iter::repeat_with(HeadlessVoice::default).take(count));
        debug!("Generated {count} of {requested} requested voices");
        (first..first + count).map(|i| VoiceHandle(i as u32)).collect()
    }

    fn create_buffer(&mut self, pcm: &PcmData) -> AudioResult<BufferHandle> {
        let handle = BufferHandle(self.buffer_durations.len() as u32);
        self.buffer_durations.push(pcm.duration_secs());
        Ok(handle)
    }

    fn set_voice_buffer(&mut self, voice: VoiceHandle, buffer: BufferHandle) {
        if let Some(v) = self.voice_mut(voice) {
            v.buffer = Some(buffer);
            v.state = VoiceState::Initial;
            v.elapsed = 0.0;
        }
    }

    fn set_voice_gain(&mut self, voice: VoiceHandle, gain: f32) {
        if let Some(v) = self.voice_mut(voice) {
            v.gain = gain;
        }
    }

    fn set_voice_pitch(&mut self, voice: VoiceHandle, pitch: f32) {
        if let Some(v) = self.voice_mut(voice) {
            v.pitch = pitch;
        }
    }

    fn set_voice_looping(&mut self, voice: VoiceHandle, looping: bool) {
        if let Some(v) = self.voice_mut(voice) {
            v.looping = looping;
        }
    }

    fn set_voice_position(&mut self, voice: VoiceHandle, position: Vec3) {
        if let Some(v) = self.voice_mut(voice) {
            v.position = position;
        }
    }

    fn set_voice_velocity(&mut self, voice: VoiceHandle, velocity: Vec3) {
        if let Some(v) = self.voice_mut(voice) {
            v.velocity = velocity;
        }
    }

    fn set_voice_distance_model(&mut self, voice: VoiceHandle, reference: f32, max: f32, rolloff: f32) {
        if let Some(v) = self.voice_mut(voice) {
            v.reference_distance = reference;
            v.max_distance = max;
            v.rolloff = rolloff;
        }
    }

    fn voice_play(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voice_mut(voice) {
            v.state = VoiceState::Playing;
            v.elapsed = 0.0;
            v.play_count += 1;
        }
    }

    fn voice_stop(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voice_mut(voice) {
            v.state = VoiceState::Stopped;
            v.stop_count += 1;
        }
    }

    fn voice_state(&self, voice: VoiceHandle) -> VoiceState {
        self.voice(voice).map_or(VoiceState::Stopped, |v| v.state)
    }

    fn set_listener(&mut self, listener: &Listener) {
        self.listener = *listener;
    }

    fn set_listener_gain(&mut self, gain: f32) {
        self.listener_gain = gain;
    }

    fn set_doppler_factor(&mut self, factor: f32) {
        self.doppler_factor = factor;
    }

    fn set_speed_of_sound(&mut self, speed: f32) {
        self.speed_of_sound = speed;
    }

    fn advance(&mut self, dt: f32) {
        let durations = &self.buffer_durations;
        for v in &mut self.voices {
            if v.state != VoiceState::Playing || v.looping {
                continue;
            }
            v.elapsed += dt * v.pitch.max(0.0);
            let duration = v
                .buffer
                .and_then(|b| durations.get(b.0 as usize).copied())
                .unwrap_or(0.0);
            if v.elapsed >= duration {
                v.state = VoiceState::Stopped;
            }
        }
    }

    fn efx(&mut self) -> Option<&mut dyn EfxExtension> {
        if self.efx_supported {
            Some(self)
        } else {
            None
        }
    }
}

impl EfxExtension for HeadlessBackend {
    fn create_effect_slot(&mut self) -> AudioResult<EffectSlotHandle> {
        if self.fail_effect_slots {
            return Err(AudioError::api("create_effect_slot", "out of effect slots"));
        }
        self.slots.push(None);
        Ok(EffectSlotHandle(self.slots.len() as u32 - 1))
    }

    fn load_reverb(&mut self, slot: EffectSlotHandle, effect: &ReverbEffect) -> AudioResult<()> {
        let entry = self
            .slots
            .get_mut(slot.0 as usize)
            .ok_or_else(|| AudioError::api("load_reverb", format!("invalid slot {}", slot.0)))?;
        *entry = Some(effect.clone());
        Ok(())
    }

    fn clear_slot(&mut self, slot: EffectSlotHandle) {
        if let Some(entry) = self.slots.get_mut(slot.0 as usize) {
            *entry = None;
        }
    }

    fn create_lowpass_filter(&mut self, gain: f32, gain_hf: f32) -> AudioResult<FilterHandle> {
        self.filters.push(HeadlessFilter { gain, gain_hf });
        Ok(FilterHandle(self.filters.len() as u32 - 1))
    }

    fn set_direct_filter(&mut self, voice: VoiceHandle, filter: Option<FilterHandle>) {
        if let Some(v) = self.voice_mut(voice) {
            v.filter = filter;
        }
    }

    fn set_aux_send(&mut self, voice: VoiceHandle, slot: Option<EffectSlotHandle>) {
        if let Some(v) = self.voice_mut(voice) {
            v.aux_send = slot;
        }
    }

    fn set_air_absorption(&mut self, voice: VoiceHandle, factor: f32) {
        if let Some(v) = self.voice_mut(voice) {
            v.air_absorption = factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::{PcmData, PcmFormat};

    fn half_second() -> PcmData {
        PcmData {
            format: PcmFormat {
                channels: 1,
                sample_rate: 1000,
                bits_per_sample: 16,
            },
            samples: vec![0; 500],
        }
    }

    #[test]
    fn test_voice_limit() {
        let mut backend = HeadlessBackend::new(4);
        assert_eq!(backend.generate_voices(3).len(), 3);
        assert_eq!(backend.generate_voices(3).len(), 1);
        assert!(backend.generate_voices(1).is_empty());
        assert!(HeadlessBackend::disconnected().generate_voices(32).is_empty());
    }

    #[test]
    fn test_one_shot_finishes() {
        let mut backend = HeadlessBackend::new(1);
        let voice = backend.generate_voices(1)[0];
        let buffer = backend.create_buffer(&half_second()).expect("buffer");
        backend.set_voice_buffer(voice, buffer);
        backend.voice_play(voice);
        backend.advance(0.25);
        assert_eq!(backend.voice_state(voice), VoiceState::Playing);
        backend.advance(0.25);
        assert_eq!(backend.voice_state(voice), VoiceState::Stopped);
    }

    #[test]
    fn test_looping_never_finishes() {
        let mut backend = HeadlessBackend::new(1);
        let voice = backend.generate_voices(1)[0];
        let buffer = backend.create_buffer(&half_second()).expect("buffer");
        backend.set_voice_buffer(voice, buffer);
        backend.set_voice_looping(voice, true);
        backend.voice_play(voice);
        backend.advance(10.0);
        assert_eq!(backend.voice_state(voice), VoiceState::Playing);
    }

    #[test]
    fn test_efx_availability() {
        assert!(HeadlessBackend::new(1).efx().is_some());
        assert!(HeadlessBackend::without_efx(1).efx().is_none());

        let mut failing = HeadlessBackend::new(1).with_failing_effect_slots();
        let efx = failing.efx().expect("efx");
        assert!(efx.create_effect_slot().is_err());
        assert!(efx.create_lowpass_filter(0.33, 0.25).is_ok());
    }
}
