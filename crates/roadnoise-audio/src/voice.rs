//! Voice manager.
//!
//! Owns every logical [`AudioSource`] and the bounded pool of hardware
//! voices. After any public call the pool holds the most audible sources:
//!
//! - a source holds a voice iff the voice points back at it
//! - at most `voice_count()` sources hold a voice
//! - a source with zero audibility holds no voice
//! - no unassigned audible source is louder than an assigned one
//!
//! Ties keep the incumbent so equal sources do not thrash.

use glam::Vec3;
use roadnoise_common::{
    ActorId, AudioConfig, AudioError, AudioResult, CapacityKind, EfxReverbEngine, MAX_HARDWARE_VOICES,
};
use tracing::{debug, error, info, warn};

use crate::assets::AssetLoader;
use crate::backend::{AudioBackend, EffectSlotHandle, FilterHandle, Listener, VoiceHandle, VoiceState};
use crate::buffer_cache::{BufferCache, BufferId};
use crate::efx::obstruction::{is_obstructed, ObstructionState, OBSTRUCTION_GAIN, OBSTRUCTION_GAIN_HF};
use crate::efx::presets::{PresetLibrary, ReverbProperties};
use crate::efx::reflections::EarlyReflections;
use crate::efx::reverb::{ReverbEffect, ReverbInterpolator};
use crate::efx::AIR_ABSORPTION_AIR;
use crate::scene::AcousticScene;
use crate::source::{AudioSource, ChangeReason, SourceId, MAX_DISTANCE, REFERENCE_DISTANCE, ROLLOFF_FACTOR};

/// Maximum number of logical sources.
pub const MAX_SOURCES: usize = 8192;

#[derive(Debug)]
struct EfxState {
    engine: EfxReverbEngine,
    slot: Option<EffectSlotHandle>,
    lowpass: Option<FilterHandle>,
    reflections: bool,
    interpolator: ReverbInterpolator,
    slot_loaded: bool,
    load_error_logged: bool,
}

/// Multiplexes sources onto hardware voices and drives the acoustics.
#[derive(Debug)]
pub struct VoiceManager<B: AudioBackend> {
    backend: B,
    enabled: bool,
    voices: Vec<VoiceHandle>,
    voice_sources: Vec<Option<SourceId>>,
    voice_filters: Vec<ObstructionState>,
    voices_in_use: usize,
    sources: Vec<AudioSource>,
    buffers: BufferCache,
    presets: PresetLibrary,
    listener: Listener,
    master_volume: f32,
    paused: bool,
    speed_of_sound: f32,
    air_absorption: f32,
    environment: Option<ReverbProperties>,
    efx: Option<EfxState>,
    sources_full_logged: bool,
}

impl<B: AudioBackend> VoiceManager<B> {
    /// Take ownership of a backend and allocate the voice pool.
    ///
    /// A backend that yields no voices leaves the manager disabled: every
    /// call becomes a no-op.
    pub fn new(mut backend: B, config: &AudioConfig) -> Self {
        let requested = config.max_voices.clamp(1, MAX_HARDWARE_VOICES);
        let voices = backend.generate_voices(requested);
        let enabled = !voices.is_empty();

        if enabled {
            info!(
                "Audio device '{}' initialized with {} voices",
                backend.device_name(),
                voices.len()
            );
        } else {
            warn!(
                "{}",
                AudioError::DeviceUnavailable(format!("'{}' provides no voices, sound disabled", backend.device_name()))
            );
        }

        for &voice in &voices {
            backend.set_voice_distance_model(voice, REFERENCE_DISTANCE, MAX_DISTANCE, ROLLOFF_FACTOR);
        }

        let master_volume = config.master_volume.clamp(0.0, 1.0);
        if enabled {
            backend.set_doppler_factor(config.doppler_factor);
            backend.set_speed_of_sound(config.speed_of_sound);
            backend.set_listener_gain(master_volume);
        }

        let efx = if enabled && config.enable_efx {
            Self::init_efx(&mut backend, config)
        } else {
            None
        };

        let voice_count = voices.len();
        Self {
            backend,
            enabled,
            voices,
            voice_sources: vec![None; voice_count],
            voice_filters: vec![ObstructionState::Unfiltered; voice_count],
            voices_in_use: 0,
            sources: Vec::new(),
            buffers: BufferCache::default(),
            presets: PresetLibrary::builtin(),
            listener: Listener::default(),
            master_volume,
            paused: false,
            speed_of_sound: config.speed_of_sound,
            air_absorption: AIR_ABSORPTION_AIR,
            environment: None,
            efx,
            sources_full_logged: false,
        }
    }

    fn init_efx(backend: &mut B, config: &AudioConfig) -> Option<EfxState> {
        let Some(efx) = backend.efx() else {
            info!("Audio device has no EFX support");
            return None;
        };

        let slot = if config.efx_reverb_engine == EfxReverbEngine::None {
            None
        } else {
            match efx.create_effect_slot() {
                Ok(slot) => Some(slot),
                Err(e) => {
                    error!("Reverb disabled: {e}");
                    None
                },
            }
        };

        let lowpass = if config.enable_obstruction {
            match efx.create_lowpass_filter(OBSTRUCTION_GAIN, OBSTRUCTION_GAIN_HF) {
                Ok(filter) => Some(filter),
                Err(e) => {
                    error!("Obstruction disabled: {e}");
                    None
                },
            }
        } else {
            None
        };

        info!("EFX initialized (reverb engine: {})", config.efx_reverb_engine.name());
        Some(EfxState {
            engine: config.efx_reverb_engine,
            slot,
            lowpass,
            reflections: config.enable_reflection_panning && config.efx_reverb_engine == EfxReverbEngine::EaxReverb,
            interpolator: ReverbInterpolator::new(),
            slot_loaded: false,
            load_error_logged: false,
        })
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    /// Create a source for the asset `path`.
    pub fn create_sound(&mut self, path: &str, group: Option<&str>, assets: &dyn AssetLoader) -> AudioResult<SourceId> {
        if !self.enabled {
            return Err(AudioError::Disabled);
        }
        if self.sources.len() >= MAX_SOURCES {
            if !self.sources_full_logged {
                warn!("Audio source limit reached (max: {MAX_SOURCES})");
                self.sources_full_logged = true;
            }
            return Err(AudioError::CapacityExceeded {
                kind: CapacityKind::Sources,
                max: MAX_SOURCES,
            });
        }

        let buffer = self.buffers.acquire(path, group, assets, &mut self.backend)?;
        let id = SourceId::new(self.sources.len());
        self.sources.push(AudioSource::new(buffer));
        debug!("Created sound {} for '{path}'", id.index());
        Ok(id)
    }

    /// Set the gain, clamped to `[0, 1]`.
    pub fn set_gain(&mut self, id: SourceId, gain: f32) {
        self.update(id, ChangeReason::Gain, |s| s.gain = gain.clamp(0.0, 1.0));
    }

    /// Set the pitch multiplier.
    pub fn set_pitch(&mut self, id: SourceId, pitch: f32) {
        self.update(id, ChangeReason::Pitch, |s| s.pitch = pitch.max(0.0));
    }

    /// Set the world position.
    pub fn set_position(&mut self, id: SourceId, position: Vec3) {
        self.update(id, ChangeReason::Position, |s| s.position = position);
    }

    /// Set the world velocity.
    pub fn set_velocity(&mut self, id: SourceId, velocity: Vec3) {
        self.update(id, ChangeReason::Velocity, |s| s.velocity = velocity);
    }

    /// Set the loop flag.
    pub fn set_looping(&mut self, id: SourceId, looping: bool) {
        self.update(id, ChangeReason::Loop, |s| s.looping = looping);
    }

    /// Enable or disable the source.
    pub fn set_enabled(&mut self, id: SourceId, enabled: bool) {
        self.update(id, ChangeReason::Enable, |s| s.enabled = enabled);
    }

    /// Request playback from the start.
    pub fn play(&mut self, id: SourceId) {
        self.update(id, ChangeReason::Play, |s| s.should_play = true);
    }

    /// Stop playback.
    pub fn stop(&mut self, id: SourceId) {
        self.update(id, ChangeReason::Stop, |s| s.should_play = false);
    }

    /// Record the actor owning a source. The owner's own bounding box never
    /// obstructs it.
    pub fn set_owner(&mut self, id: SourceId, owner: ActorId) {
        if let Some(source) = self.sources.get_mut(id.index()) {
            source.owner = owner;
        }
    }

    fn update(&mut self, id: SourceId, reason: ChangeReason, apply: impl FnOnce(&mut AudioSource)) {
        if !self.enabled {
            return;
        }
        let Some(source) = self.sources.get_mut(id.index()) else {
            return;
        };
        apply(source);
        self.on_change(id.index(), reason);
    }

    fn on_change(&mut self, index: usize, reason: ChangeReason) {
        let listener = self.listener.position;
        let source = &mut self.sources[index];
        let previous = source.audibility;
        source.audibility = source.compute_audibility(listener);
        let audibility = source.audibility;

        match source.voice {
            Some(_) if audibility == 0.0 => {
                self.retire(index);
                self.rebalance();
            },
            Some(voice) => {
                self.write_change(index, voice, reason);
                if audibility < previous {
                    self.rebalance();
                }
            },
            None if audibility > 0.0 => {
                self.try_assign(index);
            },
            None => {},
        }
    }

    fn write_change(&mut self, index: usize, voice: usize, reason: ChangeReason) {
        let handle = self.voices[voice];
        let source = &self.sources[index];
        match reason {
            ChangeReason::Play => {
                let obstructed = source.obstructed;
                self.backend.voice_play(handle);
                self.write_filter(voice, obstructed);
            },
            ChangeReason::Stop => self.backend.voice_stop(handle),
            ChangeReason::Gain => self.backend.set_voice_gain(handle, source.gain),
            ChangeReason::Loop => self.backend.set_voice_looping(handle, source.looping),
            ChangeReason::Pitch => self.backend.set_voice_pitch(handle, source.pitch),
            ChangeReason::Position => self.backend.set_voice_position(handle, source.position),
            ChangeReason::Velocity => self.backend.set_voice_velocity(handle, source.velocity),
            ChangeReason::Enable => {},
        }
    }

    // ------------------------------------------------------------------
    // Voice assignment
    // ------------------------------------------------------------------

    /// Give `index` a voice if one is free or a fainter source can be
    /// evicted.
    fn try_assign(&mut self, index: usize) -> bool {
        let audibility = self.sources[index].audibility;
        if audibility <= 0.0 || self.sources[index].voice.is_some() {
            return false;
        }

        if let Some(free) = self.voice_sources.iter().position(Option::is_none) {
            self.assign(index, free);
            return true;
        }

        let mut faintest: Option<(usize, SourceId, f32)> = None;
        for (voice, owner) in self.voice_sources.iter().enumerate() {
            let Some(owner) = *owner else { continue };
            let a = self.sources[owner.index()].audibility;
            if faintest.map_or(true, |(_, _, f)| a < f) {
                faintest = Some((voice, owner, a));
            }
        }

        match faintest {
            Some((voice, victim, faint)) if faint < audibility => {
                self.retire(victim.index());
                self.assign(index, voice);
                true
            },
            _ => false,
        }
    }

    /// Fill free voices and evict until no unassigned source is louder than
    /// an assigned one.
    fn rebalance(&mut self) {
        loop {
            let best = self
                .sources
                .iter()
                .enumerate()
                .filter(|(_, s)| s.voice.is_none() && s.audibility > 0.0)
                .max_by(|a, b| a.1.audibility.total_cmp(&b.1.audibility))
                .map(|(i, _)| i);
            match best {
                Some(index) if self.try_assign(index) => {},
                _ => return,
            }
        }
    }

    fn assign(&mut self, index: usize, voice: usize) {
        let handle = self.voices[voice];
        self.voice_sources[voice] = Some(SourceId::new(index));
        self.voices_in_use += 1;

        let source = &mut self.sources[index];
        source.voice = Some(voice);

        // the voice is stopped at this point
        if let Some(buffer) = self.buffers.get(source.buffer) {
            self.backend.set_voice_buffer(handle, buffer.handle);
        }
        self.backend.set_voice_gain(handle, source.gain);
        self.backend.set_voice_looping(handle, source.looping);
        self.backend.set_voice_pitch(handle, source.pitch);
        self.backend.set_voice_position(handle, source.position);
        self.backend.set_voice_velocity(handle, source.velocity);
        let obstructed = source.obstructed;
        let should_play = source.should_play;

        if let Some(slot) = self.efx.as_ref().map(|e| e.slot) {
            let absorption = self.air_absorption;
            if let Some(efx) = self.backend.efx() {
                efx.set_aux_send(handle, slot);
                efx.set_air_absorption(handle, absorption);
            }
        }
        self.write_filter(voice, obstructed);

        if should_play {
            self.backend.voice_play(handle);
        }
    }

    fn retire(&mut self, index: usize) {
        let Some(voice) = self.sources[index].voice.take() else {
            return;
        };
        self.backend.voice_stop(self.voices[voice]);
        self.voice_sources[voice] = None;
        self.voices_in_use -= 1;
    }

    fn write_filter(&mut self, voice: usize, obstructed: bool) {
        let state = ObstructionState::from_obstructed(obstructed);
        self.voice_filters[voice] = state;
        let Some(lowpass) = self.efx.as_ref().and_then(|e| e.lowpass) else {
            return;
        };
        let handle = self.voices[voice];
        if let Some(efx) = self.backend.efx() {
            efx.set_direct_filter(handle, state.is_filtered().then_some(lowpass));
        }
    }

    fn recompute_all(&mut self) {
        let listener = self.listener.position;
        for index in 0..self.sources.len() {
            let source = &mut self.sources[index];
            source.audibility = source.compute_audibility(listener);
            if source.audibility == 0.0 && source.voice.is_some() {
                self.retire(index);
            }
        }
        self.rebalance();
    }

    fn poll_finished(&mut self) {
        for voice in 0..self.voices.len() {
            let Some(id) = self.voice_sources[voice] else {
                continue;
            };
            let source = &self.sources[id.index()];
            if source.should_play
                && !source.looping
                && self.backend.voice_state(self.voices[voice]) == VoiceState::Stopped
            {
                self.sources[id.index()].should_play = false;
            }
        }
    }

    // ------------------------------------------------------------------
    // Listener and global state
    // ------------------------------------------------------------------

    /// Move the listener and recompute every source.
    pub fn set_listener(&mut self, listener: Listener) {
        if !self.enabled {
            return;
        }
        self.listener = listener;
        self.recompute_all();
        self.backend.set_listener(&self.listener);
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&mut self, volume: f32) {
        if !self.enabled {
            return;
        }
        self.master_volume = volume.clamp(0.0, 1.0);
        if !self.paused {
            self.backend.set_listener_gain(self.master_volume);
        }
    }

    /// Silence all output.
    pub fn pause_all(&mut self) {
        if !self.enabled {
            return;
        }
        self.paused = true;
        self.backend.set_listener_gain(0.0);
    }

    /// Restore the master volume after [`VoiceManager::pause_all`].
    pub fn resume_all(&mut self) {
        if !self.enabled {
            return;
        }
        self.paused = false;
        self.backend.set_listener_gain(self.master_volume);
    }

    /// Set the reverb target. `None` is dry.
    pub fn set_environment(&mut self, preset: Option<ReverbProperties>) {
        if !self.enabled {
            return;
        }
        self.environment = preset;
        if let Some(efx) = self.efx.as_mut() {
            efx.interpolator.set_target(preset);
        }
    }

    /// Set the reverb target by preset name. Returns `false` for unknown
    /// names, leaving the environment unchanged.
    pub fn set_environment_by_name(&mut self, name: &str) -> bool {
        let Some(preset) = self.presets.get(name).copied() else {
            warn!("Unknown reverb preset '{name}'");
            return false;
        };
        self.set_environment(Some(preset));
        true
    }

    /// Set the global speed of sound.
    pub fn set_speed_of_sound(&mut self, speed: f32) {
        if !self.enabled {
            return;
        }
        self.speed_of_sound = speed;
        self.backend.set_speed_of_sound(speed);
    }

    /// Set the air absorption factor written to every voice.
    pub fn set_air_absorption(&mut self, factor: f32) {
        self.air_absorption = factor;
    }

    // ------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------

    /// Per-frame update.
    ///
    /// Finished one-shots are released, audibility is recomputed and the
    /// pool rebalanced, the listener is written, then air absorption,
    /// obstruction and reverb are updated when EFX is active.
    pub fn tick(&mut self, dt: f32, scene: Option<&dyn AcousticScene>) {
        if !self.enabled {
            return;
        }
        self.backend.advance(dt);
        self.poll_finished();
        self.recompute_all();
        self.backend.set_listener(&self.listener);
        self.update_efx(dt, scene);
    }

    fn update_efx(&mut self, dt: f32, scene: Option<&dyn AcousticScene>) {
        let Some((engine, slot, lowpass, reflections)) = self
            .efx
            .as_ref()
            .map(|e| (e.engine, e.slot, e.lowpass, e.reflections))
        else {
            return;
        };

        let absorption = self.air_absorption;
        if let Some(efx) = self.backend.efx() {
            for (voice, owner) in self.voice_sources.iter().enumerate() {
                if owner.is_some() {
                    efx.set_air_absorption(self.voices[voice], absorption);
                }
            }
        }

        if lowpass.is_some() {
            let listener = self.listener.position;
            for voice in 0..self.voices.len() {
                let Some(id) = self.voice_sources[voice] else {
                    continue;
                };
                let source = &mut self.sources[id.index()];
                let obstructed = scene.is_some_and(|scene| is_obstructed(scene, listener, source.position, source.owner));
                source.obstructed = obstructed;
                if ObstructionState::from_obstructed(obstructed) != self.voice_filters[voice] {
                    self.write_filter(voice, obstructed);
                }
            }
        }

        let Some(slot) = slot else {
            return;
        };
        let Some(state) = self.efx.as_mut() else {
            return;
        };
        match state.interpolator.step(dt) {
            None => {
                if state.slot_loaded {
                    if let Some(efx) = self.backend.efx() {
                        efx.clear_slot(slot);
                    }
                    state.slot_loaded = false;
                }
            },
            Some(mut properties) => {
                if reflections {
                    if let Some(scene) = scene {
                        EarlyReflections::compute(scene, &self.listener, &properties, self.speed_of_sound)
                            .apply(&mut properties);
                    }
                }
                let Some(effect) = ReverbEffect::for_engine(engine, &properties) else {
                    return;
                };
                if let Some(efx) = self.backend.efx() {
                    match efx.load_reverb(slot, &effect) {
                        Ok(()) => state.slot_loaded = true,
                        Err(e) => {
                            if !state.load_error_logged {
                                error!("Failed to update reverb: {e}");
                                state.load_error_logged = true;
                            }
                        },
                    }
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Whether the device provided any voices.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A source by id.
    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<&AudioSource> {
        self.sources.get(id.index())
    }

    /// Whether a source is audibly playing on a voice right now.
    #[must_use]
    pub fn is_playing(&self, id: SourceId) -> bool {
        self.source(id)
            .and_then(AudioSource::voice)
            .is_some_and(|voice| self.backend.voice_state(self.voices[voice]) == VoiceState::Playing)
    }

    /// Number of sources created.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Size of the voice pool.
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Voices currently assigned.
    #[must_use]
    pub fn voices_in_use(&self) -> usize {
        self.voices_in_use
    }

    /// Source holding a voice.
    #[must_use]
    pub fn voice_source(&self, voice: usize) -> Option<SourceId> {
        self.voice_sources.get(voice).copied().flatten()
    }

    /// Backend handle of a voice.
    #[must_use]
    pub fn voice_handle(&self, voice: usize) -> Option<VoiceHandle> {
        self.voices.get(voice).copied()
    }

    /// Listener pose.
    #[must_use]
    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Master volume.
    #[must_use]
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Whether output is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current speed of sound.
    #[must_use]
    pub fn speed_of_sound(&self) -> f32 {
        self.speed_of_sound
    }

    /// Current air absorption factor.
    #[must_use]
    pub fn air_absorption(&self) -> f32 {
        self.air_absorption
    }

    /// Reverb target.
    #[must_use]
    pub fn environment(&self) -> Option<&ReverbProperties> {
        self.environment.as_ref()
    }

    /// Reverb properties as of the last tick.
    #[must_use]
    pub fn current_reverb(&self) -> Option<ReverbProperties> {
        self.efx.as_ref().and_then(|e| e.interpolator.current())
    }

    /// Whether the EFX extension is in use.
    #[must_use]
    pub fn efx_enabled(&self) -> bool {
        self.efx.is_some()
    }

    /// Whether a reverb slot is available.
    #[must_use]
    pub fn reverb_enabled(&self) -> bool {
        self.efx.as_ref().is_some_and(|e| e.slot.is_some())
    }

    /// Whether obstruction filtering is available.
    #[must_use]
    pub fn obstruction_enabled(&self) -> bool {
        self.efx.as_ref().is_some_and(|e| e.lowpass.is_some())
    }

    /// Named reverb presets.
    #[must_use]
    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    /// Mutable access to the preset library.
    pub fn presets_mut(&mut self) -> &mut PresetLibrary {
        &mut self.presets
    }

    /// Loaded PCM buffers.
    #[must_use]
    pub fn buffers(&self) -> &BufferCache {
        &self.buffers
    }

    /// Buffer of a source.
    #[must_use]
    pub fn source_buffer(&self, id: SourceId) -> Option<BufferId> {
        self.source(id).map(AudioSource::buffer)
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
