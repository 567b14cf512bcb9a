//! Soundscript instances.
//!
//! An instance binds a template to one `(actor, link type, link item)`
//! scope and owns one audio source per template sound. Several pitched
//! samples cross-fade: a pitch between two nominal pitches plays both
//! neighbours with gains proportional to the distance from each.

use std::sync::Arc;

use glam::Vec3;
use roadnoise_audio::{AssetLoader, AudioBackend, SourceId, VoiceManager};
use roadnoise_common::{ActorId, AudioError, SoundScope};
use tracing::{debug, warn};

use crate::template::{SoundEntry, SoundScriptTemplate};

/// Below `nominal / PITCHDOWN_FADE_FACTOR` a sample starts fading out.
pub const PITCHDOWN_FADE_FACTOR: f32 = 3.0;

/// Below `nominal / PITCHDOWN_CUTOFF_FACTOR` a sample is silent.
pub const PITCHDOWN_CUTOFF_FACTOR: f32 = 5.0;

/// Gain of a sample recorded at `nominal` when played for `target`.
///
/// Unpitched samples always pass. Otherwise the gain is 1 above
/// `nominal / 3`, 0 below `nominal / 5` and linear in between.
#[must_use]
pub fn pitch_gain_cutoff(nominal: f32, target: f32) -> f32 {
    if nominal == 0.0 {
        return 1.0;
    }
    let fade = nominal / PITCHDOWN_FADE_FACTOR;
    let cutoff = nominal / PITCHDOWN_CUTOFF_FACTOR;
    if target > fade {
        1.0
    } else if target < cutoff {
        0.0
    } else {
        (target - cutoff) / (fade - cutoff)
    }
}

/// Handle of an instance owned by the script manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index in the manager.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An audio source together with its pitch gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundSlot {
    /// `None` when the sound could not be created.
    pub source: Option<SourceId>,
    /// Cross-fade gain from the last pitch update.
    pub pitch_gain: f32,
}

/// Create a source, logging failures the audio layer does not log itself.
pub(crate) fn create_source<B: AudioBackend>(
    voices: &mut VoiceManager<B>,
    path: &str,
    group: Option<&str>,
    assets: &dyn AssetLoader,
) -> Option<SourceId> {
    match voices.create_sound(path, group, assets) {
        Ok(id) => Some(id),
        Err(AudioError::Disabled | AudioError::CapacityExceeded { .. }) => None,
        Err(e) => {
            warn!("Failed to create sound '{path}': {e}");
            None
        },
    }
}

/// A template bound to a scope.
#[derive(Debug, Clone)]
pub struct SoundScriptInstance {
    name: String,
    template: Arc<SoundScriptTemplate>,
    scope: SoundScope,
    start: Option<SoundSlot>,
    stop: Option<SoundSlot>,
    sounds: Vec<SoundSlot>,
    last_gain: f32,
    last_pitch: f32,
}

impl SoundScriptInstance {
    /// Create the sources for every template sound and apply pitch 0,
    /// gain 1.
    pub fn new<B: AudioBackend>(
        name: impl Into<String>,
        template: Arc<SoundScriptTemplate>,
        scope: SoundScope,
        voices: &mut VoiceManager<B>,
        assets: &dyn AssetLoader,
    ) -> Self {
        let mut slot_for = |entry: &SoundEntry| {
            let source = create_source(voices, &entry.file, None, assets);
            if let Some(id) = source {
                voices.set_owner(id, scope.actor);
            }
            SoundSlot {
                source,
                pitch_gain: 0.0,
            }
        };

        let start = template.start_sound().map(&mut slot_for);
        let stop = template.stop_sound().map(&mut slot_for);
        let sounds = template.sounds().iter().map(&mut slot_for).collect();

        let mut instance = Self {
            name: name.into(),
            template,
            scope,
            start,
            stop,
            sounds,
            last_gain: 1.0,
            last_pitch: 0.0,
        };
        instance.set_pitch(voices, 0.0);
        instance.set_gain(voices, 1.0);
        debug!("Sound script instance created: {}", instance.name);
        instance
    }

    fn slots(&self) -> impl Iterator<Item = &SoundSlot> {
        self.start.iter().chain(self.sounds.iter()).chain(self.stop.iter())
    }

    fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.slots().filter_map(|slot| slot.source)
    }

    fn sound_sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sounds.iter().filter_map(|slot| slot.source)
    }

    /// Set the modulated pitch and recompute the cross-fade.
    pub fn set_pitch<B: AudioBackend>(&mut self, voices: &mut VoiceManager<B>, value: f32) {
        let template = Arc::clone(&self.template);

        if let (Some(slot), Some(entry)) = (self.start.as_mut(), template.start_sound()) {
            apply_single(slot, entry, value, voices);
        }

        let entries = template.sounds();
        let count = entries.len().min(self.sounds.len());
        if count > 0 {
            for (slot, entry) in self.sounds.iter_mut().zip(entries) {
                slot.pitch_gain = if entry.is_pitched() { 0.0 } else { 1.0 };
            }

            let up = entries[..count].iter().position(|e| e.pitch > value).unwrap_or(count);
            if up == 0 {
                apply_single(&mut self.sounds[0], &entries[0], value, voices);
            } else if up == count {
                let last = count - 1;
                self.sounds[last].pitch_gain = 1.0;
                if let (true, Some(id)) = (entries[last].is_pitched(), self.sounds[last].source) {
                    voices.set_pitch(id, value / entries[last].pitch);
                }
            } else {
                let low = up - 1;
                let span = entries[up].pitch - entries[low].pitch;
                let fractions = [
                    (low, (entries[up].pitch - value) / span),
                    (up, (value - entries[low].pitch) / span),
                ];
                for (i, fraction) in fractions {
                    let slot = &mut self.sounds[i];
                    match (entries[i].is_pitched(), slot.source) {
                        (true, Some(id)) => {
                            slot.pitch_gain = fraction;
                            voices.set_pitch(id, value / entries[i].pitch);
                        },
                        _ => slot.pitch_gain = 1.0,
                    }
                }
            }
        }

        if let (Some(slot), Some(entry)) = (self.stop.as_mut(), template.stop_sound()) {
            apply_single(slot, entry, value, voices);
        }

        self.last_pitch = value;
        self.set_gain(voices, self.last_gain);
    }

    /// Set the modulated gain. Each source receives it scaled by its
    /// pitch gain.
    pub fn set_gain<B: AudioBackend>(&mut self, voices: &mut VoiceManager<B>, value: f32) {
        for slot in self.slots() {
            if let Some(id) = slot.source {
                voices.set_gain(id, value * slot.pitch_gain);
            }
        }
        self.last_gain = value;
    }

    /// Move every source.
    pub fn set_position<B: AudioBackend>(&self, voices: &mut VoiceManager<B>, position: Vec3) {
        for id in self.sources() {
            voices.set_position(id, position);
        }
    }

    /// Set the velocity of every source.
    pub fn set_velocity<B: AudioBackend>(&self, voices: &mut VoiceManager<B>, velocity: Vec3) {
        for id in self.sources() {
            voices.set_velocity(id, velocity);
        }
    }

    /// Enable or disable every source.
    pub fn set_enabled<B: AudioBackend>(&self, voices: &mut VoiceManager<B>, enabled: bool) {
        for id in self.sources() {
            voices.set_enabled(id, enabled);
        }
    }

    /// Play everything once. Sounds already playing are left alone; a
    /// playing start or stop sound cancels the rest of the sequence.
    pub fn run_once<B: AudioBackend>(&self, voices: &mut VoiceManager<B>) {
        if let Some(id) = self.start.and_then(|s| s.source) {
            if voices.is_playing(id) {
                return;
            }
            voices.play(id);
        }

        for id in self.sound_sources() {
            if voices.is_playing(id) {
                continue;
            }
            voices.set_looping(id, false);
            voices.play(id);
        }

        if let Some(id) = self.stop.and_then(|s| s.source) {
            if voices.is_playing(id) {
                return;
            }
            voices.play(id);
        }
    }

    /// Restart the start sound and loop the main sounds.
    pub fn start<B: AudioBackend>(&self, voices: &mut VoiceManager<B>) {
        if let Some(id) = self.start.and_then(|s| s.source) {
            voices.stop(id);
            voices.play(id);
        }
        for id in self.sound_sources() {
            voices.set_looping(id, true);
            voices.play(id);
        }
    }

    /// Stop the main sounds and play the stop sound.
    pub fn stop<B: AudioBackend>(&self, voices: &mut VoiceManager<B>) {
        for id in self.sound_sources() {
            voices.stop(id);
        }
        if let Some(id) = self.stop.and_then(|s| s.source) {
            voices.stop(id);
            voices.play(id);
        }
    }

    /// Cut everything immediately.
    pub fn kill<B: AudioBackend>(&self, voices: &mut VoiceManager<B>) {
        for id in self.sources() {
            voices.stop(id);
        }
    }

    /// Silence the instance for good before it is dropped.
    pub(crate) fn release<B: AudioBackend>(&self, voices: &mut VoiceManager<B>) {
        self.kill(voices);
        self.set_enabled(voices, false);
    }

    /// Instance name, `<file>-<actor>-<counter>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared template.
    #[must_use]
    pub fn template(&self) -> &Arc<SoundScriptTemplate> {
        &self.template
    }

    /// Scope the instance answers to.
    #[must_use]
    pub fn scope(&self) -> SoundScope {
        self.scope
    }

    /// Owning actor.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.scope.actor
    }

    /// Slots of the main sounds.
    #[must_use]
    pub fn sounds(&self) -> &[SoundSlot] {
        &self.sounds
    }

    /// Slot of the start sound.
    #[must_use]
    pub fn start_sound(&self) -> Option<SoundSlot> {
        self.start
    }

    /// Slot of the stop sound.
    #[must_use]
    pub fn stop_sound(&self) -> Option<SoundSlot> {
        self.stop
    }

    /// Last gain passed to [`SoundScriptInstance::set_gain`].
    #[must_use]
    pub fn last_gain(&self) -> f32 {
        self.last_gain
    }

    /// Last pitch passed to [`SoundScriptInstance::set_pitch`].
    #[must_use]
    pub fn last_pitch(&self) -> f32 {
        self.last_pitch
    }
}

fn apply_single<B: AudioBackend>(slot: &mut SoundSlot, entry: &SoundEntry, value: f32, voices: &mut VoiceManager<B>) {
    slot.pitch_gain = pitch_gain_cutoff(entry.pitch, value);
    if slot.pitch_gain != 0.0 && entry.is_pitched() {
        if let Some(id) = slot.source {
            voices.set_pitch(id, value / entry.pitch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::silence;
    use roadnoise_audio::{HeadlessBackend, MemoryAssets};
    use roadnoise_common::{AudioConfig, LinkType, LINK_ITEM_NONE};

    fn setup() -> (VoiceManager<HeadlessBackend>, MemoryAssets) {
        let voices = VoiceManager::new(HeadlessBackend::new(8), &AudioConfig::default());
        let assets = MemoryAssets::new()
            .with("idle.wav", silence(8000))
            .with("mid.wav", silence(8000))
            .with("high.wav", silence(8000))
            .with("hiss.wav", silence(8000))
            .with("start.wav", silence(800))
            .with("stop.wav", silence(800));
        (voices, assets)
    }

    fn template(lines: &[&str]) -> Arc<SoundScriptTemplate> {
        let mut t = SoundScriptTemplate::new("test", "test.soundscript", None, false);
        for line in lines {
            let params: Vec<&str> = line.split_whitespace().collect();
            t.set_parameter(&params).expect("attribute");
        }
        Arc::new(t)
    }

    fn scope() -> SoundScope {
        SoundScope::new(ActorId::new(1), LinkType::Default, LINK_ITEM_NONE)
    }

    fn gain(voices: &VoiceManager<HeadlessBackend>, slot: SoundSlot) -> f32 {
        voices.source(slot.source.expect("source")).expect("exists").gain()
    }

    fn pitch(voices: &VoiceManager<HeadlessBackend>, slot: SoundSlot) -> f32 {
        voices.source(slot.source.expect("source")).expect("exists").pitch()
    }

    fn total_plays(voices: &VoiceManager<HeadlessBackend>) -> u32 {
        voices.backend().voices().iter().map(|v| v.play_count).sum()
    }

    #[test]
    fn test_pitch_gain_cutoff() {
        assert_eq!(pitch_gain_cutoff(0.0, 0.0), 1.0);
        assert_eq!(pitch_gain_cutoff(15.0, 6.0), 1.0);
        assert_eq!(pitch_gain_cutoff(15.0, 2.0), 0.0);
        assert!((pitch_gain_cutoff(15.0, 4.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cross_fade_between_neighbours() {
        let (mut voices, assets) = setup();
        let t = template(&["sound 800 idle.wav", "sound 1600 mid.wav", "sound 2400 high.wav"]);
        let mut inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);

        inst.set_pitch(&mut voices, 1200.0);
        let s = inst.sounds().to_vec();
        assert!((s[0].pitch_gain - 0.5).abs() < 1e-6);
        assert!((s[1].pitch_gain - 0.5).abs() < 1e-6);
        assert_eq!(s[2].pitch_gain, 0.0);
        assert!((pitch(&voices, s[0]) - 1.5).abs() < 1e-6);
        assert!((pitch(&voices, s[1]) - 0.75).abs() < 1e-6);

        inst.set_gain(&mut voices, 0.8);
        assert!((gain(&voices, s[0]) - 0.4).abs() < 1e-6);
        assert!((gain(&voices, s[1]) - 0.4).abs() < 1e-6);
        assert_eq!(gain(&voices, s[2]), 0.0);
    }

    #[test]
    fn test_above_and_below_the_range() {
        let (mut voices, assets) = setup();
        let t = template(&["sound 800 idle.wav", "sound 1600 mid.wav"]);
        let mut inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);

        inst.set_pitch(&mut voices, 3200.0);
        let s = inst.sounds().to_vec();
        assert_eq!(s[0].pitch_gain, 0.0);
        assert_eq!(s[1].pitch_gain, 1.0);
        assert!((pitch(&voices, s[1]) - 2.0).abs() < 1e-6);

        // fading region of the lowest sample: 800/5 = 160 .. 800/3
        inst.set_pitch(&mut voices, 200.0);
        let s = inst.sounds().to_vec();
        let expected = (200.0 - 160.0) / (800.0 / 3.0 - 160.0);
        assert!((s[0].pitch_gain - expected).abs() < 1e-5);
        assert_eq!(s[1].pitch_gain, 0.0);

        inst.set_pitch(&mut voices, 100.0);
        assert_eq!(inst.sounds()[0].pitch_gain, 0.0);
        assert_eq!(gain(&voices, inst.sounds()[0]), 0.0);
    }

    #[test]
    fn test_pitched_template_starts_silent() {
        let (mut voices, assets) = setup();
        let t = template(&["sound 800 idle.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);
        assert_eq!(gain(&voices, inst.sounds()[0]), 0.0);
        assert_eq!(inst.last_gain(), 1.0);
        assert_eq!(inst.last_pitch(), 0.0);
    }

    #[test]
    fn test_unpitched_always_full() {
        let (mut voices, assets) = setup();
        let t = template(&["sound unpitched hiss.wav"]);
        let mut inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);
        inst.set_pitch(&mut voices, 5000.0);
        assert_eq!(inst.sounds()[0].pitch_gain, 1.0);
        assert_eq!(pitch(&voices, inst.sounds()[0]), 1.0);
        assert_eq!(gain(&voices, inst.sounds()[0]), 1.0);
    }

    #[test]
    fn test_missing_asset_leaves_empty_slot() {
        let (mut voices, assets) = setup();
        let t = template(&["sound unpitched nowhere.wav", "sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);
        assert!(inst.sounds()[0].source.is_none());
        assert!(inst.sounds()[1].source.is_some());
    }

    #[test]
    fn test_sources_owned_by_actor() {
        let (mut voices, assets) = setup();
        let t = template(&["sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);
        let id = inst.sounds()[0].source.expect("source");
        assert_eq!(voices.source(id).expect("exists").owner(), ActorId::new(1));
    }

    #[test]
    fn test_start_loops_and_stop_plays_stop_sound() {
        let (mut voices, assets) = setup();
        let t = template(&["start_sound unpitched start.wav", "stop_sound unpitched stop.wav", "sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);

        inst.start(&mut voices);
        let main = inst.sounds()[0];
        let main_id = main.source.expect("main");
        assert!(voices.source(main_id).expect("main").is_looping());
        assert!(voices.is_playing(main_id));
        assert!(voices.is_playing(inst.start_sound().and_then(|s| s.source).expect("start")));

        let plays = total_plays(&voices);
        inst.stop(&mut voices);
        assert!(!voices.source(main_id).expect("main").should_play());
        let stop = inst.stop_sound().and_then(|s| s.source).expect("stop");
        assert!(voices.is_playing(stop));
        assert_eq!(total_plays(&voices), plays + 1);
    }

    #[test]
    fn test_kill_cuts_everything() {
        let (mut voices, assets) = setup();
        let t = template(&["stop_sound unpitched stop.wav", "sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);
        inst.start(&mut voices);
        inst.kill(&mut voices);
        assert_eq!(voices.voices_in_use(), 0);
        assert!(!voices.source(inst.stop_sound().and_then(|s| s.source).expect("stop")).expect("stop").should_play());
    }

    #[test]
    fn test_run_once_skips_playing_sounds() {
        let (mut voices, assets) = setup();
        let t = template(&["sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);

        inst.run_once(&mut voices);
        let id = inst.sounds()[0].source.expect("source");
        assert!(!voices.source(id).expect("exists").is_looping());
        assert!(voices.is_playing(id));
        assert_eq!(total_plays(&voices), 1);

        inst.run_once(&mut voices);
        assert_eq!(total_plays(&voices), 1);
    }

    #[test]
    fn test_position_and_enable_reach_every_source() {
        let (mut voices, assets) = setup();
        let t = template(&["start_sound unpitched start.wav", "sound unpitched hiss.wav"]);
        let inst = SoundScriptInstance::new("test-1-0", t, scope(), &mut voices, &assets);

        inst.set_position(&mut voices, Vec3::new(3.0, 0.0, 0.0));
        inst.set_velocity(&mut voices, Vec3::Z);
        inst.set_enabled(&mut voices, false);
        for slot in [inst.start_sound().expect("start"), inst.sounds()[0]] {
            let source = voices.source(slot.source.expect("source")).expect("exists");
            assert_eq!(source.position(), Vec3::new(3.0, 0.0, 0.0));
            assert_eq!(source.velocity(), Vec3::Z);
            assert!(!source.is_enabled());
        }
    }
}
