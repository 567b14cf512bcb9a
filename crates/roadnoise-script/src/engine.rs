//! The sound engine facade.
//!
//! [`SoundEngine`] owns the voice manager, the script manager, the
//! configuration and the asset loader. Gameplay code only ever talks to
//! this type. When the device failed at start-up every call is a no-op.

use glam::Vec3;
use roadnoise_audio::efx::{AIR_ABSORPTION_AIR, AIR_ABSORPTION_WATER, PRESET_PREFIX, SPEED_OF_SOUND_WATER};
use roadnoise_audio::scene::reverb_preset_at;
use roadnoise_audio::{AcousticScene, AssetLoader, AudioBackend, Listener, ReverbProperties, SourceId, VoiceManager};
use roadnoise_common::{AudioConfig, AudioError, SoundScope};
use tracing::{debug, info, warn};

use crate::instance::{create_source, InstanceId};
use crate::kinds::{ModulatorKind, TriggerKind};
use crate::manager::SoundScriptManager;

/// File extension of soundscript assets.
pub const SOUNDSCRIPT_EXTENSION: &str = ".soundscript";

/// Full name of the preset used while the listener is under water.
#[must_use]
pub fn underwater_preset() -> String {
    format!("{PRESET_PREFIX}UNDERWATER")
}

/// Spatial audio engine.
pub struct SoundEngine<B: AudioBackend> {
    voices: VoiceManager<B>,
    scripts: SoundScriptManager,
    config: AudioConfig,
    assets: Box<dyn AssetLoader>,
    listener_preset: Option<String>,
}

impl<B: AudioBackend> SoundEngine<B> {
    /// Open the engine on a backend.
    pub fn new(backend: B, mut config: AudioConfig, assets: Box<dyn AssetLoader>) -> Self {
        config.validate();
        let voices = VoiceManager::new(backend, &config);
        if voices.is_enabled() {
            info!("Sound engine started with {} voices", voices.voice_count());
        } else {
            info!("Sound engine disabled");
        }
        Self {
            voices,
            scripts: SoundScriptManager::new(),
            config,
            assets,
            listener_preset: None,
        }
    }

    /// Whether the device failed at start-up.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        !self.voices.is_enabled()
    }

    // ------------------------------------------------------------------
    // Listener and global state
    // ------------------------------------------------------------------

    /// Move the listener.
    pub fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3, velocity: Vec3) {
        self.voices.set_listener(Listener {
            position,
            forward,
            up,
            velocity,
        });
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.voices.set_master_volume(volume);
    }

    /// Silence all output.
    pub fn pause_all(&mut self) {
        self.voices.pause_all();
    }

    /// Restore output after [`SoundEngine::pause_all`].
    pub fn resume_all(&mut self) {
        self.voices.resume_all();
    }

    /// Resume when `true`, pause when `false`.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.resume_all();
        } else {
            self.pause_all();
        }
    }

    /// Set the listener reverb directly. `None` is dry.
    pub fn set_environment(&mut self, preset: Option<ReverbProperties>) {
        self.voices.set_environment(preset);
    }

    /// Set the listener reverb by preset name.
    pub fn set_environment_by_name(&mut self, name: &str) -> bool {
        self.voices.set_environment_by_name(name)
    }

    // ------------------------------------------------------------------
    // Sounds and instances
    // ------------------------------------------------------------------

    /// Create a free-standing source. Failures are logged.
    pub fn create_sound(&mut self, path: &str, group: Option<&str>) -> Option<SourceId> {
        create_source(&mut self.voices, path, group, self.assets.as_ref())
    }

    /// Instantiate a soundscript template. Failures are logged.
    pub fn create_instance(&mut self, template: &str, scope: impl Into<SoundScope>) -> Option<InstanceId> {
        if self.is_disabled() {
            return None;
        }
        match self
            .scripts
            .create_instance(template, scope.into(), &mut self.voices, self.assets.as_ref())
        {
            Ok(id) => Some(id),
            Err(AudioError::CapacityExceeded { .. }) => None,
            Err(e) => {
                warn!("Cannot create sound script instance: {e}");
                None
            },
        }
    }

    /// Remove an instance and silence its sources.
    pub fn remove_instance(&mut self, id: InstanceId) -> bool {
        self.scripts.remove_instance(id, &mut self.voices)
    }

    /// Move every source of an instance.
    pub fn set_instance_position(&mut self, id: InstanceId, position: Vec3) {
        if let Some(instance) = self.scripts.instance(id) {
            instance.set_position(&mut self.voices, position);
        }
    }

    /// Set the velocity of every source of an instance.
    pub fn set_instance_velocity(&mut self, id: InstanceId, velocity: Vec3) {
        if let Some(instance) = self.scripts.instance(id) {
            instance.set_velocity(&mut self.voices, velocity);
        }
    }

    /// Enable or disable every source of an instance.
    pub fn set_instance_enabled(&mut self, id: InstanceId, enabled: bool) {
        if let Some(instance) = self.scripts.instance(id) {
            instance.set_enabled(&mut self.voices, enabled);
        }
    }

    // ------------------------------------------------------------------
    // Script loading
    // ------------------------------------------------------------------

    /// Parse soundscript text. Returns the number of templates added.
    pub fn load_script_text(&mut self, text: &str, source_name: &str, group: Option<&str>) -> usize {
        self.scripts.load_script(text, source_name, group)
    }

    /// Load every `*.soundscript` asset. Returns the number of templates
    /// added.
    pub fn register_scripts(&mut self) -> usize {
        let mut registered = 0;
        for asset in self.assets.list(SOUNDSCRIPT_EXTENSION) {
            let group = asset.group.as_deref();
            match self.assets.read(&asset.name, group) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    registered += self.scripts.load_script(&text, &asset.name, group);
                },
                Err(e) => warn!("Cannot read soundscript '{}': {e}", asset.name),
            }
        }
        info!("Registered {registered} soundscript templates");
        registered
    }

    /// Templates loaded while set become base templates.
    pub fn set_loading_base(&mut self, base: bool) {
        self.scripts.set_loading_base(base);
    }

    // ------------------------------------------------------------------
    // Triggers and modulators
    // ------------------------------------------------------------------

    /// Play the matching instances once.
    pub fn trig_once(&mut self, scope: impl Into<SoundScope>, trigger: TriggerKind) {
        if self.is_disabled() {
            return;
        }
        self.scripts.trig_once(scope.into(), trigger, &mut self.voices);
    }

    /// Start the matching instances.
    pub fn trig_start(&mut self, scope: impl Into<SoundScope>, trigger: TriggerKind) {
        if self.is_disabled() {
            return;
        }
        self.scripts.trig_start(scope.into(), trigger, &mut self.voices);
    }

    /// Stop the matching instances.
    pub fn trig_stop(&mut self, scope: impl Into<SoundScope>, trigger: TriggerKind) {
        if self.is_disabled() {
            return;
        }
        self.scripts.trig_stop(scope.into(), trigger, &mut self.voices);
    }

    /// Cut the matching instances.
    pub fn trig_kill(&mut self, scope: impl Into<SoundScope>, trigger: TriggerKind) {
        if self.is_disabled() {
            return;
        }
        self.scripts.trig_kill(scope.into(), trigger, &mut self.voices);
    }

    /// Flip the matching instances between started and stopped.
    pub fn trig_toggle(&mut self, scope: impl Into<SoundScope>, trigger: TriggerKind) {
        if self.is_disabled() {
            return;
        }
        self.scripts.trig_toggle(scope.into(), trigger, &mut self.voices);
    }

    /// Whether a trigger is started. Always `false` when disabled.
    #[must_use]
    pub fn get_trig_state(&self, scope: impl Into<SoundScope>, trigger: TriggerKind) -> bool {
        !self.is_disabled() && self.scripts.get_trig_state(scope.into(), trigger)
    }

    /// Feed a modulator value.
    pub fn modulate(&mut self, scope: impl Into<SoundScope>, modulator: ModulatorKind, value: f32) {
        if self.is_disabled() {
            return;
        }
        self.scripts.modulate(scope.into(), modulator, value, &mut self.voices);
    }

    // ------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------

    /// Pick speed of sound, air absorption and reverb for the listener.
    ///
    /// Does nothing unless the engine controls environmental audio. The
    /// reverb preset is, in order: the forced preset, the under water
    /// preset, the preset of a collision box around the listener, the
    /// default preset.
    pub fn update_listener_environment(&mut self, scene: &dyn AcousticScene) {
        if self.is_disabled() || !self.config.engine_controls_environmental_audio {
            return;
        }

        let position = self.voices.listener().position;
        let underwater = scene.is_underwater(position);
        if underwater {
            self.voices.set_speed_of_sound(SPEED_OF_SOUND_WATER);
            self.voices.set_air_absorption(AIR_ABSORPTION_WATER);
        } else {
            self.voices.set_speed_of_sound(self.config.speed_of_sound);
            self.voices.set_air_absorption(AIR_ABSORPTION_AIR);
        }

        if !self.config.enable_efx {
            return;
        }

        let preset = if !self.config.force_listener_efx_preset.is_empty() {
            Some(self.config.force_listener_efx_preset.clone())
        } else if underwater {
            Some(underwater_preset())
        } else if let Some(name) = reverb_preset_at(scene, position) {
            Some(name.to_string())
        } else if !self.config.default_listener_efx_preset.is_empty() {
            Some(self.config.default_listener_efx_preset.clone())
        } else {
            None
        };

        if preset == self.listener_preset {
            return;
        }
        debug!("Listener reverb preset: {}", preset.as_deref().unwrap_or("none"));
        match preset.as_deref() {
            Some(name) => {
                self.voices.set_environment_by_name(name);
            },
            None => self.voices.set_environment(None),
        }
        self.listener_preset = preset;
    }

    /// Per-frame update.
    pub fn tick(&mut self, dt: f32, scene: Option<&dyn AcousticScene>) {
        if let Some(scene) = scene {
            self.update_listener_environment(scene);
        }
        self.voices.tick(dt, scene);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The voice manager.
    #[must_use]
    pub fn voices(&self) -> &VoiceManager<B> {
        &self.voices
    }

    /// Mutable access to the voice manager, for free-standing sources.
    pub fn voices_mut(&mut self) -> &mut VoiceManager<B> {
        &mut self.voices
    }

    /// The script manager.
    #[must_use]
    pub fn scripts(&self) -> &SoundScriptManager {
        &self.scripts
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::silence;
    use roadnoise_audio::{Aabb, CollisionBox, FsAssets, HeadlessBackend, MemoryAssets, StaticScene};
    use roadnoise_common::ActorId;
    use std::fs;

    const HORN: &str = "tracks/horn\n{\n    trigger_source horn\n    sound unpitched horn.wav\n}\n";

    fn engine_with(config: AudioConfig) -> SoundEngine<HeadlessBackend> {
        let assets = MemoryAssets::new().with("horn.wav", silence(8000));
        SoundEngine::new(HeadlessBackend::new(8), config, Box::new(assets))
    }

    fn engine() -> SoundEngine<HeadlessBackend> {
        engine_with(AudioConfig::default())
    }

    fn preset(engine: &SoundEngine<HeadlessBackend>, name: &str) -> Option<ReverbProperties> {
        engine.voices().presets().get(name).copied()
    }

    fn cave_scene() -> StaticScene {
        let mut scene = StaticScene::new();
        scene.water_level = Some(0.0);
        scene.boxes.push(CollisionBox {
            reverb_preset: Some("EFX_REVERB_PRESET_CAVE".to_string()),
            ..CollisionBox::solid(Aabb::new(Vec3::new(90.0, 0.0, -10.0), Vec3::new(110.0, 20.0, 10.0)))
        });
        scene
    }

    fn place_listener(engine: &mut SoundEngine<HeadlessBackend>, position: Vec3) {
        engine.set_listener(position, Vec3::NEG_Z, Vec3::Y, Vec3::ZERO);
    }

    #[test]
    fn test_environment_priority() {
        let mut e = engine();
        let scene = cave_scene();

        place_listener(&mut e, Vec3::new(0.0, 5.0, 0.0));
        e.update_listener_environment(&scene);
        assert_eq!(e.voices().environment().copied(), preset(&e, "EFX_REVERB_PRESET_GENERIC"));

        place_listener(&mut e, Vec3::new(100.0, 5.0, 0.0));
        e.update_listener_environment(&scene);
        assert_eq!(e.voices().environment().copied(), preset(&e, "EFX_REVERB_PRESET_CAVE"));

        place_listener(&mut e, Vec3::new(100.0, -5.0, 0.0));
        e.update_listener_environment(&scene);
        assert_eq!(e.voices().environment().copied(), preset(&e, &underwater_preset()));
    }

    #[test]
    fn test_forced_preset_wins() {
        let config = AudioConfig {
            force_listener_efx_preset: "EFX_REVERB_PRESET_FOREST".to_string(),
            ..AudioConfig::default()
        };
        let mut e = engine_with(config);
        place_listener(&mut e, Vec3::new(100.0, -5.0, 0.0));
        e.update_listener_environment(&cave_scene());
        assert_eq!(e.voices().environment().copied(), preset(&e, "EFX_REVERB_PRESET_FOREST"));
    }

    #[test]
    fn test_underwater_speed_and_absorption() {
        let mut e = engine();
        let scene = cave_scene();

        place_listener(&mut e, Vec3::new(0.0, -1.0, 0.0));
        e.tick(0.016, Some(&scene));
        assert_eq!(e.voices().speed_of_sound(), SPEED_OF_SOUND_WATER);
        assert_eq!(e.voices().air_absorption(), AIR_ABSORPTION_WATER);
        assert_eq!(e.voices().backend().speed_of_sound(), SPEED_OF_SOUND_WATER);

        place_listener(&mut e, Vec3::new(0.0, 1.0, 0.0));
        e.tick(0.016, Some(&scene));
        assert_eq!(e.voices().speed_of_sound(), e.config().speed_of_sound);
        assert_eq!(e.voices().air_absorption(), AIR_ABSORPTION_AIR);
    }

    #[test]
    fn test_manual_environment_untouched() {
        let config = AudioConfig {
            engine_controls_environmental_audio: false,
            ..AudioConfig::default()
        };
        let mut e = engine_with(config);
        assert!(e.set_environment_by_name("EFX_REVERB_PRESET_CITY"));
        place_listener(&mut e, Vec3::new(100.0, -5.0, 0.0));
        e.tick(0.016, Some(&cave_scene()));
        assert_eq!(e.voices().environment().copied(), preset(&e, "EFX_REVERB_PRESET_CITY"));
        assert_eq!(e.voices().air_absorption(), AIR_ABSORPTION_AIR);
    }

    #[test]
    fn test_register_scripts_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("trucks.soundscript"), HORN).expect("write");
        fs::create_dir(dir.path().join("mods")).expect("mkdir");
        fs::write(
            dir.path().join("mods").join("extra.soundscript"),
            "extra/beep\n{\n    trigger_source horn\n    sound unpitched beep.wav\n}\n",
        )
        .expect("write");
        fs::write(dir.path().join("horn.wav"), silence(8000)).expect("write");
        fs::write(dir.path().join("notes.txt"), "not a script").expect("write");

        let assets = FsAssets::new(dir.path());
        let mut e = SoundEngine::new(HeadlessBackend::new(8), AudioConfig::default(), Box::new(assets));
        assert_eq!(e.register_scripts(), 2);
        assert_eq!(
            e.scripts().template("extra/beep").and_then(|t| t.group()),
            Some("mods")
        );

        let id = e.create_instance("tracks/horn", ActorId::new(1)).expect("instance");
        e.trig_start(ActorId::new(1), TriggerKind::Horn);
        let source = e.scripts().instance(id).expect("instance").sounds()[0].source.expect("source");
        assert!(e.voices().is_playing(source));
    }

    #[test]
    fn test_instance_lifecycle_through_engine() {
        let mut e = engine();
        assert_eq!(e.load_script_text(HORN, "horn.soundscript", None), 1);
        assert!(e.create_instance("tracks/nope", ActorId::new(1)).is_none());

        let id = e.create_instance("tracks/horn", ActorId::new(1)).expect("instance");
        e.set_instance_position(id, Vec3::new(4.0, 0.0, 0.0));
        let source = e.scripts().instance(id).expect("instance").sounds()[0].source.expect("source");
        assert_eq!(e.voices().source(source).expect("source").position(), Vec3::new(4.0, 0.0, 0.0));

        e.trig_toggle(ActorId::new(1), TriggerKind::Horn);
        assert!(e.get_trig_state(ActorId::new(1), TriggerKind::Horn));
        assert!(e.remove_instance(id));
        assert!(!e.voices().is_playing(source));
    }

    #[test]
    fn test_pause_and_resume_via_set_enabled() {
        let mut e = engine();
        e.set_master_volume(0.6);
        e.set_enabled(false);
        assert_eq!(e.voices().backend().listener_gain(), 0.0);
        e.set_enabled(true);
        assert!((e.voices().backend().listener_gain() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_engine_is_inert() {
        let assets = MemoryAssets::new().with("horn.wav", silence(8000));
        let mut e = SoundEngine::new(HeadlessBackend::disconnected(), AudioConfig::default(), Box::new(assets));
        assert!(e.is_disabled());

        e.load_script_text(HORN, "horn.soundscript", None);
        assert!(e.create_instance("tracks/horn", ActorId::new(1)).is_none());
        assert!(e.create_sound("horn.wav", None).is_none());

        e.trig_start(ActorId::new(1), TriggerKind::Horn);
        assert!(!e.get_trig_state(ActorId::new(1), TriggerKind::Horn));
        e.modulate(ActorId::new(1), ModulatorKind::EngineRpm, 0.5);
        e.set_master_volume(0.3);
        e.tick(0.016, Some(&cave_scene()));
        assert_eq!(e.voices().source_count(), 0);
    }
}
