//! Template registry, instance index and event dispatch.
//!
//! Instances are indexed by the trigger they answer to and by the
//! modulators driving their gain and pitch, so an event only visits the
//! instances bound to its kind. Each index list is capped at
//! [`MAX_INSTANCES_PER_GROUP`].

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use roadnoise_audio::{AssetLoader, AudioBackend, VoiceManager};
use roadnoise_common::{AudioError, AudioResult, CapacityKind, SoundScope};
use tracing::{debug, info, warn};

use crate::instance::{InstanceId, SoundScriptInstance};
use crate::kinds::{ModulatorKind, TriggerKind};
use crate::parser::parse_blocks;
use crate::template::SoundScriptTemplate;

/// Maximum number of instances per trigger or modulator kind.
pub const MAX_INSTANCES_PER_GROUP: usize = 256;

/// Instances listed per trigger kind and per modulator kind.
#[derive(Debug, Clone)]
pub struct ScriptIndex {
    triggers: Vec<Vec<InstanceId>>,
    gains: Vec<Vec<InstanceId>>,
    pitches: Vec<Vec<InstanceId>>,
}

impl Default for ScriptIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            triggers: vec![Vec::new(); TriggerKind::COUNT],
            gains: vec![Vec::new(); ModulatorKind::COUNT],
            pitches: vec![Vec::new(); ModulatorKind::COUNT],
        }
    }

    /// The first full list `template` would be added to.
    #[must_use]
    pub fn full_slot(&self, template: &SoundScriptTemplate) -> Option<CapacityKind> {
        let full = |list: &Vec<InstanceId>| list.len() >= MAX_INSTANCES_PER_GROUP;
        if template.trigger().is_some_and(|t| full(&self.triggers[t.index()])) {
            return Some(CapacityKind::TriggerIndex);
        }
        if template.gain_source().is_some_and(|m| full(&self.gains[m.index()])) {
            return Some(CapacityKind::GainIndex);
        }
        if template.pitch_source().is_some_and(|m| full(&self.pitches[m.index()])) {
            return Some(CapacityKind::PitchIndex);
        }
        None
    }

    /// Register `id` under every kind its template binds.
    pub fn insert(&mut self, id: InstanceId, template: &SoundScriptTemplate) {
        if let Some(t) = template.trigger() {
            self.triggers[t.index()].push(id);
        }
        if let Some(m) = template.gain_source() {
            self.gains[m.index()].push(id);
        }
        if let Some(m) = template.pitch_source() {
            self.pitches[m.index()].push(id);
        }
    }

    /// Remove `id`, keeping the order of the remaining entries.
    pub fn remove(&mut self, id: InstanceId, template: &SoundScriptTemplate) {
        if let Some(t) = template.trigger() {
            self.triggers[t.index()].retain(|&i| i != id);
        }
        if let Some(m) = template.gain_source() {
            self.gains[m.index()].retain(|&i| i != id);
        }
        if let Some(m) = template.pitch_source() {
            self.pitches[m.index()].retain(|&i| i != id);
        }
    }

    /// Instances answering to a trigger.
    #[must_use]
    pub fn by_trigger(&self, trigger: TriggerKind) -> &[InstanceId] {
        &self.triggers[trigger.index()]
    }

    /// Instances whose gain follows a modulator.
    #[must_use]
    pub fn by_gain(&self, modulator: ModulatorKind) -> &[InstanceId] {
        &self.gains[modulator.index()]
    }

    /// Instances whose pitch follows a modulator.
    #[must_use]
    pub fn by_pitch(&self, modulator: ModulatorKind) -> &[InstanceId] {
        &self.pitches[modulator.index()]
    }
}

/// Started/stopped flag per scope and trigger.
#[derive(Debug, Clone, Default)]
pub struct TriggerState {
    states: AHashMap<(SoundScope, TriggerKind), bool>,
}

impl TriggerState {
    /// Whether the trigger is started for the scope.
    #[must_use]
    pub fn get(&self, scope: SoundScope, trigger: TriggerKind) -> bool {
        self.states.get(&(scope, trigger)).copied().unwrap_or(false)
    }

    /// Record the trigger state.
    pub fn set(&mut self, scope: SoundScope, trigger: TriggerKind, started: bool) {
        self.states.insert((scope, trigger), started);
    }

    /// Forget every state.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

fn matching<'a>(
    ids: &'a [InstanceId],
    instances: &'a [Option<SoundScriptInstance>],
    scope: SoundScope,
) -> impl Iterator<Item = &'a SoundScriptInstance> + 'a {
    ids.iter()
        .filter_map(move |id| instances.get(id.index()).and_then(Option::as_ref))
        .filter(move |inst| inst.scope() == scope)
}

/// Owns templates and instances and routes events to them.
#[derive(Debug, Default)]
pub struct SoundScriptManager {
    templates: AHashMap<String, Arc<SoundScriptTemplate>>,
    instances: Vec<Option<SoundScriptInstance>>,
    index: ScriptIndex,
    trigger_state: TriggerState,
    loading_base: bool,
    instance_counter: u32,
    capacity_logged: AHashSet<CapacityKind>,
}

impl SoundScriptManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Templates parsed while set are marked as base templates.
    pub fn set_loading_base(&mut self, base: bool) {
        self.loading_base = base;
    }

    /// Whether new templates are marked as base templates.
    #[must_use]
    pub fn is_loading_base(&self) -> bool {
        self.loading_base
    }

    /// Parse soundscript text and register its templates.
    ///
    /// Duplicate names are skipped and bad attribute lines ignored, both
    /// with a warning. Returns the number of templates registered.
    pub fn load_script(&mut self, text: &str, source_name: &str, group: Option<&str>) -> usize {
        info!("Parsing soundscript {source_name}");
        let mut registered = 0;

        for block in parse_blocks(text, source_name) {
            if self.templates.contains_key(&block.name) {
                warn!(
                    "Soundscript '{}' already exists, skipping (line {} of {source_name})",
                    block.name, block.line
                );
                continue;
            }

            let mut template = self.new_template(&block.name, source_name, group);
            for attribute in &block.attributes {
                if let Err(e) = template.set_parameter(&attribute.tokens()) {
                    warn!(
                        "Bad soundscript attribute line {}: '{}' in {source_name} ({e})",
                        attribute.line, attribute.text
                    );
                }
            }

            debug!("Created soundscript template '{}'", block.name);
            self.templates.insert(block.name, Arc::new(template));
            registered += 1;
        }
        registered
    }

    fn new_template(&self, name: &str, file_name: &str, group: Option<&str>) -> SoundScriptTemplate {
        if self.loading_base {
            return SoundScriptTemplate::new(name, file_name, group, true);
        }
        let base = self
            .templates
            .values()
            .filter(|t| t.is_base() && name.starts_with(t.name()))
            .max_by_key(|t| t.name().len());
        match base {
            Some(base) => SoundScriptTemplate::derived_from(base, name, file_name, group),
            None => SoundScriptTemplate::new(name, file_name, group, false),
        }
    }

    /// A template by name.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&Arc<SoundScriptTemplate>> {
        self.templates.get(name)
    }

    /// Every registered template.
    pub fn templates(&self) -> impl Iterator<Item = &Arc<SoundScriptTemplate>> {
        self.templates.values()
    }

    /// Number of registered templates.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Instantiate a template for a scope.
    ///
    /// Instances of `always_on` templates start immediately.
    pub fn create_instance<B: AudioBackend>(
        &mut self,
        template_name: &str,
        scope: SoundScope,
        voices: &mut VoiceManager<B>,
        assets: &dyn AssetLoader,
    ) -> AudioResult<InstanceId> {
        let template = self
            .templates
            .get(template_name)
            .cloned()
            .ok_or_else(|| AudioError::UnknownTemplate(template_name.to_string()))?;
        let Some(trigger) = template.trigger() else {
            return Err(AudioError::InvalidTemplate(template_name.to_string()));
        };

        if let Some(kind) = self.index.full_slot(&template) {
            if self.capacity_logged.insert(kind) {
                warn!("Reached instance limit for the {kind} (max: {MAX_INSTANCES_PER_GROUP})");
            }
            return Err(AudioError::CapacityExceeded {
                kind,
                max: MAX_INSTANCES_PER_GROUP,
            });
        }

        let name = format!("{}-{}-{}", template.file_name(), scope.actor, self.instance_counter);
        self.instance_counter += 1;

        let instance = SoundScriptInstance::new(name, Arc::clone(&template), scope, voices, assets);
        if trigger == TriggerKind::AlwaysOn {
            instance.start(voices);
        }

        let id = InstanceId::new(self.instances.len());
        self.index.insert(id, &template);
        self.instances.push(Some(instance));
        Ok(id)
    }

    /// Remove an instance. Its sounds are cut and disabled.
    pub fn remove_instance<B: AudioBackend>(&mut self, id: InstanceId, voices: &mut VoiceManager<B>) -> bool {
        let Some(instance) = self.instances.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        self.index.remove(id, instance.template());
        instance.release(voices);
        debug!("Sound script instance removed: {}", instance.name());
        true
    }

    /// An instance by id.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&SoundScriptInstance> {
        self.instances.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to an instance.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut SoundScriptInstance> {
        self.instances.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Every live instance.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &SoundScriptInstance)> {
        self.instances
            .iter()
            .enumerate()
            .filter_map(|(i, inst)| inst.as_ref().map(|inst| (InstanceId::new(i), inst)))
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_some()).count()
    }

    /// The lookup tables.
    #[must_use]
    pub fn index(&self) -> &ScriptIndex {
        &self.index
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Play the matching instances once.
    pub fn trig_once<B: AudioBackend>(&self, scope: SoundScope, trigger: TriggerKind, voices: &mut VoiceManager<B>) {
        for inst in matching(self.index.by_trigger(trigger), &self.instances, scope) {
            inst.run_once(voices);
        }
    }

    /// Start the matching instances unless already started.
    pub fn trig_start<B: AudioBackend>(&mut self, scope: SoundScope, trigger: TriggerKind, voices: &mut VoiceManager<B>) {
        if self.trigger_state.get(scope, trigger) {
            return;
        }
        self.trigger_state.set(scope, trigger, true);
        for inst in matching(self.index.by_trigger(trigger), &self.instances, scope) {
            inst.start(voices);
        }
    }

    /// Stop the matching instances if started.
    pub fn trig_stop<B: AudioBackend>(&mut self, scope: SoundScope, trigger: TriggerKind, voices: &mut VoiceManager<B>) {
        if !self.trigger_state.get(scope, trigger) {
            return;
        }
        self.trigger_state.set(scope, trigger, false);
        for inst in matching(self.index.by_trigger(trigger), &self.instances, scope) {
            inst.stop(voices);
        }
    }

    /// Cut the matching instances if started.
    pub fn trig_kill<B: AudioBackend>(&mut self, scope: SoundScope, trigger: TriggerKind, voices: &mut VoiceManager<B>) {
        if !self.trigger_state.get(scope, trigger) {
            return;
        }
        self.trigger_state.set(scope, trigger, false);
        for inst in matching(self.index.by_trigger(trigger), &self.instances, scope) {
            inst.kill(voices);
        }
    }

    /// Start when stopped, stop when started.
    pub fn trig_toggle<B: AudioBackend>(&mut self, scope: SoundScope, trigger: TriggerKind, voices: &mut VoiceManager<B>) {
        if self.trigger_state.get(scope, trigger) {
            self.trig_stop(scope, trigger, voices);
        } else {
            self.trig_start(scope, trigger, voices);
        }
    }

    /// Whether a trigger is started for a scope.
    #[must_use]
    pub fn get_trig_state(&self, scope: SoundScope, trigger: TriggerKind) -> bool {
        self.trigger_state.get(scope, trigger)
    }

    /// Feed a modulator value to the matching instances. Gain and pitch
    /// are only written when they change.
    pub fn modulate<B: AudioBackend>(
        &mut self,
        scope: SoundScope,
        modulator: ModulatorKind,
        value: f32,
        voices: &mut VoiceManager<B>,
    ) {
        for &id in self.index.by_gain(modulator) {
            let Some(inst) = self.instances.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            if inst.scope() != scope {
                continue;
            }
            let gain = inst.template().gain_for(value);
            if gain != inst.last_gain() {
                inst.set_gain(voices, gain);
            }
        }

        for &id in self.index.by_pitch(modulator) {
            let Some(inst) = self.instances.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            if inst.scope() != scope {
                continue;
            }
            let pitch = inst.template().pitch_for(value);
            if pitch != inst.last_pitch() {
                inst.set_pitch(voices, pitch);
            }
        }
    }
}
