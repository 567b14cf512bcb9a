//! A vehicle driving past the listener.
//!
//! Every soundscript template with a trigger is instantiated for one
//! actor, the engine trigger is started and the engine RPM is swept while
//! the vehicle moves along a straight line.

use std::fmt;

use glam::Vec3;
use roadnoise_audio::{AcousticScene, AudioBackend};
use roadnoise_common::ActorId;
use roadnoise_script::{InstanceId, ModulatorKind, SoundEngine, TriggerKind};
use tracing::{debug, info};

/// Engine speed at idle.
pub const IDLE_RPM: f32 = 800.0;

/// Engine speed at full throttle.
pub const MAX_RPM: f32 = 2400.0;

/// Seconds for one throttle sweep from idle to maximum and back.
const SWEEP_PERIOD: f32 = 8.0;

/// Path of the simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivePath {
    /// Start position.
    pub start: Vec3,
    /// Constant velocity.
    pub velocity: Vec3,
}

impl Default for DrivePath {
    fn default() -> Self {
        Self {
            start: Vec3::new(-100.0, 0.0, -10.0),
            velocity: Vec3::new(15.0, 0.0, 0.0),
        }
    }
}

/// RPM for a point in time: a triangle wave between idle and maximum.
#[must_use]
pub fn rpm_at(time: f32) -> f32 {
    let phase = (time / SWEEP_PERIOD).fract();
    let throttle = 1.0 - (2.0 * phase - 1.0).abs();
    IDLE_RPM + (MAX_RPM - IDLE_RPM) * throttle
}

/// State of the drive-by.
pub struct DriveBy<B: AudioBackend> {
    engine: SoundEngine<B>,
    actor: ActorId,
    path: DrivePath,
    instances: Vec<InstanceId>,
    time: f32,
}

impl<B: AudioBackend> DriveBy<B> {
    /// Instantiate the vehicle sounds and start the engine.
    pub fn new(mut engine: SoundEngine<B>, actor: ActorId, path: DrivePath) -> Self {
        let mut names: Vec<String> = engine
            .scripts()
            .templates()
            .filter(|t| t.trigger().is_some())
            .map(|t| t.name().to_string())
            .collect();
        names.sort();

        let instances: Vec<InstanceId> = names
            .iter()
            .filter_map(|name| engine.create_instance(name, actor))
            .collect();
        info!("Vehicle {actor} carries {} sound script instances", instances.len());

        for &id in &instances {
            engine.set_instance_position(id, path.start);
            engine.set_instance_velocity(id, path.velocity);
        }
        engine.trig_start(actor, TriggerKind::Engine);

        Self {
            engine,
            actor,
            path,
            instances,
            time: 0.0,
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, scene: Option<&dyn AcousticScene>) {
        self.time += dt;
        let position = self.position();
        for &id in &self.instances {
            self.engine.set_instance_position(id, position);
        }
        self.engine.modulate(self.actor, ModulatorKind::EngineRpm, rpm_at(self.time));
        self.engine.tick(dt, scene);
        debug!("t={:.2} vehicle at {position}", self.time);
    }

    /// Current vehicle position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.path.start + self.path.velocity * self.time
    }

    /// Elapsed simulated time.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Instances carried by the vehicle.
    #[must_use]
    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }

    /// The engine being driven.
    #[must_use]
    pub fn engine(&self) -> &SoundEngine<B> {
        &self.engine
    }

    /// Snapshot of the voice pool.
    #[must_use]
    pub fn report(&self) -> VoiceReport {
        let voices = self.engine.voices();
        let lines = (0..voices.voice_count())
            .map(|voice| {
                let source = voices.voice_source(voice).and_then(|id| voices.source(id));
                source.map(|source| VoiceLine {
                    path: voices
                        .buffers()
                        .get(source.buffer())
                        .map_or_else(|| "?".to_string(), |b| b.path.clone()),
                    gain: source.gain(),
                    pitch: source.pitch(),
                    audibility: source.audibility(),
                })
            })
            .collect();
        VoiceReport {
            time: self.time,
            sources: voices.source_count(),
            in_use: voices.voices_in_use(),
            lines,
        }
    }
}

/// What one voice is playing.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceLine {
    /// Asset path of the bound source.
    pub path: String,
    /// Source gain.
    pub gain: f32,
    /// Source pitch.
    pub pitch: f32,
    /// Audibility at the last recompute.
    pub audibility: f32,
}

/// Voice pool snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceReport {
    /// Simulated time.
    pub time: f32,
    /// Logical sources alive.
    pub sources: usize,
    /// Voices bound to a source.
    pub in_use: usize,
    /// One entry per voice, `None` when free.
    pub lines: Vec<Option<VoiceLine>>,
}

impl fmt::Display for VoiceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "t={:6.2}s  sources={}  voices={}/{}",
            self.time,
            self.sources,
            self.in_use,
            self.lines.len()
        )?;
        for (voice, line) in self.lines.iter().enumerate() {
            if let Some(line) = line {
                writeln!(
                    f,
                    "  [{voice:2}] {:<32} gain={:.2} pitch={:.2} audibility={:.3}",
                    line.path, line.gain, line.pitch, line.audibility
                )?;
            }
        }
        Ok(())
    }
}
