//! Output through rodio.
//!
//! Each voice is a [`SpatialSink`]. A sink cannot be rewound, so every play
//! request builds a fresh one from the bound buffer. There is no EFX
//! extension.

use std::sync::Arc;

use glam::Vec3;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamHandle, Source, SpatialSink};
use roadnoise_common::{AudioError, AudioResult, MAX_HARDWARE_VOICES};
use tracing::{error, info, warn};

use super::{AudioBackend, BufferHandle, Listener, VoiceHandle, VoiceState};
use crate::wav::PcmData;

/// Half the distance between the ears, in metres.
const EAR_OFFSET: f32 = 0.1;

struct RodioBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Arc<Vec<i16>>,
}

#[derive(Default)]
struct RodioVoice {
    sink: Option<SpatialSink>,
    buffer: Option<BufferHandle>,
    gain: f32,
    pitch: f32,
    looping: bool,
    position: Vec3,
}

/// Backend writing to a system audio device.
pub struct RodioBackend {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    name: String,
    buffers: Vec<RodioBuffer>,
    voices: Vec<RodioVoice>,
    listener: Listener,
    listener_gain: f32,
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend")
            .field("name", &self.name)
            .field("buffers", &self.buffers.len())
            .field("voices", &self.voices.len())
            .finish_non_exhaustive()
    }
}

impl RodioBackend {
    /// Open the named output device, or the system default for an empty
    /// name. A named device that cannot be opened falls back to the default.
    pub fn open(device_name: &str) -> AudioResult<Self> {
        let (stream, handle, name) = if device_name.is_empty() {
            Self::open_default()?
        } else {
            match Self::open_named(device_name) {
                Ok(opened) => opened,
                Err(e) => {
                    warn!("Failed to open configured audio device '{device_name}' ({e}), opening default");
                    Self::open_default()?
                },
            }
        };

        info!("Audio device initialized: {name}");
        Ok(Self {
            _stream: stream,
            handle,
            name,
            buffers: Vec::new(),
            voices: Vec::new(),
            listener: Listener::default(),
            listener_gain: 1.0,
        })
    }

    fn open_default() -> AudioResult<(OutputStream, OutputStreamHandle, String)> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        Ok((stream, handle, "default".to_string()))
    }

    fn open_named(device_name: &str) -> AudioResult<(OutputStream, OutputStreamHandle, String)> {
        let host = rodio::cpal::default_host();
        let device = host
            .output_devices()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == device_name))
            .ok_or_else(|| AudioError::DeviceUnavailable(format!("no output device named '{device_name}'")))?;
        let (stream, handle) =
            OutputStream::try_from_device(&device).map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        Ok((stream, handle, device_name.to_string()))
    }

    fn ears(&self) -> ([f32; 3], [f32; 3]) {
        let right = self
            .listener
            .forward
            .cross(self.listener.up)
            .try_normalize()
            .unwrap_or(Vec3::X);
        let left = self.listener.position - right * EAR_OFFSET;
        let right = self.listener.position + right * EAR_OFFSET;
        (left.to_array(), right.to_array())
    }

    fn voice_mut(&mut self, voice: VoiceHandle) -> Option<&mut RodioVoice> {
        self.voices.get_mut(voice.0 as usize)
    }
}

impl AudioBackend for RodioBackend {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn generate_voices(&mut self, requested: usize) -> Vec<VoiceHandle> {
        let available = MAX_HARDWARE_VOICES.saturating_sub(self.voices.len());
        let count = requested.min(available);
        let first = self.voices.len();
        self.voices.extend(std::iter::repeat_with(|| RodioVoice {
            gain: 1.0,
            pitch: 1.0,
            ..RodioVoice::default()
        })
        .take(count));
        (first..first + count).map(|i| VoiceHandle(i as u32)).collect()
    }

    fn create_buffer(&mut self, pcm: &PcmData) -> AudioResult<BufferHandle> {
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(RodioBuffer {
            channels: pcm.format.channels,
            sample_rate: pcm.format.sample_rate,
            samples: Arc::new(pcm.samples.clone()),
        });
        Ok(handle)
    }

    fn set_voice_buffer(&mut self, voice: VoiceHandle, buffer: BufferHandle) {
        if let Some(v) = self.voice_mut(voice) {
            if let Some(sink) = v.sink.take() {
                sink.stop();
            }
            v.buffer = Some(buffer);
        }
    }

    fn set_voice_gain(&mut self, voice: VoiceHandle, gain: f32) {
        let listener_gain = self.listener_gain;
        if let Some(v) = self.voice_mut(voice) {
            v.gain = gain;
            if let Some(sink) = &v.sink {
                sink.set_volume(gain * listener_gain);
            }
        }
    }

    fn set_voice_pitch(&mut self, voice: VoiceHandle, pitch: f32) {
        if let Some(v) = self.voice_mut(voice) {
            v.pitch = pitch;
            if let Some(sink) = &v.sink {
                sink.set_speed(pitch.max(f32::EPSILON));
            }
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
            if let Some(sink) = &v.sink {
                sink.set_emitter_position(position.to_array());
            }
        }
    }

    // rodio has no doppler
    fn set_voice_velocity(&mut self, _voice: VoiceHandle, _velocity: Vec3) {}

    // attenuation is computed by rodio from the ear distance
    fn set_voice_distance_model(&mut self, _voice: VoiceHandle, _reference: f32, _max: f32, _rolloff: f32) {}

    fn voice_play(&mut self, voice: VoiceHandle) {
        let (left, right) = self.ears();
        let listener_gain = self.listener_gain;
        let Some(v) = self.voices.get_mut(voice.0 as usize) else {
            return;
        };
        let Some(buffer) = v.buffer.and_then(|b| self.buffers.get(b.0 as usize)) else {
            return;
        };

        if let Some(sink) = v.sink.take() {
            sink.stop();
        }
        let sink = match SpatialSink::try_new(&self.handle, v.position.to_array(), left, right) {
            Ok(sink) => sink,
            Err(e) => {
                error!("Failed to create spatial sink: {e}");
                return;
            },
        };

        let source = rodio::buffer::SamplesBuffer::new(
            buffer.channels,
            buffer.sample_rate,
            (*buffer.samples).clone(),
        );
        sink.set_volume(v.gain * listener_gain);
        sink.set_speed(v.pitch.max(f32::EPSILON));
        if v.looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        sink.play();
        v.sink = Some(sink);
    }

    fn voice_stop(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voice_mut(voice) {
            if let Some(sink) = v.sink.take() {
                sink.stop();
            }
        }
    }

    fn voice_state(&self, voice: VoiceHandle) -> VoiceState {
        match self.voices.get(voice.0 as usize).and_then(|v| v.sink.as_ref()) {
            Some(sink) if !sink.empty() => VoiceState::Playing,
            Some(_) => VoiceState::Stopped,
            None => VoiceState::Initial,
        }
    }

    fn set_listener(&mut self, listener: &Listener) {
        self.listener = *listener;
        let (left, right) = self.ears();
        for sink in self.voices.iter().filter_map(|v| v.sink.as_ref()) {
            sink.set_left_ear_position(left);
            sink.set_right_ear_position(right);
        }
    }

    fn set_listener_gain(&mut self, gain: f32) {
        self.listener_gain = gain;
        for v in &self.voices {
            if let Some(sink) = &v.sink {
                sink.set_volume(v.gain * gain);
            }
        }
    }

    fn set_doppler_factor(&mut self, _factor: f32) {}

    fn set_speed_of_sound(&mut self, _speed: f32) {}
}
