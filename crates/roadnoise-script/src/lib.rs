//! # Roadnoise Script
//!
//! Soundscripts bind simulation events to audio.
//!
//! This crate provides:
//! - Trigger and modulator kind tables
//! - Soundscript templates and the text parser
//! - Script instances with multi-sample pitch cross-fading
//! - The script index and trigger debouncing
//! - [`SoundEngine`], the API gameplay code talks to
//!
//! ```text
//!  trig_start(actor, Engine) ──> ScriptIndex[Engine] ──> instance.start()
//!  modulate(actor, EngineRpm, v) ──> gain / pitch index ──> instance.set_gain / set_pitch
//!                                                                │
//!                                                                v
//!                                                          VoiceManager
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod engine;
pub mod instance;
pub mod kinds;
pub mod manager;
pub mod parser;
pub mod template;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::instance::*;
    pub use crate::kinds::*;
    pub use crate::manager::*;
    pub use crate::parser::*;
    pub use crate::template::*;
}

pub use prelude::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    /// Silent mono 16-bit WAVE at 8 kHz.
    pub fn silence(frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for _ in 0..frames {
                writer.write_sample(0i16).expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }
}
