//! # Roadnoise Audio
//!
//! Positional audio for many simultaneous vehicle sounds.
//!
//! This crate provides:
//! - WAV decoding and a path-keyed PCM buffer cache
//! - Logical audio sources multiplexed onto a bounded pool of hardware voices
//! - The backend capability traits plus headless and rodio implementations
//! - Scene queries used for acoustics (rays against terrain, meshes, boxes)
//! - Environmental acoustics: reverb interpolation, early reflections and
//!   obstruction filtering
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      VoiceManager                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │ AudioSource  │──│ voice pool   │──│  BufferCache   │  │
//! │  │ (unbounded)  │  │ (<= 32)      │  │  (<= 8192)     │  │
//! │  └──────────────┘  └──────────────┘  └────────────────┘  │
//! │          │                 │                             │
//! │          ▼                 ▼                             │
//! │   AcousticScene      AudioBackend ── EfxExtension        │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod assets;
pub mod backend;
pub mod buffer_cache;
pub mod efx;
pub mod scene;
pub mod source;
pub mod voice;
pub mod wav;

pub use assets::{AssetLoader, AssetName, FsAssets, MemoryAssets};
pub use backend::headless::HeadlessBackend;
#[cfg(feature = "rodio-backend")]
pub use backend::rodio::RodioBackend;
pub use backend::{
    AudioBackend, BufferHandle, EfxExtension, EffectSlotHandle, FilterHandle, Listener,
    VoiceHandle, VoiceState,
};
pub use buffer_cache::{BufferCache, BufferId, CachedBuffer};
pub use efx::presets::{PresetLibrary, ReverbProperties};
pub use efx::reverb::{ReverbEffect, ReverbInterpolator};
pub use scene::{AcousticScene, ActorBounds, Aabb, CollisionBox, Ray, StaticScene, Triangle};
pub use source::{AudioSource, ChangeReason, SourceId};
pub use voice::VoiceManager;
pub use wav::{decode_wav, PcmData, PcmFormat};
