//! Path-keyed cache of decoded PCM buffers.
//!
//! Buffers are immutable once uploaded and live until the cache is dropped.

use ahash::AHashMap;
use roadnoise_common::{AudioError, AudioResult, CapacityKind};
use tracing::{debug, warn};

use crate::assets::AssetLoader;
use crate::backend::{AudioBackend, BufferHandle};
use crate::wav::{decode_wav, PcmFormat};

/// Default cache capacity.
pub const MAX_BUFFERS: usize = 8192;

/// Index of a cached buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index in the cache.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A buffer uploaded to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBuffer {
    /// Asset name the buffer was loaded from.
    pub path: String,
    /// Sample layout.
    pub format: PcmFormat,
    /// Backend handle.
    pub handle: BufferHandle,
    /// Length at native pitch, in seconds.
    pub duration: f32,
}

/// Deduplicating buffer cache.
#[derive(Debug)]
pub struct BufferCache {
    buffers: Vec<CachedBuffer>,
    by_path: AHashMap<String, BufferId>,
    capacity: usize,
    full_logged: bool,
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new(MAX_BUFFERS)
    }
}

impl BufferCache {
    /// Create a cache holding at most `capacity` buffers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Vec::new(),
            by_path: AHashMap::new(),
            capacity,
            full_logged: false,
        }
    }

    /// Return the buffer for `path`, loading and uploading it on first use.
    pub fn acquire<B: AudioBackend + ?Sized>(
        &mut self,
        path: &str,
        group: Option<&str>,
        assets: &dyn AssetLoader,
        backend: &mut B,
    ) -> AudioResult<BufferId> {
        if let Some(&id) = self.by_path.get(path) {
            return Ok(id);
        }

        if self.buffers.len() >= self.capacity {
            if !self.full_logged {
                warn!("Audio buffer cache full (max: {})", self.capacity);
                self.full_logged = true;
            }
            return Err(AudioError::CapacityExceeded {
                kind: CapacityKind::Buffers,
                max: self.capacity,
            });
        }

        let bytes = assets.read(path, group)?;
        let pcm = decode_wav(path, &bytes)?;
        let handle = backend.create_buffer(&pcm)?;

        let id = BufferId::new(self.buffers.len());
        self.buffers.push(CachedBuffer {
            path: path.to_string(),
            format: pcm.format,
            handle,
            duration: pcm.duration_secs(),
        });
        self.by_path.insert(path.to_string(), id);

        debug!(
            "Loaded buffer '{path}' ({} Hz, {} ch, {:.2}s)",
            pcm.format.sample_rate,
            pcm.format.channels,
            pcm.duration_secs()
        );
        Ok(id)
    }

    /// Look up a loaded buffer.
    #[must_use]
    pub fn get(&self, id: BufferId) -> Option<&CachedBuffer> {
        self.buffers.get(id.index())
    }

    /// Look up a buffer id by path without loading.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<BufferId> {
        self.by_path.get(path).copied()
    }

    /// Number of loaded buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Capacity fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::backend::headless::HeadlessBackend;
    use crate::wav::silence_wav;

    #[test]
    fn test_dedup_by_path() {
        let assets = MemoryAssets::new()
            .with("engine.wav", silence_wav(800))
            .with("horn.wav", silence_wav(80));
        let mut backend = HeadlessBackend::new(4);
        let mut cache = BufferCache::default();

        let a = cache.acquire("engine.wav", None, &assets, &mut backend).expect("a");
        let b = cache.acquire("engine.wav", None, &assets, &mut backend).expect("b");
        let c = cache.acquire("horn.wav", None, &assets, &mut backend).expect("c");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);
        assert_eq!(backend.buffer_count(), 2);
        assert!((cache.get(a).expect("cached").duration - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_capacity() {
        let assets = MemoryAssets::new()
            .with("a.wav", silence_wav(10))
            .with("b.wav", silence_wav(10));
        let mut backend = HeadlessBackend::new(1);
        let mut cache = BufferCache::new(1);

        cache.acquire("a.wav", None, &assets, &mut backend).expect("first");
        let err = cache.acquire("b.wav", None, &assets, &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AudioError::CapacityExceeded {
                kind: CapacityKind::Buffers,
                max: 1
            }
        ));
        // already cached paths still resolve when full
        assert!(cache.acquire("a.wav", None, &assets, &mut backend).is_ok());
    }

    #[test]
    fn test_errors_propagate() {
        let assets = MemoryAssets::new().with("bad.wav", b"nope".to_vec());
        let mut backend = HeadlessBackend::new(1);
        let mut cache = BufferCache::default();

        assert!(matches!(
            cache.acquire("bad.wav", None, &assets, &mut backend),
            Err(AudioError::DecodeFailed { .. })
        ));
        assert!(matches!(
            cache.acquire("missing.wav", None, &assets, &mut backend),
            Err(AudioError::IoFailed { .. })
        ));
        assert!(cache.is_empty());
    }
}
