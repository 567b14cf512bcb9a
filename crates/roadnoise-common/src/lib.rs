//! # Roadnoise Common
//!
//! Shared types for the roadnoise spatial audio engine.
//!
//! This crate provides the foundations used by every other roadnoise crate:
//! - Identifier types (actor ids, sound link scoping)
//! - Error kinds surfaced by the audio engine
//! - Audio configuration (file, registry keys, environment overrides)
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_scope_matches_triple() {
        let scope = SoundScope::new(ActorId::new(3), LinkType::Hydro, 7);
        assert!(scope.matches(ActorId::new(3), LinkType::Hydro, 7));
        assert!(!scope.matches(ActorId::new(3), LinkType::Hydro, 8));
        assert!(!scope.matches(ActorId::new(4), LinkType::Hydro, 7));
        assert!(!scope.matches(ActorId::new(3), LinkType::Default, 7));
    }

    #[test]
    fn test_default_config_is_valid() {
        let mut config = AudioConfig::default();
        let before = config.clone();
        config.validate();
        assert_eq!(config, before);
    }
}
