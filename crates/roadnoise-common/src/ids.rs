//! Identifier types for actors and sound scoping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated actor (vehicle) owning sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(i32);

impl ActorId {
    /// Sounds whose owner is not known.
    pub const UNKNOWN: Self = Self(-1);

    /// Sounds attached to static terrain objects.
    pub const TERRAIN_OBJECT: Self = Self(-2);

    /// Creates an actor id from a raw value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Checks whether this id refers to a real actor.
    #[must_use]
    pub const fn is_actor(self) -> bool {
        self.0 >= 0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of actor part a sound script instance is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LinkType {
    /// Not linked to any particular part.
    #[default]
    Default,
    /// A user command (hydraulic command key).
    Command,
    /// A hydraulic cylinder.
    Hydro,
    /// A collision event.
    Collision,
    /// A shock absorber.
    Shocks,
    /// A brake.
    Brakes,
    /// A rope.
    Ropes,
    /// A tie.
    Ties,
    /// A particle emitter.
    Particles,
    /// An axle.
    Axles,
    /// A flare (light).
    Flares,
    /// A flexible body.
    Flexbodies,
    /// An exhaust.
    Exhausts,
    /// A video camera.
    VideoCamera,
}

impl LinkType {
    /// All link types in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Default,
        Self::Command,
        Self::Hydro,
        Self::Collision,
        Self::Shocks,
        Self::Brakes,
        Self::Ropes,
        Self::Ties,
        Self::Particles,
        Self::Axles,
        Self::Flares,
        Self::Flexbodies,
        Self::Exhausts,
        Self::VideoCamera,
    ];

    /// Name used in scripts and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Command => "command",
            Self::Hydro => "hydro",
            Self::Collision => "collision",
            Self::Shocks => "shocks",
            Self::Brakes => "brakes",
            Self::Ropes => "ropes",
            Self::Ties => "ties",
            Self::Particles => "particles",
            Self::Axles => "axles",
            Self::Flares => "flares",
            Self::Flexbodies => "flexbodies",
            Self::Exhausts => "exhausts",
            Self::VideoCamera => "videocamera",
        }
    }

    /// Parses a link type from its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }
}

/// Item id used when a sound is not linked to a specific part.
pub const LINK_ITEM_NONE: i32 = -1;

/// The `(actor, link type, link item)` triple scoping a script instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundScope {
    /// Owning actor.
    pub actor: ActorId,
    /// Kind of linked part.
    pub link_type: LinkType,
    /// Index of the linked part, or [`LINK_ITEM_NONE`].
    pub link_item: i32,
}

impl SoundScope {
    /// Creates a new scope.
    #[must_use]
    pub const fn new(actor: ActorId, link_type: LinkType, link_item: i32) -> Self {
        Self {
            actor,
            link_type,
            link_item,
        }
    }

    /// Scope for an actor-wide sound with no linked part.
    #[must_use]
    pub const fn actor(actor: ActorId) -> Self {
        Self::new(actor, LinkType::Default, LINK_ITEM_NONE)
    }

    /// Checks whether this scope equals the given triple.
    #[must_use]
    pub fn matches(&self, actor: ActorId, link_type: LinkType, link_item: i32) -> bool {
        self.actor == actor && self.link_type == link_type && self.link_item == link_item
    }
}

impl From<ActorId> for SoundScope {
    fn from(actor: ActorId) -> Self {
        Self::actor(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_type_names_round_trip() {
        for link in LinkType::ALL {
            assert_eq!(LinkType::from_name(link.name()), Some(link));
        }
        assert_eq!(LinkType::from_name("wings"), None);
    }

    #[test]
    fn test_actor_id_constants() {
        assert!(!ActorId::UNKNOWN.is_actor());
        assert!(!ActorId::TERRAIN_OBJECT.is_actor());
        assert!(ActorId::new(0).is_actor());
        assert_eq!(ActorId::default(), ActorId::UNKNOWN);
    }
}
