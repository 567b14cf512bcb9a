//! Direct-path obstruction between listener and sources.

use glam::Vec3;
use roadnoise_common::ActorId;

use crate::scene::{nearest_surface, AcousticScene, Ray};

/// Broadband gain of the obstruction low-pass.
pub const OBSTRUCTION_GAIN: f32 = 0.33;

/// High-frequency gain of the obstruction low-pass.
pub const OBSTRUCTION_GAIN_HF: f32 = 0.25;

/// Filter state of one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstructionState {
    /// Direct path is clear.
    #[default]
    Unfiltered,
    /// Low-pass attached.
    Filtered,
}

impl ObstructionState {
    /// State for an obstruction test result.
    #[must_use]
    pub const fn from_obstructed(obstructed: bool) -> Self {
        if obstructed {
            Self::Filtered
        } else {
            Self::Unfiltered
        }
    }

    /// Whether the low-pass is attached.
    #[must_use]
    pub const fn is_filtered(self) -> bool {
        matches!(self, Self::Filtered)
    }
}

/// Test the segment from `listener` to `source`.
///
/// A listener sitting inside a vehicle hears everything muffled. The
/// source's own vehicle never blocks it.
pub fn is_obstructed(scene: &dyn AcousticScene, listener: Vec3, source: Vec3, owner: ActorId) -> bool {
    if scene.occupied_actor().is_some() {
        return true;
    }

    let (ray, length) = Ray::between(listener, source);
    if length <= f32::EPSILON {
        return false;
    }
    let ignore = owner.is_actor().then_some(owner);
    nearest_surface(scene, &ray, length, ignore).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Aabb, CollisionBox, StaticScene};

    fn wall() -> CollisionBox {
        CollisionBox::solid(Aabb::new(Vec3::new(3.0, -1.0, -1.0), Vec3::new(4.0, 1.0, 1.0)))
    }

    #[test]
    fn test_clear_and_blocked() {
        let mut scene = StaticScene::new();
        let source = Vec3::new(10.0, 0.0, 0.0);
        assert!(!is_obstructed(&scene, Vec3::ZERO, source, ActorId::UNKNOWN));

        let index = scene.add_box(wall());
        assert!(is_obstructed(&scene, Vec3::ZERO, source, ActorId::UNKNOWN));

        // wall is past the source
        assert!(!is_obstructed(&scene, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), ActorId::UNKNOWN));

        scene.remove_box(index);
        assert!(!is_obstructed(&scene, Vec3::ZERO, source, ActorId::UNKNOWN));
    }

    #[test]
    fn test_own_vehicle_does_not_block() {
        let mut scene = StaticScene::new();
        let truck = ActorId::new(4);
        scene.set_actor_bounds(truck, Aabb::from_center(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(2.0)));

        let source = Vec3::new(10.0, 0.0, 0.0);
        assert!(!is_obstructed(&scene, Vec3::ZERO, source, truck));
        assert!(is_obstructed(&scene, Vec3::ZERO, source, ActorId::new(5)));
    }

    #[test]
    fn test_inside_vehicle_muffles_everything() {
        let mut scene = StaticScene::new();
        scene.player_actor = Some(ActorId::new(1));
        assert!(is_obstructed(&scene, Vec3::ZERO, Vec3::X, ActorId::new(1)));
    }

    #[test]
    fn test_state_mapping() {
        assert!(ObstructionState::from_obstructed(true).is_filtered());
        assert!(!ObstructionState::from_obstructed(false).is_filtered());
        assert_eq!(ObstructionState::default(), ObstructionState::Unfiltered);
    }
}
