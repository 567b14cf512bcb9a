//! Early reflection panning from nearby surfaces.
//!
//! Four horizontal rays are cast around the listener. Surfaces that are
//! close on one side pull the reflections towards that side and make them
//! louder. Vertical reflections are not modelled.

use std::f32::consts::{FRAC_PI_2, PI, SQRT_2};

use glam::{Quat, Vec3};

use super::presets::{ReverbProperties, MAX_REFLECTIONS_GAIN};
use crate::backend::Listener;
use crate::scene::{nearest_surface, AcousticScene, Ray};

/// Extra reflections gain when surfaces are close on one side.
pub const REFLECTION_GAIN_BOOST: f32 = 2.0;

/// Upper bound of the reflections delay accepted by the reverb model.
pub const MAX_REFLECTIONS_DELAY: f32 = 0.3;

/// Result of the reflection raycasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyReflections {
    /// Pan in the reverb model's listener frame, magnitude at most 1.
    pub pan: Vec3,
    /// Reflections delay in seconds.
    pub delay: f32,
    /// Reflections gain.
    pub gain: f32,
}

impl EarlyReflections {
    /// Cast the reflection rays and derive pan, delay and gain from the hits.
    pub fn compute(
        scene: &dyn AcousticScene,
        listener: &Listener,
        preset: &ReverbProperties,
        speed_of_sound: f32,
    ) -> Self {
        let max_range = 2.0 * scene.cell_size();
        let forward = horizontal_forward(listener.forward);
        let ignore = scene.occupied_actor();

        let mut pan = Vec3::ZERO;
        let mut closest: Option<f32> = None;
        for quarter in 0..4 {
            let direction = Quat::from_rotation_y(quarter as f32 * FRAC_PI_2) * forward;
            let ray = Ray::new(listener.position, direction);
            if let Some(distance) = nearest_surface(scene, &ray, max_range, ignore) {
                pan += ray.direction * (max_range - distance);
                closest = Some(closest.map_or(distance, |c: f32| c.min(distance)));
            }
        }

        let Some(closest) = closest else {
            return Self {
                pan: Vec3::ZERO,
                delay: preset.reflections_delay,
                gain: preset.reflections_gain,
            };
        };

        let norm = SQRT_2 * max_range;
        let magnitude = 1.0 - pan.length() / norm;
        let delay = if speed_of_sound > 0.0 {
            (closest / speed_of_sound).min(MAX_REFLECTIONS_DELAY)
        } else {
            preset.reflections_delay
        };
        let gain = (preset.reflections_gain + REFLECTION_GAIN_BOOST * (1.0 - magnitude)).min(MAX_REFLECTIONS_GAIN);

        Self {
            pan: to_listener_frame(pan / norm, forward).clamp_length_max(1.0),
            delay,
            gain,
        }
    }

    /// Write pan, delay and gain into a property set.
    pub fn apply(&self, properties: &mut ReverbProperties) {
        properties.reflections_pan = self.pan.to_array();
        properties.reflections_delay = self.delay;
        properties.reflections_gain = self.gain;
    }
}

fn horizontal_forward(forward: Vec3) -> Vec3 {
    let flat = Vec3::new(forward.x, 0.0, forward.z);
    flat.try_normalize().unwrap_or(Vec3::NEG_Z)
}

/// Rotate a world-space horizontal vector into the listener frame and flip
/// Z for the left-handed reverb model.
fn to_listener_frame(world: Vec3, forward: Vec3) -> Vec3 {
    let yaw = if forward.dot(Vec3::NEG_Z) < -0.9999 {
        Quat::from_rotation_y(PI)
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, forward)
    };
    let local = yaw.inverse() * world;
    Vec3::new(local.x, local.y, -local.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efx::presets::PresetLibrary;
    use crate::scene::{Aabb, CollisionBox, StaticScene};
    use roadnoise_common::ActorId;

    fn generic() -> ReverbProperties {
        *PresetLibrary::builtin()
            .get("EFX_REVERB_PRESET_GENERIC")
            .expect("generic")
    }

    fn listener_facing(forward: Vec3) -> Listener {
        Listener {
            forward,
            ..Listener::default()
        }
    }

    fn wall_at_x(x: f32) -> CollisionBox {
        CollisionBox::solid(Aabb::new(Vec3::new(x, -5.0, -5.0), Vec3::new(x + 1.0, 5.0, 5.0)))
    }

    #[test]
    fn test_open_space_keeps_preset() {
        let scene = StaticScene::new();
        let r = EarlyReflections::compute(&scene, &Listener::default(), &generic(), 343.3);
        assert_eq!(r.pan, Vec3::ZERO);
        assert_eq!(r.delay, generic().reflections_delay);
        assert_eq!(r.gain, generic().reflections_gain);
    }

    #[test]
    fn test_wall_on_the_right() {
        let mut scene = StaticScene::new();
        scene.add_box(wall_at_x(1.0));

        // facing -Z, world +X is the listener's right
        let r = EarlyReflections::compute(&scene, &listener_facing(Vec3::NEG_Z), &generic(), 343.3);
        assert!(r.pan.x > 0.0);
        assert!(r.pan.z.abs() < 1e-5);
        assert!((r.delay - 1.0 / 343.3).abs() < 1e-6);
        assert!(r.gain > generic().reflections_gain);
        assert!(r.gain <= MAX_REFLECTIONS_GAIN);
        assert!(r.pan.length() <= 1.0);
    }

    #[test]
    fn test_wall_behind_when_facing_plus_z() {
        let mut scene = StaticScene::new();
        scene.add_box(CollisionBox::solid(Aabb::new(
            Vec3::new(-5.0, -5.0, -2.0),
            Vec3::new(5.0, 5.0, -1.0),
        )));

        // facing +Z, the wall at -Z is behind: negative Z in the reverb frame
        let r = EarlyReflections::compute(&scene, &listener_facing(Vec3::Z), &generic(), 343.3);
        assert!(r.pan.z < 0.0);
        assert!(r.pan.x.abs() < 1e-5);
    }

    #[test]
    fn test_wall_ahead_is_positive_z() {
        let mut scene = StaticScene::new();
        scene.add_box(CollisionBox::solid(Aabb::new(
            Vec3::new(-5.0, -5.0, -2.0),
            Vec3::new(5.0, 5.0, -1.0),
        )));
        let r = EarlyReflections::compute(&scene, &listener_facing(Vec3::NEG_Z), &generic(), 343.3);
        assert!(r.pan.z > 0.0);
    }

    #[test]
    fn test_symmetric_walls_cancel_pan() {
        let mut scene = StaticScene::new();
        scene.add_box(wall_at_x(1.0));
        scene.add_box(wall_at_x(-2.0));
        let r = EarlyReflections::compute(&scene, &Listener::default(), &generic(), 343.3);
        assert!(r.pan.length() < 1e-5);
        assert!((r.gain - generic().reflections_gain).abs() < 1e-5);
    }

    #[test]
    fn test_occupied_actor_is_ignored() {
        let mut scene = StaticScene::new();
        scene.set_actor_bounds(
            ActorId::new(1),
            Aabb::from_center(Vec3::ZERO, Vec3::new(1.0, 1.0, 2.0)),
        );
        scene.player_actor = Some(ActorId::new(1));
        let r = EarlyReflections::compute(&scene, &Listener::default(), &generic(), 343.3);
        assert_eq!(r.pan, Vec3::ZERO);
    }

    #[test]
    fn test_apply() {
        let mut props = generic();
        let r = EarlyReflections {
            pan: Vec3::new(0.5, 0.0, 0.0),
            delay: 0.01,
            gain: 1.5,
        };
        r.apply(&mut props);
        assert_eq!(props.reflections_pan, [0.5, 0.0, 0.0]);
        assert_eq!(props.reflections_delay, 0.01);
        assert_eq!(props.reflections_gain, 1.5);
    }
}
