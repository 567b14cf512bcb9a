//! Scene queries used by the acoustics pipeline.
//!
//! The game owns the collision database. It is reached through the
//! [`AcousticScene`] trait; [`StaticScene`] is an in-memory implementation
//! that can be loaded from TOML.

use std::fs;
use std::path::Path;

use glam::Vec3;
use roadnoise_common::{ActorId, ConfigError};
use serde::{Deserialize, Serialize};

/// Default edge length of a collision grid cell, in metres.
pub const DEFAULT_CELL_SIZE: f32 = 2.0;

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// The ray from `from` towards `to` and the distance between them.
    #[must_use]
    pub fn between(from: Vec3, to: Vec3) -> (Self, f32) {
        let delta = to - from;
        (Self::new(from, delta), delta.length())
    }

    /// Point at distance `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Checks whether a point lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test. Returns the entry distance, `0.0` when the ray starts
    /// inside.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();
        let t1 = (self.min - ray.origin) * inv;
        let t2 = (self.max - ray.origin) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        if t_far < 0.0 || t_near > t_far {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// A single collision mesh triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// First vertex.
    pub a: Vec3,
    /// Second vertex.
    pub b: Vec3,
    /// Third vertex.
    pub c: Vec3,
}

impl Triangle {
    /// Creates a triangle.
    #[must_use]
    pub const fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Möller–Trumbore intersection, both faces.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-7;
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

fn default_true() -> bool {
    true
}

/// A static collision box placed in the terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    /// Extent.
    pub aabb: Aabb,
    /// Event-only boxes that do not block sound.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Disabled boxes are ignored.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reverb preset used while the listener is inside.
    #[serde(default)]
    pub reverb_preset: Option<String>,
}

impl CollisionBox {
    /// A solid, enabled box without a reverb preset.
    #[must_use]
    pub fn solid(aabb: Aabb) -> Self {
        Self {
            aabb,
            is_virtual: false,
            enabled: true,
            reverb_preset: None,
        }
    }

    /// Whether rays are blocked by this box.
    #[must_use]
    pub fn blocks_sound(&self) -> bool {
        self.enabled && !self.is_virtual
    }
}

/// World-space bounding box of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorBounds {
    /// Vehicle.
    pub actor: ActorId,
    /// Extent.
    pub aabb: Aabb,
}

/// Geometry the acoustics pipeline casts rays against.
pub trait AcousticScene {
    /// Distance to the terrain along `ray`, if hit within `max_distance`.
    fn terrain_hit(&self, ray: &Ray, max_distance: f32) -> Option<f32>;

    /// Distance to the nearest collision triangle along `ray`.
    fn triangle_hit(&self, ray: &Ray, max_distance: f32) -> Option<f32>;

    /// All static collision boxes.
    fn collision_boxes(&self) -> &[CollisionBox];

    /// Bounding boxes of every vehicle.
    fn actor_bounds(&self) -> &[ActorBounds];

    /// Vehicle the listener is sitting in.
    fn occupied_actor(&self) -> Option<ActorId>;

    /// Whether `position` is below the water surface.
    fn is_underwater(&self, position: Vec3) -> bool;

    /// Edge length of a collision grid cell.
    fn cell_size(&self) -> f32 {
        DEFAULT_CELL_SIZE
    }
}

/// Nearest blocking surface along `ray` within `max_distance`.
///
/// Virtual and disabled boxes are skipped, as is the bounding box of
/// `ignore_actor`.
pub fn nearest_surface(
    scene: &dyn AcousticScene,
    ray: &Ray,
    max_distance: f32,
    ignore_actor: Option<ActorId>,
) -> Option<f32> {
    let boxes = scene
        .collision_boxes()
        .iter()
        .filter(|b| b.blocks_sound())
        .filter_map(|b| b.aabb.intersect_ray(ray));
    let actors = scene
        .actor_bounds()
        .iter()
        .filter(|a| Some(a.actor) != ignore_actor)
        .filter_map(|a| a.aabb.intersect_ray(ray));

    scene
        .terrain_hit(ray, max_distance)
        .into_iter()
        .chain(scene.triangle_hit(ray, max_distance))
        .chain(boxes)
        .chain(actors)
        .filter(|&t| t <= max_distance)
        .min_by(f32::total_cmp)
}

/// Reverb preset of the first enabled box containing `position`.
pub fn reverb_preset_at(scene: &dyn AcousticScene, position: Vec3) -> Option<&str> {
    scene
        .collision_boxes()
        .iter()
        .filter(|b| b.enabled && b.aabb.contains(position))
        .find_map(|b| b.reverb_preset.as_deref())
}

/// In-memory scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticScene {
    /// Height of a flat ground plane.
    pub ground: Option<f32>,
    /// Height of the water surface.
    pub water_level: Option<f32>,
    /// Collision grid cell size.
    pub cell_size: f32,
    /// Static boxes.
    pub boxes: Vec<CollisionBox>,
    /// Collision mesh.
    pub triangles: Vec<Triangle>,
    /// Vehicle bounds.
    pub actors: Vec<ActorBounds>,
    /// Vehicle the listener sits in.
    pub player_actor: Option<ActorId>,
}

impl Default for StaticScene {
    fn default() -> Self {
        Self {
            ground: None,
            water_level: None,
            cell_size: DEFAULT_CELL_SIZE,
            boxes: Vec::new(),
            triangles: Vec::new(),
            actors: Vec::new(),
            player_actor: None,
        }
    }
}

impl StaticScene {
    /// An empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scene description.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a scene description from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Add a box, returning its index.
    pub fn add_box(&mut self, collision_box: CollisionBox) -> usize {
        self.boxes.push(collision_box);
        self.boxes.len() - 1
    }

    /// Remove a box by index.
    pub fn remove_box(&mut self, index: usize) -> Option<CollisionBox> {
        (index < self.boxes.len()).then(|| self.boxes.remove(index))
    }

    /// Add or move a vehicle.
    pub fn set_actor_bounds(&mut self, actor: ActorId, aabb: Aabb) {
        match self.actors.iter_mut().find(|a| a.actor == actor) {
            Some(existing) => existing.aabb = aabb,
            None => self.actors.push(ActorBounds { actor, aabb }),
        }
    }
}

impl AcousticScene for StaticScene {
    fn terrain_hit(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        let height = self.ground?;
        if ray.direction.y == 0.0 {
            return None;
        }
        let t = (height - ray.origin.y) / ray.direction.y;
        (0.0..=max_distance).contains(&t).then_some(t)
    }

    fn triangle_hit(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        self.triangles
            .iter()
            .filter_map(|tri| tri.intersect_ray(ray))
            .filter(|&t| t <= max_distance)
            .min_by(f32::total_cmp)
    }

    fn collision_boxes(&self) -> &[CollisionBox] {
        &self.boxes
    }

    fn actor_bounds(&self) -> &[ActorBounds] {
        &self.actors
    }

    fn occupied_actor(&self) -> Option<ActorId> {
        self.player_actor
    }

    fn is_underwater(&self, position: Vec3) -> bool {
        self.water_level.is_some_and(|level| position.y < level)
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Aabb {
        Aabb::new(Vec3::new(3.0, -1.0, -1.0), Vec3::new(4.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_slab() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!((wall().intersect_ray(&ray).expect("hit") - 3.0).abs() < 1e-6);

        let away = Ray::new(Vec3::ZERO, Vec3::NEG_X);
        assert!(wall().intersect_ray(&away).is_none());

        let above = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::X);
        assert!(wall().intersect_ray(&above).is_none());
    }

    #[test]
    fn test_aabb_inside() {
        let ray = Ray::new(Vec3::new(3.5, 0.0, 0.0), Vec3::Z);
        assert_eq!(wall().intersect_ray(&ray), Some(0.0));
        assert!(wall().contains(Vec3::new(3.5, 0.0, 0.0)));
        assert!(!wall().contains(Vec3::ZERO));
    }

    #[test]
    fn test_triangle() {
        let tri = Triangle::new(
            Vec3::new(5.0, -1.0, -1.0),
            Vec3::new(5.0, 1.0, -1.0),
            Vec3::new(5.0, 0.0, 1.0),
        );
        let hit = tri.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::X));
        assert!((hit.expect("hit") - 5.0).abs() < 1e-5);
        assert!(tri.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::Y)).is_none());
        assert!(tri
            .intersect_ray(&Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X))
            .is_none());
    }

    #[test]
    fn test_nearest_surface_filters() {
        let mut scene = StaticScene::new();
        scene.boxes.push(CollisionBox {
            is_virtual: true,
            ..CollisionBox::solid(Aabb::new(Vec3::new(1.0, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0)))
        });
        scene.set_actor_bounds(
            ActorId::new(7),
            Aabb::new(Vec3::new(2.0, -1.0, -1.0), Vec3::new(2.5, 1.0, 1.0)),
        );
        scene.add_box(CollisionBox::solid(wall()));

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let with_actor = nearest_surface(&scene, &ray, 10.0, None).expect("hit");
        assert!((with_actor - 2.0).abs() < 1e-6);

        let without_actor = nearest_surface(&scene, &ray, 10.0, Some(ActorId::new(7))).expect("hit");
        assert!((without_actor - 3.0).abs() < 1e-6);

        assert!(nearest_surface(&scene, &ray, 2.5, Some(ActorId::new(7))).is_none());
    }

    #[test]
    fn test_ground_plane() {
        let scene = StaticScene {
            ground: Some(-1.0),
            ..StaticScene::new()
        };
        let down = Ray::new(Vec3::ZERO, Vec3::NEG_Y);
        assert_eq!(scene.terrain_hit(&down, 5.0), Some(1.0));
        assert_eq!(scene.terrain_hit(&Ray::new(Vec3::ZERO, Vec3::X), 5.0), None);
        assert_eq!(scene.terrain_hit(&down, 0.5), None);
    }

    #[test]
    fn test_reverb_preset_and_water() {
        let mut scene = StaticScene::new();
        scene.water_level = Some(0.0);
        scene.add_box(CollisionBox {
            reverb_preset: Some("EFX_REVERB_PRESET_DRIVING_TUNNEL".into()),
            ..CollisionBox::solid(wall())
        });

        assert_eq!(
            reverb_preset_at(&scene, Vec3::new(3.5, 0.0, 0.0)),
            Some("EFX_REVERB_PRESET_DRIVING_TUNNEL")
        );
        assert_eq!(reverb_preset_at(&scene, Vec3::ZERO), None);
        assert!(scene.is_underwater(Vec3::new(0.0, -0.1, 0.0)));
        assert!(!scene.is_underwater(Vec3::new(0.0, 0.1, 0.0)));
    }

    #[test]
    fn test_scene_from_toml() {
        let scene = StaticScene::from_toml_str(
            r#"
            ground = -2.0
            player_actor = 1

            [[boxes]]
            aabb = { min = [3.0, -1.0, -1.0], max = [4.0, 1.0, 1.0] }
            reverb_preset = "EFX_REVERB_PRESET_CAVE"

            [[boxes]]
            aabb = { min = [0.0, 0.0, 0.0], max = [1.0, 1.0, 1.0] }
            virtual = true

            [[actors]]
            actor = 1
            aabb = { min = [-1.0, -1.0, -2.0], max = [1.0, 1.0, 2.0] }
            "#,
        )
        .expect("parse");

        assert_eq!(scene.boxes.len(), 2);
        assert!(scene.boxes[0].enabled);
        assert!(scene.boxes[1].is_virtual);
        assert_eq!(scene.occupied_actor(), Some(ActorId::new(1)));
        assert_eq!(scene.cell_size(), DEFAULT_CELL_SIZE);
    }

    #[test]
    fn test_remove_box() {
        let mut scene = StaticScene::new();
        let index = scene.add_box(CollisionBox::solid(wall()));
        assert!(scene.remove_box(index).is_some());
        assert!(scene.remove_box(index).is_none());
    }
}
