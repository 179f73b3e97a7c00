//! Picking rays and box collision for walking through the environment.
//!
//! Every pickable environment node carries a world-space [`Aabb`] and mouse
//! clicks become a [`Ray`] tested with [`raycast_pickable`]. Collidable nodes
//! are broken into one box per world-space triangle, so a single mesh that
//! encloses the visitor (a whole room shell) still blocks them. The walk
//! camera's body is a box built from its ellipsoid radii and is moved with
//! [`sweep`].

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use crate::environment::MeshFlags;
use crate::geometry::RawGeometry;
use crate::mesh::Transform;

/// Tolerance for float drift when the body rests on a collider face.
const SKIN: f32 = 1e-3;

/// A ray in 3D space with a normalized direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a pixel.
    pub fn from_screen(
        screen_x: f32,
        screen_y: f32,
        screen_width: f32,
        screen_height: f32,
        view_matrix: Mat4,
        projection_matrix: Mat4,
    ) -> Self {
        let ndc_x = (2.0 * screen_x / screen_width) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen_y / screen_height); // Y is flipped

        let inv_view_proj = (projection_matrix * view_matrix).inverse();
        let near_world = inv_view_proj * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far_world = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the nearest positive intersection with a box, slab method.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab
                if origin < aabb.min[i] || origin > aabb.max[i] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (aabb.min[i] - origin) * inv_dir;
                let mut t2 = (aabb.max[i] - origin) * inv_dir;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Strict overlap; touching faces do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && self.max.cmpgt(other.min).all()
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    fn shrunk(&self, amount: f32) -> Self {
        Self {
            min: self.min + Vec3::splat(amount),
            max: self.max - Vec3::splat(amount),
        }
    }
}

/// Move `body` by `delta`, stopping against `colliders`.
///
/// Axes are resolved one at a time, Y first, so a blocked axis does not stop
/// motion along the others and the body slides along walls and floors.
/// Colliders the body already overlaps by more than a small skin are ignored
/// so it can never get stuck inside geometry. Returns the displacement
/// actually applied.
pub fn sweep(body: Aabb, delta: Vec3, colliders: &[Aabb]) -> Vec3 {
    let core = body.shrunk(SKIN);
    let blocking: Vec<&Aabb> = colliders.iter().filter(|c| !core.overlaps(c)).collect();
    let mut current = body;
    let mut applied = Vec3::ZERO;

    for axis in [1, 0, 2] {
        let step = delta[axis];
        if step == 0.0 {
            continue;
        }

        let mut allowed = step;
        for collider in &blocking {
            if !overlaps_on_other_axes(&current, collider, axis) {
                continue;
            }
            if step > 0.0 {
                let gap = collider.min[axis] - current.max[axis];
                if gap >= -SKIN && gap < allowed {
                    allowed = gap;
                }
            } else {
                let gap = collider.max[axis] - current.min[axis];
                if gap <= SKIN && gap > allowed {
                    allowed = gap;
                }
            }
        }

        let mut offset = Vec3::ZERO;
        offset[axis] = allowed;
        current = current.translated(offset);
        applied[axis] = allowed;
    }

    applied
}

fn overlaps_on_other_axes(a: &Aabb, b: &Aabb, axis: usize) -> bool {
    (0..3)
        .filter(|&i| i != axis)
        .all(|i| a.min[i] + SKIN < b.max[i] && a.max[i] - SKIN > b.min[i])
}

/// One world-space box per triangle of `geometry`.
///
/// Flat triangles give boxes with zero thickness along their normal axis,
/// which [`sweep`] still treats as a blocking face.
pub fn triangle_boxes(geometry: &RawGeometry, matrix: Mat4) -> impl Iterator<Item = Aabb> + '_ {
    geometry.indices.chunks_exact(3).filter_map(move |tri| {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &index in tri {
            let vertex = geometry.vertices.get(index as usize)?;
            let p = matrix.transform_point3(Vec3::from(vertex.position));
            min = min.min(p);
            max = max.max(p);
        }
        Some(Aabb::new(min, max))
    })
}

/// Per-triangle world boxes of every collidable entity.
pub fn collidable_boxes(world: &hecs::World) -> Vec<Aabb> {
    world
        .query::<(&Transform, &Arc<RawGeometry>, &MeshFlags)>()
        .iter()
        .filter(|(_, (_, _, flags))| flags.collidable)
        .flat_map(|(_, (transform, geometry, _))| {
            triangle_boxes(geometry, transform.matrix()).collect::<Vec<_>>()
        })
        .collect()
}

/// A ray hit on a pickable entity.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub entity: hecs::Entity,
    pub distance: f32,
    pub point: Vec3,
}

/// Nearest pickable entity along the ray.
pub fn raycast_pickable(world: &hecs::World, ray: &Ray) -> Option<RayHit> {
    world
        .query::<(&Aabb, &MeshFlags)>()
        .iter()
        .filter(|(_, (_, flags))| flags.pickable)
        .filter_map(|(entity, (aabb, _))| {
            ray.intersect_aabb(aabb).map(|distance| RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}
