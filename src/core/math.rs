//=========================================================================
// Geometry Primitives
//=========================================================================
//
// Rays and axis-aligned bounding boxes used by picking.
//
// Rays are never normalized here: pick tests transform them into local
// node space, where the direction length carries the model scale.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::{Mat4, Vec3};

//=== Ray =================================================================

/// A pointer ray: origin plus (not necessarily unit) direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start of the ray.
    pub origin: Vec3,
    /// Direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray from an origin and a direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Returns `false` for rays that must never produce a pick:
    /// any NaN direction component, or an all-zero direction.
    pub fn is_valid(&self) -> bool {
        !self.direction.is_nan() && self.direction != Vec3::ZERO
    }

    /// Point at parameter `t` along the ray.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transforms origin (as a point) and direction (as a vector).
    pub fn transformed(&self, matrix: &Mat4) -> Ray {
        Ray {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }
}

//=== Aabb ================================================================

/// Axis-aligned bounding box. The empty box has `min > max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box containing nothing; identity for [`Aabb::union`].
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on the origin with the given half extents.
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        Self { min: -h, max: h }
    }

    /// Smallest box containing every point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| Aabb {
            min: acc.min.min(*p),
            max: acc.max.max(*p),
        })
    }

    /// Returns `true` if the box contains no point.
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// World-space box enclosing this box after `matrix` is applied.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return Self::EMPTY;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved: Vec<Vec3> = corners.iter().map(|c| matrix.transform_point3(*c)).collect();
        Self::from_points(&moved)
    }

    /// Slab test. Returns the ray parameter of the entry point
    /// (0 when the origin is inside), or `None` on a miss.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];

            if dir.abs() < f32::EPSILON {
                // Parallel to the slab: must already be between the planes
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_half_extents(Vec3::ONE)
    }

    //--- Ray --------------------------------------------------------------

    #[test]
    fn zero_direction_is_invalid() {
        assert!(!Ray::new(Vec3::ZERO, Vec3::ZERO).is_valid());
    }

    #[test]
    fn nan_component_is_invalid() {
        assert!(!Ray::new(Vec3::ZERO, Vec3::new(0.0, f32::NAN, -1.0)).is_valid());
    }

    #[test]
    fn ordinary_direction_is_valid() {
        assert!(Ray::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::NEG_Z).is_valid());
    }

    //--- Aabb -------------------------------------------------------------

    #[test]
    fn empty_box_never_hits() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(Aabb::EMPTY.intersect_ray(&ray), None);
    }

    #[test]
    fn union_with_empty_is_identity() {
        let b = unit_box();
        assert_eq!(Aabb::EMPTY.union(&b), b);
    }

    #[test]
    fn ray_hits_box_in_front() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = unit_box().intersect_ray(&ray).expect("should hit");
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_box_behind() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert_eq!(unit_box().intersect_ray(&ray), None);
    }

    #[test]
    fn ray_starting_inside_reports_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(unit_box().intersect_ray(&ray), Some(0.0));
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let ray = Ray::new(Vec3::new(0.0, 3.0, 5.0), Vec3::NEG_Z);
        assert_eq!(unit_box().intersect_ray(&ray), None);
    }

    #[test]
    fn transformed_box_follows_translation() {
        let moved = unit_box().transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert!((moved.min.x - 9.0).abs() < 1e-5);
        assert!((moved.max.x - 11.0).abs() < 1e-5);
    }
}
