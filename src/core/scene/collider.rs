//=========================================================================
// Colliders
//=========================================================================
//
// Exact pick shapes attached to scene nodes.
//
// All tests run in node-local space: the world ray is moved through the
// inverse model matrix, intersected, and the hit is mapped back so the
// reported point and distance are in world units.
//
// A group holds several colliders placed in the owner's local space (each
// member may carry its own offset) and reports the nearest member hit.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::{Mat4, Vec3};

//=== Internal Dependencies ===============================================

use super::Mesh;
use crate::core::math::{Aabb, Ray};

//=== ColliderShape =======================================================

/// Geometry used for exact pick tests.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// Box centered on the node origin.
    Box {
        /// Half size along each local axis.
        half_extents: Vec3,
    },
    /// Sphere centered on the node origin.
    Sphere {
        /// Radius in local units.
        radius: f32,
    },
    /// Triangles of the node's mesh.
    Mesh,
    /// Member colliders; the nearest member hit wins.
    Group(Vec<Collider>),
}

//=== ColliderHit =========================================================

/// Result of a successful exact test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderHit {
    /// Hit point in world space.
    pub point: Vec3,
    /// World distance from the ray origin.
    pub distance: f32,
}

//=== Collider ============================================================

/// Pick shape plus per-collider options.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    shape: ColliderShape,
    offset: Mat4,
    pick_distance: f32,
    enabled: bool,
}

impl Collider {
    /// Creates an enabled collider with unlimited pick distance.
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Mat4::IDENTITY,
            pick_distance: 0.0,
            enabled: true,
        }
    }

    /// Box collider.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Box { half_extents })
    }

    /// Sphere collider.
    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere { radius })
    }

    /// Collider testing the owner's mesh triangles.
    pub fn mesh() -> Self {
        Self::new(ColliderShape::Mesh)
    }

    /// Group of `members`, all tested in the owner's local space.
    pub fn group(members: impl IntoIterator<Item = Collider>) -> Self {
        Self::new(ColliderShape::Group(members.into_iter().collect()))
    }

    /// Places the shape at `offset` relative to the owner's origin.
    pub fn with_offset(mut self, offset: Mat4) -> Self {
        self.offset = offset;
        self
    }

    /// Hits farther than `distance` are discarded. Zero or negative means
    /// unlimited.
    pub fn with_pick_distance(mut self, distance: f32) -> Self {
        self.pick_distance = distance;
        self
    }

    /// Enables or disables the collider.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns `true` if the collider takes part in picking.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Shape of the collider.
    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    /// Adds a member to a group. Returns `false`, leaving `self`
    /// untouched, if this collider is not a group.
    pub fn add_member(&mut self, member: Collider) -> bool {
        match &mut self.shape {
            ColliderShape::Group(members) => {
                members.push(member);
                true
            }
            _ => false,
        }
    }

    /// Members of a group; empty for any other shape.
    pub fn members(&self) -> &[Collider] {
        match &self.shape {
            ColliderShape::Group(members) => members,
            _ => &[],
        }
    }

    /// Maximum pick distance (0 = unlimited).
    pub fn pick_distance(&self) -> f32 {
        self.pick_distance
    }

    /// Owner-local bounds of the shape, if it has its own extent.
    pub(crate) fn local_bounds(&self) -> Aabb {
        let shape = match &self.shape {
            ColliderShape::Box { half_extents } => Aabb::from_half_extents(*half_extents),
            ColliderShape::Sphere { radius } => Aabb::from_half_extents(Vec3::splat(*radius)),
            ColliderShape::Mesh => Aabb::EMPTY,
            ColliderShape::Group(members) => members
                .iter()
                .fold(Aabb::EMPTY, |bounds, member| bounds.union(&member.local_bounds())),
        };
        shape.transformed(&self.offset)
    }

    /// Exact test of a world ray against this collider.
    pub fn hit(&self, model: &Mat4, mesh: Option<&Mesh>, ray: &Ray) -> Option<ColliderHit> {
        if !self.enabled {
            return None;
        }

        let placed = *model * self.offset;
        let hit = match &self.shape {
            ColliderShape::Group(members) => members
                .iter()
                .filter_map(|member| member.hit(&placed, mesh, ray))
                .min_by(|a, b| a.distance.total_cmp(&b.distance)),
            shape => {
                let local_ray = ray.transformed(&placed.inverse());
                let t = match shape {
                    ColliderShape::Box { half_extents } => {
                        Aabb::from_half_extents(*half_extents).intersect_ray(&local_ray)
                    }
                    ColliderShape::Sphere { radius } => intersect_sphere(&local_ray, *radius),
                    ColliderShape::Mesh => mesh.and_then(|m| intersect_mesh(&local_ray, m)),
                    ColliderShape::Group(_) => None,
                };
                t.map(|t| to_world_hit(&placed, &local_ray, t, ray.origin))
            }
        }?;

        if self.pick_distance > 0.0 && hit.distance > self.pick_distance {
            return None;
        }
        Some(hit)
    }
}

//=== Bounding-Box Picking ================================================

/// Exact test against a mesh's local bounding box, used when a node has a
/// mesh but no collider.
pub fn pick_against_bounding_box(model: &Mat4, mesh: &Mesh, ray: &Ray) -> Option<ColliderHit> {
    let local_ray = ray.transformed(&model.inverse());
    let t = mesh.bounds().intersect_ray(&local_ray)?;
    Some(to_world_hit(model, &local_ray, t, ray.origin))
}

//=== Internal Helpers ====================================================

fn to_world_hit(model: &Mat4, local_ray: &Ray, t: f32, world_origin: Vec3) -> ColliderHit {
    let point = model.transform_point3(local_ray.point_at(t));
    ColliderHit {
        point,
        distance: point.distance(world_origin),
    }
}

fn intersect_sphere(ray: &Ray, radius: f32) -> Option<f32> {
    // Direction is not unit length in local space, so keep the full quadratic
    let a = ray.direction.dot(ray.direction);
    let b = 2.0 * ray.origin.dot(ray.direction);
    let c = ray.origin.dot(ray.origin) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if a <= f32::EPSILON || discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        // Origin inside the sphere
        Some(0.0)
    } else {
        None
    }
}

fn intersect_mesh(ray: &Ray, mesh: &Mesh) -> Option<f32> {
    mesh.triangles()
        .filter_map(|tri| intersect_triangle(ray, tri))
        .fold(None, |best: Option<f32>, t| Some(best.map_or(t, |b| b.min(t))))
}

/// Möller–Trumbore, two-sided.
fn intersect_triangle(ray: &Ray, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < f32::EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_ray_from(z: f32) -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, z), Vec3::NEG_Z)
    }

    #[test]
    fn box_hit_reports_world_point_and_distance() {
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let hit = Collider::cuboid(Vec3::ONE)
            .hit(&model, None, &forward_ray_from(0.0))
            .expect("box in front of ray");

        assert!((hit.point.z - -9.0).abs() < 1e-4);
        assert!((hit.distance - 9.0).abs() < 1e-4);
    }

    #[test]
    fn scaled_sphere_uses_world_distance() {
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let hit = Collider::sphere(1.0)
            .hit(&model, None, &forward_ray_from(10.0))
            .expect("sphere on ray");

        assert!((hit.distance - 8.0).abs() < 1e-4);
    }

    #[test]
    fn pick_distance_discards_far_hits() {
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let collider = Collider::cuboid(Vec3::ONE).with_pick_distance(5.0);
        assert!(collider.hit(&model, None, &forward_ray_from(0.0)).is_none());
    }

    #[test]
    fn disabled_collider_never_hits() {
        let mut collider = Collider::sphere(1.0);
        collider.set_enabled(false);
        assert!(collider.hit(&Mat4::IDENTITY, None, &forward_ray_from(5.0)).is_none());
    }

    #[test]
    fn mesh_collider_hits_nearest_triangle() {
        let mesh = Mesh::cuboid(Vec3::ONE);
        let hit = Collider::mesh()
            .hit(&Mat4::IDENTITY, Some(&mesh), &forward_ray_from(5.0))
            .expect("cube faces the ray");
        assert!((hit.point.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn mesh_collider_without_mesh_misses() {
        assert!(Collider::mesh().hit(&Mat4::IDENTITY, None, &forward_ray_from(5.0)).is_none());
    }

    //--- Groups -----------------------------------------------------------

    fn near_and_far_group() -> Collider {
        Collider::group([
            Collider::sphere(1.0).with_offset(Mat4::from_translation(Vec3::new(0.0, 0.0, -8.0))),
            Collider::cuboid(Vec3::splat(0.5)).with_offset(Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0))),
        ])
    }

    #[test]
    fn group_reports_nearest_member_hit() {
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0));
        let hit = near_and_far_group()
            .hit(&model, None, &forward_ray_from(0.0))
            .expect("both members on the ray");

        // Near box face: owner -1, member -3, half extent 0.5
        assert!((hit.point.z - -3.5).abs() < 1e-4);
        assert!((hit.distance - 3.5).abs() < 1e-4);
    }

    #[test]
    fn group_falls_back_to_remaining_members() {
        let mut group = near_and_far_group();
        let ColliderShape::Group(members) = &mut group.shape else {
            unreachable!("group constructor builds a group");
        };
        members[1].set_enabled(false);

        let hit = group.hit(&Mat4::IDENTITY, None, &forward_ray_from(0.0)).expect("sphere still hit");
        assert!((hit.distance - 7.0).abs() < 1e-4);
    }

    #[test]
    fn group_pick_distance_applies_to_the_winner() {
        let group = near_and_far_group().with_pick_distance(2.0);
        assert!(group.hit(&Mat4::IDENTITY, None, &forward_ray_from(0.0)).is_none());
    }

    #[test]
    fn group_bounds_cover_every_member() {
        let mut group = Collider::group(Vec::new());
        assert!(group.local_bounds().is_empty());
        assert!(group.add_member(Collider::sphere(1.0).with_offset(Mat4::from_translation(Vec3::X * 4.0))));
        assert!(group.add_member(Collider::cuboid(Vec3::ONE)));
        assert_eq!(group.members().len(), 2);

        let bounds = group.local_bounds();
        assert_eq!(bounds, Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(5.0, 1.0, 1.0)));
        assert!(!Collider::sphere(1.0).add_member(Collider::mesh()));
    }

    #[test]
    fn bounding_box_pick_uses_mesh_bounds() {
        let mesh = Mesh::cuboid(Vec3::new(2.0, 2.0, 2.0));
        let hit = pick_against_bounding_box(&Mat4::IDENTITY, &mesh, &forward_ray_from(5.0))
            .expect("bounds face the ray");
        assert!((hit.distance - 3.0).abs() < 1e-4);
    }
}
