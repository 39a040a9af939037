//=========================================================================
// Mesh
//=========================================================================
//
// Minimal triangle mesh container. Only geometry needed for picking is
// kept on this side; vertex buffers live in the native renderer.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec3;

//=== Internal Dependencies ===============================================

use crate::core::math::Aabb;

//=== Mesh ================================================================

/// Triangle mesh with a cached local-space bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Aabb,
}

impl Mesh {
    /// Creates a mesh from vertex positions and triangle indices.
    ///
    /// Trailing indices that do not form a full triangle are ignored by
    /// [`Mesh::triangles`].
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self { positions, indices, bounds }
    }

    /// Axis-aligned box mesh centered on the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // back
            4, 5, 6,  4, 6, 7, // front
            0, 1, 5,  0, 5, 4, // bottom
            3, 6, 2,  3, 7, 6, // top
            0, 4, 7,  0, 7, 3, // left
            1, 2, 6,  1, 6, 5, // right
        ];
        Self::new(positions, indices)
    }

    /// Local-space bounding box.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Iterates complete triangles, skipping any with out-of-range indices.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            let a = self.positions.get(tri[0] as usize)?;
            let b = self.positions.get(tri[1] as usize)?;
            let c = self.positions.get(tri[2] as usize)?;
            Some([*a, *b, *c])
        })
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
