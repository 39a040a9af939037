//=========================================================================
// Scene Node
//=========================================================================
//
// Arena entry of the scene graph. Parent and children are stored as arena
// keys; the owning `Scene` keeps world transforms and hierarchical bounds
// current whenever a node changes.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use glam::Mat4;

//=== Internal Dependencies ===============================================

use super::{Collider, Mesh, NodeKey, SensorKey};
use crate::core::math::Aabb;

//=== SceneNode ===========================================================

/// A node of the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(super) name: String,
    pub(super) local: Mat4,
    pub(super) world: Mat4,
    pub(super) parent: Option<NodeKey>,
    pub(super) children: Vec<NodeKey>,
    pub(super) collider: Option<Collider>,
    pub(super) mesh: Option<Arc<Mesh>>,
    pub(super) sensor: Option<SensorKey>,
    pub(super) enabled: bool,
    pub(super) opacity: f32,
    pub(super) bounds: Aabb,
}

impl SceneNode {
    pub(super) fn new(name: String, parent: Option<NodeKey>) -> Self {
        Self {
            name,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            parent,
            children: Vec::new(),
            collider: None,
            mesh: None,
            sensor: None,
            enabled: true,
            opacity: 1.0,
            bounds: Aabb::EMPTY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transform relative to the parent.
    pub fn local_transform(&self) -> Mat4 {
        self.local
    }

    /// Model matrix (parent chain applied).
    pub fn world_transform(&self) -> Mat4 {
        self.world
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_deref()
    }

    /// Returns `true` if the node has renderable geometry.
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Key of the sensor attached to this node, if any.
    pub fn sensor(&self) -> Option<SensorKey> {
        self.sensor
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// World-space bounds of this node and all of its descendants.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// World-space bounds of this node's own geometry.
    pub(super) fn own_world_bounds(&self) -> Aabb {
        let mesh = self.mesh.as_ref().map_or(Aabb::EMPTY, |m| m.bounds());
        let collider = self.collider.as_ref().map_or(Aabb::EMPTY, Collider::local_bounds);
        mesh.union(&collider).transformed(&self.world)
    }
}
