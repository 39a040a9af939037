//=========================================================================
// Scene Graph
//=========================================================================
//
// Arena-backed scene graph with hierarchical bounds and attached sensors.
//
// Architecture:
//   Scene
//     ├─ nodes:   SlotMap<NodeKey, SceneNode>   (parent / children by key)
//     ├─ sensors: SlotMap<SensorKey, Sensor>    (owned by exactly one node)
//     └─ camera_rig
//
// Every mutation that moves or reshapes a node refreshes the world
// transforms of its subtree and the bounds of its ancestors, so the
// sensor dispatcher can prune with `SceneNode::bounds()` directly.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Mutex};

use glam::Mat4;
use log::debug;
use slotmap::SlotMap;
use thiserror::Error;

//=== Module Declarations =================================================

mod camera;
mod collider;
mod mesh;
mod node;

//=== Public API ==========================================================

pub use camera::{Camera, CameraRig, NativeHandle};
pub use collider::{pick_against_bounding_box, Collider, ColliderHit, ColliderShape};
pub use mesh::Mesh;
pub use node::SceneNode;

//=== Internal Dependencies ===============================================

use crate::core::math::Aabb;
use crate::core::sensor::Sensor;

//=== Keys ================================================================

slotmap::new_key_type! {
    /// Arena key of a scene node.
    pub struct NodeKey;
    /// Arena key of a sensor inside one scene.
    pub struct SensorKey;
}

/// Sensor identity across scenes.
///
/// Arena keys are only unique within one scene, so the registration table
/// of the dispatcher pairs them with the owning scene's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorId {
    scene: NativeHandle,
    key: SensorKey,
}

impl SensorId {
    /// Handle of the scene the sensor lives in.
    pub fn scene(&self) -> NativeHandle {
        self.scene
    }

    /// Arena key inside that scene.
    pub fn key(&self) -> SensorKey {
        self.key
    }
}

/// Scene shared between the application and the render thread.
pub type SharedScene = Arc<Mutex<Scene>>;

//=== SceneError ==========================================================

/// Errors from scene graph mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene node {0:?} does not exist")]
    MissingNode(NodeKey),

    #[error("scene node {0:?} already owns a sensor")]
    SensorAlreadyAttached(NodeKey),
}

//=== SceneStats ==========================================================

/// Per-frame statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Frames completed since the scene was created.
    pub frames: u64,
    /// Enabled nodes seen by the last completed frame.
    pub enabled_nodes: usize,
}

//=== Scene ===============================================================

/// A scene graph plus its camera rig.
pub struct Scene {
    handle: NativeHandle,
    nodes: SlotMap<NodeKey, SceneNode>,
    roots: Vec<NodeKey>,
    sensors: SlotMap<SensorKey, Sensor>,
    camera_rig: Option<CameraRig>,
    stats: SceneStats,
}

impl Scene {
    /// Creates an empty scene with a default camera rig.
    pub fn new() -> Self {
        Self {
            handle: NativeHandle::next(),
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            sensors: SlotMap::with_key(),
            camera_rig: Some(CameraRig::new()),
            stats: SceneStats::default(),
        }
    }

    /// Wraps the scene for sharing across threads.
    pub fn into_shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    /// Native handle of the scene.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    //--- Nodes ------------------------------------------------------------

    /// Inserts a new root node.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeKey {
        let key = self.nodes.insert(SceneNode::new(name.into(), None));
        self.roots.push(key);
        key
    }

    /// Inserts a new node under `parent`.
    pub fn add_child(&mut self, parent: NodeKey, name: impl Into<String>) -> Result<NodeKey, SceneError> {
        let parent_world = self.node(parent).ok_or(SceneError::MissingNode(parent))?.world;

        let mut child = SceneNode::new(name.into(), Some(parent));
        child.world = parent_world;
        let key = self.nodes.insert(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(key);
        }
        Ok(key)
    }

    /// Removes `key` and its subtree. Sensors owned by removed nodes are
    /// destroyed; their ids are returned so callers can unregister them.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<Vec<SensorId>, SceneError> {
        let parent = self.node(key).ok_or(SceneError::MissingNode(key))?.parent;

        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.children.retain(|c| *c != key),
            None => self.roots.retain(|r| *r != key),
        }

        let mut destroyed = Vec::new();
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                if let Some(sensor) = node.sensor {
                    self.sensors.remove(sensor);
                    destroyed.push(self.sensor_id(sensor));
                }
                pending.extend(node.children);
            }
        }

        self.refresh_ancestor_bounds(parent);
        Ok(destroyed)
    }

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Children of `key`; empty if the node does not exist.
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Hierarchical world bounds of `key` and its descendants.
    pub fn bounds(&self, key: NodeKey) -> Option<Aabb> {
        self.nodes.get(key).map(|n| n.bounds)
    }

    //--- Node Properties --------------------------------------------------

    pub fn set_transform(&mut self, key: NodeKey, local: Mat4) -> Result<(), SceneError> {
        self.node_mut(key)?.local = local;
        self.refresh(key);
        Ok(())
    }

    pub fn set_enabled(&mut self, key: NodeKey, enabled: bool) -> Result<(), SceneError> {
        self.node_mut(key)?.enabled = enabled;
        Ok(())
    }

    pub fn set_collider(&mut self, key: NodeKey, collider: Option<Collider>) -> Result<(), SceneError> {
        self.node_mut(key)?.collider = collider;
        self.refresh(key);
        Ok(())
    }

    pub fn set_mesh(&mut self, key: NodeKey, mesh: Option<Arc<Mesh>>) -> Result<(), SceneError> {
        self.node_mut(key)?.mesh = mesh;
        self.refresh(key);
        Ok(())
    }

    /// Sets opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, key: NodeKey, opacity: f32) -> Result<(), SceneError> {
        self.node_mut(key)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    //--- Sensors ----------------------------------------------------------

    /// Creates a sensor owned by `key`.
    pub fn attach_sensor(&mut self, key: NodeKey) -> Result<SensorId, SceneError> {
        let node = self.node(key).ok_or(SceneError::MissingNode(key))?;
        if node.sensor.is_some() {
            return Err(SceneError::SensorAlreadyAttached(key));
        }

        let sensor = self.sensors.insert(Sensor::new(key));
        self.node_mut(key)?.sensor = Some(sensor);
        debug!("Attached sensor to node {:?}", key);
        Ok(self.sensor_id(sensor))
    }

    /// Destroys the sensor owned by `key`, if any.
    pub fn detach_sensor(&mut self, key: NodeKey) -> Result<Option<SensorId>, SceneError> {
        let Some(sensor) = self.node_mut(key)?.sensor.take() else {
            return Ok(None);
        };
        self.sensors.remove(sensor);
        debug!("Detached sensor from node {:?}", key);
        Ok(Some(self.sensor_id(sensor)))
    }

    /// Nearest sensor on `key` or one of its ancestors.
    pub fn find_sensor(&self, key: NodeKey) -> Option<SensorId> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(k)?;
            if let Some(sensor) = node.sensor {
                return Some(self.sensor_id(sensor));
            }
            current = node.parent;
        }
        None
    }

    /// Sensor by id; `None` if it belongs to another scene or was destroyed.
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        if id.scene != self.handle {
            return None;
        }
        self.sensors.get(id.key)
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        if id.scene != self.handle {
            return None;
        }
        self.sensors.get_mut(id.key)
    }

    pub(crate) fn sensor_by_key(&self, key: SensorKey) -> Option<&Sensor> {
        self.sensors.get(key)
    }

    pub(crate) fn sensor_by_key_mut(&mut self, key: SensorKey) -> Option<&mut Sensor> {
        self.sensors.get_mut(key)
    }

    pub(crate) fn sensor_id(&self, key: SensorKey) -> SensorId {
        SensorId { scene: self.handle, key }
    }

    //--- Camera Rig -------------------------------------------------------

    pub fn camera_rig(&self) -> Option<&CameraRig> {
        self.camera_rig.as_ref()
    }

    pub fn camera_rig_mut(&mut self) -> Option<&mut CameraRig> {
        self.camera_rig.as_mut()
    }

    /// Replaces (or removes) the camera rig.
    pub fn set_camera_rig(&mut self, rig: Option<CameraRig>) {
        self.camera_rig = rig;
    }

    //--- Statistics -------------------------------------------------------

    /// Clears the per-frame counters before a frame is drawn.
    pub fn reset_stats(&mut self) {
        self.stats.enabled_nodes = 0;
    }

    /// Records a completed frame.
    pub fn update_stats(&mut self) {
        self.stats.frames += 1;
        self.stats.enabled_nodes = self.nodes.values().filter(|n| n.enabled).count();
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    //--- Internal Helpers -------------------------------------------------

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(key).ok_or(SceneError::MissingNode(key))
    }

    /// Recomputes the subtree of `key`, then the bounds above it.
    fn refresh(&mut self, key: NodeKey) {
        let parent = self.nodes.get(key).and_then(|n| n.parent);
        let parent_world = parent
            .and_then(|p| self.nodes.get(p))
            .map_or(Mat4::IDENTITY, |p| p.world);

        self.update_subtree(key, parent_world);
        self.refresh_ancestor_bounds(parent);
    }

    fn update_subtree(&mut self, key: NodeKey, parent_world: Mat4) -> Aabb {
        let Some(node) = self.nodes.get_mut(key) else {
            return Aabb::EMPTY;
        };
        node.world = parent_world * node.local;

        let world = node.world;
        let children = node.children.clone();
        let mut bounds = node.own_world_bounds();
        for child in children {
            bounds = bounds.union(&self.update_subtree(child, world));
        }

        if let Some(node) = self.nodes.get_mut(key) {
            node.bounds = bounds;
        }
        bounds
    }

    fn refresh_ancestor_bounds(&mut self, mut current: Option<NodeKey>) {
        while let Some(key) = current {
            let Some(node) = self.nodes.get(key) else {
                break;
            };

            let bounds = node
                .children
                .iter()
                .filter_map(|c| self.nodes.get(*c))
                .fold(node.own_world_bounds(), |acc, c| acc.union(&c.bounds));
            current = node.parent;

            if let Some(node) = self.nodes.get_mut(key) {
                node.bounds = bounds;
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
