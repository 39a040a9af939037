//=========================================================================
// Sensor Manager
//=========================================================================
//
// Dispatches controller rays against a scene graph and routes the hits to
// the nearest enclosing sensor.
//
// Pick pass:
//   1. release edge   → every registered sensor goes inactive
//   2. ray validation → invalid rays skip the walk (no picks)
//   3. tree walk      → bounds test prunes subtrees; exact tests on
//                       meshed nodes under an eligible sensor
//   4. flush          → every registered sensor builds its events
//
// `collect_pick` returns the events undelivered so the caller can drop the
// scene lock first; listeners are then free to lock the scene themselves.
// `process_pick` delivers straight away.
//
// The registration table is reference counted and guarded by a mutex;
// each pass works on a snapshot so other threads can register and
// unregister sensors while a pass is running.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::{debug, trace};

//=== Internal Dependencies ===============================================

use super::{PickedObject, SensorDelivery};
use crate::core::input::{ActiveState, ControllerId, CursorController};
use crate::core::math::Ray;
use crate::core::scene::{pick_against_bounding_box, NodeKey, Scene, SensorId, SensorKey};
use crate::core::sync::lock;

//=== PickPassStats =======================================================

/// Counters for one pick pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickPassStats {
    /// Hierarchical bounds tests performed.
    pub bounds_tests: usize,
    /// Subtrees skipped because their bounds missed.
    pub pruned: usize,
    /// Exact collider or bounding-box tests performed.
    pub exact_tests: usize,
    /// Exact tests that hit.
    pub hits: usize,
}

//=== SensorManager =======================================================

/// Reference-counted sensor registry and pick dispatcher.
#[derive(Debug, Default)]
pub struct SensorManager {
    registrations: Mutex<HashMap<SensorId, usize>>,
    last_pass: Mutex<PickPassStats>,
}

impl SensorManager {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Registration -----------------------------------------------------

    /// Registers `id`, or bumps its count if already registered.
    pub fn add_sensor(&self, id: SensorId) {
        let mut table = lock(&self.registrations);
        let count = table.entry(id).or_insert(0);
        *count += 1;
        debug!("Sensor {:?} registered (count: {})", id, count);
    }

    /// Drops one registration of `id`; the sensor stays eligible until its
    /// count reaches zero. Unknown ids are ignored.
    pub fn remove_sensor(&self, id: SensorId) {
        let mut table = lock(&self.registrations);
        let Some(count) = table.get_mut(&id) else {
            return;
        };

        *count -= 1;
        if *count == 0 {
            table.remove(&id);
            debug!("Sensor {:?} unregistered", id);
        }
    }

    /// Drops every registration of `id`, e.g. once its sensor is gone.
    pub fn forget_sensor(&self, id: SensorId) {
        if lock(&self.registrations).remove(&id).is_some() {
            debug!("Sensor {:?} forgotten", id);
        }
    }

    /// Returns `true` if `id` is dispatch-eligible.
    pub fn is_registered(&self, id: SensorId) -> bool {
        lock(&self.registrations).contains_key(&id)
    }

    /// Current reference count of `id` (0 if unregistered).
    pub fn registration_count(&self, id: SensorId) -> usize {
        lock(&self.registrations).get(&id).copied().unwrap_or(0)
    }

    /// Removes every registration.
    pub fn clear(&self) {
        lock(&self.registrations).clear();
    }

    /// Counters of the most recent pass.
    pub fn last_pass(&self) -> PickPassStats {
        *lock(&self.last_pass)
    }

    //--- Dispatch ---------------------------------------------------------

    /// Runs one pick pass of `controller` over `scene` and delivers the
    /// events at once.
    ///
    /// Returns `true` if any sensor emitted an event; the controller
    /// records the same flag.
    pub fn process_pick(&self, scene: &mut Scene, controller: &mut CursorController) -> bool {
        let deliveries = self.collect_pick(scene, controller);
        let handled = !deliveries.is_empty();
        for delivery in deliveries {
            delivery.deliver();
        }
        handled
    }

    /// Runs one pick pass of `controller` over `scene` and returns the
    /// events per sensor, in registration-snapshot order, undelivered.
    pub fn collect_pick(&self, scene: &mut Scene, controller: &mut CursorController) -> Vec<SensorDelivery> {
        let registered: HashSet<SensorKey> = lock(&self.registrations)
            .keys()
            .filter(|id| id.scene() == scene.handle())
            .map(|id| id.key())
            .collect();

        if registered.is_empty() {
            controller.set_handled_by_sensor(false);
            return Vec::new();
        }

        let id = controller.id();
        let state = controller.active_state();
        if state == ActiveState::Released {
            for key in &registered {
                if let Some(sensor) = scene.sensor_by_key_mut(*key) {
                    sensor.set_active(id, false);
                }
            }
        }

        let mut pass = PickPass {
            controller: id,
            ray: controller.ray(),
            mark_active: state == ActiveState::Pressed,
            registered: &registered,
            stats: PickPassStats::default(),
        };

        if pass.ray.is_valid() {
            let roots = scene.roots().to_vec();
            for root in roots {
                pass.visit(scene, root, None);
            }
        } else {
            trace!("Skipping pick walk for {:?}: invalid ray", id);
        }
        *lock(&self.last_pass) = pass.stats;

        let deliveries: Vec<SensorDelivery> = registered
            .iter()
            .filter_map(|key| scene.sensor_by_key_mut(*key)?.process_list(id))
            .collect();

        controller.set_handled_by_sensor(!deliveries.is_empty());
        deliveries
    }
}

//=== PickPass ============================================================

struct PickPass<'a> {
    controller: ControllerId,
    ray: Ray,
    mark_active: bool,
    registered: &'a HashSet<SensorKey>,
    stats: PickPassStats,
}

impl PickPass<'_> {
    /// Visits `key` with the nearest sensor found above it.
    fn visit(&mut self, scene: &mut Scene, key: NodeKey, enclosing: Option<SensorKey>) {
        let Some(node) = scene.node(key) else {
            return;
        };
        let enclosing = node.sensor().or(enclosing);

        self.stats.bounds_tests += 1;
        if node.bounds().intersect_ray(&self.ray).is_none() {
            self.stats.pruned += 1;
            return;
        }

        let children = node.children().to_vec();
        let testable = node.is_enabled() && node.has_mesh();
        let hit = match enclosing {
            Some(sensor_key) if testable && self.is_eligible(scene, sensor_key) => {
                self.exact_test(scene, key)
            }
            _ => None,
        };

        if let (Some(picked), Some(sensor_key)) = (hit, enclosing) {
            if let Some(sensor) = scene.sensor_by_key_mut(sensor_key) {
                sensor.add_picked_object(picked);
                if self.mark_active {
                    sensor.set_active(self.controller, true);
                }
            }
        }

        for child in children {
            self.visit(scene, child, enclosing);
        }
    }

    /// Registered and enabled.
    fn is_eligible(&self, scene: &Scene, sensor_key: SensorKey) -> bool {
        self.registered.contains(&sensor_key)
            && scene.sensor_by_key(sensor_key).is_some_and(|s| s.is_enabled())
    }

    fn exact_test(&mut self, scene: &Scene, key: NodeKey) -> Option<PickedObject> {
        let node = scene.node(key)?;
        let mesh = node.mesh()?;
        let world = node.world_transform();

        self.stats.exact_tests += 1;
        let hit = match node.collider() {
            Some(collider) => collider.hit(&world, Some(mesh), &self.ray),
            None => pick_against_bounding_box(&world, mesh, &self.ray),
        }?;
        self.stats.hits += 1;

        Some(PickedObject {
            target: key,
            hit_point: hit.point,
            distance: hit.distance,
            touched: self.mark_active,
            controller: self.controller,
        })
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::{Collider, Mesh};
    use crate::core::sensor::{SensorEvent, SensorEventKind};
    use glam::{Mat4, Vec3};
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<SensorEvent>>>;

    //--- Test Helpers -----------------------------------------------------

    /// Root with a sensor and one meshed child 10 units down -Z.
    struct Fixture {
        scene: Scene,
        root: NodeKey,
        target: NodeKey,
        sensor: SensorId,
        log: EventLog,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let target = scene.add_child(root, "target").unwrap();
        scene.set_mesh(target, Some(Arc::new(Mesh::cuboid(Vec3::ONE)))).unwrap();
        scene.set_transform(target, Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))).unwrap();

        let sensor = scene.attach_sensor(root).unwrap();
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        scene.sensor_mut(sensor).unwrap().add_listener(move |e| sink.lock().unwrap().push(*e));

        Fixture { scene, root, target, sensor, log }
    }

    fn controller_toward(direction: Vec3) -> CursorController {
        let mut controller = CursorController::new(ControllerId(1));
        controller.set_ray(Vec3::ZERO, direction);
        controller
    }

    fn kinds(log: &EventLog) -> Vec<SensorEventKind> {
        log.lock().unwrap().drain(..).map(|e| e.kind).collect()
    }

    //--- Registration -----------------------------------------------------

    #[test]
    fn registration_is_reference_counted() {
        let f = fixture();
        let manager = SensorManager::new();

        manager.add_sensor(f.sensor);
        manager.add_sensor(f.sensor);
        manager.add_sensor(f.sensor);
        manager.remove_sensor(f.sensor);
        manager.remove_sensor(f.sensor);
        assert!(manager.is_registered(f.sensor));
        assert_eq!(manager.registration_count(f.sensor), 1);

        manager.remove_sensor(f.sensor);
        assert!(!manager.is_registered(f.sensor));
    }

    #[test]
    fn forget_drops_every_reference() {
        let f = fixture();
        let manager = SensorManager::new();

        manager.add_sensor(f.sensor);
        manager.add_sensor(f.sensor);
        manager.forget_sensor(f.sensor);
        assert_eq!(manager.registration_count(f.sensor), 0);
    }

    #[test]
    fn removing_unknown_sensor_is_ignored() {
        let f = fixture();
        let manager = SensorManager::new();
        manager.remove_sensor(f.sensor);
        assert_eq!(manager.registration_count(f.sensor), 0);
    }

    #[test]
    fn no_registered_sensor_means_no_dispatch() {
        let mut f = fixture();
        let manager = SensorManager::new();
        let mut controller = controller_toward(Vec3::NEG_Z);

        assert!(!manager.process_pick(&mut f.scene, &mut controller));
        assert!(f.log.lock().unwrap().is_empty());
    }

    #[test]
    fn unregistered_sensor_receives_nothing() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        manager.remove_sensor(f.sensor);

        let mut controller = controller_toward(Vec3::NEG_Z);
        assert!(!manager.process_pick(&mut f.scene, &mut controller));
    }

    //--- Picking ----------------------------------------------------------

    #[test]
    fn hit_on_descendant_is_attributed_to_enclosing_sensor() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        assert!(manager.process_pick(&mut f.scene, &mut controller));
        assert!(controller.handled_by_sensor());

        let events = f.log.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensorEventKind::Enter);
        assert_eq!(events[0].owner, f.root);
        assert_eq!(events[0].picked.target, f.target);
        assert!((events[0].picked.distance - 9.0).abs() < 1e-4);
    }

    #[test]
    fn nearer_sensor_governs_its_subtree() {
        let mut f = fixture();
        let inner = f.scene.attach_sensor(f.target).unwrap();
        let inner_log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inner_log);
        f.scene.sensor_mut(inner).unwrap().add_listener(move |e| sink.lock().unwrap().push(*e));

        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        manager.add_sensor(inner);
        let mut controller = controller_toward(Vec3::NEG_Z);
        manager.process_pick(&mut f.scene, &mut controller);

        assert!(f.log.lock().unwrap().is_empty());
        assert_eq!(inner_log.lock().unwrap().len(), 1);
    }

    #[test]
    fn collider_takes_precedence_over_bounding_box() {
        let mut f = fixture();
        f.scene
            .set_collider(f.target, Some(Collider::sphere(1.0).with_pick_distance(5.0)))
            .unwrap();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        assert!(!manager.process_pick(&mut f.scene, &mut controller));
        assert_eq!(manager.last_pass().exact_tests, 1);
        assert_eq!(manager.last_pass().hits, 0);
    }

    #[test]
    fn collider_group_reports_its_nearest_member() {
        let mut f = fixture();
        let group = Collider::group([
            Collider::sphere(1.0),
            Collider::cuboid(Vec3::splat(0.5)).with_offset(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0))),
        ]);
        f.scene.set_collider(f.target, Some(group)).unwrap();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        assert!(manager.process_pick(&mut f.scene, &mut controller));
        let events = f.log.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert!((events[0].picked.distance - 7.5).abs() < 1e-4);
    }

    #[test]
    fn disabled_node_is_not_picked_but_children_are() {
        let mut f = fixture();
        let grandchild = f.scene.add_child(f.target, "grandchild").unwrap();
        f.scene.set_mesh(grandchild, Some(Arc::new(Mesh::cuboid(Vec3::ONE)))).unwrap();
        f.scene.set_enabled(f.target, false).unwrap();

        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);
        manager.process_pick(&mut f.scene, &mut controller);

        let targets: Vec<NodeKey> = f.log.lock().unwrap().iter().map(|e| e.picked.target).collect();
        assert_eq!(targets, vec![grandchild]);
    }

    #[test]
    fn missed_bounds_prune_the_whole_subtree() {
        let mut f = fixture();
        let grandchild = f.scene.add_child(f.target, "grandchild").unwrap();
        f.scene.set_mesh(grandchild, Some(Arc::new(Mesh::cuboid(Vec3::ONE)))).unwrap();

        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::Z);

        assert!(!manager.process_pick(&mut f.scene, &mut controller));
        let stats = manager.last_pass();
        assert_eq!(stats.bounds_tests, 1);
        assert_eq!(stats.pruned, 1);
        assert_eq!(stats.exact_tests, 0);
    }

    #[test]
    fn invalid_rays_never_pick() {
        let manager = SensorManager::new();
        for direction in [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, -1.0), Vec3::new(0.0, 0.0, f32::NAN)] {
            let mut f = fixture();
            manager.clear();
            manager.add_sensor(f.sensor);
            let mut controller = controller_toward(direction);

            assert!(!manager.process_pick(&mut f.scene, &mut controller));
            assert_eq!(manager.last_pass(), PickPassStats::default());
            assert!(f.log.lock().unwrap().is_empty());
        }
    }

    //--- Press / Release --------------------------------------------------

    #[test]
    fn press_on_hit_activates_sensor() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);
        controller.set_active(true);

        manager.process_pick(&mut f.scene, &mut controller);

        assert!(f.scene.sensor(f.sensor).unwrap().is_active(ControllerId(1)));
        let events = f.log.lock().unwrap().clone();
        assert_eq!(events.iter().map(|e| e.kind).collect::<Vec<_>>(), vec![
            SensorEventKind::Enter,
            SensorEventKind::Pressed
        ]);
        assert!(events[0].picked.touched);
    }

    #[test]
    fn press_without_hit_does_not_activate() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::Z);
        controller.set_active(true);

        assert!(!manager.process_pick(&mut f.scene, &mut controller));
        assert!(!f.scene.sensor(f.sensor).unwrap().is_active(ControllerId(1)));
    }

    #[test]
    fn release_with_invalid_ray_still_releases_once() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        controller.set_active(true);
        manager.process_pick(&mut f.scene, &mut controller);
        f.log.lock().unwrap().clear();

        controller.begin_update();
        controller.set_ray(Vec3::ZERO, Vec3::ZERO);
        controller.set_active(false);
        assert!(manager.process_pick(&mut f.scene, &mut controller));
        assert_eq!(kinds(&f.log), vec![SensorEventKind::Exit, SensorEventKind::Released]);

        controller.begin_update();
        assert!(!manager.process_pick(&mut f.scene, &mut controller));
        assert!(kinds(&f.log).is_empty());
    }

    #[test]
    fn release_after_ray_moved_away_reports_last_hit() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        controller.set_active(true);
        manager.process_pick(&mut f.scene, &mut controller);
        controller.begin_update();
        controller.set_ray(Vec3::ZERO, Vec3::X);
        manager.process_pick(&mut f.scene, &mut controller);
        f.log.lock().unwrap().clear();

        controller.begin_update();
        controller.set_active(false);
        manager.process_pick(&mut f.scene, &mut controller);

        let events = f.log.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensorEventKind::Released);
        assert_eq!(events[0].picked.target, f.target);
    }

    #[test]
    fn collected_events_wait_for_delivery() {
        let mut f = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(f.sensor);
        let mut controller = controller_toward(Vec3::NEG_Z);

        let deliveries = manager.collect_pick(&mut f.scene, &mut controller);
        assert!(controller.handled_by_sensor());
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].events()[0].kind, SensorEventKind::Enter);
        assert!(f.log.lock().unwrap().is_empty());

        for delivery in deliveries {
            delivery.deliver();
        }
        assert_eq!(kinds(&f.log), vec![SensorEventKind::Enter]);
    }

    #[test]
    fn sensors_of_other_scenes_are_ignored() {
        let mut f = fixture();
        let other = fixture();
        let manager = SensorManager::new();
        manager.add_sensor(other.sensor);

        let mut controller = controller_toward(Vec3::NEG_Z);
        assert!(!manager.process_pick(&mut f.scene, &mut controller));
    }
}
