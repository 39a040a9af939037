//=========================================================================
// Sensor
//=========================================================================
//
// Per-node pick receiver.
//
// During a pick pass the dispatcher records hits on the nearest enclosing
// sensor; afterwards `process_list` turns those hits into ordered events:
//
//   Enter / Inside (nearest first) → Exit → Pressed → Released
//
// Each sensor keeps one touch record per controller holding the targets
// hovered last pass and the last hit seen while active, which is what
// exit and release events are synthesized from.
//
// `process_list` only builds the events. They come back as a
// `SensorDelivery` holding shared listener handles, so the caller can
// release the scene lock before any listener runs.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glam::Vec3;
use log::trace;

//=== Internal Dependencies ===============================================

use crate::core::input::ControllerId;
use crate::core::scene::NodeKey;
use crate::core::sync::{lock, run_isolated};

//=== PickedObject ========================================================

/// A single ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedObject {
    /// Node that was hit.
    pub target: NodeKey,
    /// World-space hit point (zero for synthesized exits).
    pub hit_point: Vec3,
    /// World distance from the ray origin.
    pub distance: f32,
    /// Whether the controller button was held when the hit was taken.
    pub touched: bool,
    /// Controller whose ray produced the hit.
    pub controller: ControllerId,
}

impl PickedObject {
    /// Record with a zero hit point, used for exits and empty releases.
    pub fn empty(target: NodeKey, controller: ControllerId) -> Self {
        Self {
            target,
            hit_point: Vec3::ZERO,
            distance: 0.0,
            touched: false,
            controller,
        }
    }
}

//=== SensorEvent =========================================================

/// Kind of sensor event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEventKind {
    /// Ray started hitting the target.
    Enter,
    /// Ray still hits the target.
    Inside,
    /// Ray stopped hitting the target.
    Exit,
    /// Controller pressed while over the sensor.
    Pressed,
    /// Controller released after a press on the sensor.
    Released,
}

/// Event delivered to a sensor's listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorEventKind,
    pub controller: ControllerId,
    pub picked: PickedObject,
    /// `true` if the ray is over the sensor's subtree.
    pub over: bool,
    /// `true` if the sensor is active (pressed) for the controller.
    pub active: bool,
    /// Node owning the sensor.
    pub owner: NodeKey,
}

/// Callback receiving sensor events.
pub type SensorListener = Box<dyn FnMut(&SensorEvent) + Send>;

type SharedListener = Arc<Mutex<SensorListener>>;

//=== SensorDelivery ======================================================

/// Events one sensor produced in a pick pass, bound to its listeners.
#[must_use = "events reach listeners only through `deliver`"]
pub struct SensorDelivery {
    listeners: Vec<SharedListener>,
    events: Vec<SensorEvent>,
}

impl SensorDelivery {
    pub fn events(&self) -> &[SensorEvent] {
        &self.events
    }

    /// Calls every listener with every event, in order. A panicking
    /// listener is logged and skipped.
    pub fn deliver(self) {
        for event in &self.events {
            trace!("Sensor on {:?}: {:?} for {:?}", event.owner, event.kind, event.controller);
            for listener in &self.listeners {
                run_isolated("sensor listener", || {
                    let mut listener = lock(listener);
                    (*listener)(event)
                });
            }
        }
    }
}

impl std::fmt::Debug for SensorDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorDelivery")
            .field("listeners", &self.listeners.len())
            .field("events", &self.events)
            .finish()
    }
}

//=== ControllerTouch =====================================================

#[derive(Debug, Default)]
struct ControllerTouch {
    picks: Vec<PickedObject>,
    hovered: Vec<NodeKey>,
    active: bool,
    press_pending: bool,
    release_pending: bool,
    last_hit: Option<PickedObject>,
}

//=== Sensor ==============================================================

/// Sensor owned by one scene node.
pub struct Sensor {
    owner: NodeKey,
    enabled: bool,
    listeners: Vec<SharedListener>,
    touches: HashMap<ControllerId, ControllerTouch>,
}

impl Sensor {
    pub(crate) fn new(owner: NodeKey) -> Self {
        Self {
            owner,
            enabled: true,
            listeners: Vec::new(),
            touches: HashMap::new(),
        }
    }

    /// Node owning this sensor.
    pub fn owner(&self) -> NodeKey {
        self.owner
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled sensor collects no picks; pending exits and releases are
    /// still delivered.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Adds a listener called for every event this sensor emits.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&SensorEvent) + Send + 'static,
    {
        self.listeners.push(Arc::new(Mutex::new(Box::new(listener))));
    }

    /// Returns `true` if `controller` pressed on this sensor and has not
    /// released yet.
    pub fn is_active(&self, controller: ControllerId) -> bool {
        self.touches.get(&controller).is_some_and(|t| t.active)
    }

    //--- Dispatcher Hooks -------------------------------------------------

    /// Marks the sensor (in)active for `controller`; only real changes
    /// schedule a press or release event.
    pub(crate) fn set_active(&mut self, controller: ControllerId, active: bool) {
        let touch = self.touches.entry(controller).or_default();
        if touch.active == active {
            return;
        }

        touch.active = active;
        if active {
            touch.press_pending = true;
        } else {
            touch.release_pending = true;
        }
    }

    /// Records a hit, keeping only the nearest hit per target node.
    pub(crate) fn add_picked_object(&mut self, picked: PickedObject) {
        let touch = self.touches.entry(picked.controller).or_default();
        match touch.picks.iter_mut().find(|p| p.target == picked.target) {
            Some(existing) if existing.distance <= picked.distance => {}
            Some(existing) => *existing = picked,
            None => touch.picks.push(picked),
        }
    }

    /// Turns the hits collected for `controller` into events. Returns
    /// `None` if there is nothing to emit.
    pub(crate) fn process_list(&mut self, controller: ControllerId) -> Option<SensorDelivery> {
        let touch = self.touches.get_mut(&controller)?;

        let mut picks = std::mem::take(&mut touch.picks);
        picks.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let owner = self.owner;
        let active = touch.active;
        let mut events = Vec::new();

        //--- Enter / Inside -----------------------------------------------
        for picked in &picks {
            let kind = if touch.hovered.contains(&picked.target) {
                SensorEventKind::Inside
            } else {
                SensorEventKind::Enter
            };
            events.push(SensorEvent { kind, controller, picked: *picked, over: true, active, owner });
        }

        //--- Exit ---------------------------------------------------------
        for target in &touch.hovered {
            if !picks.iter().any(|p| p.target == *target) {
                events.push(SensorEvent {
                    kind: SensorEventKind::Exit,
                    controller,
                    picked: PickedObject::empty(*target, controller),
                    over: false,
                    active,
                    owner,
                });
            }
        }

        let nearest = picks.first().copied();

        //--- Pressed ------------------------------------------------------
        if std::mem::take(&mut touch.press_pending) {
            let picked = nearest.or(touch.last_hit).unwrap_or(PickedObject::empty(owner, controller));
            events.push(SensorEvent {
                kind: SensorEventKind::Pressed,
                controller,
                picked,
                over: nearest.is_some(),
                active: true,
                owner,
            });
        }

        if touch.active {
            if let Some(hit) = nearest {
                touch.last_hit = Some(hit);
            }
        }

        //--- Released -----------------------------------------------------
        if std::mem::take(&mut touch.release_pending) {
            let picked = nearest
                .or(touch.last_hit.take())
                .unwrap_or(PickedObject::empty(owner, controller));
            events.push(SensorEvent {
                kind: SensorEventKind::Released,
                controller,
                picked,
                over: nearest.is_some(),
                active: false,
                owner,
            });
        }

        touch.hovered = picks.iter().map(|p| p.target).collect();
        if !touch.active && touch.hovered.is_empty() {
            self.touches.remove(&controller);
        }

        if events.is_empty() {
            return None;
        }
        Some(SensorDelivery {
            listeners: self.listeners.clone(),
            events,
        })
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::sync::{Arc, Mutex};

    const CONTROLLER: ControllerId = ControllerId(0);

    fn keys(count: usize) -> Vec<NodeKey> {
        let mut arena: SlotMap<NodeKey, ()> = SlotMap::with_key();
        (0..count).map(|_| arena.insert(())).collect()
    }

    fn pick(target: NodeKey, distance: f32) -> PickedObject {
        PickedObject {
            target,
            hit_point: Vec3::new(0.0, 0.0, -distance),
            distance,
            touched: false,
            controller: CONTROLLER,
        }
    }

    fn recording_sensor(owner: NodeKey) -> (Sensor, Arc<Mutex<Vec<SensorEvent>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let mut sensor = Sensor::new(owner);
        sensor.add_listener(move |e| sink.lock().unwrap().push(*e));
        (sensor, log)
    }

    /// Builds and delivers this pass's events; `true` if there were any.
    fn flush(sensor: &mut Sensor) -> bool {
        match sensor.process_list(CONTROLLER) {
            Some(delivery) => {
                delivery.deliver();
                true
            }
            None => false,
        }
    }

    fn kinds(log: &Arc<Mutex<Vec<SensorEvent>>>) -> Vec<SensorEventKind> {
        log.lock().unwrap().drain(..).map(|e| e.kind).collect()
    }

    #[test]
    fn enter_then_inside_then_exit() {
        let k = keys(1);
        let (mut sensor, log) = recording_sensor(k[0]);

        sensor.add_picked_object(pick(k[0], 2.0));
        assert!(flush(&mut sensor));
        assert_eq!(kinds(&log), vec![SensorEventKind::Enter]);

        sensor.add_picked_object(pick(k[0], 2.0));
        flush(&mut sensor);
        assert_eq!(kinds(&log), vec![SensorEventKind::Inside]);

        assert!(flush(&mut sensor));
        let events = log.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensorEventKind::Exit);
        assert!(!events[0].over);
        assert_eq!(events[0].picked.hit_point, Vec3::ZERO);
    }

    #[test]
    fn picks_are_sorted_nearest_first() {
        let k = keys(3);
        let (mut sensor, log) = recording_sensor(k[0]);

        sensor.add_picked_object(pick(k[1], 5.0));
        sensor.add_picked_object(pick(k[2], 1.0));
        flush(&mut sensor);

        let targets: Vec<NodeKey> = log.lock().unwrap().iter().map(|e| e.picked.target).collect();
        assert_eq!(targets, vec![k[2], k[1]]);
    }

    #[test]
    fn duplicate_target_keeps_nearest_hit() {
        let k = keys(1);
        let (mut sensor, log) = recording_sensor(k[0]);

        sensor.add_picked_object(pick(k[0], 4.0));
        sensor.add_picked_object(pick(k[0], 3.0));
        flush(&mut sensor);

        let events = log.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].picked.distance, 3.0);
    }

    #[test]
    fn press_and_release_emit_once() {
        let k = keys(1);
        let (mut sensor, log) = recording_sensor(k[0]);

        sensor.add_picked_object(pick(k[0], 1.0));
        sensor.set_active(CONTROLLER, true);
        sensor.set_active(CONTROLLER, true);
        flush(&mut sensor);
        assert_eq!(kinds(&log), vec![SensorEventKind::Enter, SensorEventKind::Pressed]);

        sensor.set_active(CONTROLLER, false);
        sensor.set_active(CONTROLLER, false);
        flush(&mut sensor);
        assert_eq!(kinds(&log), vec![SensorEventKind::Exit, SensorEventKind::Released]);
    }

    #[test]
    fn release_without_hit_reuses_last_active_hit() {
        let k = keys(2);
        let (mut sensor, log) = recording_sensor(k[0]);

        sensor.add_picked_object(pick(k[1], 1.5));
        sensor.set_active(CONTROLLER, true);
        flush(&mut sensor);
        log.lock().unwrap().clear();

        sensor.set_active(CONTROLLER, false);
        flush(&mut sensor);

        let events = log.lock().unwrap().clone();
        let released = events.iter().find(|e| e.kind == SensorEventKind::Released).unwrap();
        assert_eq!(released.picked.target, k[1]);
        assert!(!released.active);
    }

    #[test]
    fn idle_sensor_emits_nothing() {
        let k = keys(1);
        let (mut sensor, log) = recording_sensor(k[0]);
        assert!(!flush(&mut sensor));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let k = keys(1);
        let (mut sensor, log) = recording_sensor(k[0]);
        sensor.add_listener(|_| panic!("listener failure"));
        let sink = Arc::clone(&log);
        sensor.add_listener(move |e| sink.lock().unwrap().push(*e));

        sensor.add_picked_object(pick(k[0], 1.0));
        flush(&mut sensor);

        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
