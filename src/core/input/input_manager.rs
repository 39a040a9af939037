//=========================================================================
// Input Manager
//=========================================================================
//
// Tracks every known pointer controller.
//
// Frame lifecycle: begin_frame() → process_events() → query
//
// `process_events_with` hands each button edge to a callback as soon as it
// is applied, so a press and release in one batch are both observed.
//
// Edges (pressed / released) only live for one update. A disconnected
// controller survives exactly one more update so its release can still
// be dispatched to sensors.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::BTreeMap;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{ControllerEvent, ControllerId, CursorController};

//=== InputManager ========================================================

/// Owns controller state across updates.
#[derive(Debug, Default)]
pub struct InputManager {
    controllers: BTreeMap<ControllerId, CursorController>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Frame Processing -------------------------------------------------

    /// Clears last update's edges and forgets disconnected controllers.
    pub fn begin_frame(&mut self) {
        self.controllers.retain(|id, controller| {
            if !controller.is_connected() {
                debug!("Controller {:?} removed", id);
            }
            controller.is_connected()
        });
        for controller in self.controllers.values_mut() {
            controller.begin_update();
        }
    }

    /// Applies a batch of events in order.
    pub fn process_events(&mut self, events: &[ControllerEvent]) {
        for event in events {
            self.process_event(event);
        }
    }

    /// Applies a batch of events in order, calling `on_edge` with the
    /// controller right after each press or release edge.
    ///
    /// Controllers passed to `on_edge` are marked picked; a later ray move
    /// in the same batch marks them again.
    pub fn process_events_with<F>(&mut self, events: &[ControllerEvent], mut on_edge: F)
    where
        F: FnMut(&mut CursorController),
    {
        for event in events {
            if self.process_event(event) {
                if let Some(controller) = self.controllers.get_mut(&event.id()) {
                    on_edge(controller);
                    controller.mark_picked();
                }
            }
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn controller(&self, id: ControllerId) -> Option<&CursorController> {
        self.controllers.get(&id)
    }

    /// All controllers in id order.
    pub fn controllers(&self) -> impl Iterator<Item = &CursorController> {
        self.controllers.values()
    }

    pub fn controllers_mut(&mut self) -> impl Iterator<Item = &mut CursorController> {
        self.controllers.values_mut()
    }

    //--- Internal Helpers -------------------------------------------------

    /// Returns `true` if the event produced a button edge.
    fn process_event(&mut self, event: &ControllerEvent) -> bool {
        let id = event.id();
        let controller = self.controllers.entry(id).or_insert_with(|| {
            debug!("Controller {:?} connected", id);
            CursorController::new(id)
        });

        match *event {
            ControllerEvent::RayMoved { origin, direction, .. } => {
                controller.set_ray(origin, direction);
                false
            }
            ControllerEvent::ButtonDown { .. } => controller.set_active(true),
            ControllerEvent::ButtonUp { .. } => controller.set_active(false),
            ControllerEvent::Disconnected { .. } => controller.disconnect(),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::ActiveState;
    use glam::Vec3;

    const ID: ControllerId = ControllerId(7);

    #[test]
    fn first_event_creates_controller() {
        let mut input = InputManager::new();
        input.process_events(&[ControllerEvent::RayMoved {
            id: ID,
            origin: Vec3::Y,
            direction: Vec3::NEG_Z,
        }]);

        let controller = input.controller(ID).unwrap();
        assert_eq!(controller.origin(), Vec3::Y);
        assert_eq!(controller.active_state(), ActiveState::None);
    }

    #[test]
    fn press_edge_lasts_one_frame() {
        let mut input = InputManager::new();
        input.process_events(&[ControllerEvent::ButtonDown { id: ID }]);
        assert_eq!(input.controller(ID).unwrap().active_state(), ActiveState::Pressed);

        input.begin_frame();
        input.process_events(&[ControllerEvent::ButtonDown { id: ID }]);
        assert_eq!(input.controller(ID).unwrap().active_state(), ActiveState::None);
        assert!(input.controller(ID).unwrap().is_active());
    }

    #[test]
    fn release_only_after_press() {
        let mut input = InputManager::new();
        input.process_events(&[ControllerEvent::ButtonUp { id: ID }]);
        assert_eq!(input.controller(ID).unwrap().active_state(), ActiveState::None);
    }

    #[test]
    fn disconnected_controller_lives_one_more_frame() {
        let mut input = InputManager::new();
        input.process_events(&[ControllerEvent::ButtonDown { id: ID }]);
        input.begin_frame();
        input.process_events(&[ControllerEvent::Disconnected { id: ID }]);

        assert_eq!(input.controller(ID).unwrap().active_state(), ActiveState::Released);

        input.begin_frame();
        assert!(input.controller(ID).is_none());
        assert_eq!(input.controllers().count(), 0);
    }

    #[test]
    fn every_edge_in_a_batch_is_observed() {
        let mut input = InputManager::new();
        let mut edges = Vec::new();
        input.process_events_with(
            &[
                ControllerEvent::ButtonDown { id: ID },
                ControllerEvent::ButtonDown { id: ID },
                ControllerEvent::ButtonUp { id: ID },
                ControllerEvent::ButtonDown { id: ID },
            ],
            |controller| edges.push(controller.active_state()),
        );

        assert_eq!(edges, vec![ActiveState::Pressed, ActiveState::Released, ActiveState::Pressed]);
        assert!(!input.controller(ID).unwrap().needs_pick());
    }

    #[test]
    fn ray_move_after_edge_needs_another_pick() {
        let mut input = InputManager::new();
        input.process_events_with(
            &[
                ControllerEvent::ButtonDown { id: ID },
                ControllerEvent::RayMoved {
                    id: ID,
                    origin: Vec3::ZERO,
                    direction: Vec3::X,
                },
            ],
            |_| {},
        );

        assert!(input.controller(ID).unwrap().needs_pick());
    }
}
