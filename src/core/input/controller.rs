//=========================================================================
// Cursor Controller
//=========================================================================
//
// Pointer input source: a ray plus a single "active" button.
//
// The active state carries the edge of the current update so the sensor
// dispatcher can tell a fresh press or release from a held button.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec3;

//=== Internal Dependencies ===============================================

use crate::core::math::Ray;

//=== ControllerId ========================================================

/// Identifies one input controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub u32);

//=== ActiveState =========================================================

/// Button edge observed during the current update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveState {
    /// No change this update.
    #[default]
    None,
    /// Button went down this update.
    Pressed,
    /// Button went up this update.
    Released,
}

//=== CursorController ====================================================

/// Pointer controller state.
#[derive(Debug, Clone)]
pub struct CursorController {
    id: ControllerId,
    origin: Vec3,
    direction: Vec3,
    active: bool,
    active_state: ActiveState,
    handled_by_sensor: bool,
    needs_pick: bool,
    connected: bool,
}

impl CursorController {
    /// Creates a connected, inactive controller pointing down -Z.
    pub fn new(id: ControllerId) -> Self {
        Self {
            id,
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            active: false,
            active_state: ActiveState::None,
            handled_by_sensor: false,
            needs_pick: true,
            connected: true,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Current pointer ray.
    pub fn ray(&self) -> Ray {
        Ray::new(self.origin, self.direction)
    }

    pub fn set_ray(&mut self, origin: Vec3, direction: Vec3) {
        self.origin = origin;
        self.direction = direction;
        self.needs_pick = true;
    }

    /// Returns `true` while the button is held.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_state(&self) -> ActiveState {
        self.active_state
    }

    /// Updates the button; records an edge only on an actual change.
    /// Returns `true` if an edge was recorded.
    pub fn set_active(&mut self, active: bool) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        self.active_state = if active {
            ActiveState::Pressed
        } else {
            ActiveState::Released
        };
        self.needs_pick = true;
        true
    }

    /// Whether a sensor consumed this controller's last pick pass.
    pub fn handled_by_sensor(&self) -> bool {
        self.handled_by_sensor
    }

    pub(crate) fn set_handled_by_sensor(&mut self, handled: bool) {
        self.handled_by_sensor = handled;
    }

    /// Whether the ray or button changed since the last pick pass of
    /// this update.
    pub fn needs_pick(&self) -> bool {
        self.needs_pick
    }

    pub(crate) fn mark_picked(&mut self) {
        self.needs_pick = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Marks the controller gone; a held button is released first.
    /// Returns `true` if that release was an edge.
    pub(crate) fn disconnect(&mut self) -> bool {
        self.connected = false;
        self.set_active(false)
    }

    /// Clears per-update state. Every controller gets one hover pass per
    /// update.
    pub(crate) fn begin_update(&mut self) {
        self.active_state = ActiveState::None;
        self.handled_by_sensor = false;
        self.needs_pick = true;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_record_edges() {
        let mut controller = CursorController::new(ControllerId(0));
        controller.set_active(true);
        assert_eq!(controller.active_state(), ActiveState::Pressed);

        controller.begin_update();
        controller.set_active(true);
        assert_eq!(controller.active_state(), ActiveState::None);

        controller.set_active(false);
        assert_eq!(controller.active_state(), ActiveState::Released);
    }

    #[test]
    fn disconnect_releases_held_button() {
        let mut controller = CursorController::new(ControllerId(3));
        controller.set_active(true);
        controller.begin_update();
        controller.disconnect();

        assert!(!controller.is_connected());
        assert_eq!(controller.active_state(), ActiveState::Released);
    }

    #[test]
    fn repeated_button_state_is_not_an_edge() {
        let mut controller = CursorController::new(ControllerId(1));
        assert!(controller.set_active(true));
        controller.mark_picked();

        assert!(!controller.set_active(true));
        assert!(!controller.needs_pick());

        controller.set_ray(Vec3::ZERO, Vec3::X);
        assert!(controller.needs_pick());
    }
}
