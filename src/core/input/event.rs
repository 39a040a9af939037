//=========================================================================
// Controller Events
//=========================================================================
//
// Host-agnostic controller events. The host integration translates its
// native tracking and button callbacks into these.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec3;

//=== Internal Dependencies ===============================================

use super::ControllerId;

//=== ControllerEvent =====================================================

/// Input event for one pointer controller.
///
/// A controller is created by the first event that names it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// New pointer pose.
    RayMoved {
        id: ControllerId,
        origin: Vec3,
        direction: Vec3,
    },
    /// Active button pressed.
    ButtonDown { id: ControllerId },
    /// Active button released.
    ButtonUp { id: ControllerId },
    /// Controller went away; a held button counts as released.
    Disconnected { id: ControllerId },
}

impl ControllerEvent {
    /// Controller the event refers to.
    pub fn id(&self) -> ControllerId {
        match *self {
            Self::RayMoved { id, .. }
            | Self::ButtonDown { id }
            | Self::ButtonUp { id }
            | Self::Disconnected { id } => id,
        }
    }
}
