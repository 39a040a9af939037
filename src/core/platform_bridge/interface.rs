//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Host-to-engine events, sent over a bounded channel.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::input::ControllerEvent;

//=== HostEvent ===========================================================

/// Events sent from the host to the render thread.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Batched controller events.
    Controller(Vec<ControllerEvent>),

    /// Host is going away; the render loop exits.
    Shutdown,
}
