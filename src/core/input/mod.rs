//=========================================================================
// Input System
//=========================================================================
//
// Pointer controllers fed by host events.
//
// Architecture:
//   ControllerEvent → InputManager::process_events() → CursorController
//
// Update lifecycle: begin_frame() → process_events() → controllers()
//
//=========================================================================

//=== Module Declarations =================================================

mod controller;
pub mod event;
mod input_manager;

//=== Public API ==========================================================

pub use controller::{ActiveState, ControllerId, CursorController};
pub use event::ControllerEvent;
pub use input_manager::InputManager;
