//=========================================================================
// Core
//=========================================================================
//
// Engine subsystems, in dependency order:
//
//   math, scene   → scene graph, colliders, camera rig
//   sensor        → ray picking and sensor events
//   input         → controller state
//   render        → native renderer boundary, screenshots
//   frame         → frame state machine and lifecycle
//
// `platform_bridge` carries host events to the render loop.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod config;
pub mod frame;
pub mod input;
pub mod math;
pub mod platform_bridge;
pub mod render;
pub mod scene;
pub mod sensor;

pub(crate) mod sync;
