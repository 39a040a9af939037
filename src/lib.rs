//=========================================================================
// Stereo Frame: Library Root
//
// Frame sequencing and spatial sensor dispatch for stereoscopic VR views
// drawn by an external native renderer.
//
// Responsibilities:
// - Expose the engine facade (`EngineBuilder`, `Engine`)
// - Expose the core subsystems for applications that drive a
//   `ViewManager` from their own render loop
//
// Typical usage:
// ```ignore
// use stereo_frame::prelude::*;
//
// fn main() {
//     EngineBuilder::new().build(MyApp::default(), NativeRenderer::new()).run();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the scene graph, sensor dispatcher, frame state machine
// and the renderer boundary.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the render loop entry point.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder};
