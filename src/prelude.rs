//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use stereo_frame::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder};

// Configuration
pub use crate::core::config::{ConfigError, ViewConfig};

// Frame lifecycle
pub use crate::core::frame::{AppError, Application, FrameState, SplashMode, ViewContext, ViewManager};

// Scene graph
pub use crate::core::scene::{Collider, Mesh, NodeKey, Scene, SceneError, SensorId, SharedScene};

// Sensors and input
pub use crate::core::input::{ControllerEvent, ControllerId};
pub use crate::core::platform_bridge::HostEvent;
pub use crate::core::sensor::{SensorEvent, SensorEventKind, SensorManager};

// Rendering
pub use crate::core::render::screenshot::{CaptureError, CapturedImage, CubeCapture, CubeFace};
pub use crate::core::render::{Renderer, RenderError};
