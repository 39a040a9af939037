//=========================================================================
// Frame
//=========================================================================
//
// Frame state machine, deferred work and application lifecycle.
//
// Architecture:
//   ViewManager (render thread) ──posts hooks──> FrameworkThread
//        │  ▲                                        │
//        │  └── GlQueue / PostRenderQueue <── ViewContext (any thread)
//        └── Renderer (native)
//
//=========================================================================

//=== Module Declarations =================================================

mod application;
mod context;
mod framework_thread;
mod queues;
mod splash;
mod state;
mod view_manager;

//=== Public API ==========================================================

pub use application::{AppError, Application};
pub use context::ViewContext;
pub use queues::{FrameListener, FrameListenerId, Job};
pub use splash::SplashMode;
pub use state::{FrameState, FrameTrigger};
pub use view_manager::ViewManager;
