//=========================================================================
// Application Hooks
//=========================================================================
//
// Lifecycle notifications delivered to the application.
//
// Order for a session without splash screen:
//   on_early_init → on_init → on_after_init → on_scene_init
//     → on_scene_after_init → on_step (every frame)
//
// With a splash screen the scene notifications wait until the splash has
// faded out and the pending main scene is current. Everything except
// `create_splash_screen` runs on the framework thread.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use super::ViewContext;
use crate::core::scene::{NodeKey, Scene, SceneError, SharedScene};

//=== AppError ============================================================

/// Errors returned by application hooks.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("initialization failed: {0}")]
    Init(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("{0}")]
    Other(String),
}

//=== Application =========================================================

/// Application driven by a [`ViewManager`](super::ViewManager).
///
/// Only [`Application::on_init`] is required.
pub trait Application: Send + 'static {
    /// Builds splash content inside `scene`; return its root node to show
    /// a splash screen. Called once on the render thread.
    fn create_splash_screen(&mut self, _scene: &mut Scene) -> Option<NodeKey> {
        None
    }

    /// Called before [`Application::on_init`].
    fn on_early_init(&mut self, _ctx: &ViewContext) -> Result<(), AppError> {
        Ok(())
    }

    /// Builds the main scene. An error ends the session.
    fn on_init(&mut self, ctx: &ViewContext) -> Result<(), AppError>;

    /// Called after a successful [`Application::on_init`].
    fn on_after_init(&mut self, _ctx: &ViewContext) {}

    /// Called once per normal frame.
    fn on_step(&mut self, _ctx: &ViewContext) -> Result<(), AppError> {
        Ok(())
    }

    /// The main scene became current.
    fn on_scene_init(&mut self, _ctx: &ViewContext, _scene: &SharedScene) {}

    /// Follows [`Application::on_scene_init`].
    fn on_scene_after_init(&mut self, _ctx: &ViewContext, _scene: &SharedScene) {}
}
