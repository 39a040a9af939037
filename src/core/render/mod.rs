//=========================================================================
// Render Interface
//=========================================================================
//
// Boundary to the native renderer.
//
// The renderer itself (culling, shadow maps, eye drawing, pixel readback)
// lives outside this crate. The frame pipeline talks to it only through
// the `Renderer` trait, naming scenes, cameras, shader managers and
// render textures by opaque `NativeHandle`s.
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Quat;
use thiserror::Error;

//=== Module Declarations =================================================

pub mod screenshot;

#[cfg(test)]
pub(crate) mod mock;

//=== Internal Dependencies ===============================================

use crate::core::scene::{Camera, CameraRig, NativeHandle};

//=== Eye =================================================================

/// Which view is being drawn or read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
    /// Monoscopic center view (screenshots, cube faces).
    Center,
}

//=== RenderBundle ========================================================

/// Native resources shared by every draw of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBundle {
    pub material_shader_manager: NativeHandle,
    pub post_effect_shader_manager: NativeHandle,
    pub post_effect_texture_a: NativeHandle,
    pub post_effect_texture_b: NativeHandle,
    pub eye_capture_texture: NativeHandle,
    /// Eye buffer width in pixels.
    pub width: u32,
    /// Eye buffer height in pixels.
    pub height: u32,
}

impl RenderBundle {
    /// Allocates handles for an eye buffer of `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            material_shader_manager: NativeHandle::next(),
            post_effect_shader_manager: NativeHandle::next(),
            post_effect_texture_a: NativeHandle::next(),
            post_effect_texture_b: NativeHandle::next(),
            eye_capture_texture: NativeHandle::next(),
            width,
            height,
        }
    }
}

//=== CameraView ==========================================================

/// Everything the renderer needs to draw one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub camera: NativeHandle,
    pub eye: Eye,
    /// World orientation (rig orientation applied).
    pub orientation: Quat,
    pub fov_y_degrees: f32,
    /// Mirror the image with the horizontal-flip post effect.
    pub horizontal_flip: bool,
}

impl CameraView {
    pub fn new(rig: &CameraRig, camera: &Camera, eye: Eye) -> Self {
        Self {
            camera: camera.handle(),
            eye,
            orientation: rig.orientation() * camera.orientation(),
            fov_y_degrees: camera.fov_y_degrees(),
            horizontal_flip: camera.horizontal_flip(),
        }
    }
}

//=== RenderError =========================================================

/// Failures reported by the native renderer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("failed to draw camera {camera:?}: {reason}")]
    Draw { camera: NativeHandle, reason: String },

    #[error("pixel readback failed: {0}")]
    Readback(String),
}

//=== Renderer ============================================================

/// Native renderer operations used by the frame pipeline.
///
/// All methods are called on the render thread.
pub trait Renderer: Send {
    /// Renders shadow maps for `scene`.
    fn make_shadow_maps(&mut self, scene: NativeHandle, shader_manager: NativeHandle, width: u32, height: u32);

    /// Culls `scene` against `camera`.
    fn cull(&mut self, scene: NativeHandle, camera: NativeHandle, shader_manager: NativeHandle);

    /// Draws `scene` from `view` into the current eye target.
    fn render_camera(
        &mut self,
        scene: NativeHandle,
        view: &CameraView,
        bundle: &RenderBundle,
        multiview: bool,
    ) -> Result<(), RenderError>;

    /// Copies the last rendered image of `eye` into `pixels` (RGBA8, rows
    /// bottom-up).
    fn read_render_result(&mut self, pixels: &mut [u8], eye: Eye, multiview: bool) -> Result<(), RenderError>;
}
