//=========================================================================
// Recording Renderer (tests)
//=========================================================================

use std::sync::{Arc, Mutex};

use super::{CameraView, Eye, RenderBundle, RenderError, Renderer};
use crate::core::scene::NativeHandle;

/// One call made to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RenderCall {
    ShadowMaps { scene: NativeHandle },
    Cull { scene: NativeHandle, camera: NativeHandle },
    Render { scene: NativeHandle, view: CameraView },
    Readback { eye: Eye },
}

/// Renderer that records calls and fills readbacks with the row index.
pub(crate) struct MockRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    row_bytes: usize,
    renders: usize,
    fail_render_at: Option<usize>,
}

impl MockRenderer {
    /// `width` is the eye buffer width in pixels.
    pub(crate) fn new(width: usize) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            row_bytes: width * 4,
            renders: 0,
            fail_render_at: None,
        }
    }

    /// Fails the `index`-th (0-based) `render_camera` call.
    pub(crate) fn failing_render_at(mut self, index: usize) -> Self {
        self.fail_render_at = Some(index);
        self
    }

    /// Shared handle to the call log, usable after the renderer is moved.
    pub(crate) fn call_log(&self) -> Arc<Mutex<Vec<RenderCall>>> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for MockRenderer {
    fn make_shadow_maps(&mut self, scene: NativeHandle, _shader_manager: NativeHandle, _width: u32, _height: u32) {
        self.record(RenderCall::ShadowMaps { scene });
    }

    fn cull(&mut self, scene: NativeHandle, camera: NativeHandle, _shader_manager: NativeHandle) {
        self.record(RenderCall::Cull { scene, camera });
    }

    fn render_camera(
        &mut self,
        scene: NativeHandle,
        view: &CameraView,
        _bundle: &RenderBundle,
        _multiview: bool,
    ) -> Result<(), RenderError> {
        self.record(RenderCall::Render { scene, view: *view });
        let index = self.renders;
        self.renders += 1;
        if self.fail_render_at == Some(index) {
            return Err(RenderError::Draw {
                camera: view.camera,
                reason: "mock failure".into(),
            });
        }
        Ok(())
    }

    fn read_render_result(&mut self, pixels: &mut [u8], eye: Eye, _multiview: bool) -> Result<(), RenderError> {
        self.record(RenderCall::Readback { eye });
        for (i, byte) in pixels.iter_mut().enumerate() {
            *byte = (i / self.row_bytes.max(1)) as u8;
        }
        Ok(())
    }
}
