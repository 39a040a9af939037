//=========================================================================
// Screenshot Capture
//=========================================================================
//
// Eye, center and six-face cube capture.
//
// Rendering and readback happen on the render thread into a single reused
// readback buffer. Post-processing (row flip) and callback delivery always
// run on other threads so the frame never waits on user code:
//
//   capture_eye / capture_center → copy → delivery thread → callback
//   capture_cube → 6 × (render + copy) → stitcher thread
//                                          ├─ 6 face workers (flip)
//                                          └─ waits for all 6 → callback
//
//=========================================================================

//=== External Dependencies ===============================================

use std::f32::consts::{FRAC_PI_2, PI};
use std::thread;

use glam::Quat;
use log::{debug, warn};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use super::{CameraView, Eye, RenderBundle, RenderError, Renderer};
use crate::core::scene::{Camera, Scene};
use crate::core::sync::run_isolated;

//=== CapturedImage =======================================================

/// RGBA8 image with rows top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl CapturedImage {
    /// Converts a bottom-up readback into a top-down image.
    pub(crate) fn from_readback(width: u32, height: u32, readback: &[u8]) -> Self {
        let row = width as usize * 4;
        let mut pixels = Vec::with_capacity(readback.len());
        if row > 0 {
            for line in readback.chunks_exact(row).rev() {
                pixels.extend_from_slice(line);
            }
        }
        Self { width, height, pixels }
    }

    /// RGBA value at (`x`, `y`), origin top-left.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.pixels.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

//=== CubeFace ============================================================

/// Faces of a cube capture, in capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// Capture order: +X, -X, +Y, -Y, +Z, -Z.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Rotation turning a -Z looking camera toward this face.
    pub fn rotation(self) -> Quat {
        match self {
            CubeFace::PositiveX => Quat::from_rotation_y(-FRAC_PI_2),
            CubeFace::NegativeX => Quat::from_rotation_y(FRAC_PI_2),
            CubeFace::PositiveY => Quat::from_rotation_x(FRAC_PI_2),
            CubeFace::NegativeY => Quat::from_rotation_x(-FRAC_PI_2),
            CubeFace::PositiveZ => Quat::from_rotation_y(PI),
            CubeFace::NegativeZ => Quat::IDENTITY,
        }
    }
}

/// The six faces of a cube capture, in [`CubeFace::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeCapture {
    faces: Vec<CapturedImage>,
}

impl CubeCapture {
    pub fn face(&self, face: CubeFace) -> Option<&CapturedImage> {
        let index = CubeFace::ALL.iter().position(|f| *f == face)?;
        self.faces.get(index)
    }

    pub fn faces(&self) -> &[CapturedImage] {
        &self.faces
    }
}

//=== CaptureError ========================================================

/// Why a capture produced no image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("eye capture failed: {0}")]
    Render(#[from] RenderError),

    #[error("cube face {face:?} failed: {source}")]
    Face {
        face: CubeFace,
        #[source]
        source: RenderError,
    },

    #[error("worker for cube face {0:?} exited without a result")]
    WorkerLost(CubeFace),

    #[error("main scene has no camera rig")]
    NoCameraRig,

    #[error("a newer request of the same kind replaced this capture")]
    Superseded,
}

//=== Callbacks ===========================================================

/// Receives a single captured image.
pub type ScreenshotCallback = Box<dyn FnOnce(Result<CapturedImage, CaptureError>) + Send>;

/// Receives all six cube faces.
pub type CubeCallback = Box<dyn FnOnce(Result<CubeCapture, CaptureError>) + Send>;

//=== ScreenshotRequests ==================================================

/// Captures requested for the next frame. At most one per kind.
#[derive(Default)]
pub(crate) struct ScreenshotRequests {
    pub(crate) center: Option<ScreenshotCallback>,
    pub(crate) left: Option<ScreenshotCallback>,
    pub(crate) right: Option<ScreenshotCallback>,
    pub(crate) cube: Option<CubeCallback>,
}

impl ScreenshotRequests {
    pub(crate) fn is_empty(&self) -> bool {
        self.center.is_none() && self.left.is_none() && self.right.is_none() && self.cube.is_none()
    }

    /// Stores `callback` in `slot`; a request already waiting there is
    /// answered with [`CaptureError::Superseded`].
    pub(crate) fn replace<T: Send + 'static>(
        slot: &mut Option<Box<dyn FnOnce(Result<T, CaptureError>) + Send>>,
        callback: Box<dyn FnOnce(Result<T, CaptureError>) + Send>,
    ) {
        if let Some(previous) = slot.replace(callback) {
            warn!("Screenshot request replaced before it was served");
            deliver(move || previous(Err(CaptureError::Superseded)));
        }
    }
}

//=== Capturer ============================================================

/// Render-thread side of screenshot capture.
pub(crate) struct Capturer {
    width: u32,
    height: u32,
    readback: Option<Vec<u8>>,
}

impl Capturer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            readback: None,
        }
    }

    /// Returns `true` while the readback buffer is allocated.
    pub(crate) fn has_buffer(&self) -> bool {
        self.readback.is_some()
    }

    /// Frees the readback buffer.
    pub(crate) fn release_buffer(&mut self) {
        if self.readback.take().is_some() {
            debug!("Released screenshot readback buffer");
        }
    }

    //--- Single Images ----------------------------------------------------

    /// Reads back the eye that was just drawn.
    pub(crate) fn capture_eye(
        &mut self,
        renderer: &mut dyn Renderer,
        eye: Eye,
        multiview: bool,
        callback: ScreenshotCallback,
    ) {
        let result = self.read(renderer, eye, multiview).map_err(CaptureError::from);
        self.deliver_image(result, callback);
    }

    /// Draws the center camera mirrored, then reads it back.
    pub(crate) fn capture_center(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &Scene,
        bundle: &RenderBundle,
        callback: ScreenshotCallback,
    ) {
        let Some(rig) = scene.camera_rig() else {
            deliver(move || callback(Err(CaptureError::NoCameraRig)));
            return;
        };

        let mut view = CameraView::new(rig, rig.center_camera(), Eye::Center);
        view.horizontal_flip = true;

        let result = renderer
            .render_camera(scene.handle(), &view, bundle, false)
            .and_then(|()| self.read(renderer, Eye::Center, false))
            .map_err(CaptureError::from);
        self.deliver_image(result, callback);
    }

    //--- Cube -------------------------------------------------------------

    /// Renders the six faces with a temporary 90° camera on the rig.
    ///
    /// The first failing face aborts the capture; the callback receives an
    /// error naming it. The temporary camera is always removed.
    pub(crate) fn capture_cube(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &mut Scene,
        bundle: &RenderBundle,
        callback: CubeCallback,
    ) {
        let scene_handle = scene.handle();
        let Some(rig) = scene.camera_rig_mut() else {
            deliver(move || callback(Err(CaptureError::NoCameraRig)));
            return;
        };

        let camera = rig.attach_camera(Camera::perspective(90.0));
        let mut faces = Vec::with_capacity(CubeFace::ALL.len());
        let mut failure = None;

        for face in CubeFace::ALL {
            let Some(face_camera) = rig.attached_camera_mut(camera) else {
                break;
            };
            face_camera.set_orientation(face.rotation());
            let face_camera = face_camera.clone();
            let view = CameraView::new(rig, &face_camera, Eye::Center);

            let result = renderer
                .render_camera(scene_handle, &view, bundle, false)
                .and_then(|()| self.read(renderer, Eye::Center, false));
            match result {
                Ok(pixels) => faces.push(pixels),
                Err(source) => {
                    warn!("Cube capture aborted at face {:?}: {}", face, source);
                    failure = Some(CaptureError::Face { face, source });
                    break;
                }
            }
        }

        rig.detach_camera(camera);

        match failure {
            Some(error) => deliver(move || callback(Err(error))),
            None => stitch(self.width, self.height, faces, callback),
        }
    }

    /// Answers `callback` with `error` off the render thread.
    pub(crate) fn reject<T: 'static>(
        callback: Box<dyn FnOnce(Result<T, CaptureError>) + Send>,
        error: CaptureError,
    ) {
        deliver(move || callback(Err(error)));
    }

    //--- Internal Helpers -------------------------------------------------

    /// Reads `eye` into the shared buffer and returns a copy.
    fn read(&mut self, renderer: &mut dyn Renderer, eye: Eye, multiview: bool) -> Result<Vec<u8>, RenderError> {
        let size = self.width as usize * self.height as usize * 4;
        let buffer = self.readback.get_or_insert_with(|| {
            debug!("Allocated screenshot readback buffer ({} bytes)", size);
            vec![0; size]
        });

        renderer.read_render_result(buffer, eye, multiview)?;
        Ok(buffer.clone())
    }

    fn deliver_image(&self, result: Result<Vec<u8>, CaptureError>, callback: ScreenshotCallback) {
        let (width, height) = (self.width, self.height);
        deliver(move || callback(result.map(|pixels| CapturedImage::from_readback(width, height, &pixels))));
    }
}

//=== Delivery ============================================================

/// Runs `job` on a fresh delivery thread.
fn deliver<F: FnOnce() + Send + 'static>(job: F) {
    thread::spawn(move || {
        run_isolated("screenshot callback", job);
    });
}

/// Flips each face on its own worker; the stitcher thread waits for all
/// six completions before invoking `callback`.
fn stitch(width: u32, height: u32, faces: Vec<Vec<u8>>, callback: CubeCallback) {
    thread::spawn(move || {
        let (tx, rx) = crossbeam_channel::bounded(CubeFace::ALL.len());

        for (index, pixels) in faces.into_iter().enumerate() {
            let tx = tx.clone();
            thread::spawn(move || {
                let image = CapturedImage::from_readback(width, height, &pixels);
                let _ = tx.send((index, image));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<CapturedImage>> = CubeFace::ALL.iter().map(|_| None).collect();
        for (index, image) in rx.iter() {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(image);
            }
        }

        let result = CubeFace::ALL
            .iter()
            .zip(slots)
            .map(|(face, slot)| slot.ok_or(CaptureError::WorkerLost(*face)))
            .collect::<Result<Vec<_>, _>>()
            .map(|faces| CubeCapture { faces });

        run_isolated("cube capture callback", move || callback(result));
    });
}

//=========================================================================
// Unit Tests
//=========================================================================
