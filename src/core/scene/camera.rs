//=========================================================================
// Cameras
//=========================================================================
//
// Camera rig owned by a scene: a head pose plus left, right and center
// cameras. Extra cameras can be attached temporarily (cube capture).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{EulerRot, Quat, Vec3};

//=== NativeHandle ========================================================

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier handed to the native renderer.
///
/// Scenes, cameras, shader managers and render textures are all named by
/// handles on the renderer side. Handles are unique for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// Allocates a fresh handle.
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

//=== Camera ==============================================================

/// Perspective camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    handle: NativeHandle,
    fov_y_degrees: f32,
    orientation: Quat,
    horizontal_flip: bool,
}

impl Camera {
    /// Creates a camera looking down -Z with the given vertical field of view.
    pub fn perspective(fov_y_degrees: f32) -> Self {
        Self {
            handle: NativeHandle::next(),
            fov_y_degrees,
            orientation: Quat::IDENTITY,
            horizontal_flip: false,
        }
    }

    /// Sets the orientation relative to the rig.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y_degrees
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
    }

    /// Whether the image is mirrored horizontally by a post effect.
    pub fn horizontal_flip(&self) -> bool {
        self.horizontal_flip
    }

    pub fn set_horizontal_flip(&mut self, flip: bool) {
        self.horizontal_flip = flip;
    }

    /// Forward vector relative to the rig.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

//=== CameraRig ===========================================================

/// Head-tracked camera rig.
#[derive(Debug, Clone)]
pub struct CameraRig {
    orientation: Quat,
    left: Camera,
    right: Camera,
    center: Camera,
    attached: Vec<Camera>,
    yaw_resets: u32,
}

impl CameraRig {
    /// Default vertical field of view of the eye cameras.
    pub const DEFAULT_FOV_Y: f32 = 90.0;

    pub fn new() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            left: Camera::perspective(Self::DEFAULT_FOV_Y),
            right: Camera::perspective(Self::DEFAULT_FOV_Y),
            center: Camera::perspective(Self::DEFAULT_FOV_Y),
            attached: Vec::new(),
            yaw_resets: 0,
        }
    }

    /// Head orientation.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
    }

    /// Drops the yaw component of the head orientation, keeping pitch and
    /// roll, so the user faces the scene's forward direction.
    pub fn reset_yaw(&mut self) {
        let (_, pitch, roll) = self.orientation.to_euler(EulerRot::YXZ);
        self.orientation = Quat::from_euler(EulerRot::YXZ, 0.0, pitch, roll);
        self.yaw_resets += 1;
    }

    /// Number of times [`CameraRig::reset_yaw`] ran.
    pub fn yaw_resets(&self) -> u32 {
        self.yaw_resets
    }

    pub fn left_camera(&self) -> &Camera {
        &self.left
    }

    pub fn right_camera(&self) -> &Camera {
        &self.right
    }

    pub fn center_camera(&self) -> &Camera {
        &self.center
    }

    pub fn center_camera_mut(&mut self) -> &mut Camera {
        &mut self.center
    }

    //--- Attached Cameras -------------------------------------------------

    /// Attaches an extra camera; returns its handle.
    pub fn attach_camera(&mut self, camera: Camera) -> NativeHandle {
        let handle = camera.handle();
        self.attached.push(camera);
        handle
    }

    /// Detaches the camera with `handle`, returning it if present.
    pub fn detach_camera(&mut self, handle: NativeHandle) -> Option<Camera> {
        let index = self.attached.iter().position(|c| c.handle() == handle)?;
        Some(self.attached.remove(index))
    }

    pub fn attached_camera(&self, handle: NativeHandle) -> Option<&Camera> {
        self.attached.iter().find(|c| c.handle() == handle)
    }

    pub fn attached_camera_mut(&mut self, handle: NativeHandle) -> Option<&mut Camera> {
        self.attached.iter_mut().find(|c| c.handle() == handle)
    }

    pub fn attached_cameras(&self) -> &[Camera] {
        &self.attached
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn handles_are_unique() {
        assert_ne!(NativeHandle::next(), NativeHandle::next());
    }

    #[test]
    fn reset_yaw_keeps_pitch() {
        let mut rig = CameraRig::new();
        rig.set_orientation(Quat::from_euler(EulerRot::YXZ, FRAC_PI_2, 0.3, 0.0));
        rig.reset_yaw();

        let (yaw, pitch, _) = rig.orientation().to_euler(EulerRot::YXZ);
        assert!(yaw.abs() < 1e-4);
        assert!((pitch - 0.3).abs() < 1e-4);
        assert_eq!(rig.yaw_resets(), 1);
    }

    #[test]
    fn attach_and_detach_camera() {
        let mut rig = CameraRig::new();
        let handle = rig.attach_camera(Camera::perspective(90.0));
        assert_eq!(rig.attached_cameras().len(), 1);

        assert!(rig.detach_camera(handle).is_some());
        assert!(rig.detach_camera(handle).is_none());
        assert!(rig.attached_cameras().is_empty());
    }
}
