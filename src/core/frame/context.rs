//=========================================================================
// View Context
//=========================================================================
//
// Thread-safe handle to a running view.
//
// Application hooks, frame listeners and host code all talk to the view
// through cloned `ViewContext`s. Everything behind it is either atomic or
// guarded by short-lived locks; nothing here blocks on the render thread.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

use log::debug;

//=== Internal Dependencies ===============================================

use super::framework_thread::FrameworkThread;
use super::queues::{FrameListenerId, FrameListeners, GlQueue, Job, PostRenderQueue};
use crate::core::config::ViewConfig;
use crate::core::render::screenshot::{CapturedImage, CaptureError, CubeCapture, ScreenshotRequests};
use crate::core::scene::{Scene, SharedScene};
use crate::core::sensor::SensorManager;
use crate::core::sync::{lock, run_isolated};

//=== SceneSlots ==========================================================

/// Main scene bookkeeping.
///
/// While the splash is showing, `current` holds the splash content and
/// `pending` the main scene the application is building.
pub(crate) struct SceneSlots {
    pub(crate) current: SharedScene,
    pub(crate) pending: Option<SharedScene>,
    pub(crate) showing_splash: bool,
}

//=== ViewShared ==========================================================

/// State shared by the render thread and every context.
pub(crate) struct ViewShared {
    pub(crate) config: ViewConfig,
    pub(crate) slots: Mutex<SceneSlots>,
    pub(crate) gl_queue: GlQueue,
    pub(crate) post_render: PostRenderQueue,
    pub(crate) frame_listeners: FrameListeners,
    pub(crate) framework: FrameworkThread,
    pub(crate) gl_thread: OnceLock<ThreadId>,
    pub(crate) splash_close: AtomicBool,
    pub(crate) init_failed: AtomicBool,
    pub(crate) finishing: AtomicBool,
    pub(crate) screenshots: Mutex<ScreenshotRequests>,
    frame_time_bits: AtomicU32,
    pub(crate) sensors: Arc<SensorManager>,
}

impl ViewShared {
    pub(crate) fn new(config: ViewConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(SceneSlots {
                current: Scene::new().into_shared(),
                pending: None,
                showing_splash: false,
            }),
            gl_queue: GlQueue::new(),
            post_render: PostRenderQueue::default(),
            frame_listeners: FrameListeners::default(),
            framework: FrameworkThread::spawn(),
            gl_thread: OnceLock::new(),
            splash_close: AtomicBool::new(false),
            init_failed: AtomicBool::new(false),
            finishing: AtomicBool::new(false),
            screenshots: Mutex::new(ScreenshotRequests::default()),
            frame_time_bits: AtomicU32::new(0.0_f32.to_bits()),
            sensors: Arc::new(SensorManager::new()),
        }
    }

    /// Scene being drawn.
    pub(crate) fn current_scene(&self) -> SharedScene {
        Arc::clone(&lock(&self.slots).current)
    }

    pub(crate) fn set_frame_time(&self, seconds: f32) {
        self.frame_time_bits.store(seconds.to_bits(), Ordering::Relaxed);
    }
}

//=== ViewContext =========================================================

/// Cloneable handle to a view, usable from any thread.
#[derive(Clone)]
pub struct ViewContext {
    pub(crate) shared: Arc<ViewShared>,
}

impl ViewContext {
    pub(crate) fn new(shared: Arc<ViewShared>) -> Self {
        Self { shared }
    }

    /// Session configuration.
    pub fn config(&self) -> &ViewConfig {
        &self.shared.config
    }

    //--- Main Scene -------------------------------------------------------

    /// The application's main scene.
    ///
    /// While the splash screen is up this is the scene that becomes
    /// current once the splash closes, not the one being drawn.
    pub fn main_scene(&self) -> SharedScene {
        let slots = lock(&self.shared.slots);
        match (&slots.pending, slots.showing_splash) {
            (Some(pending), true) => Arc::clone(pending),
            _ => Arc::clone(&slots.current),
        }
    }

    /// Replaces the main scene. During the splash the replacement waits
    /// in the pending slot.
    pub fn set_main_scene(&self, scene: SharedScene) {
        let mut slots = lock(&self.shared.slots);
        if slots.showing_splash {
            slots.pending = Some(scene);
        } else {
            slots.current = scene;
        }
    }

    //--- Threads ----------------------------------------------------------

    /// Runs `job` on the render thread before the next frame's listeners.
    /// Called from the render thread itself, the job runs immediately.
    pub fn run_on_gl_thread<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_gl_thread() {
            run_isolated("render thread job", job);
        } else {
            self.shared.gl_queue.push(Box::new(job));
        }
    }

    /// Runs `job` on the render thread after `delay_frames` more frames
    /// have been drawn (0 = right after the current frame).
    pub fn run_on_gl_thread_post_render<F>(&self, delay_frames: u32, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.post_render.push(delay_frames, Box::new(job));
    }

    /// Queues `job` on the framework thread, after any lifecycle hooks
    /// already posted.
    pub fn run_on_framework_thread<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.framework.run(Box::new(job) as Job);
    }

    /// Returns `true` on the thread drawing frames.
    pub fn is_gl_thread(&self) -> bool {
        self.shared.gl_thread.get() == Some(&thread::current().id())
    }

    //--- Frame Listeners --------------------------------------------------

    /// Calls `listener` every frame with the frame time in seconds.
    pub fn register_frame_listener<F>(&self, listener: F) -> FrameListenerId
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.shared.frame_listeners.register(Box::new(listener))
    }

    pub fn unregister_frame_listener(&self, id: FrameListenerId) {
        self.shared.frame_listeners.unregister(id);
    }

    /// Seconds between the last two frames.
    pub fn frame_time(&self) -> f32 {
        f32::from_bits(self.shared.frame_time_bits.load(Ordering::Relaxed))
    }

    //--- Splash -----------------------------------------------------------

    /// Starts closing the splash screen on the next frame.
    pub fn close_splash_screen(&self) {
        if !self.shared.splash_close.swap(true, Ordering::SeqCst) {
            debug!("Splash screen close requested");
        }
    }

    //--- Screenshots ------------------------------------------------------

    /// Captures the center view (mirrored post effect) on the next frame.
    pub fn capture_screen_center<F>(&self, callback: F)
    where
        F: FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static,
    {
        ScreenshotRequests::replace(&mut lock(&self.shared.screenshots).center, Box::new(callback));
    }

    /// Captures the left eye after it is drawn on the next frame.
    pub fn capture_screen_left<F>(&self, callback: F)
    where
        F: FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static,
    {
        ScreenshotRequests::replace(&mut lock(&self.shared.screenshots).left, Box::new(callback));
    }

    /// Captures the right eye after it is drawn on the next frame.
    pub fn capture_screen_right<F>(&self, callback: F)
    where
        F: FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static,
    {
        ScreenshotRequests::replace(&mut lock(&self.shared.screenshots).right, Box::new(callback));
    }

    /// Captures the six cube faces around the camera rig.
    pub fn capture_3d<F>(&self, callback: F)
    where
        F: FnOnce(Result<CubeCapture, CaptureError>) + Send + 'static,
    {
        ScreenshotRequests::replace(&mut lock(&self.shared.screenshots).cube, Box::new(callback));
    }

    //--- Sensors ----------------------------------------------------------

    pub fn sensor_manager(&self) -> &SensorManager {
        &self.shared.sensors
    }

    //--- Session ----------------------------------------------------------

    /// Asks the host to end the session.
    pub fn finish(&self) {
        if !self.shared.finishing.swap(true, Ordering::SeqCst) {
            debug!("View finishing");
        }
    }

    pub fn is_finishing(&self) -> bool {
        self.shared.finishing.load(Ordering::SeqCst)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ViewContext {
        ViewContext::new(Arc::new(ViewShared::new(ViewConfig::default())))
    }

    #[test]
    fn main_scene_is_pending_during_splash() {
        let ctx = context();
        let splash_scene = ctx.main_scene();
        let pending = Scene::new().into_shared();
        {
            let mut slots = lock(&ctx.shared.slots);
            slots.pending = Some(Arc::clone(&pending));
            slots.showing_splash = true;
        }

        assert!(Arc::ptr_eq(&ctx.main_scene(), &pending));

        let replacement = Scene::new().into_shared();
        ctx.set_main_scene(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&ctx.main_scene(), &replacement));
        assert!(Arc::ptr_eq(&ctx.shared.current_scene(), &splash_scene));
    }

    #[test]
    fn set_main_scene_replaces_current_without_splash() {
        let ctx = context();
        let scene = Scene::new().into_shared();
        ctx.set_main_scene(Arc::clone(&scene));
        assert!(Arc::ptr_eq(&ctx.shared.current_scene(), &scene));
    }

    #[test]
    fn gl_jobs_queue_off_the_gl_thread() {
        let ctx = context();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        ctx.run_on_gl_thread(move || flag.store(true, Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));

        ctx.shared.gl_queue.drain();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn gl_jobs_run_inline_on_the_gl_thread() {
        let ctx = context();
        ctx.shared.gl_thread.set(thread::current().id()).unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        ctx.run_on_gl_thread(move || flag.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn frame_time_round_trips_through_bits() {
        let ctx = context();
        ctx.shared.set_frame_time(0.016);
        assert_eq!(ctx.frame_time(), 0.016);
    }

    #[test]
    fn finish_is_sticky() {
        let ctx = context();
        assert!(!ctx.is_finishing());
        ctx.finish();
        ctx.finish();
        assert!(ctx.clone().is_finishing());
    }
}
