//=========================================================================
// View Manager
//=========================================================================
//
// Per-frame pipeline of a stereoscopic view.
//
// Each `draw_frame` call:
//   1. frame time + sensored scene check
//   2. before draw: state dispatch
//        FirstFrame    → splash setup, GL drain, post init hooks
//        SplashScreen  → callbacks, close request / timeout, fade, swap
//        Normal        → reset stats, callbacks, post step
//   3. shadow maps + cull
//   4. eyes (left/right or multiview) with eye captures, then center
//      and cube captures
//   5. after draw: post-render jobs, stats
//
// "Callbacks" are the GL queue drain followed by frame listeners; they
// only run once the current scene's camera rig has had its yaw reset.
//
// Lifecycle hooks never run on the render thread: they are posted to the
// framework thread, in order, so a slow `on_init` keeps frames flowing.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::application::Application;
use super::context::{ViewContext, ViewShared};
use super::splash::{SplashMode, SplashScreen};
use super::state::{FrameState, FrameTrigger};
use crate::core::config::{ConfigError, ViewConfig};
use crate::core::input::{ControllerEvent, InputManager};
use crate::core::render::screenshot::{CaptureError, Capturer, ScreenshotCallback, ScreenshotRequests};
use crate::core::render::{CameraView, Eye, RenderBundle, RenderError, Renderer};
use crate::core::scene::{NativeHandle, Scene, SharedScene};
use crate::core::sync::lock;

//=== ViewManager =========================================================

/// Drives the frame state machine of one view. Owned by the render thread.
pub struct ViewManager<A: Application> {
    shared: Arc<ViewShared>,
    app: Arc<Mutex<A>>,
    renderer: Box<dyn Renderer>,
    state: FrameState,
    splash: Option<SplashScreen>,
    sensored_scene: Option<NativeHandle>,
    bundle: RenderBundle,
    capturer: Capturer,
    input: InputManager,
    previous_frame: Option<Instant>,
}

impl<A: Application> ViewManager<A> {
    /// Creates the view; `config` must validate.
    pub fn new<R: Renderer + 'static>(config: ViewConfig, app: A, renderer: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let (width, height) = (config.eye_buffer.width, config.eye_buffer.height);
        Ok(Self {
            shared: Arc::new(ViewShared::new(config)),
            app: Arc::new(Mutex::new(app)),
            renderer: Box::new(renderer),
            state: FrameState::FirstFrame,
            splash: None,
            sensored_scene: None,
            bundle: RenderBundle::new(width, height),
            capturer: Capturer::new(width, height),
            input: InputManager::new(),
            previous_frame: None,
        })
    }

    /// New handle to this view.
    pub fn context(&self) -> ViewContext {
        ViewContext::new(Arc::clone(&self.shared))
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Shared application instance.
    pub fn application(&self) -> &Arc<Mutex<A>> {
        &self.app
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    //--- Frame ------------------------------------------------------------

    /// Draws one frame stamped with the current time.
    pub fn draw_frame(&mut self) {
        self.draw_frame_at(Instant::now());
    }

    /// Draws one frame as if the clock read `now`.
    pub fn draw_frame_at(&mut self, now: Instant) {
        let frame_time = self
            .previous_frame
            .map_or(0.0, |previous| now.saturating_duration_since(previous).as_secs_f32());
        self.previous_frame = Some(now);
        self.shared.set_frame_time(frame_time);

        self.update_sensored_scene();
        self.before_draw(now, frame_time);

        let scene = self.shared.current_scene();
        self.draw(&scene);
        self.after_draw(&scene);
    }

    /// Applies controller events and dispatches pick passes against the
    /// scene being drawn: one right after every button edge, then one for
    /// each controller not picked since its last change. Every controller
    /// gets at least one pass per call.
    ///
    /// Sensor listeners run after the scene lock is released, in pass
    /// order, and may lock the scene themselves.
    pub fn process_input(&mut self, events: &[ControllerEvent]) {
        self.input.begin_frame();

        let sensors = &self.shared.sensors;
        let scene = self.shared.current_scene();
        let mut deliveries = Vec::new();
        {
            let mut scene = lock(&scene);
            self.input.process_events_with(events, |controller| {
                deliveries.extend(sensors.collect_pick(&mut scene, controller));
            });
            for controller in self.input.controllers_mut().filter(|c| c.needs_pick()) {
                deliveries.extend(sensors.collect_pick(&mut scene, controller));
                controller.mark_picked();
            }
        }

        for delivery in deliveries {
            delivery.deliver();
        }
    }

    /// Stops the framework thread after the hooks already posted.
    pub fn shutdown(&self) {
        self.shared.framework.shutdown();
    }

    //--- Before Draw ------------------------------------------------------

    fn update_sensored_scene(&mut self) {
        let scene = self.shared.current_scene();
        let mut scene = lock(&scene);
        let handle = scene.handle();
        if self.sensored_scene == Some(handle) {
            return;
        }

        if let Some(rig) = scene.camera_rig_mut() {
            rig.reset_yaw();
            self.sensored_scene = Some(handle);
            debug!("Scene {:?} is now sensored", handle);
        }
    }

    fn is_sensored(&self) -> bool {
        let scene = self.shared.current_scene();
        let handle = lock(&scene).handle();
        self.sensored_scene == Some(handle)
    }

    fn before_draw(&mut self, now: Instant, frame_time: f32) {
        if self.shared.init_failed.load(Ordering::SeqCst) && !self.is_inert() {
            self.splash = None;
            self.transition(FrameTrigger::InitFailed);
        }

        match self.state {
            FrameState::FirstFrame => self.first_frame(now),
            FrameState::SplashScreen { closing } => self.splash_frame(now, frame_time, closing),
            FrameState::Normal => self.normal_frame(frame_time),
        }
    }

    /// Closing state without splash content: where a failed init parks.
    fn is_inert(&self) -> bool {
        self.state == FrameState::SplashScreen { closing: true } && self.splash.is_none()
    }

    fn first_frame(&mut self, now: Instant) {
        info!("First frame");
        let _ = self.shared.gl_thread.set(thread::current().id());

        let settings = self.shared.config.splash;
        if settings.enabled {
            let current = self.shared.current_scene();
            let node = {
                let mut app = lock(&self.app);
                let mut scene = lock(&current);
                app.create_splash_screen(&mut scene)
            };

            if let Some(node) = node {
                let deadline = settings.display_time().and_then(|display| now.checked_add(display));
                self.splash = Some(SplashScreen::new(node, current, deadline));

                let mut slots = lock(&self.shared.slots);
                slots.pending = Some(Scene::new().into_shared());
                slots.showing_splash = true;
                debug!("Splash screen shown");
            }
        }

        self.shared.gl_queue.drain();
        self.post_init();

        if self.splash.is_some() {
            self.transition(FrameTrigger::Initialized { splash: true });
        } else {
            self.post_scene_ready();
            self.transition(FrameTrigger::Initialized { splash: false });
        }
    }

    fn splash_frame(&mut self, now: Instant, frame_time: f32, closing: bool) {
        if self.is_inert() {
            // Only the finish job is left to run
            self.shared.gl_queue.drain();
            return;
        }

        if self.is_sensored() {
            self.run_frame_callbacks(frame_time);
        }

        let settings = self.shared.config.splash;
        let Some(splash) = self.splash.as_mut() else {
            return;
        };

        if closing {
            let opacity = splash.opacity(now);
            if let Err(e) = lock(&splash.scene).set_opacity(splash.node, opacity) {
                warn!("Splash fade skipped: {}", e);
            }
            if splash.fade_finished(now) {
                self.finish_splash();
            }
            return;
        }

        let requested = self.shared.splash_close.load(Ordering::SeqCst);
        let timed_out = settings.mode == SplashMode::Automatic && splash.timed_out(now);
        if requested || timed_out {
            debug!("Closing splash screen (requested: {}, timed out: {})", requested, timed_out);
            splash.start_fade(now, settings.fade_time());
            self.transition(FrameTrigger::CloseStarted);
        }
    }

    fn finish_splash(&mut self) {
        let Some(splash) = self.splash.take() else {
            return;
        };

        {
            let mut slots = lock(&self.shared.slots);
            if let Some(pending) = slots.pending.take() {
                slots.current = pending;
            }
            slots.showing_splash = false;
        }

        match lock(&splash.scene).remove_node(splash.node) {
            Ok(destroyed) => {
                for id in destroyed {
                    self.shared.sensors.forget_sensor(id);
                }
            }
            Err(e) => warn!("Splash content already gone: {}", e),
        }

        info!("Splash screen finished");
        self.post_scene_ready();
        self.transition(FrameTrigger::SplashFinished);
    }

    fn normal_frame(&mut self, frame_time: f32) {
        {
            let scene = self.shared.current_scene();
            lock(&scene).reset_stats();
        }

        if self.is_sensored() {
            self.run_frame_callbacks(frame_time);
        }

        let app = Arc::clone(&self.app);
        let ctx = self.context();
        self.shared.framework.run(Box::new(move || {
            if let Err(e) = lock(&app).on_step(&ctx) {
                error!("Application step failed: {}", e);
            }
        }));
    }

    fn run_frame_callbacks(&self, frame_time: f32) {
        self.shared.gl_queue.drain();
        self.shared.frame_listeners.run(frame_time);
    }

    //--- Lifecycle Hooks --------------------------------------------------

    fn post_init(&self) {
        let settings = self.shared.config.splash;
        let close_after_init = settings.mode == SplashMode::Automatic && settings.display_time().is_none();
        let app = Arc::clone(&self.app);
        let ctx = self.context();

        self.shared.framework.run(Box::new(move || {
            let mut app = lock(&app);
            let result = app.on_early_init(&ctx).and_then(|()| app.on_init(&ctx));

            match result {
                Ok(()) => {
                    if close_after_init {
                        ctx.close_splash_screen();
                    }
                    app.on_after_init(&ctx);
                    info!("Application initialized");
                }
                Err(e) => {
                    error!("Application init failed: {}", e);
                    ctx.shared.init_failed.store(true, Ordering::SeqCst);
                    let finishing = ctx.clone();
                    ctx.run_on_gl_thread(move || finishing.finish());
                }
            }
        }));
    }

    fn post_scene_ready(&self) {
        let app = Arc::clone(&self.app);
        let ctx = self.context();
        let scene = self.shared.current_scene();

        self.shared.framework.run(Box::new(move || {
            if ctx.shared.init_failed.load(Ordering::SeqCst) {
                return;
            }
            let mut app = lock(&app);
            app.on_scene_init(&ctx, &scene);
            app.on_scene_after_init(&ctx, &scene);
        }));
    }

    fn transition(&mut self, trigger: FrameTrigger) {
        match self.state.on(trigger) {
            Some(next) => {
                info!("Frame state {:?} -> {:?}", self.state, next);
                self.state = next;
            }
            None => warn!("Ignored {:?} in {:?}", trigger, self.state),
        }
    }

    //--- Draw -------------------------------------------------------------

    fn draw(&mut self, scene: &SharedScene) {
        let mut requests = std::mem::take(&mut *lock(&self.shared.screenshots));
        let mut scene = lock(scene);
        let handle = scene.handle();
        let multiview = self.shared.config.use_multiview;

        let Some(rig) = scene.camera_rig() else {
            trace!("Scene {:?} has no camera rig; nothing drawn", handle);
            Self::reject_all(requests);
            return;
        };

        let left = CameraView::new(rig, rig.left_camera(), Eye::Left);
        let right = CameraView::new(rig, rig.right_camera(), Eye::Right);
        let center = rig.center_camera().handle();

        let bundle = &self.bundle;
        self.renderer
            .make_shadow_maps(handle, bundle.material_shader_manager, bundle.width, bundle.height);
        self.renderer.cull(handle, center, bundle.material_shader_manager);

        if multiview {
            let drawn = self.renderer.render_camera(handle, &left, &self.bundle, true);
            self.capture_eye(Eye::Left, drawn.clone(), requests.left.take());
            self.capture_eye(Eye::Right, drawn, requests.right.take());
        } else {
            for (view, callback) in [(left, requests.left.take()), (right, requests.right.take())] {
                let drawn = self.renderer.render_camera(handle, &view, &self.bundle, false);
                self.capture_eye(view.eye, drawn, callback);
            }
        }

        if let Some(callback) = requests.center.take() {
            self.capturer
                .capture_center(self.renderer.as_mut(), &scene, &self.bundle, callback);
        }
        if let Some(callback) = requests.cube.take() {
            self.capturer
                .capture_cube(self.renderer.as_mut(), &mut scene, &self.bundle, callback);
        }
        drop(scene);

        if self.capturer.has_buffer() && lock(&self.shared.screenshots).is_empty() {
            self.capturer.release_buffer();
        }
    }

    fn capture_eye(
        &mut self,
        eye: Eye,
        drawn: Result<(), RenderError>,
        callback: Option<ScreenshotCallback>,
    ) {
        match (drawn, callback) {
            (Ok(()), Some(callback)) => {
                let multiview = self.shared.config.use_multiview;
                self.capturer.capture_eye(self.renderer.as_mut(), eye, multiview, callback);
            }
            (Err(e), Some(callback)) => {
                warn!("{:?} eye draw failed: {}", eye, e);
                Capturer::reject(callback, CaptureError::Render(e));
            }
            (Err(e), None) => warn!("{:?} eye draw failed: {}", eye, e),
            (Ok(()), None) => {}
        }
    }

    fn reject_all(requests: ScreenshotRequests) {
        let ScreenshotRequests { center, left, right, cube } = requests;
        for callback in [center, left, right].into_iter().flatten() {
            Capturer::reject(callback, CaptureError::NoCameraRig);
        }
        if let Some(callback) = cube {
            Capturer::reject(callback, CaptureError::NoCameraRig);
        }
    }

    //--- After Draw -------------------------------------------------------

    fn after_draw(&mut self, scene: &SharedScene) {
        let ran = self.shared.post_render.run_due();
        trace!(
            "Frame done: {} post-render jobs ran, {} waiting, {} frame listeners",
            ran,
            self.shared.post_render.len(),
            self.shared.frame_listeners.len()
        );

        if self.state == FrameState::Normal {
            lock(scene).update_stats();
        }
    }
}

impl<A: Application> Drop for ViewManager<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
