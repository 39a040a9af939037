//=========================================================================
// Stereo Frame Engine
//
// Main entry point: owns a view and drives it from a render thread.
//
// Architecture:
// ```text
//     EngineBuilder  ──build(app, renderer)──>  Engine  ──run()──>  [Render thread]
//         │                                       │
//         ├─ with_config()                        ├─ context()
//         ├─ with_fps()                           ├─ input_sender()
//         ├─ with_eye_buffer()                    └─ spawn() / run()
//         └─ with_channel_capacity()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::config::ViewConfig;
use crate::core::frame::{Application, ViewContext, ViewManager};
use crate::core::platform_bridge::{EventCollector, HostEvent, TickControl};
use crate::core::render::Renderer;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **FPS**: 60.0
/// - **Eye buffer**: 1024 x 1024
/// - **Channel capacity**: 128 host event batches
///
/// # Examples
///
/// ```ignore
/// use stereo_frame::EngineBuilder;
///
/// EngineBuilder::new()
///     .with_fps(72.0)
///     .with_eye_buffer(1536, 1536)
///     .build(MyApp::default(), NativeRenderer::new())
///     .run();
/// ```
pub struct EngineBuilder {
    config: ViewConfig,
    channel_capacity: usize,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ViewConfig::default(),
            channel_capacity: 128,
        }
    }

    /// Replaces the whole view configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not validate.
    pub fn with_config(mut self, config: ViewConfig) -> Self {
        if let Err(e) = config.validate() {
            panic!("Invalid view config: {}", e);
        }
        self.config = config;
        self
    }

    /// Sets the target frame rate of the render thread.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `fps <= 0.0`.
    pub fn with_fps(mut self, fps: f64) -> Self {
        assert!(fps > 0.0, "FPS must be positive, got {}", fps);
        self.config.fps = fps;
        self
    }

    /// Sets the per-eye render target size, which is also the screenshot
    /// resolution.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn with_eye_buffer(mut self, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "Eye buffer must be non-empty, got {}x{}", width, height);
        self.config.eye_buffer.width = width;
        self.config.eye_buffer.height = height;
        self
    }

    /// Sets the channel capacity for host → render thread events.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Builds the engine around `app` and the native `renderer`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not validate, e.g. an fps too
    /// small for its frame duration to be represented.
    pub fn build<A, R>(self, app: A, renderer: R) -> Engine<A>
    where
        A: Application,
        R: Renderer + 'static,
    {
        info!(
            "Building engine (FPS: {}, eye buffer: {}x{}, channel: {})",
            self.config.fps, self.config.eye_buffer.width, self.config.eye_buffer.height, self.channel_capacity
        );

        let (sender, receiver) = bounded(self.channel_capacity);
        let fps = self.config.fps;
        let view = match ViewManager::new(self.config, app, renderer) {
            Ok(view) => view,
            Err(e) => panic!("Invalid view config: {}", e),
        };

        Engine {
            view,
            sender,
            receiver,
            fps,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// A view plus the host channel feeding it.
///
/// ```text
/// Host threads ──HostEvent──> Render thread @ FPS
///                               ├─► process_input (sensor dispatch)
///                               └─► draw_frame ──hooks──> Framework thread
/// ```
pub struct Engine<A: Application> {
    view: ViewManager<A>,
    sender: Sender<HostEvent>,
    receiver: Receiver<HostEvent>,
    fps: f64,
}

impl<A: Application> Engine<A> {
    /// Handle for application code and host integration.
    pub fn context(&self) -> ViewContext {
        self.view.context()
    }

    /// Sender for host events. Dropping every sender does not stop the
    /// engine; send [`HostEvent::Shutdown`] or call
    /// [`ViewContext::finish`].
    pub fn input_sender(&self) -> Sender<HostEvent> {
        self.sender.clone()
    }

    //--- Execution --------------------------------------------------------

    /// Starts the render thread.
    ///
    /// Each tick collects host events, dispatches controller picks and
    /// draws one frame. The thread exits on [`HostEvent::Shutdown`] or once
    /// the session is finishing.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.fps);
        let Engine {
            mut view,
            sender,
            receiver,
            ..
        } = self;

        thread::spawn(move || {
            // Keeps the channel connected while no host sender exists
            let _sender = sender;
            let mut collector = EventCollector::new(receiver);
            let ctx = view.context();

            loop {
                let frame_start = Instant::now();

                //--- Step 1: Gather host events ----------------------------
                if collector.collect_frame() == TickControl::Exit {
                    info!("Render thread exiting.");
                    break;
                }

                //--- Step 2: Input and frame -------------------------------
                view.process_input(collector.events());
                view.draw_frame();

                if ctx.is_finishing() {
                    info!("Session finished; render thread exiting.");
                    break;
                }

                //--- Step 3: Maintain pacing -------------------------------
                let elapsed = frame_start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }

            view.shutdown();
        })
    }

    /// Runs the render thread and blocks until it exits.
    pub fn run(self) {
        info!("Starting engine runtime (FPS: {})", self.fps);

        match self.spawn().join() {
            Ok(()) => info!("Render thread terminated cleanly"),
            Err(e) => error!("Render thread panicked: {:?}", e),
        }

        info!("Engine shutdown complete");
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
