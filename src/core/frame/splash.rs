//=========================================================================
// Splash Screen
//=========================================================================

//=== External Dependencies ===============================================

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::core::scene::{NodeKey, SharedScene};

//=== SplashMode ==========================================================

/// How the splash screen is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplashMode {
    /// Closes on timeout (or right after init without a display time).
    #[default]
    Automatic,
    /// Stays until `ViewContext::close_splash_screen` is called.
    Manual,
}

//=== SplashScreen ========================================================

/// Splash content shown while the application initializes.
pub(crate) struct SplashScreen {
    pub(crate) node: NodeKey,
    /// Scene the splash node lives in (the main scene at first frame).
    pub(crate) scene: SharedScene,
    pub(crate) deadline: Option<Instant>,
    fade: Option<Fade>,
}

struct Fade {
    started: Instant,
    duration: Duration,
}

impl SplashScreen {
    pub(crate) fn new(node: NodeKey, scene: SharedScene, deadline: Option<Instant>) -> Self {
        Self {
            node,
            scene,
            deadline,
            fade: None,
        }
    }

    pub(crate) fn timed_out(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub(crate) fn start_fade(&mut self, now: Instant, duration: Duration) {
        self.fade.get_or_insert(Fade { started: now, duration });
    }

    /// Splash opacity at `now`: 1 before the fade, falling to 0.
    pub(crate) fn opacity(&self, now: Instant) -> f32 {
        match &self.fade {
            None => 1.0,
            Some(fade) if fade.duration.is_zero() => 0.0,
            Some(fade) => {
                let elapsed = now.saturating_duration_since(fade.started).as_secs_f32();
                (1.0 - elapsed / fade.duration.as_secs_f32()).clamp(0.0, 1.0)
            }
        }
    }

    pub(crate) fn fade_finished(&self, now: Instant) -> bool {
        self.fade
            .as_ref()
            .is_some_and(|fade| now.saturating_duration_since(fade.started) >= fade.duration)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
