//=========================================================================
// Frame State
//=========================================================================
//
// Frame sequencing states and their transition function.
//
//   FirstFrame ──Initialized{splash}──> SplashScreen{closing: false}
//        │                                   │ CloseStarted
//        │                                   v
//        │                             SplashScreen{closing: true}
//        │                                   │ SplashFinished
//        └──────Initialized{no splash}─────> Normal
//
// InitFailed moves any state to an inert SplashScreen{closing: true}.
//
//=========================================================================

//=== FrameState ==========================================================

/// Per-session frame state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Nothing drawn yet; the next tick initializes the application.
    #[default]
    FirstFrame,
    /// Splash screen shown; `closing` once the fade-out has started.
    SplashScreen { closing: bool },
    /// Steady state.
    Normal,
}

//=== FrameTrigger ========================================================

/// Events that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTrigger {
    /// First frame finished its setup.
    Initialized { splash: bool },
    /// Splash fade-out started.
    CloseStarted,
    /// Splash fade-out completed and the pending scene is current.
    SplashFinished,
    /// Application initialization failed.
    InitFailed,
}

impl FrameState {
    /// Returns the next state, or `None` if `trigger` does not apply.
    pub fn on(self, trigger: FrameTrigger) -> Option<FrameState> {
        use FrameState::*;
        use FrameTrigger::*;

        match (self, trigger) {
            (_, InitFailed) => Some(SplashScreen { closing: true }),
            (FirstFrame, Initialized { splash: true }) => Some(SplashScreen { closing: false }),
            (FirstFrame, Initialized { splash: false }) => Some(Normal),
            (SplashScreen { closing: false }, CloseStarted) => Some(SplashScreen { closing: true }),
            (SplashScreen { closing: true }, SplashFinished) => Some(Normal),
            _ => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_without_splash_goes_normal() {
        let next = FrameState::FirstFrame.on(FrameTrigger::Initialized { splash: false });
        assert_eq!(next, Some(FrameState::Normal));
    }

    #[test]
    fn splash_path_runs_through_closing() {
        let splash = FrameState::FirstFrame
            .on(FrameTrigger::Initialized { splash: true })
            .unwrap();
        assert_eq!(splash, FrameState::SplashScreen { closing: false });

        let closing = splash.on(FrameTrigger::CloseStarted).unwrap();
        assert_eq!(closing.on(FrameTrigger::SplashFinished), Some(FrameState::Normal));
    }

    #[test]
    fn second_close_is_ignored() {
        let closing = FrameState::SplashScreen { closing: true };
        assert_eq!(closing.on(FrameTrigger::CloseStarted), None);
    }

    #[test]
    fn transitions_never_go_backwards() {
        assert_eq!(FrameState::Normal.on(FrameTrigger::Initialized { splash: true }), None);
        assert_eq!(FrameState::Normal.on(FrameTrigger::CloseStarted), None);
        assert_eq!(FrameState::SplashScreen { closing: false }.on(FrameTrigger::SplashFinished), None);
    }

    #[test]
    fn init_failure_resets_to_inert_splash() {
        for state in [FrameState::FirstFrame, FrameState::Normal, FrameState::SplashScreen { closing: false }] {
            assert_eq!(state.on(FrameTrigger::InitFailed), Some(FrameState::SplashScreen { closing: true }));
        }
    }
}
