//=========================================================================
// Synchronization Helpers
//=========================================================================
//
// Small helpers shared by every thread that touches engine state.
//
// Jobs posted by application code may panic. A panic must never take down
// the render thread or leave a shared lock unusable, so locks recover from
// poisoning and posted work runs behind `catch_unwind`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::error;

//=== Locking =============================================================

/// Locks `mutex`, taking the inner value even if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//=== Panic Isolation =====================================================

/// Runs `job`, logging and swallowing any panic.
///
/// Returns `true` if the job completed normally.
pub(crate) fn run_isolated<F: FnOnce()>(label: &str, job: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => true,
        Err(payload) => {
            error!("{} panicked: {}", label, panic_message(payload.as_ref()));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
