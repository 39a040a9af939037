//=========================================================================
// Deferred Work
//=========================================================================
//
// Work queued for the render thread:
// - `GlQueue`: FIFO jobs drained once per frame before frame listeners
// - `PostRenderQueue`: jobs run after a frame, once their delay reaches 0
// - `FrameListeners`: callbacks invoked every frame with the frame time
//
// Every job runs isolated; a panic is logged and the rest still run.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Mutex;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

//=== Internal Dependencies ===============================================

use crate::core::sync::{lock, run_isolated};

//=== Job Types ===========================================================

/// Unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send>;

/// Callback run once per frame with the frame time in seconds.
pub type FrameListener = Box<dyn FnMut(f32) + Send>;

/// Handle returned by frame listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameListenerId(u64);

//=== GlQueue =============================================================

/// FIFO of jobs for the render thread.
pub(crate) struct GlQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
}

impl GlQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub(crate) fn push(&self, job: Job) {
        // Both ends live in self, so the channel cannot be disconnected
        let _ = self.sender.send(job);
    }

    /// Runs queued jobs until the queue is empty; returns how many ran.
    pub(crate) fn drain(&self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.receiver.try_recv() {
            run_isolated("render thread job", job);
            count += 1;
        }
        if count > 0 {
            trace!("Drained {} render thread jobs", count);
        }
        count
    }
}

//=== PostRenderQueue =====================================================

/// Jobs run after drawing, each after its own number of frames.
#[derive(Default)]
pub(crate) struct PostRenderQueue {
    entries: Mutex<Vec<(u32, Job)>>,
}

impl PostRenderQueue {
    /// Queues `job` to run after `delay_frames` further frames
    /// (0 = after the current frame).
    pub(crate) fn push(&self, delay_frames: u32, job: Job) {
        lock(&self.entries).push((delay_frames, job));
    }

    /// Runs every job whose delay reached zero, in insertion order, and
    /// decrements the rest. Jobs run outside the lock so they may queue
    /// more work.
    pub(crate) fn run_due(&self) -> usize {
        let due: Vec<Job> = {
            let mut entries = lock(&self.entries);
            let mut due = Vec::new();
            let mut waiting = Vec::with_capacity(entries.len());
            for (delay, job) in entries.drain(..) {
                if delay == 0 {
                    due.push(job);
                } else {
                    waiting.push((delay - 1, job));
                }
            }
            *entries = waiting;
            due
        };

        let count = due.len();
        for job in due {
            run_isolated("post-render job", job);
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

//=== FrameListeners ======================================================

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: Vec<(FrameListenerId, FrameListener)>,
    /// Ids taken out by the `run` in progress; empty otherwise.
    in_flight: Vec<FrameListenerId>,
    removed_while_running: Vec<FrameListenerId>,
}

/// Registered frame listeners.
#[derive(Default)]
pub(crate) struct FrameListeners {
    table: Mutex<ListenerTable>,
}

impl FrameListeners {
    pub(crate) fn register(&self, listener: FrameListener) -> FrameListenerId {
        let mut table = lock(&self.table);
        let id = FrameListenerId(table.next_id);
        table.next_id += 1;
        table.listeners.push((id, listener));
        id
    }

    pub(crate) fn unregister(&self, id: FrameListenerId) {
        let mut table = lock(&self.table);
        let before = table.listeners.len();
        table.listeners.retain(|(existing, _)| *existing != id);
        if table.listeners.len() == before
            && table.in_flight.contains(&id)
            && !table.removed_while_running.contains(&id)
        {
            // Running right now; drop it when it comes back
            table.removed_while_running.push(id);
        }
    }

    /// Invokes every listener. Listeners may register or unregister
    /// listeners (themselves included) while running.
    pub(crate) fn run(&self, frame_time: f32) {
        let mut running = {
            let mut table = lock(&self.table);
            let running = std::mem::take(&mut table.listeners);
            table.in_flight = running.iter().map(|(id, _)| *id).collect();
            running
        };

        for (_, listener) in running.iter_mut() {
            run_isolated("frame listener", || listener(frame_time));
        }

        let mut table = lock(&self.table);
        table.in_flight.clear();
        let removed = std::mem::take(&mut table.removed_while_running);
        running.retain(|(id, _)| !removed.contains(id));
        let added = std::mem::replace(&mut table.listeners, running);
        table.listeners.extend(added);
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.table).listeners.len()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
