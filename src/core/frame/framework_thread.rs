//=========================================================================
// Framework Thread
//=========================================================================
//
// Worker thread running application lifecycle hooks.
//
// Application code may block in `on_init` or `on_step`; running it here
// keeps the render thread producing frames. Jobs run in submission order.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{bounded, unbounded, Sender};
use log::{error, info, warn};

//=== Internal Dependencies ===============================================

use super::queues::Job;
use crate::core::sync::{lock, run_isolated};

//=== FrameworkThread =====================================================

enum Message {
    Run(Job),
    Stop,
}

/// Single worker thread with a FIFO job queue.
pub(crate) struct FrameworkThread {
    sender: Sender<Message>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameworkThread {
    pub(crate) fn spawn() -> Self {
        let (sender, receiver) = unbounded::<Message>();

        let handle = thread::spawn(move || {
            for message in receiver.iter() {
                match message {
                    Message::Run(job) => {
                        run_isolated("framework job", job);
                    }
                    Message::Stop => break,
                }
            }
            info!("Framework thread exiting.");
        });

        Self {
            sender,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues `job`.
    pub(crate) fn run(&self, job: Job) {
        if self.sender.send(Message::Run(job)).is_err() {
            warn!("Framework thread stopped; job dropped");
        }
    }

    /// Returns `true` when called from the worker itself.
    pub(crate) fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Blocks until every job queued so far has run.
    ///
    /// Returns immediately when called from the worker itself.
    pub(crate) fn flush(&self) {
        if self.is_current() {
            return;
        }

        let (ack_tx, ack_rx) = bounded(1);
        self.run(Box::new(move || {
            let _ = ack_tx.send(());
        }));
        let _ = ack_rx.recv();
    }

    /// Stops the worker after the jobs already queued.
    pub(crate) fn shutdown(&self) {
        let _ = self.sender.send(Message::Stop);
        if self.is_current() {
            return;
        }

        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                error!("Framework thread panicked");
            }
        }
    }
}

impl Drop for FrameworkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
