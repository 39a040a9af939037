//=========================================================================
// Event Collector
//=========================================================================
//
// Host event collector with bounded polling and shutdown detection.
//
// Architecture:
//   Receiver<HostEvent> → collect_frame() → controller events → TickControl
//
// Bounded polling keeps a flood of tracking updates from starving the
// frame. The render loop paces itself, so an empty queue never sleeps.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::warn;

//=== Internal Dependencies ===============================================

use super::HostEvent;
use crate::core::input::ControllerEvent;

//=== TickControl =========================================================

/// Render loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickControl {
    Continue,
    Exit,
}

//=== EventCollector ======================================================

/// Collects host events with bounded polling.
pub(crate) struct EventCollector {
    receiver: Receiver<HostEvent>,
    events: Vec<ControllerEvent>,
}

impl EventCollector {
    const MAX_EVENTS_PER_FRAME: usize = 100;

    pub(crate) fn new(receiver: Receiver<HostEvent>) -> Self {
        Self {
            receiver,
            events: Vec::with_capacity(16),
        }
    }

    /// Collects pending host events (bounded to prevent starvation).
    pub(crate) fn collect_frame(&mut self) -> TickControl {
        self.events.clear();
        let mut drained = 0;

        while drained < Self::MAX_EVENTS_PER_FRAME {
            match self.receiver.try_recv() {
                Ok(HostEvent::Controller(batch)) => {
                    self.events.extend(batch);
                    drained += 1;
                }
                Ok(HostEvent::Shutdown) => return TickControl::Exit,
                Err(TryRecvError::Disconnected) => return TickControl::Exit,
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= Self::MAX_EVENTS_PER_FRAME {
            warn!("Host event backlog: drained {} batches this frame", drained);
        }

        TickControl::Continue
    }

    /// Controller events collected this frame, in arrival order.
    pub(crate) fn events(&self) -> &[ControllerEvent] {
        &self.events
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::ControllerId;
    use crossbeam_channel::unbounded;

    fn down(id: u32) -> ControllerEvent {
        ControllerEvent::ButtonDown { id: ControllerId(id) }
    }

    #[test]
    fn collect_handles_empty_queue() {
        let (_tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx);

        assert_eq!(collector.collect_frame(), TickControl::Continue);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn collect_flattens_batches_in_order() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        tx.send(HostEvent::Controller(vec![down(1), down(2)])).unwrap();
        tx.send(HostEvent::Controller(vec![down(3)])).unwrap();

        assert_eq!(collector.collect_frame(), TickControl::Continue);
        assert_eq!(collector.events(), &[down(1), down(2), down(3)]);

        collector.collect_frame();
        assert!(collector.events().is_empty());
    }

    #[test]
    fn collect_returns_exit_on_shutdown() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        tx.send(HostEvent::Shutdown).unwrap();

        assert_eq!(collector.collect_frame(), TickControl::Exit);
    }

    #[test]
    fn collect_is_bounded_per_frame() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        for i in 0..150 {
            tx.send(HostEvent::Controller(vec![down(i)])).unwrap();
        }

        collector.collect_frame();
        assert_eq!(collector.events().len(), 100);
        collector.collect_frame();
        assert_eq!(collector.events().len(), 50);
    }

    #[test]
    fn collect_returns_exit_on_disconnect() {
        let (tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx);

        drop(tx);

        assert_eq!(collector.collect_frame(), TickControl::Exit);
    }
}
