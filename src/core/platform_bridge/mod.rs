//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges the host integration (activity, compositor, tracking runtime)
// with the render thread.
//
// Components:
// - `interface`: Event types sent by the host (the contract)
// - `event_collector`: Render-side event collection and buffering
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub mod interface;

//=== Public API ==========================================================

pub(crate) use event_collector::{EventCollector, TickControl};
pub use interface::HostEvent;
