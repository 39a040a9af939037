//=========================================================================
// Sensor System
//=========================================================================
//
// Spatial sensors: per-node pick receivers and the dispatcher that walks
// a scene graph with each controller ray.
//
//=========================================================================

//=== Module Declarations =================================================

mod sensor;
mod sensor_manager;

//=== Public API ==========================================================

pub use sensor::{PickedObject, Sensor, SensorDelivery, SensorEvent, SensorEventKind, SensorListener};
pub use sensor_manager::{PickPassStats, SensorManager};
