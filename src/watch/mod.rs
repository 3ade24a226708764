//! Background watchers fed by the event classifier.
//!
//! - [`TemperatureWatcher`]: announces heaters reaching their targets while idle
//! - [`ReconnectWatcher`]: follows the firmware back up after a disconnect

mod reconnect;
mod temperature;

pub use reconnect::{ReconnectOutcome, ReconnectWatcher, RECONNECTION_POLL, RECONNECTION_TIMEOUT};
pub use temperature::{
    TemperatureHandle, TemperatureTracker, TemperatureWatcher, TEMPERATURE_POLL,
};
