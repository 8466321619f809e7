// Event stream infrastructure
//
// Watchers and the command dispatcher produce `Event`s into an `EventBus`;
// the `Driver` is the one consumer that prints them and decides when to stop.

// Public API - what other modules can use
pub use bus::{EventBus, EventStream};
pub use driver::{Driver, ShutdownReason};
pub use events::{ControlAction, Domain, Event, FailureKind, WatchFailure};

// Internal modules
mod bus;
mod driver;
mod events;
