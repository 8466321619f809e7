// Watcher hierarchy
//
// One `RoomWatcher` per process supervises a `RoomUserWatcher` and a
// `RoomMessageWatcher` for every known room. Each runs on its own task and
// talks to its parent only through an `EventBus`.

// Public API - what other modules can use
pub use backoff::{Backoff, PollSchedule};
pub use config::{PollConfig, WatchConfig};
pub use handle::WatcherHandle;
pub use message_watcher::{MessageLog, RoomMessageWatcher};
pub use poller::{run_poller, RoomPoller};
pub use room_watcher::RoomWatcher;
pub use user_watcher::{MembershipTracker, RoomUserWatcher};

// Internal modules
mod backoff;
mod config;
mod handle;
mod message_watcher;
mod poller;
mod room_watcher;
mod user_watcher;
