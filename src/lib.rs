// Library crate for the room watcher
// This file exposes the public API for the binary and integration tests

pub mod api;
pub mod command;
pub mod config;
pub mod event;
pub mod shared;
pub mod watch;

// Re-export commonly used types for easier access in tests
pub use api::{ChatApi, RequestGate, TfsChatApi};
pub use command::CommandDispatcher;
pub use event::{Driver, Event, EventBus, ShutdownReason};
pub use shared::AppError;
pub use watch::{RoomWatcher, WatchConfig};
