// Remote chat service access
//
// The watchers only see the `ChatApi` trait; `TfsChatApi` is the production
// implementation and all its requests pass through one `RequestGate`.

// Public API - what other modules can use
pub use client::ChatApi;
pub use gate::{Credentials, RequestGate};
pub use models::{Account, Message, MessageId, Room, RoomId, RoomMembership, User, UserId};
pub use rest::TfsChatApi;

// Internal modules
mod client;
mod gate;
pub mod models;
mod rest;
