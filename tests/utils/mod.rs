pub mod builders;
pub mod mocks;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use builders::{at, member, message, room, test_config, T0};
#[allow(unused_imports)]
pub use mocks::ScriptedChatApi;

use std::time::Duration;

use roomwatch::event::{Event, EventStream};

/// Waits for the next event; time is paused in these tests so this is instant
#[allow(dead_code)]
pub async fn next_event(events: &mut EventStream) -> Event {
    tokio::time::timeout(Duration::from_secs(600), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream closed")
}

/// Asserts that nothing arrives for `secs` seconds of (paused) time
#[allow(dead_code)]
pub async fn expect_silence(events: &mut EventStream, secs: u64) {
    if let Ok(event) = tokio::time::timeout(Duration::from_secs(secs), events.recv()).await {
        panic!("expected no events, got {:?}", event);
    }
}

/// Renders events as wire lines without payloads, for compact assertions
#[allow(dead_code)]
pub fn heads(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| {
            let line = event.wire_line().expect("event should encode");
            match line.find(" {") {
                Some(index) => line[..index].to_string(),
                None => line,
            }
        })
        .collect()
}
