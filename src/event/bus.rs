use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::Event;

/// Receiving half of an [`EventBus`]
pub type EventStream = mpsc::Receiver<Event>;

/// Fan-in handle: any number of producers, one consumer
///
/// Producers clone the bus; the single receiver observes one total order of
/// everything they send.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::Sender<Event>,
}

impl EventBus {
    /// Creates a bus with the given buffer size and its consumer end
    pub fn channel(capacity: usize) -> (Self, EventStream) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Sends an event, waiting for buffer space. Returns false once the consumer is gone.
    pub async fn emit(&self, event: Event) -> bool {
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(
                    domain = event.domain().as_str(),
                    action = event.action(),
                    "Event dropped, consumer closed"
                );
                false
            }
        }
    }

    /// Like [`emit`](Self::emit) but gives up when `cancel` fires while waiting
    /// for buffer space, so a stalled consumer cannot block a teardown.
    pub async fn emit_until(&self, event: Event, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = self.emit(event) => sent,
        }
    }
}
