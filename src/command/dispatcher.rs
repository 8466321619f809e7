use std::io::ErrorKind;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::parser::Command;
use crate::api::ChatApi;
use crate::event::{Event, EventBus};
use crate::shared::AppError;

/// Turns command input lines into chat service calls or shutdown requests
pub struct CommandDispatcher {
    api: Arc<dyn ChatApi>,
    events: EventBus,
    shutdown: CancellationToken,
}

impl CommandDispatcher {
    pub fn new(api: Arc<dyn ChatApi>, events: EventBus, shutdown: CancellationToken) -> Self {
        Self {
            api,
            events,
            shutdown,
        }
    }

    /// Reads lines until a control command, shutdown, or the end of `input`.
    ///
    /// The input ending or failing stops only the dispatcher.
    pub async fn run<R>(self, input: R)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            let line = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    if self.dispatch(&line).await.is_break() {
                        return;
                    }
                }
                Ok(None) => {
                    info!("Command input closed");
                    return;
                }
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    warn!(error = %e, "Skipping unreadable command line");
                }
                Err(e) => {
                    error!(error = %e, "Command input failed");
                    return;
                }
            }
        }
    }

    /// Handles one line. Breaks once a control command has been forwarded.
    pub async fn dispatch(&self, line: &str) -> ControlFlow<()> {
        if line.trim().is_empty() {
            return ControlFlow::Continue(());
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!(line = %line, error = %e, "Ignoring command");
                return ControlFlow::Continue(());
            }
        };

        if let Command::Control(action) = command {
            debug!(action = action.as_str(), "Forwarding control command");
            self.events.emit(Event::Interface { action }).await;
            return ControlFlow::Break(());
        }

        match self.execute(&command).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => error!(command = ?command, error = %e, "Command rejected"),
            Err(e) => warn!(command = ?command, error = %e, "Command failed"),
        }
        ControlFlow::Continue(())
    }

    async fn execute(&self, command: &Command) -> Result<(), AppError> {
        match command {
            Command::Join(room_id) => self.api.join_room(*room_id).await,
            Command::Leave(room_id) => self.api.leave_room(*room_id).await,
            Command::Send { room_id, text } => self.api.post_message(*room_id, text).await,
            Command::Control(_) => Ok(()),
        }?;

        info!(command = ?command, "Command executed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Account, Message, Room, RoomId, RoomMembership};
    use crate::event::ControlAction;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Records data-plane calls; listing is never used by the dispatcher
    struct RecordingApi {
        account: Account,
        calls: Mutex<Vec<String>>,
        fail_joins: bool,
    }

    impl RecordingApi {
        fn new(fail_joins: bool) -> Arc<Self> {
            Arc::new(Self {
                account: Account {
                    user_id: "u-me".to_string(),
                    login_user: "me".to_string(),
                },
                calls: Mutex::new(Vec::new()),
                fail_joins,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatApi for RecordingApi {
        fn account(&self) -> &Account {
            &self.account
        }
        async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
            Ok(Vec::new())
        }
        async fn list_room_users(&self, _room_id: RoomId) -> Result<Vec<RoomMembership>, AppError> {
            Ok(Vec::new())
        }
        async fn list_room_messages(
            &self,
            _room_id: RoomId,
            _since: DateTime<Utc>,
        ) -> Result<Vec<Message>, AppError> {
            Ok(Vec::new())
        }
        async fn join_room(&self, room_id: RoomId) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(format!("join {}", room_id));
            if self.fail_joins {
                return Err(AppError::Request("503".to_string()));
            }
            Ok(())
        }
        async fn leave_room(&self, room_id: RoomId) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(format!("leave {}", room_id));
            Ok(())
        }
        async fn post_message(&self, room_id: RoomId, text: &str) -> Result<(), AppError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("send {} {}", room_id, text));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_executes_lines_until_control_command() {
        let api = RecordingApi::new(false);
        let (bus, mut events) = EventBus::channel(8);
        let dispatcher = CommandDispatcher::new(api.clone(), bus, CancellationToken::new());

        let input: &[u8] = b"join 4\nbogus\nsend 4 hi all\nleave x\nquit\njoin 9\n";
        dispatcher.run(input).await;

        assert_eq!(api.calls(), vec!["join 4", "send 4 hi all"]);
        assert_eq!(
            events.recv().await,
            Some(Event::Interface {
                action: ControlAction::Quit
            })
        );
    }

    #[tokio::test]
    async fn test_failed_command_is_not_fatal() {
        let api = RecordingApi::new(true);
        let (bus, mut events) = EventBus::channel(8);
        let dispatcher = CommandDispatcher::new(api.clone(), bus, CancellationToken::new());

        assert!(dispatcher.dispatch("join 1").await.is_continue());
        assert!(dispatcher.dispatch("leave 1").await.is_continue());

        assert_eq!(api.calls(), vec!["join 1", "leave 1"]);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_of_input_emits_nothing() {
        let api = RecordingApi::new(false);
        let (bus, mut events) = EventBus::channel(8);
        let dispatcher = CommandDispatcher::new(api.clone(), bus, CancellationToken::new());

        dispatcher.run(&b"join 2\n"[..]).await;

        assert_eq!(api.calls(), vec!["join 2"]);
        // The dispatcher dropped its bus handle without a control event
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_stops_reading() {
        let api = RecordingApi::new(false);
        let (bus, _events) = EventBus::channel(8);
        let shutdown = CancellationToken::new();
        let dispatcher = CommandDispatcher::new(api.clone(), bus, shutdown.clone());

        // A reader that never yields a line
        let (_writer, reader) = tokio::io::duplex(64);
        let task = tokio::spawn(dispatcher.run(tokio::io::BufReader::new(reader)));

        shutdown.cancel();
        task.await.unwrap();
        assert!(api.calls().is_empty());
    }
}
