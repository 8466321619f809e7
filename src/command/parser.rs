use std::str::FromStr;
use thiserror::Error;

use crate::api::RoomId;
use crate::event::ControlAction;

/// One line of command input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join(RoomId),
    Leave(RoomId),
    Send { room_id: RoomId, text: String },
    Control(ControlAction),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unrecognized action: {0}")]
    Unrecognized(String),

    #[error("Invalid room id: {0:?}")]
    InvalidRoom(String),

    #[error("Missing message text")]
    MissingText,
}

/// Splits off the first whitespace-delimited word
fn next_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn parse_room(word: &str) -> Result<RoomId, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidRoom(word.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parses `<action> [roomId] [text]`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let (action, rest) = next_word(line);
        if let Ok(control) = action.parse::<ControlAction>() {
            return Ok(Command::Control(control));
        }

        let (room, text) = next_word(rest);
        match action {
            "join" => Ok(Command::Join(parse_room(room)?)),
            "leave" => Ok(Command::Leave(parse_room(room)?)),
            "send" => {
                let room_id = parse_room(room)?;
                if text.is_empty() {
                    return Err(CommandError::MissingText);
                }
                Ok(Command::Send {
                    room_id,
                    text: text.to_string(),
                })
            }
            other => Err(CommandError::Unrecognized(other.to_string())),
        }
    }
}
