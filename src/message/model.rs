use serde::{Deserialize, Serialize};

use crate::conversation::{self, LastMessage};
use crate::user;

use super::{Id, Status};

/// Sender recorded on system entries.
pub const SYSTEM_SENDER: &str = "system";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub conversation_id: conversation::Id,
    pub sender: user::Id,
    pub text: String,
    pub timestamp: i64,
    pub status: Status,
    #[serde(default)]
    pub system: bool,
}

impl From<&Message> for LastMessage {
    fn from(m: &Message) -> Self {
        Self {
            text: m.text.clone(),
            sender: m.sender.clone(),
            timestamp: m.timestamp,
        }
    }
}

/// A message before the store has stamped it.
#[derive(Clone, Debug)]
pub struct NewMessage<'a> {
    pub conversation_id: &'a conversation::Id,
    pub sender: &'a user::Id,
    pub text: &'a str,
    pub status: Status,
    pub system: bool,
}

impl<'a> NewMessage<'a> {
    pub fn new(
        conversation_id: &'a conversation::Id,
        sender: &'a user::Id,
        text: &'a str,
        status: Status,
    ) -> Self {
        Self {
            conversation_id,
            sender,
            text,
            status,
            system: false,
        }
    }

    pub fn stamp(&self, id: Id, timestamp: i64) -> Message {
        Message {
            id,
            conversation_id: self.conversation_id.clone(),
            sender: self.sender.clone(),
            text: self.text.to_owned(),
            timestamp,
            status: self.status,
            system: self.system,
        }
    }
}
