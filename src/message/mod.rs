use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{conversation, integration::store, user};

pub mod dispatcher;
pub mod model;
pub mod repository;
pub mod service;

pub use dispatcher::{Dispatch, Dispatcher};
pub use model::{Message, NewMessage};

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn repository::MessageRepository + Send + Sync>;
pub type Service = Arc<dyn service::MessageService + Send + Sync>;

#[derive(Clone, Debug, Deserialize, Serialize, Hash, PartialEq, Eq)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery status. Written once at creation, never transitioned.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Sending,
    Sent,
    Delivered,
    Read,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("message text is empty")]
    EmptyText,
    #[error("{0} is not a participant of conversation {1}")]
    NotMember(user::Id, conversation::Id),

    #[error(transparent)]
    _Conversation(#[from] conversation::Error),
    #[error(transparent)]
    _Store(#[from] store::Error),
}
