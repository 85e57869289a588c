use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{integration::store, user};

pub mod model;
pub mod repository;
pub mod service;

pub use model::{Conversation, LastMessage, Participant, find_private, sort_by_activity};

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn repository::ConversationRepository + Send + Sync>;
pub type Service = Arc<dyn service::ConversationService + Send + Sync>;

/// Minimum number of distinct members of a group conversation.
pub const MIN_GROUP_MEMBERS: usize = 3;

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

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Private,
    Group,
}

impl Kind {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("conversation not found: {0}")]
    NotFound(Id),
    #[error("cannot start a conversation with oneself: {0}")]
    SelfReference(user::Id),
    #[error("not enough members: {0}")]
    NotEnoughMembers(usize),
    #[error("missing group name")]
    MissingName,

    #[error(transparent)]
    _Store(#[from] store::Error),
}
