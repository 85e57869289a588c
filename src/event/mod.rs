//! Live snapshot delivery.
//!
//! A [`Subscription`] drives a store live query on its own task and hands
//! every snapshot to a registered listener. Store errors are logged and
//! replaced by an empty snapshot, so listeners only ever see lists.

use std::fmt::Display;
use std::sync::Arc;

pub mod subscription;

pub use subscription::Subscription;

/// Full-replacement listener: every call carries the complete current list.
pub type Listener<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

pub fn listener<T, F>(f: F) -> Listener<T>
where
    F: Fn(Vec<T>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a live query is scoped to, used for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topic {
    Conversations(String),
    Messages(String),
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Conversations(user_id) => write!(f, "conversations.{user_id}"),
            Topic::Messages(conversation_id) => write!(f, "messages.{conversation_id}"),
        }
    }
}
