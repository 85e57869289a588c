use async_trait::async_trait;

use crate::conversation;
use crate::integration::store::{Direction, MemoryStore, Query, SnapshotStream};

use super::Id;
use super::model::{Message, NewMessage};

#[async_trait]
pub trait MessageRepository {
    /// Appends the message, stamping id and server timestamp.
    async fn insert(&self, msg: &NewMessage<'_>) -> super::Result<Message>;

    async fn find_by_conversation(
        &self,
        conversation_id: &conversation::Id,
    ) -> super::Result<Vec<Message>>;

    /// Live query over one conversation, oldest first.
    fn watch_by_conversation(&self, conversation_id: &conversation::Id)
    -> SnapshotStream<Message>;
}

pub struct MemoryMessageRepository {
    store: MemoryStore,
}

impl MemoryMessageRepository {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

fn messages_path(conversation_id: &conversation::Id) -> String {
    format!("conversations/{conversation_id}/messages")
}

fn by_timestamp() -> Query {
    Query::new().order_by("timestamp", Direction::Asc)
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn insert(&self, msg: &NewMessage<'_>) -> super::Result<Message> {
        let col = self.store.collection(&messages_path(msg.conversation_id));
        let message = msg.stamp(Id::random(), self.store.server_timestamp());

        col.insert(message.id.as_str(), &message).await?;
        Ok(message)
    }

    async fn find_by_conversation(
        &self,
        conversation_id: &conversation::Id,
    ) -> super::Result<Vec<Message>> {
        let messages = self
            .store
            .collection(&messages_path(conversation_id))
            .query(&by_timestamp())
            .await?;
        Ok(messages)
    }

    fn watch_by_conversation(
        &self,
        conversation_id: &conversation::Id,
    ) -> SnapshotStream<Message> {
        self.store
            .collection(&messages_path(conversation_id))
            .watch(by_timestamp())
    }
}
