use async_trait::async_trait;

use crate::integration::store::{Collection, Direction, Filter, MemoryStore, Query, SnapshotStream};
use crate::user;

use super::Id;
use super::model::{Conversation, LastMessage};

const CONVERSATIONS_COLLECTION: &str = "conversations";

#[async_trait]
pub trait ConversationRepository {
    async fn insert(&self, conversation: &Conversation) -> super::Result<()>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Option<Conversation>>;

    async fn find_by_participant(&self, user_id: &user::Id) -> super::Result<Vec<Conversation>>;

    /// Live query over the participant's conversations, most recent activity
    /// first.
    fn watch_by_participant(&self, user_id: &user::Id) -> SnapshotStream<Conversation>;

    async fn update_last_message(&self, id: &Id, msg: &LastMessage) -> super::Result<()>;

    async fn reset_unread(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;
}

pub struct MemoryConversationRepository {
    col: Collection,
}

impl MemoryConversationRepository {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            col: store.collection(CONVERSATIONS_COLLECTION),
        }
    }
}

fn by_participant(user_id: &user::Id) -> Query {
    Query::new()
        .filter(Filter::contains("participant_ids", user_id))
        .order_by("updated_at", Direction::Desc)
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepository {
    async fn insert(&self, conversation: &Conversation) -> super::Result<()> {
        self.col
            .insert(conversation.id.as_str(), conversation)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Option<Conversation>> {
        let conversation = self.col.get::<Conversation>(id.as_str()).await?;
        Ok(conversation)
    }

    async fn find_by_participant(&self, user_id: &user::Id) -> super::Result<Vec<Conversation>> {
        let conversations = self.col.query(&by_participant(user_id)).await?;
        Ok(conversations)
    }

    fn watch_by_participant(&self, user_id: &user::Id) -> SnapshotStream<Conversation> {
        self.col.watch(by_participant(user_id))
    }

    async fn update_last_message(&self, id: &Id, msg: &LastMessage) -> super::Result<()> {
        self.col
            .update::<Conversation, _>(id.as_str(), |c| c.record(msg))
            .await?;
        Ok(())
    }

    async fn reset_unread(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        self.col
            .update::<Conversation, _>(id.as_str(), |c| {
                c.unread.remove(user_id);
            })
            .await?;
        Ok(())
    }
}
