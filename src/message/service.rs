use async_trait::async_trait;
use log::{debug, warn};

use crate::conversation::{self, LastMessage};
use crate::event::{Listener, Subscription, Topic};
use crate::user;

use super::model::{Message, NewMessage, SYSTEM_SENDER};
use super::{Error, Repository, Status};

#[async_trait]
pub trait MessageService {
    /// Every callback carries the full message list of the conversation in
    /// timestamp order. Store errors arrive as an empty list.
    fn watch(&self, conversation_id: &conversation::Id, listener: Listener<Message>)
    -> Subscription;

    async fn find_all(&self, conversation_id: &conversation::Id) -> super::Result<Vec<Message>>;

    /// Persists the message, then points the conversation summary at it. A
    /// failed summary update is reported but the message is kept.
    async fn post(
        &self,
        conversation_id: &conversation::Id,
        sender: &user::Id,
        text: &str,
        status: Status,
    ) -> super::Result<Message>;

    async fn post_system(
        &self,
        conversation_id: &conversation::Id,
        text: &str,
    ) -> super::Result<Message>;
}

#[derive(Clone)]
pub struct MessageServiceImpl {
    repo: Repository,
    conversation_service: conversation::Service,
}

impl MessageServiceImpl {
    pub fn new(repo: Repository, conversation_service: conversation::Service) -> Self {
        Self {
            repo,
            conversation_service,
        }
    }

    async fn append(&self, new: NewMessage<'_>) -> super::Result<Message> {
        if new.text.trim().is_empty() {
            return Err(Error::EmptyText);
        }

        let msg = self.repo.insert(&new).await?;
        debug!("message {} appended to {}", msg.id, msg.conversation_id);

        if let Err(e) = self
            .conversation_service
            .record_activity(&msg.conversation_id, &LastMessage::from(&msg))
            .await
        {
            warn!(
                "message {} kept but summary of {} not updated: {e}",
                msg.id, msg.conversation_id
            );
            return Err(e.into());
        }

        Ok(msg)
    }
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    fn watch(
        &self,
        conversation_id: &conversation::Id,
        listener: Listener<Message>,
    ) -> Subscription {
        Subscription::spawn(
            Topic::Messages(conversation_id.to_string()),
            self.repo.watch_by_conversation(conversation_id),
            listener,
        )
    }

    async fn find_all(&self, conversation_id: &conversation::Id) -> super::Result<Vec<Message>> {
        self.repo.find_by_conversation(conversation_id).await
    }

    async fn post(
        &self,
        conversation_id: &conversation::Id,
        sender: &user::Id,
        text: &str,
        status: Status,
    ) -> super::Result<Message> {
        self.append(NewMessage::new(conversation_id, sender, text, status))
            .await
    }

    async fn post_system(
        &self,
        conversation_id: &conversation::Id,
        text: &str,
    ) -> super::Result<Message> {
        let sender = user::Id::from(SYSTEM_SENDER);
        let new = NewMessage {
            system: true,
            ..NewMessage::new(conversation_id, &sender, text, Status::Delivered)
        };
        self.append(new).await
    }
}
