use log::debug;
use tokio::task::JoinHandle;

use crate::{conversation, error, reply, user};

use super::model::Message;
use super::{Error, Status};

/// Result of a successful send. `auto_reply` is the background reply task
/// when the conversation is AI-driven; awaiting it is optional and its
/// outcome never changes the send result.
#[derive(Debug)]
pub struct Dispatch {
    pub message: Message,
    pub auto_reply: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Dispatcher {
    message_service: super::Service,
    conversation_service: conversation::Service,
    auto_reply: reply::Service,
}

impl Dispatcher {
    pub fn new(
        message_service: super::Service,
        conversation_service: conversation::Service,
        auto_reply: reply::Service,
    ) -> Self {
        Self {
            message_service,
            conversation_service,
            auto_reply,
        }
    }

    pub async fn send(
        &self,
        conversation_id: &conversation::Id,
        sender: &user::Id,
        text: &str,
    ) -> error::Result<Dispatch> {
        let conversation = self
            .conversation_service
            .find_by_id(conversation_id)
            .await
            .map_err(Error::from)?;

        if !conversation.participant_ids.contains(sender) {
            return Err(Error::NotMember(sender.clone(), conversation_id.clone()).into());
        }

        let message = self
            .message_service
            .post(conversation_id, sender, text, Status::Sent)
            .await?;

        let auto_reply = if self.auto_reply.is_ai_driven(&conversation, sender) {
            debug!("conversation {conversation_id} is AI-driven, requesting a reply");
            let auto_reply = self.auto_reply.clone();
            let last = message.clone();
            Some(tokio::spawn(async move {
                auto_reply.maybe_reply(&conversation, &last).await;
            }))
        } else {
            None
        };

        Ok(Dispatch {
            message,
            auto_reply,
        })
    }
}
