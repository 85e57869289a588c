use async_trait::async_trait;
use log::{debug, info};

use crate::conversation::Conversation;
use crate::message::{self, Message, Status};
use crate::{error, user};

use super::Generator;
use super::model::{self, Turn};

#[async_trait]
pub trait AutoReply {
    fn is_ai_driven(&self, conversation: &Conversation, sender: &user::Id) -> bool;

    /// Best-effort: every failure is logged and no message is produced.
    async fn maybe_reply(&self, conversation: &Conversation, last_user_message: &Message);
}

#[derive(Clone)]
pub struct AutoReplyImpl {
    message_service: message::Service,
    generator: Generator,
}

impl AutoReplyImpl {
    pub fn new(message_service: message::Service, generator: Generator) -> Self {
        Self {
            message_service,
            generator,
        }
    }
}

#[async_trait]
impl AutoReply for AutoReplyImpl {
    fn is_ai_driven(&self, conversation: &Conversation, sender: &user::Id) -> bool {
        model::is_ai_driven(conversation, sender)
    }

    async fn maybe_reply(&self, conversation: &Conversation, last_user_message: &Message) {
        if !self.is_ai_driven(conversation, &last_user_message.sender) {
            return;
        }

        let Some(counterpart) = conversation.counterpart(&last_user_message.sender) else {
            debug!(
                "no single counterpart in {}, skipping auto-reply",
                conversation.id
            );
            return;
        };

        let instruction = model::instruction(conversation.persona.as_deref(), &counterpart.name);
        let history: &[Turn] = &[];

        let Some(text) = error::swallow(
            "auto-reply generation",
            self.generator
                .generate(&instruction, history, &last_user_message.text)
                .await,
        ) else {
            return;
        };

        if let Some(reply) = error::swallow(
            "auto-reply delivery",
            self.message_service
                .post(&conversation.id, &counterpart.id, &text, Status::Delivered)
                .await,
        ) {
            info!("{} replied in {}", counterpart.handle, reply.conversation_id);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use crate::auth::Identity;
    use crate::conversation::repository::MemoryConversationRepository;
    use crate::conversation::service::{ConversationService, ConversationServiceImpl};
    use crate::integration::store::MemoryStore;
    use crate::message::repository::MemoryMessageRepository;
    use crate::message::service::{MessageService, MessageServiceImpl};
    use crate::reply::{self, ReplyGenerator};
    use crate::user::User;

    use super::*;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ReplyGenerator for Recording {
        async fn generate(
            &self,
            instruction: &str,
            history: &[Turn],
            prompt: &str,
        ) -> reply::Result<String> {
            assert!(history.is_empty());
            self.calls
                .lock()
                .unwrap()
                .push((instruction.to_owned(), prompt.to_owned()));

            if self.fail {
                Err(reply::Error::Unavailable("quota exceeded".into()))
            } else {
                Ok(format!("re: {prompt}"))
            }
        }
    }

    fn user(id: &str, handle: &str) -> User {
        User::from_identity(
            &Identity {
                uid: user::Id::from(id),
                handle: user::Handle::from(handle),
                name: handle.to_uppercase(),
                picture: None,
            },
            "",
        )
    }

    struct Fixture {
        conversations: Arc<ConversationServiceImpl>,
        messages: message::Service,
        generator: Arc<Recording>,
        auto_reply: AutoReplyImpl,
    }

    fn fixture(fail: bool) -> Fixture {
        let store = MemoryStore::new();
        let conversations = Arc::new(ConversationServiceImpl::new(Arc::new(
            MemoryConversationRepository::new(&store),
        )));
        let messages: message::Service = Arc::new(MessageServiceImpl::new(
            Arc::new(MemoryMessageRepository::new(&store)),
            conversations.clone(),
        ));
        let generator = Arc::new(Recording {
            fail,
            ..Recording::default()
        });
        let auto_reply = AutoReplyImpl::new(messages.clone(), generator.clone());
        Fixture {
            conversations,
            messages,
            generator,
            auto_reply,
        }
    }

    #[tokio::test]
    async fn should_reply_as_counterpart_with_delivered_status() {
        let f = fixture(false);
        let (me, bot) = (user("u1", "jora"), user("b1", "geminibot"));
        let id = f.conversations.create_private(&me, &bot).await.unwrap();
        let conversation = f.conversations.find_by_id(&id).await.unwrap();
        let msg = f.messages.post(&id, &me.id, "hi", Status::Sent).await.unwrap();

        f.auto_reply.maybe_reply(&conversation, &msg).await;

        let list = f.messages.find_all(&id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].sender, bot.id);
        assert_eq!(list[1].text, "re: hi");
        assert_eq!(list[1].status, Status::Delivered);

        let calls = f.generator.calls.lock().unwrap();
        assert!(calls[0].0.starts_with("You are GEMINIBOT,"));
        assert_eq!(calls[0].1, "hi");
    }

    #[tokio::test]
    async fn should_use_persona_prompt() {
        let f = fixture(false);
        let (me, friend) = (user("u1", "jora"), user("u2", "valera"));
        let id = f
            .conversations
            .create_persona(&me, &friend, "You are Valera, a grumpy sailor.")
            .await
            .unwrap();
        let conversation = f.conversations.find_by_id(&id).await.unwrap();
        let msg = f.messages.post(&id, &me.id, "ahoy", Status::Sent).await.unwrap();

        f.auto_reply.maybe_reply(&conversation, &msg).await;

        let calls = f.generator.calls.lock().unwrap();
        assert!(calls[0].0.starts_with("You are Valera, a grumpy sailor."));
    }

    #[tokio::test]
    async fn should_produce_nothing_when_generation_fails() {
        let f = fixture(true);
        let (me, bot) = (user("u1", "jora"), user("b1", "geminibot"));
        let id = f.conversations.create_private(&me, &bot).await.unwrap();
        let conversation = f.conversations.find_by_id(&id).await.unwrap();
        let msg = f.messages.post(&id, &me.id, "hi", Status::Sent).await.unwrap();

        f.auto_reply.maybe_reply(&conversation, &msg).await;

        assert_eq!(f.generator.calls.lock().unwrap().len(), 1);
        assert_eq!(f.messages.find_all(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_not_call_generator_for_human_conversation() {
        let f = fixture(false);
        let (me, friend) = (user("u1", "jora"), user("u2", "valera"));
        let id = f.conversations.create_private(&me, &friend).await.unwrap();
        let conversation = f.conversations.find_by_id(&id).await.unwrap();
        let msg = f.messages.post(&id, &me.id, "hi", Status::Sent).await.unwrap();

        f.auto_reply.maybe_reply(&conversation, &msg).await;

        assert!(f.generator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_skip_group_without_counterpart() {
        let f = fixture(false);
        let (a, b, c) = (user("u1", "jora"), user("u2", "valera"), user("b1", "bot"));
        let id = f
            .conversations
            .create_group(&a, "crew", &[b, c])
            .await
            .unwrap();
        let conversation = f.conversations.find_by_id(&id).await.unwrap();
        let msg = f.messages.post(&id, &a.id, "hi", Status::Sent).await.unwrap();

        f.auto_reply.maybe_reply(&conversation, &msg).await;

        assert!(f.generator.calls.lock().unwrap().is_empty());
        assert_eq!(f.messages.find_all(&id).await.unwrap().len(), 1);
    }
}
