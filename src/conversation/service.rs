use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;

use crate::event::{Listener, Subscription, Topic};
use crate::user::{self, User};

use super::model::{Conversation, LastMessage, sort_by_activity};
use super::{Error, Id, MIN_GROUP_MEMBERS, Repository};

#[async_trait]
pub trait ConversationService {
    /// Every callback carries the viewer's full conversation list, most
    /// recent message first. Store errors arrive as an empty list.
    fn watch(&self, user_id: &user::Id, listener: Listener<Conversation>) -> Subscription;

    /// Does not look for an existing conversation between the pair.
    async fn create_private(&self, a: &User, b: &User) -> super::Result<Id>;

    async fn create_persona(&self, a: &User, bot: &User, persona: &str) -> super::Result<Id>;

    async fn create_group(&self, owner: &User, name: &str, members: &[User]) -> super::Result<Id>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Conversation>;

    async fn find_all(&self, user_id: &user::Id) -> super::Result<Vec<Conversation>>;

    async fn record_activity(&self, id: &Id, msg: &LastMessage) -> super::Result<()>;

    /// Resets the unread counter of one participant.
    async fn mark_read(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;
}

#[derive(Clone)]
pub struct ConversationServiceImpl {
    repo: Repository,
}

impl ConversationServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    async fn create(&self, conversation: Conversation) -> super::Result<Id> {
        self.repo.insert(&conversation).await?;
        debug!(
            "created {} conversation {}",
            conversation.kind.as_str(),
            conversation.id
        );
        Ok(conversation.id)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl ConversationService for ConversationServiceImpl {
    fn watch(&self, user_id: &user::Id, listener: Listener<Conversation>) -> Subscription {
        let stream = self.repo.watch_by_participant(user_id).map(|snapshot| {
            snapshot.map(|mut list| {
                sort_by_activity(&mut list);
                list
            })
        });

        Subscription::spawn(
            Topic::Conversations(user_id.to_string()),
            Box::pin(stream),
            listener,
        )
    }

    async fn create_private(&self, a: &User, b: &User) -> super::Result<Id> {
        if a.id == b.id {
            return Err(Error::SelfReference(a.id.clone()));
        }

        self.create(Conversation::private(a, b, now())).await
    }

    async fn create_persona(&self, a: &User, bot: &User, persona: &str) -> super::Result<Id> {
        if a.id == bot.id {
            return Err(Error::SelfReference(a.id.clone()));
        }

        self.create(Conversation::private(a, bot, now()).with_persona(persona))
            .await
    }

    async fn create_group(&self, owner: &User, name: &str, members: &[User]) -> super::Result<Id> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::MissingName);
        }

        let mut seen = HashSet::new();
        let mut distinct = vec![owner.clone()];
        seen.insert(owner.id.clone());
        for m in members {
            if seen.insert(m.id.clone()) {
                distinct.push(m.clone());
            }
        }

        if distinct.len() < MIN_GROUP_MEMBERS {
            return Err(Error::NotEnoughMembers(distinct.len()));
        }

        self.create(Conversation::group(name, &distinct, now())).await
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Conversation> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    async fn find_all(&self, user_id: &user::Id) -> super::Result<Vec<Conversation>> {
        let mut list = self.repo.find_by_participant(user_id).await?;
        sort_by_activity(&mut list);
        Ok(list)
    }

    async fn record_activity(&self, id: &Id, msg: &LastMessage) -> super::Result<()> {
        self.repo.update_last_message(id, msg).await
    }

    async fn mark_read(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        self.repo.reset_unread(id, user_id).await
    }
}
