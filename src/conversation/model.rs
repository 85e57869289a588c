use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::user::{self, User};

use super::{Id, Kind};

/// Embedded copy of a participant, enough to render the conversation list
/// without looking the user up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: user::Id,
    pub handle: user::Handle,
    pub name: String,
    pub avatar: String,
}

impl From<&User> for Participant {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            handle: u.handle.clone(),
            name: u.name.clone(),
            avatar: u.avatar.clone(),
        }
    }
}

/// Denormalized copy of the newest message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender: user::Id,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Id,
    pub kind: Kind,
    pub participant_ids: Vec<user::Id>,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    /// Unread messages per participant, absent means zero.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unread: BTreeMap<user::Id, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<user::Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub updated_at: i64,
}

impl Conversation {
    pub fn private(a: &User, b: &User, now: i64) -> Self {
        Self {
            id: Id::random(),
            kind: Kind::Private,
            participant_ids: vec![a.id.clone(), b.id.clone()],
            participants: vec![a.into(), b.into()],
            last_message: None,
            unread: BTreeMap::new(),
            created_by: Some(a.id.clone()),
            persona: None,
            name: None,
            updated_at: now,
        }
    }

    pub fn group(name: &str, members: &[User], now: i64) -> Self {
        Self {
            id: Id::random(),
            kind: Kind::Group,
            participant_ids: members.iter().map(|m| m.id.clone()).collect(),
            participants: members.iter().map(Participant::from).collect(),
            last_message: None,
            unread: BTreeMap::new(),
            created_by: members.first().map(|m| m.id.clone()),
            persona: None,
            name: Some(name.to_owned()),
            updated_at: now,
        }
    }

    pub fn with_persona(self, persona: impl Into<String>) -> Self {
        Self {
            persona: Some(persona.into()),
            ..self
        }
    }

    pub fn has_persona(&self) -> bool {
        self.persona.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    pub fn is_created_by(&self, user_id: &user::Id) -> bool {
        self.created_by.as_ref() == Some(user_id)
    }

    pub fn unread_for(&self, user_id: &user::Id) -> u32 {
        self.unread.get(user_id).copied().unwrap_or(0)
    }

    /// Summary and unread bookkeeping for a newly stored message. An older
    /// message never replaces a newer summary.
    pub fn record(&mut self, msg: &LastMessage) {
        if self
            .last_message
            .as_ref()
            .is_none_or(|last| msg.timestamp >= last.timestamp)
        {
            self.last_message = Some(msg.clone());
        }
        self.updated_at = self.updated_at.max(msg.timestamp);

        for id in self.participant_ids.iter().filter(|id| **id != msg.sender) {
            let count = self.unread.entry(id.clone()).or_default();
            *count = count.saturating_add(1);
        }
    }

    /// The other side of a private conversation.
    pub fn counterpart(&self, me: &user::Id) -> Option<&Participant> {
        match self.kind {
            Kind::Private => self.participants.iter().find(|p| p.id.ne(me)),
            Kind::Group => None,
        }
    }

    pub fn is_private_between(&self, a: &user::Id, b: &user::Id) -> bool {
        self.kind == Kind::Private
            && self.participant_ids.len() == 2
            && self.participant_ids.contains(a)
            && self.participant_ids.contains(b)
    }

    /// Newest message timestamp, zero when there is none.
    pub fn activity(&self) -> i64 {
        self.last_message.as_ref().map_or(0, |m| m.timestamp)
    }

    pub fn title(&self, viewer: &user::Id) -> String {
        match (&self.name, self.counterpart(viewer)) {
            (Some(name), _) => name.clone(),
            (None, Some(p)) => p.name.clone(),
            (None, None) => String::new(),
        }
    }
}

/// UI-facing order: most recent message first, stable for equal timestamps.
pub fn sort_by_activity(list: &mut [Conversation]) {
    list.sort_by_key(|c| std::cmp::Reverse(c.activity()));
}

/// Caller-side duplicate detection for private conversations.
pub fn find_private<'a>(
    list: &'a [Conversation],
    a: &user::Id,
    b: &user::Id,
) -> Option<&'a Conversation> {
    list.iter().find(|c| c.is_private_between(a, b))
}
