use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error;

use super::{Handle, Id};

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub handle: Handle,
    pub name: String,
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
}

impl User {
    /// Fresh identity record for a first successful sign-in.
    pub fn from_identity(identity: &Identity, about: &str) -> Self {
        Self {
            id: identity.uid.clone(),
            handle: identity.handle.clone(),
            name: identity.name.clone(),
            avatar: identity
                .picture
                .clone()
                .unwrap_or_else(|| avatar_for(&identity.handle)),
            about: Some(about.to_owned()),
            online: true,
            last_seen: None,
        }
    }
}

pub fn avatar_for(handle: &Handle) -> String {
    url::Url::parse_with_params(AVATAR_BASE_URL, &[("seed", handle.normalized())])
        .map(String::from)
        .unwrap_or_else(|_| AVATAR_BASE_URL.to_owned())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
}

impl ProfileUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn about(about: impl Into<String>) -> Self {
        Self {
            about: Some(about.into()),
            ..Self::default()
        }
    }

    /// Drops blank names; an empty update is a no-op.
    pub fn sanitized(&self) -> Self {
        Self {
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
            about: self.about.as_deref().map(|a| a.trim().to_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.about.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(about) = &self.about {
            user.about = Some(about.clone());
        }
    }
}

/// Outcome of resolving a credential to an identity record. A degraded
/// resolution carries an ephemeral identity the session can still run with.
#[derive(Debug)]
pub enum Resolution {
    Resolved(User),
    Degraded { user: User, cause: error::Error },
}

impl Resolution {
    pub fn user(&self) -> &User {
        match self {
            Resolution::Resolved(user) | Resolution::Degraded { user, .. } => user,
        }
    }

    pub fn advisory(&self) -> Option<&error::Error> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Degraded { cause, .. } => Some(cause),
        }
    }

    pub fn into_parts(self) -> (User, Option<error::Error>) {
        match self {
            Resolution::Resolved(user) => (user, None),
            Resolution::Degraded { user, cause } => (user, Some(cause)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_seed_avatar_with_normalized_handle() {
        let avatar = avatar_for(&Handle::from("Jora Bot"));

        assert_eq!(
            avatar,
            "https://api.dicebear.com/7.x/avataaars/svg?seed=jora+bot"
        );
    }

    #[test]
    fn should_prefer_social_picture() {
        let identity = Identity {
            uid: Id::from("u1"),
            handle: Handle::from("jora"),
            name: "Jora".into(),
            picture: Some("https://example.com/jora.png".into()),
        };

        let user = User::from_identity(&identity, "hi");

        assert_eq!(user.avatar, "https://example.com/jora.png");
        assert_eq!(user.about.as_deref(), Some("hi"));
        assert!(user.online);
    }

    #[test]
    fn should_drop_blank_name_from_update() {
        let update = ProfileUpdate {
            name: Some("   ".into()),
            about: None,
        };

        assert!(update.sanitized().is_empty());
    }

    #[test]
    fn should_apply_only_supplied_fields() {
        let mut user = User::from_identity(
            &Identity {
                uid: Id::from("u1"),
                handle: Handle::from("jora"),
                name: "Jora".into(),
                picture: None,
            },
            "old",
        );

        ProfileUpdate::about("new").apply(&mut user);

        assert_eq!(user.name, "Jora");
        assert_eq!(user.about.as_deref(), Some("new"));
    }
}
