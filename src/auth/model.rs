use serde::{Deserialize, Serialize};

use crate::user;

/// Session identity handed out by the credential store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: user::Id,
    pub handle: user::Handle,
    pub name: String,
    pub picture: Option<String>,
}

/// Out-of-band login result from a social provider.
#[derive(Clone, Debug, PartialEq)]
pub struct SocialProfile {
    pub provider: String,
    pub subject: String,
    pub handle: user::Handle,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Credential {
    Password { handle: user::Handle, secret: String },
    Social(SocialProfile),
}

impl Credential {
    pub fn password(handle: impl Into<user::Handle>, secret: impl Into<String>) -> Self {
        Self::Password {
            handle: handle.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Clone)]
pub(super) struct Account {
    pub identity: Identity,
    pub salt: String,
    pub digest: Vec<u8>,
}
