use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::user;

use super::model::{Account, Identity, SocialProfile};
use super::{Error, MIN_SECRET_LEN};

#[async_trait]
pub trait AuthService {
    async fn sign_in(&self, handle: &user::Handle, secret: &str) -> super::Result<Identity>;

    async fn sign_up(
        &self,
        handle: &user::Handle,
        secret: &str,
        name: &str,
    ) -> super::Result<Identity>;

    async fn sign_in_social(&self, profile: &SocialProfile) -> super::Result<Identity>;
}

/// Credential store kept in process memory. Handles are matched
/// case-insensitively across password and social identities, secrets are
/// kept as salted SHA-256 digests.
#[derive(Clone, Default)]
pub struct MemoryAuthService {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    social: Arc<RwLock<HashMap<(String, String), Identity>>>,
}

impl MemoryAuthService {
    pub fn new() -> Self {
        Self::default()
    }
}

fn digest(salt: &str, secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn sign_in(&self, handle: &user::Handle, secret: &str) -> super::Result<Identity> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&handle.normalized())
            .ok_or(Error::InvalidCredentials)?;

        if digest(&account.salt, secret) != account.digest {
            debug!("wrong secret for '{handle}'");
            return Err(Error::InvalidCredentials);
        }

        Ok(account.identity.clone())
    }

    async fn sign_up(
        &self,
        handle: &user::Handle,
        secret: &str,
        name: &str,
    ) -> super::Result<Identity> {
        if handle.as_str().trim().is_empty() {
            return Err(Error::InvalidHandle);
        }
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(Error::WeakSecret(MIN_SECRET_LEN));
        }

        let mut accounts = self.accounts.write().await;
        let social = self.social.read().await;
        let key = handle.normalized();
        if is_taken(&accounts, &social, &key) {
            return Err(Error::HandleInUse(handle.to_string()));
        }

        let name = match name.trim() {
            "" => handle.to_string(),
            n => n.to_owned(),
        };
        let identity = Identity {
            uid: user::Id::random(),
            handle: handle.clone(),
            name,
            picture: None,
        };
        let salt = Uuid::new_v4().to_string();
        let account = Account {
            identity: identity.clone(),
            digest: digest(&salt, secret),
            salt,
        };

        accounts.insert(key, account);
        debug!("registered '{handle}' as {}", identity.uid);

        Ok(identity)
    }

    async fn sign_in_social(&self, profile: &SocialProfile) -> super::Result<Identity> {
        let key = (profile.provider.clone(), profile.subject.clone());
        let accounts = self.accounts.read().await;
        let mut social = self.social.write().await;

        if let Some(identity) = social.get(&key) {
            return Ok(identity.clone());
        }

        let handle = profile.handle.normalized();
        if handle.is_empty() {
            return Err(Error::InvalidHandle);
        }
        if is_taken(&accounts, &social, &handle) {
            debug!("social handle '{}' collides with an existing one", profile.handle);
            return Err(Error::HandleInUse(profile.handle.to_string()));
        }

        let identity = Identity {
            uid: user::Id::random(),
            handle: profile.handle.clone(),
            name: profile.name.clone(),
            picture: profile.picture.clone(),
        };
        social.insert(key, identity.clone());
        debug!("registered social '{}' as {}", profile.handle, identity.uid);

        Ok(identity)
    }
}

/// Handles are unique across password and social identities.
fn is_taken(
    accounts: &HashMap<String, Account>,
    social: &HashMap<(String, String), Identity>,
    normalized: &str,
) -> bool {
    accounts.contains_key(normalized)
        || social
            .values()
            .any(|identity| identity.handle.normalized() == normalized)
}
