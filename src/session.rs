//! Per-viewer entry points a UI drives.
//!
//! A [`Session`] owns at most one conversation directory subscription and at
//! most one message subscription (the open conversation). Opening another
//! conversation cancels the previous message subscription before the new
//! one starts, so a single callback source writes the message view.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use tokio::sync::Mutex;

use crate::auth::Credential;
use crate::conversation::{self, Conversation, find_private};
use crate::error::{self, Error};
use crate::event::{self, Listener, Subscription};
use crate::message::{Dispatch, Message};
use crate::state::AppState;
use crate::user::{Handle, ProfileUpdate, Resolution, User};

pub struct Session {
    state: AppState,
    viewer: RwLock<User>,
    advisory: Option<Error>,
    conversations: Arc<RwLock<Vec<Conversation>>>,
    directory: Mutex<Option<Subscription>>,
    open: Mutex<Option<(conversation::Id, Subscription)>>,
}

impl Session {
    /// Fails only on a bad credential. An unreachable directory still yields
    /// a session, with the cause kept as [`Session::advisory`].
    pub async fn sign_in(state: &AppState, credential: &Credential) -> error::Result<Self> {
        let resolution = state.user_service.resolve_or_create(credential).await?;
        Ok(Self::start(state.clone(), resolution).await)
    }

    pub async fn sign_up(
        state: &AppState,
        handle: impl Into<Handle>,
        secret: &str,
        name: &str,
    ) -> error::Result<Self> {
        let resolution = state
            .user_service
            .register(&handle.into(), secret, name)
            .await?;
        Ok(Self::start(state.clone(), resolution).await)
    }

    async fn start(state: AppState, resolution: Resolution) -> Self {
        let (mut viewer, advisory) = resolution.into_parts();

        if advisory.is_none() {
            state.user_service.set_presence(&viewer.id, true).await;
            viewer.online = true;
        }
        info!("session started for '{}'", viewer.handle);

        Self {
            state,
            viewer: RwLock::new(viewer),
            advisory,
            conversations: Arc::new(RwLock::new(Vec::new())),
            directory: Mutex::new(None),
            open: Mutex::new(None),
        }
    }

    pub fn viewer(&self) -> User {
        self.viewer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cause of a degraded start, shown as a persistent banner.
    pub fn advisory(&self) -> Option<&Error> {
        self.advisory.as_ref()
    }

    /// Latest directory snapshot seen by this session.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn watch_conversations(&self, listener: Listener<Conversation>) {
        let mut directory = self.directory.lock().await;
        if let Some(previous) = directory.take() {
            previous.cancel();
        }

        let cache = self.conversations.clone();
        let forward = event::listener(move |list: Vec<Conversation>| {
            *cache.write().unwrap_or_else(PoisonError::into_inner) = list.clone();
            listener(list);
        });

        let viewer = self.viewer();
        *directory = Some(self.state.conversation_service.watch(&viewer.id, forward));
    }

    pub async fn open(&self, conversation_id: &conversation::Id, listener: Listener<Message>) {
        let mut open = self.open.lock().await;
        if let Some((previous, subscription)) = open.take() {
            subscription.cancel();
            debug!("closed conversation {previous}");
        }

        let subscription = self.state.message_service.watch(conversation_id, listener);
        *open = Some((conversation_id.clone(), subscription));

        let viewer = self.viewer();
        error::swallow(
            "mark read",
            self.state
                .conversation_service
                .mark_read(conversation_id, &viewer.id)
                .await,
        );
    }

    pub async fn opened(&self) -> Option<conversation::Id> {
        self.open.lock().await.as_ref().map(|(id, _)| id.clone())
    }

    pub async fn send(&self, text: &str) -> error::Result<Dispatch> {
        let conversation_id = self
            .opened()
            .await
            .ok_or_else(|| Error::Delivery("no conversation is open".into()))?;

        let viewer = self.viewer();
        self.state
            .dispatcher
            .send(&conversation_id, &viewer.id, text)
            .await
    }

    /// Reuses an existing private conversation with `target` when the
    /// directory snapshot already has one.
    pub async fn start_conversation(&self, target: &User) -> error::Result<conversation::Id> {
        let viewer = self.viewer();

        let existing = {
            let list = self.conversations.read().unwrap_or_else(PoisonError::into_inner);
            find_private(&list, &viewer.id, &target.id).map(|c| c.id.clone())
        };
        if let Some(id) = existing {
            debug!("reusing conversation {id} with '{}'", target.handle);
            return Ok(id);
        }

        let id = self
            .state
            .conversation_service
            .create_private(&viewer, target)
            .await?;
        Ok(id)
    }

    pub async fn start_persona(&self, target: &User, persona: &str) -> error::Result<conversation::Id> {
        let viewer = self.viewer();
        let id = self
            .state
            .conversation_service
            .create_persona(&viewer, target, persona)
            .await?;
        Ok(id)
    }

    pub async fn start_group(&self, name: &str, members: &[User]) -> error::Result<conversation::Id> {
        let viewer = self.viewer();
        let id = self
            .state
            .conversation_service
            .create_group(&viewer, name, members)
            .await?;

        error::swallow(
            "group notice",
            self.state
                .message_service
                .post_system(&id, &format!("{} created the group", viewer.name))
                .await,
        );
        Ok(id)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> error::Result<()> {
        let id = self.viewer().id;
        self.state.user_service.update_profile(&id, update).await?;

        update
            .sanitized()
            .apply(&mut self.viewer.write().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }

    pub async fn search(&self, query: &str) -> error::Result<Vec<User>> {
        let viewer = self.viewer();
        let users = self.state.user_service.search(query, &viewer.id).await?;
        Ok(users)
    }

    /// Cancels every subscription, then marks the viewer offline. The
    /// presence update never blocks logout.
    pub async fn logout(self) {
        if let Some((_, subscription)) = self.open.lock().await.take() {
            subscription.cancel();
        }
        if let Some(subscription) = self.directory.lock().await.take() {
            subscription.cancel();
        }

        let viewer = self.viewer();
        if self.advisory.is_none() {
            self.state.user_service.set_presence(&viewer.id, false).await;
        }
        info!("session ended for '{}'", viewer.handle);
    }
}
