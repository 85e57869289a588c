#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use messenger_sync::auth::service::MemoryAuthService;
use messenger_sync::event::{self, Listener};
use messenger_sync::integration::store::MemoryStore;
use messenger_sync::reply::{self, ReplyGenerator, model::Turn};
use messenger_sync::user::User;
use messenger_sync::{AppState, Session};
use tokio::sync::mpsc;

/// Generator double: answers with a canned reply or fails, counting calls.
#[derive(Default)]
pub struct Scripted {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Scripted {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplyGenerator for Scripted {
    async fn generate(&self, _: &str, _: &[Turn], prompt: &str) -> reply::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(reply::Error::Unavailable("quota exceeded".into()))
        } else {
            Ok(format!("you said {prompt}"))
        }
    }
}

pub fn state_with(generator: Arc<Scripted>) -> AppState {
    AppState::new(
        MemoryStore::new(),
        Arc::new(MemoryAuthService::new()),
        generator,
        "Hey there!",
    )
}

pub async fn sign_up(state: &AppState, handle: &str) -> Session {
    Session::sign_up(state, handle, "secret1", &handle.to_uppercase())
        .await
        .unwrap()
}

pub async fn user(state: &AppState, handle: &str) -> User {
    sign_up(state, handle).await.viewer()
}

pub fn recorder<T: Send + 'static>() -> (Listener<T>, mpsc::UnboundedReceiver<Vec<T>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = event::listener(move |list| {
        let _ = tx.send(list);
    });
    (listener, rx)
}

pub async fn next_matching<T, F>(rx: &mut mpsc::UnboundedReceiver<Vec<T>>, f: F) -> Vec<T>
where
    F: Fn(&[T]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let list = rx.recv().await.expect("channel closed");
            if f(&list) {
                return list;
            }
        }
    })
    .await
    .expect("no matching snapshot")
}

/// Gives spawned delivery tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
