use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use log::{debug, error};
use tokio::task::JoinHandle;

use crate::integration::store::SnapshotStream;

use super::{Listener, Topic};

/// Handle to a live query. Cancelling (or dropping) it stops all further
/// listener calls and releases the underlying query.
pub struct Subscription {
    topic: Topic,
    active: Arc<Mutex<bool>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Spawns the delivery task. Must be called from within a tokio runtime.
    pub fn spawn<T>(topic: Topic, mut stream: SnapshotStream<T>, listener: Listener<T>) -> Self
    where
        T: Send + 'static,
    {
        let active = Arc::new(Mutex::new(true));
        debug!("subscribing to {topic}");

        let task = {
            let active = active.clone();
            let topic = topic.clone();
            tokio::spawn(async move {
                while let Some(snapshot) = stream.next().await {
                    let snapshot = snapshot.unwrap_or_else(|e| {
                        error!("live query on {topic} failed, delivering empty list: {e}");
                        Vec::new()
                    });

                    // held while the listener runs, so cancel() waits for an
                    // in-flight delivery and nothing is delivered after it
                    let delivered = {
                        let active = active.lock().unwrap_or_else(PoisonError::into_inner);
                        if *active {
                            listener(snapshot);
                        }
                        *active
                    };

                    if !delivered {
                        break;
                    }
                }
                debug!("delivery for {topic} stopped");
            })
        };

        Self {
            topic,
            active,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idempotent. Must not be called from inside this subscription's own
    /// listener.
    pub fn cancel(&self) {
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if !*active {
                return;
            }
            *active = false;
        }

        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }

        debug!("unsubscribed from {}", self.topic);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
