//! In-memory document/event store.
//!
//! Collections are addressed by path (`users`, `conversations`,
//! `conversations/{id}/messages`) and hold JSON documents keyed by id. Every
//! write bumps the collection's change counter, which wakes all live queries
//! on that collection so they can push a fresh full snapshot.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{self, AtomicBool, AtomicI64};
use std::sync::{Arc, Mutex, PoisonError};

use futures::Stream;
use log::debug;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::{RwLock, watch};

pub type Result<T> = std::result::Result<T, Error>;
pub type SnapshotStream<T> = Pin<Box<dyn Stream<Item = Result<Vec<T>>> + Send>>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store is unavailable: {0}")]
    Unavailable(String),
    #[error("document not found: {0}/{1}")]
    NotFound(String, String),
    #[error("document already exists: {0}/{1}")]
    AlreadyExists(String, String),

    #[error(transparent)]
    _Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub enum Filter {
    Eq(String, Value),
    Contains(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Serialize) -> Self {
        Self::Eq(field.into(), serde_json::to_value(value).unwrap_or(Value::Null))
    }

    pub fn contains(field: &str, value: impl Serialize) -> Self {
        Self::Contains(field.into(), serde_json::to_value(value).unwrap_or(Value::Null))
    }

    fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::Eq(field, expected) => lookup(doc, field).is_some_and(|v| v == expected),
            Self::Contains(field, expected) => lookup(doc, field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(expected)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct Sort {
    field: String,
    direction: Direction,
}

#[derive(Clone, Debug, Default)]
pub struct Query {
    filters: Vec<Filter>,
    sorts: Vec<Sort>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.sorts.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn apply(&self, docs: &[(String, Value)]) -> Vec<Value> {
        let mut matched = docs
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| self.filters.iter().all(|f| f.matches(doc)))
            .cloned()
            .collect::<Vec<_>>();

        // stable: ties keep insertion order
        matched.sort_by(|a, b| {
            self.sorts
                .iter()
                .map(|s| {
                    let ord = compare(lookup(a, &s.field), lookup(b, &s.field));
                    match s.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched
    }
}

fn lookup<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(doc, |v, key| v.get(key))
}

fn rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Clone)]
pub struct Collection {
    path: Arc<str>,
    docs: Arc<RwLock<Vec<(String, Value)>>>,
    changes: Arc<watch::Sender<u64>>,
    available: Arc<AtomicBool>,
}

impl Collection {
    fn new(path: &str, available: Arc<AtomicBool>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            path: path.into(),
            docs: Arc::new(RwLock::new(Vec::new())),
            changes: Arc::new(changes),
            available,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn check(&self) -> Result<()> {
        if self.available.load(atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable(self.path.to_string()))
        }
    }

    fn touch(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

impl Collection {
    pub async fn insert<T: Serialize>(&self, id: &str, doc: &T) -> Result<()> {
        self.check()?;
        let value = serde_json::to_value(doc)?;

        {
            let mut docs = self.docs.write().await;
            if docs.iter().any(|(key, _)| key == id) {
                return Err(Error::AlreadyExists(self.path.to_string(), id.into()));
            }
            docs.push((id.to_owned(), value));
        }

        self.touch();
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        self.check()?;
        let docs = self.docs.read().await;

        docs.iter()
            .find(|(key, _)| key == id)
            .map(|(_, doc)| serde_json::from_value(doc.clone()))
            .transpose()
            .map_err(Error::from)
    }

    /// Typed read-modify-write of a single document.
    pub async fn update<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        self.check()?;

        let updated = {
            let mut docs = self.docs.write().await;
            let slot = docs
                .iter_mut()
                .find(|(key, _)| key == id)
                .ok_or_else(|| Error::NotFound(self.path.to_string(), id.into()))?;

            let mut doc: T = serde_json::from_value(slot.1.clone())?;
            f(&mut doc);
            slot.1 = serde_json::to_value(&doc)?;
            doc
        };

        self.touch();
        Ok(updated)
    }

    pub async fn query<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        self.check()?;
        let docs = self.docs.read().await;

        query
            .apply(&docs)
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(Error::from)
    }

    /// Live query: yields the current snapshot, then a fresh one after every
    /// change to this collection. Dropping the stream releases the query.
    pub fn watch<T>(&self, query: Query) -> SnapshotStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut changes = self.changes.subscribe();
        let collection = self.clone();
        debug!("live query opened on '{}'", self.path);

        Box::pin(async_stream::stream! {
            loop {
                yield collection.query::<T>(&query).await;

                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
    available: Arc<AtomicBool>,
    clock: Arc<AtomicI64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            clock: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn collection(&self, path: &str) -> Collection {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        collections
            .entry(path.to_owned())
            .or_insert_with(|| Collection::new(path, self.available.clone()))
            .clone()
    }

    /// Millisecond timestamp, strictly increasing across calls.
    pub fn server_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.clock.load(atomic::Ordering::SeqCst);

        loop {
            let next = now.max(last + 1);
            match self.clock.compare_exchange(
                last,
                next,
                atomic::Ordering::SeqCst,
                atomic::Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(atomic::Ordering::SeqCst)
    }

    /// Simulates losing (or regaining) the connection to the store. Live
    /// queries are woken so they observe the new state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, atomic::Ordering::SeqCst);

        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for c in collections.values() {
            c.touch();
        }
    }
}
