use async_trait::async_trait;

use crate::integration::store::{Collection, Direction, MemoryStore, Query};

use super::Id;
use super::model::{ProfileUpdate, User};

const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait UserRepository {
    async fn insert(&self, user: &User) -> super::Result<()>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>>;

    async fn find_all(&self) -> super::Result<Vec<User>>;

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<User>;

    async fn update_presence(
        &self,
        id: &Id,
        online: bool,
        last_seen: Option<i64>,
    ) -> super::Result<()>;
}

pub struct MemoryUserRepository {
    col: Collection,
}

impl MemoryUserRepository {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            col: store.collection(USERS_COLLECTION),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> super::Result<()> {
        self.col.insert(user.id.as_str(), user).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>> {
        let user = self.col.get::<User>(id.as_str()).await?;
        Ok(user)
    }

    async fn find_all(&self) -> super::Result<Vec<User>> {
        let users = self
            .col
            .query::<User>(&Query::new().order_by("handle", Direction::Asc))
            .await?;
        Ok(users)
    }

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<User> {
        let user = self
            .col
            .update::<User, _>(id.as_str(), |u| update.apply(u))
            .await?;
        Ok(user)
    }

    async fn update_presence(
        &self,
        id: &Id,
        online: bool,
        last_seen: Option<i64>,
    ) -> super::Result<()> {
        self.col
            .update::<User, _>(id.as_str(), |u| {
                u.online = online;
                if last_seen.is_some() {
                    u.last_seen = last_seen;
                }
            })
            .await?;
        Ok(())
    }
}
