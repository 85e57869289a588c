use async_trait::async_trait;
use log::{debug, warn};

use crate::auth::{self, Credential, Identity};
use crate::error;

use super::model::{ProfileUpdate, Resolution, User};
use super::{Handle, Id, Repository};

#[async_trait]
pub trait UserService {
    async fn register(
        &self,
        handle: &Handle,
        secret: &str,
        name: &str,
    ) -> super::Result<Resolution>;

    /// Fails only on a bad credential; an unreachable directory degrades to
    /// an ephemeral identity.
    async fn resolve_or_create(&self, credential: &Credential) -> super::Result<Resolution>;

    async fn find_by_id(&self, id: &Id) -> super::Result<User>;

    async fn search(&self, query: &str, viewer: &Id) -> super::Result<Vec<User>>;

    /// Best-effort, failures are only logged.
    async fn set_presence(&self, id: &Id, online: bool);

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<()>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
    auth_service: auth::Service,
    default_about: String,
}

impl UserServiceImpl {
    pub fn new(repo: Repository, auth_service: auth::Service, default_about: &str) -> Self {
        Self {
            repo,
            auth_service,
            default_about: default_about.to_owned(),
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn register(
        &self,
        handle: &Handle,
        secret: &str,
        name: &str,
    ) -> super::Result<Resolution> {
        let identity = self.auth_service.sign_up(handle, secret, name).await?;
        Ok(self.resolve(identity).await)
    }

    async fn resolve_or_create(&self, credential: &Credential) -> super::Result<Resolution> {
        let identity = match credential {
            Credential::Password { handle, secret } => {
                self.auth_service.sign_in(handle, secret).await?
            }
            Credential::Social(profile) => self.auth_service.sign_in_social(profile).await?,
        };

        Ok(self.resolve(identity).await)
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| super::Error::NotFound(id.clone()))
    }

    async fn search(&self, query: &str, viewer: &Id) -> super::Result<Vec<User>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let users = self
            .repo
            .find_all()
            .await?
            .into_iter()
            .filter(|u| u.id.ne(viewer))
            .filter(|u| {
                u.handle.contains_ignore_case(&needle) || u.name.to_lowercase().contains(&needle)
            })
            .collect();

        Ok(users)
    }

    async fn set_presence(&self, id: &Id, online: bool) {
        let last_seen = (!online).then(|| chrono::Utc::now().timestamp_millis());

        error::swallow(
            "presence update",
            self.repo.update_presence(id, online, last_seen).await,
        );
    }

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<()> {
        let update = update.sanitized();
        if update.is_empty() {
            return Ok(());
        }

        self.repo.update_profile(id, &update).await?;
        debug!("profile of {id} updated");
        Ok(())
    }
}

impl UserServiceImpl {
    async fn resolve(&self, identity: Identity) -> Resolution {
        match self.repo.find_by_id(&identity.uid).await {
            Ok(Some(user)) => Resolution::Resolved(user),
            Ok(None) => {
                let user = User::from_identity(&identity, &self.default_about);
                match self.repo.insert(&user).await {
                    Ok(()) => {
                        debug!("created identity record for '{}'", user.handle);
                        Resolution::Resolved(user)
                    }
                    Err(e) => degraded(user, e),
                }
            }
            Err(e) => degraded(User::from_identity(&identity, &self.default_about), e),
        }
    }
}

fn degraded(user: User, e: super::Error) -> Resolution {
    warn!("identity directory unavailable, continuing with ephemeral identity: {e}");
    Resolution::Degraded {
        user,
        cause: error::Error::from(e),
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::auth::service::MemoryAuthService;
    use crate::integration::store::MemoryStore;
    use crate::user::repository::{MemoryUserRepository, UserRepository};

    use super::*;

    struct Fixture {
        store: MemoryStore,
        repo: Repository,
        service: UserServiceImpl,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let repo: Repository = Arc::new(MemoryUserRepository::new(&store));
        let service = UserServiceImpl::new(
            repo.clone(),
            Arc::new(MemoryAuthService::new()),
            "Hey there!",
        );
        Fixture {
            store,
            repo,
            service,
        }
    }

    #[tokio::test]
    async fn should_create_identity_on_first_sign_in() {
        let f = fixture();
        let registered = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap();
        let id = registered.user().id.clone();

        let resolved = f
            .service
            .resolve_or_create(&Credential::password("JORA", "secret1"))
            .await
            .unwrap();

        assert!(resolved.advisory().is_none());
        assert_eq!(resolved.user().id, id);
        assert_eq!(resolved.user().about.as_deref(), Some("Hey there!"));
        assert!(resolved.user().avatar.contains("seed=jora"));
        assert_eq!(f.repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_fail_with_auth_error_on_bad_credential() {
        let f = fixture();
        f.service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap();

        let result = f
            .service
            .resolve_or_create(&Credential::password("jora", "wrong-secret"))
            .await;

        assert!(matches!(
            result,
            Err(crate::user::Error::_Auth(auth::Error::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn should_not_create_record_for_taken_handle() {
        let f = fixture();
        f.service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap();

        let result = f
            .service
            .register(&Handle::from("Jora"), "secret2", "Impostor")
            .await;

        assert!(matches!(
            result,
            Err(crate::user::Error::_Auth(auth::Error::HandleInUse(_)))
        ));
        assert_eq!(f.repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_degrade_to_ephemeral_identity_when_directory_is_down() {
        let f = fixture();
        f.store.set_available(false);

        let resolution = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap();

        assert_eq!(resolution.user().name, "Jora");
        assert!(matches!(
            resolution.advisory(),
            Some(error::Error::DirectoryUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn should_update_only_supplied_profile_fields() {
        let f = fixture();
        let user = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap()
            .user()
            .clone();

        f.service
            .update_profile(&user.id, &ProfileUpdate::about("busy"))
            .await
            .unwrap();

        let actual = f.service.find_by_id(&user.id).await.unwrap();
        assert_eq!(actual.name, "Jora");
        assert_eq!(actual.about.as_deref(), Some("busy"));
    }

    #[tokio::test]
    async fn should_fail_profile_update_when_directory_is_down() {
        let f = fixture();
        let user = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap()
            .user()
            .clone();
        f.store.set_available(false);

        let result = f
            .service
            .update_profile(&user.id, &ProfileUpdate::name("Jorik"))
            .await;

        assert!(matches!(
            error::Error::from(result.unwrap_err()),
            error::Error::DirectoryUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn should_stamp_last_seen_when_going_offline() {
        let f = fixture();
        let user = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap()
            .user()
            .clone();

        f.service.set_presence(&user.id, false).await;

        let actual = f.service.find_by_id(&user.id).await.unwrap();
        assert!(!actual.online);
        assert!(actual.last_seen.is_some());
    }

    #[tokio::test]
    async fn should_swallow_presence_failure() {
        let f = fixture();
        f.store.set_available(false);

        f.service.set_presence(&Id::from("ghost"), true).await;
    }

    #[tokio::test]
    async fn should_search_by_handle_or_name_excluding_viewer() {
        let f = fixture();
        let viewer = f
            .service
            .register(&Handle::from("jora"), "secret1", "Jora")
            .await
            .unwrap()
            .user()
            .clone();
        f.service
            .register(&Handle::from("joe"), "secret1", "Joe")
            .await
            .unwrap();
        f.service
            .register(&Handle::from("valera"), "secret1", "Valera Jones")
            .await
            .unwrap();

        let found = f
            .service
            .search("JO", &viewer.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.handle.to_string())
            .collect::<Vec<_>>();

        assert_eq!(found, vec!["joe", "valera"]);
    }
}
