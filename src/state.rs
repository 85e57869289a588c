use std::sync::Arc;

use crate::auth::service::MemoryAuthService;
use crate::conversation::repository::MemoryConversationRepository;
use crate::conversation::service::ConversationServiceImpl;
use crate::integration::gemini::GeminiGenerator;
use crate::integration::store::MemoryStore;
use crate::integration::{self, Config};
use crate::message::Dispatcher;
use crate::message::repository::MemoryMessageRepository;
use crate::message::service::MessageServiceImpl;
use crate::reply::service::AutoReplyImpl;
use crate::user::repository::MemoryUserRepository;
use crate::user::service::UserServiceImpl;
use crate::{auth, conversation, message, reply, user};

/// Collaborators of every session, built once at process start.
#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
    pub auth_service: auth::Service,
    pub user_service: user::Service,
    pub conversation_service: conversation::Service,
    pub message_service: message::Service,
    pub auto_reply: reply::Service,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn init(cfg: &Config) -> integration::Result<Self> {
        let generator = GeminiGenerator::new(cfg.gemini.clone(), integration::init_http_client()?);

        Ok(Self::new(
            MemoryStore::new(),
            Arc::new(MemoryAuthService::new()),
            Arc::new(generator),
            &cfg.default_about,
        ))
    }

    pub fn new(
        store: MemoryStore,
        auth_service: auth::Service,
        generator: reply::Generator,
        default_about: &str,
    ) -> Self {
        let user_service: user::Service = Arc::new(UserServiceImpl::new(
            Arc::new(MemoryUserRepository::new(&store)),
            auth_service.clone(),
            default_about,
        ));
        let conversation_service: conversation::Service = Arc::new(ConversationServiceImpl::new(
            Arc::new(MemoryConversationRepository::new(&store)),
        ));
        let message_service: message::Service = Arc::new(MessageServiceImpl::new(
            Arc::new(MemoryMessageRepository::new(&store)),
            conversation_service.clone(),
        ));
        let auto_reply: reply::Service =
            Arc::new(AutoReplyImpl::new(message_service.clone(), generator));
        let dispatcher = Dispatcher::new(
            message_service.clone(),
            conversation_service.clone(),
            auto_reply.clone(),
        );

        Self {
            store,
            auth_service,
            user_service,
            conversation_service,
            message_service,
            auto_reply,
            dispatcher,
        }
    }
}
