pub mod auth;
pub mod conversation;
pub mod error;
pub mod event;
pub mod integration;
pub mod message;
pub mod reply;
pub mod session;
pub mod state;
pub mod user;

pub use error::{Error, Result};
pub use session::Session;
pub use state::AppState;
