use std::sync::Arc;

pub mod model;
pub mod service;

pub use model::{Credential, Identity, SocialProfile};

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::AuthService + Send + Sync>;

pub const MIN_SECRET_LEN: usize = 6;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("handle is already in use: {0}")]
    HandleInUse(String),
    #[error("secret must be at least {0} characters long")]
    WeakSecret(usize),
    #[error("handle must not be empty")]
    InvalidHandle,
}

impl Error {
    /// Message shown to the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidCredentials => "Wrong handle or password.".into(),
            Error::HandleInUse(handle) => format!("The handle '{handle}' is already taken."),
            Error::WeakSecret(min) => {
                format!("Password is too weak, use at least {min} characters.")
            }
            Error::InvalidHandle => "Please choose a handle.".into(),
        }
    }
}
