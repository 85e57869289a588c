//! Failure taxonomy shared by every entry point.
//!
//! Each collaborator call site follows exactly one policy:
//! - [`Policy::Surface`]: the caller gets the error and shows it once
//!   (bad credentials, failed sends);
//! - [`Policy::Degrade`]: the session keeps going in a reduced state and the
//!   error becomes a persistent advisory (identity/event store unreachable);
//! - [`Policy::Swallow`]: background work (presence, auto-reply, live query
//!   errors) is logged through [`swallow`] and never reaches the caller.

use std::fmt::Display;

use log::warn;

use crate::{auth, conversation, message, user};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] auth::Error),
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("message delivery failed: {0}")]
    Delivery(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    Surface,
    Degrade,
    Swallow,
}

impl Error {
    pub const fn policy(&self) -> Policy {
        match self {
            Error::Auth(_) | Error::Delivery(_) => Policy::Surface,
            Error::DirectoryUnavailable(_) => Policy::Degrade,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Error::Auth(e) => e.user_message(),
            Error::DirectoryUnavailable(_) => {
                "Could not reach the message directory. Some data may be missing.".into()
            }
            Error::Delivery(_) => "Message could not be sent.".into(),
        }
    }
}

impl From<user::Error> for Error {
    fn from(e: user::Error) -> Self {
        match e {
            user::Error::_Auth(e) => Error::Auth(e),
            e => Error::DirectoryUnavailable(e.to_string()),
        }
    }
}

impl From<conversation::Error> for Error {
    fn from(e: conversation::Error) -> Self {
        Error::DirectoryUnavailable(e.to_string())
    }
}

impl From<message::Error> for Error {
    fn from(e: message::Error) -> Self {
        Error::Delivery(e.to_string())
    }
}

/// Logs and discards a best-effort failure.
pub fn swallow<T, E: Display>(context: &str, result: std::result::Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{context} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_map_policies() {
        assert_eq!(
            Error::Auth(auth::Error::InvalidCredentials).policy(),
            Policy::Surface
        );
        assert_eq!(
            Error::DirectoryUnavailable("down".into()).policy(),
            Policy::Degrade
        );
        assert_eq!(Error::Delivery("down".into()).policy(), Policy::Surface);
    }

    #[test]
    fn should_keep_auth_errors_when_lifting_user_errors() {
        let lifted = Error::from(user::Error::_Auth(auth::Error::HandleInUse("jora".into())));

        assert!(matches!(lifted, Error::Auth(auth::Error::HandleInUse(_))));
        assert_eq!(
            lifted.user_message(),
            "The handle 'jora' is already taken."
        );
    }

    #[test]
    fn should_swallow_errors() {
        assert_eq!(swallow::<u8, _>("test", Err("boom")), None);
        assert_eq!(swallow::<u8, &str>("test", Ok(1)), Some(1));
    }
}
