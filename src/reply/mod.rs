use std::sync::Arc;

use crate::{integration::gemini, message};

pub mod generator;
pub mod model;
pub mod service;

pub use generator::ReplyGenerator;

pub type Result<T> = std::result::Result<T, Error>;
pub type Generator = Arc<dyn ReplyGenerator + Send + Sync>;
pub type Service = Arc<dyn service::AutoReply + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("generator is unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    _Gemini(#[from] gemini::Error),
    #[error(transparent)]
    _Message(#[from] message::Error),
}
