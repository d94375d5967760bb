//! Error types for the CLI

use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fleet(#[from] wf_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid id token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("id token has no usable {0} claim")]
    TokenClaim(&'static str),

    #[error("id token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("invalid target {0:?}, expected owner/region/instance")]
    InvalidTarget(String),
}
