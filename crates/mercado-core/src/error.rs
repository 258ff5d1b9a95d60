use mercado_types::models::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// The operation needs a signed-in user and none was supplied.
    #[error("authentication required")]
    AuthRequired,

    /// Input rejected before any backend call was made.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The backend refused the write or read for this user.
    #[error("not allowed")]
    Forbidden,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl MarketError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;

pub fn require_identity(session: Option<&Identity>) -> Result<&Identity> {
    session.ok_or(MarketError::AuthRequired)
}
