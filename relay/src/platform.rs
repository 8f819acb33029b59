use crate::task::LogMessage;
use async_trait::async_trait;
use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("chat platform returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("invalid user id: {0}")]
    InvalidUserId(String),
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Outcome of a delivery that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nothing was sent because the platform is not set up for this kind of
    /// task.
    Skipped(&'static str),
}

/// The chat side of the relay: where log messages go and where roles are
/// granted.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_log(&self, message: &LogMessage) -> Result<Delivery, DeliveryError>;

    async fn assign_role(&self, user_id: &str) -> Result<Delivery, DeliveryError>;

    async fn join_guild(&self, user_id: &str, access_token: &str)
    -> Result<Delivery, DeliveryError>;
}
