use reqwest::StatusCode;
use thiserror::Error;

/// Shown when the request could not be made or was answered with an error.
pub const REQUEST_FAILED_TEXT: &str = "Something went wrong, please try again later.";
/// Shown when a streamed answer broke off halfway.
pub const STREAM_FAILED_TEXT: &str = "Streaming failed.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat backend returned status {0}")]
    Status(StatusCode),

    #[error("chat stream broke off: {0}")]
    Stream(String),

    #[error("chat backend returned an empty answer")]
    EmptyReply,

    #[error("chat request cancelled")]
    Cancelled,
}

impl ChatError {
    /// Text that replaces the bot message content, if any. A cancelled
    /// request keeps whatever was rendered before.
    pub fn user_text(&self) -> Option<&'static str> {
        match self {
            Self::Transport(_) | Self::Status(_) | Self::EmptyReply => Some(REQUEST_FAILED_TEXT),
            Self::Stream(_) => Some(STREAM_FAILED_TEXT),
            Self::Cancelled => None,
        }
    }
}
