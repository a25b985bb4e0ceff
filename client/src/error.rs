use thiserror::Error;

/// Error surface of the ticket discussion client.
///
/// Every failure degrades to an inline message for the hosting view; nothing
/// here is fatal to the application.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("could not decode server response: {0}")]
    Decode(String),

    /// The server answered with `success: false`.
    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    Validation(String),

    #[error("a message send is already in flight")]
    SendInFlight,

    #[error("no ticket is open")]
    NotOpen,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn decode(context: impl Into<String>) -> Self {
        ClientError::Decode(context.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }
}
