use thiserror::Error;

/// Top-level error type for javob.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration error. The only fatal kind — everything else is
    /// caught and logged at a handler boundary.
    #[error("config error: {0}")]
    Config(String),

    /// Error reading or writing the persisted document.
    #[error("store error: {0}")]
    Store(String),

    /// Error from the messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Error from an AI provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the web-search client.
    #[error("search error: {0}")]
    Search(String),

    /// Failed outbound HTTP call. `status` is `None` for transport-level
    /// failures (connect error, timeout) where no response arrived.
    #[error("http error ({}): {message}", status.map_or_else(|| "no status".to_string(), |s| s.to_string()))]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BotError {
    /// A transport failure where no HTTP response was received.
    pub fn http_transport(message: impl std::fmt::Display) -> Self {
        Self::Http {
            status: None,
            message: message.to_string(),
        }
    }

    /// A non-success HTTP response.
    pub fn http_status(status: u16, message: impl std::fmt::Display) -> Self {
        Self::Http {
            status: Some(status),
            message: message.to_string(),
        }
    }

    /// Whether the retry wrapper should try again: no status at all
    /// (network/timeout), any 5xx, or 429. Every other 4xx is a caller
    /// error and fails immediately, as does anything that is not an
    /// HTTP failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status: None, .. } => true,
            Self::Http {
                status: Some(s), ..
            } => *s >= 500 || *s == 429,
            _ => false,
        }
    }
}
