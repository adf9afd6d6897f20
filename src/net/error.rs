use thiserror::Error;

/// Why a request to the content service did not produce usable data.
///
/// Every variant is surfaced the same way to views (an error flag next to
/// whatever data was cached before); the distinction exists for logging and
/// for callers that want to word their notice differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, refused connection or any other transport failure
    #[error("network error: {message}")]
    Network { message: String },
    /// The service answered with a non-2xx status
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },
    /// The body could not be decoded into the expected shape
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn network<M: ToString>(message: M) -> Self {
        Self::Network {
            message: message.to_string(),
        }
    }

    pub fn server<M: ToString>(status: u16, message: M) -> Self {
        Self::Server {
            status,
            message: message.to_string(),
        }
    }

    pub fn decode<M: ToString>(message: M) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }

    /// Status code for [`FetchError::Server`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::network("request timed out")
        } else if value.is_connect() {
            Self::network(format!("connection failed: {value}"))
        } else if value.is_decode() {
            Self::decode(value)
        } else {
            Self::network(value)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(value: serde_json::Error) -> Self {
        Self::decode(value)
    }
}
