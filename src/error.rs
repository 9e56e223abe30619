/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Non-success HTTP status code that was not retried, with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Retry budget spent without a successful response.
    #[error("max retries reached after {attempts} attempts{}", last_status(.status))]
    RetriesExhausted {
        /// Total number of attempts made, including the first one.
        attempts: usize,
        /// Status of the last response, if the server answered at all.
        status: Option<u16>,
        /// Transport error of the last attempt, if it never got a response.
        #[source]
        source: Option<reqwest::Error>,
    },
    /// URL could not be parsed or resolved against the base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Header name or value rejected before sending.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// Credential cannot be carried in an HTTP header.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    /// Request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Session configuration is missing or malformed.
    #[error("config error: {0}")]
    Config(String),
    /// The session was closed before the request was issued.
    #[error("session is closed")]
    Closed,
}

fn last_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" (last status {status})"),
        None => String::new(),
    }
}

/// Coarse failure classes a caller can branch on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// DNS, connection or timeout failure.
    Transport,
    /// Non-2xx response that was not retried.
    HttpStatus,
    /// Retry budget exhausted.
    RetriesExhausted,
    /// Anything raised before or around the request itself.
    Request,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Http { .. } => ErrorKind::HttpStatus,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::InvalidUrl(_)
            | Self::InvalidHeader(_)
            | Self::InvalidCredential(_)
            | Self::Encode(_)
            | Self::Config(_)
            | Self::Closed => ErrorKind::Request,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RetriesExhausted { status, .. } => *status,
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` when the last attempt ended in a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout(),
            Self::RetriesExhausted {
                source: Some(err), ..
            } => err.is_timeout(),
            _ => false,
        }
    }
}
