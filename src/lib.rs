//! `apihelper-http` is a blocking HTTP session helper built on `reqwest`.
//!
//! A [`RequestSession`] ties together:
//! - base URL sessions (relative paths resolved against a fixed origin)
//! - a default request timeout with per-call override
//! - retry with exponential backoff that honors `Retry-After`
//! - pluggable authentication via [`Authenticator`]
//! - typed, logged failures instead of panics
//!
//! ```no_run
//! use apihelper_http::RequestSession;
//!
//! let session = RequestSession::new(Some("https://api.example.com"))?
//!     .with_bearer("abc123")?;
//! let users = session.get("/v1/users").query([("page", "1")]).send()?;
//! println!("{}", users.text());
//! # Ok::<(), apihelper_http::SessionError>(())
//! ```

mod auth;
mod error;
mod options;
mod request;
mod response;
mod retry;
mod session;

pub use auth::{Authenticator, BearerAuth, RawAuth};
pub use error::{ErrorKind, SessionError};
pub use options::{SessionOptions, DEFAULT_TIMEOUT_MS};
pub use request::RequestBuilder;
pub use response::Response;
pub use retry::{retry_after, RetryPolicy, RETRY_AFTER_STATUS_CODES};
pub use session::RequestSession;

pub use reqwest::{header, Method, StatusCode};

pub type Result<T> = std::result::Result<T, SessionError>;
