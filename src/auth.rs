//! Request authentication strategies.
//!
//! An [`Authenticator`] receives every outgoing request right before it hits
//! the wire and returns it with credentials attached. Closures of the shape
//! `Fn(Request) -> Request` are authenticators too.

use std::fmt;

use reqwest::{
    blocking::Request,
    header::{HeaderValue, AUTHORIZATION},
};

use crate::{Result, SessionError};

/// Attaches credentials to an outgoing request.
pub trait Authenticator: Send + Sync {
    fn decorate(&self, request: Request) -> Request;
}

impl<F> Authenticator for F
where
    F: Fn(Request) -> Request + Send + Sync,
{
    fn decorate(&self, request: Request) -> Request {
        self(request)
    }
}

/// Sends `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerAuth {
    header: HeaderValue,
}

impl BearerAuth {
    /// Creates a bearer authenticator sending `Bearer <token>` verbatim.
    ///
    /// Use [`RawAuth`] when the full authorization value is already at hand.
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            header: sensitive_header(&format!("Bearer {}", token.as_ref()))?,
        })
    }
}

impl Authenticator for BearerAuth {
    fn decorate(&self, mut request: Request) -> Request {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.header.clone());
        request
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Sends a full raw authorization value, e.g. `"Token abc"` or any custom scheme.
#[derive(Clone)]
pub struct RawAuth {
    header: HeaderValue,
}

impl RawAuth {
    pub fn new(authorization: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            header: sensitive_header(authorization.as_ref().trim())?,
        })
    }
}

impl Authenticator for RawAuth {
    fn decorate(&self, mut request: Request) -> Request {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.header.clone());
        request
    }
}

impl fmt::Debug for RawAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAuth")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        SessionError::InvalidCredential(
            "authorization value contains characters not allowed in a header".to_owned(),
        )
    })?;
    header.set_sensitive(true);
    Ok(header)
}
