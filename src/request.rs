use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method,
};
use serde::Serialize;

use crate::{RequestSession, Response, Result, SessionError};

/// A request being assembled against a [`RequestSession`].
///
/// Nothing is sent until [`RequestBuilder::send`] is called. Invalid inputs
/// are remembered and reported by `send`.
#[must_use = "a RequestBuilder does nothing until `send` is called"]
pub struct RequestBuilder<'a> {
    session: &'a RequestSession,
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) timeout: Option<Duration>,
    error: Option<SessionError>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(session: &'a RequestSession, method: Method, url: &str) -> Self {
        Self {
            session,
            method,
            url: url.to_owned(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            error: None,
        }
    }

    /// Appends query string pairs to the URL.
    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.query.extend(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// Adds a header, replacing any previous value with the same name.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        let name = HeaderName::try_from(key);
        let value = HeaderValue::try_from(value);
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(_), _) => self.fail(SessionError::InvalidHeader("invalid header name".to_owned())),
            (_, Err(_)) => {
                self.fail(SessionError::InvalidHeader("invalid header value".to_owned()))
            }
        }
        self
    }

    /// Merges a whole header map into the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.set_default_content_type("application/json");
                self.body = Some(body);
            }
            Err(err) => self.fail(SessionError::Encode(err)),
        }
        self
    }

    /// Sets a `application/x-www-form-urlencoded` body.
    pub fn form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.set_default_content_type("application/x-www-form-urlencoded");
        self.body = Some(encoded.into_bytes());
        self
    }

    /// Overrides the session timeout for this call only. Must be non-zero.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            self.fail(SessionError::Config(
                "per-call timeout must be greater than zero".to_owned(),
            ));
        } else {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Sends the request, retrying per the session's policy.
    pub fn send(self) -> Result<Response> {
        let session = self.session;
        session.send(self)
    }

    pub(crate) fn take_error(&mut self) -> Option<SessionError> {
        self.error.take()
    }

    fn fail(&mut self, err: SessionError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn set_default_content_type(&mut self, value: &'static str) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
    }
}
