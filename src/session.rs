use std::fmt;
use std::thread::sleep;
use std::time::Duration;

use reqwest::{
    blocking::{Body, Client, Request},
    redirect, Method,
};
use url::Url;

use crate::{
    Authenticator, BearerAuth, RequestBuilder, Response, Result, SessionError, SessionOptions,
};

/// HTTP session bound to an optional base URL.
///
/// Every request shares one pooled transport, the session timeout, the retry
/// policy and the authenticator. The transport is released by
/// [`RequestSession::close`] or when the session is dropped.
pub struct RequestSession {
    http: Option<Client>,
    base_url: Option<Url>,
    auth: Option<Box<dyn Authenticator>>,
    options: SessionOptions,
}

impl fmt::Debug for RequestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSession")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RequestSession {
    /// Creates a session with default options.
    ///
    /// When `base_url` is set, relative request URLs are resolved against it
    /// (`https://api.example.com` + `/v1/users`).
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|url| {
                Url::parse(url.trim())
                    .map_err(|err| SessionError::InvalidUrl(format!("base url '{url}': {err}")))
            })
            .transpose()?;
        let options = SessionOptions::default();
        Ok(Self {
            http: Some(build_client(&options)?),
            base_url,
            auth: None,
            options,
        })
    }

    /// Creates a session from environment variables.
    ///
    /// Reads, all optional:
    /// - `APIHELPER_BASE_URL` — base URL for relative paths
    /// - `APIHELPER_TOKEN` — bearer token, sent as `Bearer <token>`
    /// - `APIHELPER_TIMEOUT_MS` — default request timeout in milliseconds
    pub fn from_env() -> Result<Self> {
        let base_url = non_empty_env("APIHELPER_BASE_URL");
        let mut session = Self::new(base_url.as_deref())?;

        if let Some(timeout) = non_empty_env("APIHELPER_TIMEOUT_MS") {
            let timeout_ms = timeout.trim().parse::<u64>().map_err(|_| {
                SessionError::Config(format!(
                    "APIHELPER_TIMEOUT_MS must be a whole number of milliseconds, got '{timeout}'"
                ))
            })?;
            session = session.with_options(SessionOptions {
                timeout_ms,
                ..SessionOptions::default()
            })?;
        }

        if let Some(token) = non_empty_env("APIHELPER_TOKEN") {
            session = session.with_auth(BearerAuth::new(token)?);
        }
        Ok(session)
    }

    /// Attaches an authenticator applied to every outgoing request.
    pub fn with_auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Box::new(auth));
        self
    }

    /// Shorthand for `with_auth(BearerAuth::new(token)?)`.
    pub fn with_bearer(self, token: impl AsRef<str>) -> Result<Self> {
        Ok(self.with_auth(BearerAuth::new(token)?))
    }

    /// Applies timeout and retry options, rebuilding the transport.
    pub fn with_options(mut self, options: SessionOptions) -> Result<Self> {
        validate(&options)?;
        if self.http.is_some() {
            self.http = Some(build_client(&options)?);
        }
        self.options = options;
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn session_options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url)
    }

    pub fn get(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::GET, url)
    }

    pub fn head(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::HEAD, url)
    }

    pub fn options(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::OPTIONS, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder<'_> {
        self.request(Method::DELETE, url)
    }

    /// Releases the pooled transport. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            tracing::debug!(
                base_url = self.base_url.as_ref().map(Url::as_str),
                "http session closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Resolves `url` against the base URL when it is relative.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(url)
                    .map_err(|err| SessionError::InvalidUrl(format!("'{url}': {err}"))),
                None => Err(SessionError::InvalidUrl(format!(
                    "'{url}' is relative and the session has no base url"
                ))),
            },
            Err(err) => Err(SessionError::InvalidUrl(format!("'{url}': {err}"))),
        }
    }

    pub(crate) fn send(&self, mut call: RequestBuilder<'_>) -> Result<Response> {
        let outcome = match call.take_error() {
            Some(err) => Err(err),
            None => self.send_with_retry(&call),
        };

        if let Err(err) = &outcome {
            tracing::error!(
                method = %call.method,
                url = %call.url,
                kind = ?err.kind(),
                "http request failed: {err}"
            );
        }
        outcome
    }

    fn send_with_retry(&self, call: &RequestBuilder<'_>) -> Result<Response> {
        let http = self.http.as_ref().ok_or(SessionError::Closed)?;
        let mut url = self.resolve_url(&call.url)?;
        if !call.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&call.query);
        }
        let timeout = call.timeout.unwrap_or_else(|| self.options.timeout());
        let policy = &self.options.retry;
        let method = &call.method;

        let mut retries = 0usize;
        loop {
            let request = self.build_request(call, &url, timeout);
            tracing::debug!(%method, %url, attempt = retries + 1, "sending http request");

            match http.execute(request) {
                Ok(response) => {
                    let status = response.status();
                    if !(status.is_client_error() || status.is_server_error()) {
                        return read_response(response, retries);
                    }

                    let retryable = policy.is_retryable_status(method, status);
                    if retryable && retries < policy.max_attempts {
                        retries += 1;
                        let delay = policy.delay_for(retries, Some((status, response.headers())));
                        tracing::warn!(
                            %method,
                            %url,
                            status = status.as_u16(),
                            "retrying http request after {} ms ({retries}/{})",
                            delay.as_millis(),
                            policy.max_attempts
                        );
                        drop(response);
                        wait_before_retry(delay);
                        continue;
                    }

                    if retryable && retries > 0 {
                        return Err(SessionError::RetriesExhausted {
                            attempts: retries + 1,
                            status: Some(status.as_u16()),
                            source: None,
                        });
                    }
                    // An unreadable error body must not hide the status.
                    let body = response.text().unwrap_or_default();
                    return Err(SessionError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    let retryable = policy.is_retryable_transport(method, &err);
                    if retryable && retries < policy.max_attempts {
                        retries += 1;
                        let delay = policy.delay_for(retries, None);
                        tracing::warn!(
                            %method,
                            %url,
                            "retrying http request after {} ms ({retries}/{}): {err}",
                            delay.as_millis(),
                            policy.max_attempts
                        );
                        wait_before_retry(delay);
                        continue;
                    }

                    if retryable && retries > 0 {
                        return Err(SessionError::RetriesExhausted {
                            attempts: retries + 1,
                            status: None,
                            source: Some(err),
                        });
                    }
                    return Err(SessionError::Transport(err));
                }
            }
        }
    }

    fn build_request(&self, call: &RequestBuilder<'_>, url: &Url, timeout: Duration) -> Request {
        let mut request = Request::new(call.method.clone(), url.clone());
        *request.timeout_mut() = Some(timeout);
        request.headers_mut().extend(call.headers.clone());
        if let Some(body) = &call.body {
            *request.body_mut() = Some(Body::from(body.clone()));
        }
        match &self.auth {
            Some(auth) => auth.decorate(request),
            None => request,
        }
    }
}

impl Drop for RequestSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_client(options: &SessionOptions) -> Result<Client> {
    Client::builder()
        .timeout(options.timeout())
        .redirect(redirect::Policy::limited(options.retry.max_redirects))
        .build()
        .map_err(SessionError::Transport)
}

fn validate(options: &SessionOptions) -> Result<()> {
    if options.timeout_ms == 0 {
        return Err(SessionError::Config("timeout must be greater than zero".to_owned()));
    }
    let factor = options.retry.backoff_factor;
    if !factor.is_finite() || factor < 0.0 {
        return Err(SessionError::Config(format!(
            "backoff factor must be a non-negative number, got {factor}"
        )));
    }
    Ok(())
}

fn read_response(response: reqwest::blocking::Response, retries: usize) -> Result<Response> {
    let status = response.status();
    let headers = response.headers().clone();
    let url = response.url().clone();
    let body = response.bytes().map_err(SessionError::Transport)?.to_vec();
    Ok(Response {
        status,
        headers,
        url,
        body,
        retries,
    })
}

fn wait_before_retry(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay);
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
