//! Retry policy and backoff math.
//!
//! Delay before retry `n` (1-based) is `backoff_factor * 2^(n - 1)` seconds,
//! capped at `backoff_max`. On 413, 429 and 503 responses a `Retry-After`
//! header (seconds or HTTP-date) replaces the computed delay when the policy
//! honors it.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header::HeaderMap, header::RETRY_AFTER, Method, StatusCode};

/// Statuses on which a server's `Retry-After` hint is taken into account.
pub const RETRY_AFTER_STATUS_CODES: [u16; 3] = [413, 429, 503];

/// Decides which failed attempts are retried and how long to wait in between.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_attempts: usize,
    /// Maximum number of redirects followed within a single attempt.
    pub max_redirects: usize,
    /// Backoff multiplier in seconds.
    pub backoff_factor: f64,
    /// Upper bound for a computed backoff delay.
    pub backoff_max: Duration,
    /// Response statuses that trigger a retry.
    pub retryable_status_codes: BTreeSet<u16>,
    /// Methods that may be retried after a response or a read failure.
    pub retryable_methods: HashSet<Method>,
    /// Use the server's `Retry-After` value instead of the computed backoff.
    pub honor_retry_after_header: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_redirects: 16,
            backoff_factor: 0.3,
            backoff_max: Duration::from_secs(120),
            retryable_status_codes: [429, 500, 502, 503, 504].into_iter().collect(),
            retryable_methods: [
                Method::HEAD,
                Method::GET,
                Method::PUT,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
                Method::TRACE,
            ]
            .into_iter()
            .collect(),
            honor_retry_after_header: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries but keeps the default redirect limit.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable_method(&self, method: &Method) -> bool {
        self.retryable_methods.contains(method)
    }

    /// Whether a response with `status` to a `method` request is worth another attempt.
    pub fn is_retryable_status(&self, method: &Method, status: StatusCode) -> bool {
        self.is_retryable_method(method) && self.retryable_status_codes.contains(&status.as_u16())
    }

    /// Whether a transport failure is worth another attempt.
    ///
    /// Connect errors never reached the server and are retried for any
    /// method; timeouts and body errors only for retryable methods.
    pub fn is_retryable_transport(&self, method: &Method, err: &reqwest::Error) -> bool {
        if err.is_connect() {
            return true;
        }
        (err.is_timeout() || err.is_request() || err.is_body()) && self.is_retryable_method(method)
    }

    /// Computed delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: usize) -> Duration {
        if retry == 0 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exp = (retry - 1).min(32) as i32;
        let secs = self.backoff_factor * 2f64.powi(exp);
        if !secs.is_finite() || secs >= self.backoff_max.as_secs_f64() {
            return self.backoff_max;
        }
        Duration::from_millis((secs * 1000.0).round() as u64)
    }

    /// Delay before retry number `retry`.
    ///
    /// `response` is the status and headers of the failed attempt, `None`
    /// for transport failures. The server's hint wins when allowed.
    pub fn delay_for(&self, retry: usize, response: Option<(StatusCode, &HeaderMap)>) -> Duration {
        if self.honor_retry_after_header {
            let hint = response
                .filter(|(status, _)| RETRY_AFTER_STATUS_CODES.contains(&status.as_u16()))
                .and_then(|(_, headers)| retry_after(headers));
            if let Some(delay) = hint {
                return delay;
            }
        }
        self.backoff(retry)
    }
}

/// Parses a `Retry-After` header given as delay-seconds or as an HTTP-date.
///
/// Dates in the past yield a zero delay.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    retry_after_at(headers, Utc::now())
}

fn retry_after_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(when) => Some(
            (when.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or(Duration::ZERO),
        ),
        Err(err) => {
            tracing::debug!("ignoring unparseable Retry-After '{value}': {err}");
            None
        }
    }
}
