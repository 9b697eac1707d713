#![forbid(unsafe_code)]

//! HTTP plumbing. `HttpGet` is the single-attempt seam, `ResilientTransport`
//! layers the retry policy on top of it.
//!
//! Status codes are never inspected here: a 403 is as much a response as a
//! 200. Only failures to obtain a response at all are retried.

use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<TransportError>,
    },
}

/// One GET, one attempt.
pub trait HttpGet {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpGet + ?Sized> HttpGet for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }
}

impl<T: HttpGet + ?Sized> HttpGet for Box<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }
}

/// Blocking client backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("channel-dump/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl HttpGet for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        match self.agent.get(url).call() {
            Ok(response) | Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(transport)) => Err(classify_transport(&transport)),
        }
    }
}

fn read_response(response: ureq::Response) -> Result<HttpResponse, TransportError> {
    let status = response.status();
    let body = response.into_string().map_err(|err| {
        if err.kind() == std::io::ErrorKind::TimedOut {
            TransportError::Timeout(err.to_string())
        } else {
            TransportError::Io(err.to_string())
        }
    })?;
    Ok(HttpResponse { status, body })
}

fn classify_transport(transport: &ureq::Transport) -> TransportError {
    let message = transport.to_string();
    match transport.kind() {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
            TransportError::Connection(message)
        }
        ureq::ErrorKind::Io if message.contains("timed out") => TransportError::Timeout(message),
        ureq::ErrorKind::Io => TransportError::Io(message),
        _ => TransportError::Request(message),
    }
}

/// How long to wait between attempts and when to stop trying.
///
/// `max_attempts == None` retries forever, which is the default: a batch
/// run would rather block than lose a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Retrying decorator over any `HttpGet`.
pub struct ResilientTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: HttpGet> ResilientTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Repeats the identical GET until some response arrives. Only returns
    /// an error when the policy carries an attempt cap and it is reached.
    pub fn fetch(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.inner.get(url) {
                Ok(response) => return Ok(response),
                Err(err) if self.policy.exhausted(attempts) => {
                    return Err(TransportError::Exhausted {
                        url: redact_key(url),
                        attempts,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    log::warn!("{err}... Retry ({})", redact_key(url));
                    if !self.policy.delay.is_zero() {
                        thread::sleep(self.policy.delay);
                    }
                }
            }
        }
    }
}

static KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&]*").expect("valid regex"));

/// Masks the `key=` query parameter so credentials never reach the logs.
pub fn redact_key(url: &str) -> String {
    KEY_PARAM.replace_all(url, "${1}***").into_owned()
}
