#![forbid(unsafe_code)]

//! Quota-aware request gate.
//!
//! The API hands out a fixed daily quota. Once any call comes back with a
//! non-2xx status the rest of the run is assumed doomed (quota spent or key
//! revoked), so the gate closes and stays closed. Callers choose what a
//! closed gate means for them through [`FailMode`].

use std::fmt;

use thiserror::Error;

use crate::api::ApiEndpoints;
use crate::transport::{HttpGet, HttpResponse, ResilientTransport};

/// Why the gate closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Status(u16),
    Unreachable(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Status(status) => write!(f, "HTTP {status}"),
            CloseReason::Unreachable(message) => write!(f, "{message}"),
        }
    }
}

/// One-way open -> closed flag. There is no way to reopen it.
#[derive(Debug, Default)]
pub struct RequestGate {
    closed: Option<CloseReason>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.closed.as_ref()
    }

    fn close(&mut self, reason: CloseReason) {
        if self.closed.is_none() {
            log::error!("Api response error! ({reason})");
            self.closed = Some(reason);
        }
    }
}

/// What a gated call does when the gate is (or just became) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Setup calls: a closed gate aborts the run.
    FailFast,
    /// Paging calls: a closed gate means "stop, keep what you have".
    SoftStop,
}

#[derive(Debug)]
pub enum GateOutcome {
    Response(HttpResponse),
    Closed,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Api response error! ({reason})")]
    Rejected { reason: CloseReason },
}

/// Request-session context: the transport, the gate and the endpoint
/// builder every gated call needs.
pub struct Session<T> {
    transport: ResilientTransport<T>,
    gate: RequestGate,
    endpoints: ApiEndpoints,
}

impl<T: HttpGet> Session<T> {
    pub fn new(transport: ResilientTransport<T>, endpoints: ApiEndpoints) -> Self {
        Self {
            transport,
            gate: RequestGate::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn transport(&self) -> &ResilientTransport<T> {
        &self.transport
    }

    /// Sends `url` if the gate is open. A non-2xx status, or a transport
    /// that gave up under a bounded retry policy, closes the gate.
    pub fn guarded_fetch(&mut self, url: &str, mode: FailMode) -> Result<GateOutcome, GateError> {
        if self.gate.is_open() {
            match self.transport.fetch(url) {
                Ok(response) if response.is_success() => {
                    return Ok(GateOutcome::Response(response));
                }
                Ok(response) => self.gate.close(CloseReason::Status(response.status)),
                Err(err) => self.gate.close(CloseReason::Unreachable(err.to_string())),
            }
        }

        match mode {
            FailMode::FailFast => Err(GateError::Rejected {
                reason: self
                    .gate
                    .close_reason()
                    .cloned()
                    .unwrap_or(CloseReason::Unreachable("gate closed".into())),
            }),
            FailMode::SoftStop => Ok(GateOutcome::Closed),
        }
    }

    /// Fail-fast call for prerequisites: either a 2xx response or an error.
    pub fn fetch_required(&mut self, url: &str) -> Result<HttpResponse, GateError> {
        match self.guarded_fetch(url, FailMode::FailFast)? {
            GateOutcome::Response(response) => Ok(response),
            GateOutcome::Closed => Err(GateError::Rejected {
                reason: CloseReason::Unreachable("gate closed".into()),
            }),
        }
    }
}
