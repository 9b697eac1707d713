#![forbid(unsafe_code)]

use thiserror::Error;

use crate::api::{ApiEndpoints, MAX_PAGE_SIZE};
use crate::channel::is_channel_url;
use crate::output::validate_output_name;
use crate::transport::{HttpGet, ResilientTransport, TransportError};

/// Google's own channel; any valid key can look it up.
pub const PROBE_CHANNEL_ID: &str = "UCK8sQmJBp8GCxrOtXWBpyEA";

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("{}", .0.join("\n"))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Checks the output name, then probes the channel page (when given as a
/// URL) and the credential. A bad name is refused before any network
/// traffic; remote problems are reported together. Probes bypass the
/// request gate.
pub fn preflight<T: HttpGet>(
    transport: &ResilientTransport<T>,
    endpoints: &ApiEndpoints,
    channel: &str,
    output_name: &str,
) -> Result<(), PreflightError> {
    if let Err(err) = validate_output_name(output_name) {
        return Err(PreflightError::Invalid(vec![err.to_string()]));
    }

    let mut problems = Vec::new();
    if is_channel_url(channel) {
        let response = transport.fetch(channel.trim())?;
        match response.status {
            200 => {}
            404 => problems.push(format!("youtube channel '{channel}' does not exist")),
            status => problems.push(format!("url response error (HTTP {status})")),
        }
    }

    let probe = endpoints.channel_lookup(PROBE_CHANNEL_ID, MAX_PAGE_SIZE);
    let response = transport.fetch(&probe)?;
    match response.status {
        200 => {}
        400 => problems.push(format!("api key '{}' is not valid", endpoints.key())),
        status => problems.push(format!("api response error (HTTP {status})")),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PreflightError::Invalid(problems))
    }
}
