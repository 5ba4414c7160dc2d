use facewatch_core::NetworkError;
use std::time::Duration;

/// Shared HTTP client for all adapters; one connection pool per daemon.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, NetworkError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(transport)
}

pub(crate) fn transport(e: reqwest::Error) -> NetworkError {
    NetworkError::Transport(e.to_string())
}

pub(crate) fn decode(e: reqwest::Error) -> NetworkError {
    NetworkError::Decode(e.to_string())
}

/// Join a base URL and an endpoint path without doubling the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Reject non-2xx responses.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NetworkError> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response)
}
