//! Error mapping shared by the provider agents.

use optimism_core::OptimismError;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use std::time::Duration;

/// Converts a non-success provider response into a domain error.
///
/// `target` names the provider call (e.g. `"gemini generateContent"`).
pub(crate) fn map_http_error(
    target: &str,
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> OptimismError {
    if let Some(delay) = retry_after {
        tracing::warn!(
            "[{}] Rate limited ({}), retry after {:?}",
            target,
            status.as_u16(),
            delay
        );
    }
    OptimismError::server(status.as_u16(), target, message)
}

/// Converts a transport failure into a domain error.
pub(crate) fn map_send_error(target: &str, err: reqwest::Error) -> OptimismError {
    tracing::warn!("[{}] Request failed: {}", target, err);
    OptimismError::from(err)
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let header = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&header)), Some(Duration::from_secs(12)));

        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_map_http_error_keeps_status() {
        let err = map_http_error(
            "gemini generateContent",
            StatusCode::UNAUTHORIZED,
            "API key not valid".to_string(),
            None,
        );
        assert_eq!(
            err,
            OptimismError::server(401, "gemini generateContent", "API key not valid")
        );
    }
}
