//! HTTP helpers shared by the REST clients.

use imagent_core::ProviderError;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use std::time::Duration;

/// Maximum tokens requested from every provider. Replies are a single command.
pub(crate) const MAX_TOKENS: u32 = 1024;

pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::Request {
        status_code: None,
        message: format!("{provider} API request failed: {err}"),
        is_retryable: err.is_connect() || err.is_timeout(),
        retry_after: None,
    }
}

pub(crate) fn status_error(
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> ProviderError {
    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ProviderError::Request {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
        retry_after,
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date values are ignored
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let header = HeaderValue::from_static("12");
        assert_eq!(
            parse_retry_after(Some(&header)),
            Some(Duration::from_secs(12))
        );
    }

    #[test]
    fn test_parse_retry_after_http_date_is_ignored() {
        let header = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&header)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_status_error_retryability() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into(), None);
        assert!(matches!(err, ProviderError::Request { is_retryable: true, .. }));

        let err = status_error(StatusCode::UNAUTHORIZED, "bad key".into(), None);
        assert!(matches!(err, ProviderError::Request { is_retryable: false, .. }));
        assert_eq!(err.status_code(), Some(401));
    }
}
