// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LINK};

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, DownloadConfig};

/// Create the client used for API collection requests.
///
/// Carries the bearer credential on every request. No request timeout is
/// set, so a stalled connection blocks the run.
pub fn create_api_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if !config.access_token.is_empty() {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|e| AppError::config(format!("api.access_token is not a valid header: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Create the client used for binary downloads, bounded by a per-request timeout.
pub fn create_download_client(api: &ApiConfig, config: &DownloadConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&api.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Extract the `rel="next"` target from a response's `Link` headers.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_next_link)
}

/// Find the `rel="next"` URL in a `Link` header value.
///
/// `<https://x/api?page=2>; rel="next", <https://x/api?page=9>; rel="last"`
/// yields `https://x/api?page=2`.
pub fn parse_next_link(value: &str) -> Option<String> {
    value.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| {
                    rel.trim_matches('"')
                        .split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("next"))
                })
                .unwrap_or(false)
        });

        is_next.then(|| target.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://lms.example.edu/api/v1/courses?page=1&per_page=1000>; rel="current", <https://lms.example.edu/api/v1/courses?page=2&per_page=1000>; rel="next", <https://lms.example.edu/api/v1/courses?page=1&per_page=1000>; rel="first""#;
        assert_eq!(
            parse_next_link(header),
            Some("https://lms.example.edu/api/v1/courses?page=2&per_page=1000".to_string())
        );
    }

    #[test]
    fn test_parse_next_link_absent() {
        let header = r#"<https://x/api?page=1>; rel="current", <https://x/api?page=1>; rel="last""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn test_next_link_across_header_values() {
        let mut headers = HeaderMap::new();
        headers.append(LINK, HeaderValue::from_static(r#"<https://x/a?page=1>; rel="first""#));
        headers.append(LINK, HeaderValue::from_static(r#"<https://x/a?page=3>; rel=next"#));
        assert_eq!(next_link(&headers), Some("https://x/a?page=3".to_string()));
    }

    #[test]
    fn test_api_client_accepts_token() {
        let config = ApiConfig {
            access_token: "SECRET".to_string(),
            ..ApiConfig::default()
        };
        assert!(create_api_client(&config).is_ok());
    }
}
