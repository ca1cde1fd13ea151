use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

/// Largest request body forwarded upstream (post images included).
pub const MAX_PROXY_BODY_BYTES: usize = 20 * 1024 * 1024;
pub const USER_AGENT: &str = "safenavi-host/0.1";

/// Paths owned by the backend; everything else is a static asset.
pub const BACKEND_PAGES: [&str; 3] = ["/signup", "/login", "/logout"];
/// Live board feed; exempt from the total upstream timeout.
pub const FEED_STREAM_PATH: &str = "/api/board/stream";

pub fn port() -> u16 {
    std::env::var("SAFENAVI_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PORT)
}

/// Backend origin without a trailing slash.
pub fn backend_url() -> String {
    std::env::var("SAFENAVI_BACKEND_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

pub fn static_dir() -> String {
    std::env::var("SAFENAVI_STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_on_garbage() {
        temp_env::with_var("SAFENAVI_PORT", Some("9090"), || assert_eq!(port(), 9090));
        temp_env::with_var("SAFENAVI_PORT", Some("0"), || assert_eq!(port(), DEFAULT_PORT));
        temp_env::with_var("SAFENAVI_PORT", Some("http"), || {
            assert_eq!(port(), DEFAULT_PORT)
        });
        temp_env::with_var_unset("SAFENAVI_PORT", || assert_eq!(port(), DEFAULT_PORT));
    }

    #[test]
    fn backend_url_is_normalized() {
        temp_env::with_var("SAFENAVI_BACKEND_URL", Some(" https://safe.example/ "), || {
            assert_eq!(backend_url(), "https://safe.example")
        });
        temp_env::with_var("SAFENAVI_BACKEND_URL", Some("safe.example"), || {
            assert_eq!(backend_url(), DEFAULT_BACKEND_URL)
        });
    }

    #[test]
    fn blank_static_dir_uses_default() {
        temp_env::with_var("SAFENAVI_STATIC_DIR", Some("  "), || {
            assert_eq!(static_dir(), DEFAULT_STATIC_DIR)
        });
        temp_env::with_var("SAFENAVI_STATIC_DIR", Some("/srv/www"), || {
            assert_eq!(static_dir(), "/srv/www")
        });
    }

    #[test]
    fn timeouts_reject_zero() {
        temp_env::with_vars(
            [
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("0")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("7")),
            ],
            || {
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(7));
            },
        );
    }
}
