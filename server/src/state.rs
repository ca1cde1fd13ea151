use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::{USER_AGENT, upstream_connect_timeout, upstream_http_timeout};

#[derive(Clone)]
pub struct AppState {
    /// Shared upstream client. Carries only the connect timeout so feed streams can stay open.
    pub http_client: reqwest::Client,
    pub backend_url: Arc<str>,
    /// Total timeout applied to every non-streaming upstream request.
    pub request_timeout: Duration,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    proxied_requests_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    feed_streams_opened_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub proxied_requests_total: u64,
    pub upstream_errors_total: u64,
    pub feed_streams_opened_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            proxied_requests_total: self.proxied_requests_total.load(Ordering::Relaxed),
            upstream_errors_total: self.upstream_errors_total.load(Ordering::Relaxed),
            feed_streams_opened_total: self.feed_streams_opened_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_proxied_request(&self) {
        self.proxied_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_stream(&self) {
        self.feed_streams_opened_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(backend_url: impl Into<Arc<str>>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(upstream_connect_timeout())
            // Login and signup answer with redirects the browser must see.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http_client,
            backend_url: backend_url.into(),
            request_timeout: upstream_http_timeout(),
            observability: Arc::new(ObservabilityCounters::default()),
        })
    }
}
