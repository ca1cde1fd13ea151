use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::config::{FEED_STREAM_PATH, MAX_PROXY_BODY_BYTES};
use crate::state::AppState;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Request headers sent upstream. Host and length are recomputed by the client.
fn forwarded_headers(incoming: &HeaderMap) -> HeaderMap {
    incoming
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name) && *name != header::HOST && *name != header::CONTENT_LENGTH
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn relayed_headers(upstream: &HeaderMap) -> HeaderMap {
    upstream
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn upstream_url(backend: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{backend}{path_and_query}")
}

/// Server-sent event streams stay open indefinitely and must not get the total timeout.
fn is_feed_stream(path: &str, headers: &HeaderMap) -> bool {
    path == FEED_STREAM_PATH
        || headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// Forwards the request to the backend and streams the answer back unchanged.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_owned();
    let target = upstream_url(&state.backend_url, &parts.uri);
    let streaming = is_feed_stream(&path, &parts.headers);

    let body = match to_bytes(body, MAX_PROXY_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%path, error = %e, "request body rejected");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    state.observability.record_proxied_request();
    let mut upstream = state
        .http_client
        .request(parts.method, &target)
        .headers(forwarded_headers(&parts.headers))
        .body(body);
    if streaming {
        state.observability.record_feed_stream();
    } else {
        upstream = upstream.timeout(state.request_timeout);
    }

    match upstream.send().await {
        Ok(response) => relay(response),
        Err(e) => {
            state.observability.record_upstream_error();
            warn!(%path, error = %e, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "backend unavailable").into_response()
        }
    }
}

fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = relayed_headers(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn upstream_url_keeps_query() {
        let uri: Uri = "/api/facilities?type=fire&minLat=37.1".parse().unwrap();
        assert_eq!(
            upstream_url("http://backend:8080", &uri),
            "http://backend:8080/api/facilities?type=fire&minLat=37.1"
        );
    }

    #[test]
    fn hop_by_hop_headers_are_not_forwarded() {
        let mut incoming = HeaderMap::new();
        incoming.insert(header::HOST, HeaderValue::from_static("localhost:8081"));
        incoming.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        incoming.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        incoming.insert(header::COOKIE, HeaderValue::from_static("JSESSIONID=abc"));
        incoming.insert(
            HeaderName::from_static("keep-alive"),
            HeaderValue::from_static("timeout=5"),
        );

        let forwarded = forwarded_headers(&incoming);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[header::COOKIE], "JSESSIONID=abc");
    }

    #[test]
    fn relayed_headers_keep_cookies_and_type() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::SET_COOKIE, HeaderValue::from_static("JSESSIONID=xyz"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let relayed = relayed_headers(&upstream);
        assert_eq!(relayed.len(), 2);
        assert!(relayed.contains_key(header::SET_COOKIE));
    }

    #[test]
    fn feed_stream_detection() {
        let empty = HeaderMap::new();
        assert!(is_feed_stream(FEED_STREAM_PATH, &empty));
        assert!(!is_feed_stream("/api/board/list", &empty));

        let mut accept = HeaderMap::new();
        accept.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        assert!(is_feed_stream("/api/other/stream", &accept));
    }
}
