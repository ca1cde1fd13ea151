use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::config::BACKEND_PAGES;
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState, static_dir: &str) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(static_dir)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let mut app = Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/{*path}", any(routes::proxy::forward));
    for page in BACKEND_PAGES {
        app = app.route(page, any(routes::proxy::forward));
    }

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/img/") || path.starts_with("/geojson/") || path.starts_with("/css/") {
        return Some("public, max-age=86400");
    }

    None
}

fn is_hashed_bundle_asset(path: &str) -> bool {
    let file = Path::new(path);
    let Some(ext) = file.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }
    let Some(filename) = file.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Minimal stand-in for the backend, bound to an ephemeral port.
    async fn spawn_backend() -> String {
        let backend = Router::new()
            .route(
                "/api/board/list",
                get(|request: Request| async move {
                    let cookie = request
                        .headers()
                        .get(header::COOKIE)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("")
                        .to_owned();
                    let query = request.uri().query().unwrap_or("").to_owned();
                    format!("{query}|{cookie}")
                }),
            )
            .route(
                "/login",
                axum::routing::post(|| async {
                    Response::builder()
                        .status(StatusCode::FOUND)
                        .header(header::LOCATION, "/")
                        .header(header::SET_COOKIE, "JSESSIONID=fresh; Path=/")
                        .body(Body::empty())
                        .unwrap()
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn immutable_cache_for_hashed_bundle_assets() {
        assert_eq!(
            cache_control_for_path("/safenavi-client-71578f6b278221f3_bg.wasm"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            cache_control_for_path("/input-a93762ff3bf6d63a.css"),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn short_cache_for_unhashed_static_assets() {
        assert_eq!(
            cache_control_for_path("/img/marker_fire.png"),
            Some("public, max-age=86400")
        );
        assert_eq!(
            cache_control_for_path("/geojson/sido.json"),
            Some("public, max-age=86400")
        );
    }

    #[test]
    fn no_cache_header_override_for_html() {
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
        assert_eq!(cache_control_for_path("/app.js"), None);
    }

    #[tokio::test]
    async fn health_is_served_locally() {
        let state = AppState::new("http://127.0.0.1:1").unwrap();
        let response = build_app(state, "client/dist")
            .oneshot(request(Method::GET, "/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn unreachable_backend_answers_bad_gateway() {
        let state = AppState::new("http://127.0.0.1:1").unwrap();
        let counters = state.observability.clone();
        let response = build_app(state, "client/dist")
            .oneshot(request(Method::GET, "/api/board/list"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.proxied_requests_total, 1);
        assert_eq!(snapshot.upstream_errors_total, 1);
    }

    #[tokio::test]
    async fn api_requests_reach_the_backend_with_query_and_cookie() {
        let state = AppState::new(spawn_backend().await).unwrap();
        let mut req = request(Method::GET, "/api/board/list?page=2");
        req.headers_mut()
            .insert(header::COOKIE, HeaderValue::from_static("JSESSIONID=abc"));

        let response = build_app(state, "client/dist").oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "page=2|JSESSIONID=abc");
    }

    #[tokio::test]
    async fn backend_redirects_are_passed_to_the_browser() {
        let state = AppState::new(spawn_backend().await).unwrap();
        let response = build_app(state, "client/dist")
            .oneshot(request(Method::POST, "/login"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }
}
