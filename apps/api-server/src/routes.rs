//! HTTP surface: `POST /shorten` and `GET /:short_url`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain::codegen::RandomCodeGenerator;
use domain::service::{RedirectService, ShortenService};
use domain::{CoreError, LinkStore};
use http_common::{
    json_err, ShortenRequest, MSG_INVALID_BODY, MSG_NOT_FOUND, MSG_RESOLVE_FAILED,
    MSG_SHORTEN_FAILED,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{error, info, warn};

pub type SharedStore = Arc<dyn LinkStore>;

/// Path segments taken by static routes; a link with one of these codes
/// could never be followed.
pub const RESERVED_CODES: &[&str] = &["shorten"];

/// Bytes a `Location` header cannot carry, plus the ones browsers expect
/// escaped in a URL. `%` is left alone so existing escapes survive.
const LOCATION_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`');

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<ShortenService<SharedStore, RandomCodeGenerator>>,
    redirector: Arc<RedirectService<SharedStore>>,
}

impl AppState {
    pub fn new(store: SharedStore, generator: RandomCodeGenerator, max_attempts: u32) -> Self {
        let generator = route_safe(generator);
        Self {
            shortener: Arc::new(
                ShortenService::new(store.clone(), generator).with_max_attempts(max_attempts),
            ),
            redirector: Arc::new(RedirectService::new(store)),
        }
    }
}

/// Keep `generator` from producing codes that collide with static routes.
pub fn route_safe(generator: RandomCodeGenerator) -> RandomCodeGenerator {
    generator.with_reserved(RESERVED_CODES.iter().copied())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/shorten", post(shorten_link).fallback(not_found))
        .route("/:short_url", get(follow_link))
        .fallback(not_found)
        .with_state(state)
}

/// Percent-encode a stored url for use as a `Location` value. Non-ASCII
/// bytes are always escaped, so the result is visible ASCII.
pub fn location_value(full: &str) -> String {
    utf8_percent_encode(full, LOCATION_ENCODE).to_string()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json_err(MSG_NOT_FOUND))).into_response()
}

async fn shorten_link(
    State(state): State<AppState>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(err = %rejection.body_text(), "shorten bad body");
            return (rejection.status(), Json(json_err(MSG_INVALID_BODY))).into_response();
        }
    };

    match state.shortener.shorten(&body.full_url) {
        Ok(link) => {
            info!(short = %link.short, full = %link.full, "shorten ok");
            (StatusCode::OK, Json(link)).into_response()
        }
        Err(e) => {
            error!(err = ?e, "shorten error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json_err(MSG_SHORTEN_FAILED)),
            )
                .into_response()
        }
    }
}

async fn follow_link(State(state): State<AppState>, Path(short_url): Path<String>) -> Response {
    match state.redirector.resolve(&short_url) {
        Ok(link) => match HeaderValue::try_from(location_value(&link.full)) {
            Ok(location) => {
                info!(short = %link.short, redirect_to = %link.full, clicks = link.clicks, "resolve ok");
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Err(e) => {
                error!(short = %link.short, err = %e, "encoded url is not a valid Location");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json_err(MSG_RESOLVE_FAILED)),
                )
                    .into_response()
            }
        },
        Err(CoreError::NotFound) => {
            warn!(short = %short_url, "resolve 404");
            (StatusCode::NOT_FOUND, Json(json_err(MSG_NOT_FOUND))).into_response()
        }
        Err(e) => {
            error!(short = %short_url, err = ?e, "resolve error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json_err(MSG_RESOLVE_FAILED)),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use domain::adapters::memory_store::InMemoryStore;
    use domain::{Link, ShortCode, Upsert};
    use tower::util::ServiceExt;

    struct DownStore;

    impl LinkStore for DownStore {
        fn find_by_url(&self, _: &str) -> Result<Option<Link>, CoreError> {
            Err(CoreError::Store("unreachable".into()))
        }
        fn find_by_code(&self, _: &ShortCode) -> Result<Option<Link>, CoreError> {
            Err(CoreError::Store("unreachable".into()))
        }
        fn insert(&self, _: &str, _: &ShortCode) -> Result<Link, CoreError> {
            Err(CoreError::Store("unreachable".into()))
        }
        fn insert_if_absent(&self, _: &str, _: &ShortCode) -> Result<Upsert, CoreError> {
            Err(CoreError::Store("unreachable".into()))
        }
        fn increment_clicks(&self, _: &ShortCode) -> Result<Option<Link>, CoreError> {
            Err(CoreError::Store("unreachable".into()))
        }
    }

    fn app_with(store: SharedStore) -> Router {
        router(AppState::new(store, RandomCodeGenerator::default(), 5))
    }

    fn shorten_req(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/shorten")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn shorten_returns_link_record() {
        let router = app_with(Arc::new(InMemoryStore::new()));
        let resp = router
            .oneshot(shorten_req(r#"{"fullUrl":"example.com"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["full"], "http://example.com");
        assert_eq!(body["clicks"], 0);
        assert_eq!(body["short"].as_str().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn shorten_twice_returns_same_code() {
        let store = Arc::new(InMemoryStore::new());
        let router = app_with(store.clone());
        let first = json_body(
            router
                .clone()
                .oneshot(shorten_req(r#"{"fullUrl":"example.com"}"#))
                .await
                .unwrap(),
        )
        .await;
        let second = json_body(
            router
                .oneshot(shorten_req(r#"{"fullUrl":"http://example.com"}"#))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first["short"], second["short"]);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn redirect_flow_counts_clicks() {
        let store = Arc::new(InMemoryStore::new());
        let router = app_with(store.clone());
        let created = json_body(
            router
                .clone()
                .oneshot(shorten_req(r#"{"fullUrl":"https://example.com/docs"}"#))
                .await
                .unwrap(),
        )
        .await;
        let short = created["short"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let resp = router
                .clone()
                .oneshot(get_req(&format!("/{short}")))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::FOUND);
            assert_eq!(
                resp.headers().get(header::LOCATION).unwrap(),
                "https://example.com/docs"
            );
        }

        let code = ShortCode::parse(short).unwrap();
        assert_eq!(store.find_by_code(&code).unwrap().unwrap().clicks, 2);
    }

    #[tokio::test]
    async fn unknown_code_is_404_with_error_body() {
        let router = app_with(Arc::new(InMemoryStore::new()));
        let resp = router.oneshot(get_req("/doesnotexist")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_NOT_FOUND}));
    }

    #[tokio::test]
    async fn store_failure_is_500_on_both_routes() {
        let router = app_with(Arc::new(DownStore));

        let resp = router
            .clone()
            .oneshot(shorten_req(r#"{"fullUrl":"example.com"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_SHORTEN_FAILED}));

        let resp = router.oneshot(get_req("/abc1234")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_RESOLVE_FAILED}));
    }

    #[test]
    fn location_value_escapes_header_breaking_bytes() {
        assert_eq!(location_value("http://a.com/x\ry"), "http://a.com/x%0Dy");
        assert_eq!(location_value("http://a.com/\x7f"), "http://a.com/%7F");
        assert_eq!(location_value("http://a.com/a b"), "http://a.com/a%20b");
        assert_eq!(location_value("http://köln.de"), "http://k%C3%B6ln.de");
        // reserved and already-escaped characters pass through
        assert_eq!(
            location_value("https://a.com/p?q=1&r=%20#frag"),
            "https://a.com/p?q=1&r=%20#frag"
        );
    }

    #[tokio::test]
    async fn control_bytes_in_target_are_encoded_in_redirect() {
        let store = Arc::new(InMemoryStore::new());
        let cases = [
            ("cr", "http://a.com/x\ry", "http://a.com/x%0Dy"),
            ("lf", "http://a.com/\nb", "http://a.com/%0Ab"),
            ("del", "http://a.com/\x7f", "http://a.com/%7F"),
            ("koln", "http://köln.de/", "http://k%C3%B6ln.de/"),
        ];
        for (code, full, _) in cases {
            store.insert(full, &ShortCode::parse(code).unwrap()).unwrap();
        }
        let router = app_with(store.clone());

        for (code, _, location) in cases {
            let resp = router
                .clone()
                .oneshot(get_req(&format!("/{code}")))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::FOUND, "code {code}");
            assert_eq!(resp.headers().get(header::LOCATION).unwrap(), location);
            let code = ShortCode::parse(code).unwrap();
            assert_eq!(store.find_by_code(&code).unwrap().unwrap().clicks, 1);
        }
    }

    #[tokio::test]
    async fn bad_shorten_bodies_get_json_error() {
        let store = Arc::new(InMemoryStore::new());
        let router = app_with(store.clone());

        for body in [r#"{"url":"x"}"#, "not json", r#"{"fullUrl":7}"#] {
            let resp = router.clone().oneshot(shorten_req(body)).await.unwrap();
            assert!(resp.status().is_client_error(), "body {body}");
            assert_eq!(
                resp.headers().get(header::CONTENT_TYPE).unwrap(),
                "application/json"
            );
            assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_INVALID_BODY}));
        }

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/shorten")
            .body(Body::from(r#"{"fullUrl":"example.com"}"#))
            .unwrap();
        let resp = router.oneshot(no_content_type).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_INVALID_BODY}));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn get_shorten_is_404_with_error_body() {
        let router = app_with(Arc::new(InMemoryStore::new()));
        let resp = router.oneshot(get_req("/shorten")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_NOT_FOUND}));
    }

    #[tokio::test]
    async fn unrouted_paths_are_404_with_error_body() {
        let router = app_with(Arc::new(InMemoryStore::new()));
        let resp = router.oneshot(get_req("/a/b")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await, serde_json::json!({"error": MSG_NOT_FOUND}));
    }

    #[test]
    fn route_names_are_reserved_from_generation() {
        let generator = route_safe(RandomCodeGenerator::default());
        for name in RESERVED_CODES {
            assert!(generator.is_reserved(name), "{name}");
        }
        assert_eq!(generator.length(), 7);
    }
}
