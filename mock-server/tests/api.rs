use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Envelope};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_get_returns_method_and_params() {
    let resp = app().oneshot(get("/simple?text=client-get")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.params["text"], "client-get");
    assert!(echo.data.is_none());
}

#[tokio::test]
async fn echo_round_trips_json_body_for_every_verb() {
    for method in ["POST", "PUT", "DELETE"] {
        let resp = app()
            .oneshot(json_request(method, "/simple?text=x", r#"{"a":1}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
        assert_eq!(echo.data, Some(serde_json::json!({"a": 1})), "{method}");
        assert_eq!(echo.headers["content-type"], "application/json");
    }
}

#[tokio::test]
async fn echo_reports_custom_headers_lower_cased() {
    let req = Request::builder()
        .uri("/simple/")
        .header("User-Speciality", "userId=111")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.headers["user-speciality"], "userId=111");
}

#[tokio::test]
async fn text_endpoint_is_not_json() {
    let resp = app().oneshot(get("/simple/test?text=hi")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"echo :hi");
}

// --- envelopes ---

#[tokio::test]
async fn standard_returns_success_envelope() {
    let resp = app().oneshot(get("/simple/standard")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope = body_json(resp).await;
    assert_eq!(envelope.code, "0");
    assert!(envelope.flag);
}

#[tokio::test]
async fn service_exception_returns_failed_envelope_with_200() {
    let resp = app().oneshot(get("/simple/serviceException")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope = body_json(resp).await;
    assert_eq!(envelope.code, "5000");
    assert!(!envelope.flag);
}

#[tokio::test]
async fn records_wrap_the_echo_in_an_envelope() {
    let resp = app()
        .oneshot(get("/simple/records/page?page.pn=2&search.status=open"))
        .await
        .unwrap();

    let envelope: Envelope = body_json(resp).await;
    let echo: Echo = serde_json::from_value(envelope.result).unwrap();
    assert_eq!(echo.path, "/simple/records/page");
    assert_eq!(echo.params["page.pn"], "2");
    assert_eq!(echo.params["search.status"], "open");
}

// --- failures ---

#[tokio::test]
async fn http_exception_is_404() {
    let resp = app().oneshot(get("/simple/httpException")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn service_unavailable_is_503() {
    let resp = app().oneshot(get("/simple/serviceUnavailable")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app().oneshot(get("/other")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
