use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Query, Request},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

pub const SUCCESS_CODE: &str = "0";
pub const SERVICE_ERROR_CODE: &str = "5000";

/// What the echo endpoints saw of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub data: Option<Value>,
    pub headers: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: String,
    pub flag: bool,
    pub msg: String,
    pub result: Value,
}

impl Envelope {
    pub fn success(result: Value) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            flag: true,
            msg: "请求成功".to_string(),
            result,
        }
    }

    pub fn failure(code: &str, msg: &str) -> Self {
        Self {
            code: code.to_string(),
            flag: false,
            msg: msg.to_string(),
            result: Value::Null,
        }
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/simple", get(echo).post(echo).put(echo).delete(echo))
        .route("/simple/", get(echo).post(echo).put(echo).delete(echo))
        .route("/simple/test", get(text))
        .route("/simple/standard", get(standard))
        .route("/simple/serviceException", get(service_exception))
        .route("/simple/httpException", get(http_exception))
        .route("/simple/serviceUnavailable", get(service_unavailable))
        .route("/simple/records", get(enveloped_echo))
        .route("/simple/records/page", get(enveloped_echo))
        .layer(middleware::from_fn(log_request))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    tracing::info!(%method, %uri, status = response.status().as_u16(), "handled");
    response
}

fn original_request(
    method: Method,
    uri: Uri,
    params: BTreeMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Echo {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();
    Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        params,
        data: serde_json::from_slice(&body).ok(),
        headers,
    }
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    Json(original_request(method, uri, params, headers, body))
}

async fn enveloped_echo(
    method: Method,
    uri: Uri,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Envelope> {
    let echo = original_request(method, uri, params, headers, body);
    Json(Envelope::success(serde_json::to_value(echo).unwrap_or(Value::Null)))
}

async fn text(Query(params): Query<BTreeMap<String, String>>) -> String {
    format!("echo :{}", params.get("text").map(String::as_str).unwrap_or(""))
}

async fn standard() -> Json<Envelope> {
    Json(Envelope::success(Value::Null))
}

async fn service_exception() -> Json<Envelope> {
    Json(Envelope::failure(SERVICE_ERROR_CODE, "服务异常"))
}

async fn http_exception() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn service_unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "no healthy upstream")
}
