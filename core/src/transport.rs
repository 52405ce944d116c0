//! Blocking `Transport` backed by `ureq`.
//!
//! One `ureq::Agent` holds the connection pool. Agents are cheap to clone
//! and safe to share between threads, so a single `UreqTransport` is meant
//! to serve every client in the process (see `shared`).

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Bodies are read in full by default; unpaged queries can be large.
pub const UNLIMITED_BODY: u64 = u64::MAX;

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    /// `timeout` bounds the whole round-trip; `None` means no limit.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(timeout)
            // Status codes are interpreted by the client, not the transport.
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::from_agent(agent)
    }

    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            body_limit: UNLIMITED_BODY,
        }
    }

    /// Reject response bodies larger than `limit` bytes.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    /// The process-wide transport handed to clients built without one.
    pub fn shared() -> Arc<UreqTransport> {
        static SHARED: OnceLock<Arc<UreqTransport>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(UreqTransport::default())).clone()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), request).call(),
            HttpMethod::Delete => match body {
                Some(body) => prepare(self.agent.delete(url), request)
                    .force_send_body()
                    .send(body.as_bytes()),
                None => prepare(self.agent.delete(url), request).call(),
            },
            HttpMethod::Post => match body {
                Some(body) => prepare(self.agent.post(url), request).send(body.as_bytes()),
                None => prepare(self.agent.post(url), request).send_empty(),
            },
            HttpMethod::Put => match body {
                Some(body) => prepare(self.agent.put(url), request).send(body.as_bytes()),
                None => prepare(self.agent.put(url), request).send_empty(),
            },
        };

        convert_response(result.map_err(map_error)?, self.body_limit)
    }
}

fn map_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound => TransportError::Connection("host not found".to_owned()),
        ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
        ureq::Error::BodyExceedsLimit(limit) => {
            TransportError::Other(format!("response body exceeds the {limit} byte limit"))
        }
        e => TransportError::Other(e.to_string()),
    }
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key.as_str(), value.as_str());
    }
    builder
}

fn convert_response(
    mut response: ureq::http::Response<ureq::Body>,
    body_limit: u64,
) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_string()
        .map_err(map_error)?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
