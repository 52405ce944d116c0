//! Error types for the remote-call client.
//!
//! # Design
//! Configuration and transport failures always surface as errors. Envelope
//! failures (`RemoteCall`) surface unless the caller asked for a silent call,
//! in which case the failed envelope is returned instead. A 503 never
//! reaches this module: the client turns it into a busy envelope.

use thiserror::Error;

use crate::envelope::Envelope;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Errors returned by `LesoonClient` calls.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No usable base URL, or an unusable transport setup.
    #[error("client configuration error: {0}")]
    Configuration(String),

    /// The transport could not complete the round-trip.
    #[error("transport error on {method} {url}: {source}")]
    Transport {
        method: HttpMethod,
        url: String,
        #[source]
        source: TransportError,
    },

    /// The remote returned a non-2xx status other than 503.
    #[error("HTTP {} from {} {}", .response.status, .request.method, .request.url)]
    Status {
        request: Box<HttpRequest>,
        response: Box<HttpResponse>,
    },

    /// The envelope reported failure or the body was not an envelope.
    #[error(transparent)]
    RemoteCall(#[from] RemoteCallError),

    /// A request payload or a typed result could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ClientError {
    /// The outbound request, when the failure happened after dispatch.
    pub fn request(&self) -> Option<&HttpRequest> {
        match self {
            ClientError::Status { request, .. } => Some(request.as_ref()),
            ClientError::RemoteCall(e) => e.request.as_deref(),
            _ => None,
        }
    }

    /// The remote-call error code for failures of the call itself:
    /// `3001` for transport errors, non-2xx statuses and declined envelopes.
    /// Local setup and (de)serialization failures have none.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ClientError::Transport { .. } | ClientError::Status { .. } => Some(RemoteCallError::CODE),
            ClientError::RemoteCall(e) => Some(e.code),
            ClientError::Configuration(_) | ClientError::Serialization(_) => None,
        }
    }

    /// The raw response, when one was received.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ClientError::Status { response, .. } => Some(response.as_ref()),
            ClientError::RemoteCall(e) => e.response.as_deref(),
            _ => None,
        }
    }
}

/// Failures raised by a `Transport` implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Other(String),
}

/// A remote service answered, but not with a successful envelope.
///
/// `envelope` is `None` when the body had no envelope shape at all. The
/// request/response pair is present whenever the error came out of a call.
#[derive(Error, Debug)]
#[error("remote call error [{code}]: {msg}")]
pub struct RemoteCallError {
    pub code: &'static str,
    pub msg: String,
    pub envelope: Option<Envelope>,
    pub request: Option<Box<HttpRequest>>,
    pub response: Option<Box<HttpResponse>>,
}

impl RemoteCallError {
    pub const CODE: &'static str = "3001";
    pub const DEFAULT_MSG: &'static str = "远程调用异常";

    /// A failed envelope with no call attached to it.
    pub fn from_envelope(envelope: Envelope) -> Self {
        let msg = if envelope.msg.is_empty() {
            Self::DEFAULT_MSG.to_string()
        } else {
            envelope.msg.clone()
        };
        Self {
            code: Self::CODE,
            msg,
            envelope: Some(envelope),
            request: None,
            response: None,
        }
    }

    pub(crate) fn declined(envelope: Envelope, request: HttpRequest, response: HttpResponse) -> Self {
        Self::from_envelope(envelope).with_call(request, response)
    }

    pub(crate) fn unexpected(msg: impl Into<String>, request: HttpRequest, response: HttpResponse) -> Self {
        Self {
            code: Self::CODE,
            msg: msg.into(),
            envelope: None,
            request: None,
            response: None,
        }
        .with_call(request, response)
    }

    fn with_call(mut self, request: HttpRequest, response: HttpResponse) -> Self {
        self.request = Some(Box::new(request));
        self.response = Some(Box::new(response));
        self
    }

    /// The code the remote envelope reported, if there was one.
    pub fn remote_code(&self) -> Option<&str> {
        self.envelope.as_ref().map(|e| e.code.as_str())
    }
}
