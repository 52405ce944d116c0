//! The ambient context a call reads its token, inherited headers and
//! configuration from.
//!
//! # Design
//! Nothing is looked up from globals. Every call takes an `&dyn AppContext`
//! supplied by the caller, typically built from the inbound request being
//! served. Outside of request handling a context still has to mint system
//! tokens, so `system_token` is the only required method.

use std::error::Error;

use crate::config::ClientConfig;
use crate::http::find_header;

/// The inbound request currently being served, as far as the client cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub token: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl InboundRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Lookups the pre-request hooks perform.
pub trait AppContext: Send + Sync {
    /// The active inbound request, if any.
    fn inbound(&self) -> Option<&InboundRequest> {
        None
    }

    /// Application configuration, if running inside an application.
    fn config(&self) -> Option<&ClientConfig> {
        None
    }

    /// Mint a system-level token for calls made without an inbound token.
    fn system_token(&self) -> String;

    /// Let an external tracer add its own headers (e.g. B3).
    fn inject_trace_headers(
        &self,
        _headers: &mut Vec<(String, String)>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// An `AppContext` built from fixed values.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    system_token: String,
    inbound: Option<InboundRequest>,
    config: Option<ClientConfig>,
}

impl StaticContext {
    pub fn new(system_token: impl Into<String>) -> Self {
        Self {
            system_token: system_token.into(),
            inbound: None,
            config: None,
        }
    }

    pub fn with_inbound(mut self, inbound: InboundRequest) -> Self {
        self.inbound = Some(inbound);
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }
}

impl AppContext for StaticContext {
    fn inbound(&self) -> Option<&InboundRequest> {
        self.inbound.as_ref()
    }

    fn config(&self) -> Option<&ClientConfig> {
        self.config.as_ref()
    }

    fn system_token(&self) -> String {
        self.system_token.clone()
    }
}
