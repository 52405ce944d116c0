//! The remote-call client.
//!
//! # Design
//! A `LesoonClient` is configured once (prefix, module, provider, transport,
//! envelope format, hook list) and then only reads its state, except for the
//! base URL, which may be resolved from the caller's context on first use and
//! is cached afterwards.
//!
//! A call goes through four steps:
//! 1. `prepare` joins base URL, prefix, module and rule and runs the hooks.
//! 2. The transport sends the request.
//! 3. The status is checked: 503 becomes a busy envelope, other non-2xx
//!    statuses become `ClientError::Status`.
//! 4. The body is decoded (JSON, else text) and, unless the caller opted out
//!    with `load_response(false)`, unwrapped as an envelope.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::envelope::{EnvelopeFormat, LesoonEnvelope, Reply};
use crate::error::{ClientError, RemoteCallError};
use crate::hooks::{PreRequestHook, DEFAULT_HOOKS};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::page::{Dialect, PageParam};

const SERVICE_UNAVAILABLE: u16 = 503;

/// Longest params/result text written to the log.
const LOG_LIMIT: usize = 100;

/// Per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
    /// Return failed envelopes instead of raising.
    pub silent: bool,
    /// Unwrap the body as an envelope. On by default.
    pub load_response: bool,
    pub url_prefix: Option<String>,
    pub module_name: Option<String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            silent: false,
            load_response: true,
            url_prefix: None,
            module_name: None,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Add `key` only when `value` is present.
    pub fn param_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_string(body).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    /// Use `body` verbatim.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn load_response(mut self, load_response: bool) -> Self {
        self.load_response = load_response;
        self
    }

    pub fn url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(url_prefix.into());
        self
    }

    pub fn module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }
}

/// Builder for `LesoonClient`.
pub struct ClientBuilder {
    base_url: Option<String>,
    url_prefix: String,
    module_name: String,
    provider: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    envelope: Arc<dyn EnvelopeFormat>,
    hooks: Vec<PreRequestHook>,
    dialect: Dialect,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            url_prefix: String::new(),
            module_name: String::new(),
            provider: None,
            transport: None,
            envelope: Arc::new(LesoonEnvelope),
            hooks: DEFAULT_HOOKS.to_vec(),
            dialect: Dialect::default(),
        }
    }
}

impl ClientBuilder {
    /// Fixed host. Without one, the host comes from the call context's
    /// configuration on first use.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into()).filter(|url| !url.is_empty());
        self
    }

    pub fn url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = url_prefix.into();
        self
    }

    pub fn module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    /// Provider name looked up in `PROVIDER_URLS`.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn envelope_format(mut self, envelope: Arc<dyn EnvelopeFormat>) -> Self {
        self.envelope = envelope;
        self
    }

    /// Replace the pre-request hook list.
    pub fn hooks(mut self, hooks: Vec<PreRequestHook>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Paging convention used by `LesoonClient::paged`.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn build(self) -> Result<LesoonClient, ClientError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let base_url = OnceLock::new();
        if let Some(url) = self.base_url {
            let _ = base_url.set(url.trim_end_matches('/').to_string());
        }
        Ok(LesoonClient {
            base_url,
            url_prefix: self.url_prefix,
            module_name: self.module_name,
            provider: self.provider,
            transport,
            envelope: self.envelope,
            hooks: self.hooks,
            dialect: self.dialect,
        })
    }
}

#[cfg(feature = "ureq")]
fn default_transport() -> Result<Arc<dyn Transport>, ClientError> {
    let transport: Arc<dyn Transport> = crate::transport::UreqTransport::shared();
    Ok(transport)
}

#[cfg(not(feature = "ureq"))]
fn default_transport() -> Result<Arc<dyn Transport>, ClientError> {
    Err(ClientError::Configuration(
        "no transport given and the `ureq` feature is disabled".to_string(),
    ))
}

/// Client for services speaking the shared envelope convention.
pub struct LesoonClient {
    base_url: OnceLock<String>,
    url_prefix: String,
    module_name: String,
    provider: Option<String>,
    transport: Arc<dyn Transport>,
    envelope: Arc<dyn EnvelopeFormat>,
    hooks: Vec<PreRequestHook>,
    dialect: Dialect,
}

impl fmt::Debug for LesoonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LesoonClient")
            .field("base_url", &self.base_url.get())
            .field("url_prefix", &self.url_prefix)
            .field("module_name", &self.module_name)
            .field("provider", &self.provider)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl LesoonClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// `url_prefix + module_name + rule` with repeated slashes collapsed.
    /// `options` may override prefix and module for one call.
    pub fn build_uri(&self, rule: &str, options: &CallOptions) -> String {
        let prefix = options.url_prefix.as_deref().unwrap_or(&self.url_prefix);
        let module = options.module_name.as_deref().unwrap_or(&self.module_name);
        collapse_slashes(&format!("{prefix}{module}{rule}"))
    }

    /// The host for this client: the builder's, else the context
    /// configuration's (provider URL first, then `BASE_URL`).
    pub fn base_url(&self, ctx: &dyn AppContext) -> Result<&str, ClientError> {
        if let Some(url) = self.base_url.get() {
            return Ok(url.as_str());
        }
        let resolved = ctx
            .config()
            .and_then(|config| config.resolve(self.provider.as_deref()))
            .ok_or_else(|| {
                ClientError::Configuration(format!(
                    "no base URL for client (prefix {:?}, provider {:?}): set one on the builder or configure BASE_URL",
                    self.url_prefix, self.provider
                ))
            })?;
        Ok(self
            .base_url
            .get_or_init(|| resolved.trim_end_matches('/').to_string())
            .as_str())
    }

    /// Build the outbound request for a call without sending it.
    pub fn prepare(
        &self,
        ctx: &dyn AppContext,
        method: HttpMethod,
        rule: &str,
        options: &CallOptions,
    ) -> Result<HttpRequest, ClientError> {
        let url = join_url(self.base_url(ctx)?, &self.build_uri(rule, options));
        let mut request = HttpRequest {
            method,
            url,
            headers: options.headers.clone(),
            query: options.params.clone(),
            body: options.body.clone(),
        };
        for hook in &self.hooks {
            hook(&mut request, ctx)?;
        }
        Ok(request)
    }

    pub fn request(
        &self,
        ctx: &dyn AppContext,
        method: HttpMethod,
        rule: &str,
        options: CallOptions,
    ) -> Result<Reply, ClientError> {
        let request = self.prepare(ctx, method, rule, &options)?;
        let params = truncate(&describe_params(&request), LOG_LIMIT);
        info!(%method, url = %request.url, %params, "remote call");

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(source) => {
                error!(%method, url = %request.url, %params, error = %source, "remote call failed");
                return Err(ClientError::Transport {
                    method,
                    url: request.url,
                    source,
                });
            }
        };

        if response.status == SERVICE_UNAVAILABLE {
            warn!(%method, url = %request.url, "remote service unavailable, answering busy");
            return Ok(Reply::Envelope(self.envelope.busy()));
        }
        if !response.is_success() {
            error!(%method, url = %request.url, %params, status = response.status, "remote call failed");
            return Err(ClientError::Status {
                request: Box::new(request),
                response: Box::new(response),
            });
        }

        let reply = Reply::decode(&response.body);
        debug!(%method, url = %request.url, result = %truncate(&reply.to_string(), LOG_LIMIT), "remote call returned");

        if !options.load_response {
            return Ok(reply);
        }
        self.unwrap_envelope(reply, request, response, options.silent)
    }

    fn unwrap_envelope(
        &self,
        reply: Reply,
        request: HttpRequest,
        response: HttpResponse,
        silent: bool,
    ) -> Result<Reply, ClientError> {
        let body = match reply {
            Reply::Json(value) if self.envelope.detect(&value) => value,
            other => {
                if silent {
                    warn!(url = %request.url, "response is not an envelope, returning it as is");
                    return Ok(other);
                }
                error!(method = %request.method, url = %request.url, "response is not an envelope");
                return Err(RemoteCallError::unexpected("response is not an envelope", request, response).into());
            }
        };

        let envelope = match self.envelope.parse(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(method = %request.method, url = %request.url, error = %e, "malformed envelope");
                return Err(RemoteCallError::unexpected(format!("malformed envelope: {e}"), request, response).into());
            }
        };

        if self.envelope.is_success(&envelope) {
            return Ok(Reply::Envelope(envelope));
        }
        if silent {
            warn!(url = %request.url, code = %envelope.code, msg = %envelope.msg, "remote call declined");
            return Ok(Reply::Envelope(envelope));
        }
        error!(
            method = %request.method,
            url = %request.url,
            params = %truncate(&describe_params(&request), LOG_LIMIT),
            code = %envelope.code,
            msg = %envelope.msg,
            "remote call declined"
        );
        Err(RemoteCallError::declined(envelope, request, response).into())
    }

    pub fn get(&self, ctx: &dyn AppContext, rule: &str, options: CallOptions) -> Result<Reply, ClientError> {
        self.request(ctx, HttpMethod::Get, rule, options)
    }

    pub fn post(&self, ctx: &dyn AppContext, rule: &str, options: CallOptions) -> Result<Reply, ClientError> {
        self.request(ctx, HttpMethod::Post, rule, options)
    }

    pub fn put(&self, ctx: &dyn AppContext, rule: &str, options: CallOptions) -> Result<Reply, ClientError> {
        self.request(ctx, HttpMethod::Put, rule, options)
    }

    pub fn delete(&self, ctx: &dyn AppContext, rule: &str, options: CallOptions) -> Result<Reply, ClientError> {
        self.request(ctx, HttpMethod::Delete, rule, options)
    }

    /// Paged GET in `dialect`'s convention. Envelope unwrapping is forced on.
    pub fn page_get(
        &self,
        ctx: &dyn AppContext,
        dialect: Dialect,
        rule: &str,
        page: &PageParam,
        mut options: CallOptions,
    ) -> Result<Reply, ClientError> {
        let rule = dialect.apply(rule, page, &mut options.params)?;
        options.load_response = true;
        self.get(ctx, &rule, options)
    }

    pub fn python_page_get(
        &self,
        ctx: &dyn AppContext,
        rule: &str,
        page: &PageParam,
        options: CallOptions,
    ) -> Result<Reply, ClientError> {
        self.page_get(ctx, Dialect::Python, rule, page, options)
    }

    pub fn java_page_get(
        &self,
        ctx: &dyn AppContext,
        rule: &str,
        page: &PageParam,
        options: CallOptions,
    ) -> Result<Reply, ClientError> {
        self.page_get(ctx, Dialect::Java, rule, page, options)
    }

    /// Paged GET in the client's own dialect.
    pub fn paged(
        &self,
        ctx: &dyn AppContext,
        rule: &str,
        page: &PageParam,
        options: CallOptions,
    ) -> Result<Reply, ClientError> {
        self.page_get(ctx, self.dialect, rule, page, options)
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}

fn join_url(base: &str, uri: &str) -> String {
    let base = base.trim_end_matches('/');
    if uri.is_empty() || uri.starts_with('/') {
        format!("{base}{uri}")
    } else {
        format!("{base}/{uri}")
    }
}

fn describe_params(request: &HttpRequest) -> String {
    match &request.body {
        Some(body) => format!("{:?} {body}", request.query),
        None => format!("{:?}", request.query),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
