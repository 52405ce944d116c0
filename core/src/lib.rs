//! Remote-call client for services sharing the Lesoon envelope convention.
//!
//! # Overview
//! `LesoonClient` turns `(method, rule, options)` into a decoded `Reply`:
//! it joins host, URL prefix, module name and rule, attaches the JSON
//! content type, the caller's token, routing and tracing headers, sends the
//! request through a `Transport`, and unwraps the `{code, flag, msg, result}`
//! envelope the callee answers with.
//!
//! # Design
//! - Ambient state (inbound token and headers, app config, system token
//!   minting) is read from an `AppContext` passed into every call.
//! - Cross-cutting request mutation is an ordered list of plain hook
//!   functions (`hooks`), and envelope handling is a strategy
//!   (`EnvelopeFormat`).
//! - `silent` calls return failed envelopes instead of raising; a 503 always
//!   becomes a "busy, retry later" success envelope.
//! - Python and Java backends page differently; `page::Dialect` maps a
//!   neutral `PageParam` onto each convention.
//! - `UreqTransport` (feature `ureq`, default) is the blocking transport
//!   shared by every client unless one is supplied.

pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod http;
pub mod id_center;
pub mod page;
#[cfg(feature = "ureq")]
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::{CallOptions, ClientBuilder, LesoonClient};
pub use config::ClientConfig;
pub use context::{AppContext, InboundRequest, StaticContext};
pub use envelope::{Envelope, EnvelopeFormat, LesoonEnvelope, Reply};
pub use error::{ClientError, RemoteCallError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use id_center::IdCenterClient;
pub use page::{Dialect, PageParam};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
