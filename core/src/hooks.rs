//! Pre-request hooks: the ordered mutations applied to every outbound
//! request before it reaches the transport.
//!
//! # Design
//! Each cross-cutting concern is one plain function. A client runs its hook
//! list in order; the default list is `DEFAULT_HOOKS`. Clients that must not
//! attach tokens (or must attach something extra) swap the list instead of
//! subclassing.

use tracing::warn;

use crate::context::AppContext;
use crate::error::ClientError;
use crate::http::HttpRequest;

pub type PreRequestHook = fn(&mut HttpRequest, &dyn AppContext) -> Result<(), ClientError>;

/// Content type, token, inherited headers, trace headers, in that order.
pub const DEFAULT_HOOKS: &[PreRequestHook] = &[set_content_type, set_token, inherit_headers, propagate_trace];

/// Header carrying the caller's token.
pub const TOKEN_HEADER: &str = "token";

/// Custom headers copied from the inbound request (gray-release routing).
pub const INHERITED_HEADERS: &[&str] = &["user-speciality"];

/// Tracing headers copied from the inbound request, generic and Istio/B3.
pub const TRACE_HEADERS: &[&str] = &[
    "x-request-id",
    "x-b3-traceid",
    "x-b3-spanid",
    "x-b3-parentspanid",
    "x-b3-sampled",
    "x-b3-flags",
    "x-ot-span-context",
];

pub fn set_content_type(request: &mut HttpRequest, _ctx: &dyn AppContext) -> Result<(), ClientError> {
    if !request.has_header("content-type") {
        request.set_header("Content-Type", "application/json");
    }
    Ok(())
}

/// The inbound request's token if there is one, else a fresh system token.
pub fn set_token(request: &mut HttpRequest, ctx: &dyn AppContext) -> Result<(), ClientError> {
    let token = ctx
        .inbound()
        .and_then(|inbound| inbound.token.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| ctx.system_token());
    request.set_header(TOKEN_HEADER, token);
    Ok(())
}

pub fn inherit_headers(request: &mut HttpRequest, ctx: &dyn AppContext) -> Result<(), ClientError> {
    copy_inbound(request, ctx, INHERITED_HEADERS);
    Ok(())
}

/// Never fails: tracing problems are logged and the call goes on.
pub fn propagate_trace(request: &mut HttpRequest, ctx: &dyn AppContext) -> Result<(), ClientError> {
    copy_inbound(request, ctx, TRACE_HEADERS);

    let mut injected = Vec::new();
    match ctx.inject_trace_headers(&mut injected) {
        Ok(()) => {
            for (name, value) in injected {
                request.set_header(&name, value);
            }
        }
        Err(e) => warn!(url = %request.url, error = %e, "failed to propagate trace headers"),
    }
    Ok(())
}

fn copy_inbound(request: &mut HttpRequest, ctx: &dyn AppContext, names: &[&str]) {
    let Some(inbound) = ctx.inbound() else {
        return;
    };
    for name in names {
        if request.has_header(name) {
            continue;
        }
        if let Some(value) = inbound.header(name) {
            request.set_header(name, value);
        }
    }
}
