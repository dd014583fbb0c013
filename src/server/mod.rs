//! # Server Module
//!
//! Request and response views for sluice.
//!
//! The routing core never touches a socket: the transport hands it a
//! [`Request`] view that has already been parsed (verb, path, query, headers,
//! cookies, raw body bytes) and consumes the [`Response`] view the pipeline
//! produces. The views live exactly the span of one `Router::call`.
//!
//! The request carries a free-form scratch map used to pass state between
//! filters, hooks, and endpoints within a single request; it is owned by the
//! request and never shared across requests.

mod request;
mod response;

pub use request::{parse_cookies, parse_query_params, CancelHandle, Request};
pub use response::{status_reason, Response};

/// Format a host URL as `scheme://host:port[path]`.
///
/// IPv6 literals are bracketed. When `rewrite_loopback` is set, the
/// wildcard binds `0.0.0.0` and `::` are rewritten to their loopback forms
/// so the printed URL is actually dialable from the local machine.
pub fn host_url(scheme: &str, host: &str, port: u16, path: Option<&str>, rewrite_loopback: bool) -> String {
    let host = if rewrite_loopback {
        match host {
            "0.0.0.0" => "127.0.0.1",
            "::" => "::1",
            other => other,
        }
    } else {
        host
    };
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let path = path.unwrap_or("");
    format!("{scheme}://{host}:{port}{path}")
}
