use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::ids::RequestId;

/// Parse a `Cookie` header out of a lowercased header map.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode an `application/x-www-form-urlencoded` query string into a map.
/// On duplicate keys the last occurrence wins.
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Cloneable cancellation flag shared between the transport and the router.
/// Setting it before the endpoint runs makes the router skip the endpoint;
/// afterwards it is advisory only.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The narrow request view the routing core observes. Produced by the
/// transport (or directly by tests) and alive for exactly one call.
#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`, exactly as received.
    pub raw_query: Option<String>,
    pub query_params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Raw body bytes as delivered by the transport.
    pub body: Option<Vec<u8>>,
    /// Body parsed as JSON, populated by the router when `parse-post-body`
    /// is on (or by the transport ahead of time).
    pub body_params: Option<Value>,
    pub remote_addr: Option<String>,
    /// Free-form per-request state shared by filters, hooks, and endpoints.
    pub scratch: HashMap<String, Value>,
    cancel: CancelHandle,
}

impl Request {
    /// Build a request from a method and a request target, splitting the
    /// query string off the path and decoding it.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, raw_query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };
        let query_params = raw_query.as_deref().map(parse_query_params).unwrap_or_default();
        Request {
            id: RequestId::new(),
            method,
            path,
            raw_query,
            query_params,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            body: None,
            body_params: None,
            remote_addr: None,
            scratch: HashMap::new(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self.cookies = parse_cookies(&self.headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    /// Handle the transport can use to signal cancellation.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_off_the_target() {
        let req = Request::new(Method::GET, "/pets?limit=10&name=bo");
        assert_eq!(req.path, "/pets");
        assert_eq!(req.raw_query.as_deref(), Some("limit=10&name=bo"));
        assert_eq!(req.query_params.get("limit"), Some(&"10".to_string()));
        assert_eq!(req.query_params.get("name"), Some(&"bo".to_string()));
    }

    #[test]
    fn parses_cookie_header() {
        let req = Request::new(Method::GET, "/").with_header("Cookie", "a=b; c=d");
        assert_eq!(req.cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(req.cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn decodes_percent_escapes_in_query() {
        let req = Request::new(Method::GET, "/p?msg=hi%20there");
        assert_eq!(req.query_params.get("msg"), Some(&"hi there".to_string()));
    }

    #[test]
    fn cancel_handle_is_shared() {
        let req = Request::new(Method::GET, "/");
        let handle = req.cancel_handle();
        assert!(!req.is_cancelled());
        handle.cancel();
        assert!(req.is_cancelled());
    }
}
