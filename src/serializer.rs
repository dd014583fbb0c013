//! The serialization boundary.
//!
//! The pipeline treats serialization as an opaque named mapping from a
//! handler value to a response body. Selectors are resolved against this
//! registry: the matched endpoint's selector first, then the router
//! default. Two serializers ship with the core; content negotiation and
//! richer formats live outside it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::HandlerError;
use crate::server::Response;

/// Selector used when neither the endpoint nor the router names one.
pub const DEFAULT_SERIALIZER: &str = "json";

pub type SerializeFn = dyn Fn(&Value, &mut Response) -> Result<(), HandlerError> + Send + Sync;

pub struct SerializerRegistry {
    table: HashMap<String, Arc<SerializeFn>>,
}

impl SerializerRegistry {
    pub fn register<F>(&mut self, selector: impl Into<String>, f: F)
    where
        F: Fn(&Value, &mut Response) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.table.insert(selector.into(), Arc::new(f));
    }

    pub fn get(&self, selector: &str) -> Option<Arc<SerializeFn>> {
        self.table.get(selector).cloned()
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        let mut registry = SerializerRegistry {
            table: HashMap::new(),
        };
        registry.register("json", |value, res| {
            res.set_header("content-type", "application/json");
            res.body = serde_json::to_vec(value)
                .map_err(|e| HandlerError::new(format!("json serialization failed: {e}")))?;
            Ok(())
        });
        registry.register("text", |value, res| {
            res.set_header("content-type", "text/plain");
            res.body = match value {
                Value::String(s) => s.clone().into_bytes(),
                other => other.to_string().into_bytes(),
            };
            Ok(())
        });
        registry
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("selectors", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_serializer_writes_body_and_content_type() {
        let registry = SerializerRegistry::default();
        let mut res = Response::new();
        let f = registry.get("json").unwrap();
        f(&json!({"ok": true}), &mut res).unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body_string(), r#"{"ok":true}"#);
    }

    #[test]
    fn text_serializer_writes_strings_verbatim() {
        let registry = SerializerRegistry::default();
        let mut res = Response::new();
        let f = registry.get("text").unwrap();
        f(&json!("plain words"), &mut res).unwrap();
        assert_eq!(res.body_string(), "plain words");
        assert_eq!(res.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn unknown_selector_is_absent() {
        assert!(SerializerRegistry::default().get("msgpack").is_none());
    }
}
