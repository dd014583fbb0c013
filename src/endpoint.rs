//! A leaf handler for one (verbs, path) pair.

use std::collections::HashMap;

use http::Method;
use serde_json::Value;

use crate::binder;
use crate::error::{BuildError, PipelineError};
use crate::handler::{EnvRegistry, Handler, ParamSpec};
use crate::pattern::{CaptureVec, PathPattern};
use crate::server::{Request, Response};

/// An endpoint: immutable after registration. Holds the accepted verbs, the
/// compiled path pattern, the handler slot, the optional pre-empted filter
/// name, the serializer selector, and a free-form metadata bag kept for
/// documentation tooling.
#[derive(Debug, Clone)]
pub struct Endpoint {
    methods: Vec<Method>,
    pattern: PathPattern,
    handler: Handler,
    params: ParamSpec,
    preempt: Option<String>,
    serializer: Option<String>,
    metadata: HashMap<String, Value>,
}

impl Endpoint {
    /// Compile the pattern and build an endpoint. The verb set must be
    /// non-empty; a missing leading `/` on the path is prepended.
    pub fn new(
        methods: impl IntoIterator<Item = Method>,
        path: &str,
        handler: Handler,
    ) -> Result<Self, BuildError> {
        let methods: Vec<Method> = methods.into_iter().collect();
        if methods.is_empty() {
            return Err(BuildError::NoMethods(path.to_string()));
        }
        Ok(Endpoint {
            methods,
            pattern: PathPattern::compile(path)?,
            handler,
            params: ParamSpec::default(),
            preempt: None,
            serializer: None,
            metadata: HashMap::new(),
        })
    }

    /// Name a filter this endpoint pre-empts: that filter and every filter
    /// registered before it are skipped when this endpoint is selected.
    pub fn with_preempt(mut self, filter: impl Into<String>) -> Self {
        self.preempt = Some(filter.into());
        self
    }

    pub fn with_serializer(mut self, selector: impl Into<String>) -> Self {
        self.serializer = Some(selector.into());
        self
    }

    pub fn with_params(mut self, params: ParamSpec) -> Self {
        self.params = params;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn preempt(&self) -> Option<&str> {
        self.preempt.as_deref()
    }

    pub fn serializer(&self) -> Option<&str> {
        self.serializer.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Bind arguments and invoke the handler. The endpoint never writes
    /// status or body itself; only handler-initiated mutation of the
    /// response does that.
    pub fn exec(
        &self,
        envs: &EnvRegistry,
        req: &mut Request,
        res: &mut Response,
        captures: &CaptureVec,
    ) -> Result<Value, PipelineError> {
        let f = self.handler.resolve(envs).map_err(PipelineError::Handler)?;
        let args = binder::bind(req, captures, self.pattern.captures(), &self.params);
        f(req, res, &args).map_err(PipelineError::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leading_slash_is_prepended() {
        let ep = Endpoint::new(
            [Method::GET],
            "pets",
            Handler::direct(|_req, _res, _args| Ok(json!(null))),
        )
        .unwrap();
        assert_eq!(ep.pattern().as_str(), "/pets");
    }

    #[test]
    fn empty_verb_set_is_rejected() {
        let err = Endpoint::new(
            [],
            "/pets",
            Handler::direct(|_req, _res, _args| Ok(json!(null))),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::NoMethods(_)));
    }

    #[test]
    fn exec_binds_captures_and_returns_the_handler_value() {
        let ep = Endpoint::new(
            [Method::GET],
            "/pets/<id:int>",
            Handler::direct(|_req, _res, args| Ok(json!({ "pet": args.get_i64("id") }))),
        )
        .unwrap();
        let captures = ep.pattern().matches("/pets/9").unwrap();
        let mut req = Request::new(Method::GET, "/pets/9");
        let mut res = Response::new();
        let envs = EnvRegistry::default();
        let value = ep.exec(&envs, &mut req, &mut res, &captures).unwrap();
        assert_eq!(value, json!({ "pet": 9 }));
    }

    #[test]
    fn handler_errors_propagate_as_failures() {
        let ep = Endpoint::new(
            [Method::GET],
            "/boom",
            Handler::direct(|_req, _res, _args| Err("kaput".into())),
        )
        .unwrap();
        let mut req = Request::new(Method::GET, "/boom");
        let mut res = Response::new();
        let envs = EnvRegistry::default();
        let err = ep
            .exec(&envs, &mut req, &mut res, &CaptureVec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "handler failed: kaput");
    }

    #[test]
    fn handlers_may_mutate_the_response_directly() {
        let ep = Endpoint::new(
            [Method::GET],
            "/teapot",
            Handler::direct(|_req, res, _args| {
                res.status = 418;
                Ok(json!("short and stout"))
            }),
        )
        .unwrap();
        let mut req = Request::new(Method::GET, "/teapot");
        let mut res = Response::new();
        let envs = EnvRegistry::default();
        ep.exec(&envs, &mut req, &mut res, &CaptureVec::new()).unwrap();
        assert_eq!(res.status, 418);
    }
}
