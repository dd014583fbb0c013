use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::trie::{RouteTrie, TrieMatch};
use crate::endpoint::Endpoint;
use crate::error::{BuildError, PipelineError};
use crate::filter::{Filter, FilterOutcome, RESERVED_FILTER_NAMES};
use crate::handler::{EnvRegistry, Environment, Handler, HandlerArgs, ParamSpec};
use crate::hooks::{Hook, HookRegistry};
use crate::options::{RouterOptions, TrailingSlash};
use crate::pattern::PathPattern;
use crate::serializer::{SerializerRegistry, DEFAULT_SERIALIZER};
use crate::server::{Request, Response};
use crate::static_files::StaticFiles;

/// Fallback handler signature for the 404 and 405 slots.
pub type FallbackFn = dyn Fn(&mut Request, &mut Response) -> Value + Send + Sync;

/// Error handler signature: the default one answers 500 with a minimal
/// body, hosts can replace it.
pub type ErrorFn = dyn Fn(&Request, &mut Response, &PipelineError) -> Value + Send + Sync;

/// A child attached under a path prefix.
#[derive(Debug)]
pub enum MountChild {
    Router(Box<Router>),
    Static(StaticFiles),
}

#[derive(Debug)]
pub struct Mount {
    prefix: String,
    child: MountChild,
    seq: usize,
}

impl Mount {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn child(&self) -> &MountChild {
        &self.child
    }
}

/// Registration arguments for `Router::handle`: either a prebuilt endpoint
/// or a (methods, path, handler) tuple, never both.
#[derive(Default)]
pub struct HandleSpec {
    pub endpoint: Option<Endpoint>,
    pub methods: Vec<Method>,
    pub path: Option<String>,
    pub handler: Option<Handler>,
    pub params: Option<ParamSpec>,
    pub preempt: Option<String>,
    pub serializer: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl HandleSpec {
    pub fn of(endpoint: Endpoint) -> Self {
        HandleSpec {
            endpoint: Some(endpoint),
            ..Default::default()
        }
    }

    pub fn new(
        methods: impl IntoIterator<Item = Method>,
        path: impl Into<String>,
        handler: Handler,
    ) -> Self {
        HandleSpec {
            methods: methods.into_iter().collect(),
            path: Some(path.into()),
            handler: Some(handler),
            ..Default::default()
        }
    }
}

/// Metadata keys reserved by the registration API.
const FORBIDDEN_ARGS: [&str; 8] = [
    "req",
    "res",
    "endpoint",
    "methods",
    "path",
    "handler",
    "preempt",
    "serializer",
];

/// Where dispatch decided to send a request.
enum Resolution {
    Endpoint(TrieMatch),
    Mount { index: usize, rest: String },
    Redirect(String),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The dispatch core: an ordered filter chain, a route tree, mounts, hook
/// buckets, and the serialization boundary.
///
/// All mutation goes through `&mut self`, so the borrow checker enforces
/// the freeze point: once the owner shares the router (typically behind an
/// `Arc`), the tree, filters, mounts, and hooks are immutable and `route`/
/// `call` are safe for concurrent reads.
pub struct Router {
    filters: Vec<Filter>,
    hooks: HookRegistry,
    trie: RouteTrie,
    mounts: Vec<Mount>,
    serializers: SerializerRegistry,
    default_serializer: String,
    options: RouterOptions,
    envs: EnvRegistry,
    not_found: Box<FallbackFn>,
    method_not_allowed: Box<FallbackFn>,
    error_handler: Box<ErrorFn>,
    next_seq: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Router {
            filters: Vec::new(),
            hooks: HookRegistry::default(),
            trie: RouteTrie::default(),
            mounts: Vec::new(),
            serializers: SerializerRegistry::default(),
            default_serializer: DEFAULT_SERIALIZER.to_string(),
            options: RouterOptions::default(),
            envs: EnvRegistry::default(),
            not_found: Box::new(|_req, res| {
                res.status = 404;
                json!({ "error": "404 - resource not found" })
            }),
            method_not_allowed: Box::new(|_req, res| {
                res.status = 405;
                json!({ "error": "405 - method not allowed" })
            }),
            error_handler: Box::new(|_req, res, err| {
                res.status = 500;
                json!({ "error": "500 - internal server error", "details": err.to_string() })
            }),
            next_seq: 0,
        }
    }

    // ---- registration -----------------------------------------------------

    /// Register an endpoint. See `HandleSpec` for the two accepted forms.
    pub fn handle(&mut self, spec: HandleSpec) -> Result<(), BuildError> {
        for key in spec.metadata.keys() {
            if FORBIDDEN_ARGS.contains(&key.as_str()) {
                return Err(BuildError::ForbiddenArg(key.clone()));
            }
        }

        let tuple_form =
            spec.path.is_some() || spec.handler.is_some() || !spec.methods.is_empty();
        let endpoint = match (spec.endpoint, tuple_form) {
            (Some(_), true) => return Err(BuildError::ConflictingArgs),
            (Some(mut ep), false) => {
                if let Some(preempt) = spec.preempt {
                    ep = ep.with_preempt(preempt);
                }
                if let Some(serializer) = spec.serializer {
                    ep = ep.with_serializer(serializer);
                }
                if !spec.metadata.is_empty() {
                    ep = ep.with_metadata(spec.metadata);
                }
                ep
            }
            (None, _) => {
                let path = spec.path.ok_or(BuildError::MissingPath)?;
                let handler = spec
                    .handler
                    .ok_or_else(|| BuildError::MissingHandler(path.clone()))?;
                let mut ep = Endpoint::new(spec.methods, &path, handler)?;
                if let Some(params) = spec.params {
                    ep = ep.with_params(params);
                }
                if let Some(preempt) = spec.preempt {
                    ep = ep.with_preempt(preempt);
                }
                if let Some(serializer) = spec.serializer {
                    ep = ep.with_serializer(serializer);
                }
                if !spec.metadata.is_empty() {
                    ep = ep.with_metadata(spec.metadata);
                }
                ep
            }
        };

        if let Some(preempt) = endpoint.preempt() {
            if !self.filters.iter().any(|f| f.name() == preempt) {
                return Err(BuildError::UnknownPreempt(preempt.to_string()));
            }
        }

        info!(
            methods = ?endpoint.methods(),
            path = endpoint.pattern().as_str(),
            "endpoint registered"
        );
        let seq = self.bump_seq();
        self.trie.insert(Arc::new(endpoint), seq);
        Ok(())
    }

    /// Shorthand for registering a direct handler under a verb set.
    pub fn handle_fn<F>(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        path: &str,
        f: F,
    ) -> Result<(), BuildError>
    where
        F: Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, crate::error::HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.handle(HandleSpec::new(methods, path, Handler::direct(f)))
    }

    /// Append a filter. Names are unique within a router and must not be a
    /// reserved stage name.
    pub fn filter(
        &mut self,
        name: impl Into<String>,
        handler: crate::handler::FilterHandler,
    ) -> Result<(), BuildError> {
        let name = name.into();
        if RESERVED_FILTER_NAMES.contains(&name.as_str()) {
            return Err(BuildError::ReservedFilterName(name));
        }
        if self.filters.iter().any(|f| f.name() == name) {
            return Err(BuildError::DuplicateFilterName(name));
        }
        debug!(filter = %name, position = self.filters.len(), "filter appended");
        self.filters.push(Filter::new(name, handler));
        Ok(())
    }

    /// Attach a child router under a prefix. The prefix is normalized to
    /// end with `/`; the root prefix `/` is allowed.
    pub fn mount(&mut self, prefix: &str, child: Router) {
        self.push_mount(prefix, MountChild::Router(Box::new(child)));
    }

    /// Attach a static handler under a prefix.
    pub fn mount_static(&mut self, prefix: &str, files: StaticFiles) {
        self.push_mount(prefix, MountChild::Static(files));
    }

    fn push_mount(&mut self, prefix: &str, child: MountChild) {
        let prefix = normalize_prefix(prefix);
        info!(prefix = %prefix, "mount attached");
        let seq = self.bump_seq();
        self.mounts.push(Mount { prefix, child, seq });
    }

    /// Remove a mount by prefix. Silently succeeds when absent.
    pub fn unmount(&mut self, prefix: &str) {
        let prefix = normalize_prefix(prefix);
        self.mounts.retain(|m| m.prefix != prefix);
    }

    /// Remove the endpoint registered for (verb, path). Silently succeeds
    /// when absent.
    pub fn remove_handle(&mut self, method: &Method, path: &str) {
        if let Ok(pattern) = PathPattern::compile(path) {
            self.trie.remove(method, &pattern);
        }
    }

    /// Append a hook to the named stage bucket.
    pub fn register_hook(&mut self, stage: &str, hook: Hook) -> Result<(), BuildError> {
        self.hooks.register(stage, hook)
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    pub fn set_404_handler<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response) -> Value + Send + Sync + 'static,
    {
        self.not_found = Box::new(f);
    }

    pub fn set_405_handler<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response) -> Value + Send + Sync + 'static,
    {
        self.method_not_allowed = Box::new(f);
    }

    pub fn set_error_handler<F>(&mut self, f: F)
    where
        F: Fn(&Request, &mut Response, &PipelineError) -> Value + Send + Sync + 'static,
    {
        self.error_handler = Box::new(f);
    }

    pub fn set_default_serializer(&mut self, selector: impl Into<String>) {
        self.default_serializer = selector.into();
    }

    pub fn serializers_mut(&mut self) -> &mut SerializerRegistry {
        &mut self.serializers
    }

    /// Define (or replace) a named evaluation environment.
    pub fn define_env(&mut self, id: impl Into<String>, env: Environment) {
        self.envs.define(id, env);
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Apply a configuration document. Handler-valued options are resolved
    /// against the evaluation environment now, not at dispatch time.
    pub fn set_options(&mut self, options: RouterOptions) -> Result<(), BuildError> {
        if let Some(env) = &options.evaluation_environment {
            self.envs.set_default(env.clone());
        }
        if let Some(selector) = &options.default_serializer {
            self.default_serializer = selector.clone();
        }
        if let Some(name) = &options.not_found_handler {
            let f = self.resolve_fallback(name)?;
            self.not_found = f;
        }
        if let Some(name) = &options.method_not_allowed_handler {
            let f = self.resolve_fallback(name)?;
            self.method_not_allowed = f;
        }
        if let Some(name) = &options.error_handler {
            let f = self
                .envs
                .endpoint(None, name)
                .map_err(|_| BuildError::UnknownBinding(name.clone()))?;
            self.error_handler = Box::new(move |req, res, err| {
                let mut args = HandlerArgs::default();
                args.insert_if_absent("error", json!(err.to_string()));
                // the handler gets an immutable request view here; clone the
                // pieces it may bind from
                let mut scratch_req = Request::new(req.method.clone(), &req.path);
                f(&mut scratch_req, res, &args)
                    .unwrap_or_else(|e| json!({ "error": e.to_string() }))
            });
        }
        self.options = options;
        Ok(())
    }

    fn resolve_fallback(&self, name: &str) -> Result<Box<FallbackFn>, BuildError> {
        let f = self
            .envs
            .endpoint(None, name)
            .map_err(|_| BuildError::UnknownBinding(name.to_string()))?;
        Ok(Box::new(move |req, res| {
            f(req, res, &HandlerArgs::default())
                .unwrap_or_else(|e| json!({ "error": e.to_string() }))
        }))
    }

    fn bump_seq(&mut self) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // ---- introspection ----------------------------------------------------

    /// Every registered (verb, pattern) pair, ordered by path.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.trie.routes()
    }

    /// Child segment names directly under a path in the route tree.
    pub fn segments_at(&self, path: &str) -> Vec<String> {
        self.trie.segments_at(path)
    }

    /// Print the routing table, one line per (verb, pattern) pair.
    pub fn dump_routes(&self) {
        for (method, path) in self.routes() {
            println!("[route] {method} {path}");
        }
        for mount in &self.mounts {
            println!("[mount] {}", mount.prefix);
        }
    }

    // ---- dispatch ---------------------------------------------------------

    /// Run preroute hooks, the filter chain, route matching, the matched
    /// target, and postroute hooks. Pipeline failures are funneled to the
    /// error bucket and handler; the returned value is always ready for
    /// serialization.
    pub fn route(&self, req: &mut Request, res: &mut Response) -> Value {
        match self.route_inner(req, res) {
            Ok(value) => value,
            Err(err) => self.recover(req, res, err),
        }
    }

    fn route_inner(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<Value, PipelineError> {
        self.hooks.run_preroute(req, res)?;

        debug!(request_id = %req.id, method = %req.method, path = %req.path, "route match attempt");
        let resolution = self.resolve(req);

        // Mounted dispatch: the child runs its own pipeline against the
        // rewritten path; its 404 does not fall through to siblings here.
        if let Resolution::Mount { index, rest } = &resolution {
            if let Some(value) = self.run_filters(req, res, 0)? {
                return self.hooks.run_postroute(req, res, value);
            }
            let mount = &self.mounts[*index];
            debug!(prefix = %mount.prefix, rest = %rest, "delegating to mount");
            let value = match &mount.child {
                MountChild::Router(child) => {
                    req.path = rest.clone();
                    child.route(req, res)
                }
                MountChild::Static(files) => match files.load(rest) {
                    Ok((bytes, content_type)) => {
                        res.set_header("content-type", content_type);
                        res.body = bytes;
                        Value::Null
                    }
                    Err(e) => {
                        debug!(prefix = %mount.prefix, rest = %rest, error = %e, "static file miss");
                        (self.not_found)(req, res)
                    }
                },
            };
            return self.hooks.run_postroute(req, res, value);
        }

        let skip = match &resolution {
            Resolution::Endpoint(found) => found
                .endpoint
                .preempt()
                .and_then(|name| self.filters.iter().position(|f| f.name() == name))
                .map(|pos| pos + 1)
                .unwrap_or(0),
            _ => 0,
        };
        if let Some(value) = self.run_filters(req, res, skip)? {
            return self.hooks.run_postroute(req, res, value);
        }

        let value = match resolution {
            Resolution::Endpoint(found) => {
                if req.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                res.serializer = found.endpoint.serializer().map(str::to_string);
                debug!(
                    request_id = %req.id,
                    path = found.endpoint.pattern().as_str(),
                    "route matched"
                );
                found.endpoint.exec(&self.envs, req, res, &found.captures)?
            }
            Resolution::Redirect(location) => {
                res.status = 307;
                res.set_header("location", location.clone());
                json!({ "message": "temporary redirect", "location": location })
            }
            Resolution::MethodNotAllowed(mut allow) => {
                allow.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                let allow = allow
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                res.set_header("allow", allow);
                warn!(request_id = %req.id, method = %req.method, path = %req.path, "method not allowed");
                (self.method_not_allowed)(req, res)
            }
            Resolution::NotFound => {
                warn!(request_id = %req.id, method = %req.method, path = %req.path, "no route matched");
                (self.not_found)(req, res)
            }
            Resolution::Mount { .. } => unreachable!("mount handled above"),
        };

        self.hooks.run_postroute(req, res, value)
    }

    /// Run filters starting at `skip`; `Some(value)` means a filter replied
    /// and the endpoint must not run.
    fn run_filters(
        &self,
        req: &mut Request,
        res: &mut Response,
        skip: usize,
    ) -> Result<Option<Value>, PipelineError> {
        for filter in self.filters.iter().skip(skip) {
            match filter.run(&self.envs, req, res)? {
                FilterOutcome::Forward => continue,
                FilterOutcome::Reply(value) => {
                    debug!(filter = filter.name(), "filter replied, short-circuiting");
                    return Ok(Some(value));
                }
                FilterOutcome::Fail(source) => {
                    return Err(PipelineError::Filter {
                        name: filter.name().to_string(),
                        source,
                    })
                }
            }
        }
        Ok(None)
    }

    /// Decide between own endpoints, mounts, trailing-slash redirect, 405,
    /// and 404. Endpoints and mounts share one registration sequence: at a
    /// colliding prefix the later registration wins.
    fn resolve(&self, req: &Request) -> Resolution {
        let (own, allow) = match self.trie.find(&req.method, &req.path) {
            Ok(found) => (found, None),
            Err(allow) => (None, Some(allow)),
        };

        let mounted = self.mounts.iter().enumerate().find_map(|(index, mount)| {
            debug_assert!(
                mount.prefix.ends_with('/'),
                "mount prefixes are normalized to end with `/`"
            );
            req.path.starts_with(&mount.prefix).then(|| {
                let rest = &req.path[mount.prefix.len().saturating_sub(1)..];
                (index, rest.to_string(), mount.seq)
            })
        });

        match (own, mounted) {
            (Some(found), Some((index, rest, mount_seq))) => {
                // the registration sequence decides only when the mount
                // prefix literally collides with the endpoint's registered
                // path; any other own match wins over the mount
                let collides = found.endpoint.pattern().as_str() == self.mounts[index].prefix;
                if collides && mount_seq > found.seq {
                    Resolution::Mount { index, rest }
                } else {
                    Resolution::Endpoint(found)
                }
            }
            (Some(found), None) => Resolution::Endpoint(found),
            (None, Some((index, rest, _))) => Resolution::Mount { index, rest },
            (None, None) => {
                if self.options.trailing_slash == TrailingSlash::Redirect {
                    let canonical = toggle_trailing_slash(&req.path);
                    if self.trie.find(&req.method, &canonical).ok().flatten().is_some() {
                        let location = match &req.raw_query {
                            Some(q) => format!("{canonical}?{q}"),
                            None => canonical,
                        };
                        return Resolution::Redirect(location);
                    }
                }
                match allow {
                    Some(allow) => Resolution::MethodNotAllowed(allow),
                    None => Resolution::NotFound,
                }
            }
        }
    }

    /// Full pipeline: route, then the serialization chain. Runtime errors
    /// never leak past this method.
    pub fn call(&self, mut req: Request) -> Response {
        let mut res = Response::new();

        if self.options.parse_post_body && req.body_params.is_none() {
            if let Some(bytes) = &req.body {
                if !bytes.is_empty() {
                    match serde_json::from_slice(bytes) {
                        Ok(parsed) => req.body_params = Some(parsed),
                        Err(e) => {
                            warn!(request_id = %req.id, error = %e, "request body is not valid JSON")
                        }
                    }
                }
            }
        }

        let value = self.route(&mut req, &mut res);

        let value = match self.hooks.run_preserialize(&mut req, &mut res, value) {
            Ok(value) => value,
            Err(err) => self.recover(&mut req, &mut res, err),
        };

        self.serialize(&value, &mut res, &req);

        if let Err(err) = self.hooks.run_postserialize(&mut req, &mut res) {
            let value = self.recover(&mut req, &mut res, err);
            self.serialize(&value, &mut res, &req);
        }

        debug!(request_id = %req.id, status = res.status, "request complete");
        res
    }

    /// Write the value into the response body. A `Null` value over an
    /// already-written body means the handler produced the bytes itself and
    /// the serializer stays out of the way.
    fn serialize(&self, value: &Value, res: &mut Response, req: &Request) {
        if value.is_null() && !res.body.is_empty() {
            return;
        }
        let selector = res
            .serializer
            .clone()
            .unwrap_or_else(|| self.default_serializer.clone());
        let serializer = self.serializers.get(&selector).unwrap_or_else(|| {
            warn!(selector = %selector, "unknown serializer selector, using default");
            self.serializers
                .get(DEFAULT_SERIALIZER)
                .expect("default serializer is always registered")
        });
        if let Err(e) = serializer(value, res) {
            error!(request_id = %req.id, error = %e, "serialization failed");
            res.status = 500;
            res.set_header("content-type", "application/json");
            res.body = json!({ "error": "500 - serialization failed" })
                .to_string()
                .into_bytes();
        }
    }

    /// Funnel a pipeline failure through the error hook bucket and the
    /// error handler. Cancellation short-circuits with its own shape.
    fn recover(&self, req: &mut Request, res: &mut Response, err: PipelineError) -> Value {
        if matches!(err, PipelineError::Cancelled) {
            res.status = 499;
            return json!({ "error": "request cancelled" });
        }
        error!(request_id = %req.id, error = %err, "pipeline stage failed");
        if let Some(value) = self.hooks.run_error(req, res, &err) {
            return value;
        }
        (self.error_handler)(req, res, &err)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("filters", &self.filters.len())
            .field("mounts", &self.mounts.len())
            .field("routes", &self.routes().len())
            .finish()
    }
}

/// Normalize a mount prefix: leading `/` prepended, trailing `/` appended.
fn normalize_prefix(prefix: &str) -> String {
    let mut prefix = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    };
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

fn toggle_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path[..path.len() - 1].to_string()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("sub"), "/sub/");
        assert_eq!(normalize_prefix("/sub"), "/sub/");
        assert_eq!(normalize_prefix("/sub/"), "/sub/");
        assert_eq!(normalize_prefix("/"), "/");
    }

    #[test]
    fn toggling_the_trailing_slash() {
        assert_eq!(toggle_trailing_slash("/get"), "/get/");
        assert_eq!(toggle_trailing_slash("/get/"), "/get");
        assert_eq!(toggle_trailing_slash("/"), "//");
    }
}
