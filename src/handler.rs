//! Handler values and their evaluation environments.
//!
//! A handler is either a direct callable or a deferred expression: a name
//! looked up in a declared evaluation environment the first time the handler
//! is needed, then cached. Environments are named binding tables owned by
//! the router, so descriptor documents can reference handlers that the host
//! application registers in code.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::error::HandlerError;
use crate::filter::FilterOutcome;
use crate::server::{Request, Response};

/// Endpoint handler signature: bound arguments in, value out. The handler
/// may also mutate the response directly instead of returning a value.
pub type EndpointFn =
    dyn Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, HandlerError> + Send + Sync;

/// Filter handler signature: forward, reply with a value, or fail.
pub type FilterFn = dyn Fn(&mut Request, &mut Response) -> FilterOutcome + Send + Sync;

/// The named argument set the binder passes to an endpoint handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerArgs {
    values: HashMap<String, Value>,
}

impl HandlerArgs {
    pub(crate) fn insert_if_absent(&mut self, name: &str, value: Value) {
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|v| v.as_i64())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Parameter descriptor captured at registration time: the names a handler
/// declares plus a variadic flag. The binder consults this instead of
/// reflecting on the handler itself.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    names: Vec<String>,
    variadic: bool,
}

impl ParamSpec {
    /// Forward only the listed names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamSpec {
            names: names.into_iter().map(Into::into).collect(),
            variadic: false,
        }
    }

    /// Forward every bound key (the variadic sink).
    pub fn variadic() -> Self {
        ParamSpec {
            names: Vec::new(),
            variadic: true,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn declares(&self, name: &str) -> bool {
        self.variadic || self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ParamSpec {
    /// Handlers default to the variadic sink; descriptor input narrows this
    /// down when parameter metadata is present.
    fn default() -> Self {
        ParamSpec::variadic()
    }
}

/// A handler slot: either a direct callable or a deferred expression to be
/// resolved in a named environment on first use, then cached.
pub enum Bound<T: ?Sized> {
    Direct(Arc<T>),
    Deferred {
        expr: String,
        env: Option<String>,
        resolved: OnceCell<Arc<T>>,
    },
}

impl<T: ?Sized> Bound<T> {
    pub fn deferred(expr: impl Into<String>, env: Option<String>) -> Self {
        Bound::Deferred {
            expr: expr.into(),
            env,
            resolved: OnceCell::new(),
        }
    }
}

impl<T: ?Sized> Clone for Bound<T> {
    fn clone(&self) -> Self {
        match self {
            Bound::Direct(f) => Bound::Direct(f.clone()),
            Bound::Deferred { expr, env, resolved } => Bound::Deferred {
                expr: expr.clone(),
                env: env.clone(),
                resolved: resolved.clone(),
            },
        }
    }
}

impl<T: ?Sized> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Direct(_) => f.write_str("Bound::Direct(..)"),
            Bound::Deferred { expr, env, .. } => f
                .debug_struct("Bound::Deferred")
                .field("expr", expr)
                .field("env", env)
                .finish(),
        }
    }
}

/// Endpoint handler slot.
pub type Handler = Bound<EndpointFn>;

/// Filter handler slot.
pub type FilterHandler = Bound<FilterFn>;

impl Handler {
    pub fn direct<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        Bound::Direct(Arc::new(f))
    }

    /// Materialize the callable, resolving a deferred expression in its
    /// declared environment exactly once.
    pub fn resolve(&self, envs: &EnvRegistry) -> Result<Arc<EndpointFn>, HandlerError> {
        match self {
            Bound::Direct(f) => Ok(f.clone()),
            Bound::Deferred { expr, env, resolved } => resolved
                .get_or_try_init(|| envs.endpoint(env.as_deref(), expr))
                .cloned(),
        }
    }
}

impl FilterHandler {
    pub fn direct<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> FilterOutcome + Send + Sync + 'static,
    {
        Bound::Direct(Arc::new(f))
    }

    pub fn resolve(&self, envs: &EnvRegistry) -> Result<Arc<FilterFn>, HandlerError> {
        match self {
            Bound::Direct(f) => Ok(f.clone()),
            Bound::Deferred { expr, env, resolved } => resolved
                .get_or_try_init(|| envs.filter(env.as_deref(), expr))
                .cloned(),
        }
    }
}

/// A named binding table: deferred expressions evaluate against these
/// bindings with ordinary lexical lookup semantics.
#[derive(Clone, Default)]
pub struct Environment {
    endpoints: HashMap<String, Arc<EndpointFn>>,
    filters: HashMap<String, Arc<FilterFn>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn bind_endpoint<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.endpoints.insert(name.into(), Arc::new(f));
        self
    }

    pub fn bind_filter<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> FilterOutcome + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(f));
        self
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<EndpointFn>> {
        self.endpoints.get(name).cloned()
    }

    pub fn filter(&self, name: &str) -> Option<Arc<FilterFn>> {
        self.filters.get(name).cloned()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("endpoints", &self.endpoints.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The router's environment table: env-id → environment, plus the id used
/// when a deferred expression names no environment.
#[derive(Clone, Debug, Default)]
pub struct EnvRegistry {
    envs: HashMap<String, Environment>,
    default_env: Option<String>,
}

impl EnvRegistry {
    pub fn define(&mut self, id: impl Into<String>, env: Environment) {
        let id = id.into();
        if self.default_env.is_none() {
            self.default_env = Some(id.clone());
        }
        self.envs.insert(id, env);
    }

    /// Select the environment deferred expressions fall back to.
    pub fn set_default(&mut self, id: impl Into<String>) {
        self.default_env = Some(id.into());
    }

    fn lookup(&self, id: Option<&str>) -> Result<&Environment, HandlerError> {
        let id = id
            .or(self.default_env.as_deref())
            .ok_or_else(|| HandlerError::new("no evaluation environment is defined"))?;
        self.envs
            .get(id)
            .ok_or_else(|| HandlerError::new(format!("unknown evaluation environment `{id}`")))
    }

    pub fn endpoint(&self, env: Option<&str>, expr: &str) -> Result<Arc<EndpointFn>, HandlerError> {
        let table = self.lookup(env)?;
        table.endpoint(expr).ok_or_else(|| {
            HandlerError::new(format!("`{expr}` is not bound to an endpoint handler"))
        })
    }

    pub fn filter(&self, env: Option<&str>, expr: &str) -> Result<Arc<FilterFn>, HandlerError> {
        let table = self.lookup(env)?;
        table
            .filter(expr)
            .ok_or_else(|| HandlerError::new(format!("`{expr}` is not bound to a filter handler")))
    }
}
