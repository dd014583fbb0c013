//! Fluent construction facade over [`Router`].
//!
//! Every method returns the builder (wrapped in `Result` where registration
//! can fail) so a router reads as one chained expression:
//!
//! ```rust
//! use sluice::builder::RouterBuilder;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), sluice::error::BuildError> {
//! let router = RouterBuilder::new()
//!     .get("/pets", |_req, _res, _args| Ok(json!(["bo", "mina"])))?
//!     .post("pets", |_req, _res, _args| Ok(json!("created")))?
//!     .build();
//! assert_eq!(router.routes().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! Paths registered without a leading `/` get one prepended.

use http::Method;
use serde_json::Value;

use crate::error::{BuildError, HandlerError};
use crate::handler::{Environment, FilterHandler, HandlerArgs};
use crate::hooks::Hook;
use crate::options::RouterOptions;
use crate::router::{HandleSpec, Router};
use crate::server::{Request, Response};
use crate::static_files::StaticFiles;

#[derive(Debug, Default)]
pub struct RouterBuilder {
    router: Router,
}

macro_rules! verb_sugar {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            pub fn $name<F>(self, path: &str, f: F) -> Result<Self, BuildError>
            where
                F: Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, HandlerError>
                    + Send
                    + Sync
                    + 'static,
            {
                self.handle([Method::$method], path, f)
            }
        )*
    };
}

impl RouterBuilder {
    pub fn new() -> Self {
        RouterBuilder {
            router: Router::new(),
        }
    }

    /// Start from an existing router, e.g. one produced by the loader.
    pub fn from_router(router: Router) -> Self {
        RouterBuilder { router }
    }

    pub fn handle<F>(
        mut self,
        methods: impl IntoIterator<Item = Method>,
        path: &str,
        f: F,
    ) -> Result<Self, BuildError>
    where
        F: Fn(&mut Request, &mut Response, &HandlerArgs) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.router.handle_fn(methods, path, f)?;
        Ok(self)
    }

    /// Register a fully specified endpoint.
    pub fn handle_spec(mut self, spec: HandleSpec) -> Result<Self, BuildError> {
        self.router.handle(spec)?;
        Ok(self)
    }

    verb_sugar! {
        get => GET,
        put => PUT,
        post => POST,
        delete => DELETE,
        head => HEAD,
        options_ => OPTIONS,
        patch => PATCH,
    }

    pub fn filter<F>(mut self, name: &str, f: F) -> Result<Self, BuildError>
    where
        F: Fn(&mut Request, &mut Response) -> crate::filter::FilterOutcome
            + Send
            + Sync
            + 'static,
    {
        self.router.filter(name, FilterHandler::direct(f))?;
        Ok(self)
    }

    pub fn filter_deferred(mut self, name: &str, expr: &str) -> Result<Self, BuildError> {
        self.router.filter(name, FilterHandler::deferred(expr, None))?;
        Ok(self)
    }

    pub fn mount(mut self, prefix: &str, child: Router) -> Self {
        self.router.mount(prefix, child);
        self
    }

    pub fn mount_static(mut self, prefix: &str, files: StaticFiles) -> Self {
        self.router.mount_static(prefix, files);
        self
    }

    pub fn unmount(mut self, prefix: &str) -> Self {
        self.router.unmount(prefix);
        self
    }

    pub fn remove_handle(mut self, method: Method, path: &str) -> Self {
        self.router.remove_handle(&method, path);
        self
    }

    pub fn hook(mut self, stage: &str, hook: Hook) -> Result<Self, BuildError> {
        self.router.register_hook(stage, hook)?;
        Ok(self)
    }

    pub fn env(mut self, id: &str, env: Environment) -> Self {
        self.router.define_env(id, env);
        self
    }

    pub fn options(mut self, options: RouterOptions) -> Result<Self, BuildError> {
        self.router.set_options(options)?;
        Ok(self)
    }

    pub fn build(self) -> Router {
        self.router
    }
}
