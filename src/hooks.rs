//! Named interception points around the dispatch pipeline.
//!
//! Five buckets exist: `preroute`, `postroute`, `preserialize`,
//! `postserialize`, and `error`. Within a bucket, callbacks run in
//! registration order and a later callback sees the output of the earlier
//! one. Hooks belong to the router they were registered on; they do not
//! propagate across mount boundaries.

use serde_json::Value;

use crate::error::{BuildError, HandlerError, PipelineError};
use crate::server::{Request, Response};

/// Observe-only callback around routing: `(req, res)`.
pub type ObserveFn = dyn Fn(&mut Request, &mut Response) -> Result<(), HandlerError> + Send + Sync;

/// Value-rewriting callback: `(req, res, value) -> value`. Returning the
/// input unchanged makes the hook observe-only.
pub type RewriteFn =
    dyn Fn(&mut Request, &mut Response, Value) -> Result<Value, HandlerError> + Send + Sync;

/// Error-bucket callback: may produce an alternate value for the response.
pub type RecoverFn = dyn Fn(&Request, &mut Response, &PipelineError) -> Option<Value> + Send + Sync;

/// A hook callback tagged with the shape its bucket expects.
pub enum Hook {
    /// `preroute` and `postserialize` observe (and may mutate req/res).
    Observe(Box<ObserveFn>),
    /// `postroute` and `preserialize` may rewrite the in-flight value.
    Rewrite(Box<RewriteFn>),
    /// `error` may produce an alternate value.
    Recover(Box<RecoverFn>),
}

/// The five hook buckets. Additive only: hooks cannot be removed.
#[derive(Default)]
pub struct HookRegistry {
    preroute: Vec<Box<ObserveFn>>,
    postroute: Vec<Box<RewriteFn>>,
    preserialize: Vec<Box<RewriteFn>>,
    postserialize: Vec<Box<ObserveFn>>,
    error: Vec<Box<RecoverFn>>,
}

impl HookRegistry {
    /// Append a hook to the named bucket. Fails with `UnknownHook` for a bad
    /// bucket name and `HookMismatch` when the callback shape does not fit
    /// the stage.
    pub fn register(&mut self, stage: &str, hook: Hook) -> Result<(), BuildError> {
        match (stage, hook) {
            ("preroute", Hook::Observe(f)) => self.preroute.push(f),
            ("postserialize", Hook::Observe(f)) => self.postserialize.push(f),
            ("postroute", Hook::Rewrite(f)) => self.postroute.push(f),
            ("preserialize", Hook::Rewrite(f)) => self.preserialize.push(f),
            ("error", Hook::Recover(f)) => self.error.push(f),
            ("preroute", _) => return Err(BuildError::HookMismatch { stage: "preroute" }),
            ("postserialize", _) => {
                return Err(BuildError::HookMismatch {
                    stage: "postserialize",
                })
            }
            ("postroute", _) => return Err(BuildError::HookMismatch { stage: "postroute" }),
            ("preserialize", _) => {
                return Err(BuildError::HookMismatch {
                    stage: "preserialize",
                })
            }
            ("error", _) => return Err(BuildError::HookMismatch { stage: "error" }),
            (other, _) => return Err(BuildError::UnknownHook(other.to_string())),
        }
        Ok(())
    }

    pub fn on_preroute<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.preroute.push(Box::new(f));
    }

    pub fn on_postroute<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response, Value) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.postroute.push(Box::new(f));
    }

    pub fn on_preserialize<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response, Value) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.preserialize.push(Box::new(f));
    }

    pub fn on_postserialize<F>(&mut self, f: F)
    where
        F: Fn(&mut Request, &mut Response) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.postserialize.push(Box::new(f));
    }

    pub fn on_error<F>(&mut self, f: F)
    where
        F: Fn(&Request, &mut Response, &PipelineError) -> Option<Value> + Send + Sync + 'static,
    {
        self.error.push(Box::new(f));
    }

    /// Run the `preroute` bucket. A failing hook aborts the rest of the
    /// bucket.
    pub fn run_preroute(&self, req: &mut Request, res: &mut Response) -> Result<(), PipelineError> {
        for f in &self.preroute {
            f(req, res).map_err(|source| PipelineError::Hook {
                stage: "preroute",
                source,
            })?;
        }
        Ok(())
    }

    pub fn run_postroute(
        &self,
        req: &mut Request,
        res: &mut Response,
        value: Value,
    ) -> Result<Value, PipelineError> {
        Self::run_rewrites("postroute", &self.postroute, req, res, value)
    }

    pub fn run_preserialize(
        &self,
        req: &mut Request,
        res: &mut Response,
        value: Value,
    ) -> Result<Value, PipelineError> {
        Self::run_rewrites("preserialize", &self.preserialize, req, res, value)
    }

    pub fn run_postserialize(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<(), PipelineError> {
        for f in &self.postserialize {
            f(req, res).map_err(|source| PipelineError::Hook {
                stage: "postserialize",
                source,
            })?;
        }
        Ok(())
    }

    /// Run the error bucket; the last hook to produce a value wins.
    pub fn run_error(
        &self,
        req: &Request,
        res: &mut Response,
        err: &PipelineError,
    ) -> Option<Value> {
        let mut replacement = None;
        for f in &self.error {
            if let Some(v) = f(req, res, err) {
                replacement = Some(v);
            }
        }
        replacement
    }

    fn run_rewrites(
        stage: &'static str,
        hooks: &[Box<RewriteFn>],
        req: &mut Request,
        res: &mut Response,
        mut value: Value,
    ) -> Result<Value, PipelineError> {
        for f in hooks {
            value = f(req, res, value).map_err(|source| PipelineError::Hook { stage, source })?;
        }
        Ok(value)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("preroute", &self.preroute.len())
            .field("postroute", &self.postroute.len())
            .field("preserialize", &self.preserialize.len())
            .field("postserialize", &self.postserialize.len())
            .field("error", &self.error.len())
            .finish()
    }
}
