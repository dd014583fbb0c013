//! Named pipeline stages that run ahead of the matched endpoint.
//!
//! A filter inspects the in-flight request and decides whether control moves
//! on. The outcome is an explicit sum type: there is no forward sentinel to
//! forget, so a filter that wants the next stage to run says so in its
//! return value.

use crate::error::{HandlerError, PipelineError};
use crate::handler::{EnvRegistry, FilterHandler};
use crate::server::{Request, Response};

/// Stage names reserved for hook buckets; a filter cannot take one of these.
pub const RESERVED_FILTER_NAMES: [&str; 5] =
    ["preroute", "postroute", "preserialize", "postserialize", "error"];

/// What a filter decided about the in-flight request.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Let the next filter (or the endpoint) run.
    Forward,
    /// Short-circuit: this value becomes the response value and the endpoint
    /// never runs.
    Reply(serde_json::Value),
    /// Divert to the error handler.
    Fail(HandlerError),
}

/// A named filter. Execution order within a router is insertion order;
/// names are unique within their router.
#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    handler: FilterHandler,
}

impl Filter {
    pub fn new(name: impl Into<String>, handler: FilterHandler) -> Self {
        Filter {
            name: name.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the handler and run it. Only resolution failures error here;
    /// a `Fail` outcome is returned to the dispatch loop, which wraps it
    /// with this filter's name.
    pub fn run(
        &self,
        envs: &EnvRegistry,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<FilterOutcome, PipelineError> {
        let f = self
            .handler
            .resolve(envs)
            .map_err(|source| PipelineError::Filter {
                name: self.name.clone(),
                source,
            })?;
        Ok(f(req, res))
    }
}
