use std::path::PathBuf;

/// Failure produced by user code: an endpoint handler, a filter body, or a
/// hook callback. Carries a message only; the pipeline wraps it with stage
/// context before it reaches the error handler.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError(message)
    }
}

/// Errors raised while building a router: registering endpoints, filters,
/// hooks, and mounts. These are fatal to startup and are never converted
/// into HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Path pattern could not be parsed (unbalanced `<`/`>`, empty capture).
    #[error("malformed path pattern `{pattern}`: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// A dynamic segment carried a type tag outside the supported set.
    #[error("unknown type tag `{tag}` in path pattern `{pattern}`")]
    UnknownTypeTag { pattern: String, tag: String },

    /// Filter names must be unique within a router.
    #[error("a filter named `{0}` is already registered")]
    DuplicateFilterName(String),

    /// `preroute`, `postroute`, `preserialize`, `postserialize` and `error`
    /// name hook stages and cannot be used as filter names.
    #[error("`{0}` is a reserved stage name and cannot be used for a filter")]
    ReservedFilterName(String),

    /// Hook registration against a stage name that does not exist.
    #[error("unknown hook stage `{0}`")]
    UnknownHook(String),

    /// A hook callback was registered under a stage whose signature it does
    /// not satisfy.
    #[error("hook callback does not match the `{stage}` stage signature")]
    HookMismatch { stage: &'static str },

    /// A metadata key collided with a name the registration API reserves.
    #[error("`{0}` is a forbidden registration argument")]
    ForbiddenArg(String),

    /// Both a prebuilt endpoint and a (verbs, path, handler) tuple were
    /// supplied to the same registration call.
    #[error("supply either a prebuilt endpoint or (methods, path, handler), not both")]
    ConflictingArgs,

    /// No path specified.
    #[error("no path specified")]
    MissingPath,

    /// An endpoint pre-empted a filter that is not in the chain.
    #[error("endpoint pre-empts filter `{0}`, which is not registered")]
    UnknownPreempt(String),

    /// Endpoints must accept at least one verb.
    #[error("endpoint for `{0}` accepts no methods")]
    NoMethods(String),

    /// A (methods, path) registration arrived without a handler.
    #[error("no handler specified for `{0}`")]
    MissingHandler(String),

    /// A router option referenced a name with no binding in the evaluation
    /// environment.
    #[error("`{0}` is not bound in the evaluation environment")]
    UnknownBinding(String),
}

/// Errors raised by the loader adapter while resolving descriptor input.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("definition file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{0} is a directory, expected a definition file")]
    IsDirectory(PathBuf),

    #[error("no API definition found in {0}")]
    NoDefinitionFound(PathBuf),

    /// The entrypoint document parsed but did not yield a router.
    #[error("entrypoint {0} did not produce a router definition")]
    BadEntrypoint(PathBuf),

    #[error("unsupported HTTP method `{0}` in descriptor")]
    UnsupportedMethod(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to read definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse definition: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime failure captured at a pipeline stage boundary. Funneled to the
/// error hook bucket and the router's error handler; never leaks past
/// `Router::call`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error("filter `{name}` failed: {source}")]
    Filter {
        name: String,
        #[source]
        source: HandlerError,
    },

    #[error("{stage} hook failed: {source}")]
    Hook {
        stage: &'static str,
        #[source]
        source: HandlerError,
    },

    /// The transport signalled cancellation before the endpoint began.
    #[error("request cancelled before the handler ran")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_message_is_stable() {
        assert_eq!(BuildError::MissingPath.to_string(), "no path specified");
    }

    #[test]
    fn pipeline_error_carries_stage_context() {
        let err = PipelineError::Filter {
            name: "auth".into(),
            source: HandlerError::new("token expired"),
        };
        assert_eq!(err.to_string(), "filter `auth` failed: token expired");
    }
}
