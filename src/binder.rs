//! Merges request inputs into the named argument set a handler receives.
//!
//! Overlay order is fixed: filter-contributed scratch entries, then query
//! parameters, then path captures, then body fields. The first source to
//! set a name wins, so query beats path beats body. `req` and `res` are
//! reserved: they are handed to the handler as views, never as data keys,
//! and no source may shadow them.
//!
//! Only the names a handler declares are forwarded; unknown keys are
//! silently dropped. A handler registered with a variadic sink receives all
//! remaining keys. Type coercion applies to typed path captures only; query
//! values always arrive as strings, and body fields keep the types their
//! parse produced.

use serde_json::Value;

use crate::handler::{HandlerArgs, ParamSpec};
use crate::pattern::{CaptureSpec, CaptureVec, ParamType};
use crate::server::Request;

const RESERVED_ARG_NAMES: [&str; 2] = ["req", "res"];

/// Produce the argument set for one endpoint invocation.
pub fn bind(
    req: &Request,
    captures: &CaptureVec,
    capture_specs: &[CaptureSpec],
    params: &ParamSpec,
) -> HandlerArgs {
    let mut args = HandlerArgs::default();

    let mut overlay = |name: &str, value: Value| {
        if RESERVED_ARG_NAMES.contains(&name) || !params.declares(name) {
            return;
        }
        args.insert_if_absent(name, value);
    };

    for (name, value) in &req.scratch {
        overlay(name, value.clone());
    }

    for (name, value) in &req.query_params {
        overlay(name, Value::String(value.clone()));
    }

    for (name, raw) in captures {
        let ty = capture_specs
            .iter()
            .find(|spec| spec.name == *name)
            .map(|spec| spec.ty)
            .unwrap_or(ParamType::Str);
        overlay(name, ty.coerce(raw));
    }

    if let Some(Value::Object(fields)) = &req.body_params {
        for (name, value) in fields {
            overlay(name, value.clone());
        }
    }

    args
}
