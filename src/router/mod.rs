//! # Router Module
//!
//! The dispatch core of sluice: route tree, filter chain, mounts, and the
//! request pipeline.
//!
//! ## Architecture
//!
//! The router works in two phases:
//!
//! 1. **Build**: endpoints, filters, mounts, and hooks are registered
//!    through `&mut Router` (directly or via the builder facade / loader).
//!    Patterns are compiled once here.
//! 2. **Dispatch**: `call` takes `&self` and drives one request through the
//!    pipeline: preroute hooks → filter chain → tree match (falling through
//!    to mounts, then 404/405) → endpoint via the argument binder →
//!    postroute → preserialize → serializer → postserialize.
//!
//! ## Precedence
//!
//! At each tree node a literal child wins over a dynamic one; among dynamic
//! children the more specific type tag wins (`int`/`double`/`bool` before
//! `string`) with registration order breaking ties. An own endpoint match
//! wins over a mount, except when the mount prefix literally collides with
//! the endpoint's registered path; endpoints and mounts share one
//! registration sequence, and at such a collision the later registration
//! wins (and shadows the earlier one, in either direction).
//!
//! ## Concurrency
//!
//! Mutation requires `&mut self`; dispatch requires `&self`. Sharing the
//! router (e.g. `Arc<Router>`) is therefore the freeze point after which
//! all routing structures are read-only and `call` may run concurrently.

mod core;
mod trie;

pub use core::{ErrorFn, FallbackFn, HandleSpec, Mount, MountChild, Router};
pub use trie::TrieMatch;
