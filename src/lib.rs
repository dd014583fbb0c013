//! # sluice
//!
//! Descriptor-driven HTTP API router with an ordered filter pipeline and
//! hook interception points.
//!
//! sluice is the routing core of an annotation-driven API framework: an
//! external parser turns annotated source into descriptor documents, and
//! sluice turns those descriptors (or direct builder calls) into a route
//! tree, matches incoming requests against it, and runs a predictable
//! pipeline around the matched handler:
//!
//! ```text
//! preroute hooks → filter chain → route match (mounts, 404/405 fallback)
//!   → argument binder → endpoint → postroute hooks
//!   → preserialize hooks → serializer → postserialize hooks
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use sluice::builder::RouterBuilder;
//! use sluice::server::Request;
//!
//! # fn main() -> Result<(), sluice::error::BuildError> {
//! let router = RouterBuilder::new()
//!     .get("/pets/<id:int>", |_req, _res, args| {
//!         Ok(json!({ "pet": args.get_i64("id") }))
//!     })?
//!     .build();
//!
//! let res = router.call(Request::new(Method::GET, "/pets/7"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_string(), r#"{"pet":7}"#);
//! # Ok(())
//! # }
//! ```
//!
//! The transport and the annotation parser are external collaborators:
//! requests enter as already-parsed [`server::Request`] views and leave as
//! [`server::Response`] views; descriptors enter through the [`loader`].

pub mod binder;
pub mod builder;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod handler;
pub mod hooks;
pub mod ids;
pub mod loader;
pub mod options;
pub mod pattern;
pub mod router;
pub mod serializer;
pub mod server;
pub mod static_files;

pub use builder::RouterBuilder;
pub use endpoint::Endpoint;
pub use error::{BuildError, HandlerError, LoadError, PipelineError};
pub use filter::{Filter, FilterOutcome};
pub use handler::{Environment, Handler, HandlerArgs, ParamSpec};
pub use hooks::{Hook, HookRegistry};
pub use options::{RouterOptions, TrailingSlash};
pub use pattern::{ParamType, PathPattern};
pub use router::{HandleSpec, Router};
pub use server::{Request, Response};
pub use static_files::StaticFiles;
