//! # Loader Module
//!
//! Bridges the external annotation parser's output into builder calls.
//!
//! The parser emits descriptor documents (YAML or JSON, picked by file
//! extension): endpoints, filters, static mounts, subrouter mounts, and
//! router options. Handlers in descriptors are deferred expressions:
//! names resolved in the evaluation environment the host application
//! registers in code.
//!
//! ## Input resolution
//!
//! - **File**: must exist; a directory passed here is rejected.
//! - **Directory**: an `entrypoint.yaml`/`entrypoint.json` is preferred and
//!   must carry a top-level `router` definition; otherwise the default
//!   definition file `api.yaml`/`api.json`; otherwise loading fails with
//!   `NoDefinitionFound`.
//! - **Neither**: the current directory is treated as the directory input.

mod descriptor;
mod load;

pub use descriptor::{ApiDoc, EndpointDoc, EntrypointDoc, FilterDoc, MountDoc, StaticDoc};
pub use load::{load, load_dir, load_file, router_from_doc, DEFAULT_DEFINITION_FILES, ENTRYPOINT_FILES};
