//! Serde shapes for the annotation parser's descriptor output.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::options::RouterOptions;

/// A router definition: the flat document the default definition file
/// carries, and the value under `router` in an entrypoint document.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiDoc {
    pub options: Option<RouterOptions>,
    pub filters: Vec<FilterDoc>,
    pub endpoints: Vec<EndpointDoc>,
    pub statics: Vec<StaticDoc>,
    pub mounts: Vec<MountDoc>,
}

/// One endpoint descriptor: {verbs[], path, handler expression, preempt?,
/// serializer?, param metadata?, response metadata?}.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDoc {
    pub methods: Vec<String>,
    pub path: String,
    /// Deferred expression resolved in the evaluation environment.
    pub handler: String,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub preempt: Option<String>,
    #[serde(default)]
    pub serializer: Option<String>,
    /// Declared parameter names; absent means the handler takes a variadic
    /// sink.
    #[serde(default)]
    pub params: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDoc {
    pub name: String,
    pub handler: String,
    #[serde(default)]
    pub env: Option<String>,
}

/// A static mount: {local dir, public prefix}.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticDoc {
    pub dir: PathBuf,
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountDoc {
    pub prefix: String,
    pub router: ApiDoc,
}

/// The entrypoint document shape; `router` must be present for the
/// entrypoint to count as producing a router.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntrypointDoc {
    pub router: Option<ApiDoc>,
}
