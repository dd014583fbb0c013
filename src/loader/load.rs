use std::path::Path;
use std::str::FromStr;

use http::Method;
use tracing::{debug, info};

use super::descriptor::{ApiDoc, EntrypointDoc};
use crate::error::LoadError;
use crate::handler::{Environment, FilterHandler, Handler, ParamSpec};
use crate::router::{HandleSpec, Router};
use crate::static_files::StaticFiles;

/// Filenames tried, in order, when a directory holds an entrypoint.
pub const ENTRYPOINT_FILES: [&str; 2] = ["entrypoint.yaml", "entrypoint.json"];

/// Default definition filenames tried when no entrypoint is present.
pub const DEFAULT_DEFINITION_FILES: [&str; 2] = ["api.yaml", "api.json"];

/// Verbs a descriptor may name.
const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
];

/// Resolve descriptor input into a router. `None` treats the current
/// directory as the directory input.
pub fn load(path: Option<&Path>, env: Environment) -> Result<Router, LoadError> {
    match path {
        Some(p) => load_file(p, env),
        None => load_dir(Path::new("."), env),
    }
}

/// Load a single definition file. The file must exist; a directory here is
/// a typed error.
pub fn load_file(path: &Path, env: Environment) -> Result<Router, LoadError> {
    if path.is_dir() {
        return Err(LoadError::IsDirectory(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    info!(path = %path.display(), "loading API definition");
    let doc: ApiDoc = parse(path)?;
    router_from_doc(doc, &env)
}

/// Load from a directory: prefer an entrypoint document, fall back to the
/// default definition file, fail with `NoDefinitionFound` otherwise.
pub fn load_dir(dir: &Path, env: Environment) -> Result<Router, LoadError> {
    for name in ENTRYPOINT_FILES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            info!(path = %candidate.display(), "loading entrypoint");
            let doc: EntrypointDoc = parse(&candidate)?;
            let router_doc = doc
                .router
                .ok_or_else(|| LoadError::BadEntrypoint(candidate.clone()))?;
            return router_from_doc(router_doc, &env);
        }
    }
    for name in DEFAULT_DEFINITION_FILES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return load_file(&candidate, env);
        }
    }
    Err(LoadError::NoDefinitionFound(dir.to_path_buf()))
}

/// Turn a parsed router definition into a router through builder calls.
/// Filters are registered before endpoints so pre-emption references
/// validate; mounts are attached last, in document order.
pub fn router_from_doc(doc: ApiDoc, env: &Environment) -> Result<Router, LoadError> {
    let mut router = Router::new();
    router.define_env("default", env.clone());

    if let Some(options) = doc.options {
        router.set_options(options)?;
    }

    for filter in doc.filters {
        debug!(name = %filter.name, handler = %filter.handler, "registering filter");
        router.filter(
            filter.name,
            FilterHandler::deferred(filter.handler, filter.env),
        )?;
    }

    for endpoint in doc.endpoints {
        let methods = endpoint
            .methods
            .iter()
            .map(|m| parse_method(m))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(path = %endpoint.path, handler = %endpoint.handler, "registering endpoint");
        let mut spec = HandleSpec::new(
            methods,
            endpoint.path,
            Handler::deferred(endpoint.handler, endpoint.env),
        );
        spec.params = endpoint.params.map(ParamSpec::named);
        spec.preempt = endpoint.preempt;
        spec.serializer = endpoint.serializer;
        spec.metadata = endpoint.metadata;
        router.handle(spec)?;
    }

    for static_mount in doc.statics {
        router.mount_static(&static_mount.prefix, StaticFiles::new(static_mount.dir));
    }

    for mount in doc.mounts {
        let child = router_from_doc(mount.router, env)?;
        router.mount(&mount.prefix, child);
    }

    Ok(router)
}

fn parse_method(name: &str) -> Result<Method, LoadError> {
    let method = Method::from_str(&name.to_ascii_uppercase())
        .map_err(|_| LoadError::UnsupportedMethod(name.to_string()))?;
    if !SUPPORTED_METHODS.contains(&method) {
        return Err(LoadError::UnsupportedMethod(name.to_string()));
    }
    Ok(method)
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_methods_outside_the_supported_set() {
        assert!(parse_method("get").is_ok());
        assert!(parse_method("PATCH").is_ok());
        assert!(matches!(
            parse_method("TRACE"),
            Err(LoadError::UnsupportedMethod(_))
        ));
        assert!(parse_method("YEET").is_err());
    }
}
