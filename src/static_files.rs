use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Serves files from a base directory under a mount prefix. Byte streaming
/// and caching live in the transport; this handler only resolves the path,
/// guards against traversal, and loads the bytes with a content type.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let clean = url_path.trim_start_matches('/');
        let clean = if clean.is_empty() { "index.html" } else { clean };
        let mut resolved = self.base_dir.clone();
        for comp in Path::new(clean).components() {
            match comp {
                Component::Normal(s) => {
                    // Windows-style separators hide `..` from Components on unix
                    if s.to_str().map(|s| s.contains("..")).unwrap_or(true) {
                        return None;
                    }
                    resolved.push(s);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "ico" => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    /// Resolve and read a file under the base directory. An escaping or
    /// missing path is `NotFound`.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}
