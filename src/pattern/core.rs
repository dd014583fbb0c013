use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::BuildError;

/// Maximum number of captures held inline before spilling to the heap.
/// Most API paths carry no more than a handful of dynamic segments.
pub const MAX_INLINE_CAPTURES: usize = 8;

/// Stack-allocated capture storage. Names come from the compiled pattern and
/// are shared via `Arc`; values are per-request path data.
pub type CaptureVec = SmallVec<[(Arc<str>, String); MAX_INLINE_CAPTURES]>;

/// `double` syntax: decimal with optional fraction and exponent. `f64::parse`
/// also accepts `inf` and `nan`, which must not match a path segment.
static DOUBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("double pattern is valid")
});

/// Type tag carried by a dynamic path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Int,
    Double,
    Str,
}

impl ParamType {
    /// Parse a tag as written in a pattern. `logical` and `numeric` are
    /// aliases accepted for input-source compatibility.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "bool" | "logical" => Some(ParamType::Bool),
            "int" => Some(ParamType::Int),
            "double" | "numeric" => Some(ParamType::Double),
            "string" => Some(ParamType::Str),
            _ => None,
        }
    }

    /// Whether a raw path segment is admissible for this type. A mismatch is
    /// a routing no-match, never an error.
    pub fn admits(&self, raw: &str) -> bool {
        match self {
            ParamType::Str => !raw.is_empty(),
            ParamType::Int => raw.parse::<i64>().is_ok(),
            ParamType::Double => DOUBLE_RE.is_match(raw),
            ParamType::Bool => matches!(
                raw.to_ascii_lowercase().as_str(),
                "true" | "false" | "0" | "1" | "yes" | "no"
            ),
        }
    }

    /// Coerce a validated raw segment into its typed JSON value. Only path
    /// captures are coerced; query values always stay strings.
    pub fn coerce(&self, raw: &str) -> Value {
        match self {
            ParamType::Str => Value::String(raw.to_string()),
            ParamType::Int => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            ParamType::Double => raw
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            ParamType::Bool => {
                let truthy = matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
                Value::Bool(truthy)
            }
        }
    }

    /// Matching precedence among dynamic children: lower sorts first.
    /// Literal children always beat dynamic ones; among dynamic, the more
    /// specific tag wins and `string` comes last.
    pub fn specificity(&self) -> u8 {
        match self {
            ParamType::Int => 0,
            ParamType::Double => 1,
            ParamType::Bool => 2,
            ParamType::Str => 3,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::Double => "double",
            ParamType::Str => "string",
        };
        write!(f, "{tag}")
    }
}

/// One compiled segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Capture { name: Arc<str>, ty: ParamType },
}

/// Ordered (name, type) descriptor for one dynamic segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSpec {
    pub name: Arc<str>,
    pub ty: ParamType,
}

/// A compiled path pattern: an ordered sequence of literal and capture
/// segments plus the capture descriptors in declaration order.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    captures: Vec<CaptureSpec>,
    trailing_slash: bool,
}

impl PathPattern {
    /// Compile a pattern string. The empty pattern equals `/`; a missing
    /// leading slash is prepended rather than rejected.
    pub fn compile(pattern: &str) -> Result<Self, BuildError> {
        let raw = normalize(pattern);
        let trailing_slash = raw.len() > 1 && raw.ends_with('/');

        let mut segments = Vec::new();
        let mut captures = Vec::new();
        for part in raw.split('/').filter(|p| !p.is_empty()) {
            if part.starts_with('<') || part.ends_with('>') {
                let inner = part
                    .strip_prefix('<')
                    .and_then(|p| p.strip_suffix('>'))
                    .ok_or_else(|| BuildError::MalformedPattern {
                        pattern: raw.clone(),
                        reason: format!("unbalanced capture brackets in `{part}`"),
                    })?;
                let (name, ty) = match inner.split_once(':') {
                    Some((name, tag)) => {
                        let ty = ParamType::from_tag(tag).ok_or_else(|| {
                            BuildError::UnknownTypeTag {
                                pattern: raw.clone(),
                                tag: tag.to_string(),
                            }
                        })?;
                        (name, ty)
                    }
                    None => (inner, ParamType::Str),
                };
                if name.is_empty() {
                    return Err(BuildError::MalformedPattern {
                        pattern: raw.clone(),
                        reason: "capture segment has no name".to_string(),
                    });
                }
                let name: Arc<str> = Arc::from(name);
                captures.push(CaptureSpec {
                    name: name.clone(),
                    ty,
                });
                segments.push(Segment::Capture { name, ty });
            } else if part.contains('<') || part.contains('>') {
                return Err(BuildError::MalformedPattern {
                    pattern: raw.clone(),
                    reason: format!("stray capture bracket in `{part}`"),
                });
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(PathPattern {
            raw,
            segments,
            captures,
            trailing_slash,
        })
    }

    /// The normalized pattern string as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Ordered capture descriptors declared by this pattern.
    pub fn captures(&self) -> &[CaptureSpec] {
        &self.captures
    }

    /// Whether the pattern was registered with a trailing slash.
    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// Attempt a full match against a request path. Literal comparison is
    /// case-sensitive; typed captures validate before succeeding.
    pub fn matches(&self, path: &str) -> Option<CaptureVec> {
        let path_trailing = path.len() > 1 && path.ends_with('/');
        if path_trailing != self.trailing_slash {
            return None;
        }
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        self.consume(&parts).map(|(captures, _)| captures)
    }

    /// Prefix match for subrouter use: consumes as many leading path
    /// segments as the pattern declares and returns the unconsumed suffix,
    /// `/`-prefixed (or `/` itself when nothing remains).
    pub fn matches_prefix(&self, path: &str) -> Option<(CaptureVec, String)> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() < self.segments.len() {
            return None;
        }
        let (captures, consumed) = self.consume(&parts[..self.segments.len()])?;
        let rest = if consumed == parts.len() {
            "/".to_string()
        } else {
            format!("/{}", parts[consumed..].join("/"))
        };
        Some((captures, rest))
    }

    fn consume(&self, parts: &[&str]) -> Option<(CaptureVec, usize)> {
        let mut captures = CaptureVec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Capture { name, ty } => {
                    if !ty.admits(part) {
                        return None;
                    }
                    captures.push((name.clone(), (*part).to_string()));
                }
            }
        }
        Some((captures, self.segments.len()))
    }
}

/// Prepend a leading `/` when absent; the empty pattern equals `/`.
pub(crate) fn normalize(pattern: &str) -> String {
    if pattern.is_empty() {
        "/".to_string()
    } else if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{pattern}")
    }
}
