//! Route tree: a trie keyed by literal segments with dynamic children
//! bucketed by type tag.
//!
//! Matching precedence at every node: literal child first, then dynamic
//! children ordered by type specificity (`int`/`double`/`bool` before
//! `string`), then registration order. The walk backtracks, so a literal
//! child that dead-ends does not hide a dynamic sibling that would have
//! matched the full path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use http::Method;
use tracing::warn;

use crate::endpoint::Endpoint;
use crate::pattern::{CaptureVec, ParamType, PathPattern, Segment};

/// An endpoint stored in the tree along with its registration sequence
/// number; the sequence decides shadowing against mounts.
#[derive(Debug, Clone)]
struct Registered {
    endpoint: Arc<Endpoint>,
    seq: usize,
}

/// A successful tree lookup.
#[derive(Debug, Clone)]
pub struct TrieMatch {
    pub endpoint: Arc<Endpoint>,
    pub seq: usize,
    pub captures: CaptureVec,
}

#[derive(Debug)]
struct DynChild {
    name: Arc<str>,
    ty: ParamType,
    node: Node,
}

#[derive(Debug, Default)]
struct Node {
    literals: BTreeMap<String, Node>,
    dynamics: Vec<DynChild>,
    /// Terminals keyed by verb and by whether the registered pattern carried
    /// a trailing slash; `/t` and `/t/` are distinct routes.
    endpoints: HashMap<(Method, bool), Registered>,
}

#[derive(Debug, Default)]
pub struct RouteTrie {
    root: Node,
}

impl RouteTrie {
    /// Insert an endpoint under every verb it accepts. Re-registering a
    /// (verb, path) pair replaces the previous endpoint.
    pub fn insert(&mut self, endpoint: Arc<Endpoint>, seq: usize) {
        let trailing = endpoint.pattern().has_trailing_slash();
        let mut node = descend(&mut self.root, endpoint.pattern());
        for method in endpoint.methods() {
            let previous = node.endpoints.insert(
                (method.clone(), trailing),
                Registered {
                    endpoint: endpoint.clone(),
                    seq,
                },
            );
            if previous.is_some() {
                warn!(
                    method = %method,
                    path = endpoint.pattern().as_str(),
                    "replaced an existing endpoint registration"
                );
            }
        }
    }

    /// Remove the endpoint registered for (verb, path). Absent entries are
    /// ignored.
    pub fn remove(&mut self, method: &Method, pattern: &PathPattern) {
        let trailing = pattern.has_trailing_slash();
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            let next = match segment {
                Segment::Literal(lit) => node.literals.get_mut(lit),
                Segment::Capture { name, ty } => node
                    .dynamics
                    .iter_mut()
                    .find(|d| d.name == *name && d.ty == *ty)
                    .map(|d| &mut d.node),
            };
            match next {
                Some(n) => node = n,
                None => return,
            }
        }
        node.endpoints.remove(&(method.clone(), trailing));
    }

    /// Look up (verb, path). Returns the match, or the verb set registered
    /// at the path's node when the path exists under other verbs only.
    pub fn find(&self, method: &Method, path: &str) -> Result<Option<TrieMatch>, Vec<Method>> {
        let trailing = path.len() > 1 && path.ends_with('/');
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut mismatch: Option<Vec<Method>> = None;
        let mut captures = CaptureVec::new();
        let found = walk(
            &self.root,
            method,
            trailing,
            &parts,
            &mut captures,
            &mut mismatch,
        );
        match (found, mismatch) {
            (Some(m), _) => Ok(Some(m)),
            (None, Some(allow)) => Err(allow),
            (None, None) => Ok(None),
        }
    }

    /// Child segment names directly under `path`, literals sorted first,
    /// dynamic children in registration order displayed as `<name:type>`.
    pub fn segments_at(&self, path: &str) -> Vec<String> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut node = &self.root;
        for part in parts {
            match node.literals.get(part) {
                Some(n) => node = n,
                None => return Vec::new(),
            }
        }
        let mut keys: Vec<String> = node.literals.keys().cloned().collect();
        for dynamic in &node.dynamics {
            match dynamic.ty {
                ParamType::Str => keys.push(format!("<{}>", dynamic.name)),
                ty => keys.push(format!("<{}:{}>", dynamic.name, ty)),
            }
        }
        keys
    }

    /// Every registered (verb, pattern) pair, ordered by path then method.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::new();
        collect(&self.root, &mut out);
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        out
    }
}

fn descend<'a>(root: &'a mut Node, pattern: &PathPattern) -> &'a mut Node {
    let mut node = root;
    for segment in pattern.segments() {
        node = match segment {
            Segment::Literal(lit) => node.literals.entry(lit.clone()).or_default(),
            Segment::Capture { name, ty } => {
                let existing = node
                    .dynamics
                    .iter()
                    .position(|d| d.name == *name && d.ty == *ty);
                let idx = match existing {
                    Some(idx) => idx,
                    None => {
                        node.dynamics.push(DynChild {
                            name: name.clone(),
                            ty: *ty,
                            node: Node::default(),
                        });
                        node.dynamics.len() - 1
                    }
                };
                &mut node.dynamics[idx].node
            }
        };
    }
    node
}

fn walk(
    node: &Node,
    method: &Method,
    trailing: bool,
    parts: &[&str],
    captures: &mut CaptureVec,
    mismatch: &mut Option<Vec<Method>>,
) -> Option<TrieMatch> {
    if parts.is_empty() {
        if let Some(found) = node.endpoints.get(&(method.clone(), trailing)) {
            return Some(TrieMatch {
                endpoint: found.endpoint.clone(),
                seq: found.seq,
                captures: captures.clone(),
            });
        }
        let allow: Vec<Method> = node
            .endpoints
            .keys()
            .filter(|(_, t)| *t == trailing)
            .map(|(m, _)| m.clone())
            .collect();
        if !allow.is_empty() && mismatch.is_none() {
            *mismatch = Some(allow);
        }
        return None;
    }

    let (head, rest) = (parts[0], &parts[1..]);

    if let Some(child) = node.literals.get(head) {
        if let Some(found) = walk(child, method, trailing, rest, captures, mismatch) {
            return Some(found);
        }
    }

    // Dynamic children: most specific type first, insertion order breaks ties.
    let mut order: Vec<usize> = (0..node.dynamics.len()).collect();
    order.sort_by_key(|&i| node.dynamics[i].ty.specificity());
    for i in order {
        let dynamic = &node.dynamics[i];
        if !dynamic.ty.admits(head) {
            continue;
        }
        captures.push((dynamic.name.clone(), head.to_string()));
        if let Some(found) = walk(&dynamic.node, method, trailing, rest, captures, mismatch) {
            return Some(found);
        }
        captures.pop();
    }

    None
}

fn collect(node: &Node, out: &mut Vec<(Method, String)>) {
    for ((method, _), registered) in &node.endpoints {
        out.push((
            method.clone(),
            registered.endpoint.pattern().as_str().to_string(),
        ));
    }
    for child in node.literals.values() {
        collect(child, out);
    }
    for dynamic in &node.dynamics {
        collect(&dynamic.node, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use serde_json::json;

    fn endpoint(methods: &[Method], path: &str) -> Arc<Endpoint> {
        Arc::new(
            Endpoint::new(
                methods.to_vec(),
                path,
                Handler::direct(|_req, _res, _args| Ok(json!(null))),
            )
            .unwrap(),
        )
    }

    fn trie(entries: &[(&[Method], &str)]) -> RouteTrie {
        let mut trie = RouteTrie::default();
        for (seq, (methods, path)) in entries.iter().enumerate() {
            trie.insert(endpoint(methods, path), seq);
        }
        trie
    }

    #[test]
    fn literal_beats_dynamic() {
        let trie = trie(&[
            (&[Method::GET], "/pets/<id>"),
            (&[Method::GET], "/pets/count"),
        ]);
        let m = trie.find(&Method::GET, "/pets/count").unwrap().unwrap();
        assert_eq!(m.endpoint.pattern().as_str(), "/pets/count");
        let m = trie.find(&Method::GET, "/pets/9").unwrap().unwrap();
        assert_eq!(m.endpoint.pattern().as_str(), "/pets/<id>");
    }

    #[test]
    fn more_specific_type_wins() {
        let trie = trie(&[
            (&[Method::GET], "/v/<x>"),
            (&[Method::GET], "/v/<n:int>"),
        ]);
        let m = trie.find(&Method::GET, "/v/12").unwrap().unwrap();
        assert_eq!(m.endpoint.pattern().as_str(), "/v/<n:int>");
        let m = trie.find(&Method::GET, "/v/abc").unwrap().unwrap();
        assert_eq!(m.endpoint.pattern().as_str(), "/v/<x>");
    }

    #[test]
    fn backtracks_past_a_dead_end_literal() {
        let trie = trie(&[
            (&[Method::GET], "/a/b/deep"),
            (&[Method::GET], "/a/<x>"),
        ]);
        // literal child `b` exists but has no terminal at depth 2
        let m = trie.find(&Method::GET, "/a/b").unwrap().unwrap();
        assert_eq!(m.endpoint.pattern().as_str(), "/a/<x>");
    }

    #[test]
    fn verb_mismatch_reports_the_allow_set() {
        let trie = trie(&[(&[Method::GET, Method::PUT], "/thing")]);
        let allow = trie.find(&Method::POST, "/thing").unwrap_err();
        assert_eq!(allow.len(), 2);
        assert!(allow.contains(&Method::GET));
        assert!(allow.contains(&Method::PUT));
    }

    #[test]
    fn one_endpoint_under_multiple_verbs() {
        let ep = endpoint(&[Method::GET, Method::POST], "/multi");
        let mut trie = RouteTrie::default();
        trie.insert(ep, 0);
        assert!(trie.find(&Method::GET, "/multi").unwrap().is_some());
        assert!(trie.find(&Method::POST, "/multi").unwrap().is_some());
    }

    #[test]
    fn trailing_slash_routes_are_distinct() {
        let trie = trie(&[(&[Method::GET], "/t")]);
        assert!(trie.find(&Method::GET, "/t").unwrap().is_some());
        assert!(trie.find(&Method::GET, "/t/").unwrap().is_none());
    }

    #[test]
    fn remove_then_miss() {
        let mut trie = trie(&[(&[Method::GET], "/gone")]);
        let pattern = PathPattern::compile("/gone").unwrap();
        trie.remove(&Method::GET, &pattern);
        assert!(trie.find(&Method::GET, "/gone").unwrap().is_none());
        // removing again is silent
        trie.remove(&Method::GET, &pattern);
    }

    #[test]
    fn segments_listing_is_sorted() {
        let trie = trie(&[
            (&[Method::GET], "/v/b/c/f"),
            (&[Method::GET], "/v/b/c/a"),
            (&[Method::GET], "/v/b/c/b"),
        ]);
        assert_eq!(trie.segments_at("/v/b/c"), vec!["a", "b", "f"]);
    }

    #[test]
    fn captures_accumulate_along_the_walk() {
        let trie = trie(&[(&[Method::GET], "/org/<org:int>/user/<user>")]);
        let m = trie.find(&Method::GET, "/org/3/user/ada").unwrap().unwrap();
        let caps: Vec<(String, String)> = m
            .captures
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(
            caps,
            vec![
                ("org".to_string(), "3".to_string()),
                ("user".to_string(), "ada".to_string())
            ]
        );
    }
}
