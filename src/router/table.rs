use super::pattern::{CaptureVec, RoutePattern};
use crate::error::{RouterError, RouterResult};
use http::Method;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Methods that get a route bucket. Requests for any other method are
/// reported as unrecognized rather than not found.
pub const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Methods served by a catch-all no-op when nothing user-registered matches.
const SAFE_DEFAULT_METHODS: [Method; 2] = [Method::HEAD, Method::OPTIONS];

/// Which buckets a registration applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// Every supported method.
    All,
    Only(Vec<Method>),
}

impl MethodFilter {
    fn methods(&self) -> Vec<Method> {
        match self {
            MethodFilter::All => SUPPORTED_METHODS.to_vec(),
            MethodFilter::Only(methods) => methods.clone(),
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        MethodFilter::Only(vec![method])
    }
}

impl From<Vec<Method>> for MethodFilter {
    fn from(methods: Vec<Method>) -> Self {
        MethodFilter::Only(methods)
    }
}

impl<const N: usize> From<[Method; N]> for MethodFilter {
    fn from(methods: [Method; N]) -> Self {
        MethodFilter::Only(methods.to_vec())
    }
}

/// How a route was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact string equality with the registered key.
    Literal,
    /// The key's regex matched.
    Pattern,
}

impl MatchKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Literal => "literal",
            MatchKind::Pattern => "pattern",
        }
    }
}

/// A matched route entry.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub pattern: &'a str,
    /// Regex captures, full match first. Empty for literal matches.
    pub captures: CaptureVec,
    pub kind: MatchKind,
}

/// Outcome of [`RouteTable::lookup`].
#[derive(Debug)]
pub enum RouteLookup<'a, H> {
    Matched(RouteMatch<'a, H>),
    /// HEAD/OPTIONS with no user route: the default no-op applies. Carries
    /// the full path as its only capture.
    Fallback(CaptureVec),
    /// The method has a bucket but nothing in it matched.
    NotFound,
    /// The method has no bucket at all.
    MethodNotRecognized,
}

#[derive(Debug, Clone)]
struct Route<H> {
    pattern: RoutePattern,
    handler: H,
}

#[derive(Debug, Clone)]
struct Bucket<H> {
    routes: Vec<Route<H>>,
    index: HashMap<String, usize>,
}

impl<H> Default for Bucket<H> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<H> Bucket<H> {
    fn insert(&mut self, pattern: RoutePattern, handler: H) {
        match self.index.get(pattern.as_str()) {
            Some(&slot) => self.routes[slot] = Route { pattern, handler },
            None => {
                self.index
                    .insert(pattern.as_str().to_string(), self.routes.len());
                self.routes.push(Route { pattern, handler });
            }
        }
    }
}

/// Per-method ordered route table.
///
/// Within a bucket, an exact key match always wins; otherwise keys are tried
/// as patterns in registration order. Re-registering a key replaces its
/// handler without moving it.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    buckets: HashMap<Method, Bucket<H>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTable<H> {
    /// Table with an empty bucket for every supported method.
    #[must_use]
    pub fn new() -> Self {
        let buckets = SUPPORTED_METHODS
            .iter()
            .map(|m| (m.clone(), Bucket::default()))
            .collect();
        Self { buckets }
    }

    fn check_methods(&self, methods: &[Method]) -> RouterResult<()> {
        match methods.iter().find(|m| !self.buckets.contains_key(*m)) {
            Some(bad) => Err(RouterError::Configuration(format!(
                "bad request method '{bad}'"
            ))),
            None => Ok(()),
        }
    }

    /// Register `handler` under `pattern` for every method in `methods`,
    /// replacing existing entries with the same key.
    pub fn add(
        &mut self,
        methods: impl Into<MethodFilter>,
        pattern: &str,
        handler: H,
    ) -> RouterResult<()>
    where
        H: Clone,
    {
        let methods = methods.into().methods();
        self.check_methods(&methods)?;
        let compiled = RoutePattern::parse(pattern)?;
        for method in &methods {
            if let Some(bucket) = self.buckets.get_mut(method) {
                bucket.insert(compiled.clone(), handler.clone());
            }
        }
        info!(
            methods = ?methods,
            pattern = %pattern,
            is_regex = compiled.is_regex(),
            "Route registered"
        );
        Ok(())
    }

    /// Register `handler` only if `pattern` is not yet in the bucket.
    /// Returns whether the entry was added.
    pub fn add_if_absent(&mut self, method: &Method, pattern: &str, handler: H) -> RouterResult<bool> {
        self.check_methods(std::slice::from_ref(method))?;
        let Some(bucket) = self.buckets.get_mut(method) else {
            return Ok(false);
        };
        if bucket.index.contains_key(pattern) {
            debug!(method = %method, pattern = %pattern, "Route already registered, keeping first");
            return Ok(false);
        }
        let compiled = RoutePattern::parse(pattern)?;
        info!(
            method = %method,
            pattern = %pattern,
            is_regex = compiled.is_regex(),
            "Route registered"
        );
        bucket.insert(compiled, handler);
        Ok(true)
    }

    /// Resolve `(method, path)` against the table.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup<'_, H> {
        debug!(method = %method, path = %path, "Route match attempt");

        let Some(bucket) = self.buckets.get(method) else {
            warn!(method = %method, path = %path, "Request method not recognized");
            return RouteLookup::MethodNotRecognized;
        };

        if let Some(&slot) = bucket.index.get(path) {
            let route = &bucket.routes[slot];
            debug!(
                method = %method,
                path = %path,
                pattern = %route.pattern,
                match_kind = MatchKind::Literal.as_str(),
                "Route matched"
            );
            return RouteLookup::Matched(RouteMatch {
                handler: &route.handler,
                pattern: route.pattern.as_str(),
                captures: CaptureVec::new(),
                kind: MatchKind::Literal,
            });
        }

        for route in &bucket.routes {
            if let Some(captures) = route.pattern.captures(path) {
                debug!(
                    method = %method,
                    path = %path,
                    pattern = %route.pattern,
                    captures = ?captures,
                    match_kind = MatchKind::Pattern.as_str(),
                    "Route matched"
                );
                return RouteLookup::Matched(RouteMatch {
                    handler: &route.handler,
                    pattern: route.pattern.as_str(),
                    captures,
                    kind: MatchKind::Pattern,
                });
            }
        }

        if SAFE_DEFAULT_METHODS.contains(method) {
            debug!(method = %method, path = %path, "Default no-op route matched");
            let mut captures = CaptureVec::new();
            captures.push(Some(path.to_string()));
            return RouteLookup::Fallback(captures);
        }

        warn!(method = %method, path = %path, "No route matched");
        RouteLookup::NotFound
    }

    /// Registered keys for `method`, in registration order.
    pub fn patterns(&self, method: &Method) -> impl Iterator<Item = &str> + '_ {
        self.buckets
            .get(method)
            .into_iter()
            .flat_map(|bucket| bucket.routes.iter().map(|r| r.pattern.as_str()))
    }

    /// Total number of entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.routes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
