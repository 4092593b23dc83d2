use crate::error::HttpError;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// `application/x-www-form-urlencoded`
pub const CONTENT_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `application/json`
pub const CONTENT_JSON: &str = "application/json";

/// An inbound request as seen by the dispatcher.
///
/// The URI is reduced to its path and query string at construction; absolute
/// URIs (`http://host/path?q`) are accepted as well as origin-form ones.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Arc<[u8]>,
}

impl Request {
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = split_uri(uri);
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Arc::from(Vec::new()),
        }
    }

    /// Add a request header. Invalid names or values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid request header"),
        }
        self
    }

    /// Set the body along with its content type.
    #[must_use]
    pub fn with_body(self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut request = self.with_header(CONTENT_TYPE.as_str(), content_type);
        request.body = Arc::from(body.into());
        request
    }

    /// JSON body.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.with_body(CONTENT_JSON, bytes)
    }

    /// Form-urlencoded body.
    #[must_use]
    pub fn with_form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.with_body(CONTENT_FORM_URLENCODED, encoded)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path component, without query string or fragment.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Content type without parameters, e.g. `application/json` for
    /// `application/json; charset=utf-8`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str()).map(media_type)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn shared_body(&self) -> Arc<[u8]> {
        Arc::clone(&self.body)
    }
}

impl From<http::Request<Vec<u8>>> for Request {
    fn from(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let (path, query) = split_uri(&parts.uri.to_string());
        Self {
            method: parts.method,
            path,
            query,
            headers: parts.headers,
            body: Arc::from(body),
        }
    }
}

/// Media type portion of a `Content-Type` value.
pub(crate) fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}

fn split_uri(uri: &str) -> (String, Option<String>) {
    if let Ok(url) = Url::parse(uri) {
        if url.has_host() {
            return (url.path().to_string(), url.query().map(str::to_string));
        }
    }
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    match without_fragment.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (without_fragment.to_string(), None),
    }
}

/// Supplies the parsed parameter map for a request.
pub trait InputExtractor: Send + Sync {
    fn extract(&self, request: &Request) -> Result<Map<String, Value>, HttpError>;
}

/// Parameter extraction by content type:
///
/// - form-urlencoded bodies, with `a[]` / `a[b]` keys building nested
///   collections
/// - JSON bodies, which must hold an object
/// - the query string of GET requests
/// - nothing otherwise
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInputExtractor;

impl InputExtractor for DefaultInputExtractor {
    fn extract(&self, request: &Request) -> Result<Map<String, Value>, HttpError> {
        let params = match request.content_type() {
            Some(CONTENT_FORM_URLENCODED) => parse_form(request.body()),
            Some(CONTENT_JSON) => parse_json(request.body())?,
            _ if request.method() == Method::GET => {
                parse_form(request.query().unwrap_or_default().as_bytes())
            }
            _ => Map::new(),
        };
        debug!(
            method = %request.method(),
            content_type = ?request.content_type(),
            param_count = params.len(),
            "Extracted request parameters"
        );
        Ok(params)
    }
}

fn parse_json(body: &[u8]) -> Result<Map<String, Value>, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(HttpError::bad_request("request body must be a JSON object")),
        Err(e) => Err(HttpError::bad_request(format!(
            "request body is not valid JSON: {e}"
        ))),
    }
}

/// Next `[]` append index per nested collection, keyed by the collection's
/// path. `None` once an index of `usize::MAX` has been used.
type AppendIndex = HashMap<String, Option<usize>>;

/// Decode a form-urlencoded string into a nested parameter map.
pub fn parse_form(input: &[u8]) -> Map<String, Value> {
    let mut root = Map::new();
    let mut append = AppendIndex::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let (head, segments) = split_key(&key);
        if head.is_empty() {
            continue;
        }
        let value = Value::String(value.into_owned());
        if !insert_nested(&mut root, head, &segments, value, "", &mut append) {
            warn!(key = %key, "Form list index exhausted, parameter dropped");
        }
    }
    root.into_iter().map(|(k, v)| (k, collapse_lists(v))).collect()
}

/// `a[b][]` → (`a`, [`b`, ``]). Keys with unbalanced brackets are taken whole.
fn split_key(key: &str) -> (String, Vec<String>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), Vec::new());
    };
    let head = &key[..open];
    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key.to_string(), Vec::new());
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (key.to_string(), Vec::new());
    }
    (head.to_string(), segments)
}

/// Returns `false` when an `[]` segment had no index left to append at.
fn insert_nested(
    map: &mut Map<String, Value>,
    key: String,
    rest: &[String],
    value: Value,
    path: &str,
    append: &mut AppendIndex,
) -> bool {
    let Some((next, tail)) = rest.split_first() else {
        map.insert(key, value);
        return true;
    };
    let child_path = format!("{path}\0{key}");
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
        append.remove(&child_path);
    }
    let Value::Object(child) = slot else {
        return true;
    };
    let child_key = if next.is_empty() {
        match append.get(&child_path).copied().unwrap_or(Some(0)) {
            Some(index) => index.to_string(),
            None => return false,
        }
    } else {
        next.clone()
    };
    if let Ok(index) = child_key.parse::<usize>() {
        let following = index.checked_add(1);
        let counter = append.entry(child_path.clone()).or_insert(Some(0));
        *counter = match (*counter, following) {
            (Some(current), Some(following)) => Some(current.max(following)),
            _ => None,
        };
    }
    insert_nested(child, child_key, tail, value, &child_path, append)
}

/// Objects keyed `"0".."n-1"` in order become arrays.
fn collapse_lists(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let is_list = !map.is_empty()
                && map
                    .keys()
                    .enumerate()
                    .all(|(i, k)| k.parse::<usize>().ok() == Some(i));
            if is_list {
                Value::Array(map.into_iter().map(|(_, v)| collapse_lists(v)).collect())
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, collapse_lists(v)))
                        .collect(),
                )
            }
        }
        other => other,
    }
}
