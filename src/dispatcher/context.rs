use crate::payload::{Format, PayloadVerifier, VerifyError, VerifyOptions};
use crate::router::CaptureVec;
use crate::server::request::media_type;
use crate::server::{HeaderVec, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, StatusCode};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// `text/plain`
pub const CONTENT_TEXT: &str = "text/plain";
/// `text/html`, the default response content type.
pub const CONTENT_HTML: &str = "text/html";
/// `application/json`
pub const CONTENT_JSON: &str = crate::server::CONTENT_JSON;
/// `application/octet-stream`
pub const CONTENT_FILE_DOWNLOAD: &str = "application/octet-stream";
/// `application/x-www-form-urlencoded`
pub const CONTENT_FORM_URLENCODED: &str = crate::server::CONTENT_FORM_URLENCODED;

/// Per-request state shared by the dispatcher and the handler it runs.
///
/// A context belongs to exactly one dispatch cycle. Nested dispatchers get a
/// context of their own, seeded from the parent's.
pub struct RequestContext {
    method: Method,
    path: String,
    matches: CaptureVec,
    params: Map<String, Value>,
    status: StatusCode,
    content_type: String,
    headers: HeaderVec,
    body: Vec<u8>,
    request_headers: Arc<HeaderMap>,
    request_body: Arc<[u8]>,
    base_path: String,
    handler_method: Option<String>,
    verifier: Arc<PayloadVerifier>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("matches", &self.matches)
            .field("params", &self.params)
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("base_path", &self.base_path)
            .field("handler_method", &self.handler_method)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Fresh context: status 200, HTML content type, no parameters and the
    /// base payload vocabulary.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            matches: CaptureVec::new(),
            params: Map::new(),
            status: StatusCode::OK,
            content_type: CONTENT_HTML.to_string(),
            headers: HeaderVec::new(),
            body: Vec::new(),
            request_headers: Arc::new(HeaderMap::new()),
            request_body: Arc::from(Vec::new()),
            base_path: String::new(),
            handler_method: None,
            verifier: Arc::new(PayloadVerifier::default()),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<PayloadVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn with_request(mut self, headers: Arc<HeaderMap>, body: Arc<[u8]>) -> Self {
        self.request_headers = headers;
        self.request_body = body;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path relative to the base path (or, in a nested dispatcher,
    /// relative to the outer match).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Captures of the pattern that selected the current route; index 0 is
    /// the full match. Empty after a literal match.
    #[must_use]
    pub fn matches(&self) -> &CaptureVec {
        &self.matches
    }

    /// A single capture group, if it participated in the match.
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.matches.get(index).and_then(Option::as_deref)
    }

    pub(crate) fn set_matches(&mut self, matches: CaptureVec) {
        self.matches = matches;
    }

    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.params
    }

    /// A request parameter; null counts as absent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).filter(|v| !v.is_null())
    }

    /// A request parameter, or `default` when absent.
    #[must_use]
    pub fn param_or(&self, name: &str, default: Value) -> Value {
        self.param(name).cloned().unwrap_or(default)
    }

    /// Verify a copy of one parameter against `format` and return it
    /// promoted, or `default` when the parameter is absent.
    pub fn param_verify(
        &self,
        name: &str,
        format: &Format,
        default: Value,
    ) -> Result<Value, VerifyError> {
        self.param_verify_with(name, format, default, self.verifier.defaults())
    }

    pub fn param_verify_with(
        &self,
        name: &str,
        format: &Format,
        default: Value,
        options: VerifyOptions,
    ) -> Result<Value, VerifyError> {
        match self.param(name) {
            Some(value) => {
                let mut value = value.clone();
                self.verifier.verify_with(&mut value, format, options)?;
                Ok(value)
            }
            None => Ok(default),
        }
    }

    /// Verify a copy of the whole parameter map and return it promoted. The
    /// context's own parameters are left untouched.
    pub fn payload_verify(&self, format: &Format) -> Result<Value, VerifyError> {
        self.payload_verify_with(format, self.verifier.defaults())
    }

    pub fn payload_verify_with(
        &self,
        format: &Format,
        options: VerifyOptions,
    ) -> Result<Value, VerifyError> {
        let mut copy = Value::Object(self.params.clone());
        self.verifier.verify_with(&mut copy, format, options)?;
        Ok(copy)
    }

    #[must_use]
    pub fn verifier(&self) -> &PayloadVerifier {
        &self.verifier
    }

    /// Media type of the request body, without parameters.
    #[must_use]
    pub fn request_type(&self) -> Option<&str> {
        self.request_header(CONTENT_TYPE.as_str()).map(media_type)
    }

    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// Raw request body.
    #[must_use]
    pub fn request_body(&self) -> &[u8] {
        &self.request_body
    }

    /// Set a response header, replacing any header of the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Append text to the response body.
    pub fn echo(&mut self, text: impl AsRef<str>) {
        self.body.extend_from_slice(text.as_ref().as_bytes());
    }

    /// Append bytes to the response body.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether anything has been written to the response body yet.
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Absolute URI for `component` under the application base path, with
    /// `query` appended when non-empty.
    #[must_use]
    pub fn uri_for(&self, component: &str, query: &[(&str, &str)]) -> String {
        let mut uri = self.base_path.clone();
        if !component.starts_with('/') {
            uri.push('/');
        }
        uri.push_str(component);
        if !query.is_empty() {
            uri.push('?');
            uri.push_str(
                &url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(query)
                    .finish(),
            );
        }
        uri
    }

    /// Respond with 302 Found to `uri_for(component, query)`.
    pub fn redirect(&mut self, component: &str, query: &[(&str, &str)]) {
        let location = self.uri_for(component, query);
        self.status = StatusCode::FOUND;
        self.add_header(http::header::LOCATION.as_str(), location);
    }

    /// Method name selected by a `Type::method` descriptor, if any.
    #[must_use]
    pub fn handler_method(&self) -> Option<&str> {
        self.handler_method.as_deref()
    }

    pub(crate) fn set_handler_method(&mut self, method: impl Into<String>) {
        self.handler_method = Some(method.into());
    }

    /// Context for a nested dispatcher: the path loses the full outer match
    /// (falling back to `/`), method, parameters and base path carry over,
    /// and the parent's headers win over `defaults`.
    pub(crate) fn seed_nested(
        &self,
        defaults: &HeaderVec,
        verifier: Arc<PayloadVerifier>,
    ) -> RequestContext {
        let prefix = self.capture(0).unwrap_or_default();
        let mut child = RequestContext {
            method: self.method.clone(),
            path: relative_path(prefix, &self.path),
            matches: CaptureVec::new(),
            params: self.params.clone(),
            status: StatusCode::OK,
            content_type: CONTENT_HTML.to_string(),
            headers: defaults.clone(),
            body: Vec::new(),
            request_headers: Arc::clone(&self.request_headers),
            request_body: Arc::clone(&self.request_body),
            base_path: self.base_path.clone(),
            handler_method: None,
            verifier,
        };
        for (name, value) in &self.headers {
            child.add_header(name.as_str(), value.as_str());
        }
        child
    }

    #[must_use]
    pub fn into_response(self) -> Response {
        Response {
            status: self.status,
            content_type: self.content_type,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl fmt::Write for RequestContext {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.echo(s);
        Ok(())
    }
}

/// Normalize a configured base path: forward slashes, no trailing slash.
pub(crate) fn normalize_base_path(base_path: &str) -> String {
    base_path.replace('\\', "/").trim_end_matches('/').to_string()
}

/// `path` relative to `base`: the prefix is stripped when present (an empty
/// remainder becomes `/`) and a leading `/` is ensured.
pub(crate) fn relative_path(base: &str, path: &str) -> String {
    let mut relative = path;
    if !base.is_empty() {
        if let Some(rest) = path.strip_prefix(base) {
            relative = if rest.is_empty() { "/" } else { rest };
        }
    }
    if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{relative}")
    }
}
