use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::io::{self, Write};

/// Maximum inline response headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Response header storage; most responses carry only a handful of headers.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// The outcome of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Response {
    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// First header with the given name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert into an `http::Response`. Fails on header names or values that
    /// are not valid HTTP.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, HeaderValue::from_str(&self.content_type)?);
        for (name, value) in &self.headers {
            builder = builder.header(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        builder.body(self.body)
    }

    /// Hand status, content type, headers and body to `sink`.
    pub fn flush_to<S: ResponseSink + ?Sized>(&self, sink: &mut S) -> io::Result<()> {
        sink.emit(self.status, &self.content_type, &self.headers, &self.body)
    }
}

/// The flush boundary: whatever puts a response on the wire.
pub trait ResponseSink {
    fn emit(
        &mut self,
        status: StatusCode,
        content_type: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> io::Result<()>;
}

/// Writes responses as HTTP/1.1 text to any `std::io::Write`.
#[derive(Debug)]
pub struct Http1Writer<W: Write> {
    inner: W,
}

impl<W: Write> Http1Writer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ResponseSink for Http1Writer<W> {
    fn emit(
        &mut self,
        status: StatusCode,
        content_type: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> io::Result<()> {
        write!(
            self.inner,
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status_reason(status)
        )?;
        write!(self.inner, "{}: {}\r\n", CONTENT_TYPE, content_type)?;
        for (name, value) in headers {
            write!(self.inner, "{name}: {value}\r\n")?;
        }
        write!(self.inner, "{}: {}\r\n\r\n", CONTENT_LENGTH, body.len())?;
        self.inner.write_all(body)?;
        self.inner.flush()
    }
}
