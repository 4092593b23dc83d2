//! # Error Taxonomy
//!
//! Every fault the dispatcher can observe is expressed as a [`RouterError`].
//! The variants fall into two families:
//!
//! - **Recognized** faults carry an HTTP-style status, a short label and a
//!   long reason ([`HttpError`]). Contract violations, missing routes,
//!   unrecognized methods and errors raised explicitly by handlers belong here.
//!   They are delivered to [`ErrorHandler::handle_router_error`].
//! - **Unrecognized** faults are everything else: configuration faults, parse
//!   errors and arbitrary handler failures. They are delivered to
//!   [`ErrorHandler::handle_server_error`] and presented as a generic 500.
//!
//! Handlers return `anyhow::Result`, so any error type can travel out of a
//! handler with `?`. [`classify`] recovers the taxonomy by downcasting.
//!
//! [`ErrorHandler::handle_router_error`]: crate::dispatcher::ErrorHandler::handle_router_error
//! [`ErrorHandler::handle_server_error`]: crate::dispatcher::ErrorHandler::handle_server_error

use crate::payload::{ContractViolation, FormatError, VerifyError};
use http::StatusCode;

/// A recognized contract/business error raised by a request handler.
///
/// The triple of status, short label and long reason fully determines what
/// the client sees when an error handler is installed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {error}")]
pub struct HttpError {
    status: StatusCode,
    error: String,
    reason: String,
}

impl HttpError {
    /// Create an error with an explicit label and reason.
    pub fn new(status: StatusCode, error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            reason: reason.into(),
        }
    }

    /// Create an error carrying only a status; the label is the canonical
    /// reason phrase and the long reason is empty.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or(""), "")
    }

    /// 400 with the given long reason.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", reason)
    }

    /// 404 with the given long reason.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", reason)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Short error label.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Long-form error reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A scalar/structural format string could not be parsed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A delimited route pattern has a body that is not a valid regex.
    #[error("invalid route pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A programming error in route setup (unresolvable descriptor, nested
    /// dispatcher without a pattern capture, unsupported method bucket).
    #[error("configuration fault: {0}")]
    Configuration(String),

    /// The request payload did not satisfy its contract.
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    /// No registered pattern matched the request path. The dispatcher runs
    /// its not-found descriptor instead of raising this; a not-found handler
    /// raises it to hand the miss to the error handler as a 404.
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The request method has no bucket in the route table at all.
    #[error("request method '{0}' is not recognized")]
    MethodNotRecognized(String),

    /// A recognized error raised by a handler.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Anything else a handler raised.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl From<VerifyError> for RouterError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Format(e) => RouterError::Format(e),
            VerifyError::Violation(v) => RouterError::Contract(v),
        }
    }
}

impl RouterError {
    /// The recognized status/label/reason triple, or `None` for faults that
    /// only get a generic server-error presentation.
    #[must_use]
    pub fn as_http(&self) -> Option<HttpError> {
        match self {
            RouterError::Contract(v) => Some(HttpError::bad_request(v.to_string())),
            RouterError::RouteNotFound { method, path } => Some(HttpError::not_found(format!(
                "no route matches {method} {path}"
            ))),
            RouterError::MethodNotRecognized(method) => Some(HttpError::new(
                StatusCode::NOT_IMPLEMENTED,
                "Not Implemented",
                format!("request method '{method}' is not recognized"),
            )),
            RouterError::Http(e) => Some(e.clone()),
            RouterError::Format(_)
            | RouterError::Pattern { .. }
            | RouterError::Configuration(_)
            | RouterError::Unclassified(_) => None,
        }
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.as_http().is_some()
    }

    /// The status a host should emit for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.as_http()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, |e| e.status())
    }
}

/// Recover the taxonomy from an error raised anywhere in a dispatch cycle.
pub fn classify(error: anyhow::Error) -> RouterError {
    let error = match error.downcast::<RouterError>() {
        Ok(e) => return e,
        Err(e) => e,
    };
    let error = match error.downcast::<HttpError>() {
        Ok(e) => return RouterError::Http(e),
        Err(e) => e,
    };
    let error = match error.downcast::<VerifyError>() {
        Ok(e) => return e.into(),
        Err(e) => e,
    };
    let error = match error.downcast::<ContractViolation>() {
        Ok(e) => return RouterError::Contract(e),
        Err(e) => e,
    };
    match error.downcast::<FormatError>() {
        Ok(e) => RouterError::Format(e),
        Err(e) => RouterError::Unclassified(e),
    }
}

/// Convenience result type for configuration-time operations.
pub type RouterResult<T> = Result<T, RouterError>;
