//! Boundary adapters between the dispatcher and a transport: inbound
//! [`Request`]s with their parameter extraction, outbound [`Response`]s with
//! their flush sink.

pub mod request;
pub mod response;

pub use request::{
    parse_form, DefaultInputExtractor, InputExtractor, Request, CONTENT_FORM_URLENCODED,
    CONTENT_JSON,
};
pub use response::{HeaderVec, Http1Writer, Response, ResponseSink, MAX_INLINE_HEADERS};
