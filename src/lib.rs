//! # pactrouter
//!
//! **pactrouter** is a synchronous request dispatcher with nested
//! sub-dispatchers, paired with a compact payload contract language.
//!
//! ## Overview
//!
//! Two subsystems do the real work:
//!
//! - **Dispatch engine**: maps `(method, path)` to a registered handler
//!   descriptor, literal keys first and then delimited regular expressions in
//!   registration order, resolves the descriptor (callable, class reference,
//!   instance, nested dispatcher, or named type), runs it, and routes faults to
//!   the error handler of the dispatcher that was active.
//! - **Payload contract engine**: scalar formats such as `"siI+"` (string or
//!   integer, promoted to integer, positive) nested in sequences and keyed
//!   shapes, verified recursively with promotions applied in place.
//!
//! ## Architecture
//!
//! - **[`payload`]** - schema registry, format parser, structural verifier
//! - **[`router`]** - per-method route tables and pattern matching
//! - **[`dispatcher`]** - request context, descriptor resolution, dispatch
//!   cycle, optional behaviours (REST results, `Type::method`, error handling)
//! - **[`server`]** - boundary adapters: request input extraction and
//!   response emission
//! - **[`error`]** - error taxonomy and classification
//! - **[`config`]** / **[`logging`]** - configuration and tracing setup
//! - **[`cli`]** - the `pactrouter` command line
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Nested as Nested Dispatcher
//!     participant Handler
//!     participant Errors as ErrorHandler
//!
//!     Host->>Dispatcher: route(Request)
//!     Dispatcher->>Dispatcher: strip base path, extract params
//!     Dispatcher->>Table: lookup(method, path)
//!     alt Method not recognized
//!         Dispatcher->>Errors: handle_router_error (501)
//!     else No route
//!         Dispatcher->>Handler: not-found handler (404)
//!     else Pattern matched a nested dispatcher
//!         Dispatcher->>Nested: run cycle on path after the match
//!         Nested->>Handler: run(ctx)
//!     else Matched
//!         Dispatcher->>Handler: run(ctx)
//!     end
//!     alt Handler failed
//!         Dispatcher->>Errors: innermost handler in the chain
//!     end
//!     Dispatcher-->>Host: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use pactrouter::dispatcher::{Descriptor, Dispatcher, JsonErrorHandler, RequestContext};
//! use pactrouter::payload::Format;
//! use pactrouter::server::Request;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut dispatcher = Dispatcher::new(Descriptor::nop())
//!     .with_rest_handling()
//!     .with_error_handler(Arc::new(JsonErrorHandler));
//!
//! dispatcher
//!     .add_route(
//!         Method::POST,
//!         "/people",
//!         Descriptor::callable(|ctx: &mut RequestContext| {
//!             let format = Format::from_value(&json!({"name": "s", "age": "siI+"}))?;
//!             Ok(Some(ctx.payload_verify(&format)?))
//!         }),
//!     )
//!     .unwrap();
//!
//! let request = Request::new(Method::POST, "/people")
//!     .with_json(&json!({"name": "Roger", "age": "33"}));
//! let response = dispatcher.route(&request).unwrap();
//! assert_eq!(response.body_str(), r#"{"name":"Roger","age":33}"#);
//!
//! let request = Request::new(Method::POST, "/people")
//!     .with_json(&json!({"name": "Roger", "age": "-1"}));
//! assert_eq!(dispatcher.route(&request).unwrap().status.as_u16(), 400);
//! ```

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod payload;
pub mod router;
pub mod server;

pub use config::RouterConfig;
pub use dispatcher::{Descriptor, Dispatcher, RequestContext};
pub use error::{HttpError, RouterError, RouterResult};
pub use payload::{Format, PayloadVerifier, SchemaRegistry, VerifyOptions};
pub use server::{Request, Response};
