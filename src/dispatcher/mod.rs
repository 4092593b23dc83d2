//! # Dispatcher Module
//!
//! Runs one synchronous dispatch cycle per request: match the route, resolve
//! its handler descriptor, execute it, post-process the result, and route any
//! fault to the error handler of the dispatcher that was active.
//!
//! ## Handler descriptors
//!
//! A route's handler is a [`Descriptor`], resolved afresh on every match:
//!
//! - a callable (`Fn(&mut RequestContext) -> HandlerResult`),
//! - a class reference, constructed per request ([`Descriptor::class`]),
//! - a shared instance exposing [`RequestHandler::run`],
//! - a nested [`Dispatcher`], which takes over the part of the path after
//!   the outer pattern's full match,
//! - a name looked up in the [`HandlerCatalog`], or handled by a
//!   [`DescriptorResolver`] such as [`MethodHandling`] (`"Type::method"`).
//!
//! ## Optional behaviours
//!
//! - [`RestHandling`]: no result → 204, object/array result → JSON.
//! - [`MethodHandling`]: `"Type::method"` and `"@Type::method"` descriptors.
//! - [`ErrorHandler`]: recognized errors ([`HttpError`](crate::error::HttpError),
//!   contract violations, 404/501) go to `handle_router_error`, everything
//!   else to `handle_server_error`.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use pactrouter::dispatcher::{Descriptor, Dispatcher, HandlerResult, RequestContext};
//!
//! fn page(ctx: &mut RequestContext) -> HandlerResult {
//!     let id = ctx.capture(1).unwrap_or_default().to_string();
//!     ctx.echo(format!("<p>Page {id}</p>"));
//!     Ok(None)
//! }
//!
//! fn missing(ctx: &mut RequestContext) -> HandlerResult {
//!     ctx.echo("not found");
//!     Ok(None)
//! }
//!
//! let mut dispatcher = Dispatcher::new(Descriptor::callable(missing));
//! dispatcher
//!     .add_route(Method::GET, r"/^\/page\/([0-9]+)$/", Descriptor::callable(page))
//!     .unwrap();
//!
//! let response = dispatcher.route_str("GET", "/page/33").unwrap();
//! assert_eq!(response.body_str(), "<p>Page 33</p>");
//!
//! let response = dispatcher.route_str("GET", "/nowhere").unwrap();
//! assert_eq!(response.status.as_u16(), 404);
//! assert_eq!(response.body_str(), "not found");
//! ```

mod context;
mod core;
mod handler;
mod hooks;

pub use context::{
    RequestContext, CONTENT_FILE_DOWNLOAD, CONTENT_FORM_URLENCODED, CONTENT_HTML, CONTENT_JSON,
    CONTENT_TEXT,
};
pub use self::core::{CyclePhase, Dispatcher};
pub use handler::{
    nop, Callable, ClassBuilder, ClassRef, Constructor, Descriptor, HandlerCatalog, HandlerResult,
    Instance, RequestHandler,
};
pub use hooks::{
    DescriptorResolver, DiscardResult, ErrorHandler, Invocable, JsonErrorHandler, MethodHandling,
    Resolution, RestHandling, ResultHandler,
};

#[cfg(test)]
mod tests;
