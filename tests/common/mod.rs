//! Sample application shared by the integration tests: a handler type with
//! named methods and a family of sub-dispatchers, each adding one optional
//! behaviour on top of the previous one.
#![allow(dead_code)]

use http::{Method, StatusCode};
use pactrouter::dispatcher::{
    Descriptor, Dispatcher, ErrorHandler, HandlerCatalog, HandlerResult, RequestContext,
    RequestHandler,
};
use pactrouter::error::{HttpError, RouterError};
use serde_json::json;
use std::sync::Arc;

/// Echoes the method and the (relative) path.
#[derive(Debug, Default)]
pub struct Handler;

impl RequestHandler for Handler {
    fn run(&self, ctx: &mut RequestContext) -> HandlerResult {
        let line = format!("{} URI={}", ctx.method(), ctx.path());
        ctx.echo(line);
        Ok(None)
    }
}

impl Handler {
    pub fn other(&self, ctx: &mut RequestContext) -> HandlerResult {
        let line = format!("OTHER {} URI={}", ctx.method(), ctx.path());
        ctx.echo(line);
        Ok(Some(json!(false)))
    }

    pub fn rest_endpoint(&self, _ctx: &mut RequestContext) -> HandlerResult {
        Ok(Some(json!({"a": "b"})))
    }
}

/// Writes `Router Error: <status>` / `Server Error: <message>`.
pub struct SampleErrors;

impl ErrorHandler for SampleErrors {
    fn handle_router_error(&self, ctx: &mut RequestContext, error: &HttpError) {
        let line = format!("Router Error: {}", error.status().as_u16());
        ctx.echo(line);
    }

    fn handle_server_error(&self, ctx: &mut RequestContext, error: &RouterError) {
        let line = format!("Server Error: {error}");
        ctx.echo(line);
    }
}

pub fn catalog() -> Arc<HandlerCatalog> {
    let mut catalog = HandlerCatalog::new();
    let _ = catalog
        .register_handler("Handler", || Handler)
        .method("other", Handler::other)
        .method("rest_endpoint", Handler::rest_endpoint);
    catalog.register_dispatcher("Subrouter", subrouter);
    Arc::new(catalog)
}

fn text_not_found(ctx: &mut RequestContext) -> HandlerResult {
    ctx.echo("Not Found");
    Ok(None)
}

fn raise_not_found(_ctx: &mut RequestContext) -> HandlerResult {
    Err(HttpError::from_status(StatusCode::NOT_FOUND).into())
}

fn whoops(_ctx: &mut RequestContext) -> HandlerResult {
    Err(anyhow::anyhow!("Whoops!"))
}

/// `/one` runs [`Handler`], `/error` fails with an unclassified error.
pub fn subrouter() -> Dispatcher {
    let mut router = Dispatcher::new(Descriptor::callable(text_not_found))
        .with_name("Subrouter")
        .with_catalog(catalog());
    router
        .add_routes_from_table([(
            Method::GET,
            vec![
                ("/one", Descriptor::from("Handler")),
                ("/error", Descriptor::callable(whoops)),
            ],
        )])
        .expect("sample routes are valid");
    router
}

/// [`subrouter`] with [`SampleErrors`]; not found raises a 404 error.
pub fn subrouter_exception_handling() -> Dispatcher {
    subrouter()
        .with_name("Subrouter_ExceptionHandling")
        .with_not_found(Descriptor::callable(raise_not_found))
        .with_error_handler(Arc::new(SampleErrors))
}

/// Adds `Type::method` descriptors and `/other`.
pub fn subrouter_method_handling() -> Dispatcher {
    let mut router = subrouter_exception_handling()
        .with_name("Subrouter_MethodHandling")
        .with_method_handling();
    router
        .add_routes_from_table([(Method::GET, [("/other", "Handler::other")])])
        .expect("sample routes are valid");
    router
}

/// Adds REST result handling and `/rest`.
pub fn subrouter_rest_handling() -> Dispatcher {
    let mut router = subrouter_method_handling()
        .with_name("Subrouter_RESTHandling")
        .with_rest_handling();
    router
        .add_routes_from_table([(Method::GET, [("/rest", "Handler::rest_endpoint")])])
        .expect("sample routes are valid");
    router
}

/// Route `method uri` and return the body, whatever the status.
pub fn route_and_capture(router: &Dispatcher, method: &str, uri: &str) -> String {
    router
        .route_str(method, uri)
        .expect("routing succeeds")
        .body_str()
        .into_owned()
}
