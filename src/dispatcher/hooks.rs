//! Optional dispatcher behaviours, plugged in per dispatcher:
//!
//! - [`DescriptorResolver`]: extends the descriptor grammar ahead of the base
//!   resolution rules ([`MethodHandling`]).
//! - [`ResultHandler`]: turns a handler's return value into a response
//!   ([`DiscardResult`], [`RestHandling`]).
//! - [`ErrorHandler`]: presents faults raised during a cycle
//!   ([`JsonErrorHandler`]).

use super::context::{RequestContext, CONTENT_JSON};
use super::core::Dispatcher;
use super::handler::{Callable, Descriptor, HandlerCatalog, HandlerResult, RequestHandler};
use crate::error::{HttpError, RouterError, RouterResult};
use http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// A resolved handler, ready to run.
pub enum Invocable {
    Callable(Callable),
    Shared(Arc<dyn RequestHandler>),
    Owned(Box<dyn RequestHandler>),
}

impl Invocable {
    pub fn invoke(&self, ctx: &mut RequestContext) -> HandlerResult {
        match self {
            Invocable::Callable(f) => f(ctx),
            Invocable::Shared(handler) => handler.run(ctx),
            Invocable::Owned(handler) => handler.run(ctx),
        }
    }
}

/// What resolving a descriptor produced.
pub enum Resolution {
    /// Run this unit with the current context.
    Invoke(Invocable),
    /// Hand the request to a nested dispatcher.
    Delegate(Arc<Dispatcher>),
}

/// Intercepts descriptors before the base resolution rules apply.
///
/// Returning `None` passes the descriptor on to the next resolver and
/// finally to the base rules.
pub trait DescriptorResolver: Send + Sync {
    fn resolve(
        &self,
        descriptor: &Descriptor,
        ctx: &mut RequestContext,
        catalog: &HandlerCatalog,
    ) -> Option<RouterResult<Resolution>>;
}

/// `"Type::method"` descriptors call `method` on a fresh `Type` from the
/// catalog; `"@Type::method"` calls a static method without constructing.
/// The selected method name is recorded on the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodHandling;

impl DescriptorResolver for MethodHandling {
    fn resolve(
        &self,
        descriptor: &Descriptor,
        ctx: &mut RequestContext,
        catalog: &HandlerCatalog,
    ) -> Option<RouterResult<Resolution>> {
        let Descriptor::Named(name) = descriptor else {
            return None;
        };
        let (type_name, method) = name.split_once("::")?;
        ctx.set_handler_method(method);
        let callable = match type_name.strip_prefix('@') {
            Some(type_name) => catalog.static_method(type_name, method),
            None => catalog.method(type_name, method),
        };
        debug!(descriptor = %name, found = callable.is_some(), "Resolving handler method");
        Some(
            callable
                .map(|f| Resolution::Invoke(Invocable::Callable(f)))
                .ok_or_else(|| {
                    RouterError::Configuration(format!("unknown handler method '{name}'"))
                }),
        )
    }
}

/// Post-processing of a handler's return value.
pub trait ResultHandler: Send + Sync {
    fn handle_result(&self, ctx: &mut RequestContext, result: Option<Value>) -> anyhow::Result<()>;
}

/// Ignores handler results.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardResult;

impl ResultHandler for DiscardResult {
    fn handle_result(&self, _ctx: &mut RequestContext, _result: Option<Value>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// REST conventions: no result means 204 No Content, a returned object or
/// array becomes a JSON body. Other results are ignored. Neither applies once
/// the handler has written output of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestHandling;

impl RestHandling {
    /// Write `payload` as JSON. Status and content type are only set if no
    /// output has been written yet.
    pub fn write_json(
        ctx: &mut RequestContext,
        payload: &Value,
        status: StatusCode,
    ) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(payload)?;
        if !ctx.has_output() {
            ctx.set_status(status);
            ctx.set_content_type(CONTENT_JSON);
        }
        ctx.write_bytes(&bytes);
        Ok(())
    }

    /// Write `{}`.
    pub fn write_empty_object(ctx: &mut RequestContext, status: StatusCode) {
        if !ctx.has_output() {
            ctx.set_status(status);
            ctx.set_content_type(CONTENT_JSON);
        }
        ctx.echo("{}");
    }

    /// Respond 204, unless output has already been written.
    pub fn no_content(ctx: &mut RequestContext) {
        if !ctx.has_output() {
            ctx.set_status(StatusCode::NO_CONTENT);
        }
    }
}

impl ResultHandler for RestHandling {
    fn handle_result(&self, ctx: &mut RequestContext, result: Option<Value>) -> anyhow::Result<()> {
        match result {
            None => {
                Self::no_content(ctx);
                Ok(())
            }
            Some(payload @ (Value::Object(_) | Value::Array(_))) => {
                Self::write_json(ctx, &payload, StatusCode::OK)
            }
            Some(_) => Ok(()),
        }
    }
}

/// Presents faults raised during a dispatch cycle.
///
/// Before either method runs the context status is preset: the error's own
/// status for recognized errors, 500 otherwise.
pub trait ErrorHandler: Send + Sync {
    /// Recognized contract/business errors.
    fn handle_router_error(&self, ctx: &mut RequestContext, error: &HttpError);
    /// Everything else.
    fn handle_server_error(&self, ctx: &mut RequestContext, error: &RouterError);
}

/// Writes `{"error": ..., "reason": ...}` JSON bodies, replacing any partial
/// output. Server errors are logged and never leak their cause.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle_router_error(&self, ctx: &mut RequestContext, error: &HttpError) {
        ctx.clear_body();
        ctx.set_content_type(CONTENT_JSON);
        let body = json!({"error": error.error(), "reason": error.reason()});
        ctx.echo(body.to_string());
    }

    fn handle_server_error(&self, ctx: &mut RequestContext, error: &RouterError) {
        error!(error = %error, path = %ctx.path(), "Unhandled server error");
        ctx.clear_body();
        ctx.set_content_type(CONTENT_JSON);
        ctx.echo(json!({"error": "Internal Server Error"}).to_string());
    }
}
