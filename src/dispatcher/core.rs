//! Dispatcher core: one dispatch cycle per request.
//!
//! ```text
//! Matching → Resolving → Executing → PostProcessing → Done
//!     │          │            │              │
//!     └──────────┴────────────┴──────────────┴──→ Faulted
//! ```
//!
//! Resolving may delegate to a nested dispatcher, whose own cycle then runs
//! to completion on a seeded context and replaces the outer one. A fault
//! carries the context and error handler of the innermost dispatcher that was
//! active, so nested dispatchers present their own errors.

use super::context::{normalize_base_path, relative_path, RequestContext};
use super::handler::{Descriptor, HandlerCatalog, Instance};
use super::hooks::{
    DescriptorResolver, DiscardResult, ErrorHandler, Invocable, MethodHandling, Resolution,
    RestHandling, ResultHandler,
};
use crate::config::RouterConfig;
use crate::error::{classify, RouterError, RouterResult};
use crate::payload::PayloadVerifier;
use crate::router::{MethodFilter, RouteLookup, RouteTable};
use crate::server::{DefaultInputExtractor, HeaderVec, InputExtractor, Request, Response};
use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Phase of a dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Matching,
    Resolving,
    Executing,
    PostProcessing,
    Done,
    Faulted,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A fault raised during a cycle, with everything needed to present it.
struct Fault {
    error: RouterError,
    context: RequestContext,
    handler: Option<Arc<dyn ErrorHandler>>,
    phase: CyclePhase,
    dispatcher: String,
}

/// Request dispatcher: a route table plus the hooks that shape a cycle.
///
/// Dispatchers are configured up front and then shared; [`route`] takes
/// `&self`, and all per-request state lives in a [`RequestContext`].
///
/// [`route`]: Dispatcher::route
#[derive(Clone)]
pub struct Dispatcher {
    name: String,
    table: RouteTable<Descriptor>,
    not_found: Descriptor,
    base_path: String,
    default_headers: HeaderVec,
    verifier: Arc<PayloadVerifier>,
    input: Arc<dyn InputExtractor>,
    catalog: Arc<HandlerCatalog>,
    resolvers: Vec<Arc<dyn DescriptorResolver>>,
    results: Arc<dyn ResultHandler>,
    errors: Option<Arc<dyn ErrorHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("routes", &self.table.len())
            .field("not_found", &self.not_found)
            .field("base_path", &self.base_path)
            .field("resolvers", &self.resolvers.len())
            .field("error_handler", &self.errors.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher whose unmatched requests go to `not_found` with status 404.
    pub fn new(not_found: impl Into<Descriptor>) -> Self {
        Self {
            name: "dispatcher".to_string(),
            table: RouteTable::new(),
            not_found: not_found.into(),
            base_path: String::new(),
            default_headers: HeaderVec::new(),
            verifier: Arc::new(PayloadVerifier::default()),
            input: Arc::new(DefaultInputExtractor),
            catalog: Arc::new(HandlerCatalog::new()),
            resolvers: Vec::new(),
            results: Arc::new(DiscardResult),
            errors: None,
        }
    }

    /// Dispatcher configured from `config`: base path and verifier defaults.
    pub fn from_config(config: &RouterConfig, not_found: impl Into<Descriptor>) -> Self {
        let verifier = PayloadVerifier::default().with_defaults(config.verify_options());
        Self::new(not_found)
            .with_base_path(&config.base_path)
            .with_verifier(Arc::new(verifier))
    }

    /// Name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the not-found handler.
    #[must_use]
    pub fn with_not_found(mut self, not_found: impl Into<Descriptor>) -> Self {
        self.not_found = not_found.into();
        self
    }

    /// Base path stripped from incoming paths and prefixed by `uri_for`.
    /// Backslashes become slashes and trailing slashes are dropped.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    /// Response header set on every context this dispatcher creates.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<PayloadVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_input_extractor(mut self, input: Arc<dyn InputExtractor>) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<HandlerCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn DescriptorResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    #[must_use]
    pub fn with_result_handler(mut self, results: Arc<dyn ResultHandler>) -> Self {
        self.results = results;
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, errors: Arc<dyn ErrorHandler>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Install [`MethodHandling`].
    #[must_use]
    pub fn with_method_handling(self) -> Self {
        self.with_resolver(Arc::new(MethodHandling))
    }

    /// Install [`RestHandling`].
    #[must_use]
    pub fn with_rest_handling(self) -> Self {
        self.with_result_handler(Arc::new(RestHandling))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable<Descriptor> {
        &self.table
    }

    #[must_use]
    pub fn verifier(&self) -> &Arc<PayloadVerifier> {
        &self.verifier
    }

    /// Register a route for one method, a list of methods or
    /// [`MethodFilter::All`]. Re-registering a pattern replaces its handler.
    pub fn add_route(
        &mut self,
        methods: impl Into<MethodFilter>,
        pattern: &str,
        handler: impl Into<Descriptor>,
    ) -> RouterResult<()> {
        self.table.add(methods, pattern, handler.into())
    }

    /// Register a whole method → pattern → handler table. Patterns already
    /// registered for a method keep their first handler.
    pub fn add_routes_from_table<T, B, P, D>(&mut self, table: T) -> RouterResult<()>
    where
        T: IntoIterator<Item = (Method, B)>,
        B: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: Into<Descriptor>,
    {
        for (method, bucket) in table {
            for (pattern, handler) in bucket {
                self.table
                    .add_if_absent(&method, pattern.as_ref(), handler.into())?;
            }
        }
        Ok(())
    }

    /// Run one dispatch cycle for `request`.
    ///
    /// Faults are presented by the innermost active dispatcher that has an
    /// error handler. When none has, the fault is returned.
    pub fn route(&self, request: &Request) -> Result<Response, RouterError> {
        let path = relative_path(&self.base_path, request.path());
        info!(
            dispatcher = %self.name,
            method = %request.method(),
            path = %path,
            "Dispatching request"
        );
        let mut ctx = RequestContext::new(request.method().clone(), path)
            .with_base_path(self.base_path.as_str())
            .with_verifier(Arc::clone(&self.verifier))
            .with_request(Arc::new(request.headers().clone()), request.shared_body());
        for (name, value) in &self.default_headers {
            ctx.add_header(name.as_str(), value.as_str());
        }

        match self.input.extract(request) {
            Ok(params) => *ctx.params_mut() = params,
            Err(e) => {
                let fault = self.fault(e.into(), ctx, CyclePhase::Matching);
                return self.recover(*fault);
            }
        }

        match self.run_cycle(ctx) {
            Ok(ctx) => Ok(ctx.into_response()),
            Err(fault) => self.recover(*fault),
        }
    }

    /// Parse `method` and route `uri`. A method that is not even a valid
    /// token is rejected before any cycle starts.
    pub fn route_str(&self, method: &str, uri: &str) -> Result<Response, RouterError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| RouterError::MethodNotRecognized(method.to_string()))?;
        self.route(&Request::new(method, uri))
    }

    fn run_cycle(&self, mut ctx: RequestContext) -> Result<RequestContext, Box<Fault>> {
        let descriptor = match self.table.lookup(ctx.method(), ctx.path()) {
            RouteLookup::Matched(m) => {
                let descriptor = m.handler.clone();
                ctx.set_matches(m.captures);
                descriptor
            }
            RouteLookup::Fallback(captures) => {
                ctx.set_matches(captures);
                Descriptor::nop()
            }
            RouteLookup::NotFound => {
                ctx.set_status(StatusCode::NOT_FOUND);
                self.not_found.clone()
            }
            RouteLookup::MethodNotRecognized => {
                let error = RouterError::MethodNotRecognized(ctx.method().to_string());
                return Err(self.fault(error, ctx, CyclePhase::Matching));
            }
        };

        let resolution = match self.resolve(&descriptor, &mut ctx) {
            Ok(resolution) => resolution,
            Err(e) => return Err(self.fault(e, ctx, CyclePhase::Resolving)),
        };

        match resolution {
            Resolution::Delegate(nested) => {
                let child = ctx.seed_nested(&nested.default_headers, Arc::clone(&nested.verifier));
                debug!(
                    dispatcher = %self.name,
                    nested = %nested.name,
                    nested_path = %child.path(),
                    "Delegating to nested dispatcher"
                );
                nested.run_cycle(child).map_err(|mut fault| {
                    if fault.handler.is_none() {
                        fault.handler = self.errors.clone();
                    }
                    fault
                })
            }
            Resolution::Invoke(unit) => {
                let result = match unit.invoke(&mut ctx) {
                    Ok(result) => result,
                    Err(e) => return Err(self.fault(classify(e), ctx, CyclePhase::Executing)),
                };
                if let Err(e) = self.results.handle_result(&mut ctx, result) {
                    return Err(self.fault(classify(e), ctx, CyclePhase::PostProcessing));
                }
                debug!(
                    dispatcher = %self.name,
                    status = ctx.status().as_u16(),
                    phase = %CyclePhase::Done,
                    "Dispatch cycle complete"
                );
                Ok(ctx)
            }
        }
    }

    fn resolve(&self, descriptor: &Descriptor, ctx: &mut RequestContext) -> RouterResult<Resolution> {
        for resolver in &self.resolvers {
            if let Some(resolution) = resolver.resolve(descriptor, ctx, &self.catalog) {
                return resolution;
            }
        }
        match descriptor {
            Descriptor::Callable(f) => Ok(Resolution::Invoke(Invocable::Callable(Arc::clone(f)))),
            Descriptor::Instance(handler) => {
                Ok(Resolution::Invoke(Invocable::Shared(Arc::clone(handler))))
            }
            Descriptor::Dispatcher(nested) => Self::delegate(Arc::clone(nested), ctx),
            Descriptor::Class(class) => Self::resolve_instance((class.construct)(), &class.name, ctx),
            Descriptor::Named(name) => match self.catalog.instantiate(name) {
                Some(instance) => Self::resolve_instance(instance, name, ctx),
                None => Err(RouterError::Configuration(format!(
                    "unknown handler type '{name}'"
                ))),
            },
        }
    }

    fn resolve_instance(
        instance: Instance,
        name: &str,
        ctx: &RequestContext,
    ) -> RouterResult<Resolution> {
        match instance {
            Instance::Handler(handler) => Ok(Resolution::Invoke(Invocable::Owned(handler))),
            Instance::Dispatcher(nested) => Self::delegate(Arc::from(nested), ctx),
            Instance::Inert(type_name) => Err(RouterError::Configuration(format!(
                "request handler '{name}' ({type_name}) does not implement RequestHandler"
            ))),
        }
    }

    fn delegate(nested: Arc<Dispatcher>, ctx: &RequestContext) -> RouterResult<Resolution> {
        match ctx.capture(0) {
            Some(full) if !full.is_empty() => Ok(Resolution::Delegate(nested)),
            _ => Err(RouterError::Configuration(format!(
                "expected a regex match to delegate to nested dispatcher '{}'",
                nested.name
            ))),
        }
    }

    fn fault(&self, error: RouterError, context: RequestContext, phase: CyclePhase) -> Box<Fault> {
        Box::new(Fault {
            error,
            context,
            handler: self.errors.clone(),
            phase,
            dispatcher: self.name.clone(),
        })
    }

    fn recover(&self, fault: Fault) -> Result<Response, RouterError> {
        let Fault {
            error,
            mut context,
            handler,
            phase,
            dispatcher,
        } = fault;

        match &error {
            RouterError::Configuration(_) | RouterError::Format(_) | RouterError::Pattern { .. } => {
                error!(
                    dispatcher = %dispatcher,
                    path = %context.path(),
                    phase = %phase,
                    cycle = %CyclePhase::Faulted,
                    error = %error,
                    "Configuration fault"
                );
            }
            RouterError::Unclassified(_) => {
                error!(
                    dispatcher = %dispatcher,
                    path = %context.path(),
                    phase = %phase,
                    cycle = %CyclePhase::Faulted,
                    error = %error,
                    "Unclassified fault"
                );
            }
            _ => {
                warn!(
                    dispatcher = %dispatcher,
                    path = %context.path(),
                    phase = %phase,
                    cycle = %CyclePhase::Faulted,
                    status = error.status().as_u16(),
                    error = %error,
                    "Request fault"
                );
            }
        }

        let Some(handler) = handler else {
            debug!(dispatcher = %self.name, "No error handler installed, returning fault");
            return Err(error);
        };
        match error.as_http() {
            Some(http) => {
                context.set_status(http.status());
                handler.handle_router_error(&mut context, &http);
            }
            None => {
                context.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                handler.handle_server_error(&mut context, &error);
            }
        }
        Ok(context.into_response())
    }
}
