use super::context::{normalize_base_path, relative_path};
use super::*;
use crate::error::{HttpError, RouterError};
use crate::payload::{Format, PayloadVerifier};
use crate::router::MethodFilter;
use crate::server::{HeaderVec, Request};
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn echo_uri(ctx: &mut RequestContext) -> HandlerResult {
    let line = format!("{} URI={}", ctx.method(), ctx.path());
    ctx.echo(line);
    Ok(None)
}

fn not_found(ctx: &mut RequestContext) -> HandlerResult {
    ctx.echo("missing");
    Ok(None)
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Descriptor::callable(not_found))
}

#[test]
fn test_normalize_base_path() {
    assert_eq!(normalize_base_path("/app/"), "/app");
    assert_eq!(normalize_base_path(r"\app\v1\"), "/app/v1");
    assert_eq!(normalize_base_path(""), "");
}

#[test]
fn test_relative_path() {
    assert_eq!(relative_path("/app", "/app/page"), "/page");
    assert_eq!(relative_path("/app", "/app"), "/");
    assert_eq!(relative_path("/app", "/other"), "/other");
    assert_eq!(relative_path("", "page"), "/page");
}

#[test]
fn test_context_defaults() {
    let ctx = RequestContext::new(Method::GET, "/");
    assert_eq!(ctx.status(), StatusCode::OK);
    assert_eq!(ctx.content_type(), CONTENT_HTML);
    assert!(ctx.matches().is_empty());
    assert!(!ctx.has_output());
}

#[test]
fn test_context_param_access() {
    let mut params = serde_json::Map::new();
    params.insert("a".into(), json!("33"));
    params.insert("gone".into(), Value::Null);
    let ctx = RequestContext::new(Method::GET, "/").with_params(params);

    assert_eq!(ctx.param("a"), Some(&json!("33")));
    assert_eq!(ctx.param("gone"), None);
    assert_eq!(ctx.param_or("b", json!(7)), json!(7));

    let promoted = ctx.param_verify("a", &Format::scalar("siI"), json!(0)).unwrap();
    assert_eq!(promoted, json!(33));
    let defaulted = ctx.param_verify("b", &Format::scalar("i"), json!(5)).unwrap();
    assert_eq!(defaulted, json!(5));
    // The context keeps the raw value.
    assert_eq!(ctx.param("a"), Some(&json!("33")));
}

#[test]
fn test_context_add_header_replaces() {
    let mut ctx = RequestContext::new(Method::GET, "/");
    ctx.add_header("X-Thing", "1");
    ctx.add_header("x-thing", "2");
    assert_eq!(ctx.headers().len(), 1);
    assert_eq!(ctx.header("X-THING"), Some("2"));
}

#[test]
fn test_uri_for_and_redirect() {
    let mut ctx = RequestContext::new(Method::GET, "/").with_base_path("/app");
    assert_eq!(ctx.uri_for("/page", &[]), "/app/page");
    assert_eq!(ctx.uri_for("page", &[("q", "a b")]), "/app/page?q=a+b");

    ctx.redirect("/login", &[("next", "/x")]);
    assert_eq!(ctx.status(), StatusCode::FOUND);
    assert_eq!(ctx.header("location"), Some("/app/login?next=%2Fx"));
}

#[test]
fn test_seed_nested_context() {
    let mut parent = RequestContext::new(Method::POST, "/sub/inner").with_base_path("/app");
    parent.set_matches(smallvec::smallvec![Some("/sub".to_string())]);
    parent.params_mut().insert("k".into(), json!(1));
    parent.add_header("X-Shared", "parent");

    let mut defaults = HeaderVec::new();
    defaults.push(("X-Shared".to_string(), "child".to_string()));
    defaults.push(("X-Child".to_string(), "only".to_string()));

    let child = parent.seed_nested(&defaults, Arc::new(PayloadVerifier::default()));
    assert_eq!(child.path(), "/inner");
    assert_eq!(child.method(), &Method::POST);
    assert_eq!(child.param("k"), Some(&json!(1)));
    assert_eq!(child.base_path(), "/app");
    assert_eq!(child.header("X-Shared"), Some("parent"));
    assert_eq!(child.header("X-Child"), Some("only"));
    assert!(child.matches().is_empty());
}

#[test]
fn test_seed_nested_exact_match_becomes_root() {
    let mut parent = RequestContext::new(Method::GET, "/sub");
    parent.set_matches(smallvec::smallvec![Some("/sub".to_string())]);
    let child = parent.seed_nested(&HeaderVec::new(), Arc::new(PayloadVerifier::default()));
    assert_eq!(child.path(), "/");
}

#[test]
fn test_route_literal() {
    let mut d = dispatcher();
    d.add_route(Method::GET, "/one", Descriptor::callable(echo_uri))
        .unwrap();
    let response = d.route_str("GET", "/one").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body_str(), "GET URI=/one");
}

#[test]
fn test_route_not_found_runs_handler_with_404() {
    let d = dispatcher();
    let response = d.route_str("GET", "/nothing").unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body_str(), "missing");
}

#[test]
fn test_route_method_not_recognized() {
    let d = dispatcher().with_error_handler(Arc::new(JsonErrorHandler));
    let response = d.route_str("BREW", "/").unwrap();
    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);

    let err = dispatcher().route_str("BREW", "/").unwrap_err();
    assert!(matches!(err, RouterError::MethodNotRecognized(_)));
}

#[test]
fn test_invalid_method_token() {
    let err = dispatcher().route_str("BAD METHOD", "/").unwrap_err();
    assert!(matches!(err, RouterError::MethodNotRecognized(m) if m == "BAD METHOD"));
}

#[test]
fn test_head_and_options_fallback() {
    let d = dispatcher();
    let response = d.route_str("HEAD", "/anything").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    let response = d.route_str("OPTIONS", "/anything").unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[test]
fn test_base_path_is_stripped() {
    let mut d = dispatcher().with_base_path("/app/");
    d.add_route(Method::GET, "/page", Descriptor::callable(echo_uri))
        .unwrap();
    let response = d.route_str("GET", "/app/page?x=1").unwrap();
    assert_eq!(response.body_str(), "GET URI=/page");
}

#[test]
fn test_nested_dispatcher_receives_relative_path() {
    let mut inner = dispatcher().with_name("inner");
    inner
        .add_route(Method::GET, "/other", Descriptor::callable(echo_uri))
        .unwrap();
    let mut outer = dispatcher();
    outer
        .add_route(MethodFilter::All, "#^/sub#", Descriptor::nested(inner))
        .unwrap();

    let response = outer.route_str("GET", "/sub/other").unwrap();
    assert_eq!(response.body_str(), "GET URI=/other");

    let response = outer.route_str("GET", "/sub/none").unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_nested_dispatcher_needs_pattern_match() {
    let mut outer = dispatcher().with_error_handler(Arc::new(JsonErrorHandler));
    outer
        .add_route(Method::GET, "/sub", Descriptor::nested(dispatcher()))
        .unwrap();
    let response = outer.route_str("GET", "/sub").unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_class_descriptor_constructs_per_request() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counting;
    impl Default for Counting {
        fn default() -> Self {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counting
        }
    }
    impl RequestHandler for Counting {
        fn run(&self, ctx: &mut RequestContext) -> HandlerResult {
            ctx.echo("counted");
            Ok(None)
        }
    }

    let mut d = dispatcher();
    d.add_route(Method::GET, "/c", Descriptor::class::<Counting>())
        .unwrap();
    d.route_str("GET", "/c").unwrap();
    let response = d.route_str("GET", "/c").unwrap();
    assert_eq!(response.body_str(), "counted");
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);
}

#[test]
fn test_named_descriptor_via_catalog() {
    struct Hello;
    impl RequestHandler for Hello {
        fn run(&self, ctx: &mut RequestContext) -> HandlerResult {
            ctx.echo("hello");
            Ok(None)
        }
    }
    struct Plain;

    let mut catalog = HandlerCatalog::new();
    let _ = catalog.register_handler("Hello", || Hello);
    let _ = catalog.register_type("Plain", || Plain);

    let mut d = dispatcher()
        .with_catalog(Arc::new(catalog))
        .with_error_handler(Arc::new(JsonErrorHandler));
    d.add_route(Method::GET, "/hello", "Hello").unwrap();
    d.add_route(Method::GET, "/plain", "Plain").unwrap();
    d.add_route(Method::GET, "/ghost", "Ghost").unwrap();

    assert_eq!(d.route_str("GET", "/hello").unwrap().body_str(), "hello");
    assert_eq!(
        d.route_str("GET", "/plain").unwrap().status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        d.route_str("GET", "/ghost").unwrap().status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_method_handling() {
    struct Pages {
        prefix: &'static str,
    }

    let mut catalog = HandlerCatalog::new();
    let _ = catalog
        .register_type("Pages", || Pages { prefix: "page" })
        .method("show", |pages: &Pages, ctx: &mut RequestContext| {
            let line = format!("{}:{}", pages.prefix, ctx.handler_method().unwrap_or_default());
            ctx.echo(line);
            Ok(None)
        })
        .static_method("ping", |ctx: &mut RequestContext| {
            ctx.echo("pong");
            Ok(None)
        });

    let mut d = dispatcher()
        .with_catalog(Arc::new(catalog))
        .with_method_handling();
    d.add_route(Method::GET, "/show", "Pages::show").unwrap();
    d.add_route(Method::GET, "/ping", "@Pages::ping").unwrap();
    d.add_route(Method::GET, "/bad", "Pages::nope").unwrap();

    assert_eq!(d.route_str("GET", "/show").unwrap().body_str(), "page:show");
    assert_eq!(d.route_str("GET", "/ping").unwrap().body_str(), "pong");
    let err = d.route_str("GET", "/bad").unwrap_err();
    assert!(matches!(err, RouterError::Configuration(_)));
}

#[test]
fn test_rest_handling() {
    let mut d = dispatcher().with_rest_handling();
    d.add_route(
        Method::GET,
        "/json",
        Descriptor::callable(|_ctx: &mut RequestContext| Ok(Some(json!({"a": "b"})))),
    )
    .unwrap();
    d.add_route(
        Method::GET,
        "/empty",
        Descriptor::callable(|_ctx: &mut RequestContext| Ok(None)),
    )
    .unwrap();
    d.add_route(
        Method::GET,
        "/scalar",
        Descriptor::callable(|_ctx: &mut RequestContext| Ok(Some(json!(3)))),
    )
    .unwrap();

    let response = d.route_str("GET", "/json").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, CONTENT_JSON);
    assert_eq!(response.body_str(), r#"{"a":"b"}"#);

    assert_eq!(
        d.route_str("GET", "/empty").unwrap().status,
        StatusCode::NO_CONTENT
    );
    let response = d.route_str("GET", "/scalar").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}

#[test]
fn test_rest_handling_keeps_written_output() {
    let mut ctx = RequestContext::new(Method::GET, "/");
    ctx.set_status(StatusCode::CREATED);
    ctx.echo("[");
    RestHandling.handle_result(&mut ctx, None).unwrap();
    assert_eq!(ctx.status(), StatusCode::CREATED);

    RestHandling::write_empty_object(&mut ctx, StatusCode::ACCEPTED);
    assert_eq!(ctx.status(), StatusCode::CREATED);
    assert_eq!(ctx.body_str(), "[{}");
}

#[test]
fn test_error_handler_routes_by_kind() {
    let mut d = dispatcher().with_error_handler(Arc::new(JsonErrorHandler));
    d.add_route(
        Method::GET,
        "/teapot",
        Descriptor::callable(|_ctx: &mut RequestContext| {
            Err(HttpError::new(StatusCode::IM_A_TEAPOT, "Teapot", "short and stout").into())
        }),
    )
    .unwrap();
    d.add_route(
        Method::GET,
        "/boom",
        Descriptor::callable(|ctx: &mut RequestContext| {
            ctx.echo("partial");
            Err(anyhow::anyhow!("Whoops!"))
        }),
    )
    .unwrap();

    let response = d.route_str("GET", "/teapot").unwrap();
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    let body: Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body, json!({"error": "Teapot", "reason": "short and stout"}));

    let response = d.route_str("GET", "/boom").unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.body_str().contains("partial"));
}

#[test]
fn test_fault_without_handler_is_returned() {
    let mut d = dispatcher();
    d.add_route(
        Method::GET,
        "/boom",
        Descriptor::callable(|_ctx: &mut RequestContext| Err(anyhow::anyhow!("Whoops!"))),
    )
    .unwrap();
    let err = d.route_str("GET", "/boom").unwrap_err();
    assert!(matches!(err, RouterError::Unclassified(_)));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_contract_violation_is_recognized() {
    let mut d = dispatcher().with_error_handler(Arc::new(JsonErrorHandler));
    d.add_route(
        Method::POST,
        "/people",
        Descriptor::callable(|ctx: &mut RequestContext| {
            let format = Format::from_value(&json!({"name": "s", "age": "i"}))?;
            let person = ctx.payload_verify(&format)?;
            Ok(Some(person))
        }),
    )
    .unwrap();

    let request = Request::new(Method::POST, "/people").with_json(&json!({"name": "Roger"}));
    let response = d.route(&request).unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_innermost_error_handler_wins() {
    struct Labelled(&'static str);
    impl ErrorHandler for Labelled {
        fn handle_router_error(&self, ctx: &mut RequestContext, error: &HttpError) {
            let line = format!("{} router {}", self.0, error.status().as_u16());
            ctx.echo(line);
        }
        fn handle_server_error(&self, ctx: &mut RequestContext, _error: &RouterError) {
            let line = format!("{} server", self.0);
            ctx.echo(line);
        }
    }

    let failing = |_ctx: &mut RequestContext| -> HandlerResult { Err(anyhow::anyhow!("nope")) };

    let mut inner = dispatcher().with_error_handler(Arc::new(Labelled("inner")));
    inner
        .add_route(Method::GET, "/fail", Descriptor::callable(failing))
        .unwrap();
    let mut bare = dispatcher();
    bare.add_route(Method::GET, "/fail", Descriptor::callable(failing))
        .unwrap();

    let mut outer = dispatcher().with_error_handler(Arc::new(Labelled("outer")));
    outer
        .add_route(Method::GET, "#^/in#", Descriptor::nested(inner))
        .unwrap();
    outer
        .add_route(Method::GET, "#^/bare#", Descriptor::nested(bare))
        .unwrap();

    assert_eq!(
        outer.route_str("GET", "/in/fail").unwrap().body_str(),
        "inner server"
    );
    assert_eq!(
        outer.route_str("GET", "/bare/fail").unwrap().body_str(),
        "outer server"
    );
}

#[test]
fn test_input_extraction_failure_is_bad_request() {
    let d = dispatcher().with_error_handler(Arc::new(JsonErrorHandler));
    let request = Request::new(Method::POST, "/x").with_body(CONTENT_JSON, "[1, 2]");
    let response = d.route(&request).unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_add_routes_from_table_keeps_first() {
    let mut d = dispatcher();
    d.add_route(Method::GET, "/a", Descriptor::callable(echo_uri))
        .unwrap();
    d.add_routes_from_table([(
        Method::GET,
        vec![
            ("/a", Descriptor::callable(not_found)),
            ("/b", Descriptor::callable(echo_uri)),
        ],
    )])
    .unwrap();
    assert_eq!(d.route_str("GET", "/a").unwrap().body_str(), "GET URI=/a");
    assert_eq!(d.route_str("GET", "/b").unwrap().body_str(), "GET URI=/b");
}

#[test]
fn test_default_headers_reach_response() {
    let mut d = dispatcher().with_header("X-Powered-By", "pactrouter");
    d.add_route(Method::GET, "/", Descriptor::nop()).unwrap();
    let response = d.route_str("GET", "/").unwrap();
    assert_eq!(response.header("x-powered-by"), Some("pactrouter"));
}
