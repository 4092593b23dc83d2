mod common;

use http::{Method, StatusCode};
use pactrouter::dispatcher::{Descriptor, Dispatcher, RequestContext, CONTENT_TEXT};
use pactrouter::server::{
    parse_form, DefaultInputExtractor, Http1Writer, InputExtractor, Request, Response,
};
use serde_json::json;

fn hello_router() -> Dispatcher {
    let mut router = Dispatcher::new(Descriptor::nop()).with_header("X-Served-By", "pactrouter");
    router
        .add_route(
            Method::GET,
            "/hello",
            Descriptor::callable(|ctx: &mut RequestContext| {
                ctx.set_content_type(CONTENT_TEXT);
                ctx.echo("hi");
                Ok(None)
            }),
        )
        .unwrap();
    router
}

#[test]
fn test_http_request_conversion() {
    let http_request = http::Request::builder()
        .method(Method::POST)
        .uri("/things?x=1")
        .header("content-type", "application/json; charset=utf-8")
        .body(br#"{"a": 1}"#.to_vec())
        .unwrap();
    let request = Request::from(http_request);

    assert_eq!(request.method(), Method::POST);
    assert_eq!(request.path(), "/things");
    assert_eq!(request.query(), Some("x=1"));
    assert_eq!(request.content_type(), Some("application/json"));

    let params = DefaultInputExtractor.extract(&request).unwrap();
    assert_eq!(params.get("a"), Some(&json!(1)));
}

#[test]
fn test_absolute_uri() {
    let request = Request::new(Method::GET, "http://example.com/a/b?q=1");
    assert_eq!(request.path(), "/a/b");
    assert_eq!(request.query(), Some("q=1"));
}

#[test]
fn test_extraction_rules() {
    let get = Request::new(Method::GET, "/?a=1&b[]=x&b[]=y&c[k]=v");
    let params = DefaultInputExtractor.extract(&get).unwrap();
    assert_eq!(
        serde_json::Value::Object(params),
        json!({"a": "1", "b": ["x", "y"], "c": {"k": "v"}})
    );

    // Query strings are only read for GET.
    let delete = Request::new(Method::DELETE, "/?a=1");
    assert!(DefaultInputExtractor.extract(&delete).unwrap().is_empty());

    let bad = Request::new(Method::POST, "/").with_body("application/json", "{nope");
    let err = DefaultInputExtractor.extract(&bad).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let empty = Request::new(Method::POST, "/").with_body("application/json", "");
    assert!(DefaultInputExtractor.extract(&empty).unwrap().is_empty());
}

#[test]
fn test_parse_form_nesting() {
    let params = parse_form(b"user[name]=Roger&user[tags][]=a&user[tags][]=b&plain=%20x");
    assert_eq!(
        serde_json::Value::Object(params),
        json!({"user": {"name": "Roger", "tags": ["a", "b"]}, "plain": " x"})
    );
}

#[test]
fn test_response_into_http() {
    let response = hello_router().route_str("GET", "/hello").unwrap();
    let http_response = response.into_http().unwrap();
    assert_eq!(http_response.status(), StatusCode::OK);
    assert_eq!(
        http_response.headers().get("content-type").unwrap(),
        "text/plain"
    );
    assert_eq!(
        http_response.headers().get("x-served-by").unwrap(),
        "pactrouter"
    );
    assert_eq!(http_response.body(), b"hi");
}

#[test]
fn test_http1_writer() {
    let response = hello_router().route_str("GET", "/hello").unwrap();
    let mut writer = Http1Writer::new(Vec::new());
    response.flush_to(&mut writer).unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("content-type: text/plain\r\n"));
    assert!(text.contains("X-Served-By: pactrouter\r\n"));
    assert!(text.ends_with("content-length: 2\r\n\r\nhi"));
}

#[test]
fn test_head_fallback_response() {
    let response: Response = hello_router().route_str("HEAD", "/anything").unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}
