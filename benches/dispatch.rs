use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use pactrouter::dispatcher::{Descriptor, Dispatcher, HandlerResult, RequestContext};
use pactrouter::payload::{Format, PayloadVerifier};
use pactrouter::router::MethodFilter;
use serde_json::json;
use std::hint::black_box;

fn page(ctx: &mut RequestContext) -> HandlerResult {
    let id = ctx.capture(1).unwrap_or_default().to_string();
    ctx.echo(id);
    Ok(None)
}

fn zoo() -> Dispatcher {
    let mut animals = Dispatcher::new(Descriptor::nop()).with_name("animals");
    animals
        .add_route(Method::GET, r"#^/([0-9]+)$#", Descriptor::callable(page))
        .expect("valid route");
    animals
        .add_route(Method::GET, r"#^/([0-9]+)/toys/([0-9]+)$#", Descriptor::callable(page))
        .expect("valid route");

    let mut root = Dispatcher::new(Descriptor::nop()).with_rest_handling();
    root.add_route(Method::GET, "/", Descriptor::nop())
        .expect("valid route");
    root.add_route(Method::GET, "/zoo/health", Descriptor::nop())
        .expect("valid route");
    root.add_route(
        [Method::GET, Method::POST],
        r"#^/inventory/([0-9]+)/feeds/([0-9]+)$#",
        Descriptor::callable(page),
    )
    .expect("valid route");
    root.add_route(MethodFilter::All, "#^/zoo/animals#", Descriptor::nested(animals))
        .expect("valid route");
    root
}

fn bench_dispatch(c: &mut Criterion) {
    let router = zoo();
    c.bench_function("dispatch", |b| {
        let requests = [
            ("GET", "/zoo/health"),
            ("GET", "/zoo/animals/123"),
            ("GET", "/zoo/animals/123/toys/456"),
            ("POST", "/inventory/1/feeds/2"),
            ("GET", "/does/not/exist"),
        ];
        b.iter(|| {
            for (method, uri) in &requests {
                let res = router.route_str(method, uri);
                black_box(&res);
            }
        })
    });
}

fn bench_verify(c: &mut Criterion) {
    let verifier = PayloadVerifier::default();
    let format = Format::from_value(&json!({
        "name": "s^!",
        "age?": "siI*",
        "tags": ["s"],
        "address": {"street": "s", "zip": "siS"}
    }))
    .expect("valid format");
    let payload = json!({
        "name": "  Roger ",
        "age": "33",
        "tags": ["a", "b", "c"],
        "address": {"street": "Main", "zip": 12345}
    });
    c.bench_function("verify_keyed", |b| {
        b.iter(|| {
            let mut value = payload.clone();
            let res = verifier.verify(&mut value, &format);
            black_box((&res, &value));
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_verify);
criterion_main!(benches);
