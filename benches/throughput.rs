use brrtmock::router::Router;
use brrtmock::spec::{load_definition_str, DocumentFormat};
use brrtmock::{load_definition, Dispatcher, MockConfig, MockRequest};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn example_spec() -> &'static str {
    r#"openapi: 3.1.0
info:
  title: Verb Zoo
  version: "1.0.0"
paths:
  "/":
    get:
      operationId: root_handler
      responses:
        "200": { description: OK }
  /zoo/animals:
    get:
      operationId: get_animals
      responses:
        "200": { description: OK }
    post:
      operationId: create_animal
      responses:
        "200": { description: OK }

  /zoo/animals/{id}:
    get:
      operationId: get_animal
      responses:
        "200": { description: OK }
    put:
      operationId: update_animal
      responses:
        "200": { description: OK }
    patch:
      operationId: patch_animal
      responses:
        "200": { description: OK }
    delete:
      operationId: delete_animal
      responses:
        "200": { description: OK }

  /zoo/animals/{id}/toys/{toy_id}:
    get:
      operationId: animal_toy
      responses:
        "200": { description: OK }

  /zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}:
    get:
      operationId: habitat_section
      responses:
        "200": { description: OK }

  /inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}:
    post:
      operationId: post_item_batch
      responses:
        "200": { description: OK }

  /complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}:
    get:
      operationId: complex_many_params
      responses:
        "200": { description: OK }

  /zoo/health:
    head:
      operationId: health_check
      responses:
        "200": { description: OK }
    options:
      operationId: supported_ops
      responses:
        "200": { description: OK }
    trace:
      operationId: trace_route
      responses:
        "200": { description: OK }
"#
}

fn bench_route_throughput(c: &mut Criterion) {
    let definition =
        load_definition_str(example_spec(), DocumentFormat::Yaml).expect("failed to load spec");
    let router = Router::new(&definition, "/");
    c.bench_function("route_match", |b| {
        let test_paths = [
            (Method::GET, "/zoo/animals/123"),
            (Method::GET, "/zoo/animals/123/toys/456"),
            (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
            (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
            (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
        ];
        b.iter(|| {
            for (method, path) in test_paths.iter() {
                let res = router.route(method, path);
                black_box(&res);
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/petstore.yaml");
    let definition = Arc::new(load_definition(path).expect("failed to load petstore"));
    let dispatcher = Dispatcher::new(definition, MockConfig::default());

    let list = MockRequest::new(Method::GET, "/pets?limit=10&tags=a,b")
        .with_header("x-trace-id", "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    c.bench_function("dispatch_get_mock", |b| {
        b.iter(|| black_box(dispatcher.handle(&list)))
    });

    let create = MockRequest::new(Method::POST, "/pets")
        .with_json(&json!({ "name": "Rex", "tag": "dog", "age": 3 }));
    c.bench_function("dispatch_post_validated", |b| {
        b.iter(|| black_box(dispatcher.handle(&create)))
    });

    let invalid = MockRequest::new(Method::POST, "/pets")
        .with_json(&json!({ "name": "", "age": -1, "extra": true }));
    c.bench_function("dispatch_post_rejected", |b| {
        b.iter(|| black_box(dispatcher.handle(&invalid)))
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch);
criterion_main!(benches);
