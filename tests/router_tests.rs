#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use brrtmock::router::{MatchOutcome, RouteMatch, Router};
use brrtmock::spec::{load_definition_str, DocumentFormat};
use common::fixtures::petstore;
use http::Method;

fn verb_zoo() -> &'static str {
    r#"
openapi: 3.1.0
info:
  title: Verb Zoo
  version: "1.0.0"
paths:
  "/":
    get:
      operationId: root
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

fn zoo_router() -> Router {
    let definition = load_definition_str(verb_zoo(), DocumentFormat::Yaml).unwrap();
    Router::new(&definition, "/")
}

fn expect_match(router: &Router, method: Method, path: &str) -> RouteMatch {
    match router.route(&method, path) {
        MatchOutcome::Matched(route) => route,
        other => panic!("expected {method} {path} to match, got {other:?}"),
    }
}

fn assert_route_match(router: &Router, method: Method, path: &str, expected_operation: &str) {
    let route = expect_match(router, method.clone(), path);
    assert_eq!(
        route.operation.id, expected_operation,
        "operation mismatch for {method} {path}"
    );
}

#[test]
fn test_router_every_verb() {
    let router = zoo_router();
    assert_route_match(&router, Method::GET, "/", "root");
    assert_route_match(&router, Method::GET, "/zoo/animals", "get_animals");
    assert_route_match(&router, Method::POST, "/zoo/animals", "create_animal");
    assert_route_match(&router, Method::GET, "/zoo/animals/123", "get_animal");
    assert_route_match(&router, Method::PUT, "/zoo/animals/123", "update_animal");
    assert_route_match(&router, Method::PATCH, "/zoo/animals/123", "patch_animal");
    assert_route_match(&router, Method::DELETE, "/zoo/animals/123", "delete_animal");
    assert_route_match(&router, Method::HEAD, "/zoo/health", "health_check");
    assert_route_match(&router, Method::OPTIONS, "/zoo/health", "supported_ops");
    assert_route_match(&router, Method::TRACE, "/zoo/health", "trace_route");
}

#[test]
fn test_router_unknown_path() {
    let router = zoo_router();
    assert!(matches!(router.route(&Method::GET, "/unknown"), MatchOutcome::NotFound));
    assert!(matches!(router.route(&Method::GET, "/zoo/animals/1/extra"), MatchOutcome::NotFound));
}

#[test]
fn test_router_trailing_slash_and_query_ignored() {
    let router = zoo_router();
    assert_route_match(&router, Method::GET, "/zoo/animals/", "get_animals");
    let route = expect_match(&router, Method::GET, "/zoo/animals/7?verbose=true");
    assert_eq!(route.get_path_param("id"), Some("7"));
}

#[test]
fn test_literal_segment_beats_capture() {
    let definition = petstore();
    let router = Router::new(&definition, "/");

    let route = expect_match(&router, Method::GET, "/pets/mine");
    assert_eq!(route.operation.id, "myPets");
    assert!(route.path_params.is_empty());

    let route = expect_match(&router, Method::GET, "/pets/42");
    assert_eq!(route.operation.id, "getPet");
    assert_eq!(&*route.template, "/pets/{petId}");
    assert_eq!(route.get_path_param("petId"), Some("42"));
}

#[test]
fn test_method_not_allowed_lists_declared_methods() {
    let definition = petstore();
    let router = Router::new(&definition, "/");

    match router.route(&Method::PUT, "/pets/42") {
        MatchOutcome::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::GET, Method::DELETE]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
    match router.route(&Method::PATCH, "/pets") {
        MatchOutcome::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::GET, Method::POST]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_path_params_are_percent_decoded() {
    let definition = petstore();
    let router = Router::new(&definition, "/");
    let route = expect_match(&router, Method::GET, "/owners/jane%20doe/pets");
    assert_eq!(route.operation.id, "listOwnerPets");
    assert_eq!(route.get_path_param("ownerId"), Some("jane doe"));
    assert_eq!(
        route.path_params_map().get("ownerId").map(String::as_str),
        Some("jane doe")
    );
}

#[test]
fn test_api_root_is_stripped() {
    let definition = petstore();
    let router = Router::new(&definition, "/api/v1/");
    assert_eq!(router.api_root(), "/api/v1");

    let route = expect_match(&router, Method::GET, "/api/v1/pets/5");
    assert_eq!(route.operation.id, "getPet");
    assert_route_match(&router, Method::GET, "/api/v1/pets", "listPets");

    assert!(matches!(router.route(&Method::GET, "/pets/5"), MatchOutcome::NotFound));
    assert!(matches!(router.route(&Method::GET, "/api/v2/pets"), MatchOutcome::NotFound));
}

#[test]
fn test_route_table_in_document_order() {
    let definition = petstore();
    let router = Router::new(&definition, "/");
    let ids: Vec<&str> = router
        .route_table()
        .iter()
        .map(|entry| entry.operation_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "listPets",
            "createPet",
            "myPets",
            "getPet",
            "deletePet",
            "listOwnerPets",
            "search",
            "createAnimal",
            "getTree",
        ]
    );
    assert_eq!(router.route_table().len(), definition.operations().len());
}

#[test]
fn test_router_shared_across_threads() {
    let definition = petstore();
    let router = std::sync::Arc::new(Router::new(&definition, "/"));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let router = std::sync::Arc::clone(&router);
            std::thread::spawn(move || {
                let path = format!("/pets/{i}");
                match router.route(&Method::GET, &path) {
                    MatchOutcome::Matched(route) => route.get_path_param("petId").map(String::from),
                    _ => None,
                }
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(i.to_string()));
    }
}
