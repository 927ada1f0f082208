use super::{MatchOutcome, Router};
use crate::spec::Definition;
use http::Method;
use serde_json::json;

fn definition() -> Definition {
    Definition::load(json!({
        "openapi": "3.0.3",
        "info": { "title": "Zoo", "version": "1" },
        "paths": {
            "/": { "get": { "operationId": "root", "responses": {} } },
            "/pets": {
                "get": { "operationId": "listPets", "responses": {} },
                "post": { "operationId": "createPet", "responses": {} }
            },
            "/pets/{petId}": {
                "get": { "operationId": "getPet", "responses": {} },
                "delete": { "operationId": "deletePet", "responses": {} }
            },
            "/pets/mine": { "get": { "operationId": "myPets", "responses": {} } },
            "/pets/{petId}/photos/{photoId}": {
                "get": { "operationId": "getPhoto", "responses": {} }
            },
            "/reports/{name}.json": { "get": { "operationId": "jsonReport", "responses": {} } },
            "/reports/{name}": { "put": { "operationId": "putReport", "responses": {} } }
        }
    }))
    .unwrap()
}

fn matched(outcome: MatchOutcome) -> super::RouteMatch {
    match outcome {
        MatchOutcome::Matched(m) => m,
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_root_path() {
    let router = Router::new(&definition(), "/");
    assert_eq!(matched(router.route(&Method::GET, "/")).operation.id, "root");
    assert_eq!(matched(router.route(&Method::GET, "")).operation.id, "root");
}

#[test]
fn test_parameterized_path() {
    let router = Router::new(&definition(), "/");
    let m = matched(router.route(&Method::GET, "/pets/42"));
    assert_eq!(m.operation.id, "getPet");
    assert_eq!(&*m.template, "/pets/{petId}");
    assert_eq!(m.get_path_param("petId"), Some("42"));
}

#[test]
fn test_literal_beats_parameter_regardless_of_order() {
    let router = Router::new(&definition(), "/");
    assert_eq!(matched(router.route(&Method::GET, "/pets/mine")).operation.id, "myPets");
    // `/pets/mine` only declares GET, the capture template still serves DELETE
    assert_eq!(
        matched(router.route(&Method::DELETE, "/pets/mine")).operation.id,
        "deletePet"
    );
}

#[test]
fn test_nested_parameters_and_trailing_slash() {
    let router = Router::new(&definition(), "/");
    let m = matched(router.route(&Method::GET, "/pets/1/photos/2/"));
    assert_eq!(m.operation.id, "getPhoto");
    assert_eq!(m.get_path_param("petId"), Some("1"));
    assert_eq!(m.get_path_param("photoId"), Some("2"));
    assert_eq!(
        matched(router.route(&Method::GET, "//pets//1//photos/2")).operation.id,
        "getPhoto"
    );
}

#[test]
fn test_percent_decoded_segments() {
    let router = Router::new(&definition(), "/");
    let m = matched(router.route(&Method::GET, "/pets/hello%20world"));
    assert_eq!(m.get_path_param("petId"), Some("hello world"));
}

#[test]
fn test_pattern_segment() {
    let router = Router::new(&definition(), "/");
    let m = matched(router.route(&Method::GET, "/reports/q3.json"));
    assert_eq!(m.operation.id, "jsonReport");
    assert_eq!(m.get_path_param("name"), Some("q3"));
}

#[test]
fn test_method_not_allowed_unions_matching_templates() {
    let router = Router::new(&definition(), "/");
    match router.route(&Method::PATCH, "/reports/q3.json") {
        MatchOutcome::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::GET, Method::PUT]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_not_found() {
    let router = Router::new(&definition(), "/");
    assert!(matches!(router.route(&Method::GET, "/owners"), MatchOutcome::NotFound));
    assert!(matches!(
        router.route(&Method::GET, "/pets/1/photos"),
        MatchOutcome::NotFound
    ));
}

#[test]
fn test_api_root_is_stripped() {
    let router = Router::new(&definition(), "/api/v1/");
    assert_eq!(router.api_root(), "/api/v1");
    assert_eq!(
        matched(router.route(&Method::GET, "/api/v1/pets")).operation.id,
        "listPets"
    );
    assert_eq!(matched(router.route(&Method::GET, "/api/v1")).operation.id, "root");
    assert!(matches!(router.route(&Method::GET, "/pets"), MatchOutcome::NotFound));
    assert!(matches!(
        router.route(&Method::GET, "/api/v10/pets"),
        MatchOutcome::NotFound
    ));
}

#[test]
fn test_query_string_is_ignored() {
    let router = Router::new(&definition(), "/");
    assert_eq!(
        matched(router.route(&Method::GET, "/pets?limit=3")).operation.id,
        "listPets"
    );
}

#[test]
fn test_route_table_in_document_order() {
    let router = Router::new(&definition(), "/");
    let ids: Vec<&str> = router
        .route_table()
        .iter()
        .map(|r| r.operation_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "root", "listPets", "createPet", "getPet", "deletePet", "myPets", "getPhoto",
            "jsonReport", "putReport"
        ]
    );
}
