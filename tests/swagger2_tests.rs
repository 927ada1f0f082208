#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use brrtmock::spec::{ParameterLocation, ParameterStyle, StatusPattern};
use brrtmock::{Dispatcher, MockConfig, MockRequest, Outcome};
use common::fixtures::petstore_v2;
use http::Method;
use serde_json::json;

#[test]
fn test_swagger2_is_normalized() {
    let definition = petstore_v2();
    assert_eq!(definition.source_version(), "2.0");
    assert_eq!(definition.document()["openapi"], json!("3.0.3"));
    assert_eq!(definition.base_path(), "/api/v1");
    assert_eq!(definition.servers()[0].url, "http://localhost:8080/api/v1");
    assert_eq!(definition.operations().len(), 4);
}

#[test]
fn test_swagger2_parameters() {
    let definition = petstore_v2();
    let list = definition.operation("listPets").unwrap();

    // shared parameter from the root `parameters` map
    let limit = list.parameter("limit", ParameterLocation::Query).unwrap();
    let schema = definition.schemas().get(limit.schema.unwrap());
    assert_eq!(schema.maximum, Some(100.0));

    let tags = list.parameter("tags", ParameterLocation::Query).unwrap();
    assert_eq!(tags.style, ParameterStyle::PipeDelimited);
    assert!(!tags.explode);
}

#[test]
fn test_swagger2_body_parameter_becomes_request_body() {
    let definition = petstore_v2();
    let create = definition.operation("createPet").unwrap();
    assert!(create.parameters.is_empty());
    let body = create.request_body.as_ref().unwrap();
    assert!(body.required);
    let media = &body.content["application/json"];
    assert_eq!(media.schema, definition.schemas().by_name("NewPet"));
}

#[test]
fn test_swagger2_form_data_becomes_form_body() {
    let definition = petstore_v2();
    let upload = definition.operation("uploadPhoto").unwrap();
    assert_eq!(upload.parameters.len(), 1);
    let body = upload.request_body.as_ref().unwrap();
    assert!(body.required);
    let schemas = definition.schemas();
    let form = schemas.get(body.content["application/x-www-form-urlencoded"].schema.unwrap());
    assert!(form.is_required("caption"));
    assert!(!form.is_required("rating"));
    assert_eq!(schemas.get(form.properties["rating"]).maximum, Some(5.0));
}

#[test]
fn test_swagger2_responses() {
    let definition = petstore_v2();
    let list = definition.operation("listPets").unwrap();
    let ok = list.response(StatusPattern::Exact(200)).unwrap();
    assert!(ok.content.contains_key("application/json"));
    assert!(ok.headers.contains_key("X-Total-Count"));

    // `$ref` into the root `responses` map
    let default = list.response(StatusPattern::Default).unwrap();
    assert_eq!(
        default.content["application/json"].schema,
        definition.schemas().by_name("Error")
    );

    let create = definition.operation("createPet").unwrap();
    let created = create.response(StatusPattern::Exact(201)).unwrap();
    assert_eq!(
        created.content["application/json"].example,
        Some(json!({ "id": 1, "name": "Rex" }))
    );

    let pet = definition.schemas().get(definition.schemas().by_name("Pet").unwrap());
    assert!(definition.schemas().get(pet.properties["tag"]).allows_null());
}

#[test]
fn test_swagger2_dispatch() {
    let dispatcher = Dispatcher::new(
        petstore_v2(),
        MockConfig::default().with_api_root("/api/v1"),
    );

    let outcome = dispatcher.handle(
        &MockRequest::new(Method::POST, "/api/v1/pets").with_json(&json!({ "name": "Rex" })),
    );
    let Outcome::Handled(response) = outcome else {
        panic!("expected a mock, got {outcome:?}");
    };
    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({ "id": 1, "name": "Rex" }));

    let outcome = dispatcher.handle(&MockRequest::new(Method::GET, "/api/v1/pets?tags=a|b&limit=0"));
    let Outcome::ValidationFailed(errors) = outcome else {
        panic!("expected validation errors, got {outcome:?}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].parameter_or_path, "limit");

    let outcome = dispatcher.handle(
        &MockRequest::new(Method::POST, "/api/v1/pets/3/photo")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("rating=9"),
    );
    let Outcome::ValidationFailed(errors) = outcome else {
        panic!("expected validation errors, got {outcome:?}");
    };
    let paths: Vec<&str> = errors.iter().map(|e| e.parameter_or_path.as_str()).collect();
    assert!(paths.contains(&"/caption"), "{paths:?}");
    assert!(paths.contains(&"/rating"), "{paths:?}");
}
