#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use brrtmock::dispatcher::{HeaderVec, MockResponse};
use brrtmock::spec::SchemaId;
use brrtmock::validator::{ErrorLocation, ValidationContext};
use brrtmock::SchemaValidator;
use common::fixtures::petstore;
use serde_json::{json, Value};
use std::sync::Arc;

fn validator() -> SchemaValidator {
    SchemaValidator::new(petstore())
}

fn schema(validator: &SchemaValidator, name: &str) -> SchemaId {
    validator.definition().schemas().by_name(name).unwrap()
}

fn response(status: u16, headers: &[(&str, &str)], body: Value) -> MockResponse {
    let headers: HeaderVec = headers
        .iter()
        .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
        .collect();
    MockResponse::new(status, headers, body)
}

#[test]
fn test_pet_request_and_response_direction() {
    let v = validator();
    let pet = schema(&v, "Pet");
    let body = json!({ "name": "Rex", "tag": null, "status": "sold", "birthday": "2020-02-29" });

    // `id` is readOnly: optional on the way in, required on the way out
    assert!(v.validate(&body, pet, &ValidationContext::request_body()).is_empty());
    let errors = v.validate(&body, pet, &ValidationContext::response_body());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, ErrorLocation::ResponseBody);
    assert_eq!(errors[0].parameter_or_path, "/id");
    assert_eq!(errors[0].message, "missing required property 'id'");
}

#[test]
fn test_every_problem_is_reported() {
    let v = validator();
    let pet = schema(&v, "Pet");
    let body = json!({
        "id": "seven",
        "name": "",
        "status": "lost",
        "birthday": "not-a-date"
    });
    let errors = v.validate(&body, pet, &ValidationContext::response_body());
    let mut paths: Vec<&str> = errors.iter().map(|e| e.parameter_or_path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/birthday", "/id", "/name", "/status"]);

    let id = errors.iter().find(|e| e.parameter_or_path == "/id").unwrap();
    assert_eq!(id.message, "expected integer, got string");
    assert_eq!(id.schema_path, "/properties/id/type");
}

#[test]
fn test_additional_properties_denied() {
    let v = validator();
    let new_pet = schema(&v, "NewPet");
    let errors = v.validate(
        &json!({ "name": "Rex", "owner": "me" }),
        new_pet,
        &ValidationContext::request_body(),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].parameter_or_path, "/owner");
    assert_eq!(errors[0].message, "property 'owner' is not allowed");
}

#[test]
fn test_discriminated_animal() {
    let v = validator();
    let animal = schema(&v, "Animal");
    let ctx = ValidationContext::request_body();

    assert!(v
        .validate(&json!({ "petType": "Cat", "huntingSkill": "lazy" }), animal, &ctx)
        .is_empty());
    assert!(v
        .validate(&json!({ "petType": "Dog", "packSize": 3 }), animal, &ctx)
        .is_empty());

    let errors = v.validate(&json!({ "petType": "Dog", "huntingSkill": "lazy" }), animal, &ctx);
    assert!(errors.iter().any(|e| e.parameter_or_path == "/packSize"), "{errors:?}");

    let errors = v.validate(&json!({ "petType": "Fish" }), animal, &ctx);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "discriminator 'petType' value 'Fish' is not one of: Cat, Dog"
    );

    let errors = v.validate(&json!({ "packSize": 1 }), animal, &ctx);
    assert_eq!(errors[0].message, "missing discriminator property 'petType'");
}

#[test]
fn test_recursive_tree() {
    let v = validator();
    let tree = schema(&v, "TreeNode");
    let ctx = ValidationContext::request_body();
    let value = json!({
        "label": "root",
        "children": [
            { "label": "a", "children": [{ "label": "a1" }] },
            { "label": "b", "parent": { "label": "root" } }
        ]
    });
    assert!(v.is_valid(&value, tree, &ctx));

    let bad = json!({ "label": "root", "children": [{ "children": [{ "label": 5 }] }] });
    let errors = v.validate(&bad, tree, &ctx);
    let paths: Vec<&str> = errors.iter().map(|e| e.parameter_or_path.as_str()).collect();
    assert_eq!(paths, vec!["/children/0/label", "/children/0/children/0/label"]);
}

#[test]
fn test_errors_serialize_for_clients() {
    let v = validator();
    let new_pet = schema(&v, "NewPet");
    let errors = v.validate(&json!({ "age": -1 }), new_pet, &ValidationContext::request_body());
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    for err in json.as_array().unwrap() {
        assert_eq!(err["location"], "body");
        assert!(err["parameterOrPath"].is_string());
        assert!(err["schemaPath"].is_string());
    }
}

#[test]
fn test_validate_response_accepts_conforming_response() {
    let v = validator();
    let definition = Arc::clone(v.definition());
    let list = definition.operation("listPets").unwrap();
    let ok = response(
        200,
        &[("content-type", "application/json"), ("x-total-count", "2")],
        json!([{ "id": 1, "name": "Rex" }, { "id": 2, "name": "Tom", "tag": null }]),
    );
    assert_eq!(v.validate_response(list, &ok), vec![]);

    // undeclared 5xx falls back to `default`
    let err = response(503, &[], json!({ "code": 503, "message": "down" }));
    assert!(v.validate_response(list, &err).is_empty());
}

#[test]
fn test_validate_response_reports_problems() {
    let v = validator();
    let definition = Arc::clone(v.definition());
    let list = definition.operation("listPets").unwrap();

    let missing_header = response(200, &[], json!([]));
    let errors = v.validate_response(list, &missing_header);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, ErrorLocation::ResponseHeader);
    assert_eq!(errors[0].parameter_or_path, "X-Total-Count");

    let bad_header = response(200, &[("X-Total-Count", "-3")], json!([]));
    let errors = v.validate_response(list, &bad_header);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, ErrorLocation::ResponseHeader);

    let bad_body = response(200, &[("x-total-count", "1")], json!([{ "name": 1 }]));
    let errors = v.validate_response(list, &bad_body);
    let paths: Vec<&str> = errors.iter().map(|e| e.parameter_or_path.as_str()).collect();
    assert_eq!(paths, vec!["/0/id", "/0/name"]);

    let owner = definition.operation("listOwnerPets").unwrap();
    let undeclared = response(404, &[], Value::Null);
    let errors = v.validate_response(owner, &undeclared);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, ErrorLocation::ResponseStatus);
    assert_eq!(errors[0].parameter_or_path, "404");
}

#[test]
fn test_validate_response_media_type() {
    let v = validator();
    let definition = Arc::clone(v.definition());
    let get = definition.operation("getPet").unwrap();

    let xml = response(
        200,
        &[("content-type", "application/xml")],
        json!("<pet><id>1</id></pet>"),
    );
    assert!(v.validate_response(get, &xml).is_empty());

    let csv = response(200, &[("content-type", "text/csv")], json!("id,name"));
    let errors = v.validate_response(get, &csv);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].parameter_or_path, "content-type");

    let charset = response(
        200,
        &[("content-type", "application/json; charset=utf-8")],
        json!({ "id": 1, "name": "Rex" }),
    );
    assert!(v.validate_response(get, &charset).is_empty());
}
