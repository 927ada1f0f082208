//! Swagger 2.0 → OpenAPI 3 normalization.
//!
//! Works on the raw `serde_json::Value` tree before anything is compiled, so
//! the builder only ever sees one document shape. Body and form parameters
//! become `requestBody`, `definitions`/`parameters`/`responses` move under
//! `components`, and every local `$ref` is rewritten to its new home.

use super::error::DefinitionError;
use serde_json::{json, Map, Value};
use tracing::debug;

pub(crate) const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Schema keywords a v2 non-body parameter or header carries inline.
const SCHEMA_KEYWORDS: [&str; 17] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "x-nullable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentVersion {
    Swagger2,
    OpenApi3,
}

/// Identify the document dialect and return its declared version string.
pub(crate) fn detect_version(doc: &Value) -> Result<(DocumentVersion, String), DefinitionError> {
    let root = doc
        .as_object()
        .ok_or_else(|| DefinitionError::malformed("/", "document root must be an object"))?;

    if let Some(v) = root.get("swagger") {
        let version = version_string(v);
        if version.starts_with('2') {
            return Ok((DocumentVersion::Swagger2, version));
        }
        return Err(DefinitionError::malformed(
            "/swagger",
            format!("unsupported swagger version '{version}'"),
        ));
    }
    if let Some(v) = root.get("openapi") {
        let version = version_string(v);
        if version.starts_with("3.") {
            return Ok((DocumentVersion::OpenApi3, version));
        }
        return Err(DefinitionError::malformed(
            "/openapi",
            format!("unsupported openapi version '{version}'"),
        ));
    }
    Err(DefinitionError::malformed(
        "/",
        "document declares neither `swagger: \"2.0\"` nor `openapi: 3.x`",
    ))
}

fn version_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        // YAML `swagger: 2.0` arrives as a float
        Value::Number(n) => n
            .as_f64()
            .map(|f| format!("{f:.1}"))
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Convert a Swagger 2.0 document into an equivalent OpenAPI 3.0 document.
pub(crate) fn swagger2_to_openapi3(doc: &Value) -> Result<Value, DefinitionError> {
    let root = doc
        .as_object()
        .ok_or_else(|| DefinitionError::malformed("/", "document root must be an object"))?;

    let global_consumes = media_list(root.get("consumes"));
    let global_produces = media_list(root.get("produces"));

    let mut out = Map::new();
    out.insert("openapi".into(), json!("3.0.3"));
    out.insert(
        "info".into(),
        root.get("info")
            .cloned()
            .unwrap_or_else(|| json!({ "title": "", "version": "" })),
    );

    let servers = convert_servers(root);
    if !servers.is_empty() {
        out.insert("servers".into(), Value::Array(servers));
    }

    let mut components = Map::new();
    if let Some(Value::Object(defs)) = root.get("definitions") {
        let schemas: Map<String, Value> = defs
            .iter()
            .map(|(k, v)| (k.clone(), convert_schema(v)))
            .collect();
        components.insert("schemas".into(), Value::Object(schemas));
    }
    if let Some(Value::Object(params)) = root.get("parameters") {
        // body/formData parameters are inlined into request bodies instead
        let converted: Map<String, Value> = params
            .iter()
            .filter(|(_, p)| !matches!(param_in(p), Some("body") | Some("formData")))
            .map(|(k, p)| (k.clone(), convert_parameter(p)))
            .collect();
        if !converted.is_empty() {
            components.insert("parameters".into(), Value::Object(converted));
        }
    }
    if let Some(Value::Object(responses)) = root.get("responses") {
        let converted: Map<String, Value> = responses
            .iter()
            .map(|(k, r)| (k.clone(), convert_response(r, &global_produces)))
            .collect();
        components.insert("responses".into(), Value::Object(converted));
    }
    if let Some(Value::Object(schemes)) = root.get("securityDefinitions") {
        let converted: Map<String, Value> = schemes
            .iter()
            .map(|(k, s)| (k.clone(), convert_security_scheme(s)))
            .collect();
        components.insert("securitySchemes".into(), Value::Object(converted));
    }
    if !components.is_empty() {
        out.insert("components".into(), Value::Object(components));
    }

    let mut paths_out = Map::new();
    match root.get("paths") {
        Some(Value::Object(paths)) => {
            for (path, item) in paths {
                let location = format!("/paths/{}", escape_pointer(path));
                let item = item.as_object().ok_or_else(|| {
                    DefinitionError::malformed(&location, "path item must be an object")
                })?;
                paths_out.insert(
                    path.clone(),
                    convert_path_item(root, item, &global_consumes, &global_produces, &location)?,
                );
            }
        }
        Some(_) => return Err(DefinitionError::malformed("/paths", "`paths` must be an object")),
        None => {}
    }
    out.insert("paths".into(), Value::Object(paths_out));

    for key in ["security", "tags", "externalDocs"] {
        if let Some(v) = root.get(key) {
            out.insert(key.into(), v.clone());
        }
    }
    for (k, v) in root.iter().filter(|(k, _)| k.starts_with("x-")) {
        out.insert(k.clone(), v.clone());
    }

    let mut out = Value::Object(out);
    rewrite_refs(&mut out);
    debug!("Swagger 2.0 document normalized to OpenAPI 3");
    Ok(out)
}

fn convert_servers(root: &Map<String, Value>) -> Vec<Value> {
    let base_path = root
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or("/");
    match root.get("host").and_then(Value::as_str) {
        Some(host) => {
            let schemes: Vec<&str> = root
                .get("schemes")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .filter(|s: &Vec<&str>| !s.is_empty())
                .unwrap_or_else(|| vec!["http"]);
            schemes
                .into_iter()
                .map(|scheme| json!({ "url": format!("{scheme}://{host}{base_path}") }))
                .collect()
        }
        None if base_path != "/" => vec![json!({ "url": base_path })],
        None => Vec::new(),
    }
}

fn convert_path_item(
    root: &Map<String, Value>,
    item: &Map<String, Value>,
    global_consumes: &[String],
    global_produces: &[String],
    location: &str,
) -> Result<Value, DefinitionError> {
    let mut out = Map::new();
    for (key, value) in item {
        let lk = key.to_ascii_lowercase();
        if lk == "parameters" {
            let (plain, _, _) = split_parameters(root, value);
            out.insert(key.clone(), Value::Array(plain));
        } else if METHODS.contains(&lk.as_str()) {
            let op_location = format!("{location}/{lk}");
            let op = value.as_object().ok_or_else(|| {
                DefinitionError::malformed(&op_location, "operation must be an object")
            })?;
            // path-level body/form parameters apply to every operation
            let inherited = item.get("parameters");
            out.insert(
                lk,
                convert_operation(root, op, inherited, global_consumes, global_produces),
            );
        } else {
            out.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(out))
}

fn convert_operation(
    root: &Map<String, Value>,
    op: &Map<String, Value>,
    inherited: Option<&Value>,
    global_consumes: &[String],
    global_produces: &[String],
) -> Value {
    let consumes = op
        .get("consumes")
        .map(|v| media_list(Some(v)))
        .unwrap_or_else(|| global_consumes.to_vec());
    let produces = op
        .get("produces")
        .map(|v| media_list(Some(v)))
        .unwrap_or_else(|| global_produces.to_vec());

    let mut out = Map::new();
    for (key, value) in op {
        match key.as_str() {
            "consumes" | "produces" | "parameters" | "responses" | "schemes" => {}
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    let (mut plain, mut body, mut form) = match inherited {
        Some(params) => split_parameters(root, params),
        None => (Vec::new(), None, Vec::new()),
    };
    if let Some(params) = op.get("parameters") {
        let (op_plain, op_body, op_form) = split_parameters(root, params);
        plain.extend(op_plain);
        if op_body.is_some() {
            body = op_body;
        }
        form.extend(op_form);
    }
    if !plain.is_empty() {
        out.insert("parameters".into(), Value::Array(plain));
    }

    if let Some(body) = body {
        out.insert("requestBody".into(), body_to_request_body(&body, &consumes));
    } else if !form.is_empty() {
        out.insert("requestBody".into(), form_to_request_body(&form, &consumes));
    }

    let mut responses = Map::new();
    if let Some(Value::Object(rs)) = op.get("responses") {
        for (status, r) in rs {
            responses.insert(status.clone(), convert_response(r, &produces));
        }
    }
    out.insert("responses".into(), Value::Object(responses));
    Value::Object(out)
}

/// Split a v2 parameter list into (plain parameters, body parameter, form parameters).
fn split_parameters(
    root: &Map<String, Value>,
    params: &Value,
) -> (Vec<Value>, Option<Value>, Vec<Value>) {
    let mut plain = Vec::new();
    let mut body = None;
    let mut form = Vec::new();
    for p in params.as_array().map(Vec::as_slice).unwrap_or_default() {
        let resolved = resolve_root_parameter(root, p).unwrap_or(p);
        match param_in(resolved) {
            Some("body") => body = Some(resolved.clone()),
            Some("formData") => form.push(resolved.clone()),
            _ if p.get("$ref").is_some() => plain.push(p.clone()),
            _ => plain.push(convert_parameter(p)),
        }
    }
    (plain, body, form)
}

fn resolve_root_parameter<'a>(root: &'a Map<String, Value>, p: &'a Value) -> Option<&'a Value> {
    let name = p
        .get("$ref")
        .and_then(Value::as_str)?
        .strip_prefix("#/parameters/")?;
    root.get("parameters")?.get(name)
}

fn param_in(p: &Value) -> Option<&str> {
    p.get("in").and_then(Value::as_str)
}

fn convert_parameter(p: &Value) -> Value {
    let Some(obj) = p.as_object() else {
        return p.clone();
    };
    if obj.contains_key("$ref") {
        return p.clone();
    }
    let mut out = Map::new();
    let mut schema = Map::new();
    for (key, value) in obj {
        if SCHEMA_KEYWORDS.contains(&key.as_str()) {
            schema.insert(key.clone(), value.clone());
        } else if key != "collectionFormat" {
            out.insert(key.clone(), value.clone());
        }
    }

    let is_array = schema.get("type").and_then(Value::as_str) == Some("array");
    if is_array {
        let location = param_in(p).unwrap_or("query");
        let collection = obj
            .get("collectionFormat")
            .and_then(Value::as_str)
            .unwrap_or("csv");
        let (style, explode) = match collection {
            "ssv" => ("spaceDelimited", false),
            "pipes" => ("pipeDelimited", false),
            "multi" => ("form", true),
            _ if location == "query" || location == "cookie" => ("form", false),
            _ => ("simple", false),
        };
        out.insert("style".into(), json!(style));
        out.insert("explode".into(), json!(explode));
    }
    out.insert("schema".into(), convert_schema(&Value::Object(schema)));
    Value::Object(out)
}

fn body_to_request_body(param: &Value, consumes: &[String]) -> Value {
    let schema = param
        .get("schema")
        .map(convert_schema)
        .unwrap_or_else(|| json!({}));
    let media_types = if consumes.is_empty() {
        vec!["application/json".to_string()]
    } else {
        consumes.to_vec()
    };
    let content: Map<String, Value> = media_types
        .into_iter()
        .map(|mt| (mt, json!({ "schema": schema.clone() })))
        .collect();

    let mut out = Map::new();
    if let Some(d) = param.get("description") {
        out.insert("description".into(), d.clone());
    }
    out.insert(
        "required".into(),
        json!(param.get("required").and_then(Value::as_bool).unwrap_or(false)),
    );
    out.insert("content".into(), Value::Object(content));
    Value::Object(out)
}

fn form_to_request_body(params: &[Value], consumes: &[String]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut has_file = false;
    for p in params {
        let Some(name) = p.get("name").and_then(Value::as_str) else {
            continue;
        };
        let converted = convert_parameter(p);
        let schema = converted.get("schema").cloned().unwrap_or_else(|| json!({}));
        has_file |= schema.get("format").and_then(Value::as_str) == Some("binary");
        properties.insert(name.to_string(), schema);
        if p.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(json!(name));
        }
    }
    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }

    let form_types: Vec<String> = consumes
        .iter()
        .filter(|mt| {
            mt.starts_with("multipart/form-data")
                || mt.starts_with("application/x-www-form-urlencoded")
        })
        .cloned()
        .collect();
    let media_types = if !form_types.is_empty() {
        form_types
    } else if has_file {
        vec!["multipart/form-data".to_string()]
    } else {
        vec!["application/x-www-form-urlencoded".to_string()]
    };
    let content: Map<String, Value> = media_types
        .into_iter()
        .map(|mt| (mt, json!({ "schema": schema.clone() })))
        .collect();
    let any_required = params
        .iter()
        .any(|p| p.get("required").and_then(Value::as_bool).unwrap_or(false));
    json!({ "required": any_required, "content": content })
}

fn convert_response(r: &Value, produces: &[String]) -> Value {
    let Some(obj) = r.as_object() else {
        return r.clone();
    };
    if obj.contains_key("$ref") {
        return r.clone();
    }
    let mut out = Map::new();
    out.insert(
        "description".into(),
        obj.get("description").cloned().unwrap_or_else(|| json!("")),
    );

    if let Some(Value::Object(headers)) = obj.get("headers") {
        let converted: Map<String, Value> = headers
            .iter()
            .map(|(name, h)| {
                let mut header = Map::new();
                let mut schema = Map::new();
                if let Some(h) = h.as_object() {
                    for (k, v) in h {
                        if k == "description" {
                            header.insert(k.clone(), v.clone());
                        } else if SCHEMA_KEYWORDS.contains(&k.as_str()) {
                            schema.insert(k.clone(), v.clone());
                        }
                    }
                }
                header.insert("schema".into(), convert_schema(&Value::Object(schema)));
                (name.clone(), Value::Object(header))
            })
            .collect();
        out.insert("headers".into(), Value::Object(converted));
    }

    let schema = obj.get("schema").map(convert_schema);
    let examples = obj.get("examples").and_then(Value::as_object);
    let mut content = Map::new();
    if schema.is_some() || examples.is_some() {
        let media_types = if produces.is_empty() {
            vec!["application/json".to_string()]
        } else {
            produces.to_vec()
        };
        for mt in media_types {
            let mut media = Map::new();
            if let Some(s) = &schema {
                media.insert("schema".into(), s.clone());
            }
            if let Some(example) = examples.and_then(|e| e.get(&mt)) {
                media.insert("example".into(), example.clone());
            }
            content.insert(mt, Value::Object(media));
        }
        // examples keyed by a mime type the operation does not list in `produces`
        for (mt, example) in examples.into_iter().flatten() {
            if !content.contains_key(mt) {
                let mut media = Map::new();
                if let Some(s) = &schema {
                    media.insert("schema".into(), s.clone());
                }
                media.insert("example".into(), example.clone());
                content.insert(mt.clone(), Value::Object(media));
            }
        }
    }
    if !content.is_empty() {
        out.insert("content".into(), Value::Object(content));
    }
    Value::Object(out)
}

fn convert_security_scheme(s: &Value) -> Value {
    let Some(obj) = s.as_object() else {
        return s.clone();
    };
    match obj.get("type").and_then(Value::as_str) {
        Some("basic") => json!({ "type": "http", "scheme": "basic" }),
        Some("oauth2") => {
            let scopes = obj.get("scopes").cloned().unwrap_or_else(|| json!({}));
            let auth_url = obj.get("authorizationUrl").cloned().unwrap_or(Value::Null);
            let token_url = obj.get("tokenUrl").cloned().unwrap_or(Value::Null);
            let flows = match obj.get("flow").and_then(Value::as_str) {
                Some("implicit") => {
                    json!({ "implicit": { "authorizationUrl": auth_url, "scopes": scopes } })
                }
                Some("password") => {
                    json!({ "password": { "tokenUrl": token_url, "scopes": scopes } })
                }
                Some("application") => {
                    json!({ "clientCredentials": { "tokenUrl": token_url, "scopes": scopes } })
                }
                _ => json!({ "authorizationCode": {
                    "authorizationUrl": auth_url,
                    "tokenUrl": token_url,
                    "scopes": scopes
                } }),
            };
            json!({ "type": "oauth2", "flows": flows })
        }
        _ => s.clone(),
    }
}

/// Deep-copy a v2 schema, translating the keywords whose shape changed in v3.
fn convert_schema(schema: &Value) -> Value {
    let mut out = schema.clone();
    convert_schema_in_place(&mut out);
    out
}

fn convert_schema_in_place(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(nullable) = obj.remove("x-nullable") {
                obj.insert("nullable".into(), nullable);
            }
            if let Some(Value::String(prop)) = obj.get("discriminator") {
                let prop = prop.clone();
                obj.insert("discriminator".into(), json!({ "propertyName": prop }));
            }
            if obj.get("type").and_then(Value::as_str) == Some("file") {
                obj.insert("type".into(), json!("string"));
                obj.insert("format".into(), json!("binary"));
            }
            for v in obj.values_mut() {
                convert_schema_in_place(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                convert_schema_in_place(v);
            }
        }
        _ => {}
    }
}

/// Point v2-style local refs at their `components` equivalents.
fn rewrite_refs(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(r)) = obj.get_mut("$ref") {
                for (from, to) in [
                    ("#/definitions/", "#/components/schemas/"),
                    ("#/parameters/", "#/components/parameters/"),
                    ("#/responses/", "#/components/responses/"),
                ] {
                    if let Some(rest) = r.strip_prefix(from) {
                        *r = format!("{to}{rest}");
                        break;
                    }
                }
            }
            for v in obj.values_mut() {
                rewrite_refs(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                rewrite_refs(v);
            }
        }
        _ => {}
    }
}

fn media_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

/// Escape a string for use as a JSON pointer token (RFC 6901).
pub(crate) fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_version() {
        let (v, s) = detect_version(&json!({ "swagger": "2.0" })).unwrap();
        assert_eq!(v, DocumentVersion::Swagger2);
        assert_eq!(s, "2.0");
        let (v, _) = detect_version(&json!({ "swagger": 2.0 })).unwrap();
        assert_eq!(v, DocumentVersion::Swagger2);
        let (v, s) = detect_version(&json!({ "openapi": "3.1.0" })).unwrap();
        assert_eq!(v, DocumentVersion::OpenApi3);
        assert_eq!(s, "3.1.0");
        assert!(detect_version(&json!({ "openapi": "4.0" })).is_err());
        assert!(detect_version(&json!({ "info": {} })).is_err());
        assert!(detect_version(&json!([])).is_err());
    }

    #[test]
    fn test_body_parameter_becomes_request_body() {
        let doc = json!({
            "swagger": "2.0",
            "info": { "title": "Pets", "version": "1" },
            "consumes": ["application/json"],
            "paths": {
                "/pets": {
                    "post": {
                        "operationId": "addPet",
                        "parameters": [
                            { "in": "body", "name": "pet", "required": true,
                              "schema": { "$ref": "#/definitions/Pet" } }
                        ],
                        "responses": { "201": { "description": "created" } }
                    }
                }
            },
            "definitions": {
                "Pet": { "type": "object", "properties": { "name": { "type": "string", "x-nullable": true } } }
            }
        });
        let out = swagger2_to_openapi3(&doc).unwrap();
        let body = &out["paths"]["/pets"]["post"]["requestBody"];
        assert_eq!(body["required"], json!(true));
        assert_eq!(
            body["content"]["application/json"]["schema"]["$ref"],
            json!("#/components/schemas/Pet")
        );
        assert!(out["paths"]["/pets"]["post"].get("parameters").is_none());
        assert_eq!(
            out["components"]["schemas"]["Pet"]["properties"]["name"]["nullable"],
            json!(true)
        );
    }

    #[test]
    fn test_query_array_collection_formats() {
        let csv = convert_parameter(&json!({
            "in": "query", "name": "tags", "type": "array", "items": { "type": "string" }
        }));
        assert_eq!(csv["style"], json!("form"));
        assert_eq!(csv["explode"], json!(false));
        assert_eq!(csv["schema"]["items"]["type"], json!("string"));

        let multi = convert_parameter(&json!({
            "in": "query", "name": "tags", "type": "array", "collectionFormat": "multi",
            "items": { "type": "string" }
        }));
        assert_eq!(multi["explode"], json!(true));

        let pipes = convert_parameter(&json!({
            "in": "query", "name": "tags", "type": "array", "collectionFormat": "pipes"
        }));
        assert_eq!(pipes["style"], json!("pipeDelimited"));
    }

    #[test]
    fn test_servers_from_host_and_base_path() {
        let doc = json!({
            "swagger": "2.0",
            "info": { "title": "t", "version": "1" },
            "host": "api.example.com",
            "basePath": "/v2",
            "schemes": ["https"],
            "paths": {}
        });
        let out = swagger2_to_openapi3(&doc).unwrap();
        assert_eq!(out["servers"][0]["url"], json!("https://api.example.com/v2"));
    }

    #[test]
    fn test_response_examples_move_to_content() {
        let r = convert_response(
            &json!({
                "description": "ok",
                "schema": { "type": "object" },
                "examples": { "application/json": { "id": 1 } },
                "headers": { "X-Rate-Limit": { "type": "integer", "description": "calls" } }
            }),
            &["application/json".to_string()],
        );
        assert_eq!(r["content"]["application/json"]["example"], json!({ "id": 1 }));
        assert_eq!(r["headers"]["X-Rate-Limit"]["schema"]["type"], json!("integer"));
    }

    #[test]
    fn test_form_data_becomes_form_body() {
        let doc = json!({
            "swagger": "2.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/upload": {
                    "post": {
                        "parameters": [
                            { "in": "formData", "name": "note", "type": "string", "required": true },
                            { "in": "formData", "name": "file", "type": "file" }
                        ],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        });
        let out = swagger2_to_openapi3(&doc).unwrap();
        let content = &out["paths"]["/upload"]["post"]["requestBody"]["content"];
        let schema = &content["multipart/form-data"]["schema"];
        assert_eq!(schema["properties"]["file"]["format"], json!("binary"));
        assert_eq!(schema["required"], json!(["note"]));
    }
}
