use super::error::{fail_if_issues, DefinitionError, DefinitionErrorKind};
use super::normalize::{detect_version, escape_pointer, swagger2_to_openapi3, DocumentVersion, METHODS};
use super::schema::{
    AdditionalProperties, Discriminator, Schema, SchemaId, SchemaKind, SchemaTable, SchemaType,
};
use super::types::{
    BodySpec, Definition, HeaderSpec, MediaTypeSpec, Operation, ParameterLocation,
    ParameterSpec, ParameterStyle, ResponseSpec, SecurityRequirement, ServerUrl, StatusPattern,
};
use http::Method;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SCHEMA_COMPONENTS: &str = "/components/schemas/";

/// Longest chain of `$ref` → `$ref` hops followed for non-schema components.
const MAX_REF_HOPS: usize = 32;

impl Definition {
    /// Build a definition from a parsed Swagger 2.0 or OpenAPI 3.x document.
    ///
    /// Swagger documents are normalized to OpenAPI 3 first. Every internal
    /// `$ref` is resolved here; problems found anywhere in the document are
    /// logged together and the first one is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] when the document is malformed, holds an
    /// unresolvable reference or declares an `operationId` twice.
    pub fn load(raw: Value) -> Result<Definition, DefinitionError> {
        let (version, source_version) = detect_version(&raw)?;
        let doc = match version {
            DocumentVersion::Swagger2 => swagger2_to_openapi3(&raw)?,
            DocumentVersion::OpenApi3 => raw,
        };

        let mut builder = Builder::new(&doc);
        builder.compile_components();
        let operations = builder.operations();
        let Builder {
            table, issues, ..
        } = builder;
        fail_if_issues(issues)?;

        let info = doc.get("info");
        let text = |key: &str| {
            info.and_then(|i| i.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let definition = Definition {
            title: text("title"),
            version: text("version"),
            source_version,
            operations,
            servers: servers(&doc),
            schemas: table,
            security: security_requirements(doc.get("security")),
            security_schemes: doc
                .pointer("/components/securitySchemes")
                .and_then(Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
            document: doc,
        };
        info!(
            title = %definition.title,
            source_version = %definition.source_version,
            operations = definition.operations.len(),
            schemas = definition.schemas.len(),
            "OpenAPI definition loaded"
        );
        Ok(definition)
    }
}

/// Single pass over a normalized OpenAPI 3 document.
struct Builder<'a> {
    doc: &'a Value,
    table: SchemaTable,
    /// JSON pointer of every compiled schema to its arena slot
    by_pointer: HashMap<String, SchemaId>,
    /// Pointers currently being followed through `$ref` aliases
    ref_chain: Vec<String>,
    issues: Vec<DefinitionError>,
}

impl<'a> Builder<'a> {
    fn new(doc: &'a Value) -> Self {
        Self {
            doc,
            table: SchemaTable::default(),
            by_pointer: HashMap::new(),
            ref_chain: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, err: DefinitionError) {
        self.issues.push(err);
    }

    /// Compile `components.schemas` up front so every named schema is in the
    /// name index, referenced or not.
    fn compile_components(&mut self) {
        let doc = self.doc;
        match doc.pointer("/components/schemas") {
            Some(Value::Object(schemas)) => {
                for (name, schema) in schemas {
                    let pointer = format!("{SCHEMA_COMPONENTS}{}", escape_pointer(name));
                    let id = self.compile(schema, &pointer);
                    self.table.name(name, id);
                }
            }
            Some(_) => self.issue(DefinitionError::malformed(
                "/components/schemas",
                "`components.schemas` must be an object",
            )),
            None => {}
        }
    }

    // ---------------------------------------------------------------------
    // Schemas
    // ---------------------------------------------------------------------

    fn compile(&mut self, value: &'a Value, pointer: &str) -> SchemaId {
        if let Some(reference) = value.get("$ref").and_then(Value::as_str) {
            return self.compile_ref(reference, pointer);
        }
        if let Some(id) = self.by_pointer.get(pointer) {
            return *id;
        }
        let id = self.table.reserve();
        self.by_pointer.insert(pointer.to_string(), id);
        let mut schema = self.build_schema(value, pointer);
        schema.name = component_name(pointer);
        self.table.fill(id, schema);
        id
    }

    fn compile_ref(&mut self, reference: &str, from: &str) -> SchemaId {
        let Some((target, value)) = self.resolve_pointer(reference) else {
            self.issue(DefinitionError::unresolvable(from, reference));
            return self.table.reserve();
        };
        if let Some(id) = self.by_pointer.get(&target) {
            return *id;
        }
        if self.ref_chain.contains(&target) {
            self.issue(DefinitionError::malformed(
                from,
                format!("'{reference}' is a circular alias with no schema in between"),
            ));
            return self.table.reserve();
        }
        self.ref_chain.push(target.clone());
        let id = self.compile(value, &target);
        self.ref_chain.pop();
        self.by_pointer.insert(target, id);
        id
    }

    /// Resolve a local `#/...` reference to its (decoded pointer, value).
    fn resolve_pointer(&self, reference: &str) -> Option<(String, &'a Value)> {
        let fragment = reference.strip_prefix('#')?;
        let pointer = urlencoding::decode(fragment).ok()?.into_owned();
        let value = self.doc.pointer(&pointer)?;
        Some((pointer, value))
    }

    fn build_schema(&mut self, value: &'a Value, pointer: &str) -> Schema {
        let mut schema = Schema::default();
        let Some(obj) = value.as_object() else {
            // boolean schemas and other shapes accept anything
            return schema;
        };

        match obj.get("type") {
            Some(Value::String(t)) => schema.types.extend(SchemaType::parse(t)),
            Some(Value::Array(ts)) => schema.types.extend(
                ts.iter()
                    .filter_map(Value::as_str)
                    .filter_map(SchemaType::parse),
            ),
            _ => {}
        }
        schema.nullable = schema.types.contains(&SchemaType::Null)
            || flag(obj.get("nullable"))
            || flag(obj.get("x-nullable"));

        if let Some(Value::Object(props)) = obj.get("properties") {
            for (name, prop) in props {
                let ptr = format!("{pointer}/properties/{}", escape_pointer(name));
                let id = self.compile(prop, &ptr);
                schema.properties.insert(name.clone(), id);
            }
        }
        schema.required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        schema.additional_properties = match obj.get("additionalProperties") {
            Some(Value::Bool(false)) => AdditionalProperties::Denied,
            Some(v @ Value::Object(_)) => AdditionalProperties::Schema(
                self.compile(v, &format!("{pointer}/additionalProperties")),
            ),
            _ => AdditionalProperties::Allowed,
        };
        schema.items = match obj.get("items") {
            Some(v @ Value::Object(_)) => Some(self.compile(v, &format!("{pointer}/items"))),
            Some(Value::Array(tuple)) => tuple
                .first()
                .map(|first| self.compile(first, &format!("{pointer}/items/0"))),
            _ => None,
        };

        schema.enum_values = match (obj.get("enum"), obj.get("const")) {
            (Some(Value::Array(values)), _) => Some(values.clone()),
            (None, Some(c)) => Some(vec![c.clone()]),
            _ => None,
        };
        schema.format = obj.get("format").and_then(Value::as_str).map(String::from);
        schema.example = obj.get("example").cloned();
        schema.examples = match obj.get("examples") {
            Some(Value::Array(values)) => values
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            Some(Value::Object(named)) => named.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => IndexMap::new(),
        };
        schema.default = obj.get("default").cloned();

        schema.minimum = number(obj.get("minimum"));
        schema.maximum = number(obj.get("maximum"));
        match obj.get("exclusiveMinimum") {
            Some(Value::Bool(b)) => schema.exclusive_minimum = *b,
            Some(Value::Number(n)) => {
                schema.minimum = n.as_f64();
                schema.exclusive_minimum = true;
            }
            _ => {}
        }
        match obj.get("exclusiveMaximum") {
            Some(Value::Bool(b)) => schema.exclusive_maximum = *b,
            Some(Value::Number(n)) => {
                schema.maximum = n.as_f64();
                schema.exclusive_maximum = true;
            }
            _ => {}
        }
        schema.multiple_of = number(obj.get("multipleOf")).filter(|m| *m > 0.0);
        schema.min_length = count(obj.get("minLength"));
        schema.max_length = count(obj.get("maxLength"));
        schema.pattern = obj
            .get("pattern")
            .and_then(Value::as_str)
            .and_then(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(schema = %pointer, pattern = %p, error = %err, "Ignoring invalid pattern");
                    None
                }
            });
        schema.min_items = count(obj.get("minItems"));
        schema.max_items = count(obj.get("maxItems"));
        schema.unique_items = flag(obj.get("uniqueItems"));
        schema.min_properties = count(obj.get("minProperties"));
        schema.max_properties = count(obj.get("maxProperties"));
        schema.read_only = flag(obj.get("readOnly"));
        schema.write_only = flag(obj.get("writeOnly"));

        let compositions: [(&str, fn(Vec<SchemaId>) -> SchemaKind); 3] = [
            ("allOf", SchemaKind::AllOf),
            ("oneOf", SchemaKind::OneOf),
            ("anyOf", SchemaKind::AnyOf),
        ];
        for (keyword, make) in compositions {
            if let Some(Value::Array(branches)) = obj.get(keyword) {
                let ids = branches
                    .iter()
                    .enumerate()
                    .map(|(i, b)| self.compile(b, &format!("{pointer}/{keyword}/{i}")))
                    .collect();
                schema.kind = make(ids);
                break;
            }
        }

        if let Some(d) = obj.get("discriminator") {
            schema.discriminator = self.discriminator(d, obj, pointer);
        }
        schema
    }

    fn discriminator(
        &mut self,
        d: &'a Value,
        obj: &'a serde_json::Map<String, Value>,
        pointer: &str,
    ) -> Option<Discriminator> {
        let property_name = d.get("propertyName").and_then(Value::as_str)?.to_string();
        let mut mapping = IndexMap::new();
        if let Some(Value::Object(explicit)) = d.get("mapping") {
            for (value, target) in explicit {
                let Some(target) = target.as_str() else {
                    continue;
                };
                let reference = if target.starts_with('#') {
                    target.to_string()
                } else {
                    format!("#{SCHEMA_COMPONENTS}{target}")
                };
                let id = self.compile_ref(&reference, &format!("{pointer}/discriminator"));
                mapping.insert(value.clone(), id);
            }
        }
        // implicit mapping: the component name of each `$ref` branch
        for keyword in ["oneOf", "anyOf"] {
            let Some(Value::Array(branches)) = obj.get(keyword) else {
                continue;
            };
            for (i, branch) in branches.iter().enumerate() {
                let Some(name) = branch
                    .get("$ref")
                    .and_then(Value::as_str)
                    .and_then(|r| r.strip_prefix("#/components/schemas/"))
                else {
                    continue;
                };
                if mapping.contains_key(name) {
                    continue;
                }
                let id = self.compile(branch, &format!("{pointer}/{keyword}/{i}"));
                if !mapping.values().any(|v| *v == id) {
                    mapping.insert(name.to_string(), id);
                }
            }
        }
        Some(Discriminator {
            property_name,
            mapping,
        })
    }

    // ---------------------------------------------------------------------
    // Components referenced by operations
    // ---------------------------------------------------------------------

    /// Follow `$ref` hops until a concrete object; returns it with its pointer.
    fn resolve_component(&mut self, value: &'a Value, location: &str) -> Option<(&'a Value, String)> {
        let mut current = value;
        let mut pointer = location.to_string();
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Some((current, pointer));
            };
            match self.resolve_pointer(reference) {
                Some((p, v)) => {
                    current = v;
                    pointer = p;
                }
                None => {
                    self.issue(DefinitionError::unresolvable(location, reference));
                    return None;
                }
            }
        }
        self.issue(DefinitionError::malformed(location, "`$ref` chain too long or circular"));
        None
    }

    fn parameters(&mut self, list: Option<&'a Value>, location: &str) -> Vec<ParameterSpec> {
        let Some(list) = list else {
            return Vec::new();
        };
        let Some(items) = list.as_array() else {
            self.issue(DefinitionError::malformed(location, "`parameters` must be an array"));
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, p)| self.parameter(p, &format!("{location}/{i}")))
            .collect()
    }

    fn parameter(&mut self, raw: &'a Value, location: &str) -> Option<ParameterSpec> {
        let (p, pointer) = self.resolve_component(raw, location)?;
        let Some(name) = p.get("name").and_then(Value::as_str) else {
            self.issue(DefinitionError::malformed(location, "parameter without `name`"));
            return None;
        };
        let Some(param_location) = p.get("in").and_then(Value::as_str).and_then(ParameterLocation::parse)
        else {
            self.issue(DefinitionError::malformed(
                location,
                format!("parameter '{name}' has no valid `in`"),
            ));
            return None;
        };
        let style = p
            .get("style")
            .and_then(Value::as_str)
            .and_then(ParameterStyle::parse)
            .unwrap_or_else(|| param_location.default_style());
        let explode = p
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style == ParameterStyle::Form);

        let mut schema = p
            .get("schema")
            .map(|s| self.compile(s, &format!("{pointer}/schema")));
        let mut content_type = None;
        if let Some(Value::Object(content)) = p.get("content") {
            if let Some((media_type, media)) = content.iter().next() {
                content_type = Some(media_type.clone());
                schema = media.get("schema").map(|s| {
                    let ptr = format!("{pointer}/content/{}/schema", escape_pointer(media_type));
                    self.compile(s, &ptr)
                });
            }
        }

        Some(ParameterSpec {
            name: name.to_string(),
            location: param_location,
            required: param_location == ParameterLocation::Path || flag(p.get("required")),
            schema,
            style,
            explode,
            content_type,
        })
    }

    fn content(&mut self, content: Option<&'a Value>, pointer: &str) -> IndexMap<String, MediaTypeSpec> {
        let mut out = IndexMap::new();
        let Some(Value::Object(content)) = content else {
            return out;
        };
        for (media_type, media) in content {
            let media_ptr = format!("{pointer}/content/{}", escape_pointer(media_type));
            let schema = media
                .get("schema")
                .map(|s| self.compile(s, &format!("{media_ptr}/schema")));
            let mut examples = IndexMap::new();
            if let Some(Value::Object(named)) = media.get("examples") {
                for (name, example) in named {
                    let ex_loc = format!("{media_ptr}/examples/{}", escape_pointer(name));
                    if let Some((example, _)) = self.resolve_component(example, &ex_loc) {
                        if let Some(value) = example.get("value") {
                            examples.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
            out.insert(
                media_type.clone(),
                MediaTypeSpec {
                    schema,
                    example: media.get("example").cloned(),
                    examples,
                },
            );
        }
        out
    }

    fn request_body(&mut self, raw: Option<&'a Value>, location: &str) -> Option<BodySpec> {
        let (body, pointer) = self.resolve_component(raw?, location)?;
        Some(BodySpec {
            required: flag(body.get("required")),
            content: self.content(body.get("content"), &pointer),
        })
    }

    fn responses(&mut self, raw: Option<&'a Value>, location: &str) -> Vec<ResponseSpec> {
        let mut out = Vec::new();
        let Some(Value::Object(responses)) = raw else {
            return out;
        };
        for (key, r) in responses {
            if key.starts_with("x-") {
                continue;
            }
            let loc = format!("{location}/{}", escape_pointer(key));
            let Some(status) = StatusPattern::parse(key) else {
                self.issue(DefinitionError::malformed(
                    &loc,
                    format!("invalid response status '{key}'"),
                ));
                continue;
            };
            let Some((r, pointer)) = self.resolve_component(r, &loc) else {
                continue;
            };
            let mut headers = IndexMap::new();
            if let Some(Value::Object(declared)) = r.get("headers") {
                for (name, h) in declared {
                    let h_loc = format!("{pointer}/headers/{}", escape_pointer(name));
                    let Some((h, h_ptr)) = self.resolve_component(h, &h_loc) else {
                        continue;
                    };
                    let schema = h
                        .get("schema")
                        .map(|s| self.compile(s, &format!("{h_ptr}/schema")));
                    headers.insert(
                        name.clone(),
                        HeaderSpec {
                            required: flag(h.get("required")),
                            schema,
                            example: h.get("example").cloned(),
                        },
                    );
                }
            }
            out.push(ResponseSpec {
                status,
                description: r
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                headers,
                content: self.content(r.get("content"), &pointer),
            });
        }
        out
    }

    // ---------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------

    fn operations(&mut self) -> Vec<Arc<Operation>> {
        let mut operations: Vec<Operation> = Vec::new();
        let doc = self.doc;
        let paths = match doc.get("paths") {
            Some(Value::Object(paths)) => paths,
            Some(_) => {
                self.issue(DefinitionError::malformed("/paths", "`paths` must be an object"));
                return Vec::new();
            }
            None => return Vec::new(),
        };

        let default_security = security_requirements(doc.get("security"));
        let mut declared_ids: HashMap<String, String> = HashMap::new();
        // operations without an `operationId`, named once every declared id is known
        let mut unnamed: Vec<usize> = Vec::new();

        for (path, item) in paths {
            let location = format!("/paths/{}", escape_pointer(path));
            if let Err(message) = check_template(path) {
                self.issue(DefinitionError::malformed(&location, message));
                continue;
            }
            let Some((item, item_ptr)) = self.resolve_component(item, &location) else {
                continue;
            };
            let Some(item) = item.as_object() else {
                self.issue(DefinitionError::malformed(&location, "path item must be an object"));
                continue;
            };
            let shared = self.parameters(item.get("parameters"), &format!("{item_ptr}/parameters"));

            for (key, op) in item {
                let lower = key.to_ascii_lowercase();
                if !METHODS.contains(&lower.as_str()) {
                    continue;
                }
                let op_loc = format!("{item_ptr}/{key}");
                let Ok(method) = Method::from_bytes(lower.to_ascii_uppercase().as_bytes()) else {
                    continue;
                };

                let mut parameters = shared.clone();
                for p in self.parameters(op.get("parameters"), &format!("{op_loc}/parameters")) {
                    match parameters
                        .iter_mut()
                        .find(|q| q.name == p.name && q.location == p.location)
                    {
                        Some(existing) => *existing = p,
                        None => parameters.push(p),
                    }
                }

                let id = match op.get("operationId").and_then(Value::as_str) {
                    Some(id) => {
                        let display = format!("{method} {path}");
                        if let Some(first) = declared_ids.get(id) {
                            self.issue(DefinitionError::new(
                                DefinitionErrorKind::DuplicateOperationId,
                                &display,
                                format!("operationId '{id}' already used by {first}"),
                            ));
                            continue;
                        }
                        declared_ids.insert(id.to_string(), display);
                        id.to_string()
                    }
                    None => {
                        unnamed.push(operations.len());
                        String::new()
                    }
                };

                let request_body = self.request_body(op.get("requestBody"), &format!("{op_loc}/requestBody"));
                let responses = self.responses(op.get("responses"), &format!("{op_loc}/responses"));
                let security = match op.get("security") {
                    Some(s) => security_requirements(Some(s)),
                    None => default_security.clone(),
                };

                operations.push(Operation {
                    id,
                    method,
                    path_template: path.clone(),
                    summary: op.get("summary").and_then(Value::as_str).map(String::from),
                    tags: op
                        .get("tags")
                        .and_then(Value::as_array)
                        .map(|t| t.iter().filter_map(Value::as_str).map(String::from).collect())
                        .unwrap_or_default(),
                    deprecated: flag(op.get("deprecated")),
                    parameters,
                    request_body,
                    responses,
                    security,
                });
            }
        }

        let mut taken: HashSet<String> = declared_ids.into_keys().collect();
        for i in unnamed {
            let op = &mut operations[i];
            let base = synthesize_operation_id(&op.method, &op.path_template);
            let mut id = base.clone();
            let mut n = 2;
            while taken.contains(&id) {
                id = format!("{base}_{n}");
                n += 1;
            }
            taken.insert(id.clone());
            op.id = id;
        }

        operations
            .into_iter()
            .map(|op| {
                debug!(operation_id = %op.id, method = %op.method, path = %op.path_template, "Operation compiled");
                Arc::new(op)
            })
            .collect()
    }
}

/// Name of a schema living directly under `components.schemas`.
fn component_name(pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix(SCHEMA_COMPONENTS)?;
    if rest.contains('/') {
        return None;
    }
    Some(rest.replace("~1", "/").replace("~0", "~"))
}

fn flag(v: Option<&Value>) -> bool {
    v.and_then(Value::as_bool).unwrap_or(false)
}

fn number(v: Option<&Value>) -> Option<f64> {
    v.and_then(Value::as_f64)
}

fn count(v: Option<&Value>) -> Option<usize> {
    v.and_then(Value::as_u64).and_then(|n| usize::try_from(n).ok())
}

/// Reject templates with unbalanced or empty `{}` captures.
fn check_template(path: &str) -> Result<(), String> {
    let mut open = None;
    for (i, c) in path.char_indices() {
        match c {
            '{' if open.is_some() => return Err(format!("nested '{{' in path template '{path}'")),
            '{' => open = Some(i),
            '}' => match open.take() {
                Some(start) if i == start + 1 => {
                    return Err(format!("empty parameter name in path template '{path}'"))
                }
                Some(_) => {}
                None => return Err(format!("unbalanced '}}' in path template '{path}'")),
            },
            _ => {}
        }
    }
    if open.is_some() {
        return Err(format!("unclosed '{{' in path template '{path}'"));
    }
    Ok(())
}

/// `get` + `/pets/{petId}/photos` → `get_pets_petId_photos`. Callers add a
/// numeric suffix when the result is already taken.
fn synthesize_operation_id(method: &Method, path: &str) -> String {
    let slug = path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let slug = if slug.is_empty() { "root".to_string() } else { slug };
    format!("{}_{slug}", method.as_str().to_ascii_lowercase())
}

fn servers(doc: &Value) -> Vec<ServerUrl> {
    doc.get("servers")
        .and_then(Value::as_array)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|s| {
                    Some(ServerUrl {
                        url: s.get("url")?.as_str()?.to_string(),
                        description: s.get("description").and_then(Value::as_str).map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn security_requirements(v: Option<&Value>) -> Vec<SecurityRequirement> {
    v.and_then(Value::as_array)
        .map(|reqs| {
            reqs.iter()
                .filter_map(Value::as_object)
                .map(|req| {
                    req.iter()
                        .map(|(scheme, scopes)| {
                            let scopes = scopes
                                .as_array()
                                .map(|s| s.iter().filter_map(Value::as_str).map(String::from).collect())
                                .unwrap_or_default();
                            (scheme.clone(), scopes)
                        })
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default()
}
