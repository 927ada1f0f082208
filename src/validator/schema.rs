use super::format;
use super::types::{Direction, ValidationContext, ValidationError, ValidationResult};
use crate::spec::{AdditionalProperties, Definition, Schema, SchemaId, SchemaKind, SchemaType};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use tracing::debug;

/// Descent deeper than this stops checking (the value is accepted).
pub const MAX_SCHEMA_DEPTH: usize = 64;

/// Validates JSON values against schemas of one [`Definition`].
///
/// Holds no per-request state; one validator serves any number of threads.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    definition: Arc<Definition>,
}

/// Mutable state of one `validate` call.
struct Walk<'c> {
    ctx: &'c ValidationContext,
    /// JSON pointer of the value being checked
    instance: String,
    /// Keyword path of the schema being applied
    schema_path: String,
    /// `(schema, value address)` pairs on the current descent
    active: Vec<(SchemaId, usize)>,
    errors: ValidationResult,
}

impl Walk<'_> {
    fn fail(&mut self, keyword: &str, message: String) {
        let schema_path = format!("{}/{keyword}", self.schema_path);
        self.errors.push(
            ValidationError::new(self.ctx.location, self.ctx.label(&self.instance), message)
                .with_schema_path(schema_path),
        );
    }

    fn enter_instance(&mut self, token: &str) -> usize {
        let mark = self.instance.len();
        self.instance.push('/');
        push_escaped(&mut self.instance, token);
        mark
    }

    fn enter_schema(&mut self, suffix: &str) -> usize {
        let mark = self.schema_path.len();
        self.schema_path.push_str(suffix);
        mark
    }
}

fn push_escaped(out: &mut String, token: &str) {
    for c in token.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
}

impl SchemaValidator {
    #[must_use]
    pub fn new(definition: Arc<Definition>) -> Self {
        Self { definition }
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    /// Check `value` against `schema`, collecting every problem found.
    #[must_use]
    pub fn validate(&self, value: &Value, schema: SchemaId, ctx: &ValidationContext) -> ValidationResult {
        let mut walk = Walk {
            ctx,
            instance: String::new(),
            schema_path: String::new(),
            active: Vec::new(),
            errors: Vec::new(),
        };
        self.check(value, schema, &mut walk);
        walk.errors
    }

    #[must_use]
    pub fn is_valid(&self, value: &Value, schema: SchemaId, ctx: &ValidationContext) -> bool {
        self.validate(value, schema, ctx).is_empty()
    }

    fn check(&self, value: &Value, id: SchemaId, walk: &mut Walk<'_>) {
        if walk.active.len() >= MAX_SCHEMA_DEPTH {
            debug!(
                depth = walk.active.len(),
                instance = %walk.instance,
                "Schema depth limit reached, accepting value"
            );
            return;
        }
        let key = (id, value as *const Value as usize);
        if walk.active.contains(&key) {
            return;
        }
        walk.active.push(key);
        self.check_node(value, self.definition.schemas().get(id), walk);
        walk.active.pop();
    }

    /// Run `id` against `value` and report whether it passed, discarding errors.
    fn passes(&self, value: &Value, id: SchemaId, walk: &mut Walk<'_>) -> bool {
        let before = walk.errors.len();
        self.check(value, id, walk);
        let ok = walk.errors.len() == before;
        walk.errors.truncate(before);
        ok
    }

    fn check_node(&self, value: &Value, schema: &Schema, walk: &mut Walk<'_>) {
        if value.is_null() && schema.allows_null() {
            return;
        }
        if !schema.types.is_empty() && !schema.types.iter().any(|t| t.matches(value)) {
            let expected = schema
                .types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            walk.fail("type", format!("expected {expected}, got {}", json_type(value)));
            return;
        }

        if let Some(allowed) = &schema.enum_values {
            if !allowed.iter().any(|a| json_eq(a, value)) {
                let listed = allowed.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
                walk.fail("enum", format!("value must be one of [{listed}]"));
            }
        }

        match value {
            Value::String(s) => check_string(s, schema, walk),
            Value::Number(n) => check_number(n, schema, walk),
            Value::Array(items) => self.check_array(items, schema, walk),
            Value::Object(map) => self.check_object(map, schema, walk),
            Value::Bool(_) | Value::Null => {}
        }

        match &schema.kind {
            SchemaKind::Leaf => {
                if schema.discriminator.is_some() {
                    self.check_inherited_discriminator(value, schema, walk);
                }
            }
            SchemaKind::AllOf(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    let mark = walk.enter_schema(&format!("/allOf/{i}"));
                    self.check(value, *branch, walk);
                    walk.schema_path.truncate(mark);
                }
            }
            SchemaKind::OneOf(branches) | SchemaKind::AnyOf(branches) => {
                let keyword = if matches!(schema.kind, SchemaKind::OneOf(_)) {
                    "oneOf"
                } else {
                    "anyOf"
                };
                match &schema.discriminator {
                    Some(d) if !d.mapping.is_empty() => {
                        self.check_discriminated(value, schema, walk);
                    }
                    _ => self.check_alternatives(value, keyword, branches, walk),
                }
            }
        }
    }

    fn check_alternatives(&self, value: &Value, keyword: &str, branches: &[SchemaId], walk: &mut Walk<'_>) {
        let mut matched = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            let mark = walk.enter_schema(&format!("/{keyword}/{i}"));
            if self.passes(value, *branch, walk) {
                matched.push(i);
            }
            walk.schema_path.truncate(mark);
            if keyword == "anyOf" && !matched.is_empty() {
                return;
            }
        }
        let labels = |idx: &mut dyn Iterator<Item = usize>| {
            idx.map(|i| self.branch_label(branches[i], keyword, i))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match matched.len() {
            0 => {
                let tried = labels(&mut (0..branches.len()));
                walk.fail(keyword, format!("value does not match any of: {tried}"));
            }
            1 => {}
            _ if keyword == "oneOf" => {
                let both = labels(&mut matched.iter().copied());
                walk.fail(keyword, format!("value is ambiguous, it matches: {both}"));
            }
            _ => {}
        }
    }

    /// `oneOf`/`anyOf` with a discriminator: the property picks the one branch.
    fn check_discriminated(&self, value: &Value, schema: &Schema, walk: &mut Walk<'_>) {
        let Some(d) = &schema.discriminator else {
            return;
        };
        let Some(map) = value.as_object() else {
            walk.fail(
                "discriminator",
                format!("expected an object carrying '{}'", d.property_name),
            );
            return;
        };
        let Some(tag) = map.get(&d.property_name) else {
            walk.fail(
                "discriminator",
                format!("missing discriminator property '{}'", d.property_name),
            );
            return;
        };
        let tag = tag.as_str().map_or_else(|| tag.to_string(), str::to_string);
        let Some(branch) = d.mapping.get(&tag) else {
            let known = d.mapping.keys().cloned().collect::<Vec<_>>().join(", ");
            walk.fail(
                "discriminator",
                format!(
                    "discriminator '{}' value '{tag}' is not one of: {known}",
                    d.property_name
                ),
            );
            return;
        };
        let mark = walk.enter_schema(&format!("/discriminator/mapping/{tag}"));
        self.check(value, *branch, walk);
        walk.schema_path.truncate(mark);
    }

    /// A discriminator on a plain base schema (children `allOf` the base):
    /// check the mapped child when the tag names one.
    fn check_inherited_discriminator(&self, value: &Value, schema: &Schema, walk: &mut Walk<'_>) {
        let Some(d) = &schema.discriminator else {
            return;
        };
        let Some(branch) = value
            .get(&d.property_name)
            .and_then(Value::as_str)
            .and_then(|tag| d.mapping.get(tag))
        else {
            return;
        };
        let mark = walk.enter_schema("/discriminator");
        self.check(value, *branch, walk);
        walk.schema_path.truncate(mark);
    }

    fn branch_label(&self, id: SchemaId, keyword: &str, index: usize) -> String {
        match &self.definition.schemas().get(id).name {
            Some(name) => name.clone(),
            None => format!("{keyword}/{index}"),
        }
    }

    fn check_array(&self, items: &[Value], schema: &Schema, walk: &mut Walk<'_>) {
        if let Some(min) = schema.min_items {
            if items.len() < min {
                walk.fail("minItems", format!("expected at least {min} items, got {}", items.len()));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                walk.fail("maxItems", format!("expected at most {max} items, got {}", items.len()));
            }
        }
        if schema.unique_items {
            let duplicate = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[i + 1..].iter().any(|b| json_eq(a, b)));
            if duplicate {
                walk.fail("uniqueItems", "array items must be unique".to_string());
            }
        }
        let Some(item_schema) = schema.items else {
            return;
        };
        let schema_mark = walk.enter_schema("/items");
        for (i, item) in items.iter().enumerate() {
            let mark = walk.enter_instance(&i.to_string());
            self.check(item, item_schema, walk);
            walk.instance.truncate(mark);
        }
        walk.schema_path.truncate(schema_mark);
    }

    fn check_object(&self, map: &Map<String, Value>, schema: &Schema, walk: &mut Walk<'_>) {
        let schemas = self.definition.schemas();
        for name in &schema.required {
            if map.contains_key(name) {
                continue;
            }
            let exempt = schema.properties.get(name).is_some_and(|p| {
                let p = schemas.get(*p);
                match walk.ctx.direction {
                    Direction::Request => p.read_only,
                    Direction::Response => p.write_only,
                }
            });
            if !exempt {
                let mark = walk.enter_instance(name);
                walk.fail("required", format!("missing required property '{name}'"));
                walk.instance.truncate(mark);
            }
        }

        if let Some(min) = schema.min_properties {
            if map.len() < min {
                walk.fail("minProperties", format!("expected at least {min} properties"));
            }
        }
        if let Some(max) = schema.max_properties {
            if map.len() > max {
                walk.fail("maxProperties", format!("expected at most {max} properties"));
            }
        }

        for (name, child) in map {
            let mark = walk.enter_instance(name);
            if let Some(prop) = schema.properties.get(name) {
                let schema_mark = walk.enter_schema("/properties/");
                push_escaped(&mut walk.schema_path, name);
                self.check(child, *prop, walk);
                walk.schema_path.truncate(schema_mark);
            } else {
                match schema.additional_properties {
                    AdditionalProperties::Allowed => {}
                    AdditionalProperties::Denied => {
                        walk.fail(
                            "additionalProperties",
                            format!("property '{name}' is not allowed"),
                        );
                    }
                    AdditionalProperties::Schema(extra) => {
                        let schema_mark = walk.enter_schema("/additionalProperties");
                        self.check(child, extra, walk);
                        walk.schema_path.truncate(schema_mark);
                    }
                }
            }
            walk.instance.truncate(mark);
        }
    }
}

fn check_string(s: &str, schema: &Schema, walk: &mut Walk<'_>) {
    let len = s.chars().count();
    if let Some(min) = schema.min_length {
        if len < min {
            walk.fail("minLength", format!("expected at least {min} characters, got {len}"));
        }
    }
    if let Some(max) = schema.max_length {
        if len > max {
            walk.fail("maxLength", format!("expected at most {max} characters, got {len}"));
        }
    }
    if let Some(pattern) = &schema.pattern {
        if !pattern.is_match(s) {
            walk.fail("pattern", format!("value does not match pattern '{}'", pattern.as_str()));
        }
    }
    if let Some(f) = &schema.format {
        if !format::check_string(f, s) {
            walk.fail("format", format!("value is not a valid {f}"));
        }
    }
}

fn check_number(n: &Number, schema: &Schema, walk: &mut Walk<'_>) {
    let Some(x) = n.as_f64() else {
        return;
    };
    if let Some(min) = schema.minimum {
        if schema.exclusive_minimum && x <= min {
            walk.fail("exclusiveMinimum", format!("{x} must be greater than {min}"));
        } else if x < min {
            walk.fail("minimum", format!("{x} is less than the minimum of {min}"));
        }
    }
    if let Some(max) = schema.maximum {
        if schema.exclusive_maximum && x >= max {
            walk.fail("exclusiveMaximum", format!("{x} must be less than {max}"));
        } else if x > max {
            walk.fail("maximum", format!("{x} is greater than the maximum of {max}"));
        }
    }
    if let Some(m) = schema.multiple_of {
        let q = x / m;
        if (q - q.round()).abs() > 1e-9 {
            walk.fail("multipleOf", format!("{x} is not a multiple of {m}"));
        }
    }
    if let Some(f) = &schema.format {
        if !format::check_number(f, n) {
            walk.fail("format", format!("{x} is not a valid {f}"));
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if SchemaType::Integer.matches(value) && !n.is_f64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON equality where `1` and `1.0` are the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| json_eq(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}
