//! Placeholder values generated from schemas.
//!
//! Generation is total: any node the generator cannot model yields `null`.
//! Values are chosen so that they pass [`SchemaValidator`] for the same
//! schema wherever the schema is satisfiable without search. Patterns are
//! not inverted, and a format placeholder cut down to `maxLength` no longer
//! matches its format.
//!
//! `oneOf` without a discriminator needs a validator to find a value that
//! matches exactly one branch; see [`ValueGenerator::with_validator`].

use crate::spec::{AdditionalProperties, Schema, SchemaId, SchemaKind, SchemaTable, SchemaType};
use crate::validator::{SchemaValidator, ValidationContext};
use serde_json::{Map, Number, Value};

/// Descent deeper than this generates `null`.
pub const MAX_GENERATION_DEPTH: usize = 16;

/// Key used for the single entry generated for `additionalProperties` maps.
const ADDITIONAL_PROPERTY_KEY: &str = "additionalProp1";

/// Generate a value for `schema`. `hint` names the property or header the
/// value is for and shows up in string placeholders.
#[must_use]
pub fn mock_value(schemas: &SchemaTable, schema: SchemaId, hint: &str) -> Value {
    ValueGenerator::new(schemas).generate(schema, hint)
}

/// Render a generated value as header text (`simple` style).
#[must_use]
pub fn header_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(header_text).collect::<Vec<_>>().join(","),
        Value::Object(map) => map
            .iter()
            .flat_map(|(k, v)| [k.clone(), header_text(v)])
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Schema walker that remembers which schemas are on the current descent.
pub struct ValueGenerator<'s> {
    schemas: &'s SchemaTable,
    validator: Option<&'s SchemaValidator>,
    active: Vec<SchemaId>,
}

impl<'s> ValueGenerator<'s> {
    #[must_use]
    pub fn new(schemas: &'s SchemaTable) -> Self {
        Self {
            schemas,
            validator: None,
            active: Vec::new(),
        }
    }

    /// Check `oneOf` candidates with `validator`, which must belong to the
    /// definition owning `schemas`.
    #[must_use]
    pub fn with_validator(mut self, validator: &'s SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn generate(&mut self, id: SchemaId, hint: &str) -> Value {
        if self.active.len() >= MAX_GENERATION_DEPTH {
            return Value::Null;
        }
        let schemas = self.schemas;
        self.active.push(id);
        let value = self.generate_node(schemas.get(id), hint);
        self.active.pop();
        value
    }

    fn is_active(&self, id: SchemaId) -> bool {
        self.active.contains(&id)
    }

    fn generate_node(&mut self, schema: &Schema, hint: &str) -> Value {
        if let Some(example) = &schema.example {
            return example.clone();
        }
        if let Some(first) = schema.examples.values().next() {
            return first.clone();
        }
        if let Some(default) = &schema.default {
            return default.clone();
        }
        if let Some(first) = schema.enum_values.as_ref().and_then(|e| e.first()) {
            return first.clone();
        }

        match &schema.kind {
            SchemaKind::Leaf => self.generate_leaf(schema, hint),
            SchemaKind::AllOf(branches) => {
                let mut merged = match self.generate_leaf(schema, hint) {
                    Value::Null => None,
                    own => Some(own),
                };
                for branch in branches {
                    if self.is_active(*branch) {
                        continue;
                    }
                    let value = self.generate(*branch, hint);
                    merged = Some(match (merged, value) {
                        (Some(Value::Object(mut base)), Value::Object(extra)) => {
                            base.extend(extra);
                            Value::Object(base)
                        }
                        (Some(base), Value::Null) => base,
                        (_, value) => value,
                    });
                }
                merged.unwrap_or(Value::Null)
            }
            SchemaKind::OneOf(branches) => match self.validator {
                Some(validator) if schema.discriminator.is_none() => {
                    self.generate_exclusive(validator, schema, branches, hint)
                }
                _ => self.generate_choice(schema, branches, hint),
            },
            SchemaKind::AnyOf(branches) => self.generate_choice(schema, branches, hint),
        }
    }

    /// First branch (skipping ones already on the descent), with the
    /// discriminator property set to the tag that maps to it.
    fn generate_choice(&mut self, schema: &Schema, branches: &[SchemaId], hint: &str) -> Value {
        let chosen = branches
            .iter()
            .copied()
            .find(|b| !self.is_active(*b))
            .or_else(|| branches.first().copied());
        let Some(branch) = chosen else {
            return self.generate_leaf(schema, hint);
        };
        let mut value = self.generate(branch, hint);
        if let (Some(d), Value::Object(map)) = (&schema.discriminator, &mut value) {
            if let Some((tag, _)) = d.mapping.iter().find(|(_, id)| **id == branch) {
                map.insert(d.property_name.clone(), Value::String(tag.clone()));
            }
        }
        value
    }

    /// First branch value that matches no other branch, tweaked to rule the
    /// others out when needed. Falls back to [`Self::generate_choice`].
    fn generate_exclusive(
        &mut self,
        validator: &SchemaValidator,
        schema: &Schema,
        branches: &[SchemaId],
        hint: &str,
    ) -> Value {
        let ctx = ValidationContext::response_body();
        let matching = |value: &Value| {
            branches
                .iter()
                .filter(|b| validator.is_valid(value, **b, &ctx))
                .count()
        };
        for &branch in branches {
            if self.is_active(branch) {
                continue;
            }
            let value = self.generate(branch, hint);
            if matching(&value) == 1 {
                return value;
            }
            let others: Vec<SchemaId> = branches
                .iter()
                .copied()
                .filter(|b| *b != branch && validator.is_valid(&value, *b, &ctx))
                .collect();
            if let Some(tweaked) = self.exclude_branches(&value, branch, &others) {
                if matching(&tweaked) == 1 {
                    return tweaked;
                }
            }
        }
        self.generate_choice(schema, branches, hint)
    }

    /// Variant of `value` (generated for `branch`) that `others` should reject:
    /// whole numbers get a fraction, objects get `null` for properties only
    /// the other branches declare.
    fn exclude_branches(&self, value: &Value, branch: SchemaId, others: &[SchemaId]) -> Option<Value> {
        match value {
            Value::Number(n) => {
                let x = n.as_f64().filter(|x| x.fract() == 0.0)?;
                Number::from_f64(x + 0.5).map(Value::Number)
            }
            Value::Object(map) => {
                let own = &self.schemas.get(branch).properties;
                let mut map = map.clone();
                for other in others {
                    for name in self.schemas.get(*other).properties.keys() {
                        if !own.contains_key(name) && !map.contains_key(name) {
                            map.insert(name.clone(), Value::Null);
                        }
                    }
                }
                Some(Value::Object(map))
            }
            _ => None,
        }
    }

    fn generate_leaf(&mut self, schema: &Schema, hint: &str) -> Value {
        match schema.primary_type() {
            Some(SchemaType::String) => Value::String(string_value(schema, hint)),
            Some(SchemaType::Integer) => integer_value(schema),
            Some(SchemaType::Number) => number_value(schema),
            Some(SchemaType::Boolean) => Value::Bool(true),
            Some(SchemaType::Array) => self.array_value(schema, hint),
            Some(SchemaType::Object) => self.object_value(schema),
            Some(SchemaType::Null) | None => Value::Null,
        }
    }

    fn array_value(&mut self, schema: &Schema, hint: &str) -> Value {
        let Some(items) = schema.items else {
            return Value::Array(Vec::new());
        };
        let count = match schema.min_items {
            Some(0) => 0,
            Some(n) => n.max(1),
            None => 1,
        };
        if count == 0 || self.is_active(items) {
            return Value::Array(Vec::new());
        }
        let first = self.generate(items, hint);
        let values = (0..count)
            .map(|i| {
                if schema.unique_items {
                    vary(&first, i)
                } else {
                    first.clone()
                }
            })
            .collect();
        Value::Array(values)
    }

    fn object_value(&mut self, schema: &Schema) -> Value {
        let mut map = Map::new();
        for (name, prop) in &schema.properties {
            if self.is_active(*prop) {
                // recursion: drop optional back-references, null out required ones
                if schema.is_required(name) {
                    map.insert(name.clone(), Value::Null);
                }
                continue;
            }
            let value = self.generate(*prop, name);
            map.insert(name.clone(), value);
        }
        if let AdditionalProperties::Schema(extra) = schema.additional_properties {
            if map.is_empty() && !self.is_active(extra) {
                let value = self.generate(extra, ADDITIONAL_PROPERTY_KEY);
                map.insert(ADDITIONAL_PROPERTY_KEY.to_string(), value);
            }
        }
        Value::Object(map)
    }
}

fn string_value(schema: &Schema, hint: &str) -> String {
    let placeholder = match schema.format.as_deref() {
        Some("date-time") => "2024-01-01T00:00:00Z".to_string(),
        Some("date") => "2024-01-01".to_string(),
        Some("time") => "12:00:00Z".to_string(),
        Some("email") => "user@example.com".to_string(),
        Some("uuid") => "3fa85f64-5717-4562-b3fc-2c963f66afa6".to_string(),
        Some("uri") | Some("url") => "https://example.com/".to_string(),
        Some("hostname") => "example.com".to_string(),
        Some("ipv4") => "192.0.2.1".to_string(),
        Some("ipv6") => "2001:db8::1".to_string(),
        Some("byte") => "ZXhhbXBsZQ==".to_string(),
        Some("password") => "password".to_string(),
        _ if hint.is_empty() => "example".to_string(),
        _ => format!("{hint} example"),
    };
    fit_length(placeholder, schema.min_length, schema.max_length)
}

fn fit_length(mut s: String, min: Option<usize>, max: Option<usize>) -> String {
    if let Some(max) = max {
        if s.chars().count() > max {
            s = s.chars().take(max).collect();
        }
    }
    if let Some(min) = min {
        let len = s.chars().count();
        if len < min {
            s.push_str(&"x".repeat(min - len));
        }
    }
    s
}

/// Smallest integer within the bounds, rounded up to `multipleOf`. Arithmetic
/// saturates; bounds no `i64` satisfies give the nearest one.
fn integer_value(schema: &Schema) -> Value {
    let mut n = match schema.minimum {
        Some(min) if schema.exclusive_minimum => (min.floor() as i64).saturating_add(1),
        Some(min) => min.ceil() as i64,
        None => 0,
    };
    if let Some(step) = schema.multiple_of.filter(|m| *m >= 1.0 && m.fract() == 0.0) {
        let step = step as i64;
        if let Some(base) = n.div_euclid(step).checked_mul(step) {
            n = if base == n {
                base
            } else {
                base.checked_add(step).unwrap_or(base)
            };
        }
    }
    if let Some(max) = schema.maximum {
        let ceiling = if schema.exclusive_maximum {
            (max.ceil() as i64).saturating_sub(1)
        } else {
            max.floor() as i64
        };
        n = n.min(ceiling);
    }
    Value::from(n)
}

fn number_value(schema: &Schema) -> Value {
    let step = schema.multiple_of.filter(|m| *m > 0.0);
    let snap_up = |x: f64| step.map_or(x, |s| (x / s).ceil() * s);
    let x = match schema.minimum {
        Some(min) if schema.exclusive_minimum => snap_up(min + step.unwrap_or(1.0)),
        Some(min) => snap_up(min),
        None => snap_up(0.0),
    };
    let x = if in_bounds(schema, x) {
        x
    } else {
        match (schema.minimum, schema.maximum) {
            (Some(min), Some(max)) => {
                let mid = (min + max) / 2.0;
                step.map_or(mid, |s| {
                    [(mid / s).round() * s, (mid / s).ceil() * s, (mid / s).floor() * s]
                        .into_iter()
                        .find(|x| in_bounds(schema, *x))
                        .unwrap_or(mid)
                })
            }
            (_, Some(max)) => match step {
                Some(s) => {
                    let below = (max / s).floor() * s;
                    if schema.exclusive_maximum && below >= max {
                        below - s
                    } else {
                        below
                    }
                }
                None if schema.exclusive_maximum => max - 1.0,
                None => max,
            },
            _ => x,
        }
    };
    if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Value::from(x as i64)
    } else {
        Number::from_f64(x).map_or(Value::Null, Value::Number)
    }
}

fn in_bounds(schema: &Schema, x: f64) -> bool {
    let above = schema.minimum.map_or(true, |min| {
        if schema.exclusive_minimum {
            x > min
        } else {
            x >= min
        }
    });
    let below = schema.maximum.map_or(true, |max| {
        if schema.exclusive_maximum {
            x < max
        } else {
            x <= max
        }
    });
    above && below
}

/// Distinct variant of `value` for position `i` of a `uniqueItems` array.
/// Objects and arrays vary their first member; booleans only have two.
fn vary(value: &Value, i: usize) -> Value {
    if i == 0 {
        return value.clone();
    }
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| {
                let d = i64::try_from(i).ok()?;
                v.checked_add(d).or_else(|| v.checked_sub(d))
            })
            .map(Value::from)
            .or_else(|| {
                n.as_f64()
                    .and_then(|v| Number::from_f64(v + i as f64))
                    .map(Value::Number)
            })
            .unwrap_or_else(|| value.clone()),
        Value::String(s) => Value::String(format!("{s}{i}")),
        Value::Bool(b) => Value::Bool(*b != (i % 2 == 1)),
        Value::Array(items) => {
            let mut items = items.clone();
            if let Some(first) = items.first_mut() {
                *first = vary(first, i);
            }
            Value::Array(items)
        }
        Value::Object(map) => {
            let mut map = map.clone();
            if let Some((_, first)) = map.iter_mut().next() {
                *first = vary(first, i);
            }
            Value::Object(map)
        }
        Value::Null => Value::Null,
    }
}
