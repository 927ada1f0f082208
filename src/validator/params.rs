//! Parameter coercion.
//!
//! Path, query, header and cookie values arrive as text. They are turned into
//! typed JSON according to the parameter's `style`/`explode` and schema type
//! before schema validation. Text that cannot be coerced stays a string so the
//! type check reports it.

use crate::spec::{
    is_json_media_type, ParameterLocation, ParameterSpec, ParameterStyle, SchemaId, SchemaTable,
    SchemaType,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// How deep composition branches are searched for a usable type.
const MAX_TYPE_LOOKUP_DEPTH: usize = 8;

/// Coerce the raw values found for `param` into JSON.
///
/// `raw` holds every value found under the parameter name (repeated query
/// keys, repeated headers); scalars use the last one.
#[must_use]
pub fn coerce_parameter(param: &ParameterSpec, raw: &[&str], schemas: &SchemaTable) -> Value {
    let Some(last) = raw.last().copied() else {
        return Value::Null;
    };
    if let Some(content_type) = &param.content_type {
        if is_json_media_type(content_type) {
            return serde_json::from_str(last).unwrap_or_else(|_| Value::String(last.to_string()));
        }
        return Value::String(last.to_string());
    }
    let Some(schema) = param.schema else {
        return Value::String(last.to_string());
    };

    match effective_type(schemas, schema, 0) {
        Some(SchemaType::Array) => {
            let items = item_schema(schemas, schema, 0);
            let parts = if raw.len() > 1 {
                raw.iter().map(|v| strip_prefix(param, v).to_string()).collect()
            } else {
                split_array(param, last)
            };
            Value::Array(
                parts
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| coerce_scalar(p, items.and_then(|i| effective_type(schemas, i, 0))))
                    .collect(),
            )
        }
        Some(SchemaType::Object) => coerce_object(param, last, schema, schemas),
        ty => coerce_scalar(strip_prefix(param, last), ty),
    }
}

/// Build an object parameter spread over several query keys: `deepObject`
/// (`filter[status]=sold`) or exploded `form` (`status=sold&limit=3`).
///
/// Returns `None` when none of the keys are present.
#[must_use]
pub fn query_object(
    param: &ParameterSpec,
    pairs: &[(String, String)],
    schemas: &SchemaTable,
) -> Option<Value> {
    if param.location != ParameterLocation::Query {
        return None;
    }
    let schema = param.schema?;
    if effective_type(schemas, schema, 0) != Some(SchemaType::Object) {
        return None;
    }
    let mut map = Map::new();
    match param.style {
        ParameterStyle::DeepObject => {
            let prefix = format!("{}[", param.name);
            for (key, value) in pairs {
                let Some(prop) = key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.split(']').next())
                else {
                    continue;
                };
                let ty = property_schema(schemas, schema, prop, 0)
                    .and_then(|p| effective_type(schemas, p, 0));
                map.insert(prop.to_string(), coerce_scalar(value, ty));
            }
        }
        ParameterStyle::Form if param.explode => {
            for (key, value) in pairs {
                if let Some(prop) = property_schema(schemas, schema, key, 0) {
                    map.insert(key.clone(), coerce_scalar(value, effective_type(schemas, prop, 0)));
                }
            }
        }
        _ => return None,
    }
    (!map.is_empty()).then_some(Value::Object(map))
}

/// Decode an `application/x-www-form-urlencoded` body into an object typed
/// by the properties of `schema`. Repeated keys and comma lists feed arrays.
#[must_use]
pub fn coerce_form(body: &str, schema: SchemaId, schemas: &SchemaTable) -> Value {
    let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        fields.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(name, values)| {
            let prop = property_schema(schemas, schema, &name, 0);
            let last = values.last().map_or("", String::as_str);
            let value = match prop.and_then(|p| effective_type(schemas, p, 0)) {
                Some(SchemaType::Array) => {
                    let item_type = prop
                        .and_then(|p| item_schema(schemas, p, 0))
                        .and_then(|i| effective_type(schemas, i, 0));
                    let parts: Vec<&str> = if values.len() > 1 {
                        values.iter().map(String::as_str).collect()
                    } else {
                        last.split(',').collect()
                    };
                    Value::Array(
                        parts
                            .into_iter()
                            .filter(|p| !p.is_empty())
                            .map(|p| coerce_scalar(p, item_type))
                            .collect(),
                    )
                }
                ty => coerce_scalar(last, ty),
            };
            (name, value)
        })
        .collect();
    Value::Object(map)
}

/// Text to typed scalar; anything unparsable stays a string.
#[must_use]
pub fn coerce_scalar(raw: &str, ty: Option<SchemaType>) -> Value {
    match ty {
        Some(SchemaType::Integer) => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(SchemaType::Number) => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(SchemaType::Boolean) => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        Some(SchemaType::Null) if raw.is_empty() || raw == "null" => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

/// Drop the `label` (`.`) or `matrix` (`;name=`) prefix of a path value.
fn strip_prefix<'v>(param: &ParameterSpec, value: &'v str) -> &'v str {
    match param.style {
        ParameterStyle::Label => value.strip_prefix('.').unwrap_or(value),
        ParameterStyle::Matrix => {
            let v = value.strip_prefix(';').unwrap_or(value);
            v.strip_prefix(param.name.as_str())
                .and_then(|r| r.strip_prefix('='))
                .unwrap_or(v)
        }
        _ => value,
    }
}

fn split_array(param: &ParameterSpec, value: &str) -> Vec<String> {
    match param.style {
        ParameterStyle::SpaceDelimited => value.split(' ').map(String::from).collect(),
        ParameterStyle::PipeDelimited => value.split('|').map(String::from).collect(),
        ParameterStyle::Label => {
            let v = value.strip_prefix('.').unwrap_or(value);
            let sep = if param.explode { '.' } else { ',' };
            v.split(sep).map(String::from).collect()
        }
        ParameterStyle::Matrix if param.explode => {
            // ;id=3;id=4;id=5
            let key = format!("{}=", param.name);
            value
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.strip_prefix(key.as_str()).unwrap_or(s).to_string())
                .collect()
        }
        _ => strip_prefix(param, value).split(',').map(String::from).collect(),
    }
}

fn coerce_object(param: &ParameterSpec, raw: &str, schema: SchemaId, schemas: &SchemaTable) -> Value {
    let body = strip_prefix(param, raw).trim();
    if body.starts_with('{') {
        return serde_json::from_str(body).unwrap_or_else(|_| Value::String(raw.to_string()));
    }

    let pairs: Vec<(String, String)> = match (param.style, param.explode) {
        // .role=admin.name=Alex
        (ParameterStyle::Label, true) => key_value_pairs(body.split('.')),
        // ;role=admin;name=Alex
        (ParameterStyle::Matrix, true) => key_value_pairs(raw.split(';').filter(|s| !s.is_empty())),
        // role=admin,name=Alex
        (ParameterStyle::Simple, true) => key_value_pairs(body.split(',')),
        // role,admin,name,Alex
        _ => {
            let parts: Vec<&str> = body.split(',').collect();
            if parts.len() % 2 != 0 {
                return Value::String(raw.to_string());
            }
            parts
                .chunks(2)
                .map(|kv| (kv[0].to_string(), kv[1].to_string()))
                .collect()
        }
    };
    if pairs.is_empty() {
        return Value::String(raw.to_string());
    }
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| {
            let ty = property_schema(schemas, schema, &k, 0).and_then(|p| effective_type(schemas, p, 0));
            let value = coerce_scalar(&v, ty);
            (k, value)
        })
        .collect();
    Value::Object(map)
}

fn key_value_pairs<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    parts
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (p.to_string(), String::new()),
        })
        .collect()
}

/// Declared type, looking through composition branches when the node has none.
pub(crate) fn effective_type(schemas: &SchemaTable, id: SchemaId, depth: usize) -> Option<SchemaType> {
    let schema = schemas.get(id);
    schema.primary_type().or_else(|| {
        if depth >= MAX_TYPE_LOOKUP_DEPTH {
            return None;
        }
        schema
            .branches()
            .iter()
            .find_map(|b| effective_type(schemas, *b, depth + 1))
    })
}

fn item_schema(schemas: &SchemaTable, id: SchemaId, depth: usize) -> Option<SchemaId> {
    let schema = schemas.get(id);
    schema.items.or_else(|| {
        if depth >= MAX_TYPE_LOOKUP_DEPTH {
            return None;
        }
        schema
            .branches()
            .iter()
            .find_map(|b| item_schema(schemas, *b, depth + 1))
    })
}

fn property_schema(schemas: &SchemaTable, id: SchemaId, name: &str, depth: usize) -> Option<SchemaId> {
    let schema = schemas.get(id);
    schema.properties.get(name).copied().or_else(|| {
        if depth >= MAX_TYPE_LOOKUP_DEPTH {
            return None;
        }
        schema
            .branches()
            .iter()
            .find_map(|b| property_schema(schemas, *b, name, depth + 1))
    })
}
