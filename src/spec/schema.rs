//! Schema arena.
//!
//! Every schema node of a definition lives in one [`SchemaTable`] and is
//! addressed by a [`SchemaId`]. `$ref` edges are resolved to ids at load time,
//! so recursive structures (a `Node` whose `children` are `Node`s) are plain
//! back-references instead of infinite trees.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Index of a schema node inside a [`SchemaTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    /// Whether a JSON value is an instance of this type.
    ///
    /// Integers are numbers without a fractional part, so `3.0` is an integer.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::Null => value.is_null(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Null => "null",
        };
        f.write_str(s)
    }
}

/// Composition tag of a schema node.
///
/// Leaf keywords (`type`, `properties`, ...) may sit next to a composition;
/// both apply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchemaKind {
    #[default]
    Leaf,
    AllOf(Vec<SchemaId>),
    OneOf(Vec<SchemaId>),
    AnyOf(Vec<SchemaId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdditionalProperties {
    #[default]
    Allowed,
    Denied,
    Schema(SchemaId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub property_name: String,
    /// Discriminator value to branch; explicit `mapping` entries first, then
    /// component names of the composed branches.
    pub mapping: IndexMap<String, SchemaId>,
}

/// One schema node.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Component name when the node is a named root schema
    pub name: Option<String>,
    pub kind: SchemaKind,
    /// Declared types; empty means any
    pub types: Vec<SchemaType>,
    pub properties: IndexMap<String, SchemaId>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
    pub items: Option<SchemaId>,
    pub enum_values: Option<Vec<Value>>,
    pub format: Option<String>,
    pub nullable: bool,
    pub example: Option<Value>,
    pub examples: IndexMap<String, Value>,
    pub default: Option<Value>,
    pub discriminator: Option<Discriminator>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub read_only: bool,
    pub write_only: bool,
}

impl Schema {
    /// The type used when a single type must be picked (coercion, generation).
    ///
    /// Falls back to structural hints: `properties` imply an object and
    /// `items` an array.
    #[must_use]
    pub fn primary_type(&self) -> Option<SchemaType> {
        self.types
            .iter()
            .copied()
            .find(|t| *t != SchemaType::Null)
            .or_else(|| {
                if !self.properties.is_empty() {
                    Some(SchemaType::Object)
                } else if self.items.is_some() {
                    Some(SchemaType::Array)
                } else {
                    None
                }
            })
    }

    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.nullable || self.types.contains(&SchemaType::Null)
    }

    #[must_use]
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// Branches of the composition, empty for leaves.
    #[must_use]
    pub fn branches(&self) -> &[SchemaId] {
        match &self.kind {
            SchemaKind::Leaf => &[],
            SchemaKind::AllOf(b) | SchemaKind::OneOf(b) | SchemaKind::AnyOf(b) => b,
        }
    }
}

/// Arena owning every schema node of a definition.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    nodes: Vec<Schema>,
    names: IndexMap<String, SchemaId>,
}

impl SchemaTable {
    #[must_use]
    pub fn get(&self, id: SchemaId) -> &Schema {
        &self.nodes[id.0]
    }

    /// Look up a named root schema (`components.schemas` / v2 `definitions`).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<SchemaId> {
        self.names.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.names.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reserve a slot before the node is compiled so cycles can point at it.
    pub(crate) fn reserve(&mut self) -> SchemaId {
        self.nodes.push(Schema::default());
        SchemaId(self.nodes.len() - 1)
    }

    pub(crate) fn fill(&mut self, id: SchemaId, schema: Schema) {
        self.nodes[id.0] = schema;
    }

    pub(crate) fn name(&mut self, name: &str, id: SchemaId) {
        self.names.insert(name.to_string(), id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(SchemaType::Integer.matches(&json!(3)));
        assert!(SchemaType::Integer.matches(&json!(3.0)));
        assert!(!SchemaType::Integer.matches(&json!(3.5)));
        assert!(!SchemaType::Integer.matches(&json!("3")));
    }

    #[test]
    fn test_primary_type_falls_back_to_structure() {
        let mut table = SchemaTable::default();
        let item = table.reserve();
        let schema = Schema {
            items: Some(item),
            ..Default::default()
        };
        assert_eq!(schema.primary_type(), Some(SchemaType::Array));

        let nullable_string = Schema {
            types: vec![SchemaType::Null, SchemaType::String],
            ..Default::default()
        };
        assert_eq!(nullable_string.primary_type(), Some(SchemaType::String));
        assert!(nullable_string.allows_null());
    }
}
