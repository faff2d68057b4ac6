//! Field types and object schemas.
//!
//! Schemas are plain data: the validator in [`super::validate`] walks them
//! and [`ObjectSchema::to_json_schema`] renders them for tool input schemas.

use regex::Regex;
use serde_json::{Map, Value, json};

/// String constraints
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Minimum length in characters
    pub min_len: Option<usize>,
    /// Maximum length in characters
    pub max_len: Option<usize>,
    /// Pattern the whole value must match
    pub pattern: Option<Regex>,
}

/// Type of a single field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// String with optional length/pattern rules
    String(StringRules),
    /// Integer with optional bounds
    Integer {
        /// Inclusive lower bound
        min: Option<i64>,
        /// Inclusive upper bound
        max: Option<i64>,
    },
    /// Number with optional bounds
    Number {
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
    },
    /// Boolean
    Boolean,
    /// One of a fixed set of strings
    Enum(&'static [&'static str]),
    /// One of a fixed set of integers
    IntEnum(&'static [i64]),
    /// Resource identifier (string or integer)
    Identifier,
    /// IPv4/IPv6 address, optionally with a CIDR prefix
    Address,
    /// Homogeneous array
    Array {
        /// Element type
        items: Box<FieldType>,
        /// Minimum number of elements
        min_items: Option<usize>,
    },
    /// String-keyed map with homogeneous values
    Map(Box<FieldType>),
    /// Nested object
    Object(ObjectSchema),
    /// Value must match at least one alternative
    AnyOf(Vec<FieldType>),
    /// Free-form JSON
    Any,
}

/// One named field of an object schema.
#[derive(Debug, Clone)]
pub struct Field {
    /// Property name
    pub name: &'static str,
    /// Value type
    pub ty: FieldType,
    /// Must be present (and non-null) in full/create mode
    pub required: bool,
    /// Human description rendered into JSON Schema
    pub description: Option<&'static str>,
}

impl Field {
    /// Required field
    #[must_use]
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            description: None,
        }
    }

    /// Optional field
    #[must_use]
    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            description: None,
        }
    }

    /// Attach a description
    #[must_use]
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Open object schema: declared fields are checked, unknown fields pass.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    /// Declared fields in rendering order
    pub fields: Vec<Field>,
    /// Groups where at least one member must be present
    pub at_least_one_of: Vec<&'static [&'static str]>,
}

impl ObjectSchema {
    /// Schema with the given fields and no groups
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            at_least_one_of: Vec::new(),
        }
    }

    /// Object with no declared fields
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Add an "at least one of" group
    #[must_use]
    pub fn at_least_one(mut self, group: &'static [&'static str]) -> Self {
        self.at_least_one_of.push(group);
        self
    }

    /// Look up a declared field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as a JSON Schema object.
    ///
    /// In patch mode nothing is required and every property also admits
    /// `null`.
    #[must_use]
    pub fn to_json_schema(&self, patch: bool) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut schema = field.ty.to_json_schema(patch);
            if let (Some(desc), Value::Object(obj)) = (field.description, &mut schema) {
                obj.insert("description".into(), Value::String(desc.into()));
            }
            if patch {
                schema = nullable(schema);
            }
            properties.insert(field.name.into(), schema);
        }

        let mut out = Map::new();
        out.insert("type".into(), json!("object"));
        out.insert("properties".into(), Value::Object(properties));
        if !patch {
            let required: Vec<&str> = self
                .fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name)
                .collect();
            if !required.is_empty() {
                out.insert("required".into(), json!(required));
            }
            if !self.at_least_one_of.is_empty() {
                let groups: Vec<Value> = self
                    .at_least_one_of
                    .iter()
                    .map(|group| {
                        let alternatives: Vec<Value> = group
                            .iter()
                            .map(|name| json!({ "required": [name] }))
                            .collect();
                        json!({ "anyOf": alternatives })
                    })
                    .collect();
                out.insert("allOf".into(), Value::Array(groups));
            }
        }
        out.insert("additionalProperties".into(), Value::Bool(true));
        Value::Object(out)
    }
}

/// Wrap a schema so it also accepts `null`
pub(crate) fn nullable(schema: Value) -> Value {
    json!({ "anyOf": [schema, { "type": "null" }] })
}

impl FieldType {
    /// Unconstrained string
    #[must_use]
    pub fn string() -> Self {
        Self::String(StringRules::default())
    }

    /// String with length bounds
    #[must_use]
    pub fn string_len(min: usize, max: usize) -> Self {
        Self::String(StringRules {
            min_len: Some(min),
            max_len: Some(max),
            pattern: None,
        })
    }

    /// Non-empty string
    #[must_use]
    pub fn non_empty() -> Self {
        Self::String(StringRules {
            min_len: Some(1),
            ..StringRules::default()
        })
    }

    /// String matching `pattern`, with length bounds.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Patterns are literals in
    /// [`super::resources`], covered by the registry tests.
    #[must_use]
    pub fn pattern(pattern: &str, min: usize, max: usize) -> Self {
        Self::String(StringRules {
            min_len: Some(min),
            max_len: Some(max),
            pattern: Some(Regex::new(pattern).expect("schema pattern literal")),
        })
    }

    /// Integer in `min..=max`
    #[must_use]
    pub fn int_range(min: i64, max: i64) -> Self {
        Self::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Integer `>= min`
    #[must_use]
    pub fn int_min(min: i64) -> Self {
        Self::Integer {
            min: Some(min),
            max: None,
        }
    }

    /// Any integer
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            min: None,
            max: None,
        }
    }

    /// Number `>= min`
    #[must_use]
    pub fn number_min(min: f64) -> Self {
        Self::Number {
            min: Some(min),
            max: None,
        }
    }

    /// Array of `items`
    #[must_use]
    pub fn array(items: Self) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
        }
    }

    /// Array of `items` with at least one element
    #[must_use]
    pub fn non_empty_array(items: Self) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: Some(1),
        }
    }

    /// Map of `values`
    #[must_use]
    pub fn map(values: Self) -> Self {
        Self::Map(Box::new(values))
    }

    /// Nested object
    #[must_use]
    pub fn object(fields: Vec<Field>) -> Self {
        Self::Object(ObjectSchema::new(fields))
    }

    /// Short human description used in violation messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::String(_) => "string".into(),
            Self::Integer { .. } => "integer".into(),
            Self::Number { .. } => "number".into(),
            Self::Boolean => "boolean".into(),
            Self::Enum(options) => format!("one of [{}]", options.join(", ")),
            Self::IntEnum(options) => {
                let options: Vec<String> = options.iter().map(ToString::to_string).collect();
                format!("one of [{}]", options.join(", "))
            }
            Self::Identifier => "identifier (1-64 chars of [a-zA-Z0-9-_.] or integer)".into(),
            Self::Address => "IP address or CIDR".into(),
            Self::Array { items, .. } => format!("array of {}", items.describe()),
            Self::Map(values) => format!("object of {}", values.describe()),
            Self::Object(_) => "object".into(),
            Self::AnyOf(alternatives) => {
                let alternatives: Vec<String> =
                    alternatives.iter().map(FieldType::describe).collect();
                alternatives.join(" or ")
            }
            Self::Any => "any JSON value".into(),
        }
    }

    /// Render as JSON Schema. `patch` propagates into nested objects and
    /// map values; array items are replaced wholesale and keep full shape.
    #[must_use]
    pub fn to_json_schema(&self, patch: bool) -> Value {
        match self {
            Self::String(rules) => {
                let mut out = Map::new();
                out.insert("type".into(), json!("string"));
                if let Some(min) = rules.min_len {
                    out.insert("minLength".into(), json!(min));
                }
                if let Some(max) = rules.max_len {
                    out.insert("maxLength".into(), json!(max));
                }
                if let Some(pattern) = &rules.pattern {
                    out.insert("pattern".into(), json!(pattern.as_str()));
                }
                Value::Object(out)
            }
            Self::Integer { min, max } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("integer"));
                if let Some(min) = min {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    out.insert("maximum".into(), json!(max));
                }
                Value::Object(out)
            }
            Self::Number { min, max } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("number"));
                if let Some(min) = min {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    out.insert("maximum".into(), json!(max));
                }
                Value::Object(out)
            }
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Enum(options) => json!({ "type": "string", "enum": options }),
            Self::IntEnum(options) => json!({ "type": "integer", "enum": options }),
            Self::Identifier => identifier_schema(),
            Self::Address => json!({
                "type": "string",
                "description": "IPv4/IPv6 address, optionally with a /prefix"
            }),
            Self::Array { items, min_items } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), items.to_json_schema(false));
                if let Some(min) = min_items {
                    out.insert("minItems".into(), json!(min));
                }
                Value::Object(out)
            }
            Self::Map(values) => {
                let values = if patch {
                    nullable(values.to_json_schema(true))
                } else {
                    values.to_json_schema(false)
                };
                json!({ "type": "object", "additionalProperties": values })
            }
            Self::Object(schema) => schema.to_json_schema(patch),
            Self::AnyOf(alternatives) => {
                let alternatives: Vec<Value> = alternatives
                    .iter()
                    .map(|alt| alt.to_json_schema(patch))
                    .collect();
                json!({ "anyOf": alternatives })
            }
            Self::Any => json!({}),
        }
    }
}

/// JSON Schema of a resource identifier
pub(crate) fn identifier_schema() -> Value {
    json!({
        "anyOf": [
            { "type": "string", "minLength": 1, "maxLength": 64, "pattern": "^[a-zA-Z0-9-_.]+$" },
            { "type": "integer", "minimum": 1 }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjectSchema {
        ObjectSchema::new(vec![
            Field::required("name", FieldType::string_len(1, 10)).describe("display name"),
            Field::optional("port", FieldType::int_range(1, 65535)),
            Field::optional(
                "nested",
                FieldType::object(vec![Field::required("a", FieldType::Boolean)]),
            ),
        ])
        .at_least_one(&["name", "port"])
    }

    #[test]
    fn create_schema_lists_required_and_groups() {
        let schema = sample().to_json_schema(false);
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["name"]["description"], "display name");
        assert_eq!(schema["properties"]["port"]["maximum"], 65535);
        assert_eq!(
            schema["allOf"][0]["anyOf"],
            json!([{ "required": ["name"] }, { "required": ["port"] }])
        );
        assert_eq!(schema["additionalProperties"], true);
    }

    #[test]
    fn patch_schema_is_nullable_and_has_no_required() {
        let schema = sample().to_json_schema(true);
        assert!(schema.get("required").is_none());
        assert!(schema.get("allOf").is_none());
        let port = &schema["properties"]["port"]["anyOf"];
        assert_eq!(port[1], json!({ "type": "null" }));
        // nested objects are rendered in patch mode too
        let nested = &schema["properties"]["nested"]["anyOf"][0];
        assert!(nested.get("required").is_none());
    }

    #[test]
    fn describe_is_readable() {
        assert_eq!(FieldType::Enum(&["a", "b"]).describe(), "one of [a, b]");
        assert_eq!(
            FieldType::array(FieldType::Address).describe(),
            "array of IP address or CIDR"
        );
    }
}
