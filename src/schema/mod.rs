//! Resource schema registry.
//!
//! Every manageable resource kind has a *full* shape (as stored remotely),
//! a *create* shape (full plus an optional caller-supplied `id`) and a
//! *patch* shape (every field optional and nullable). The registry is
//! static, read-only data built on first use.
//!
//! ```
//! use apisix_mcp::schema::{ResourceKind, SchemaRegistry};
//! use serde_json::json;
//!
//! let input = json!({ "id": "r1", "uri": "/hello", "upstream_id": "u1" });
//! let validated = SchemaRegistry::global()
//!     .validate_create(ResourceKind::Route, &input)
//!     .unwrap();
//! assert_eq!(validated.id.as_deref(), Some("r1"));
//! assert!(!validated.body.contains_key("id"));
//! ```

mod address;
mod error;
mod field;
mod kind;
mod patch;
mod resources;
mod secret;
mod validate;

use std::sync::LazyLock;

use serde_json::{Map, Value, json};

pub use address::is_ip_or_cidr;
pub use error::{ValidationError, Violation};
pub use field::{Field, FieldType, ObjectSchema, StringRules};
pub use kind::{IdPolicy, ResourceKind};
pub use patch::{Patch, PatchDocument};
pub use secret::{
    AwsSecret, GcpAuth, GcpAuthConfig, GcpSecret, SecretConfig, SecretManager, VaultSecret,
};
pub use validate::{Mode, is_identifier};

pub(crate) use validate::is_identifier_str;

/// Structural definition of one kind
#[derive(Debug, Clone)]
pub enum Shape {
    /// Single object schema
    Object(ObjectSchema),
    /// Variant selected by a discriminator field
    Polymorphic {
        /// Discriminator field name
        tag: &'static str,
        /// Variant schemas (discriminator excluded)
        variants: Vec<(SecretManager, ObjectSchema)>,
    },
}

/// A body that passed full-shape validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResource {
    /// Resource kind
    pub kind: ResourceKind,
    /// Selected variant for polymorphic kinds
    pub variant: Option<SecretManager>,
    /// Body as supplied (unknown fields preserved)
    pub body: Map<String, Value>,
}

/// Create-or-update input split into identifier, path scope and body
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    /// Resource kind
    pub kind: ResourceKind,
    /// Identifier, if one was supplied (always set for natural keys)
    pub id: Option<String>,
    /// Path scope (secret manager, credential owner)
    pub scope: Option<String>,
    /// Request body with `id` and scope removed
    pub body: Map<String, Value>,
}

/// Partial update with null/absent preserved per field
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPatch {
    /// Resource kind
    pub kind: ResourceKind,
    /// Path scope (secret manager)
    pub scope: Option<String>,
    /// Field states
    pub fields: PatchDocument,
}

/// Per-kind schemas
#[derive(Debug)]
pub struct SchemaRegistry {
    shapes: Vec<Shape>,
}

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::new);

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Build every schema
    #[must_use]
    pub fn new() -> Self {
        Self {
            shapes: ResourceKind::ALL.into_iter().map(resources::shape).collect(),
        }
    }

    /// Process-wide registry
    #[must_use]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Shape of `kind`
    #[must_use]
    pub fn shape(&self, kind: ResourceKind) -> &Shape {
        &self.shapes[kind.index()]
    }

    /// Validate a complete resource body.
    ///
    /// Polymorphic kinds carry their discriminator in the body.
    pub fn validate_full(
        &self,
        kind: ResourceKind,
        input: &Value,
    ) -> Result<ValidatedResource, ValidationError> {
        let body = as_object(kind, input)?;
        let variant = self.check(kind, body, None, Mode::Full)?;
        Ok(ValidatedResource {
            kind,
            variant,
            body: body.clone(),
        })
    }

    /// Validate create-or-update input and split out identifier and scope.
    pub fn validate_create(
        &self,
        kind: ResourceKind,
        input: &Value,
    ) -> Result<ValidatedInput, ValidationError> {
        let mut body = as_object(kind, input)?.clone();
        let scope = take_scope(kind, &mut body)?;

        let id = match kind.id_policy() {
            IdPolicy::Optional => take_id(kind, &mut body)?,
            IdPolicy::Required => Some(
                take_id(kind, &mut body)?
                    .ok_or(ValidationError::MissingIdentifier { kind, field: "id" })?,
            ),
            IdPolicy::NaturalKey(field) => {
                if body.contains_key("id") {
                    return Err(schema_error(
                        kind,
                        "id",
                        format!("not used for {kind}; '{field}' identifies it"),
                    ));
                }
                match body.get(field) {
                    Some(Value::String(key)) => Some(key.clone()),
                    None | Some(Value::Null) => {
                        return Err(ValidationError::MissingIdentifier { kind, field });
                    }
                    // wrong type: reported by the shape check below
                    Some(_) => None,
                }
            }
        };

        self.check(kind, &body, scope.as_deref(), Mode::Full)?;
        Ok(ValidatedInput {
            kind,
            id,
            scope,
            body,
        })
    }

    /// Validate a partial update.
    ///
    /// Every declared field is reported as absent, null or present; unknown
    /// fields are carried along in input order.
    pub fn validate_patch(
        &self,
        kind: ResourceKind,
        input: &Value,
    ) -> Result<ValidatedPatch, ValidationError> {
        if !kind.supports_patch() {
            return Err(ValidationError::PatchUnsupported { kind });
        }
        let mut body = as_object(kind, input)?.clone();
        let scope = take_scope(kind, &mut body)?;

        let variant = self.check(kind, &body, scope.as_deref(), Mode::Patch)?;
        let schema = self.object_schema(kind, variant);

        let mut fields = PatchDocument::new();
        if let Some(schema) = schema {
            for field in &schema.fields {
                fields.push(field.name, Patch::from_json(body.get(field.name)));
            }
        }
        for (name, value) in &body {
            let declared = schema.is_some_and(|s| s.field(name).is_some());
            if !declared {
                fields.push(name.clone(), Patch::from_json(Some(value)));
            }
        }

        Ok(ValidatedPatch {
            kind,
            scope,
            fields,
        })
    }

    /// JSON Schema of the create shape, including `id` and scope fields
    #[must_use]
    pub fn create_json_schema(&self, kind: ResourceKind) -> Value {
        let mut schema = match self.shape(kind) {
            Shape::Object(object) => object.to_json_schema(false),
            Shape::Polymorphic { tag, variants } => polymorphic_json_schema(tag, variants, false),
        };
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();
        match kind.id_policy() {
            IdPolicy::Optional => {
                properties.insert("id".into(), field::identifier_schema());
            }
            IdPolicy::Required => {
                let mut id = field::identifier_schema();
                id["description"] = json!("Plugin name");
                properties.insert("id".into(), id);
                required.push(json!("id"));
            }
            IdPolicy::NaturalKey(_) => {}
        }
        if kind == ResourceKind::Credential {
            properties.insert(
                "username".into(),
                json!({ "type": "string", "description": "Owning consumer" }),
            );
            required.push(json!("username"));
        }
        if let Some(root) = schema.as_object_mut() {
            prepend_properties(root, properties, required);
        }
        schema
    }

    /// JSON Schema of the patch shape, including the required `id`
    pub fn patch_json_schema(&self, kind: ResourceKind) -> Result<Value, ValidationError> {
        if !kind.supports_patch() {
            return Err(ValidationError::PatchUnsupported { kind });
        }
        let mut schema = match self.shape(kind) {
            Shape::Object(object) => object.to_json_schema(true),
            Shape::Polymorphic { tag, variants } => polymorphic_json_schema(tag, variants, true),
        };
        if let Some(root) = schema.as_object_mut() {
            let mut properties = Map::new();
            properties.insert("id".into(), field::identifier_schema());
            prepend_properties(root, properties, vec![json!("id")]);
        }
        Ok(schema)
    }

    /// Object schema of `kind`, or of the selected variant
    fn object_schema(
        &self,
        kind: ResourceKind,
        variant: Option<SecretManager>,
    ) -> Option<&ObjectSchema> {
        match self.shape(kind) {
            Shape::Object(object) => Some(object),
            Shape::Polymorphic { variants, .. } => variants
                .iter()
                .find(|(m, _)| Some(*m) == variant)
                .map(|(_, s)| s),
        }
    }

    /// Run the structural check, resolving the variant first.
    ///
    /// `tag` overrides the discriminator (used when it arrived as a scope).
    fn check(
        &self,
        kind: ResourceKind,
        body: &Map<String, Value>,
        tag: Option<&str>,
        mode: Mode,
    ) -> Result<Option<SecretManager>, ValidationError> {
        let (variant, schema) = match self.shape(kind) {
            Shape::Object(object) => (None, object),
            Shape::Polymorphic { tag: field, variants } => {
                let supplied = tag.map(|t| Value::String(t.to_string()));
                let manager = SecretManager::from_value(supplied.as_ref().or(body.get(*field)))?;
                let Some((_, schema)) = variants.iter().find(|(m, _)| *m == manager) else {
                    return Err(ValidationError::UnknownDiscriminator {
                        kind,
                        field: *field,
                        value: manager.to_string(),
                        expected: SecretManager::NAMES,
                    });
                };
                (Some(manager), schema)
            }
        };

        let mut violations = Vec::new();
        validate::check_object(schema, body, "", mode, &mut violations);
        if violations.is_empty() {
            Ok(variant)
        } else {
            Err(ValidationError::Schema { kind, violations })
        }
    }
}

fn as_object(kind: ResourceKind, input: &Value) -> Result<&Map<String, Value>, ValidationError> {
    input
        .as_object()
        .ok_or_else(|| schema_error(kind, "", "expected a JSON object"))
}

fn schema_error(kind: ResourceKind, path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::Schema {
        kind,
        violations: vec![Violation::new(path, message)],
    }
}

/// Remove and check the caller-supplied `id`
fn take_id(
    kind: ResourceKind,
    body: &mut Map<String, Value>,
) -> Result<Option<String>, ValidationError> {
    match body.shift_remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(value) if is_identifier(&value) => Ok(Some(match value {
            Value::String(s) => s,
            other => other.to_string(),
        })),
        Some(_) => Err(schema_error(
            kind,
            "id",
            "expected identifier (1-64 chars of [a-zA-Z0-9-_.] or a positive integer)",
        )),
    }
}

/// Remove the path scope field, if `kind` has one
fn take_scope(
    kind: ResourceKind,
    body: &mut Map<String, Value>,
) -> Result<Option<String>, ValidationError> {
    let Some(field) = kind.scope_field() else {
        return Ok(None);
    };
    let value = body.shift_remove(field);
    if kind == ResourceKind::Secret {
        let manager = SecretManager::from_value(value.as_ref())?;
        return Ok(Some(manager.as_str().to_string()));
    }
    match value {
        Some(Value::String(scope)) if is_identifier_str(&scope) => Ok(Some(scope)),
        None | Some(Value::Null) => Err(ValidationError::MissingIdentifier { kind, field }),
        Some(_) => Err(schema_error(kind, field, "expected a path-safe identifier")),
    }
}

fn polymorphic_json_schema(
    tag: &str,
    variants: &[(SecretManager, ObjectSchema)],
    patch: bool,
) -> Value {
    let names: Vec<&str> = variants.iter().map(|(m, _)| m.as_str()).collect();
    let alternatives: Vec<Value> = variants
        .iter()
        .map(|(manager, schema)| {
            let mut variant = schema.to_json_schema(patch);
            variant["properties"][tag] = json!({ "const": manager.as_str() });
            variant
        })
        .collect();
    let mut properties = Map::new();
    properties.insert(
        tag.to_string(),
        json!({ "type": "string", "enum": names, "description": "Secret manager" }),
    );
    json!({
        "type": "object",
        "properties": properties,
        "required": [tag],
        "oneOf": alternatives,
        "additionalProperties": true
    })
}

/// Put `properties` first and merge `required` into `root`
fn prepend_properties(
    root: &mut Map<String, Value>,
    properties: Map<String, Value>,
    required: Vec<Value>,
) {
    let mut merged = properties;
    if let Some(Value::Object(existing)) = root.remove("properties") {
        for (name, schema) in existing {
            merged.entry(name).or_insert(schema);
        }
    }
    root.insert("properties".into(), Value::Object(merged));

    if !required.is_empty() {
        let mut all = required;
        if let Some(Value::Array(existing)) = root.remove("required") {
            for value in existing {
                if !all.contains(&value) {
                    all.push(value);
                }
            }
        }
        root.insert("required".into(), Value::Array(all));
    }
}
