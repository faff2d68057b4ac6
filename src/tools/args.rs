//! Typed tool arguments

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::batch::RequestDescriptor;
use crate::dispatch::{Command, ListQuery};
use crate::schema::{ResourceKind, ValidationError};

/// Identifier given as a string or an integer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdArg {
    /// String id
    Text(String),
    /// Integer id
    Number(u64),
}

impl IdArg {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// `get_resource` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct GetResourceArgs {
    /// Resource type
    #[serde(rename = "type")]
    pub kind: String,
    /// Fetch one resource when set, list otherwise
    #[serde(default)]
    pub id: Option<IdArg>,
    /// Secret manager scope
    #[serde(default)]
    pub manager: Option<String>,
    /// Credential owner scope
    #[serde(default)]
    pub username: Option<String>,
    /// List page
    #[serde(default)]
    pub page: Option<u32>,
    /// List page size
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Name filter
    #[serde(default)]
    pub name: Option<String>,
    /// Label filter
    #[serde(default)]
    pub label: Option<String>,
    /// URI filter
    #[serde(default)]
    pub uri: Option<String>,
}

impl GetResourceArgs {
    /// `Get` with an id, `List` without
    pub fn into_command(self) -> Result<Command, ValidationError> {
        let kind = parse_kind(&self.kind)?;
        let scope = scope_for(kind, self.manager, self.username);
        Ok(match self.id {
            Some(id) => Command::Get {
                kind,
                id: id.into_string(),
                scope,
            },
            None => Command::List {
                kind,
                scope,
                query: ListQuery {
                    page: self.page,
                    page_size: self.page_size,
                    name: self.name,
                    label: self.label,
                    uri: self.uri,
                },
            },
        })
    }
}

/// `delete_resource` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResourceArgs {
    /// Resource type
    #[serde(rename = "type")]
    pub kind: String,
    /// Target id
    pub id: IdArg,
    /// Secret manager scope
    #[serde(default)]
    pub manager: Option<String>,
    /// Credential owner scope
    #[serde(default)]
    pub username: Option<String>,
    /// Delete even if still referenced
    #[serde(default)]
    pub force: bool,
}

impl DeleteResourceArgs {
    /// `Delete` command
    pub fn into_command(self) -> Result<Command, ValidationError> {
        let kind = parse_kind(&self.kind)?;
        Ok(Command::Delete {
            kind,
            id: self.id.into_string(),
            scope: scope_for(kind, self.manager, self.username),
            force: self.force,
        })
    }
}

/// `list_plugins` arguments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPluginsArgs {
    /// `http` or `stream`
    #[serde(default)]
    pub subsystem: Option<String>,
}

/// `get_plugin_schema` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct PluginSchemaArgs {
    /// Plugin name
    pub name: String,
    /// `http` or `stream`
    #[serde(default)]
    pub subsystem: Option<String>,
}

/// `send_request_to_gateway` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRequestArgs {
    /// Requests to send
    pub requests: Vec<RequestDescriptor>,
}

/// Split `patch_*` arguments into the target id and the patch body
pub fn split_patch(kind: ResourceKind, arguments: Value) -> Result<Command, ValidationError> {
    let mut map = into_object(arguments)?;
    let id = match map.shift_remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) => {
            return Err(ValidationError::MissingIdentifier { kind, field: "id" });
        }
        Some(other) => {
            return Err(ValidationError::Arguments(format!(
                "'id' must be a string or integer, got {other}"
            )));
        }
    };
    Ok(Command::Patch {
        kind,
        id,
        input: Value::Object(map),
    })
}

/// Deserialize typed arguments; `null` counts as `{}`
pub fn parse<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ValidationError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ValidationError::Arguments(e.to_string()))
}

/// Arguments as an object; `null` counts as `{}`
pub fn into_object(arguments: Value) -> Result<Map<String, Value>, ValidationError> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ValidationError::Arguments(format!(
            "arguments must be a JSON object, got {other}"
        ))),
    }
}

fn parse_kind(name: &str) -> Result<ResourceKind, ValidationError> {
    name.parse().map_err(ValidationError::Arguments)
}

/// Pick the scope argument that applies to `kind`
fn scope_for(
    kind: ResourceKind,
    manager: Option<String>,
    username: Option<String>,
) -> Option<String> {
    match kind.scope_field() {
        Some("manager") => manager,
        Some("username") => username,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_with_id_is_a_get() {
        let args: GetResourceArgs =
            parse(json!({ "type": "secret", "id": 3, "manager": "vault", "username": "x" })).unwrap();
        assert_eq!(
            args.into_command().unwrap(),
            Command::Get {
                kind: ResourceKind::Secret,
                id: "3".into(),
                scope: Some("vault".into()),
            }
        );
    }

    #[test]
    fn get_without_id_is_a_list() {
        let args: GetResourceArgs =
            parse(json!({ "type": "routes", "page": 2, "name": "web" })).unwrap();
        let Command::List { kind, query, .. } = args.into_command().unwrap() else {
            panic!("expected list");
        };
        assert_eq!(kind, ResourceKind::Route);
        assert_eq!(query.page, Some(2));
        assert_eq!(query.name.as_deref(), Some("web"));
    }

    #[test]
    fn unknown_type_is_an_argument_error() {
        let args: GetResourceArgs = parse(json!({ "type": "widget" })).unwrap();
        assert!(matches!(args.into_command(), Err(ValidationError::Arguments(_))));
    }

    #[test]
    fn delete_requires_id() {
        let err = parse::<DeleteResourceArgs>(json!({ "type": "route" })).unwrap_err();
        assert!(err.to_string().contains("id"), "{err}");
    }

    #[test]
    fn patch_split_takes_id_out() {
        let command = split_patch(
            ResourceKind::Upstream,
            json!({ "id": "u1", "retries": null }),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::Patch {
                kind: ResourceKind::Upstream,
                id: "u1".into(),
                input: json!({ "retries": null }),
            }
        );
        assert!(matches!(
            split_patch(ResourceKind::Upstream, json!({ "retries": 1 })),
            Err(ValidationError::MissingIdentifier { .. })
        ));
    }
}
