//! Pure translation of commands into HTTP requests

use reqwest::Method;
use serde_json::Value;

use crate::admin::HttpRequest;
use crate::schema::{ResourceKind, SchemaRegistry, SecretManager, ValidationError, is_identifier_str};

/// Default list page
pub const DEFAULT_PAGE: u32 = 1;
/// Default list page size
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Smallest page size the Admin API accepts
pub const MIN_PAGE_SIZE: u32 = 10;
/// Largest page size the Admin API accepts
pub const MAX_PAGE_SIZE: u32 = 500;

/// List pagination and filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page
    pub page: Option<u32>,
    /// Items per page
    pub page_size: Option<u32>,
    /// Filter on `name`
    pub name: Option<String>,
    /// Filter on a label (`key` or `key:value`)
    pub label: Option<String>,
    /// Filter on `uri`
    pub uri: Option<String>,
}

impl ListQuery {
    /// Query pairs in fixed order: page, page_size, name, label, uri
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

        let mut pairs = vec![
            ("page".to_string(), page.to_string()),
            ("page_size".to_string(), page_size.to_string()),
        ];
        let filters = [("name", &self.name), ("label", &self.label), ("uri", &self.uri)];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
        pairs
    }
}

/// A validated tool invocation against the Admin API
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create (no id) or replace (id) a resource; input is the create shape
    Upsert {
        /// Resource kind
        kind: ResourceKind,
        /// Create-shape input, including `id` and scope fields
        input: Value,
    },
    /// Partially update a resource
    Patch {
        /// Resource kind
        kind: ResourceKind,
        /// Target identifier
        id: String,
        /// Patch-shape input, including scope fields
        input: Value,
    },
    /// Delete a resource
    Delete {
        /// Resource kind
        kind: ResourceKind,
        /// Target identifier
        id: String,
        /// Path scope (secret manager, credential owner)
        scope: Option<String>,
        /// Delete even if referenced
        force: bool,
    },
    /// Fetch one resource
    Get {
        /// Resource kind
        kind: ResourceKind,
        /// Target identifier
        id: String,
        /// Path scope
        scope: Option<String>,
    },
    /// List a collection
    List {
        /// Resource kind
        kind: ResourceKind,
        /// Path scope
        scope: Option<String>,
        /// Pagination and filters
        query: ListQuery,
    },
    /// List available plugin names
    ListPlugins {
        /// `http` (default) or `stream`
        subsystem: Option<String>,
    },
    /// Fetch the JSON schema of a plugin
    PluginSchema {
        /// Plugin name
        name: String,
        /// `http` (default) or `stream`
        subsystem: Option<String>,
    },
}

impl Command {
    /// Resource kind addressed, if any
    #[must_use]
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Upsert { kind, .. }
            | Self::Patch { kind, .. }
            | Self::Delete { kind, .. }
            | Self::Get { kind, .. }
            | Self::List { kind, .. } => Some(*kind),
            Self::ListPlugins { .. } | Self::PluginSchema { .. } => None,
        }
    }

    /// Short verb for logs
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Upsert { .. } => "upsert",
            Self::Patch { .. } => "patch",
            Self::Delete { .. } => "delete",
            Self::Get { .. } => "get",
            Self::List { .. } => "list",
            Self::ListPlugins { .. } => "list_plugins",
            Self::PluginSchema { .. } => "plugin_schema",
        }
    }

    /// Translate into exactly one request. Validation happens here, before
    /// anything touches the network.
    pub fn plan(&self) -> Result<HttpRequest, ValidationError> {
        let registry = SchemaRegistry::global();
        match self {
            Self::Upsert { kind, input } => {
                let validated = registry.validate_create(*kind, input)?;
                let collection = collection_path(*kind, validated.scope.as_deref())?;
                let body = Value::Object(validated.body);
                Ok(match validated.id {
                    Some(id) => HttpRequest::new(Method::PUT, format!("{collection}/{id}")),
                    None => HttpRequest::new(Method::POST, collection),
                }
                .with_body(body))
            }
            Self::Patch { kind, id, input } => {
                let id = identifier(*kind, id)?;
                let validated = registry.validate_patch(*kind, input)?;
                let collection = collection_path(*kind, validated.scope.as_deref())?;
                Ok(HttpRequest::new(Method::PATCH, format!("{collection}/{id}"))
                    .with_body(validated.fields.to_body()))
            }
            Self::Delete {
                kind,
                id,
                scope,
                force,
            } => {
                let id = identifier(*kind, id)?;
                let collection = collection_path(*kind, scope.as_deref())?;
                let request = HttpRequest::new(Method::DELETE, format!("{collection}/{id}"));
                Ok(if *force && kind.supports_force_delete() {
                    request.with_query("force", "true")
                } else {
                    request
                })
            }
            Self::Get { kind, id, scope } => {
                let id = identifier(*kind, id)?;
                let collection = collection_path(*kind, scope.as_deref())?;
                Ok(HttpRequest::new(Method::GET, format!("{collection}/{id}")))
            }
            Self::List { kind, scope, query } => {
                let collection = list_path(*kind, scope.as_deref())?;
                let mut request = HttpRequest::new(Method::GET, collection);
                if kind.supports_filters() {
                    request.query = query.to_pairs();
                }
                Ok(request)
            }
            Self::ListPlugins { subsystem } => {
                let request = HttpRequest::new(Method::GET, "/plugins/list");
                with_subsystem(request, subsystem.as_deref())
            }
            Self::PluginSchema { name, subsystem } => {
                if !is_plugin_name(name) {
                    return Err(ValidationError::Arguments(format!(
                        "invalid plugin name '{name}'"
                    )));
                }
                let request = HttpRequest::new(Method::GET, format!("/schema/plugins/{name}"));
                with_subsystem(request, subsystem.as_deref())
            }
        }
    }
}

/// Collection path for a single-resource operation; scoped kinds need their scope
fn collection_path(kind: ResourceKind, scope: Option<&str>) -> Result<String, ValidationError> {
    match kind {
        ResourceKind::Secret => {
            let manager = secret_manager(scope)?;
            Ok(format!("/secrets/{manager}"))
        }
        ResourceKind::Credential => {
            let username = consumer_scope(scope)?;
            Ok(format!("/consumers/{username}/credentials"))
        }
        other => Ok(format!("/{}", other.collection())),
    }
}

/// Collection path for listing; secrets may be listed across managers
fn list_path(kind: ResourceKind, scope: Option<&str>) -> Result<String, ValidationError> {
    match (kind, scope) {
        (ResourceKind::Secret, None) => Ok("/secrets".to_string()),
        _ => collection_path(kind, scope),
    }
}

fn secret_manager(scope: Option<&str>) -> Result<SecretManager, ValidationError> {
    SecretManager::from_value(scope.map(|s| Value::String(s.to_string())).as_ref())
}

fn consumer_scope(scope: Option<&str>) -> Result<&str, ValidationError> {
    match scope {
        Some(username) if is_identifier_str(username) => Ok(username),
        Some(_) => Err(ValidationError::Arguments(
            "'username' must be a path-safe consumer name".into(),
        )),
        None => Err(ValidationError::MissingIdentifier {
            kind: ResourceKind::Credential,
            field: "username",
        }),
    }
}

fn identifier(kind: ResourceKind, id: &str) -> Result<String, ValidationError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::MissingIdentifier { kind, field: "id" });
    }
    if !is_identifier_str(id) {
        return Err(ValidationError::Arguments(format!(
            "invalid {kind} id '{id}': expected 1-64 chars of [a-zA-Z0-9-_.]"
        )));
    }
    Ok(id.to_string())
}

fn is_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
}

fn with_subsystem(
    request: HttpRequest,
    subsystem: Option<&str>,
) -> Result<HttpRequest, ValidationError> {
    match subsystem {
        None => Ok(request),
        Some(s @ ("http" | "stream")) => Ok(request.with_query("subsystem", s)),
        Some(other) => Err(ValidationError::Arguments(format!(
            "subsystem must be 'http' or 'stream', got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plan(command: Command) -> HttpRequest {
        command.plan().unwrap()
    }

    #[test]
    fn upsert_without_id_posts_to_collection() {
        let request = plan(Command::Upsert {
            kind: ResourceKind::Route,
            input: json!({ "uri": "/a", "upstream_id": "1" }),
        });
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/routes");
        assert_eq!(request.body, Some(json!({ "uri": "/a", "upstream_id": "1" })));
    }

    #[test]
    fn upsert_with_id_puts_and_strips_id() {
        let request = plan(Command::Upsert {
            kind: ResourceKind::Upstream,
            input: json!({ "id": 7, "type": "roundrobin", "nodes": { "127.0.0.1:80": 1 } }),
        });
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/upstreams/7");
        assert_eq!(
            request.body,
            Some(json!({ "type": "roundrobin", "nodes": { "127.0.0.1:80": 1 } }))
        );
    }

    #[test]
    fn consumer_is_always_put_by_username() {
        let request = plan(Command::Upsert {
            kind: ResourceKind::Consumer,
            input: json!({ "username": "jack", "plugins": { "key-auth": { "key": "k" } } }),
        });
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/consumers/jack");
        assert_eq!(request.body.unwrap()["username"], "jack");
    }

    #[test]
    fn scoped_kinds_move_scope_into_path() {
        let secret = plan(Command::Upsert {
            kind: ResourceKind::Secret,
            input: json!({
                "id": "s1",
                "manager": "aws",
                "access_key_id": "a",
                "secret_access_key": "b",
                "region": "us-east-1"
            }),
        });
        assert_eq!(secret.path, "/secrets/aws/s1");
        assert!(secret.body.as_ref().unwrap().get("manager").is_none());

        let credential = plan(Command::Upsert {
            kind: ResourceKind::Credential,
            input: json!({ "username": "jack", "plugins": { "key-auth": { "key": "k" } } }),
        });
        assert_eq!(credential.method, Method::POST);
        assert_eq!(credential.path, "/consumers/jack/credentials");
        assert!(credential.body.as_ref().unwrap().get("username").is_none());
    }

    #[test]
    fn plugin_metadata_requires_id() {
        let err = Command::Upsert {
            kind: ResourceKind::PluginMetadata,
            input: json!({ "log_format": {} }),
        }
        .plan()
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingIdentifier {
                kind: ResourceKind::PluginMetadata,
                field: "id"
            }
        );
    }

    #[test]
    fn patch_keeps_null_and_absent_apart() {
        let request = plan(Command::Patch {
            kind: ResourceKind::Route,
            id: "r1".into(),
            input: json!({ "desc": null, "uri": "/v2" }),
        });
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.path, "/routes/r1");
        assert_eq!(request.body, Some(json!({ "desc": null, "uri": "/v2" })));
    }

    #[test]
    fn patch_unsupported_kind_is_rejected() {
        let err = Command::Patch {
            kind: ResourceKind::Consumer,
            id: "jack".into(),
            input: json!({ "desc": "x" }),
        }
        .plan()
        .unwrap_err();
        assert!(matches!(err, ValidationError::PatchUnsupported { .. }));
    }

    #[test]
    fn delete_force_only_where_meaningful() {
        let forced = plan(Command::Delete {
            kind: ResourceKind::Upstream,
            id: "u1".into(),
            scope: None,
            force: true,
        });
        assert_eq!(forced.path_and_query(), "/upstreams/u1?force=true");
        assert_eq!(forced.body, None);

        let ssl = plan(Command::Delete {
            kind: ResourceKind::Ssl,
            id: "c1".into(),
            scope: None,
            force: true,
        });
        assert_eq!(ssl.path_and_query(), "/ssls/c1");
    }

    #[test]
    fn get_scoped_resources_need_scope() {
        let err = Command::Get {
            kind: ResourceKind::Credential,
            id: "c1".into(),
            scope: None,
        }
        .plan()
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingIdentifier { field: "username", .. }));

        let err = Command::Get {
            kind: ResourceKind::Secret,
            id: "s1".into(),
            scope: Some("azure".into()),
        }
        .plan()
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDiscriminator { .. }));
    }

    #[test]
    fn list_query_is_deterministic() {
        let request = plan(Command::List {
            kind: ResourceKind::Route,
            scope: None,
            query: ListQuery {
                uri: Some("/api".into()),
                name: Some("web".into()),
                page_size: Some(1000),
                ..ListQuery::default()
            },
        });
        assert_eq!(
            request.path_and_query(),
            "/routes?page=1&page_size=500&name=web&uri=%2Fapi"
        );

        let defaults = plan(Command::List {
            kind: ResourceKind::Service,
            scope: None,
            query: ListQuery::default(),
        });
        assert_eq!(defaults.path_and_query(), "/services?page=1&page_size=10");

        let secrets = plan(Command::List {
            kind: ResourceKind::Secret,
            scope: None,
            query: ListQuery::default(),
        });
        assert_eq!(secrets.path, "/secrets");
    }

    #[test]
    fn plugin_endpoints() {
        let list = plan(Command::ListPlugins {
            subsystem: Some("stream".into()),
        });
        assert_eq!(list.path_and_query(), "/plugins/list?subsystem=stream");

        let schema = plan(Command::PluginSchema {
            name: "limit-count".into(),
            subsystem: None,
        });
        assert_eq!(schema.path, "/schema/plugins/limit-count");

        let err = Command::PluginSchema {
            name: "../etc".into(),
            subsystem: None,
        }
        .plan()
        .unwrap_err();
        assert!(matches!(err, ValidationError::Arguments(_)));
    }
}
