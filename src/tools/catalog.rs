//! Tool names, descriptions and input schemas

use serde_json::{Value, json};

use crate::protocol::{Tool, ToolAnnotations};
use crate::schema::{ResourceKind, SchemaRegistry};

/// What a tool does when called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    /// Fetch one resource or list a collection
    GetResource,
    /// Delete a resource
    DeleteResource,
    /// Create or replace a resource of this kind
    Upsert(ResourceKind),
    /// Partially update a resource of this kind
    Patch(ResourceKind),
    /// List plugin names
    ListPlugins,
    /// Fetch a plugin's JSON schema
    PluginSchema,
    /// Send requests to the data-plane gateway
    SendToGateway,
}

/// One catalog entry
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON Schema of the arguments
    pub input_schema: Value,
    /// Handler
    pub action: ToolAction,
}

impl ToolSpec {
    /// MCP tool definition
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        let annotations = match self.action {
            ToolAction::GetResource | ToolAction::ListPlugins | ToolAction::PluginSchema => {
                ToolAnnotations {
                    read_only_hint: Some(true),
                    open_world_hint: Some(false),
                    ..ToolAnnotations::default()
                }
            }
            ToolAction::DeleteResource => ToolAnnotations {
                read_only_hint: Some(false),
                destructive_hint: Some(true),
                idempotent_hint: Some(true),
                open_world_hint: Some(false),
            },
            ToolAction::Upsert(_) | ToolAction::Patch(_) => ToolAnnotations {
                read_only_hint: Some(false),
                destructive_hint: Some(false),
                open_world_hint: Some(false),
                ..ToolAnnotations::default()
            },
            ToolAction::SendToGateway => ToolAnnotations {
                read_only_hint: Some(false),
                open_world_hint: Some(true),
                ..ToolAnnotations::default()
            },
        };
        Tool {
            name: self.name.clone(),
            title: None,
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
            annotations: Some(annotations),
        }
    }
}

/// Build the full catalog in listing order
#[must_use]
pub fn build(registry: &SchemaRegistry) -> Vec<ToolSpec> {
    let mut tools = vec![
        ToolSpec {
            name: "get_resource".into(),
            description: "Fetch one Admin API resource by id, or list a collection when no id \
                          is given. Lists are paginated (page, page_size 10-500) and can be \
                          filtered by name, label and uri. Secrets take 'manager', credentials \
                          take 'username'."
                .into(),
            input_schema: get_resource_schema(),
            action: ToolAction::GetResource,
        },
        ToolSpec {
            name: "delete_resource".into(),
            description: "Delete an Admin API resource by id. 'force' deletes routes, services, \
                          upstreams and plugin configs even while they are referenced."
                .into(),
            input_schema: delete_resource_schema(),
            action: ToolAction::DeleteResource,
        },
    ];

    for kind in ResourceKind::ALL {
        tools.push(ToolSpec {
            name: format!("create_or_update_{kind}"),
            description: upsert_description(kind),
            input_schema: registry.create_json_schema(kind),
            action: ToolAction::Upsert(kind),
        });
    }

    for kind in ResourceKind::ALL {
        let Ok(input_schema) = registry.patch_json_schema(kind) else {
            continue;
        };
        tools.push(ToolSpec {
            name: format!("patch_{kind}"),
            description: format!(
                "Partially update a {} by id. Omitted fields are left unchanged; a field set \
                 to null is removed.",
                kind.as_str().replace('_', " ")
            ),
            input_schema,
            action: ToolAction::Patch(kind),
        });
    }

    tools.extend([
        ToolSpec {
            name: "list_plugins".into(),
            description: "List the plugins available on the gateway.".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "subsystem": subsystem_schema() }
            }),
            action: ToolAction::ListPlugins,
        },
        ToolSpec {
            name: "get_plugin_schema".into(),
            description: "Fetch the JSON schema of a plugin's configuration.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Plugin name, e.g. limit-count" },
                    "subsystem": subsystem_schema()
                },
                "required": ["name"]
            }),
            action: ToolAction::PluginSchema,
        },
        ToolSpec {
            name: "send_request_to_gateway".into(),
            description: "Send one or more HTTP requests to the data-plane gateway, each \
                          repeated repeatCount times, all concurrently. Returns every result \
                          in request order plus a success/failure summary."
                .into(),
            input_schema: gateway_request_schema(),
            action: ToolAction::SendToGateway,
        },
    ]);

    tools
}

fn upsert_description(kind: ResourceKind) -> String {
    let what = match kind {
        ResourceKind::Route => "a route (uri or uris, upstream/upstream_id/service_id, plugins)",
        ResourceKind::Service => "a service (shared upstream and plugins for routes)",
        ResourceKind::Upstream => "an upstream (nodes or service_name, load balancing, health checks)",
        ResourceKind::Consumer => "a consumer, identified by its username",
        ResourceKind::Credential => "a credential of the consumer named by 'username'",
        ResourceKind::Ssl => "an SSL certificate (cert, key, snis)",
        ResourceKind::Secret => "a secret manager configuration; 'manager' selects vault, aws or gcp",
        ResourceKind::GlobalRule => "a global rule (plugins applied to every request)",
        ResourceKind::ConsumerGroup => "a consumer group (plugins shared by consumers)",
        ResourceKind::PluginConfig => "a plugin config (reusable plugin set for routes)",
        ResourceKind::PluginMetadata => "the metadata of the plugin named by 'id'",
        ResourceKind::StreamRoute => "a stream (L4) route",
        ResourceKind::Proto => "a protobuf definition for grpc-transcode",
    };
    let id_rule = match kind {
        ResourceKind::Consumer => "Always replaces the consumer with that username.",
        ResourceKind::PluginMetadata => "Always replaces the metadata.",
        _ => "With 'id' the resource is created or replaced; without it one is created with a generated id.",
    };
    format!("Create or update {what}. {id_rule}")
}

fn kind_names() -> Vec<&'static str> {
    ResourceKind::ALL.iter().map(|k| k.as_str()).collect()
}

fn id_schema() -> Value {
    json!({ "type": ["string", "integer"], "description": "Resource id" })
}

fn get_resource_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "enum": kind_names() },
            "id": id_schema(),
            "manager": { "type": "string", "enum": ["vault", "aws", "gcp"], "description": "Secret manager (secrets only)" },
            "username": { "type": "string", "description": "Owning consumer (credentials only)" },
            "page": { "type": "integer", "minimum": 1, "default": 1 },
            "page_size": { "type": "integer", "minimum": 10, "maximum": 500, "default": 10 },
            "name": { "type": "string", "description": "Filter by name" },
            "label": { "type": "string", "description": "Filter by label" },
            "uri": { "type": "string", "description": "Filter by uri" }
        },
        "required": ["type"]
    })
}

fn delete_resource_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "enum": kind_names() },
            "id": id_schema(),
            "manager": { "type": "string", "enum": ["vault", "aws", "gcp"], "description": "Secret manager (secrets only)" },
            "username": { "type": "string", "description": "Owning consumer (credentials only)" },
            "force": { "type": "boolean", "default": false }
        },
        "required": ["type", "id"]
    })
}

fn subsystem_schema() -> Value {
    json!({ "type": "string", "enum": ["http", "stream"] })
}

fn gateway_request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "requests": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path on the gateway, e.g. /get" },
                        "method": {
                            "type": "string",
                            "enum": ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"]
                        },
                        "data": { "description": "JSON body" },
                        "headers": {
                            "type": "object",
                            "additionalProperties": { "type": "string" }
                        },
                        "repeatCount": { "type": "integer", "minimum": 1, "default": 1 }
                    },
                    "required": ["path", "method"]
                }
            }
        },
        "required": ["requests"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_every_tool_once() {
        let tools = build(SchemaRegistry::global());
        let names: HashSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());

        // 2 generic + 13 upserts + 8 patches + 3 extras
        assert_eq!(tools.len(), 26);
        assert!(names.contains("create_or_update_plugin_metadata"));
        assert!(names.contains("patch_secret"));
        assert!(!names.contains("patch_consumer"));
        assert!(names.contains("send_request_to_gateway"));
    }

    #[test]
    fn delete_is_marked_destructive() {
        let tools = build(SchemaRegistry::global());
        let delete = tools.iter().find(|t| t.name == "delete_resource").unwrap();
        let tool = delete.to_tool();
        assert_eq!(tool.annotations.unwrap().destructive_hint, Some(true));
    }
}
