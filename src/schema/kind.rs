//! Resource kinds managed through the Admin API

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One category of remotely managed configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// HTTP route
    Route,
    /// Service (shared upstream + plugins for routes)
    Service,
    /// Upstream node pool
    Upstream,
    /// Consumer, identified by its username
    Consumer,
    /// Consumer credential (nested under a consumer)
    Credential,
    /// TLS certificate
    Ssl,
    /// Secret manager configuration (vault / aws / gcp)
    Secret,
    /// Plugins applied to every request
    GlobalRule,
    /// Plugins shared by a group of consumers
    ConsumerGroup,
    /// Reusable plugin set for routes
    PluginConfig,
    /// Per-plugin metadata, identified by the plugin name
    PluginMetadata,
    /// L4 (stream) route
    StreamRoute,
    /// Protobuf definition used by grpc-transcode
    Proto,
}

/// How a resource is identified when it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Caller may supply `id`; the remote assigns one otherwise
    Optional,
    /// Caller must supply `id`
    Required,
    /// The identifier is a regular body field (e.g. consumer `username`)
    NaturalKey(&'static str),
}

impl ResourceKind {
    /// Every kind, in catalog order
    pub const ALL: [Self; 13] = [
        Self::Route,
        Self::Service,
        Self::Upstream,
        Self::Consumer,
        Self::Credential,
        Self::Ssl,
        Self::Secret,
        Self::GlobalRule,
        Self::ConsumerGroup,
        Self::PluginConfig,
        Self::PluginMetadata,
        Self::StreamRoute,
        Self::Proto,
    ];

    /// Snake-case name used in tool names and arguments
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Service => "service",
            Self::Upstream => "upstream",
            Self::Consumer => "consumer",
            Self::Credential => "credential",
            Self::Ssl => "ssl",
            Self::Secret => "secret",
            Self::GlobalRule => "global_rule",
            Self::ConsumerGroup => "consumer_group",
            Self::PluginConfig => "plugin_config",
            Self::PluginMetadata => "plugin_metadata",
            Self::StreamRoute => "stream_route",
            Self::Proto => "proto",
        }
    }

    /// Position in [`ResourceKind::ALL`]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Collection segment below the admin prefix.
    ///
    /// Scoped kinds (secret, credential) get their scope inserted by the
    /// request planner.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Route => "routes",
            Self::Service => "services",
            Self::Upstream => "upstreams",
            Self::Consumer | Self::Credential => "consumers",
            Self::Ssl => "ssls",
            Self::Secret => "secrets",
            Self::GlobalRule => "global_rules",
            Self::ConsumerGroup => "consumer_groups",
            Self::PluginConfig => "plugin_configs",
            Self::PluginMetadata => "plugin_metadata",
            Self::StreamRoute => "stream_routes",
            Self::Proto => "protos",
        }
    }

    /// Input field that becomes a path segment instead of body content
    #[must_use]
    pub fn scope_field(self) -> Option<&'static str> {
        match self {
            Self::Secret => Some("manager"),
            Self::Credential => Some("username"),
            _ => None,
        }
    }

    /// Identifier policy for create-or-update
    #[must_use]
    pub fn id_policy(self) -> IdPolicy {
        match self {
            Self::Consumer => IdPolicy::NaturalKey("username"),
            Self::PluginMetadata => IdPolicy::Required,
            _ => IdPolicy::Optional,
        }
    }

    /// Whether the Admin API accepts `PATCH` for this kind
    #[must_use]
    pub fn supports_patch(self) -> bool {
        matches!(
            self,
            Self::Route
                | Self::Service
                | Self::Upstream
                | Self::Ssl
                | Self::Secret
                | Self::GlobalRule
                | Self::ConsumerGroup
                | Self::PluginConfig
        )
    }

    /// Whether `DELETE ...?force=true` is meaningful (resource may be referenced)
    #[must_use]
    pub fn supports_force_delete(self) -> bool {
        matches!(
            self,
            Self::Route | Self::Service | Self::Upstream | Self::PluginConfig
        )
    }

    /// Whether list requests accept the `page`/`page_size` and filter parameters
    #[must_use]
    pub fn supports_filters(self) -> bool {
        !matches!(self, Self::PluginMetadata)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        // Accept the collection names too ("routes", "ssls", ...)
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized || kind.plural() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "unknown resource type '{s}'; expected one of: {}",
                    known.join(", ")
                )
            })
    }
}

impl ResourceKind {
    fn plural(self) -> &'static str {
        match self {
            Self::Credential => "credentials",
            other => other.collection(),
        }
    }
}
