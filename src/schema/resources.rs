//! Field definitions for every resource kind.
//!
//! These mirror the Admin API's own JSON schemas closely enough to catch
//! structural mistakes locally; business rules stay with the remote.

use super::field::{Field, FieldType, ObjectSchema};
use super::secret::SecretManager;
use super::{ResourceKind, Shape};

const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "CONNECT", "TRACE", "PURGE",
];

/// Shape of `kind`
pub(super) fn shape(kind: ResourceKind) -> Shape {
    match kind {
        ResourceKind::Route => Shape::Object(route()),
        ResourceKind::Service => Shape::Object(service()),
        ResourceKind::Upstream => Shape::Object(upstream()),
        ResourceKind::Consumer => Shape::Object(consumer()),
        ResourceKind::Credential => Shape::Object(credential()),
        ResourceKind::Ssl => Shape::Object(ssl()),
        ResourceKind::Secret => Shape::Polymorphic {
            tag: "manager",
            variants: SecretManager::ALL.into_iter().map(|m| (m, m.schema())).collect(),
        },
        ResourceKind::GlobalRule => Shape::Object(ObjectSchema::new(vec![
            required_plugins(),
        ])),
        ResourceKind::ConsumerGroup | ResourceKind::PluginConfig => {
            Shape::Object(ObjectSchema::new(vec![
                required_plugins(),
                name(),
                desc(),
                labels(),
            ]))
        }
        ResourceKind::PluginMetadata => Shape::Object(ObjectSchema::open()),
        ResourceKind::StreamRoute => Shape::Object(stream_route()),
        ResourceKind::Proto => Shape::Object(ObjectSchema::new(vec![
            Field::required("content", FieldType::non_empty())
                .describe("Contents of the .proto file"),
            name(),
            desc(),
            labels(),
        ])),
    }
}

fn name() -> Field {
    Field::optional("name", FieldType::string_len(1, 256))
}

fn desc() -> Field {
    Field::optional("desc", FieldType::string_len(0, 256))
}

fn labels() -> Field {
    Field::optional("labels", FieldType::map(FieldType::string_len(1, 64)))
        .describe("Key/value labels, used by list filters")
}

fn plugins() -> Field {
    Field::optional("plugins", plugin_map()).describe("Plugin name to plugin configuration")
}

fn required_plugins() -> Field {
    Field::required("plugins", plugin_map()).describe("Plugin name to plugin configuration")
}

fn plugin_map() -> FieldType {
    FieldType::map(FieldType::Object(ObjectSchema::open()))
}

fn timeout() -> Field {
    Field::optional(
        "timeout",
        FieldType::object(vec![
            Field::required("connect", FieldType::number_min(0.0)),
            Field::required("send", FieldType::number_min(0.0)),
            Field::required("read", FieldType::number_min(0.0)),
        ]),
    )
    .describe("Timeouts in seconds")
}

fn host_pattern() -> FieldType {
    FieldType::pattern(r"^\*?[0-9a-zA-Z._\[\]:-]+$", 1, 4096)
}

fn route() -> ObjectSchema {
    ObjectSchema::new(vec![
        Field::optional("uri", FieldType::string_len(1, 4096)).describe("Request path to match"),
        Field::optional("uris", FieldType::non_empty_array(FieldType::string_len(1, 4096))),
        name(),
        desc(),
        Field::optional("methods", FieldType::array(FieldType::Enum(HTTP_METHODS))),
        Field::optional("host", host_pattern()),
        Field::optional("hosts", FieldType::non_empty_array(host_pattern())),
        Field::optional("remote_addr", FieldType::Address),
        Field::optional("remote_addrs", FieldType::non_empty_array(FieldType::Address)),
        Field::optional("vars", FieldType::array(FieldType::Any)),
        Field::optional("filter_func", FieldType::pattern(r"^function", 10, 65536)),
        Field::optional("priority", FieldType::integer()),
        plugins(),
        Field::optional("script", FieldType::string_len(10, 102_400)),
        Field::optional("upstream", FieldType::Object(upstream())),
        Field::optional("upstream_id", FieldType::Identifier),
        Field::optional("service_id", FieldType::Identifier),
        Field::optional("plugin_config_id", FieldType::Identifier),
        timeout(),
        Field::optional("enable_websocket", FieldType::Boolean),
        Field::optional("status", FieldType::IntEnum(&[0, 1])),
        labels(),
    ])
    .at_least_one(&["uri", "uris"])
}

fn service() -> ObjectSchema {
    ObjectSchema::new(vec![
        name(),
        desc(),
        plugins(),
        Field::optional("upstream", FieldType::Object(upstream())),
        Field::optional("upstream_id", FieldType::Identifier),
        Field::optional("script", FieldType::string_len(10, 102_400)),
        Field::optional("enable_websocket", FieldType::Boolean),
        Field::optional("hosts", FieldType::non_empty_array(host_pattern())),
        labels(),
    ])
}

fn upstream_node() -> FieldType {
    FieldType::object(vec![
        Field::required("host", FieldType::non_empty()),
        Field::optional("port", FieldType::int_range(1, 65535)),
        Field::required("weight", FieldType::int_min(0)),
        Field::optional("priority", FieldType::integer()),
        Field::optional("metadata", FieldType::Any),
    ])
}

fn upstream() -> ObjectSchema {
    ObjectSchema::new(vec![
        Field::optional(
            "nodes",
            FieldType::AnyOf(vec![
                FieldType::array(upstream_node()),
                FieldType::map(FieldType::int_min(0)),
            ]),
        )
        .describe("Either [{host, port, weight}] or {\"host:port\": weight}"),
        Field::optional("service_name", FieldType::string_len(1, 256))
            .describe("Service name in the discovery registry"),
        Field::optional("discovery_type", FieldType::non_empty()),
        Field::optional("discovery_args", FieldType::Object(ObjectSchema::open())),
        Field::optional(
            "type",
            FieldType::Enum(&["roundrobin", "chash", "ewma", "least_conn"]),
        )
        .describe("Load-balancing algorithm"),
        Field::optional(
            "hash_on",
            FieldType::Enum(&["vars", "header", "cookie", "consumer", "vars_combinations"]),
        ),
        Field::optional("key", FieldType::string()),
        Field::optional("checks", FieldType::Object(ObjectSchema::open()))
            .describe("Active/passive health checks"),
        Field::optional("retries", FieldType::int_min(0)),
        Field::optional("retry_timeout", FieldType::number_min(0.0)),
        timeout(),
        Field::optional(
            "scheme",
            FieldType::Enum(&["http", "https", "grpc", "grpcs", "tcp", "tls", "udp", "kafka"]),
        ),
        Field::optional("pass_host", FieldType::Enum(&["pass", "node", "rewrite"])),
        Field::optional("upstream_host", host_pattern()),
        Field::optional(
            "tls",
            FieldType::object(vec![
                Field::optional("client_cert", FieldType::string()),
                Field::optional("client_key", FieldType::string()),
                Field::optional("client_cert_id", FieldType::Identifier),
                Field::optional("verify", FieldType::Boolean),
            ]),
        ),
        Field::optional(
            "keepalive_pool",
            FieldType::object(vec![
                Field::optional("size", FieldType::int_min(1)),
                Field::optional("idle_timeout", FieldType::number_min(0.0)),
                Field::optional("requests", FieldType::int_min(1)),
            ]),
        ),
        name(),
        desc(),
        labels(),
    ])
    .at_least_one(&["nodes", "service_name"])
}

fn consumer() -> ObjectSchema {
    ObjectSchema::new(vec![
        Field::required("username", FieldType::pattern(r"^[a-zA-Z0-9_\-]+$", 1, 100))
            .describe("Unique consumer name; also its identifier"),
        Field::optional("group_id", FieldType::Identifier),
        plugins(),
        desc(),
        labels(),
    ])
}

fn credential() -> ObjectSchema {
    ObjectSchema::new(vec![
        plugins(),
        name(),
        desc(),
        labels(),
    ])
}

fn ssl() -> ObjectSchema {
    ObjectSchema::new(vec![
        Field::required("cert", FieldType::non_empty()).describe("PEM certificate"),
        Field::required("key", FieldType::non_empty()).describe("PEM private key"),
        Field::optional("certs", FieldType::array(FieldType::non_empty())),
        Field::optional("keys", FieldType::array(FieldType::non_empty())),
        Field::optional("snis", FieldType::non_empty_array(host_pattern())),
        Field::optional(
            "client",
            FieldType::object(vec![
                Field::required("ca", FieldType::non_empty()),
                Field::optional("depth", FieldType::int_min(0)),
                Field::optional("skip_mtls_uri_regex", FieldType::array(FieldType::non_empty())),
            ]),
        ),
        Field::optional("type", FieldType::Enum(&["server", "client"])),
        Field::optional("status", FieldType::IntEnum(&[0, 1])),
        Field::optional(
            "ssl_protocols",
            FieldType::array(FieldType::Enum(&["TLSv1.1", "TLSv1.2", "TLSv1.3"])),
        ),
        labels(),
    ])
}

fn stream_route() -> ObjectSchema {
    ObjectSchema::new(vec![
        Field::optional("remote_addr", FieldType::Address),
        Field::optional("server_addr", FieldType::Address),
        Field::optional("server_port", FieldType::int_range(1, 65535)),
        Field::optional("sni", host_pattern()),
        Field::optional("upstream", FieldType::Object(upstream())),
        Field::optional("upstream_id", FieldType::Identifier),
        Field::optional("service_id", FieldType::Identifier),
        plugins(),
        Field::optional(
            "protocol",
            FieldType::object(vec![
                Field::required("name", FieldType::non_empty()),
                Field::optional("superior_id", FieldType::Identifier),
                Field::optional("conf", FieldType::Any),
                Field::optional("logger", FieldType::array(FieldType::Any)),
            ]),
        ),
        name(),
        desc(),
        labels(),
    ])
}
