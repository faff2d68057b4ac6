//! Secret manager variants.
//!
//! A secret is selected by its `manager` discriminator before any other
//! field is looked at. [`SecretConfig`] is the typed view of a validated
//! secret body.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field::{Field, FieldType, ObjectSchema};
use super::{ResourceKind, SchemaRegistry, ValidationError};

/// Secret backend named by the `manager` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretManager {
    /// HashiCorp Vault (KV engine)
    Vault,
    /// AWS Secrets Manager
    Aws,
    /// GCP Secret Manager
    Gcp,
}

impl SecretManager {
    /// Discriminator values, in catalog order
    pub const NAMES: &'static [&'static str] = &["vault", "aws", "gcp"];

    /// Every manager
    pub const ALL: [Self; 3] = [Self::Vault, Self::Aws, Self::Gcp];

    /// Discriminator value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }

    /// Resolve the discriminator of `input`.
    ///
    /// # Errors
    ///
    /// `MissingDiscriminator` when absent or not a string,
    /// `UnknownDiscriminator` when it names no variant.
    pub fn from_value(value: Option<&Value>) -> Result<Self, ValidationError> {
        match value {
            Some(Value::String(s)) => s.parse().map_err(|()| ValidationError::UnknownDiscriminator {
                kind: ResourceKind::Secret,
                field: "manager",
                value: s.clone(),
                expected: Self::NAMES,
            }),
            _ => Err(ValidationError::MissingDiscriminator {
                kind: ResourceKind::Secret,
                field: "manager",
                expected: Self::NAMES,
            }),
        }
    }

    /// Field schema of this variant (discriminator excluded)
    #[must_use]
    pub fn schema(self) -> ObjectSchema {
        match self {
            Self::Vault => ObjectSchema::new(vec![
                Field::required(
                    "uri",
                    FieldType::pattern(
                        r"^[^/]+://([\da-zA-Z.-]+|\[[\da-fA-F:]+\])(:\d+)?$",
                        1,
                        4096,
                    ),
                )
                .describe("Vault address, scheme://host[:port]"),
                Field::required("prefix", FieldType::non_empty())
                    .describe("KV engine path prefix, e.g. kv/apisix"),
                Field::required("token", FieldType::non_empty()),
                Field::optional("namespace", FieldType::string()),
            ]),
            Self::Aws => ObjectSchema::new(vec![
                Field::required("access_key_id", FieldType::non_empty()),
                Field::required("secret_access_key", FieldType::non_empty()),
                Field::required("region", FieldType::non_empty()),
                Field::optional("session_token", FieldType::string()),
                Field::optional("endpoint_url", FieldType::string()),
            ]),
            Self::Gcp => ObjectSchema::new(vec![
                Field::optional(
                    "auth_config",
                    FieldType::object(vec![
                        Field::required("client_email", FieldType::non_empty()),
                        Field::required("private_key", FieldType::non_empty()),
                        Field::required("project_id", FieldType::non_empty()),
                        Field::optional("token_uri", FieldType::string()),
                        Field::optional("entries_uri", FieldType::string()),
                        Field::optional("scope", FieldType::array(FieldType::string())),
                    ]),
                )
                .describe("Service-account credentials"),
                Field::optional("auth_file", FieldType::non_empty())
                    .describe("Path to a service-account JSON file"),
                Field::optional("ssl_verify", FieldType::Boolean),
            ])
            .at_least_one(&["auth_config", "auth_file"]),
        }
    }
}

impl fmt::Display for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretManager {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|m| m.as_str() == s).ok_or(())
    }
}

/// Vault variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSecret {
    /// Vault address
    pub uri: String,
    /// KV path prefix
    pub prefix: String,
    /// Access token
    pub token: String,
    /// Enterprise namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// AWS variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSecret {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region
    pub region: String,
    /// STS session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

/// GCP service-account credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpAuthConfig {
    /// Service-account email
    pub client_email: String,
    /// PEM private key
    pub private_key: String,
    /// Project id
    pub project_id: String,
    /// OAuth token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    /// Secret Manager endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries_uri: Option<String>,
    /// OAuth scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,
}

/// Where GCP credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcpAuth {
    /// Inline credentials
    Config(GcpAuthConfig),
    /// Credentials file on the gateway host
    File(String),
}

/// GCP variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSecret {
    /// Auth material
    pub auth: GcpAuth,
    /// Verify TLS to Google endpoints
    pub ssl_verify: Option<bool>,
}

/// Typed secret configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretConfig {
    /// Vault
    Vault(VaultSecret),
    /// AWS Secrets Manager
    Aws(AwsSecret),
    /// GCP Secret Manager
    Gcp(GcpSecret),
}

impl SecretConfig {
    /// Validate `input` (with its `manager` discriminator) and build the
    /// typed view.
    pub fn parse(input: &Value) -> Result<Self, ValidationError> {
        let validated = SchemaRegistry::global().validate_full(ResourceKind::Secret, input)?;
        let manager = SecretManager::from_value(validated.body.get("manager"))?;
        Self::from_body(manager, &validated.body)
    }

    /// Build the typed view of an already validated body
    pub(crate) fn from_body(
        manager: SecretManager,
        body: &Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        let object = Value::Object(body.clone());
        let typed = |e: serde_json::Error| ValidationError::Arguments(e.to_string());
        Ok(match manager {
            SecretManager::Vault => Self::Vault(serde_json::from_value(object).map_err(typed)?),
            SecretManager::Aws => Self::Aws(serde_json::from_value(object).map_err(typed)?),
            SecretManager::Gcp => {
                let auth = match (body.get("auth_config"), body.get("auth_file")) {
                    (Some(config), _) if !config.is_null() => {
                        GcpAuth::Config(serde_json::from_value(config.clone()).map_err(typed)?)
                    }
                    (_, Some(Value::String(file))) => GcpAuth::File(file.clone()),
                    _ => {
                        return Err(ValidationError::MissingIdentifier {
                            kind: ResourceKind::Secret,
                            field: "auth_config",
                        });
                    }
                };
                Self::Gcp(GcpSecret {
                    auth,
                    ssl_verify: body.get("ssl_verify").and_then(Value::as_bool),
                })
            }
        })
    }

    /// Discriminator of this variant
    #[must_use]
    pub fn manager(&self) -> SecretManager {
        match self {
            Self::Vault(_) => SecretManager::Vault,
            Self::Aws(_) => SecretManager::Aws,
            Self::Gcp(_) => SecretManager::Gcp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_variant() {
        let vault = SecretConfig::parse(&json!({
            "manager": "vault",
            "uri": "http://127.0.0.1:8200",
            "prefix": "kv/apisix",
            "token": "root"
        }))
        .unwrap();
        assert_eq!(vault.manager(), SecretManager::Vault);

        let aws = SecretConfig::parse(&json!({
            "manager": "aws",
            "access_key_id": "AKIA",
            "secret_access_key": "s3cr3t",
            "region": "eu-west-1"
        }))
        .unwrap();
        assert!(matches!(aws, SecretConfig::Aws(AwsSecret { ref region, .. }) if region == "eu-west-1"));

        let gcp = SecretConfig::parse(&json!({
            "manager": "gcp",
            "auth_file": "/etc/gcp.json",
            "ssl_verify": false
        }))
        .unwrap();
        assert_eq!(
            gcp,
            SecretConfig::Gcp(GcpSecret {
                auth: GcpAuth::File("/etc/gcp.json".into()),
                ssl_verify: Some(false),
            })
        );
    }

    #[test]
    fn gcp_needs_auth_material() {
        let err = SecretConfig::parse(&json!({ "manager": "gcp", "ssl_verify": true })).unwrap_err();
        assert!(matches!(err, ValidationError::Schema { .. }), "{err}");
    }

    #[test]
    fn discriminator_is_checked_first() {
        let err = SecretConfig::parse(&json!({ "manager": "azure", "uri": 5 })).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownDiscriminator { ref value, .. } if value == "azure"
        ));

        let err = SecretConfig::parse(&json!({ "manager": 7 })).unwrap_err();
        assert!(matches!(err, ValidationError::MissingDiscriminator { .. }));
    }

    #[test]
    fn vault_uri_must_have_scheme_and_host() {
        let err = SecretConfig::parse(&json!({
            "manager": "vault",
            "uri": "127.0.0.1:8200",
            "prefix": "kv",
            "token": "t"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("uri"), "{err}");
    }
}
