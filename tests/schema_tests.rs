//! Resource schema validation tests
//!
//! Exercises the registry through its public surface:
//! - polymorphic secrets and their discriminator
//! - create-or-update identifier handling
//! - partial updates (absent vs. null vs. present)

use apisix_mcp::schema::{
    IdPolicy, Patch, ResourceKind, SchemaRegistry, SecretConfig, SecretManager, ValidationError,
    is_ip_or_cidr,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn registry() -> &'static SchemaRegistry {
    SchemaRegistry::global()
}

/// A vault secret without its token names the missing field
#[test]
fn test_vault_secret_missing_token() {
    let err = registry()
        .validate_full(
            ResourceKind::Secret,
            &json!({
                "manager": "vault",
                "uri": "https://vault.internal:8200",
                "prefix": "kv/apisix"
            }),
        )
        .unwrap_err();

    let ValidationError::Schema { violations, .. } = &err else {
        panic!("expected schema violation, got {err:?}");
    };
    assert!(violations.iter().any(|v| v.path == "token"), "{violations:?}");
}

/// AWS secrets validate and parse into the typed variant
#[test]
fn test_aws_secret_parses() {
    let input = json!({
        "manager": "aws",
        "access_key_id": "AKIA",
        "secret_access_key": "s3cr3t",
        "region": "eu-west-1"
    });

    let validated = registry().validate_full(ResourceKind::Secret, &input).unwrap();
    assert_eq!(validated.variant, Some(SecretManager::Aws));

    let config = SecretConfig::parse(&input).unwrap();
    assert_eq!(config.manager(), SecretManager::Aws);
}

/// An unsupported manager lists the ones that exist
#[test]
fn test_unknown_secret_manager() {
    let err = registry()
        .validate_full(ResourceKind::Secret, &json!({ "manager": "azure" }))
        .unwrap_err();

    assert_eq!(
        err,
        ValidationError::UnknownDiscriminator {
            kind: ResourceKind::Secret,
            field: "manager",
            value: "azure".into(),
            expected: SecretManager::NAMES,
        }
    );
    assert_eq!(err.to_json()["expected"], json!(["vault", "aws", "gcp"]));
}

/// GCP needs inline credentials or a credentials file
#[test]
fn test_gcp_secret_needs_some_auth() {
    let err = registry()
        .validate_full(ResourceKind::Secret, &json!({ "manager": "gcp", "ssl_verify": true }))
        .unwrap_err();
    assert_eq!(err.code(), "schema_violation");

    registry()
        .validate_full(
            ResourceKind::Secret,
            &json!({ "manager": "gcp", "auth_file": "/etc/gcp.json" }),
        )
        .unwrap();
}

/// Consumers are keyed by username; a separate id is rejected
#[test]
fn test_consumer_identity() {
    assert_eq!(
        ResourceKind::Consumer.id_policy(),
        IdPolicy::NaturalKey("username")
    );

    let validated = registry()
        .validate_create(ResourceKind::Consumer, &json!({ "username": "jack" }))
        .unwrap();
    assert_eq!(validated.id.as_deref(), Some("jack"));
    assert_eq!(validated.body, *json!({ "username": "jack" }).as_object().unwrap());

    let err = registry()
        .validate_create(ResourceKind::Consumer, &json!({ "id": "1", "username": "jack" }))
        .unwrap_err();
    assert_eq!(err.code(), "schema_violation");

    let err = registry()
        .validate_create(ResourceKind::Consumer, &json!({ "desc": "no name" }))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingIdentifier {
            kind: ResourceKind::Consumer,
            field: "username"
        }
    );
}

/// The id leaves the body; everything else stays in input order
#[test]
fn test_create_strips_id_and_keeps_order() {
    let validated = registry()
        .validate_create(
            ResourceKind::Route,
            &json!({ "name": "web", "id": "r1", "uri": "/web", "desc": "front" }),
        )
        .unwrap();

    assert_eq!(validated.id.as_deref(), Some("r1"));
    let keys: Vec<&str> = validated.body.keys().map(String::as_str).collect();
    assert_eq!(keys, ["name", "uri", "desc"]);
}

/// Route create requires uri or uris; route patch does not
#[test]
fn test_route_patch_is_partial() {
    let err = registry()
        .validate_create(ResourceKind::Route, &json!({ "upstream_id": "u1" }))
        .unwrap_err();
    assert!(err.to_string().contains("'uri', 'uris'"), "{err}");

    let patch = registry()
        .validate_patch(ResourceKind::Route, &json!({ "desc": null, "priority": 5 }))
        .unwrap();

    assert!(patch.fields.get("desc").is_null());
    assert_eq!(patch.fields.get("priority"), Patch::Present(&json!(5)));
    assert!(patch.fields.get("uri").is_absent());
    assert_eq!(patch.fields.to_body(), json!({ "desc": null, "priority": 5 }));
}

/// Patch values are still type-checked
#[test]
fn test_patch_rejects_wrong_types() {
    let err = registry()
        .validate_patch(ResourceKind::Upstream, &json!({ "retries": "three" }))
        .unwrap_err();
    let ValidationError::Schema { violations, .. } = err else {
        panic!("expected schema violation");
    };
    assert_eq!(violations[0].path, "retries");
}

/// Kinds without PATCH in the Admin API say so
#[test]
fn test_patch_unsupported_kinds() {
    for kind in [
        ResourceKind::Consumer,
        ResourceKind::Credential,
        ResourceKind::PluginMetadata,
        ResourceKind::StreamRoute,
        ResourceKind::Proto,
    ] {
        assert_eq!(
            registry().validate_patch(kind, &json!({})).unwrap_err(),
            ValidationError::PatchUnsupported { kind }
        );
        assert!(registry().patch_json_schema(kind).is_err());
    }
}

/// Every kind publishes a create schema with an object root
#[test]
fn test_every_kind_has_a_json_schema() {
    for kind in ResourceKind::ALL {
        let schema = registry().create_json_schema(kind);
        assert!(schema.is_object(), "{kind}");
    }
    let metadata = registry().create_json_schema(ResourceKind::PluginMetadata);
    assert!(
        metadata["required"]
            .as_array()
            .is_some_and(|r| r.contains(&json!("id")))
    );
}

/// remote_addr accepts addresses and CIDRs only
#[test]
fn test_address_rules() {
    for ok in ["127.0.0.1", "10.0.0.0/8", "::1", "fe80::/10", "2001:db8::/32"] {
        assert!(is_ip_or_cidr(ok), "{ok}");
    }
    for bad in ["localhost", "example.com", "1.2.3", "10.0.0.0/33", "::1/129", "1.2.3.4/", "1.2.3.4/+8"] {
        assert!(!is_ip_or_cidr(bad), "{bad}");
    }

    let err = registry()
        .validate_create(
            ResourceKind::Route,
            &json!({ "uri": "/", "remote_addrs": ["10.0.0.1", "nope"] }),
        )
        .unwrap_err();
    let ValidationError::Schema { violations, .. } = err else {
        panic!("expected schema violation");
    };
    assert_eq!(violations[0].path, "remote_addrs[1]");
}
