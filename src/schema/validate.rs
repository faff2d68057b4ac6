//! Structural validation of JSON values against [`ObjectSchema`]s.
//!
//! All violations are collected rather than stopping at the first one, so a
//! caller can fix its input in a single round trip.

use serde_json::{Map, Value};

use super::Violation;
use super::address::is_ip_or_cidr;
use super::field::{FieldType, ObjectSchema, StringRules};

/// How strictly to treat missing and `null` fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full/create shape: required fields and groups enforced, `null` rejected
    Full,
    /// Patch shape: everything optional, `null` clears
    Patch,
}

/// Validate `map` against `schema`, appending violations to `out`.
pub fn check_object(
    schema: &ObjectSchema,
    map: &Map<String, Value>,
    path: &str,
    mode: Mode,
    out: &mut Vec<Violation>,
) {
    for field in &schema.fields {
        let field_path = join_path(path, field.name);
        match map.get(field.name) {
            None => {
                if mode == Mode::Full && field.required {
                    out.push(Violation::new(field_path, "required field is missing"));
                }
            }
            Some(Value::Null) => {
                if mode == Mode::Full {
                    out.push(Violation::new(
                        field_path,
                        "must not be null (omit the field instead)",
                    ));
                }
            }
            Some(value) => check_value(&field.ty, value, &field_path, mode, out),
        }
    }

    if mode == Mode::Full {
        for group in &schema.at_least_one_of {
            let satisfied = group
                .iter()
                .any(|name| map.get(*name).is_some_and(|v| !v.is_null()));
            if !satisfied {
                let names: Vec<String> = group.iter().map(|n| format!("'{n}'")).collect();
                out.push(Violation::new(
                    path,
                    format!("at least one of {} is required", names.join(", ")),
                ));
            }
        }
    }
}

/// Validate a single non-null value.
pub fn check_value(ty: &FieldType, value: &Value, path: &str, mode: Mode, out: &mut Vec<Violation>) {
    match ty {
        FieldType::String(rules) => check_string(rules, value, path, out),
        FieldType::Integer { min, max } => {
            let Some(n) = as_integer(value) else {
                out.push(type_mismatch(path, ty, value));
                return;
            };
            if min.is_some_and(|min| n < i128::from(min)) || max.is_some_and(|max| n > i128::from(max)) {
                out.push(Violation::new(path, out_of_range(*min, *max)));
            }
        }
        FieldType::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                out.push(type_mismatch(path, ty, value));
                return;
            };
            if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                out.push(Violation::new(path, out_of_range(*min, *max)));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                out.push(type_mismatch(path, ty, value));
            }
        }
        FieldType::Enum(options) => match value.as_str() {
            Some(s) if options.contains(&s) => {}
            _ => out.push(type_mismatch(path, ty, value)),
        },
        FieldType::IntEnum(options) => match value.as_i64() {
            Some(n) if options.contains(&n) => {}
            _ => out.push(type_mismatch(path, ty, value)),
        },
        FieldType::Identifier => {
            if !is_identifier(value) {
                out.push(type_mismatch(path, ty, value));
            }
        }
        FieldType::Address => match value.as_str() {
            Some(s) if is_ip_or_cidr(s) => {}
            _ => out.push(type_mismatch(path, ty, value)),
        },
        FieldType::Array { items, min_items } => {
            let Some(array) = value.as_array() else {
                out.push(type_mismatch(path, ty, value));
                return;
            };
            if let Some(min) = min_items {
                if array.len() < *min {
                    out.push(Violation::new(
                        path,
                        format!("must contain at least {min} item(s)"),
                    ));
                }
            }
            // Arrays are replaced wholesale, so items always need their full shape
            for (i, item) in array.iter().enumerate() {
                check_value(items, item, &format!("{path}[{i}]"), Mode::Full, out);
            }
        }
        FieldType::Map(values) => {
            let Some(map) = value.as_object() else {
                out.push(type_mismatch(path, ty, value));
                return;
            };
            for (key, entry) in map {
                let entry_path = join_path(path, key);
                if entry.is_null() {
                    if mode == Mode::Full {
                        out.push(Violation::new(entry_path, "must not be null"));
                    }
                    continue;
                }
                check_value(values, entry, &entry_path, mode, out);
            }
        }
        FieldType::Object(schema) => {
            let Some(map) = value.as_object() else {
                out.push(type_mismatch(path, ty, value));
                return;
            };
            check_object(schema, map, path, mode, out);
        }
        FieldType::AnyOf(alternatives) => {
            let matched = alternatives.iter().any(|alt| {
                let mut scratch = Vec::new();
                check_value(alt, value, path, mode, &mut scratch);
                scratch.is_empty()
            });
            if !matched {
                out.push(type_mismatch(path, ty, value));
            }
        }
        FieldType::Any => {}
    }
}

fn check_string(rules: &StringRules, value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(s) = value.as_str() else {
        out.push(Violation::new(
            path,
            format!("expected string, got {}", json_type(value)),
        ));
        return;
    };
    let len = s.chars().count();
    if let Some(min) = rules.min_len {
        if len < min {
            out.push(Violation::new(
                path,
                format!("must be at least {min} character(s) long"),
            ));
        }
    }
    if let Some(max) = rules.max_len {
        if len > max {
            out.push(Violation::new(
                path,
                format!("must be at most {max} character(s) long"),
            ));
        }
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(s) {
            out.push(Violation::new(
                path,
                format!("must match pattern {}", pattern.as_str()),
            ));
        }
    }
}

/// Identifier: 1-64 chars of `[a-zA-Z0-9-_.]`, or a positive integer
#[must_use]
pub fn is_identifier(value: &Value) -> bool {
    match value {
        Value::String(s) => is_identifier_str(s),
        Value::Number(n) => n.as_u64().is_some_and(|n| n >= 1),
        _ => false,
    }
}

pub(crate) fn is_identifier_str(s: &str) -> bool {
    (1..=64).contains(&s.len())
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn as_integer(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

fn out_of_range<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("must be between {min} and {max}"),
        (Some(min), None) => format!("must be at least {min}"),
        (None, Some(max)) => format!("must be at most {max}"),
        (None, None) => "out of range".into(),
    }
}

fn type_mismatch(path: &str, ty: &FieldType, value: &Value) -> Violation {
    let got = match value {
        Value::String(s) => format!("\"{s}\""),
        other => json_type(other).to_string(),
    };
    Violation::new(path, format!("expected {}, got {got}", ty.describe()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::Field;
    use serde_json::json;

    fn node_schema() -> ObjectSchema {
        ObjectSchema::new(vec![
            Field::required("host", FieldType::non_empty()),
            Field::optional("port", FieldType::int_range(1, 65535)),
            Field::required("weight", FieldType::int_min(0)),
        ])
    }

    fn schema() -> ObjectSchema {
        ObjectSchema::new(vec![
            Field::optional("uri", FieldType::non_empty()),
            Field::optional("uris", FieldType::non_empty_array(FieldType::non_empty())),
            Field::optional("remote_addr", FieldType::Address),
            Field::optional("status", FieldType::IntEnum(&[0, 1])),
            Field::optional("labels", FieldType::map(FieldType::string_len(1, 64))),
            Field::optional(
                "upstream",
                FieldType::object(vec![
                    Field::required("type", FieldType::Enum(&["roundrobin", "chash"])),
                    Field::optional("nodes", FieldType::array(FieldType::Object(node_schema()))),
                ]),
            ),
        ])
        .at_least_one(&["uri", "uris"])
    }

    fn run(value: &Value, mode: Mode) -> Vec<Violation> {
        let mut out = Vec::new();
        check_object(&schema(), value.as_object().unwrap(), "", mode, &mut out);
        out
    }

    #[test]
    fn collects_all_violations_with_dotted_paths() {
        let input = json!({
            "remote_addr": "example.com",
            "status": 2,
            "upstream": {
                "type": "random",
                "nodes": [{ "host": "a", "weight": 1 }, { "host": "", "port": 0 }]
            }
        });
        let paths: Vec<String> = run(&input, Mode::Full).into_iter().map(|v| v.path).collect();
        assert_eq!(
            paths,
            vec![
                "remote_addr",
                "status",
                "upstream.type",
                "upstream.nodes[1].host",
                "upstream.nodes[1].port",
                "upstream.nodes[1].weight",
                "",
            ]
        );
    }

    #[test]
    fn unknown_fields_pass_through() {
        let input = json!({ "uri": "/a", "x-custom": { "anything": [1, 2] } });
        assert!(run(&input, Mode::Full).is_empty());
    }

    #[test]
    fn patch_mode_allows_nulls_and_skips_required() {
        let input = json!({
            "uri": null,
            "labels": { "env": null },
            "upstream": { "nodes": null }
        });
        assert!(run(&input, Mode::Patch).is_empty());
        assert!(!run(&input, Mode::Full).is_empty());
    }

    #[test]
    fn patch_mode_still_type_checks_present_values() {
        let input = json!({ "upstream": { "type": 5 } });
        let violations = run(&input, Mode::Patch);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "upstream.type");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier(&json!("route-1.a_b")));
        assert!(is_identifier(&json!(42)));
        assert!(!is_identifier(&json!(0)));
        assert!(!is_identifier(&json!("has space")));
        assert!(!is_identifier(&json!("x".repeat(65))));
        assert!(!is_identifier(&json!(true)));
    }
}
