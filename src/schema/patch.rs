//! Three-state patch values.
//!
//! A patch field is either absent (leave unchanged), explicitly `null`
//! (clear it) or present with a new value. Serde's `Option` collapses the
//! first two, so patches carry their own type.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One field of a partial update.
///
/// Use with `#[serde(default, skip_serializing_if = "Patch::is_absent")]`
/// on struct fields: a missing key deserializes to `Absent`, `null` to
/// `Null`, anything else to `Present`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Not mentioned; remote value stays as is
    #[default]
    Absent,
    /// Explicit `null`; remote value is cleared
    Null,
    /// New value
    Present(T),
}

impl<T> Patch<T> {
    /// Field was not supplied
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Field was supplied as `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the contents
    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Present(v) => Patch::Present(v),
        }
    }

    /// Map the present value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Present(v) => Patch::Present(f(v)),
        }
    }
}

impl Patch<Value> {
    /// Classify an optional JSON value (`None` = key missing)
    #[must_use]
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None => Self::Absent,
            Some(Value::Null) => Self::Null,
            Some(v) => Self::Present(v.clone()),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Only reached when the caller forgot `skip_serializing_if`
            Self::Absent | Self::Null => serializer.serialize_none(),
            Self::Present(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => Self::Null,
            Some(v) => Self::Present(v),
        })
    }
}

/// Validated partial update for one resource.
///
/// Holds every declared field of the resource (absent ones included) in
/// schema order, followed by any undeclared fields the caller supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchDocument {
    entries: Vec<(String, Patch<Value>)>,
}

impl PatchDocument {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: Patch<Value>) {
        self.entries.push((name.into(), value));
    }

    /// State of `name`; fields never recorded are `Absent`
    #[must_use]
    pub fn get(&self, name: &str) -> Patch<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map_or(Patch::Absent, |(_, v)| v.as_ref())
    }

    /// All recorded fields, absent ones included
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Patch<Value>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields that will be sent
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|(_, v)| !v.is_absent()).count()
    }

    /// Nothing will be sent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request body: absent fields omitted, nulls kept
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        for (name, value) in &self.entries {
            match value {
                Patch::Absent => {}
                Patch::Null => {
                    body.insert(name.clone(), Value::Null);
                }
                Patch::Present(v) => {
                    body.insert(name.clone(), v.clone());
                }
            }
        }
        Value::Object(body)
    }
}

impl Serialize for PatchDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in &self.entries {
            if !value.is_absent() {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize)]
    struct RoutePatch {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        desc: Patch<String>,
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        priority: Patch<i64>,
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        uri: Patch<String>,
    }

    #[test]
    fn struct_fields_keep_three_states() {
        let patch: RoutePatch =
            serde_json::from_value(json!({ "desc": null, "priority": 3 })).unwrap();
        assert_eq!(patch.desc, Patch::Null);
        assert_eq!(patch.priority, Patch::Present(3));
        assert_eq!(patch.uri, Patch::Absent);

        let back = serde_json::to_value(&patch).unwrap();
        assert_eq!(back, json!({ "desc": null, "priority": 3 }));
    }

    #[test]
    fn document_body_omits_absent_and_keeps_null() {
        let mut doc = PatchDocument::new();
        doc.push("name", Patch::Absent);
        doc.push("desc", Patch::Null);
        doc.push("uri", Patch::Present(json!("/v2")));

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("desc"), Patch::Null);
        assert_eq!(doc.get("name"), Patch::Absent);
        assert_eq!(doc.get("never-declared"), Patch::Absent);
        assert_eq!(doc.to_body(), json!({ "desc": null, "uri": "/v2" }));
        assert_eq!(serde_json::to_value(&doc).unwrap(), doc.to_body());
    }

    #[test]
    fn from_json_classifies() {
        assert_eq!(Patch::from_json(None), Patch::Absent);
        assert_eq!(Patch::from_json(Some(&Value::Null)), Patch::Null);
        assert_eq!(
            Patch::from_json(Some(&json!(1))),
            Patch::Present(json!(1))
        );
    }
}
