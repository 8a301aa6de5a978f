//! An ordered JSON tree. Unlike [`serde_json::Value`], objects keep every member in the order it
//! was read, so a key that appears twice in the text appears twice in the tree.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JsonValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<JsonValue>),
    Object(JsonObject),
}

/// The members of a JSON object, in text order.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct JsonObject {
    members: Vec<(String, JsonValue)>,
}

impl JsonValue {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "a boolean",
            JsonValue::Number(_) => "a number",
            JsonValue::String(_) => "a string",
            JsonValue::Array(_) => "an array",
            JsonValue::Object(_) => "an object",
        }
    }

    fn into_value(self) -> Result<Value> {
        Ok(match self {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(values) => Value::Array(
                values
                    .into_iter()
                    .map(JsonValue::into_value)
                    .collect::<Result<_>>()?,
            ),
            JsonValue::Object(obj) => Value::Object(obj.into_map()?),
        })
    }
}

impl JsonObject {
    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the first member with the given key.
    pub(crate) fn get(&self, key: &str) -> Option<&JsonValue> {
        self.members.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes and returns the first member with the given key.
    pub(crate) fn remove(&mut self, key: &str) -> Option<JsonValue> {
        let index = self.members.iter().position(|(k, _)| k == key)?;
        Some(self.members.remove(index).1)
    }

    /// Converts this object into a [`serde_json::Map`]. A key that appears more than once, at
    /// any depth, is an error.
    pub(crate) fn into_map(self) -> Result<Map<String, Value>> {
        let mut map = Map::with_capacity(self.members.len());
        for (key, value) in self.members {
            if map.contains_key(&key) {
                return Err(Error::malformed_json(format!(
                    "duplicate key {:?} in extended JSON wrapper",
                    key
                )));
            }
            let value = value.into_value()?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl IntoIterator for JsonObject {
    type Item = (String, JsonValue);
    type IntoIter = std::vec::IntoIter<(String, JsonValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => JsonValue::Number(n),
            Value::String(s) => JsonValue::String(s),
            Value::Array(values) => JsonValue::Array(values.into_iter().map(Into::into).collect()),
            Value::Object(map) => JsonValue::Object(map.into()),
        }
    }
}

impl From<Map<String, Value>> for JsonObject {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            members: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

struct JsonValueVisitor;

impl<'de> Deserialize<'de> for JsonValue {
    #[inline]
    fn deserialize<D>(deserializer: D) -> std::result::Result<JsonValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any valid JSON value")
    }

    #[inline]
    fn visit_bool<E>(self, value: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Bool(value))
    }

    #[inline]
    fn visit_i64<E>(self, value: i64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(value.into()))
    }

    #[inline]
    fn visit_u64<E>(self, value: u64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(value.into()))
    }

    #[inline]
    fn visit_f64<E>(self, value: f64) -> std::result::Result<JsonValue, E>
    where
        E: de::Error,
    {
        Number::from_f64(value)
            .map(JsonValue::Number)
            .ok_or_else(|| E::custom(format!("number {} is not finite", value)))
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(value.to_string()))
    }

    #[inline]
    fn visit_string<E>(self, value: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(value))
    }

    #[inline]
    fn visit_none<E>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    #[inline]
    fn visit_some<D>(self, deserializer: D) -> std::result::Result<JsonValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    #[inline]
    fn visit_unit<E>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    #[inline]
    fn visit_seq<V>(self, mut visitor: V) -> std::result::Result<JsonValue, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut values: Vec<JsonValue> = Vec::with_capacity(visitor.size_hint().unwrap_or(0));
        while let Some(elem) = visitor.next_element()? {
            values.push(elem);
        }
        Ok(JsonValue::Array(values))
    }

    #[inline]
    fn visit_map<V>(self, mut visitor: V) -> std::result::Result<JsonValue, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut members: Vec<(String, JsonValue)> =
            Vec::with_capacity(visitor.size_hint().unwrap_or(0));
        while let Some((key, value)) = visitor.next_entry()? {
            members.push((key, value));
        }
        Ok(JsonValue::Object(JsonObject { members }))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{JsonObject, JsonValue};

    fn object(text: &str) -> JsonObject {
        match serde_json::from_str::<JsonValue>(text).unwrap() {
            JsonValue::Object(obj) => obj,
            other => panic!("expected an object, got {:?}", other),
        }
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        let obj = object(r#"{"k": 1, "j": true, "k": [null, "x"]}"#);
        let keys: Vec<_> = obj.clone().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["k", "j", "k"]);
        assert_eq!(obj.get("k"), Some(&JsonValue::Number(1.into())));
    }

    #[test]
    fn remove_takes_the_first_member() {
        let mut obj = object(r#"{"a": 1, "b": 2, "a": 3}"#);
        assert_eq!(obj.remove("a"), Some(JsonValue::Number(1.into())));
        assert_eq!(obj.get("a"), Some(&JsonValue::Number(3.into())));
        assert_eq!(obj.remove("missing"), None);
    }

    #[test]
    fn maps_reject_repeated_keys() {
        assert_eq!(
            object(r#"{"t": 1, "i": {"x": [2]}}"#).into_map().unwrap(),
            json!({ "t": 1, "i": { "x": [2] } }).as_object().unwrap().clone()
        );
        assert!(object(r#"{"t": 1, "t": 2}"#)
            .into_map()
            .unwrap_err()
            .is_malformed_json());
        assert!(object(r#"{"outer": {"t": 1, "t": 2}}"#)
            .into_map()
            .unwrap_err()
            .is_malformed_json());
    }

    #[test]
    fn converts_from_serde_json() {
        let value = JsonValue::from(json!({ "a": [1, 2.5, "s", null, false] }));
        assert_eq!(value.type_name(), "an object");
        let expected = object(r#"{"a": [1, 2.5, "s", null, false]}"#);
        assert_eq!(value, JsonValue::Object(expected));
    }
}
