//! Canonical JSON encoding.
//!
//! UTF-8 output, object keys sorted lexicographically on raw code
//! points, `,`/`:` separators with no surrounding whitespace, non-ASCII
//! code points preserved, no trailing newline. `serde_json::Value`'s
//! object representation is a `BTreeMap` (this workspace never enables
//! `preserve_order`), so ordinary `to_string` already sorts keys; we
//! only need to make sure the serializer doesn't escape non-ASCII.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CryptoError, CryptoResult};

/// Canonical JSON string for an already-constructed `Value`.
pub fn canonical_json(value: &Value) -> CryptoResult<String> {
    serde_json::to_string(value).map_err(CryptoError::from)
}

/// Canonical JSON string for any serializable payload.
pub fn canonical_json_of<T: Serialize>(value: &T) -> CryptoResult<String> {
    let v = serde_json::to_value(value)?;
    canonical_json(&v)
}

/// Canonical JSON bytes, the form hashed and signed over.
pub fn canonical_json_bytes(value: &Value) -> CryptoResult<Vec<u8>> {
    Ok(canonical_json(value)?.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys() {
        let v = json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&v).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn no_whitespace() {
        let v = json!({"a": [1, 2, 3], "b": {"c": true, "d": null}});
        assert_eq!(
            canonical_json(&v).unwrap(),
            r#"{"a":[1,2,3],"b":{"c":true,"d":null}}"#
        );
    }

    #[test]
    fn preserves_non_ascii() {
        let v = json!({"name": "Jos\u{e9}"});
        let out = canonical_json(&v).unwrap();
        assert!(out.contains('\u{e9}'));
        assert!(!out.contains("\\u00e9"));
    }

    #[test]
    fn empty_object() {
        assert_eq!(canonical_json(&json!({})).unwrap(), "{}");
    }
}
