//! Canonical byte encoding: the single serialization-for-hashing path.
//!
//! Every fingerprint in chainproof is computed over bytes produced here.
//!
//! # Encoding rules (version 1)
//!
//! Each value is a one-byte tag followed by a body. Lengths and counts are
//! `u64` big-endian.
//!
//! | value      | tag    | body                                              |
//! |------------|--------|---------------------------------------------------|
//! | null       | `0x00` | none                                              |
//! | bool       | `0x01` | `0x00` or `0x01`                                  |
//! | negative   | `0x02` | `i64` big-endian                                  |
//! | unsigned   | `0x03` | `u64` big-endian                                  |
//! | float      | `0x04` | binary64 bits big-endian, `-0.0` written as `0.0` |
//! | string     | `0x05` | byte length, then UTF-8 bytes                     |
//! | sequence   | `0x06` | element count, then elements                      |
//! | mapping    | `0x07` | entry count, then (string key, value) pairs sorted by key bytes |
//!
//! Integers and floats never share an encoding, so `1` and `1.0` differ.
//! A non-negative integer always takes the unsigned form regardless of the
//! Rust type it came from.

use crate::error::{CoreResult, EncodingError};
use crate::lower;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Version of the encoding table above
pub const CANON_VERSION: u32 = 1;

/// Default nesting limit for canonical encoding
pub const DEFAULT_MAX_DEPTH: usize = 128;

mod tag {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const NEG_INT: u8 = 0x02;
    pub const UINT: u8 = 0x03;
    pub const FLOAT: u8 = 0x04;
    pub const STRING: u8 = 0x05;
    pub const SEQUENCE: u8 = 0x06;
    pub const MAPPING: u8 = 0x07;
}

/// Canonical encoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonConfig {
    /// Maximum number of nested containers
    pub max_depth: usize,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CanonConfig {
    /// Encode any serializable value
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be lowered or is nested too deeply
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CoreResult<Vec<u8>> {
        let lowered = lower::to_value(value, self.max_depth)?;
        self.encode_value(&lowered)
    }

    /// Encode a value already in the JSON data model
    ///
    /// # Errors
    ///
    /// Returns error if the value is nested too deeply
    pub fn encode_value(&self, value: &Value) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        write_value(&mut buf, value, 0, self.max_depth)?;
        Ok(buf)
    }
}

/// Canonical bytes of a value with the default configuration
///
/// # Errors
///
/// Returns error if the value cannot be canonically encoded
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> CoreResult<Vec<u8>> {
    CanonConfig::default().encode(value)
}

fn enter(depth: usize, limit: usize) -> CoreResult<usize> {
    if depth >= limit {
        return Err(EncodingError::DepthExceeded { limit });
    }
    Ok(depth + 1)
}

fn write_value(buf: &mut Vec<u8>, value: &Value, depth: usize, limit: usize) -> CoreResult<()> {
    match value {
        Value::Null => buf.push(tag::NULL),
        Value::Bool(b) => {
            buf.push(tag::BOOL);
            buf.push(u8::from(*b));
        }
        Value::Number(n) => write_number(buf, n)?,
        Value::String(s) => write_str(buf, s),
        Value::Array(items) => {
            let depth = enter(depth, limit)?;
            buf.push(tag::SEQUENCE);
            write_len(buf, items.len());
            for item in items {
                write_value(buf, item, depth, limit)?;
            }
        }
        Value::Object(map) => {
            let depth = enter(depth, limit)?;
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            buf.push(tag::MAPPING);
            write_len(buf, entries.len());
            for (key, item) in entries {
                write_str(buf, key);
                write_value(buf, item, depth, limit)?;
            }
        }
    }
    Ok(())
}

fn write_number(buf: &mut Vec<u8>, n: &Number) -> CoreResult<()> {
    if let Some(u) = n.as_u64() {
        buf.push(tag::UINT);
        buf.extend_from_slice(&u.to_be_bytes());
    } else if let Some(i) = n.as_i64() {
        buf.push(tag::NEG_INT);
        buf.extend_from_slice(&i.to_be_bytes());
    } else if let Some(f) = n.as_f64() {
        buf.extend_from_slice(&canonical_f64(f)?);
    } else {
        return Err(EncodingError::Unserializable {
            reason: format!("unrepresentable number {n}"),
        });
    }
    Ok(())
}

/// Tagged encoding of a float
///
/// # Errors
///
/// Returns error for NaN and infinities
pub fn canonical_f64(f: f64) -> CoreResult<[u8; 9]> {
    if !f.is_finite() {
        return Err(EncodingError::NonFinite {
            value: format!("{f:?}"),
        });
    }
    let f = if f == 0.0 { 0.0 } else { f };
    let mut out = [0u8; 9];
    out[0] = tag::FLOAT;
    out[1..].copy_from_slice(&f.to_bits().to_be_bytes());
    Ok(out)
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(tag::STRING);
    write_len(buf, s.len());
    buf.extend_from_slice(s.as_bytes());
}

fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u64).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn enc(value: &Value) -> Vec<u8> {
        CanonConfig::default().encode_value(value).unwrap()
    }

    #[test]
    fn test_scalar_layout() {
        assert_eq!(enc(&json!(null)), vec![0x00]);
        assert_eq!(enc(&json!(true)), vec![0x01, 0x01]);
        assert_eq!(enc(&json!(3)), vec![0x03, 0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(enc(&json!(-1)), vec![0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(enc(&json!("hi")), vec![0x05, 0, 0, 0, 0, 0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_zero_and_string_zero_differ() {
        assert_ne!(enc(&json!(0)), enc(&json!("0")));
        assert_ne!(enc(&json!(1)), enc(&json!(1.0)));
        assert_ne!(enc(&json!(null)), enc(&json!(false)));
        assert_ne!(enc(&json!([])), enc(&json!({})));
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(enc(&json!(-0.0)), enc(&json!(0.0)));
    }

    #[test]
    fn test_signedness_of_source_type_irrelevant() {
        let a = canonical_bytes(&5i64).unwrap();
        let b = canonical_bytes(&5u8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"offset": 2, "scale": {"x": 1, "y": 2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"scale": {"y": 2, "x": 1}, "offset": 2}"#).unwrap();
        assert_eq!(enc(&a), enc(&b));
    }

    #[test]
    fn test_sequence_order_matters() {
        assert_ne!(enc(&json!([1, 2])), enc(&json!([2, 1])));
    }

    #[test]
    fn test_string_boundaries_unambiguous() {
        // Without length prefixes these would both read "abc".
        assert_ne!(enc(&json!(["ab", "c"])), enc(&json!(["a", "bc"])));
    }

    #[test]
    fn test_depth_exceeded() {
        let config = CanonConfig { max_depth: 1 };
        assert!(config.encode_value(&json!([1])).is_ok());
        assert_eq!(
            config.encode_value(&json!([[1]])).unwrap_err(),
            EncodingError::DepthExceeded { limit: 1 }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(canonical_bytes(&f64::NEG_INFINITY).is_err());
        assert!(canonical_f64(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn prop_encode_deterministic(keys in proptest::collection::vec("[a-z]{1,6}", 0..8), n in any::<i64>()) {
            let mut map = serde_json::Map::new();
            for (i, k) in keys.iter().enumerate() {
                map.insert(k.clone(), json!(n.wrapping_add(i as i64)));
            }
            let value = Value::Object(map);
            prop_assert_eq!(enc(&value), enc(&value.clone()));
        }

        #[test]
        fn prop_insertion_order_irrelevant(entries in proptest::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..8)) {
            let mut forward = serde_json::Map::new();
            for (k, v) in &entries {
                forward.insert(k.clone(), json!(v));
            }
            let mut backward = serde_json::Map::new();
            for (k, v) in entries.iter().rev() {
                backward.insert(k.clone(), json!(v));
            }
            prop_assert_eq!(enc(&Value::Object(forward)), enc(&Value::Object(backward)));
        }

        #[test]
        fn prop_distinct_strings_distinct_bytes(a in ".{0,12}", b in ".{0,12}") {
            prop_assume!(a != b);
            prop_assert_ne!(enc(&json!(a)), enc(&json!(b)));
        }
    }
}
