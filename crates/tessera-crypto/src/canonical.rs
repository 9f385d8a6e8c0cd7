//! Canonical byte serialization.
//!
//! Every signature and digest in Tessera is computed over `CanonicalBytes`.
//! The pipeline is:
//!
//! 1. serialize the value to a JSON tree (`serde_json::Value`);
//! 2. drop the excluded top-level members (a document's own proof or digest);
//! 3. emit RFC 8785 JCS: keys sorted by UTF-16 code units at every level,
//!    no insignificant whitespace, ECMAScript number formatting, UTF-8.
//!
//! Maps whose keys cannot become strings fail in step 1. Non-finite floats
//! cannot appear because serde_json has no representation for them.

use serde::Serialize;
use serde_json::Value;

use crate::error::CryptoError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// The inner buffer is private: the only way to obtain one is through
/// [`CanonicalBytes::new`] or [`CanonicalBytes::excluding`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize a whole value.
    pub fn new<T: Serialize + ?Sized>(obj: &T) -> Result<Self, CryptoError> {
        Self::excluding(obj, &[])
    }

    /// Canonicalize a value with the named top-level fields removed.
    ///
    /// Excluding fields from anything but a JSON object is an error, since
    /// the caller clearly expected a document.
    pub fn excluding<T>(obj: &T, exclude: &[&str]) -> Result<Self, CryptoError>
    where
        T: Serialize + ?Sized,
    {
        let mut value = serde_json::to_value(obj)?;
        if !exclude.is_empty() {
            match &mut value {
                Value::Object(map) => {
                    for field in exclude {
                        map.remove(*field);
                    }
                }
                _ => {
                    return Err(CryptoError::Canonicalization(format!(
                        "cannot exclude fields {:?} from a non-object value",
                        exclude
                    )))
                }
            }
        }
        let bytes = serde_jcs::to_vec(&value)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// `canonicalize(value, exclude) -> bytes`.
pub fn canonicalize<T>(obj: &T, exclude: &[&str]) -> Result<Vec<u8>, CryptoError>
where
    T: Serialize + ?Sized,
{
    CanonicalBytes::excluding(obj, exclude).map(CanonicalBytes::into_vec)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            (-1.0e6f64..1.0e6f64).prop_map(|f| serde_json::json!(f)),
            "[a-zA-Z0-9_ ]{0,20}".prop_map(Value::String),
        ]
    }

    fn json_value() -> impl Strategy<Value = Value> {
        json_leaf().prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Rebuild every object with its members inserted in reverse order.
    fn reverse_insertion(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.reverse();
                let mut out = serde_json::Map::new();
                for (k, v) in entries {
                    out.insert(k.clone(), reverse_insertion(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(reverse_insertion).collect()),
            other => other.clone(),
        }
    }

    proptest! {
        #[test]
        fn canonical_bytes_deterministic(value in json_value()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonical_bytes_ignore_insertion_order(value in json_value()) {
            let reordered = reverse_insertion(&value);
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&reordered).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonical_bytes_valid_json(value in json_value()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok());
        }
    }
}
