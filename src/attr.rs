//! Attribute system for abstract elements
//!
//! - `AttrValue`: JSON-shaped attribute value (string, number, bool, null, object)
//! - `Attrs`: ordered `Vec<(String, AttrValue)>` with case-insensitive lookups
//! - `AttrSerializer`: canonical string form of a value, shared by diff and patch
//!
//! Attribute order is the order of the list. The diff engine walks attributes
//! in list order, so it is part of the edit script's observable output.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::AttrError;

/// Attribute value as carried by abstract elements.
///
/// `Value::Null` on a modify operation means "remove the attribute".
pub type AttrValue = serde_json::Value;

/// Element attributes as ordered name/value pairs
///
/// Names keep their original spelling; lookups ignore ASCII case.
pub type Attrs = Vec<(String, AttrValue)>;

/// Extension trait for attribute operations on Attrs
pub trait AttrsExt {
    /// Get an attribute value by name (case-insensitive)
    fn get_attr(&self, name: &str) -> Option<&AttrValue>;

    /// Find the stored spelling and value of an attribute (case-insensitive)
    fn find_attr(&self, name: &str) -> Option<(&str, &AttrValue)>;

    /// Check if an attribute exists (case-insensitive)
    fn has_attr(&self, name: &str) -> bool;

    /// Set an attribute value (insert or update, keeping the stored spelling)
    fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>);

    /// Remove an attribute by name, returning the old value if present
    fn remove_attr(&mut self, name: &str) -> Option<AttrValue>;
}

impl AttrsExt for Attrs {
    fn get_attr(&self, name: &str) -> Option<&AttrValue> {
        self.find_attr(name).map(|(_, v)| v)
    }

    fn find_attr(&self, name: &str) -> Option<(&str, &AttrValue)> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, v)| (k.as_str(), v))
    }

    fn has_attr(&self, name: &str) -> bool {
        self.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(attr) = self.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            attr.1 = value;
        } else {
            self.push((name, value));
        }
    }

    fn remove_attr(&mut self, name: &str) -> Option<AttrValue> {
        self.iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|pos| self.remove(pos).1)
    }
}

/// Order-insensitive comparison of two attribute lists.
pub(crate) fn attrs_equivalent(a: &Attrs, b: &Attrs) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get_attr(k) == Some(v))
}

// =============================================================================
// Serializers
// =============================================================================

/// Converts attribute values to their canonical string form.
///
/// `Ok(None)` means the attribute is absent: the patch engine removes or
/// omits it. The diff engine only compares serialized forms for equality.
pub trait AttrSerializer {
    /// Serialize a value, `None` meaning "no attribute"
    fn serialize(&self, value: &AttrValue) -> Result<Option<String>, AttrError>;
}

impl<F> AttrSerializer for F
where
    F: Fn(&AttrValue) -> Result<Option<String>, AttrError>,
{
    fn serialize(&self, value: &AttrValue) -> Result<Option<String>, AttrError> {
        self(value)
    }
}

/// Plain string coercion. Every value has a string form, including null.
///
/// This is the diff engine's default comparison policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSerializer;

impl AttrSerializer for PlainSerializer {
    fn serialize(&self, value: &AttrValue) -> Result<Option<String>, AttrError> {
        Ok(Some(match value {
            AttrValue::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }
}

/// HTML attribute policy used when writing to a live tree.
///
/// - `true` -> `""` (present, valueless)
/// - `false`, `null` -> `None` (absent)
/// - strings as-is, numbers in decimal
/// - arrays and objects as compact JSON, keys in insertion order
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSerializer;

impl AttrSerializer for HtmlSerializer {
    fn serialize(&self, value: &AttrValue) -> Result<Option<String>, AttrError> {
        Ok(match value {
            AttrValue::Null | AttrValue::Bool(false) => None,
            AttrValue::Bool(true) => Some(String::new()),
            AttrValue::String(s) => Some(s.clone()),
            AttrValue::Number(n) => Some(n.to_string()),
            other @ (AttrValue::Array(_) | AttrValue::Object(_)) => Some(other.to_string()),
        })
    }
}

/// String form of an attribute used as an identity key.
///
/// Null counts as absent so the next fallback key is consulted.
pub(crate) fn key_string(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::Null => None,
        AttrValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// =============================================================================
// Serde: attributes as an ordered JSON object
// =============================================================================

pub(crate) mod serde_attrs {
    use super::*;

    pub fn serialize<S: Serializer>(attrs: &Attrs, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(attrs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Attrs, D::Error> {
        deserializer.deserialize_map(AttrsVisitor)
    }

    struct AttrsVisitor;

    impl<'de> Visitor<'de> for AttrsVisitor {
        type Value = Attrs;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of attribute names to values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Attrs, A::Error> {
            let mut attrs = Attrs::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, value)) = map.next_entry::<String, AttrValue>()? {
                attrs.push((name, value));
            }
            Ok(attrs)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attrs_operations() {
        let mut attrs: Attrs = Vec::new();

        // Set
        attrs.set_attr("id", "main");
        attrs.set_attr("Width", 3);
        assert_eq!(attrs.len(), 2);

        // Get ignores case
        assert_eq!(attrs.get_attr("ID"), Some(&json!("main")));
        assert_eq!(attrs.get_attr("width"), Some(&json!(3)));
        assert_eq!(attrs.get_attr("href"), None);
        assert_eq!(attrs.find_attr("WIDTH").map(|(k, _)| k), Some("Width"));

        // Update keeps stored spelling
        attrs.set_attr("width", 20);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1], ("Width".to_string(), json!(20)));

        // Remove
        assert_eq!(attrs.remove_attr("Id"), Some(json!("main")));
        assert!(!attrs.has_attr("id"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_attrs_equivalent_ignores_order() {
        let a: Attrs = vec![("a".into(), json!("1")), ("b".into(), json!("2"))];
        let b: Attrs = vec![("B".into(), json!("2")), ("a".into(), json!("1"))];
        let c: Attrs = vec![("a".into(), json!("1"))];
        assert!(attrs_equivalent(&a, &b));
        assert!(!attrs_equivalent(&a, &c));
    }

    #[test]
    fn test_html_serializer_contract() {
        let s = HtmlSerializer;
        assert_eq!(s.serialize(&json!(true)).unwrap(), Some(String::new()));
        assert_eq!(s.serialize(&json!(false)).unwrap(), None);
        assert_eq!(s.serialize(&json!(null)).unwrap(), None);
        assert_eq!(s.serialize(&json!("x")).unwrap(), Some("x".to_string()));
        assert_eq!(s.serialize(&json!(5)).unwrap(), Some("5".to_string()));
        assert_eq!(s.serialize(&json!(1.5)).unwrap(), Some("1.5".to_string()));
        assert_eq!(
            s.serialize(&json!({"lala": null})).unwrap(),
            Some("{\"lala\":null}".to_string())
        );
    }

    #[test]
    fn test_plain_serializer_coerces_everything() {
        let s = PlainSerializer;
        assert_eq!(s.serialize(&json!(null)).unwrap(), Some("null".to_string()));
        assert_eq!(s.serialize(&json!(true)).unwrap(), Some("true".to_string()));
        assert_eq!(s.serialize(&json!("3")).unwrap(), s.serialize(&json!(3)).unwrap());
    }

    #[test]
    fn test_closure_serializer() {
        let refuse = |_: &AttrValue| -> Result<Option<String>, AttrError> {
            Err(AttrError::unserializable("nope"))
        };
        assert!(refuse.serialize(&json!(1)).is_err());
    }
}
