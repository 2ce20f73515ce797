/*!

Property values and value types.

A [`PropertyValue`] is one of a closed set of kinds. Each kind has a memory-compact container
(see [`crate::property::containers`]) so that a property over millions of entities costs a few
bits or bytes per entity instead of a boxed value.

*/

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    /// The name of one variant of the property's [`EnumDomain`].
    Enum(String),
    Object(serde_json::Value),
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The named, ordered set of variants an enum property may take. Values are stored by ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumDomain {
    name: String,
    variants: Vec<String>,
}

impl EnumDomain {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    #[must_use]
    pub fn ordinal(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    #[must_use]
    pub fn variant(&self, ordinal: usize) -> Option<&str> {
        self.variants.get(ordinal).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyValueType {
    Boolean,
    Int,
    Float,
    Double,
    Enum(EnumDomain),
    Object,
}

impl Display for PropertyValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValueType::Boolean => write!(f, "Boolean"),
            PropertyValueType::Int => write!(f, "Int"),
            PropertyValueType::Float => write!(f, "Float"),
            PropertyValueType::Double => write!(f, "Double"),
            PropertyValueType::Enum(domain) => write!(f, "Enum({})", domain.name),
            PropertyValueType::Object => write!(f, "Object"),
        }
    }
}

impl PropertyValueType {
    /// Whether `value` may be stored in a property of this type. Enum values must name a variant
    /// of the domain.
    #[must_use]
    pub fn is_compatible(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (PropertyValueType::Boolean, PropertyValue::Boolean(_))
            | (PropertyValueType::Int, PropertyValue::Int(_))
            | (PropertyValueType::Float, PropertyValue::Float(_))
            | (PropertyValueType::Double, PropertyValue::Double(_))
            | (PropertyValueType::Object, PropertyValue::Object(_)) => true,
            (PropertyValueType::Enum(domain), PropertyValue::Enum(variant)) => {
                domain.ordinal(variant).is_some()
            }
            _ => false,
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::TypeMismatch`] if `value` is not compatible with this type.
    pub fn check(&self, value: &PropertyValue) -> Result<(), StoreError> {
        if self.is_compatible(value) {
            Ok(())
        } else {
            Err(self.mismatch(value))
        }
    }

    pub(crate) fn mismatch(&self, value: &PropertyValue) -> StoreError {
        StoreError::TypeMismatch {
            expected: self.clone(),
            found: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> EnumDomain {
        EnumDomain::new("Color", ["Red", "Green", "Blue"])
    }

    #[test]
    fn enum_domain_ordinals() {
        let domain = colors();
        assert_eq!(domain.ordinal("Green"), Some(1));
        assert_eq!(domain.ordinal("Purple"), None);
        assert_eq!(domain.variant(2), Some("Blue"));
        assert_eq!(domain.variant(3), None);
    }

    #[test]
    fn compatibility() {
        assert!(PropertyValueType::Int.is_compatible(&PropertyValue::Int(3)));
        assert!(!PropertyValueType::Int.is_compatible(&PropertyValue::Double(3.0)));
        assert!(!PropertyValueType::Float.is_compatible(&PropertyValue::Double(1.0)));
        assert!(PropertyValueType::Object.is_compatible(&PropertyValue::Object(
            serde_json::json!({"beds": 12})
        )));

        let color = PropertyValueType::Enum(colors());
        assert!(color.is_compatible(&PropertyValue::Enum("Red".to_string())));
        assert!(!color.is_compatible(&PropertyValue::Enum("Purple".to_string())));
        assert!(matches!(
            color.check(&PropertyValue::Int(0)),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn values_serialize_with_their_kind() {
        let json = serde_json::to_string(&PropertyValue::Int(5)).unwrap();
        assert_eq!(json, r#"{"Int":5}"#);
        let value: PropertyValue = serde_json::from_str(r#"{"Enum":"Blue"}"#).unwrap();
        assert_eq!(value, PropertyValue::Enum("Blue".to_string()));
    }

    #[test]
    fn type_display() {
        assert_eq!(PropertyValueType::Double.to_string(), "Double");
        assert_eq!(PropertyValueType::Enum(colors()).to_string(), "Enum(Color)");
    }
}
