use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::property::{PropertyValue, PropertyValueType};

/// The immutable schema of one property: its value type, an optional default, whether values may
/// change after they are first assigned, and whether assignment times are recorded.
///
/// A property without a default must be given a value explicitly for every entity that owns it,
/// both when the property is defined and whenever a new entity is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    value_type: PropertyValueType,
    default_value: Option<PropertyValue>,
    mutable: bool,
    time_tracked: bool,
}

impl PropertyDefinition {
    #[must_use]
    pub fn builder() -> PropertyDefinitionBuilder {
        PropertyDefinitionBuilder::default()
    }

    #[must_use]
    pub fn value_type(&self) -> &PropertyValueType {
        &self.value_type
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&PropertyValue> {
        self.default_value.as_ref()
    }

    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    #[must_use]
    pub fn is_time_tracked(&self) -> bool {
        self.time_tracked
    }

    /// Re-checks a definition that did not come from the builder (e.g. one read from a file).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeMismatch`] if the default value does not match the type.
    pub fn validate(&self) -> Result<(), StoreError> {
        match &self.default_value {
            Some(default_value) => self.value_type.check(default_value),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct PropertyDefinitionBuilder {
    value_type: Option<PropertyValueType>,
    default_value: Option<PropertyValue>,
    mutable: bool,
    time_tracked: bool,
}

impl Default for PropertyDefinitionBuilder {
    fn default() -> Self {
        Self {
            value_type: None,
            default_value: None,
            mutable: true,
            time_tracked: false,
        }
    }
}

impl PropertyDefinitionBuilder {
    #[must_use]
    pub fn value_type(mut self, value_type: PropertyValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    #[must_use]
    pub fn default_value(mut self, default_value: PropertyValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    #[must_use]
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    #[must_use]
    pub fn time_tracked(mut self, time_tracked: bool) -> Self {
        self.time_tracked = time_tracked;
        self
    }

    /// # Errors
    ///
    /// - [`StoreError::NullArgument`] if no value type was given.
    /// - [`StoreError::TypeMismatch`] if the default value does not match the value type.
    pub fn build(self) -> Result<PropertyDefinition, StoreError> {
        let value_type = self
            .value_type
            .ok_or(StoreError::NullArgument("property value type"))?;
        let definition = PropertyDefinition {
            value_type,
            default_value: self.default_value,
            mutable: self.mutable,
            time_tracked: self.time_tracked,
        };
        definition.validate()?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let definition = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .build()
            .unwrap();
        assert!(definition.is_mutable());
        assert!(!definition.is_time_tracked());
        assert_eq!(definition.default_value(), None);
    }

    #[test]
    fn builder_requires_value_type() {
        assert!(matches!(
            PropertyDefinition::builder().build(),
            Err(StoreError::NullArgument(_))
        ));
    }

    #[test]
    fn default_must_match_type() {
        let result = PropertyDefinition::builder()
            .value_type(PropertyValueType::Boolean)
            .default_value(PropertyValue::Int(1))
            .build();
        assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
    }

    #[test]
    fn deserialized_definitions_can_be_validated() {
        let json = r#"{
            "value_type": "Double",
            "default_value": {"Int": 2},
            "mutable": true,
            "time_tracked": false
        }"#;
        let definition: PropertyDefinition = serde_json::from_str(json).unwrap();
        assert!(matches!(
            definition.validate(),
            Err(StoreError::TypeMismatch { .. })
        ));
    }
}
