use crate::error::StoreError;
use crate::property::containers::{grow_to, ValueContainer};
use crate::property::{PropertyDefinition, PropertyValue, PropertyValueType};

/// A contiguous array of primitive values with a default for unwritten slots.
#[derive(Debug, Clone)]
pub struct DenseValueContainer<V: Copy> {
    values: Vec<V>,
    default_value: V,
}

pub type FloatValueContainer = DenseValueContainer<f32>;
pub type DoubleValueContainer = DenseValueContainer<f64>;

impl<V: Copy> DenseValueContainer<V> {
    #[must_use]
    pub fn new(default_value: V, capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            default_value,
        }
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> V {
        self.values.get(slot).copied().unwrap_or(self.default_value)
    }

    pub fn set(&mut self, slot: usize, value: V) {
        grow_to(&mut self.values, slot + 1, self.default_value);
        self.values[slot] = value;
    }

    /// The number of slots backed by storage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve_exact(additional);
    }
}

/// A primitive kind stored in a [`DenseValueContainer`].
pub trait DenseKind: Copy {
    const MANAGER_NAME: &'static str;
    const VALUE_TYPE: PropertyValueType;

    fn from_value(value: &PropertyValue) -> Option<Self>;
    fn into_value(self) -> PropertyValue;
}

impl DenseKind for f32 {
    const MANAGER_NAME: &'static str = "FloatPropertyManager";
    const VALUE_TYPE: PropertyValueType = PropertyValueType::Float;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Float(self)
    }
}

impl DenseKind for f64 {
    const MANAGER_NAME: &'static str = "DoublePropertyManager";
    const VALUE_TYPE: PropertyValueType = PropertyValueType::Double;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Double(self)
    }
}

impl<V: DenseKind> ValueContainer for DenseValueContainer<V> {
    const MANAGER_NAME: &'static str = V::MANAGER_NAME;

    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError> {
        if *definition.value_type() != V::VALUE_TYPE {
            return Err(StoreError::PropertyDefinitionImproperType {
                manager: V::MANAGER_NAME,
                found: definition.value_type().clone(),
            });
        }
        let default_value = definition
            .default_value()
            .ok_or(StoreError::PropertyDefinitionMissingDefault(V::MANAGER_NAME))?;
        let default_value =
            V::from_value(default_value).ok_or_else(|| V::VALUE_TYPE.mismatch(default_value))?;
        Ok(Self::new(default_value, initial_size))
    }

    fn get_value(&self, slot: usize) -> Option<PropertyValue> {
        Some(self.get(slot).into_value())
    }

    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError> {
        let value = V::from_value(value).ok_or_else(|| V::VALUE_TYPE.mismatch(value))?;
        self.set(slot, value);
        Ok(())
    }

    fn reserve(&mut self, additional: usize) {
        DenseValueContainer::reserve(self, additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_definition(default_value: Option<f64>) -> PropertyDefinition {
        let builder = PropertyDefinition::builder().value_type(PropertyValueType::Double);
        match default_value {
            Some(value) => builder.default_value(PropertyValue::Double(value)),
            None => builder,
        }
        .build()
        .unwrap()
    }

    #[test]
    fn unwritten_slots_read_default() {
        let mut container = DoubleValueContainer::new(1.5, 0);
        assert_eq!(container.get(10), 1.5);
        container.set(3, 7.0);
        assert_eq!(container.get(3), 7.0);
        assert_eq!(container.get(2), 1.5);
        assert_eq!(container.get(4), 1.5);
        assert_eq!(container.len(), 4);
    }

    #[test]
    fn from_definition_checks_type_and_default() {
        assert!(DoubleValueContainer::from_definition(&double_definition(Some(0.0)), 8).is_ok());
        assert!(matches!(
            DoubleValueContainer::from_definition(&double_definition(None), 8),
            Err(StoreError::PropertyDefinitionMissingDefault("DoublePropertyManager"))
        ));
        assert!(matches!(
            FloatValueContainer::from_definition(&double_definition(Some(0.0)), 8),
            Err(StoreError::PropertyDefinitionImproperType { .. })
        ));
    }

    #[test]
    fn set_value_rejects_other_kinds() {
        let mut container = FloatValueContainer::new(0.0, 0);
        assert!(container
            .set_value(0, &PropertyValue::Float(2.5))
            .is_ok());
        assert_eq!(container.get_value(0), Some(PropertyValue::Float(2.5)));
        assert!(matches!(
            container.set_value(0, &PropertyValue::Double(2.5)),
            Err(StoreError::TypeMismatch { .. })
        ));
    }
}
