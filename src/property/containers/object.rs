use crate::error::StoreError;
use crate::property::containers::{grow_to, ValueContainer};
use crate::property::{PropertyDefinition, PropertyValue, PropertyValueType};

/// Boxed value storage for any property type.
///
/// Used for object-valued properties and for every property without a default, since the
/// specialized containers cannot represent "never written".
#[derive(Debug, Clone)]
pub struct ObjectValueContainer {
    value_type: PropertyValueType,
    values: Vec<Option<PropertyValue>>,
    default_value: Option<PropertyValue>,
}

impl ObjectValueContainer {
    #[must_use]
    pub fn new(
        value_type: PropertyValueType,
        default_value: Option<PropertyValue>,
        capacity: usize,
    ) -> Self {
        Self {
            value_type,
            values: Vec::with_capacity(capacity),
            default_value,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValueContainer for ObjectValueContainer {
    const MANAGER_NAME: &'static str = "ObjectPropertyManager";

    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError> {
        definition.validate()?;
        Ok(Self::new(
            definition.value_type().clone(),
            definition.default_value().cloned(),
            initial_size,
        ))
    }

    fn get_value(&self, slot: usize) -> Option<PropertyValue> {
        match self.values.get(slot) {
            Some(Some(value)) => Some(value.clone()),
            _ => self.default_value.clone(),
        }
    }

    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError> {
        self.value_type.check(value)?;
        grow_to(&mut self.values, slot + 1, None);
        self.values[slot] = Some(value.clone());
        Ok(())
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve_exact(additional);
    }
}
