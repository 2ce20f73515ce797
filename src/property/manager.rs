/*!

Property managers: one per (owning type, property) pair.

A manager pairs a value container with an optional parallel array of assignment times. It is
addressed by slot and knows nothing about entity ids, mutability, or events; the owning data
manager validates requests and reads the host clock before calling in.

## Lazy removal

[`IndexedPropertyManager::remove_id`] does not touch the stored value or time. A slot that is
freed and later handed out again reads the stale value until the next write. Callers that
reuse slots must write every property of the new entity.

*/

use std::fmt::Debug;

use log::trace;

use crate::error::StoreError;
use crate::property::containers::{
    BooleanContainer, DoubleValueContainer, EnumContainer, FloatValueContainer,
    IntValueContainer, ObjectValueContainer, ValueContainer,
};
use crate::property::{PropertyDefinition, PropertyValue, PropertyValueType};

/// The type-agnostic contract shared by every property manager.
pub trait IndexedPropertyManager: Debug {
    fn property_definition(&self) -> &PropertyDefinition;

    /// Returns the stored value, or the default if the slot was never written. Returns `None`
    /// only for a property without a default whose slot was never written.
    fn get_property_value(&self, slot: usize) -> Option<PropertyValue>;

    /// Stores the value and, if the property is time tracked, `time` as its assignment time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeMismatch`] if the value does not fit the property's type.
    fn set_property_value(
        &mut self,
        slot: usize,
        value: &PropertyValue,
        time: f64,
    ) -> Result<(), StoreError>;

    /// Returns the time of the last assignment, or `0.0` if the slot was never written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TimeTrackingDisabled`] if the property is not time tracked.
    fn get_property_time(&self, slot: usize) -> Result<f64, StoreError>;

    /// Marks the slot as free. The stored value and time are left in place.
    fn remove_id(&mut self, slot: usize);

    /// Reserves room for `count` more slots.
    fn increment_capacity(&mut self, count: usize);
}

#[derive(Debug, Clone)]
pub struct PropertyManager<C: ValueContainer> {
    definition: PropertyDefinition,
    values: C,
    times: Option<DoubleValueContainer>,
}

pub type BooleanPropertyManager = PropertyManager<BooleanContainer>;
pub type IntPropertyManager = PropertyManager<IntValueContainer>;
pub type FloatPropertyManager = PropertyManager<FloatValueContainer>;
pub type DoublePropertyManager = PropertyManager<DoubleValueContainer>;
pub type EnumPropertyManager = PropertyManager<EnumContainer>;
pub type ObjectPropertyManager = PropertyManager<ObjectValueContainer>;

impl<C: ValueContainer> PropertyManager<C> {
    /// # Errors
    ///
    /// - [`StoreError::PropertyDefinitionImproperType`] if this manager cannot hold the
    ///   definition's value type.
    /// - [`StoreError::PropertyDefinitionMissingDefault`] if this manager requires a default and
    ///   the definition has none.
    pub fn new(definition: PropertyDefinition, initial_size: usize) -> Result<Self, StoreError> {
        let values = C::from_definition(&definition, initial_size)?;
        let times = definition
            .is_time_tracked()
            .then(|| DoubleValueContainer::new(0.0, initial_size));
        Ok(Self {
            definition,
            values,
            times,
        })
    }
}

impl<C: ValueContainer + Debug> IndexedPropertyManager for PropertyManager<C> {
    fn property_definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    fn get_property_value(&self, slot: usize) -> Option<PropertyValue> {
        self.values.get_value(slot)
    }

    fn set_property_value(
        &mut self,
        slot: usize,
        value: &PropertyValue,
        time: f64,
    ) -> Result<(), StoreError> {
        self.values.set_value(slot, value)?;
        if let Some(times) = &mut self.times {
            times.set(slot, time);
        }
        Ok(())
    }

    fn get_property_time(&self, slot: usize) -> Result<f64, StoreError> {
        match &self.times {
            Some(times) => Ok(times.get(slot)),
            None => Err(StoreError::TimeTrackingDisabled(C::MANAGER_NAME.to_string())),
        }
    }

    fn remove_id(&mut self, slot: usize) {
        trace!("{}: released slot {slot}", C::MANAGER_NAME);
    }

    fn increment_capacity(&mut self, count: usize) {
        self.values.reserve(count);
        if let Some(times) = &mut self.times {
            times.reserve(count);
        }
    }
}

/// Builds the most compact manager for the definition: a specialized manager when the property
/// has a default, and an [`ObjectPropertyManager`] when it does not or when the value type is
/// `Object`.
///
/// # Errors
///
/// Returns [`StoreError::TypeMismatch`] if the definition's default does not match its type.
pub fn new_property_manager(
    definition: PropertyDefinition,
    initial_size: usize,
) -> Result<Box<dyn IndexedPropertyManager>, StoreError> {
    if definition.default_value().is_none() {
        return Ok(Box::new(ObjectPropertyManager::new(definition, initial_size)?));
    }
    let value_type = definition.value_type().clone();
    let manager: Box<dyn IndexedPropertyManager> = match value_type {
        PropertyValueType::Boolean => {
            Box::new(BooleanPropertyManager::new(definition, initial_size)?)
        }
        PropertyValueType::Int => Box::new(IntPropertyManager::new(definition, initial_size)?),
        PropertyValueType::Float => Box::new(FloatPropertyManager::new(definition, initial_size)?),
        PropertyValueType::Double => {
            Box::new(DoublePropertyManager::new(definition, initial_size)?)
        }
        PropertyValueType::Enum(_) => Box::new(EnumPropertyManager::new(definition, initial_size)?),
        PropertyValueType::Object => {
            Box::new(ObjectPropertyManager::new(definition, initial_size)?)
        }
    };
    Ok(manager)
}
