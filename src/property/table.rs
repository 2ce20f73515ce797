use std::fmt::Display;
use std::hash::Hash;

use log::trace;

use crate::error::StoreError;
use crate::property::{
    new_property_manager, IndexedPropertyManager, PropertyDefinition, PropertyValue,
};
use crate::{HashMap, HashMapExt, HashSet, HashSetExt};

/// The properties of one owning type: a definition and a manager per property id, kept in
/// definition order.
///
/// The validation helpers never mutate, so a data manager can run all of them before applying
/// anything.
#[derive(Debug)]
pub struct PropertyTable<K> {
    ids: Vec<K>,
    managers: HashMap<K, Box<dyn IndexedPropertyManager>>,
}

impl<K> Default for PropertyTable<K> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            managers: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash + Display> PropertyTable<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, property_id: &K) -> bool {
        self.managers.contains_key(property_id)
    }

    /// Property ids in the order they were defined.
    #[must_use]
    pub fn property_ids(&self) -> Vec<K> {
        self.ids.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn manager(&self, property_id: &K) -> Result<&dyn IndexedPropertyManager, StoreError> {
        self.managers
            .get(property_id)
            .map(Box::as_ref)
            .ok_or_else(|| StoreError::UnknownIdentifier(property_id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the property is not defined.
    pub fn definition(&self, property_id: &K) -> Result<&PropertyDefinition, StoreError> {
        Ok(self.manager(property_id)?.property_definition())
    }

    /// # Errors
    ///
    /// - [`StoreError::DuplicateIdentifier`] if the property is already defined.
    /// - [`StoreError::TypeMismatch`] if the definition's default does not match its type.
    pub fn define(
        &mut self,
        property_id: K,
        definition: PropertyDefinition,
        initial_size: usize,
    ) -> Result<(), StoreError> {
        self.validate_new_property(&property_id)?;
        let manager = new_property_manager(definition, initial_size)?;
        trace!("defined property {property_id}");
        self.ids.push(property_id.clone());
        self.managers.insert(property_id, manager);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentifier`] if the property is already defined.
    pub fn validate_new_property(&self, property_id: &K) -> Result<(), StoreError> {
        if self.contains(property_id) {
            return Err(StoreError::DuplicateIdentifier(property_id.to_string()));
        }
        Ok(())
    }

    /// Checks that the property exists and that `value` is compatible with its type.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the property is not defined.
    /// - [`StoreError::TypeMismatch`] if the value does not fit the property's type.
    pub fn validate_value(&self, property_id: &K, value: &PropertyValue) -> Result<(), StoreError> {
        self.definition(property_id)?.value_type().check(value)
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the property is not defined.
    /// - [`StoreError::ImmutablePropertyWrite`] if the property is not mutable.
    pub fn validate_mutable(&self, property_id: &K) -> Result<(), StoreError> {
        if self.definition(property_id)?.is_mutable() {
            Ok(())
        } else {
            Err(StoreError::ImmutablePropertyWrite(property_id.to_string()))
        }
    }

    /// Validates the initial values of a new entity: every value must belong to a known property
    /// and fit its type, and every property without a default must be given a value.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] / [`StoreError::TypeMismatch`] for a bad value.
    /// - [`StoreError::MissingRequiredValue`] naming the first uncovered property.
    pub fn validate_initial_values(&self, values: &[(K, PropertyValue)]) -> Result<(), StoreError> {
        let mut covered = HashSet::with_capacity(values.len());
        for (property_id, value) in values {
            self.validate_value(property_id, value)?;
            covered.insert(property_id);
        }
        for property_id in &self.ids {
            if !covered.contains(&property_id) && self.requires_value(property_id) {
                return Err(StoreError::MissingRequiredValue(property_id.to_string()));
            }
        }
        Ok(())
    }

    fn requires_value(&self, property_id: &K) -> bool {
        self.managers
            .get(property_id)
            .is_some_and(|manager| manager.property_definition().default_value().is_none())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the property is not defined.
    pub fn get_value(
        &self,
        property_id: &K,
        slot: usize,
    ) -> Result<Option<PropertyValue>, StoreError> {
        Ok(self.manager(property_id)?.get_property_value(slot))
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the property is not defined.
    /// - [`StoreError::TimeTrackingDisabled`] if the property is not time tracked.
    pub fn get_time(&self, property_id: &K, slot: usize) -> Result<f64, StoreError> {
        self.manager(property_id)?.get_property_time(slot)
    }

    /// Writes without the mutability check, as needed for initial values.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the property is not defined.
    /// - [`StoreError::TypeMismatch`] if the value does not fit the property's type.
    pub fn set_value(
        &mut self,
        property_id: &K,
        slot: usize,
        value: &PropertyValue,
        time: f64,
    ) -> Result<(), StoreError> {
        self.managers
            .get_mut(property_id)
            .ok_or_else(|| StoreError::UnknownIdentifier(property_id.to_string()))?
            .set_property_value(slot, value, time)
    }

    /// Releases the slot in every manager. Values are retained; see
    /// [`IndexedPropertyManager::remove_id`].
    pub fn remove_slot(&mut self, slot: usize) {
        for manager in self.managers.values_mut() {
            manager.remove_id(slot);
        }
    }

    pub fn increment_capacity(&mut self, count: usize) {
        for manager in self.managers.values_mut() {
            manager.increment_capacity(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValueType;

    fn int_property(default_value: Option<i64>, mutable: bool) -> PropertyDefinition {
        let mut builder = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .mutable(mutable)
            .time_tracked(true);
        if let Some(default_value) = default_value {
            builder = builder.default_value(PropertyValue::Int(default_value));
        }
        builder.build().unwrap()
    }

    fn table() -> PropertyTable<String> {
        let mut table = PropertyTable::new();
        table
            .define("beds".to_string(), int_property(Some(0), true), 0)
            .unwrap();
        table
            .define("founded".to_string(), int_property(None, false), 0)
            .unwrap();
        table
    }

    #[test]
    fn keeps_definition_order() {
        let table = table();
        assert_eq!(table.property_ids(), vec!["beds", "founded"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_duplicate_definitions() {
        let mut table = table();
        assert!(matches!(
            table.define("beds".to_string(), int_property(Some(1), true), 0),
            Err(StoreError::DuplicateIdentifier(id)) if id == "beds"
        ));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn initial_values_must_cover_required_properties() {
        let table = table();
        assert!(table
            .validate_initial_values(&[("founded".to_string(), PropertyValue::Int(1990))])
            .is_ok());
        assert!(matches!(
            table.validate_initial_values(&[("beds".to_string(), PropertyValue::Int(3))]),
            Err(StoreError::MissingRequiredValue(id)) if id == "founded"
        ));
        assert!(matches!(
            table.validate_initial_values(&[("staff".to_string(), PropertyValue::Int(3))]),
            Err(StoreError::UnknownIdentifier(_))
        ));
        assert!(matches!(
            table.validate_initial_values(&[(
                "founded".to_string(),
                PropertyValue::Boolean(true)
            )]),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn values_times_and_mutability() {
        let mut table = table();
        assert!(table.validate_mutable(&"beds".to_string()).is_ok());
        assert!(matches!(
            table.validate_mutable(&"founded".to_string()),
            Err(StoreError::ImmutablePropertyWrite(_))
        ));

        let beds = "beds".to_string();
        table.set_value(&beds, 3, &PropertyValue::Int(12), 4.0).unwrap();
        assert_eq!(table.get_value(&beds, 3).unwrap(), Some(PropertyValue::Int(12)));
        assert_eq!(table.get_time(&beds, 3).unwrap(), 4.0);
        assert_eq!(table.get_value(&"founded".to_string(), 3).unwrap(), None);

        table.remove_slot(3);
        assert_eq!(table.get_value(&beds, 3).unwrap(), Some(PropertyValue::Int(12)));
    }
}
