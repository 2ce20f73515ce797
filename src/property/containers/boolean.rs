use crate::error::StoreError;
use crate::property::containers::{grow_to, ValueContainer};
use crate::property::{PropertyDefinition, PropertyValue, PropertyValueType};

const BITS_PER_WORD: usize = u64::BITS as usize;

/// Booleans packed one bit per slot.
///
/// Every bit at or past `len` holds the default: new words are filled with the default pattern
/// rather than zeroed.
#[derive(Debug, Clone)]
pub struct BooleanContainer {
    words: Vec<u64>,
    len: usize,
    default_value: bool,
}

impl BooleanContainer {
    #[must_use]
    pub fn new(default_value: bool, capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity.div_ceil(BITS_PER_WORD)),
            len: 0,
            default_value,
        }
    }

    fn fill_word(&self) -> u64 {
        if self.default_value {
            u64::MAX
        } else {
            0
        }
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> bool {
        match self.words.get(slot / BITS_PER_WORD) {
            Some(word) => word & (1u64 << (slot % BITS_PER_WORD)) != 0,
            None => self.default_value,
        }
    }

    pub fn set(&mut self, slot: usize, value: bool) {
        let fill = self.fill_word();
        grow_to(&mut self.words, slot / BITS_PER_WORD + 1, fill);
        let mask = 1u64 << (slot % BITS_PER_WORD);
        let word = &mut self.words[slot / BITS_PER_WORD];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        self.len = self.len.max(slot + 1);
    }

    /// One more than the highest slot ever written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reserve(&mut self, additional: usize) {
        let needed = (self.len + additional).div_ceil(BITS_PER_WORD);
        self.words
            .reserve_exact(needed.saturating_sub(self.words.len()));
    }
}

impl ValueContainer for BooleanContainer {
    const MANAGER_NAME: &'static str = "BooleanPropertyManager";

    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError> {
        if *definition.value_type() != PropertyValueType::Boolean {
            return Err(StoreError::PropertyDefinitionImproperType {
                manager: Self::MANAGER_NAME,
                found: definition.value_type().clone(),
            });
        }
        match definition.default_value() {
            Some(PropertyValue::Boolean(default_value)) => {
                Ok(Self::new(*default_value, initial_size))
            }
            Some(other) => Err(PropertyValueType::Boolean.mismatch(other)),
            None => Err(StoreError::PropertyDefinitionMissingDefault(
                Self::MANAGER_NAME,
            )),
        }
    }

    fn get_value(&self, slot: usize) -> Option<PropertyValue> {
        Some(PropertyValue::Boolean(self.get(slot)))
    }

    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError> {
        match value {
            PropertyValue::Boolean(value) => {
                self.set(slot, *value);
                Ok(())
            }
            other => Err(PropertyValueType::Boolean.mismatch(other)),
        }
    }

    fn reserve(&mut self, additional: usize) {
        BooleanContainer::reserve(self, additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_independent() {
        let mut container = BooleanContainer::new(false, 0);
        container.set(0, true);
        container.set(63, true);
        container.set(64, true);
        assert!(container.get(0));
        assert!(!container.get(1));
        assert!(container.get(63));
        assert!(container.get(64));
        assert!(!container.get(65));
        container.set(63, false);
        assert!(!container.get(63));
        assert!(container.get(64));
        assert_eq!(container.len(), 65);
    }

    #[test]
    fn true_default_survives_growth() {
        let mut container = BooleanContainer::new(true, 0);
        assert!(container.get(1_000));
        container.set(130, false);
        assert!(!container.get(130));
        // Slots in the newly allocated words, before and after the write, read the default.
        assert!(container.get(0));
        assert!(container.get(129));
        assert!(container.get(131));
        assert!(container.get(191));
        assert!(container.get(192));
    }

    #[test]
    fn rejects_non_boolean_definitions_and_values() {
        let definition = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .default_value(PropertyValue::Int(0))
            .build()
            .unwrap();
        assert!(matches!(
            BooleanContainer::from_definition(&definition, 0),
            Err(StoreError::PropertyDefinitionImproperType {
                manager: "BooleanPropertyManager",
                found: PropertyValueType::Int,
            })
        ));

        let mut container = BooleanContainer::new(false, 0);
        assert!(matches!(
            container.set_value(0, &PropertyValue::Int(1)),
            Err(StoreError::TypeMismatch { .. })
        ));
        assert!(container.is_empty());
    }
}
