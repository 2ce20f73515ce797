use crate::error::StoreError;
use crate::property::containers::{grow_to, ValueContainer};
use crate::property::{PropertyDefinition, PropertyValue, PropertyValueType};

/// The number of bytes used per stored integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// The narrowest width that can hold `value`.
    #[must_use]
    pub fn of(value: i64) -> Self {
        if i8::try_from(value).is_ok() {
            IntWidth::I8
        } else if i16::try_from(value).is_ok() {
            IntWidth::I16
        } else if i32::try_from(value).is_ok() {
            IntWidth::I32
        } else {
            IntWidth::I64
        }
    }
}

#[derive(Debug, Clone)]
enum IntStorage {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl IntStorage {
    fn with_capacity(width: IntWidth, capacity: usize) -> Self {
        match width {
            IntWidth::I8 => IntStorage::I8(Vec::with_capacity(capacity)),
            IntWidth::I16 => IntStorage::I16(Vec::with_capacity(capacity)),
            IntWidth::I32 => IntStorage::I32(Vec::with_capacity(capacity)),
            IntWidth::I64 => IntStorage::I64(Vec::with_capacity(capacity)),
        }
    }

    fn width(&self) -> IntWidth {
        match self {
            IntStorage::I8(_) => IntWidth::I8,
            IntStorage::I16(_) => IntWidth::I16,
            IntStorage::I32(_) => IntWidth::I32,
            IntStorage::I64(_) => IntWidth::I64,
        }
    }

    fn len(&self) -> usize {
        match self {
            IntStorage::I8(values) => values.len(),
            IntStorage::I16(values) => values.len(),
            IntStorage::I32(values) => values.len(),
            IntStorage::I64(values) => values.len(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            IntStorage::I8(values) => values.capacity(),
            IntStorage::I16(values) => values.capacity(),
            IntStorage::I32(values) => values.capacity(),
            IntStorage::I64(values) => values.capacity(),
        }
    }

    fn get(&self, slot: usize) -> Option<i64> {
        match self {
            IntStorage::I8(values) => values.get(slot).map(|v| i64::from(*v)),
            IntStorage::I16(values) => values.get(slot).map(|v| i64::from(*v)),
            IntStorage::I32(values) => values.get(slot).map(|v| i64::from(*v)),
            IntStorage::I64(values) => values.get(slot).copied(),
        }
    }

    fn reserve(&mut self, additional: usize) {
        match self {
            IntStorage::I8(values) => values.reserve_exact(additional),
            IntStorage::I16(values) => values.reserve_exact(additional),
            IntStorage::I32(values) => values.reserve_exact(additional),
            IntStorage::I64(values) => values.reserve_exact(additional),
        }
    }

    // Callers guarantee that `value` and `fill` fit in the current width.
    #[allow(clippy::cast_possible_truncation)]
    fn set(&mut self, slot: usize, value: i64, fill: i64) {
        match self {
            IntStorage::I8(values) => {
                grow_to(values, slot + 1, fill as i8);
                values[slot] = value as i8;
            }
            IntStorage::I16(values) => {
                grow_to(values, slot + 1, fill as i16);
                values[slot] = value as i16;
            }
            IntStorage::I32(values) => {
                grow_to(values, slot + 1, fill as i32);
                values[slot] = value as i32;
            }
            IntStorage::I64(values) => {
                grow_to(values, slot + 1, fill);
                values[slot] = value;
            }
        }
    }
}

/// Integer storage that starts at the narrowest width holding the default and widens, copying
/// every stored value, the first time a value does not fit.
#[derive(Debug, Clone)]
pub struct IntValueContainer {
    storage: IntStorage,
    default_value: i64,
}

impl IntValueContainer {
    #[must_use]
    pub fn new(default_value: i64, capacity: usize) -> Self {
        Self {
            storage: IntStorage::with_capacity(IntWidth::of(default_value), capacity),
            default_value,
        }
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> i64 {
        self.storage.get(slot).unwrap_or(self.default_value)
    }

    pub fn set(&mut self, slot: usize, value: i64) {
        let needed = IntWidth::of(value);
        if needed > self.storage.width() {
            self.widen(needed);
        }
        self.storage.set(slot, value, self.default_value);
    }

    fn widen(&mut self, width: IntWidth) {
        let len = self.storage.len();
        let mut widened = IntStorage::with_capacity(width, self.storage.capacity().max(len));
        for slot in 0..len {
            if let Some(value) = self.storage.get(slot) {
                widened.set(slot, value, self.default_value);
            }
        }
        self.storage = widened;
    }

    #[must_use]
    pub fn width(&self) -> IntWidth {
        self.storage.width()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }
}

impl ValueContainer for IntValueContainer {
    const MANAGER_NAME: &'static str = "IntPropertyManager";

    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError> {
        if *definition.value_type() != PropertyValueType::Int {
            return Err(StoreError::PropertyDefinitionImproperType {
                manager: Self::MANAGER_NAME,
                found: definition.value_type().clone(),
            });
        }
        match definition.default_value() {
            Some(PropertyValue::Int(default_value)) => Ok(Self::new(*default_value, initial_size)),
            Some(other) => Err(PropertyValueType::Int.mismatch(other)),
            None => Err(StoreError::PropertyDefinitionMissingDefault(
                Self::MANAGER_NAME,
            )),
        }
    }

    fn get_value(&self, slot: usize) -> Option<PropertyValue> {
        Some(PropertyValue::Int(self.get(slot)))
    }

    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError> {
        match value {
            PropertyValue::Int(value) => {
                self.set(slot, *value);
                Ok(())
            }
            other => Err(PropertyValueType::Int.mismatch(other)),
        }
    }

    fn reserve(&mut self, additional: usize) {
        IntValueContainer::reserve(self, additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_value() {
        assert_eq!(IntWidth::of(0), IntWidth::I8);
        assert_eq!(IntWidth::of(-128), IntWidth::I8);
        assert_eq!(IntWidth::of(128), IntWidth::I16);
        assert_eq!(IntWidth::of(-40_000), IntWidth::I32);
        assert_eq!(IntWidth::of(i64::from(i32::MAX) + 1), IntWidth::I64);
    }

    #[test]
    fn widens_and_keeps_values() {
        let mut container = IntValueContainer::new(-1, 0);
        assert_eq!(container.width(), IntWidth::I8);
        container.set(0, 5);
        container.set(3, 100);
        assert_eq!(container.width(), IntWidth::I8);

        container.set(1, 70_000);
        assert_eq!(container.width(), IntWidth::I32);
        assert_eq!(container.get(0), 5);
        assert_eq!(container.get(1), 70_000);
        assert_eq!(container.get(2), -1);
        assert_eq!(container.get(3), 100);

        container.set(5, i64::MIN);
        assert_eq!(container.width(), IntWidth::I64);
        assert_eq!(container.get(4), -1);
        assert_eq!(container.get(5), i64::MIN);
        assert_eq!(container.get(3), 100);
    }

    #[test]
    fn never_narrows() {
        let mut container = IntValueContainer::new(0, 0);
        container.set(0, 1_000);
        container.set(0, 1);
        assert_eq!(container.width(), IntWidth::I16);
    }

    #[test]
    fn wide_default_starts_wide() {
        let container = IntValueContainer::new(1 << 40, 4);
        assert_eq!(container.width(), IntWidth::I64);
        assert_eq!(container.get(2), 1 << 40);
        assert!(container.is_empty());
    }

    #[test]
    fn from_definition_requires_int_default() {
        let definition = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .default_value(PropertyValue::Int(3))
            .build()
            .unwrap();
        let container = IntValueContainer::from_definition(&definition, 10).unwrap();
        assert_eq!(container.get_value(9), Some(PropertyValue::Int(3)));

        let no_default = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .build()
            .unwrap();
        assert!(matches!(
            IntValueContainer::from_definition(&no_default, 10),
            Err(StoreError::PropertyDefinitionMissingDefault("IntPropertyManager"))
        ));
    }
}
