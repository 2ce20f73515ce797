/*!

Dense, slot-addressed value storage, one container per value kind.

Every container behaves like an infinitely long array pre-filled with a default value: reading a
slot that was never written returns the default, and writing past the end fills the gap with the
default. Backing storage grows by 50% or to the exact size needed, whichever is larger, so bulk
additions do not reallocate on every entity.

| container               | storage per slot                 |
|-------------------------|----------------------------------|
| [`BooleanContainer`]    | one bit                          |
| [`IntValueContainer`]   | 1, 2, 4 or 8 bytes, as needed    |
| [`FloatValueContainer`] | 4 bytes                          |
| [`DoubleValueContainer`]| 8 bytes                          |
| [`EnumContainer`]       | an ordinal in an `IntValueContainer` |
| [`ObjectValueContainer`]| one `Option<PropertyValue>`      |

*/

mod boolean;
mod dense;
mod enumeration;
mod int;
mod object;

pub use boolean::BooleanContainer;
pub use dense::{DenseValueContainer, DoubleValueContainer, FloatValueContainer};
pub use enumeration::EnumContainer;
pub use int::{IntValueContainer, IntWidth};
pub use object::ObjectValueContainer;

use crate::error::StoreError;
use crate::property::{PropertyDefinition, PropertyValue};

/// The storage half of a property manager. Implemented once per value kind.
pub trait ValueContainer: Sized {
    /// The name of the manager built on this container, used in error messages.
    const MANAGER_NAME: &'static str;

    /// Builds an empty container for the property.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PropertyDefinitionImproperType`] if the container cannot hold the
    ///   definition's value type.
    /// - [`StoreError::PropertyDefinitionMissingDefault`] if the container needs a default and
    ///   the definition has none.
    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError>;

    /// Returns the stored value, the default if the slot was never written, or `None` if it was
    /// never written and there is no default.
    fn get_value(&self, slot: usize) -> Option<PropertyValue>;

    /// # Errors
    ///
    /// Returns [`StoreError::TypeMismatch`] if the value is not of the container's kind.
    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError>;

    /// Makes room for `additional` more slots past the current length.
    fn reserve(&mut self, additional: usize);
}

/// Extends `values` to at least `len` elements, filling new slots with `fill`. When the backing
/// storage must grow, it grows to the larger of `len` and one and a half times its capacity.
pub(crate) fn grow_to<V: Clone>(values: &mut Vec<V>, len: usize, fill: V) {
    if len <= values.len() {
        return;
    }
    let capacity = values.capacity();
    if capacity < len {
        let target = len.max(capacity + capacity / 2);
        values.reserve_exact(target - values.len());
    }
    values.resize(len, fill);
}

#[cfg(test)]
mod tests {
    use super::grow_to;

    #[test]
    fn grow_to_fills_and_keeps_existing() {
        let mut values = vec![1, 2];
        grow_to(&mut values, 5, 0);
        assert_eq!(values, vec![1, 2, 0, 0, 0]);
        grow_to(&mut values, 3, 9);
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn grow_to_grows_by_half_or_exact() {
        let mut values: Vec<u8> = Vec::with_capacity(100);
        grow_to(&mut values, 100, 0);
        assert!(values.capacity() >= 100);
        // One more slot grows by half...
        grow_to(&mut values, 101, 0);
        assert!(values.capacity() >= 150);
        // ...and a big jump grows to at least the exact size.
        grow_to(&mut values, 1000, 0);
        assert!(values.capacity() >= 1000);
    }
}
