//! Typed, optionally time-stamped property values stored per entity slot.

pub mod containers;
mod definition;
mod manager;
mod table;
mod value;

pub use definition::{PropertyDefinition, PropertyDefinitionBuilder};
pub use manager::{
    new_property_manager, BooleanPropertyManager, DoublePropertyManager, EnumPropertyManager,
    FloatPropertyManager, IndexedPropertyManager, IntPropertyManager, ObjectPropertyManager,
    PropertyManager,
};
pub use table::PropertyTable;
pub use value::{EnumDomain, PropertyValue, PropertyValueType};
