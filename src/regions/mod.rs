/*!

Regions: a partition of people by location.

Unlike groups, a person is in at most one region at a time. Moving a person replaces their
region, and when the data manager is configured to do so the time of arrival is recorded.
Regions carry their own properties, with the same validation and event discipline as group
properties.

*/

mod data_manager;
mod plugin_data;

pub use data_manager::RegionsDataManager;
pub use plugin_data::{
    PersonRegionRecord, RegionPropertyDefinitionRecord, RegionPropertyValueRecord,
    RegionsPluginData, RegionsPluginDataBuilder,
};

use crate::macros::define_string_id;
use crate::property::{PropertyDefinition, PropertyValue};
use crate::relationship::SlotId;

define_string_id!(
    /// Names a region, e.g. a county or a census tract.
    RegionId
);

define_string_id!(
    /// Names a property shared by all regions.
    RegionPropertyId
);

/// The dense slot of a region, in order of addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RegionSlot(usize);

impl SlotId for RegionSlot {
    fn from_slot(slot: usize) -> Self {
        RegionSlot(slot)
    }

    fn slot(self) -> usize {
        self.0
    }
}

/// A region to be added, with its initial property values.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConstructionData {
    pub region_id: RegionId,
    pub property_values: Vec<(RegionPropertyId, PropertyValue)>,
}

impl RegionConstructionData {
    pub fn new(region_id: impl Into<RegionId>) -> Self {
        Self {
            region_id: region_id.into(),
            property_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property_value(
        mut self,
        property_id: impl Into<RegionPropertyId>,
        value: PropertyValue,
    ) -> Self {
        self.property_values.push((property_id.into(), value));
        self
    }
}

/// A new region property together with its values for regions that already exist.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPropertyDefinitionInitialization {
    pub property_id: RegionPropertyId,
    pub definition: PropertyDefinition,
    pub values: Vec<(RegionId, PropertyValue)>,
}

impl RegionPropertyDefinitionInitialization {
    pub fn new(property_id: impl Into<RegionPropertyId>, definition: PropertyDefinition) -> Self {
        Self {
            property_id: property_id.into(),
            definition,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, region_id: impl Into<RegionId>, value: PropertyValue) -> Self {
        self.values.push((region_id.into(), value));
        self
    }
}
