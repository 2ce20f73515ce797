use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::people::PersonId;
use crate::plugin_data::PluginData;
use crate::property::{PropertyDefinition, PropertyValue};
use crate::regions::{RegionId, RegionPropertyId};
use crate::{HashMap, HashMapExt, HashSet, HashSetExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPropertyDefinitionRecord {
    pub property_id: RegionPropertyId,
    pub definition: PropertyDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPropertyValueRecord {
    pub region_id: RegionId,
    pub property_id: RegionPropertyId,
    pub value: PropertyValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRegionRecord {
    pub person_id: PersonId,
    pub region_id: RegionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<f64>,
}

/// The initial state of a [`RegionsDataManager`](crate::regions::RegionsDataManager).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionsPluginData {
    region_ids: Vec<RegionId>,
    property_definitions: Vec<RegionPropertyDefinitionRecord>,
    property_values: Vec<RegionPropertyValueRecord>,
    person_regions: Vec<PersonRegionRecord>,
    #[serde(default)]
    person_region_arrival_tracking: bool,
}

impl RegionsPluginData {
    #[must_use]
    pub fn builder() -> RegionsPluginDataBuilder {
        RegionsPluginDataBuilder::default()
    }

    #[must_use]
    pub fn region_ids(&self) -> &[RegionId] {
        &self.region_ids
    }

    #[must_use]
    pub fn property_definitions(&self) -> &[RegionPropertyDefinitionRecord] {
        &self.property_definitions
    }

    #[must_use]
    pub fn property_values(&self) -> &[RegionPropertyValueRecord] {
        &self.property_values
    }

    #[must_use]
    pub fn person_regions(&self) -> &[PersonRegionRecord] {
        &self.person_regions
    }

    #[must_use]
    pub fn person_region_arrival_tracking(&self) -> bool {
        self.person_region_arrival_tracking
    }
}

impl PluginData for RegionsPluginData {
    fn validate(&self) -> Result<(), StoreError> {
        let mut regions = HashSet::new();
        for region_id in &self.region_ids {
            if !regions.insert(region_id) {
                return Err(StoreError::DuplicateIdentifier(region_id.to_string()));
            }
        }

        let mut definitions = HashMap::new();
        for record in &self.property_definitions {
            record.definition.validate()?;
            if definitions
                .insert(&record.property_id, &record.definition)
                .is_some()
            {
                return Err(StoreError::DuplicateIdentifier(record.property_id.to_string()));
            }
        }

        let mut assigned = HashSet::new();
        for record in &self.property_values {
            if !regions.contains(&record.region_id) {
                return Err(StoreError::UnknownIdentifier(record.region_id.to_string()));
            }
            let definition = definitions
                .get(&record.property_id)
                .ok_or_else(|| StoreError::UnknownIdentifier(record.property_id.to_string()))?;
            definition.value_type().check(&record.value)?;
            assigned.insert((&record.region_id, &record.property_id));
        }

        for region_id in &self.region_ids {
            for record in &self.property_definitions {
                if record.definition.default_value().is_none()
                    && !assigned.contains(&(region_id, &record.property_id))
                {
                    return Err(StoreError::MissingRequiredValue(format!(
                        "{} of {region_id}",
                        record.property_id
                    )));
                }
            }
        }

        let mut people = HashSet::with_capacity(self.person_regions.len());
        for record in &self.person_regions {
            if !regions.contains(&record.region_id) {
                return Err(StoreError::UnknownIdentifier(record.region_id.to_string()));
            }
            if !people.insert(record.person_id) {
                return Err(StoreError::DuplicateIdentifier(record.person_id.to_string()));
            }
        }
        Ok(())
    }
}

/// Collects the contents of a [`RegionsPluginData`]. Nothing is checked until
/// [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RegionsPluginDataBuilder {
    data: RegionsPluginData,
    // Positions of records already added, so that a later call replaces in place.
    value_positions: HashMap<(RegionId, RegionPropertyId), usize>,
    person_positions: HashMap<PersonId, usize>,
}

impl RegionsPluginDataBuilder {
    pub fn add_region(&mut self, region_id: impl Into<RegionId>) -> &mut Self {
        self.data.region_ids.push(region_id.into());
        self
    }

    pub fn define_region_property(
        &mut self,
        property_id: impl Into<RegionPropertyId>,
        definition: PropertyDefinition,
    ) -> &mut Self {
        self.data
            .property_definitions
            .push(RegionPropertyDefinitionRecord {
                property_id: property_id.into(),
                definition,
            });
        self
    }

    pub fn set_region_property_value(
        &mut self,
        region_id: impl Into<RegionId>,
        property_id: impl Into<RegionPropertyId>,
        value: PropertyValue,
    ) -> &mut Self {
        self.push_value(region_id.into(), property_id.into(), value, None)
    }

    /// Sets a value together with its recorded assignment time.
    pub fn set_region_property_value_at(
        &mut self,
        region_id: impl Into<RegionId>,
        property_id: impl Into<RegionPropertyId>,
        value: PropertyValue,
        time: f64,
    ) -> &mut Self {
        self.push_value(region_id.into(), property_id.into(), value, Some(time))
    }

    fn push_value(
        &mut self,
        region_id: RegionId,
        property_id: RegionPropertyId,
        value: PropertyValue,
        time: Option<f64>,
    ) -> &mut Self {
        let record = RegionPropertyValueRecord {
            region_id: region_id.clone(),
            property_id: property_id.clone(),
            value,
            time,
        };
        match self.value_positions.entry((region_id, property_id)) {
            Entry::Occupied(entry) => self.data.property_values[*entry.get()] = record,
            Entry::Vacant(entry) => {
                entry.insert(self.data.property_values.len());
                self.data.property_values.push(record);
            }
        }
        self
    }

    pub fn set_person_region(
        &mut self,
        person_id: PersonId,
        region_id: impl Into<RegionId>,
    ) -> &mut Self {
        self.push_person_region(person_id, region_id.into(), None)
    }

    /// Places a person together with their recorded arrival time.
    pub fn set_person_region_at(
        &mut self,
        person_id: PersonId,
        region_id: impl Into<RegionId>,
        arrival_time: f64,
    ) -> &mut Self {
        self.push_person_region(person_id, region_id.into(), Some(arrival_time))
    }

    fn push_person_region(
        &mut self,
        person_id: PersonId,
        region_id: RegionId,
        arrival_time: Option<f64>,
    ) -> &mut Self {
        let record = PersonRegionRecord {
            person_id,
            region_id,
            arrival_time,
        };
        match self.person_positions.entry(person_id) {
            Entry::Occupied(entry) => self.data.person_regions[*entry.get()] = record,
            Entry::Vacant(entry) => {
                entry.insert(self.data.person_regions.len());
                self.data.person_regions.push(record);
            }
        }
        self
    }

    pub fn set_person_region_arrival_tracking(&mut self, tracking: bool) -> &mut Self {
        self.data.person_region_arrival_tracking = tracking;
        self
    }

    /// # Errors
    ///
    /// Returns the first inconsistency found: a duplicate region or property, a reference to an
    /// undeclared region or property, an incompatible value, or a region without a value for a
    /// property that has no default.
    pub fn build(&mut self) -> Result<RegionsPluginData, StoreError> {
        let data = std::mem::take(&mut self.data);
        self.value_positions.clear();
        self.person_positions.clear();
        data.validate()?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValueType;

    fn required_double() -> PropertyDefinition {
        PropertyDefinition::builder()
            .value_type(PropertyValueType::Double)
            .build()
            .unwrap()
    }

    #[test]
    fn builds_valid_data() {
        let data = RegionsPluginData::builder()
            .add_region("north")
            .add_region("south")
            .define_region_property("area", required_double())
            .set_region_property_value("north", "area", PropertyValue::Double(10.0))
            .set_region_property_value("south", "area", PropertyValue::Double(12.0))
            .set_person_region(PersonId(0), "north")
            .set_person_region_at(PersonId(1), "south", 3.0)
            .set_person_region_arrival_tracking(true)
            .build()
            .unwrap();
        assert_eq!(data.region_ids().len(), 2);
        assert_eq!(data.person_regions()[1].arrival_time, Some(3.0));
        assert!(data.person_region_arrival_tracking());
    }

    #[test]
    fn moving_a_person_replaces_the_record() {
        let data = RegionsPluginData::builder()
            .add_region("north")
            .add_region("south")
            .set_person_region(PersonId(0), "north")
            .set_person_region(PersonId(0), "south")
            .build()
            .unwrap();
        assert_eq!(data.person_regions().len(), 1);
        assert_eq!(data.person_regions()[0].region_id, RegionId::from("south"));
    }

    #[test]
    fn replacement_keeps_position_of_first_placement() {
        let mut builder = RegionsPluginData::builder();
        builder.add_region("north").add_region("south");
        for person in (0..1_000).map(PersonId) {
            builder.set_person_region(person, "north");
        }
        builder.set_person_region_at(PersonId(10), "south", 2.0);
        let data = builder.build().unwrap();
        assert_eq!(data.person_regions().len(), 1_000);
        assert_eq!(data.person_regions()[10].region_id, RegionId::from("south"));
        assert_eq!(data.person_regions()[10].arrival_time, Some(2.0));

        // The builder starts over after build.
        let data = builder
            .add_region("north")
            .set_person_region(PersonId(10), "north")
            .build()
            .unwrap();
        assert_eq!(data.person_regions().len(), 1);
        assert_eq!(data.person_regions()[0].person_id, PersonId(10));
    }

    #[test]
    fn invalid_data() {
        assert!(matches!(
            RegionsPluginData::builder()
                .add_region("north")
                .add_region("north")
                .build(),
            Err(StoreError::DuplicateIdentifier(_))
        ));
        assert!(matches!(
            RegionsPluginData::builder()
                .set_person_region(PersonId(0), "east")
                .build(),
            Err(StoreError::UnknownIdentifier(_))
        ));
        assert!(matches!(
            RegionsPluginData::builder()
                .add_region("north")
                .define_region_property("area", required_double())
                .build(),
            Err(StoreError::MissingRequiredValue(_))
        ));
        assert!(matches!(
            RegionsPluginData::builder()
                .add_region("north")
                .define_region_property("area", required_double())
                .set_region_property_value("north", "area", PropertyValue::Int(1))
                .build(),
            Err(StoreError::TypeMismatch { .. })
        ));
    }
}
