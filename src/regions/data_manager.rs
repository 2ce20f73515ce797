use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::{debug, trace};

use crate::error::StoreError;
use crate::events::{
    PersonRegionUpdateEvent, RegionAdditionEvent, RegionPropertyDefinitionEvent,
    RegionPropertyUpdateEvent, StoreEvent, StoreEventKind,
};
use crate::people::PersonId;
use crate::plugin_context::PluginContext;
use crate::plugin_data::PluginData;
use crate::property::{
    DoublePropertyManager, IndexedPropertyManager, PropertyDefinition, PropertyTable,
    PropertyValue, PropertyValueType,
};
use crate::regions::{
    RegionConstructionData, RegionId, RegionPropertyDefinitionInitialization, RegionPropertyId,
    RegionSlot, RegionsPluginData, RegionsPluginDataBuilder,
};
use crate::relationship::RelationshipIndex;
use crate::{HashMap, HashMapExt, HashSet, HashSetExt};

const REGION_TYPE: usize = 0;

/// Owns regions, their property values, and the assignment of people to regions.
pub struct RegionsDataManager {
    context: Rc<dyn PluginContext>,
    residents: RelationshipIndex<PersonId, RegionSlot>,
    region_ids: Vec<RegionId>,
    region_slots: HashMap<RegionId, RegionSlot>,
    properties: PropertyTable<RegionPropertyId>,
    // Present only when arrival times are tracked. Holds the arrival time as a value.
    arrival_times: Option<DoublePropertyManager>,
}

impl Debug for RegionsDataManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionsDataManager")
            .field("region_ids", &self.region_ids)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

fn arrival_time_manager() -> Result<DoublePropertyManager, StoreError> {
    let definition = PropertyDefinition::builder()
        .value_type(PropertyValueType::Double)
        .default_value(PropertyValue::Double(0.0))
        .build()?;
    DoublePropertyManager::new(definition, 0)
}

impl RegionsDataManager {
    /// Builds the data manager from its initial state. No events are published.
    ///
    /// # Errors
    ///
    /// - Any validation error of `data` (see [`PluginData::validate`]).
    /// - [`StoreError::UnknownIdentifier`] if a person placed in a region does not exist.
    pub fn new(
        data: RegionsPluginData,
        context: Rc<dyn PluginContext>,
    ) -> Result<Self, StoreError> {
        data.validate()?;
        for record in data.person_regions() {
            if !context.person_exists(record.person_id) {
                return Err(StoreError::UnknownIdentifier(record.person_id.to_string()));
            }
        }

        let mut residents = RelationshipIndex::new();
        residents.add_type();
        let arrival_times = if data.person_region_arrival_tracking() {
            Some(arrival_time_manager()?)
        } else {
            None
        };
        let mut manager = Self {
            context,
            residents,
            region_ids: Vec::new(),
            region_slots: HashMap::new(),
            properties: PropertyTable::new(),
            arrival_times,
        };
        for region_id in data.region_ids() {
            manager.insert_region(region_id.clone());
        }
        for record in data.property_definitions() {
            manager.properties.define(
                record.property_id.clone(),
                record.definition.clone(),
                manager.region_ids.len(),
            )?;
        }
        let now = manager.context.get_current_time();
        for record in data.property_values() {
            let slot = manager.region_slot(&record.region_id)?;
            manager.properties.set_value(
                &record.property_id,
                slot.0,
                &record.value,
                record.time.unwrap_or(now),
            )?;
        }
        for record in data.person_regions() {
            let slot = manager.region_slot(&record.region_id)?;
            manager.residents.link(record.person_id, slot);
            manager.record_arrival(record.person_id, record.arrival_time.unwrap_or(now))?;
        }
        debug!(
            "loaded {} regions and {} person placements",
            data.region_ids().len(),
            data.person_regions().len()
        );
        Ok(manager)
    }

    fn publish_if_observed(&self, kind: StoreEventKind, event: impl FnOnce() -> StoreEvent) {
        if self.context.subscribers_exist(kind) {
            self.context.publish(event());
        }
    }

    fn insert_region(&mut self, region_id: RegionId) -> RegionSlot {
        let slot = self.residents.add_right(REGION_TYPE);
        self.region_slots.insert(region_id.clone(), slot);
        self.region_ids.push(region_id);
        slot
    }

    fn region_slot(&self, region_id: &RegionId) -> Result<RegionSlot, StoreError> {
        self.region_slots
            .get(region_id)
            .copied()
            .ok_or_else(|| StoreError::UnknownIdentifier(region_id.to_string()))
    }

    fn validate_person(&self, person_id: PersonId) -> Result<(), StoreError> {
        if self.context.person_exists(person_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownIdentifier(person_id.to_string()))
        }
    }

    fn record_arrival(&mut self, person_id: PersonId, time: f64) -> Result<(), StoreError> {
        match &mut self.arrival_times {
            Some(arrival_times) => {
                arrival_times.set_property_value(person_id.0, &PropertyValue::Double(time), time)
            }
            None => Ok(()),
        }
    }

    fn current_region(&self, person_id: PersonId) -> Option<RegionSlot> {
        self.residents.rights_for_left(person_id).first().copied()
    }

    // Mutations

    /// # Errors
    ///
    /// - [`StoreError::DuplicateIdentifier`] if the region already exists.
    /// - [`StoreError::UnknownIdentifier`] / [`StoreError::TypeMismatch`] for a bad value.
    /// - [`StoreError::MissingRequiredValue`] if a property without a default is not given a
    ///   value.
    pub fn add_region(&mut self, data: RegionConstructionData) -> Result<(), StoreError> {
        let RegionConstructionData {
            region_id,
            property_values,
        } = data;
        if self.region_slots.contains_key(&region_id) {
            return Err(StoreError::DuplicateIdentifier(region_id.to_string()));
        }
        self.properties.validate_initial_values(&property_values)?;

        let slot = self.insert_region(region_id.clone());
        let now = self.context.get_current_time();
        for (property_id, value) in &property_values {
            self.properties.set_value(property_id, slot.0, value, now)?;
        }
        trace!("added region {region_id}");
        self.publish_if_observed(StoreEventKind::RegionAddition, || {
            StoreEvent::RegionAddition(RegionAdditionEvent { region_id })
        });
        Ok(())
    }

    /// Defines a new region property, with values for existing regions.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateIdentifier`] if the property is already defined.
    /// - [`StoreError::UnknownIdentifier`] for a value for an unknown region.
    /// - [`StoreError::TypeMismatch`] for a value that does not fit the definition.
    /// - [`StoreError::MissingRequiredValue`] if the definition has no default and some region
    ///   is not given a value.
    pub fn define_region_property(
        &mut self,
        initialization: RegionPropertyDefinitionInitialization,
    ) -> Result<(), StoreError> {
        let RegionPropertyDefinitionInitialization {
            property_id,
            definition,
            values,
        } = initialization;
        self.properties.validate_new_property(&property_id)?;
        let mut slots = Vec::with_capacity(values.len());
        let mut covered = HashSet::with_capacity(values.len());
        for (region_id, value) in &values {
            let slot = self.region_slot(region_id)?;
            definition.value_type().check(value)?;
            slots.push(slot);
            covered.insert(slot);
        }
        if definition.default_value().is_none() {
            if let Some(uncovered) = self
                .region_ids
                .iter()
                .find(|region_id| !covered.contains(&self.region_slots[*region_id]))
            {
                return Err(StoreError::MissingRequiredValue(format!(
                    "{property_id} of {uncovered}"
                )));
            }
        }

        let now = self.context.get_current_time();
        self.properties
            .define(property_id.clone(), definition, self.region_ids.len())?;
        for (slot, (_, value)) in slots.into_iter().zip(&values) {
            self.properties.set_value(&property_id, slot.0, value, now)?;
        }
        trace!("defined region property {property_id}");
        self.publish_if_observed(StoreEventKind::RegionPropertyDefinition, || {
            StoreEvent::RegionPropertyDefinition(RegionPropertyDefinitionEvent { property_id })
        });
        Ok(())
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] for an unknown region or property.
    /// - [`StoreError::ImmutablePropertyWrite`] if the property is not mutable.
    /// - [`StoreError::TypeMismatch`] if the value does not fit the property.
    pub fn set_region_property_value(
        &mut self,
        region_id: &RegionId,
        property_id: &RegionPropertyId,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        let slot = self.region_slot(region_id)?;
        self.properties.validate_mutable(property_id)?;
        self.properties.validate_value(property_id, &value)?;

        let previous = if self
            .context
            .subscribers_exist(StoreEventKind::RegionPropertyUpdate)
        {
            self.properties.get_value(property_id, slot.0)?
        } else {
            None
        };
        let now = self.context.get_current_time();
        self.properties
            .set_value(property_id, slot.0, &value, now)?;
        trace!("set {property_id} of region {region_id} to {value}");
        if let Some(previous) = previous {
            self.context
                .publish(StoreEvent::RegionPropertyUpdate(RegionPropertyUpdateEvent {
                    region_id: region_id.clone(),
                    property_id: property_id.clone(),
                    previous,
                    current: value,
                }));
        }
        Ok(())
    }

    /// Moves the person into the region, replacing any previous region, and records the
    /// arrival time when tracking is on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] for an unknown person or region.
    pub fn set_person_region(
        &mut self,
        person_id: PersonId,
        region_id: &RegionId,
    ) -> Result<(), StoreError> {
        self.validate_person(person_id)?;
        let slot = self.region_slot(region_id)?;

        let previous = self.current_region(person_id);
        if let Some(previous) = previous {
            self.residents.unlink(person_id, previous);
        }
        self.residents.link(person_id, slot);
        let now = self.context.get_current_time();
        self.record_arrival(person_id, now)?;
        trace!("moved {person_id} to region {region_id}");
        self.publish_if_observed(StoreEventKind::PersonRegionUpdate, || {
            StoreEvent::PersonRegionUpdate(PersonRegionUpdateEvent {
                person_id,
                previous: previous.map(|previous| self.region_ids[previous.0].clone()),
                current: region_id.clone(),
            })
        });
        Ok(())
    }

    /// Drops the region assignment of a person who has left the simulation. No events are
    /// published.
    pub fn handle_person_removal(&mut self, person_id: PersonId) {
        self.residents.remove_left(person_id);
        if let Some(arrival_times) = &mut self.arrival_times {
            arrival_times.remove_id(person_id.0);
        }
        trace!("removed region assignment of {person_id}");
    }

    /// Reserves room for `count` more people.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NegativeCapacityIncrement`] if `count` is negative.
    pub fn expand_capacity(&mut self, count: i64) -> Result<(), StoreError> {
        let additional =
            usize::try_from(count).map_err(|_| StoreError::NegativeCapacityIncrement(count))?;
        self.residents.reserve_lefts(additional);
        if let Some(arrival_times) = &mut self.arrival_times {
            arrival_times.increment_capacity(additional);
        }
        Ok(())
    }

    // Queries

    /// Regions in order of addition.
    #[must_use]
    pub fn get_region_ids(&self) -> Vec<RegionId> {
        self.region_ids.clone()
    }

    #[must_use]
    pub fn region_exists(&self, region_id: &RegionId) -> bool {
        self.region_slots.contains_key(region_id)
    }

    /// The region of the person, or `None` if they have not been placed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn get_person_region(&self, person_id: PersonId) -> Result<Option<RegionId>, StoreError> {
        self.validate_person(person_id)?;
        Ok(self
            .current_region(person_id)
            .map(|slot| self.region_ids[slot.0].clone()))
    }

    #[must_use]
    pub fn person_region_arrival_tracking(&self) -> bool {
        self.arrival_times.is_some()
    }

    /// The time the person arrived in their current region, or 0 if they were never placed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the person does not exist.
    /// - [`StoreError::TimeTrackingDisabled`] if arrival times are not tracked.
    pub fn get_person_region_arrival_time(&self, person_id: PersonId) -> Result<f64, StoreError> {
        self.validate_person(person_id)?;
        let arrival_times = self.arrival_times.as_ref().ok_or_else(|| {
            StoreError::TimeTrackingDisabled("person region arrival".to_string())
        })?;
        match arrival_times.get_property_value(person_id.0) {
            Some(PropertyValue::Double(time)) => Ok(time),
            _ => Ok(0.0),
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the region does not exist.
    pub fn get_people_in_region(&self, region_id: &RegionId) -> Result<Vec<PersonId>, StoreError> {
        Ok(self.residents.lefts_for_right(self.region_slot(region_id)?))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the region does not exist.
    pub fn get_person_count_for_region(&self, region_id: &RegionId) -> Result<usize, StoreError> {
        Ok(self
            .residents
            .left_count_for_right(self.region_slot(region_id)?))
    }

    /// Property ids in definition order.
    #[must_use]
    pub fn get_region_property_ids(&self) -> Vec<RegionPropertyId> {
        self.properties.property_ids()
    }

    #[must_use]
    pub fn region_property_id_exists(&self, property_id: &RegionPropertyId) -> bool {
        self.properties.contains(property_id)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the property does not exist.
    pub fn get_region_property_definition(
        &self,
        property_id: &RegionPropertyId,
    ) -> Result<&PropertyDefinition, StoreError> {
        self.properties.definition(property_id)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the region or property does not exist.
    pub fn get_region_property_value(
        &self,
        region_id: &RegionId,
        property_id: &RegionPropertyId,
    ) -> Result<PropertyValue, StoreError> {
        let slot = self.region_slot(region_id)?;
        self.properties
            .get_value(property_id, slot.0)?
            .ok_or_else(|| {
                StoreError::MissingRequiredValue(format!("{property_id} of {region_id}"))
            })
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the region or property does not exist.
    /// - [`StoreError::TimeTrackingDisabled`] if the property is not time tracked.
    pub fn get_region_property_time(
        &self,
        region_id: &RegionId,
        property_id: &RegionPropertyId,
    ) -> Result<f64, StoreError> {
        let slot = self.region_slot(region_id)?;
        self.properties.get_time(property_id, slot.0)
    }

    /// Writes the complete state into `builder`: regions, property definitions and values with
    /// their times, and every placed person with their arrival time.
    pub fn record_state(&self, builder: &mut RegionsPluginDataBuilder) {
        builder.set_person_region_arrival_tracking(self.arrival_times.is_some());
        for region_id in &self.region_ids {
            builder.add_region(region_id.clone());
        }
        for property_id in self.properties.property_ids() {
            if let Ok(definition) = self.properties.definition(&property_id) {
                builder.define_region_property(property_id, definition.clone());
            }
        }
        for (slot, region_id) in self.region_ids.iter().enumerate() {
            for property_id in self.properties.property_ids() {
                let Ok(Some(value)) = self.properties.get_value(&property_id, slot) else {
                    continue;
                };
                match self.properties.get_time(&property_id, slot) {
                    Ok(time) => builder.set_region_property_value_at(
                        region_id.clone(),
                        property_id,
                        value,
                        time,
                    ),
                    Err(_) => {
                        builder.set_region_property_value(region_id.clone(), property_id, value)
                    }
                };
            }
            for person_id in self.residents.lefts_for_right(RegionSlot(slot)) {
                match self.get_person_region_arrival_time(person_id) {
                    Ok(time) => builder.set_person_region_at(person_id, region_id.clone(), time),
                    Err(_) => builder.set_person_region(person_id, region_id.clone()),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_context::SimulationContext;

    fn setup(people: usize, tracking: bool) -> (Rc<SimulationContext>, RegionsDataManager) {
        let context = Rc::new(SimulationContext::new());
        for _ in 0..people {
            context.add_person();
        }
        let data = RegionsPluginData::builder()
            .add_region("north")
            .add_region("south")
            .define_region_property(
                "lockdown",
                PropertyDefinition::builder()
                    .value_type(PropertyValueType::Boolean)
                    .default_value(PropertyValue::Boolean(false))
                    .time_tracked(true)
                    .build()
                    .unwrap(),
            )
            .set_person_region_arrival_tracking(tracking)
            .build()
            .unwrap();
        let manager = RegionsDataManager::new(data, context.clone()).unwrap();
        (context, manager)
    }

    fn north() -> RegionId {
        RegionId::from("north")
    }

    fn south() -> RegionId {
        RegionId::from("south")
    }

    #[test]
    fn moving_people_between_regions() {
        let (context, mut manager) = setup(2, true);
        assert_eq!(manager.get_person_region(PersonId(0)).unwrap(), None);

        manager.set_person_region(PersonId(0), &north()).unwrap();
        manager.set_person_region(PersonId(1), &north()).unwrap();
        context.set_current_time(4.0);
        context.subscribe(StoreEventKind::PersonRegionUpdate);
        manager.set_person_region(PersonId(0), &south()).unwrap();

        assert_eq!(manager.get_person_region(PersonId(0)).unwrap(), Some(south()));
        assert_eq!(manager.get_people_in_region(&north()).unwrap(), vec![PersonId(1)]);
        assert_eq!(manager.get_person_count_for_region(&south()).unwrap(), 1);
        assert_eq!(manager.get_person_region_arrival_time(PersonId(0)).unwrap(), 4.0);
        assert_eq!(manager.get_person_region_arrival_time(PersonId(1)).unwrap(), 0.0);
        assert_eq!(
            context.take_events(),
            vec![StoreEvent::PersonRegionUpdate(PersonRegionUpdateEvent {
                person_id: PersonId(0),
                previous: Some(north()),
                current: south(),
            })]
        );
    }

    #[test]
    fn arrival_time_requires_tracking() {
        let (_context, mut manager) = setup(1, false);
        manager.set_person_region(PersonId(0), &north()).unwrap();
        assert!(matches!(
            manager.get_person_region_arrival_time(PersonId(0)),
            Err(StoreError::TimeTrackingDisabled(_))
        ));
    }

    #[test]
    fn unknown_people_and_regions() {
        let (_context, mut manager) = setup(1, false);
        assert!(matches!(
            manager.set_person_region(PersonId(3), &north()),
            Err(StoreError::UnknownIdentifier(_))
        ));
        assert!(matches!(
            manager.set_person_region(PersonId(0), &RegionId::from("east")),
            Err(StoreError::UnknownIdentifier(_))
        ));
        assert_eq!(manager.get_person_region(PersonId(0)).unwrap(), None);
    }

    #[test]
    fn region_properties() {
        let (context, mut manager) = setup(0, false);
        let lockdown = RegionPropertyId::from("lockdown");
        context.subscribe(StoreEventKind::RegionPropertyUpdate);
        context.set_current_time(1.0);
        manager
            .set_region_property_value(&north(), &lockdown, PropertyValue::Boolean(true))
            .unwrap();
        assert_eq!(
            manager.get_region_property_value(&north(), &lockdown).unwrap(),
            PropertyValue::Boolean(true)
        );
        assert_eq!(manager.get_region_property_time(&north(), &lockdown).unwrap(), 1.0);
        assert_eq!(manager.get_region_property_time(&south(), &lockdown).unwrap(), 0.0);
        assert_eq!(context.take_events().len(), 1);
    }

    #[test]
    fn adding_regions_and_properties() {
        let (context, mut manager) = setup(0, false);
        context.subscribe(StoreEventKind::RegionAddition);
        context.subscribe(StoreEventKind::RegionPropertyDefinition);

        let population = PropertyDefinition::builder()
            .value_type(PropertyValueType::Int)
            .build()
            .unwrap();
        let initialization = RegionPropertyDefinitionInitialization::new("population", population)
            .with_value("north", PropertyValue::Int(100));
        assert!(matches!(
            manager.define_region_property(initialization.clone()),
            Err(StoreError::MissingRequiredValue(_))
        ));
        manager
            .define_region_property(initialization.with_value("south", PropertyValue::Int(50)))
            .unwrap();

        assert!(matches!(
            manager.add_region(RegionConstructionData::new("east")),
            Err(StoreError::MissingRequiredValue(_))
        ));
        manager
            .add_region(
                RegionConstructionData::new("east")
                    .with_property_value("population", PropertyValue::Int(7)),
            )
            .unwrap();
        assert!(matches!(
            manager.add_region(RegionConstructionData::new("east")),
            Err(StoreError::DuplicateIdentifier(_))
        ));
        assert_eq!(manager.get_region_ids().len(), 3);
        assert_eq!(
            manager
                .get_region_property_value(
                    &RegionId::from("east"),
                    &RegionPropertyId::from("population")
                )
                .unwrap(),
            PropertyValue::Int(7)
        );
        assert_eq!(context.take_events().len(), 2);
    }

    #[test]
    fn person_removal_and_capacity() {
        let (context, mut manager) = setup(2, true);
        manager.set_person_region(PersonId(0), &north()).unwrap();
        manager.set_person_region(PersonId(1), &north()).unwrap();
        context.population().remove_person(PersonId(0)).unwrap();
        manager.handle_person_removal(PersonId(0));
        assert_eq!(manager.get_people_in_region(&north()).unwrap(), vec![PersonId(1)]);

        manager.expand_capacity(100).unwrap();
        assert!(matches!(
            manager.expand_capacity(-3),
            Err(StoreError::NegativeCapacityIncrement(-3))
        ));
    }
}
