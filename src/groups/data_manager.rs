use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::{debug, trace};

use crate::error::StoreError;
use crate::events::{
    GroupAdditionEvent, GroupImminentRemovalEvent, GroupMembershipAdditionEvent,
    GroupMembershipRemovalEvent, GroupPropertyDefinitionEvent, GroupPropertyUpdateEvent,
    GroupTypeAdditionEvent, StoreEvent, StoreEventKind,
};
use crate::groups::{
    GroupConstructionInfo, GroupId, GroupPropertyDefinitionInitialization, GroupPropertyId,
    GroupSampler, GroupTypeId, GroupsPluginData, GroupsPluginDataBuilder,
};
use crate::people::PersonId;
use crate::plugin_context::PluginContext;
use crate::plugin_data::PluginData;
use crate::property::{PropertyDefinition, PropertyTable, PropertyValue};
use crate::random::{UniformRandomSource, WeightedSampler};
use crate::relationship::RelationshipIndex;
use crate::{HashMap, HashMapExt, HashSet, HashSetExt};

#[derive(Debug)]
struct GroupType {
    id: GroupTypeId,
    properties: PropertyTable<GroupPropertyId>,
}

/// Owns groups, their property values, and the people-to-groups membership index.
///
/// Every mutation checks all of its preconditions before changing anything, so an `Err` leaves
/// the data manager untouched. Events are built only when the context reports a subscriber for
/// their kind.
pub struct GroupsDataManager {
    context: Rc<dyn PluginContext>,
    memberships: RelationshipIndex<PersonId, GroupId>,
    // Indexed by the relationship index's type index.
    group_types: Vec<GroupType>,
    type_indices: HashMap<GroupTypeId, usize>,
    sampler: WeightedSampler<PersonId>,
}

impl Debug for GroupsDataManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupsDataManager")
            .field("group_types", &self.group_types)
            .field("memberships", &self.memberships)
            .finish_non_exhaustive()
    }
}

impl GroupsDataManager {
    /// Builds the data manager from its initial state. No events are published.
    ///
    /// # Errors
    ///
    /// - Any validation error of `data` (see [`PluginData::validate`]).
    /// - [`StoreError::UnknownIdentifier`] if a membership names a person the context does not
    ///   know.
    pub fn new(data: GroupsPluginData, context: Rc<dyn PluginContext>) -> Result<Self, StoreError> {
        data.validate()?;
        for membership in data.memberships() {
            if !context.person_exists(membership.person_id) {
                return Err(StoreError::UnknownIdentifier(
                    membership.person_id.to_string(),
                ));
            }
        }

        let mut manager = Self {
            context,
            memberships: RelationshipIndex::new(),
            group_types: Vec::new(),
            type_indices: HashMap::new(),
            sampler: WeightedSampler::new(),
        };
        for group_type_id in data.group_type_ids() {
            manager.insert_group_type(group_type_id.clone());
        }
        let initial_size = data.next_group_id();
        for record in data.property_definitions() {
            let type_index = manager.type_index(&record.group_type_id)?;
            manager.group_types[type_index].properties.define(
                record.property_id.clone(),
                record.definition.clone(),
                initial_size,
            )?;
        }
        for group in data.groups() {
            let type_index = manager.type_index(&group.group_type_id)?;
            manager.memberships.add_right_with_id(group.group_id, type_index);
        }
        manager.memberships.advance_next_right(initial_size);

        let now = manager.context.get_current_time();
        for record in data.property_values() {
            let type_index = manager.group_type_index(record.group_id)?;
            manager.group_types[type_index].properties.set_value(
                &record.property_id,
                record.group_id.0,
                &record.value,
                record.time.unwrap_or(now),
            )?;
        }
        for membership in data.memberships() {
            manager
                .memberships
                .link(membership.person_id, membership.group_id);
        }
        debug!(
            "loaded {} groups of {} types",
            data.groups().len(),
            data.group_type_ids().len()
        );
        Ok(manager)
    }

    fn publish_if_observed(&self, kind: StoreEventKind, event: impl FnOnce() -> StoreEvent) {
        if self.context.subscribers_exist(kind) {
            self.context.publish(event());
        }
    }

    fn insert_group_type(&mut self, group_type_id: GroupTypeId) -> usize {
        let type_index = self.memberships.add_type();
        self.type_indices.insert(group_type_id.clone(), type_index);
        self.group_types.push(GroupType {
            id: group_type_id,
            properties: PropertyTable::new(),
        });
        type_index
    }

    fn type_index(&self, group_type_id: &GroupTypeId) -> Result<usize, StoreError> {
        self.type_indices
            .get(group_type_id)
            .copied()
            .ok_or_else(|| StoreError::UnknownIdentifier(group_type_id.to_string()))
    }

    fn group_type_index(&self, group_id: GroupId) -> Result<usize, StoreError> {
        self.memberships
            .right_type(group_id)
            .ok_or_else(|| StoreError::UnknownIdentifier(group_id.to_string()))
    }

    fn validate_person(&self, person_id: PersonId) -> Result<(), StoreError> {
        if self.context.person_exists(person_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownIdentifier(person_id.to_string()))
        }
    }

    // Mutations

    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentifier`] if the group type already exists.
    pub fn add_group_type(&mut self, group_type_id: GroupTypeId) -> Result<(), StoreError> {
        if self.type_indices.contains_key(&group_type_id) {
            return Err(StoreError::DuplicateIdentifier(group_type_id.to_string()));
        }
        self.insert_group_type(group_type_id.clone());
        trace!("added group type {group_type_id}");
        self.publish_if_observed(StoreEventKind::GroupTypeAddition, || {
            StoreEvent::GroupTypeAddition(GroupTypeAdditionEvent { group_type_id })
        });
        Ok(())
    }

    /// Adds a group and returns its id. The values are stamped with the current time.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] for an unknown group type or property.
    /// - [`StoreError::TypeMismatch`] for a value that does not fit its property.
    /// - [`StoreError::MissingRequiredValue`] if a property without a default is not given a
    ///   value.
    pub fn add_group(&mut self, info: GroupConstructionInfo) -> Result<GroupId, StoreError> {
        let type_index = self.type_index(&info.group_type_id)?;
        self.group_types[type_index]
            .properties
            .validate_initial_values(&info.property_values)?;

        let group_id = self.memberships.add_right(type_index);
        let now = self.context.get_current_time();
        let properties = &mut self.group_types[type_index].properties;
        for (property_id, value) in &info.property_values {
            properties.set_value(property_id, group_id.0, value, now)?;
        }
        trace!("added {group_id} of type {}", info.group_type_id);
        self.publish_if_observed(StoreEventKind::GroupAddition, || {
            StoreEvent::GroupAddition(GroupAdditionEvent { group_id })
        });
        Ok(group_id)
    }

    /// Defines a new property for a group type, with values for existing groups.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] for an unknown group type, or a value for a group
    ///   that does not exist or is of another type.
    /// - [`StoreError::DuplicateIdentifier`] if the property is already defined for the type.
    /// - [`StoreError::TypeMismatch`] for a value that does not fit the definition.
    /// - [`StoreError::MissingRequiredValue`] if the definition has no default and some existing
    ///   group of the type is not given a value. Nothing is stored in that case.
    pub fn define_group_property(
        &mut self,
        initialization: GroupPropertyDefinitionInitialization,
    ) -> Result<(), StoreError> {
        let GroupPropertyDefinitionInitialization {
            group_type_id,
            property_id,
            definition,
            values,
        } = initialization;
        let type_index = self.type_index(&group_type_id)?;
        self.group_types[type_index]
            .properties
            .validate_new_property(&property_id)?;

        let mut covered = HashSet::with_capacity(values.len());
        for (group_id, value) in &values {
            if self.memberships.right_type(*group_id) != Some(type_index) {
                return Err(StoreError::UnknownIdentifier(format!(
                    "{group_id} of type {group_type_id}"
                )));
            }
            definition.value_type().check(value)?;
            covered.insert(*group_id);
        }
        if definition.default_value().is_none() {
            if let Some(uncovered) = self
                .memberships
                .rights_for_type(type_index)
                .into_iter()
                .find(|group_id| !covered.contains(group_id))
            {
                return Err(StoreError::MissingRequiredValue(format!(
                    "{property_id} of {uncovered}"
                )));
            }
        }

        let now = self.context.get_current_time();
        let initial_size = self.memberships.next_right();
        let properties = &mut self.group_types[type_index].properties;
        properties.define(property_id.clone(), definition, initial_size)?;
        for (group_id, value) in &values {
            properties.set_value(&property_id, group_id.0, value, now)?;
        }
        trace!("defined property {property_id} of group type {group_type_id}");
        self.publish_if_observed(StoreEventKind::GroupPropertyDefinition, || {
            StoreEvent::GroupPropertyDefinition(GroupPropertyDefinitionEvent {
                group_type_id,
                property_id,
            })
        });
        Ok(())
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] for an unknown group or property.
    /// - [`StoreError::ImmutablePropertyWrite`] if the property is not mutable.
    /// - [`StoreError::TypeMismatch`] if the value does not fit the property.
    pub fn set_group_property_value(
        &mut self,
        group_id: GroupId,
        property_id: &GroupPropertyId,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        let type_index = self.group_type_index(group_id)?;
        let properties = &self.group_types[type_index].properties;
        properties.validate_mutable(property_id)?;
        properties.validate_value(property_id, &value)?;

        let observed = self
            .context
            .subscribers_exist(StoreEventKind::GroupPropertyUpdate);
        let previous = if observed {
            properties.get_value(property_id, group_id.0)?
        } else {
            None
        };
        let now = self.context.get_current_time();
        self.group_types[type_index].properties.set_value(
            property_id,
            group_id.0,
            &value,
            now,
        )?;
        trace!("set {property_id} of {group_id} to {value}");
        if let Some(previous) = previous {
            self.context
                .publish(StoreEvent::GroupPropertyUpdate(GroupPropertyUpdateEvent {
                    group_id,
                    property_id: property_id.clone(),
                    previous,
                    current: value,
                }));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] for an unknown person or group.
    /// - [`StoreError::DuplicateIdentifier`] if the person is already a member.
    pub fn add_person_to_group(
        &mut self,
        person_id: PersonId,
        group_id: GroupId,
    ) -> Result<(), StoreError> {
        self.validate_person(person_id)?;
        self.group_type_index(group_id)?;
        if self.memberships.is_linked(person_id, group_id) {
            return Err(StoreError::DuplicateIdentifier(format!(
                "{person_id} in {group_id}"
            )));
        }
        self.memberships.link(person_id, group_id);
        trace!("added {person_id} to {group_id}");
        self.publish_if_observed(StoreEventKind::GroupMembershipAddition, || {
            StoreEvent::GroupMembershipAddition(GroupMembershipAdditionEvent {
                person_id,
                group_id,
            })
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] for an unknown person or group, or if the
    /// person is not a member of the group.
    pub fn remove_person_from_group(
        &mut self,
        person_id: PersonId,
        group_id: GroupId,
    ) -> Result<(), StoreError> {
        self.validate_person(person_id)?;
        self.group_type_index(group_id)?;
        if !self.memberships.is_linked(person_id, group_id) {
            return Err(StoreError::UnknownIdentifier(format!(
                "{person_id} in {group_id}"
            )));
        }
        self.memberships.unlink(person_id, group_id);
        trace!("removed {person_id} from {group_id}");
        self.publish_if_observed(StoreEventKind::GroupMembershipRemoval, || {
            StoreEvent::GroupMembershipRemoval(GroupMembershipRemovalEvent {
                person_id,
                group_id,
            })
        });
        Ok(())
    }

    /// Removes the group and all of its memberships. The imminent-removal event is published
    /// while the group is still fully queryable. Property values are retired lazily.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group does not exist.
    pub fn remove_group(&mut self, group_id: GroupId) -> Result<(), StoreError> {
        let type_index = self.group_type_index(group_id)?;
        self.publish_if_observed(StoreEventKind::GroupImminentRemoval, || {
            StoreEvent::GroupImminentRemoval(GroupImminentRemovalEvent { group_id })
        });
        self.memberships.remove_right(group_id);
        self.group_types[type_index]
            .properties
            .remove_slot(group_id.0);
        trace!("removed {group_id}");
        Ok(())
    }

    /// Drops every membership of a person who has left the simulation. No events are
    /// published.
    pub fn handle_person_removal(&mut self, person_id: PersonId) {
        self.memberships.remove_left(person_id);
        trace!("removed memberships of {person_id}");
    }

    /// Reserves room for `count` more groups.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NegativeCapacityIncrement`] if `count` is negative.
    pub fn expand_capacity(&mut self, count: i64) -> Result<(), StoreError> {
        let additional =
            usize::try_from(count).map_err(|_| StoreError::NegativeCapacityIncrement(count))?;
        self.memberships.reserve_rights(additional);
        for group_type in &mut self.group_types {
            group_type.properties.increment_capacity(additional);
        }
        Ok(())
    }

    // Queries

    #[must_use]
    pub fn get_group_type_ids(&self) -> Vec<GroupTypeId> {
        self.group_types.iter().map(|t| t.id.clone()).collect()
    }

    #[must_use]
    pub fn group_type_id_exists(&self, group_type_id: &GroupTypeId) -> bool {
        self.type_indices.contains_key(group_type_id)
    }

    /// Every existing group in increasing id order.
    #[must_use]
    pub fn get_group_ids(&self) -> Vec<GroupId> {
        self.memberships.right_ids()
    }

    #[must_use]
    pub fn group_exists(&self, group_id: GroupId) -> bool {
        self.memberships.contains_right(group_id)
    }

    #[must_use]
    pub fn get_group_count(&self) -> usize {
        self.memberships.right_count()
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group does not exist.
    pub fn get_group_type(&self, group_id: GroupId) -> Result<GroupTypeId, StoreError> {
        let type_index = self.group_type_index(group_id)?;
        Ok(self.group_types[type_index].id.clone())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type does not exist.
    pub fn get_groups_for_group_type(
        &self,
        group_type_id: &GroupTypeId,
    ) -> Result<Vec<GroupId>, StoreError> {
        Ok(self
            .memberships
            .rights_for_type(self.type_index(group_type_id)?))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type does not exist.
    pub fn get_group_count_for_group_type(
        &self,
        group_type_id: &GroupTypeId,
    ) -> Result<usize, StoreError> {
        Ok(self
            .memberships
            .right_count_for_type(self.type_index(group_type_id)?))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn get_groups_for_person(&self, person_id: PersonId) -> Result<Vec<GroupId>, StoreError> {
        self.validate_person(person_id)?;
        Ok(self.memberships.rights_for_left(person_id))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn get_group_count_for_person(&self, person_id: PersonId) -> Result<usize, StoreError> {
        self.validate_person(person_id)?;
        Ok(self.memberships.right_count_for_left(person_id))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type or the person does not exist.
    pub fn get_groups_for_group_type_and_person(
        &self,
        group_type_id: &GroupTypeId,
        person_id: PersonId,
    ) -> Result<Vec<GroupId>, StoreError> {
        let type_index = self.type_index(group_type_id)?;
        self.validate_person(person_id)?;
        Ok(self
            .memberships
            .rights_for_left_and_type(person_id, type_index))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type or the person does not exist.
    pub fn get_group_count_for_group_type_and_person(
        &self,
        group_type_id: &GroupTypeId,
        person_id: PersonId,
    ) -> Result<usize, StoreError> {
        Ok(self
            .get_groups_for_group_type_and_person(group_type_id, person_id)?
            .len())
    }

    /// The distinct types of the groups the person belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn get_group_types_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<Vec<GroupTypeId>, StoreError> {
        self.validate_person(person_id)?;
        Ok(self
            .memberships
            .types_for_left(person_id)
            .into_iter()
            .map(|type_index| self.group_types[type_index].id.clone())
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn get_group_type_count_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<usize, StoreError> {
        self.validate_person(person_id)?;
        Ok(self.memberships.types_for_left(person_id).len())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group does not exist.
    pub fn get_people_for_group(&self, group_id: GroupId) -> Result<Vec<PersonId>, StoreError> {
        self.group_type_index(group_id)?;
        Ok(self.memberships.lefts_for_right(group_id))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group does not exist.
    pub fn get_person_count_for_group(&self, group_id: GroupId) -> Result<usize, StoreError> {
        self.group_type_index(group_id)?;
        Ok(self.memberships.left_count_for_right(group_id))
    }

    /// The distinct people who belong to at least one group of the type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type does not exist.
    pub fn get_people_for_group_type(
        &self,
        group_type_id: &GroupTypeId,
    ) -> Result<Vec<PersonId>, StoreError> {
        Ok(self
            .memberships
            .lefts_for_type(self.type_index(group_type_id)?))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type does not exist.
    pub fn get_person_count_for_group_type(
        &self,
        group_type_id: &GroupTypeId,
    ) -> Result<usize, StoreError> {
        Ok(self
            .memberships
            .left_count_for_type(self.type_index(group_type_id)?))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person or the group does not exist.
    pub fn is_person_in_group(
        &self,
        person_id: PersonId,
        group_id: GroupId,
    ) -> Result<bool, StoreError> {
        self.validate_person(person_id)?;
        self.group_type_index(group_id)?;
        Ok(self.memberships.is_linked(person_id, group_id))
    }

    #[must_use]
    pub fn group_property_id_exists(
        &self,
        group_type_id: &GroupTypeId,
        property_id: &GroupPropertyId,
    ) -> bool {
        self.type_index(group_type_id)
            .is_ok_and(|type_index| self.group_types[type_index].properties.contains(property_id))
    }

    /// Property ids of the group type in definition order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type does not exist.
    pub fn get_group_property_ids(
        &self,
        group_type_id: &GroupTypeId,
    ) -> Result<Vec<GroupPropertyId>, StoreError> {
        let type_index = self.type_index(group_type_id)?;
        Ok(self.group_types[type_index].properties.property_ids())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group type or property does not exist.
    pub fn get_group_property_definition(
        &self,
        group_type_id: &GroupTypeId,
        property_id: &GroupPropertyId,
    ) -> Result<&PropertyDefinition, StoreError> {
        let type_index = self.type_index(group_type_id)?;
        self.group_types[type_index].properties.definition(property_id)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the group or property does not exist.
    pub fn get_group_property_value(
        &self,
        group_id: GroupId,
        property_id: &GroupPropertyId,
    ) -> Result<PropertyValue, StoreError> {
        let type_index = self.group_type_index(group_id)?;
        self.group_types[type_index]
            .properties
            .get_value(property_id, group_id.0)?
            .ok_or_else(|| StoreError::MissingRequiredValue(format!("{property_id} of {group_id}")))
    }

    /// The time the value was last assigned, or 0 if it never was.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the group or property does not exist.
    /// - [`StoreError::TimeTrackingDisabled`] if the property is not time tracked.
    pub fn get_group_property_time(
        &self,
        group_id: GroupId,
        property_id: &GroupPropertyId,
    ) -> Result<f64, StoreError> {
        let type_index = self.group_type_index(group_id)?;
        self.group_types[type_index]
            .properties
            .get_time(property_id, group_id.0)
    }

    /// Selects one member of the group, uniformly or by weight. Returns `Ok(None)` when no
    /// member is eligible.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownIdentifier`] if the group, or the excluded person, does not exist.
    /// - [`StoreError::MalformedWeightingFunction`] if the weighting function returns a negative,
    ///   NaN, or infinite weight.
    /// - [`StoreError::ReentrantSamplingAccess`] if called from inside a weighting function.
    pub fn sample_group(
        &self,
        group_id: GroupId,
        sampler: &GroupSampler<'_>,
        rng: &mut dyn UniformRandomSource,
    ) -> Result<Option<PersonId>, StoreError> {
        self.group_type_index(group_id)?;
        if let Some(excluded) = sampler.excluded_person() {
            self.validate_person(excluded)?;
        }
        let candidates = self.memberships.lefts_for_right(group_id);
        match sampler.weighting_function() {
            None => self
                .sampler
                .sample(&candidates, sampler.excluded_person(), None, rng),
            Some(weighting_function) => {
                let mut weigh = |person_id| weighting_function(self, person_id, group_id);
                self.sampler.sample(
                    &candidates,
                    sampler.excluded_person(),
                    Some(&mut weigh),
                    rng,
                )
            }
        }
    }

    /// Writes the complete state into `builder` so that an identical data manager can be
    /// built from it: types, definitions, groups, every property value with its assignment
    /// time, memberships, and the next group id.
    pub fn record_state(&self, builder: &mut GroupsPluginDataBuilder) {
        for group_type in &self.group_types {
            builder.add_group_type(group_type.id.clone());
        }
        for group_type in &self.group_types {
            for property_id in group_type.properties.property_ids() {
                if let Ok(definition) = group_type.properties.definition(&property_id) {
                    builder.define_group_property(
                        group_type.id.clone(),
                        property_id,
                        definition.clone(),
                    );
                }
            }
        }
        for group_id in self.memberships.right_ids() {
            let Some(type_index) = self.memberships.right_type(group_id) else {
                continue;
            };
            let group_type = &self.group_types[type_index];
            builder.add_group(group_id, group_type.id.clone());
            for property_id in group_type.properties.property_ids() {
                let Ok(Some(value)) = group_type.properties.get_value(&property_id, group_id.0)
                else {
                    continue;
                };
                match group_type.properties.get_time(&property_id, group_id.0) {
                    Ok(time) => {
                        builder.set_group_property_value_at(group_id, property_id, value, time)
                    }
                    Err(_) => builder.set_group_property_value(group_id, property_id, value),
                };
            }
            for person_id in self.memberships.lefts_for_right(group_id) {
                builder.add_person_to_group(person_id, group_id);
            }
        }
        builder.set_next_group_id(self.memberships.next_right());
    }
}
