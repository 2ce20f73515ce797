use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::groups::{GroupId, GroupPropertyId, GroupTypeId};
use crate::people::PersonId;
use crate::plugin_data::PluginData;
use crate::property::{PropertyDefinition, PropertyValue};
use crate::{HashMap, HashMapExt, HashSet, HashSetExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPropertyDefinitionRecord {
    pub group_type_id: GroupTypeId,
    pub property_id: GroupPropertyId,
    pub definition: PropertyDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group_id: GroupId,
    pub group_type_id: GroupTypeId,
}

/// An explicitly assigned property value. `time` is the assignment time of a time-tracked
/// property; when absent the value is stamped with the current time on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPropertyValueRecord {
    pub group_id: GroupId,
    pub property_id: GroupPropertyId,
    pub value: PropertyValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub person_id: PersonId,
    pub group_id: GroupId,
}

/// The initial state of a [`GroupsDataManager`](crate::groups::GroupsDataManager): group types,
/// property definitions, groups, property values, and memberships.
///
/// Produced by [`GroupsPluginDataBuilder`], by loading a JSON document, or by recording the
/// state of a running data manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupsPluginData {
    group_type_ids: Vec<GroupTypeId>,
    property_definitions: Vec<GroupPropertyDefinitionRecord>,
    groups: Vec<GroupRecord>,
    property_values: Vec<GroupPropertyValueRecord>,
    memberships: Vec<MembershipRecord>,
    #[serde(default)]
    next_group_id: usize,
}

impl GroupsPluginData {
    #[must_use]
    pub fn builder() -> GroupsPluginDataBuilder {
        GroupsPluginDataBuilder::default()
    }

    #[must_use]
    pub fn group_type_ids(&self) -> &[GroupTypeId] {
        &self.group_type_ids
    }

    #[must_use]
    pub fn property_definitions(&self) -> &[GroupPropertyDefinitionRecord] {
        &self.property_definitions
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupRecord] {
        &self.groups
    }

    #[must_use]
    pub fn property_values(&self) -> &[GroupPropertyValueRecord] {
        &self.property_values
    }

    #[must_use]
    pub fn memberships(&self) -> &[MembershipRecord] {
        &self.memberships
    }

    /// The id the next added group will receive; never less than one more than the largest
    /// group id.
    #[must_use]
    pub fn next_group_id(&self) -> usize {
        self.groups
            .iter()
            .map(|group| group.group_id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_group_id)
    }
}

impl PluginData for GroupsPluginData {
    /// # Errors
    ///
    /// - [`StoreError::DuplicateIdentifier`] for a repeated group type, property, group, or
    ///   membership.
    /// - [`StoreError::UnknownIdentifier`] for a reference to an undeclared group type, property,
    ///   or group.
    /// - [`StoreError::TypeMismatch`] for a default or value that does not fit its property.
    /// - [`StoreError::MissingRequiredValue`] if a group lacks a value for a property without a
    ///   default.
    fn validate(&self) -> Result<(), StoreError> {
        let mut group_types = HashSet::new();
        for group_type_id in &self.group_type_ids {
            if !group_types.insert(group_type_id) {
                return Err(StoreError::DuplicateIdentifier(group_type_id.to_string()));
            }
        }

        let mut definitions = HashMap::new();
        for record in &self.property_definitions {
            if !group_types.contains(&record.group_type_id) {
                return Err(StoreError::UnknownIdentifier(record.group_type_id.to_string()));
            }
            record.definition.validate()?;
            let key = (&record.group_type_id, &record.property_id);
            if definitions.insert(key, &record.definition).is_some() {
                return Err(StoreError::DuplicateIdentifier(format!(
                    "{} of {}",
                    record.property_id, record.group_type_id
                )));
            }
        }

        let mut group_types_by_id = HashMap::new();
        for group in &self.groups {
            if !group_types.contains(&group.group_type_id) {
                return Err(StoreError::UnknownIdentifier(group.group_type_id.to_string()));
            }
            if group_types_by_id
                .insert(group.group_id, &group.group_type_id)
                .is_some()
            {
                return Err(StoreError::DuplicateIdentifier(group.group_id.to_string()));
            }
        }

        let mut assigned = HashSet::new();
        for record in &self.property_values {
            let group_type_id = group_types_by_id
                .get(&record.group_id)
                .ok_or_else(|| StoreError::UnknownIdentifier(record.group_id.to_string()))?;
            let definition = definitions
                .get(&(*group_type_id, &record.property_id))
                .ok_or_else(|| StoreError::UnknownIdentifier(record.property_id.to_string()))?;
            definition.value_type().check(&record.value)?;
            assigned.insert((record.group_id, &record.property_id));
        }

        for group in &self.groups {
            for record in &self.property_definitions {
                if record.group_type_id == group.group_type_id
                    && record.definition.default_value().is_none()
                    && !assigned.contains(&(group.group_id, &record.property_id))
                {
                    return Err(StoreError::MissingRequiredValue(format!(
                        "{} of {}",
                        record.property_id, group.group_id
                    )));
                }
            }
        }

        let mut memberships = HashSet::with_capacity(self.memberships.len());
        for membership in &self.memberships {
            if !group_types_by_id.contains_key(&membership.group_id) {
                return Err(StoreError::UnknownIdentifier(membership.group_id.to_string()));
            }
            if !memberships.insert(*membership) {
                return Err(StoreError::DuplicateIdentifier(format!(
                    "{} in {}",
                    membership.person_id, membership.group_id
                )));
            }
        }
        Ok(())
    }
}

/// Collects the contents of a [`GroupsPluginData`]. Nothing is checked until
/// [`build`](Self::build).
#[derive(Debug, Default)]
pub struct GroupsPluginDataBuilder {
    data: GroupsPluginData,
    // Position of each (group, property) record in `data.property_values`.
    value_positions: HashMap<(GroupId, GroupPropertyId), usize>,
}

impl GroupsPluginDataBuilder {
    pub fn add_group_type(&mut self, group_type_id: impl Into<GroupTypeId>) -> &mut Self {
        self.data.group_type_ids.push(group_type_id.into());
        self
    }

    pub fn define_group_property(
        &mut self,
        group_type_id: impl Into<GroupTypeId>,
        property_id: impl Into<GroupPropertyId>,
        definition: PropertyDefinition,
    ) -> &mut Self {
        self.data
            .property_definitions
            .push(GroupPropertyDefinitionRecord {
                group_type_id: group_type_id.into(),
                property_id: property_id.into(),
                definition,
            });
        self
    }

    pub fn add_group(
        &mut self,
        group_id: GroupId,
        group_type_id: impl Into<GroupTypeId>,
    ) -> &mut Self {
        self.data.groups.push(GroupRecord {
            group_id,
            group_type_id: group_type_id.into(),
        });
        self
    }

    pub fn set_group_property_value(
        &mut self,
        group_id: GroupId,
        property_id: impl Into<GroupPropertyId>,
        value: PropertyValue,
    ) -> &mut Self {
        self.push_value(group_id, property_id.into(), value, None)
    }

    /// Sets a value together with its recorded assignment time.
    pub fn set_group_property_value_at(
        &mut self,
        group_id: GroupId,
        property_id: impl Into<GroupPropertyId>,
        value: PropertyValue,
        time: f64,
    ) -> &mut Self {
        self.push_value(group_id, property_id.into(), value, Some(time))
    }

    fn push_value(
        &mut self,
        group_id: GroupId,
        property_id: GroupPropertyId,
        value: PropertyValue,
        time: Option<f64>,
    ) -> &mut Self {
        let record = GroupPropertyValueRecord {
            group_id,
            property_id: property_id.clone(),
            value,
            time,
        };
        // A later assignment replaces an earlier one in place.
        match self.value_positions.entry((group_id, property_id)) {
            Entry::Occupied(entry) => self.data.property_values[*entry.get()] = record,
            Entry::Vacant(entry) => {
                entry.insert(self.data.property_values.len());
                self.data.property_values.push(record);
            }
        }
        self
    }

    pub fn add_person_to_group(&mut self, person_id: PersonId, group_id: GroupId) -> &mut Self {
        self.data.memberships.push(MembershipRecord {
            person_id,
            group_id,
        });
        self
    }

    pub fn set_next_group_id(&mut self, next_group_id: usize) -> &mut Self {
        self.data.next_group_id = next_group_id;
        self
    }

    /// # Errors
    ///
    /// See [`PluginData::validate`] for [`GroupsPluginData`].
    pub fn build(&mut self) -> Result<GroupsPluginData, StoreError> {
        let data = std::mem::take(&mut self.data);
        self.value_positions.clear();
        data.validate()?;
        Ok(data)
    }
}
