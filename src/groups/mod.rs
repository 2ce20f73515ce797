/*!

Groups: typed collections of people, such as households, schools, and workplaces.

Every group has exactly one [`GroupTypeId`] and carries the properties defined for that type.
People join and leave groups freely; a person may belong to any number of groups of any type,
but at most once to the same group. [`GroupsDataManager`] owns the membership index and the
group property values and publishes an event for each mutation that has subscribers.

*/

mod data_manager;
mod plugin_data;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use data_manager::GroupsDataManager;
pub use plugin_data::{
    GroupPropertyDefinitionRecord, GroupPropertyValueRecord, GroupRecord, GroupsPluginData,
    GroupsPluginDataBuilder, MembershipRecord,
};

use crate::error::StoreError;
use crate::macros::define_string_id;
use crate::people::PersonId;
use crate::property::{PropertyDefinition, PropertyValue};
use crate::relationship::SlotId;

/// Identifies a group. Issued in increasing order and never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub usize);

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group {}", self.0)
    }
}

impl TryFrom<i64> for GroupId {
    type Error = StoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .map(GroupId)
            .map_err(|_| StoreError::NegativeIndex(value))
    }
}

impl SlotId for GroupId {
    fn from_slot(slot: usize) -> Self {
        GroupId(slot)
    }

    fn slot(self) -> usize {
        self.0
    }
}

define_string_id!(
    /// Names a kind of group, e.g. "household".
    GroupTypeId
);

define_string_id!(
    /// Names a property of the groups of one type.
    GroupPropertyId
);

/// The type and initial property values of a group to be added.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConstructionInfo {
    pub group_type_id: GroupTypeId,
    pub property_values: Vec<(GroupPropertyId, PropertyValue)>,
}

impl GroupConstructionInfo {
    pub fn new(group_type_id: impl Into<GroupTypeId>) -> Self {
        Self {
            group_type_id: group_type_id.into(),
            property_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property_value(
        mut self,
        property_id: impl Into<GroupPropertyId>,
        value: PropertyValue,
    ) -> Self {
        self.property_values.push((property_id.into(), value));
        self
    }
}

/// A new group property together with its values for groups that already exist.
///
/// If the definition has no default, every existing group of the type must be given a value.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPropertyDefinitionInitialization {
    pub group_type_id: GroupTypeId,
    pub property_id: GroupPropertyId,
    pub definition: PropertyDefinition,
    pub values: Vec<(GroupId, PropertyValue)>,
}

impl GroupPropertyDefinitionInitialization {
    pub fn new(
        group_type_id: impl Into<GroupTypeId>,
        property_id: impl Into<GroupPropertyId>,
        definition: PropertyDefinition,
    ) -> Self {
        Self {
            group_type_id: group_type_id.into(),
            property_id: property_id.into(),
            definition,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, group_id: GroupId, value: PropertyValue) -> Self {
        self.values.push((group_id, value));
        self
    }
}

/// Computes the selection weight of a member of a group. Receives the data manager so it can
/// read group and property state; sampling again from inside it fails.
pub type GroupWeightingFunction<'a> = dyn Fn(&GroupsDataManager, PersonId, GroupId) -> f64 + 'a;

/// Options for [`GroupsDataManager::sample_group`]. The default samples uniformly from every
/// member.
#[derive(Default)]
pub struct GroupSampler<'a> {
    excluded_person: Option<PersonId>,
    weighting_function: Option<Box<GroupWeightingFunction<'a>>>,
}

impl<'a> GroupSampler<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never select this person.
    #[must_use]
    pub fn excluding(mut self, person_id: PersonId) -> Self {
        self.excluded_person = Some(person_id);
        self
    }

    /// Select members in proportion to the weights the function returns.
    #[must_use]
    pub fn weighted_by(
        mut self,
        weighting_function: impl Fn(&GroupsDataManager, PersonId, GroupId) -> f64 + 'a,
    ) -> Self {
        self.weighting_function = Some(Box::new(weighting_function));
        self
    }

    #[must_use]
    pub fn excluded_person(&self) -> Option<PersonId> {
        self.excluded_person
    }

    pub(crate) fn weighting_function(&self) -> Option<&GroupWeightingFunction<'a>> {
        self.weighting_function.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ids() {
        assert_eq!(GroupId::try_from(3).unwrap(), GroupId(3));
        assert!(matches!(
            GroupId::try_from(-2),
            Err(StoreError::NegativeIndex(-2))
        ));
        assert_eq!(GroupId(4).to_string(), "Group 4");
        assert_eq!(GroupTypeId::from("household").to_string(), "household");
    }

    #[test]
    fn construction_info_collects_values() {
        let info = GroupConstructionInfo::new("school")
            .with_property_value("capacity", PropertyValue::Int(300))
            .with_property_value("public", PropertyValue::Boolean(true));
        assert_eq!(info.group_type_id, GroupTypeId::from("school"));
        assert_eq!(info.property_values.len(), 2);
        assert_eq!(info.property_values[0].0, GroupPropertyId::from("capacity"));
    }

    #[test]
    fn sampler_options() {
        let sampler = GroupSampler::new();
        assert!(sampler.excluded_person().is_none());
        assert!(sampler.weighting_function().is_none());

        let sampler = GroupSampler::new()
            .excluding(PersonId(2))
            .weighted_by(|_, person, _| person.0 as f64);
        assert_eq!(sampler.excluded_person(), Some(PersonId(2)));
        assert!(sampler.weighting_function().is_some());
    }
}
