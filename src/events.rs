/*!

Observation events published by the data managers.

Each mutation kind has its own immutable event struct; all of them are variants of the closed enum
[`StoreEvent`] so a dispatcher can `match` exhaustively instead of routing on runtime type.
[`StoreEventKind`] names the variants without carrying data: the data managers ask the host
whether anyone subscribes to a kind *before* they build the event, so unobserved mutations never
allocate an event.

```rust,ignore
if context.subscribers_exist(StoreEventKind::GroupMembershipAddition) {
    context.publish(StoreEvent::GroupMembershipAddition(GroupMembershipAdditionEvent {
        person_id,
        group_id,
    }));
}
```

*/

use strum::{Display, EnumDiscriminants, EnumIter};

use crate::groups::{GroupId, GroupPropertyId, GroupTypeId};
use crate::people::PersonId;
use crate::property::PropertyValue;
use crate::regions::{RegionId, RegionPropertyId};

/// Emitted when a new group type is added.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTypeAdditionEvent {
    pub group_type_id: GroupTypeId,
}

/// Emitted when a new group is added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupAdditionEvent {
    pub group_id: GroupId,
}

/// Emitted just before a group is torn down. The group and its memberships are still
/// queryable when the event is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupImminentRemovalEvent {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMembershipAdditionEvent {
    pub person_id: PersonId,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMembershipRemovalEvent {
    pub person_id: PersonId,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupPropertyDefinitionEvent {
    pub group_type_id: GroupTypeId,
    pub property_id: GroupPropertyId,
}

/// Emitted when a group property value is set.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPropertyUpdateEvent {
    pub group_id: GroupId,
    pub property_id: GroupPropertyId,
    /// The old value
    pub previous: PropertyValue,
    /// The new value
    pub current: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionAdditionEvent {
    pub region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionPropertyDefinitionEvent {
    pub property_id: RegionPropertyId,
}

/// Emitted when a region property value is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPropertyUpdateEvent {
    pub region_id: RegionId,
    pub property_id: RegionPropertyId,
    pub previous: PropertyValue,
    pub current: PropertyValue,
}

/// Emitted when a person is assigned to a region. `previous` is `None` for the first
/// assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRegionUpdateEvent {
    pub person_id: PersonId,
    pub previous: Option<RegionId>,
    pub current: RegionId,
}

/// Every observation a data manager can publish.
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(StoreEventKind), derive(Hash, Display, EnumIter))]
pub enum StoreEvent {
    GroupTypeAddition(GroupTypeAdditionEvent),
    GroupAddition(GroupAdditionEvent),
    GroupImminentRemoval(GroupImminentRemovalEvent),
    GroupMembershipAddition(GroupMembershipAdditionEvent),
    GroupMembershipRemoval(GroupMembershipRemovalEvent),
    GroupPropertyDefinition(GroupPropertyDefinitionEvent),
    GroupPropertyUpdate(GroupPropertyUpdateEvent),
    RegionAddition(RegionAdditionEvent),
    RegionPropertyDefinition(RegionPropertyDefinitionEvent),
    RegionPropertyUpdate(RegionPropertyUpdateEvent),
    PersonRegionUpdate(PersonRegionUpdateEvent),
}

impl StoreEvent {
    #[must_use]
    pub fn kind(&self) -> StoreEventKind {
        self.into()
    }
}
