//! Indexed property and relationship storage for large agent-based simulations.
//!
//! The crate tracks two kinds of state for populations that may reach millions of entities:
//! * typed, optionally time-stamped property values per entity, stored in dense containers
//!   specialized per value kind ([`property`]), and
//! * many-to-many relationships between entity collections, such as people and the groups they
//!   belong to ([`relationship`]), with weighted random selection over the members of a
//!   relationship ([`random`]).
//!
//! Two data managers are built from these pieces:
//! * [`groups::GroupsDataManager`] for typed groups of people (households, schools, ...), and
//! * [`regions::RegionsDataManager`] for the region each person lives in.
//!
//! Both follow the same discipline for every mutation: all preconditions are validated first,
//! then the change is applied, and finally an observation event is published if and only if the
//! host reports a subscriber for it. The host simulation is reached through the
//! [`plugin_context::PluginContext`] trait, which supplies the current time, the set of people
//! that exist, and event dispatch.
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use ixa_relations::groups::{GroupConstructionInfo, GroupsDataManager, GroupsPluginData};
//! use ixa_relations::plugin_context::SimulationContext;
//!
//! let context = Rc::new(SimulationContext::new());
//! let person = context.add_person();
//! let data = GroupsPluginData::builder()
//!     .add_group_type("household")
//!     .build()
//!     .unwrap();
//! let mut groups = GroupsDataManager::new(data, context.clone()).unwrap();
//! let household = groups
//!     .add_group(GroupConstructionInfo::new("household"))
//!     .unwrap();
//! groups.add_person_to_group(person, household).unwrap();
//! assert_eq!(groups.get_people_for_group(household).unwrap(), vec![person]);
//! ```
pub mod error;
pub mod events;
pub mod groups;
pub mod hashing;
pub mod log;
mod macros;
pub mod people;
pub mod plugin_context;
pub mod plugin_data;
pub mod property;
pub mod random;
pub mod regions;
pub mod relationship;

// Re-exports for convenience
pub use error::StoreError;
pub use hashing::{HashMap, HashMapExt, HashSet, HashSetExt};
pub use people::PersonId;
pub use plugin_context::{PluginContext, SimulationContext};
pub use property::{PropertyDefinition, PropertyValue, PropertyValueType};
pub use rand;
