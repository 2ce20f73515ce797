/*!

A bidirectional many-to-many index between two dense id spaces.

The "left" side is the entity that joins (a person) and the "right" side is what it joins (a
group or a region). Right-hand entities carry a type index, and the index also keeps the list
of rights per type. Per-entity memory stays near zero when an entity has no links: an adjacency
list is released as soon as it becomes empty.

Ids are assumed valid. The owning data manager checks existence, duplicates, and membership
before calling in; in particular [`RelationshipIndex::link`] does not de-duplicate.

*/

use std::fmt::Debug;

use log::trace;

use crate::property::containers::IntValueContainer;
use crate::{HashSet, HashSetExt};

const NO_TYPE: i64 = -1;

/// An id that addresses a dense slot.
pub trait SlotId: Copy + Eq + Debug {
    fn from_slot(slot: usize) -> Self;
    fn slot(self) -> usize;
}

fn list_for<T>(lists: &[Option<Vec<T>>], slot: usize) -> &[T] {
    match lists.get(slot) {
        Some(Some(list)) => list,
        _ => &[],
    }
}

fn push_to<T: Clone>(lists: &mut Vec<Option<Vec<T>>>, slot: usize, value: T) {
    if lists.len() <= slot {
        lists.resize(slot + 1, None);
    }
    lists[slot].get_or_insert_with(Vec::new).push(value);
}

/// Removes the first occurrence of `value`, releasing the list if it becomes empty.
fn remove_from<T: PartialEq>(lists: &mut [Option<Vec<T>>], slot: usize, value: T) -> bool {
    let Some(entry) = lists.get_mut(slot) else {
        return false;
    };
    let Some(list) = entry.as_mut() else {
        return false;
    };
    let Some(position) = list.iter().position(|v| *v == value) else {
        return false;
    };
    list.swap_remove(position);
    if list.is_empty() {
        *entry = None;
    }
    true
}

#[derive(Debug)]
pub struct RelationshipIndex<L, R> {
    rights_by_left: Vec<Option<Vec<R>>>,
    lefts_by_right: Vec<Option<Vec<L>>>,
    type_by_right: IntValueContainer,
    rights_by_type: Vec<Vec<R>>,
    next_right: usize,
}

impl<L: SlotId, R: SlotId> Default for RelationshipIndex<L, R> {
    fn default() -> Self {
        Self {
            rights_by_left: Vec::new(),
            lefts_by_right: Vec::new(),
            type_by_right: IntValueContainer::new(NO_TYPE, 0),
            rights_by_type: Vec::new(),
            next_right: 0,
        }
    }
}

impl<L: SlotId, R: SlotId> RelationshipIndex<L, R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new right-hand type and returns its index.
    pub fn add_type(&mut self) -> usize {
        self.rights_by_type.push(Vec::new());
        self.rights_by_type.len() - 1
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.rights_by_type.len()
    }

    /// Allocates the next right-hand id for a registered type.
    pub fn add_right(&mut self, type_index: usize) -> R {
        let right = R::from_slot(self.next_right);
        self.add_right_with_id(right, type_index);
        right
    }

    /// Adds a right-hand entity with a known id, as when restoring a checkpoint. Later ids
    /// continue after the largest one seen.
    pub fn add_right_with_id(&mut self, right: R, type_index: usize) {
        self.type_by_right.set(right.slot(), type_index as i64);
        self.rights_by_type[type_index].push(right);
        self.next_right = self.next_right.max(right.slot() + 1);
        trace!("added right {right:?} of type {type_index}");
    }

    /// The id the next [`add_right`](Self::add_right) will issue.
    #[must_use]
    pub fn next_right(&self) -> usize {
        self.next_right
    }

    /// Moves the id cursor forward. The cursor never moves back.
    pub fn advance_next_right(&mut self, next_right: usize) {
        self.next_right = self.next_right.max(next_right);
    }

    #[must_use]
    pub fn contains_right(&self, right: R) -> bool {
        self.right_type(right).is_some()
    }

    #[must_use]
    pub fn right_type(&self, right: R) -> Option<usize> {
        usize::try_from(self.type_by_right.get(right.slot())).ok()
    }

    /// Links the pair in both directions. Linking a pair twice stores it twice.
    pub fn link(&mut self, left: L, right: R) {
        push_to(&mut self.rights_by_left, left.slot(), right);
        push_to(&mut self.lefts_by_right, right.slot(), left);
    }

    /// Removes one occurrence of the pair from both directions. Returns whether it was linked.
    pub fn unlink(&mut self, left: L, right: R) -> bool {
        let removed = remove_from(&mut self.rights_by_left, left.slot(), right);
        if removed {
            remove_from(&mut self.lefts_by_right, right.slot(), left);
        }
        removed
    }

    #[must_use]
    pub fn is_linked(&self, left: L, right: R) -> bool {
        list_for(&self.rights_by_left, left.slot()).contains(&right)
    }

    /// Unlinks every left from `right` and clears its type. The id is not reused.
    pub fn remove_right(&mut self, right: R) {
        let slot = right.slot();
        if let Some(Some(lefts)) = self.lefts_by_right.get_mut(slot).map(Option::take) {
            for left in lefts {
                remove_from(&mut self.rights_by_left, left.slot(), right);
            }
        }
        if let Some(type_index) = self.right_type(right) {
            self.rights_by_type[type_index].retain(|r| *r != right);
            self.type_by_right.set(slot, NO_TYPE);
        }
        trace!("removed right {right:?}");
    }

    /// Unlinks `left` from every right it is linked to.
    pub fn remove_left(&mut self, left: L) {
        if let Some(Some(rights)) = self.rights_by_left.get_mut(left.slot()).map(Option::take) {
            for right in rights {
                remove_from(&mut self.lefts_by_right, right.slot(), left);
            }
        }
    }

    /// Every existing right-hand id in increasing order.
    #[must_use]
    pub fn right_ids(&self) -> Vec<R> {
        (0..self.next_right)
            .map(R::from_slot)
            .filter(|right| self.contains_right(*right))
            .collect()
    }

    #[must_use]
    pub fn right_count(&self) -> usize {
        self.rights_by_type.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn rights_for_left(&self, left: L) -> Vec<R> {
        list_for(&self.rights_by_left, left.slot()).to_vec()
    }

    #[must_use]
    pub fn right_count_for_left(&self, left: L) -> usize {
        list_for(&self.rights_by_left, left.slot()).len()
    }

    #[must_use]
    pub fn rights_for_left_and_type(&self, left: L, type_index: usize) -> Vec<R> {
        list_for(&self.rights_by_left, left.slot())
            .iter()
            .copied()
            .filter(|right| self.right_type(*right) == Some(type_index))
            .collect()
    }

    /// The distinct types of the rights `left` is linked to, in order of first link.
    #[must_use]
    pub fn types_for_left(&self, left: L) -> Vec<usize> {
        let mut seen = HashSet::new();
        list_for(&self.rights_by_left, left.slot())
            .iter()
            .filter_map(|right| self.right_type(*right))
            .filter(|type_index| seen.insert(*type_index))
            .collect()
    }

    #[must_use]
    pub fn lefts_for_right(&self, right: R) -> Vec<L> {
        list_for(&self.lefts_by_right, right.slot()).to_vec()
    }

    #[must_use]
    pub fn left_count_for_right(&self, right: R) -> usize {
        list_for(&self.lefts_by_right, right.slot()).len()
    }

    #[must_use]
    pub fn rights_for_type(&self, type_index: usize) -> Vec<R> {
        self.rights_by_type
            .get(type_index)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn right_count_for_type(&self, type_index: usize) -> usize {
        self.rights_by_type.get(type_index).map_or(0, Vec::len)
    }

    /// The distinct lefts linked to any right of the type.
    #[must_use]
    pub fn lefts_for_type(&self, type_index: usize) -> Vec<L> {
        let mut seen = HashSet::new();
        let mut lefts = Vec::new();
        for right in self.rights_by_type.get(type_index).into_iter().flatten() {
            for left in list_for(&self.lefts_by_right, right.slot()) {
                if seen.insert(left.slot()) {
                    lefts.push(*left);
                }
            }
        }
        lefts
    }

    #[must_use]
    pub fn left_count_for_type(&self, type_index: usize) -> usize {
        self.lefts_for_type(type_index).len()
    }

    pub fn reserve_lefts(&mut self, additional: usize) {
        self.rights_by_left.reserve(additional);
    }

    pub fn reserve_rights(&mut self, additional: usize) {
        self.lefts_by_right.reserve(additional);
        self.type_by_right.reserve(additional);
    }
}
