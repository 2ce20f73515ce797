//! People are owned by the host simulation. The data managers in this crate only need to know
//! which [`PersonId`]s exist; [`Population`] is a minimal registry that answers that question for
//! hosts that do not already have one.

use std::cell::RefCell;
use std::fmt::{Display, Formatter};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::relationship::SlotId;

/// Identifies a person. Ids range from 0 to the number of people ever added minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub usize);

impl Display for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Person {}", self.0)
    }
}

impl TryFrom<i64> for PersonId {
    type Error = StoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .map(PersonId)
            .map_err(|_| StoreError::NegativeIndex(value))
    }
}

impl SlotId for PersonId {
    fn from_slot(slot: usize) -> Self {
        PersonId(slot)
    }

    fn slot(self) -> usize {
        self.0
    }
}

/// Tracks which people currently exist. Removed ids are never reissued.
#[derive(Debug, Default)]
pub struct Population {
    // Indexed by `PersonId`; `false` once the person has been removed.
    alive: RefCell<Vec<bool>>,
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a person and returns a `PersonId` that can be used to reference them.
    pub fn add_person(&self) -> PersonId {
        let mut alive = self.alive.borrow_mut();
        let person_id = PersonId(alive.len());
        alive.push(true);
        trace!("added {person_id}");
        person_id
    }

    /// Removes the person from the population.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIdentifier`] if the person does not exist.
    pub fn remove_person(&self, person_id: PersonId) -> Result<(), StoreError> {
        let mut alive = self.alive.borrow_mut();
        match alive.get_mut(person_id.0) {
            Some(is_alive) if *is_alive => {
                *is_alive = false;
                trace!("removed {person_id}");
                Ok(())
            }
            _ => Err(StoreError::UnknownIdentifier(person_id.to_string())),
        }
    }

    #[must_use]
    pub fn person_exists(&self, person_id: PersonId) -> bool {
        self.alive
            .borrow()
            .get(person_id.0)
            .copied()
            .unwrap_or(false)
    }

    /// The number of people currently in the population.
    #[must_use]
    pub fn get_current_population(&self) -> usize {
        self.alive.borrow().iter().filter(|alive| **alive).count()
    }

    /// One more than the largest `PersonId` ever issued.
    #[must_use]
    pub fn get_person_id_limit(&self) -> usize {
        self.alive.borrow().len()
    }

    /// Reserves room for `count` more people ahead of a bulk addition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NegativeCapacityIncrement`] if `count` is negative.
    pub fn expand_capacity(&self, count: i64) -> Result<(), StoreError> {
        let additional =
            usize::try_from(count).map_err(|_| StoreError::NegativeCapacityIncrement(count))?;
        self.alive.borrow_mut().reserve(additional);
        Ok(())
    }
}
