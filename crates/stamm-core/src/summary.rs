//! # Store Summary
//!
//! Headline counts for a store, as shown by `stamm status`.

use crate::store::Store;
use crate::types::entity::{Conflict, Individual, LifeEvent, Place, Union};
use crate::types::{GeocodeStatus, StammError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub individuals: usize,
    pub unions: usize,
    pub events: usize,
    pub places: usize,
    pub places_geocoded: usize,
    pub places_pending: usize,
    pub conflicts: usize,
    pub conflicts_unresolved: usize,
    pub individuals_flagged: usize,
}

impl StoreSummary {
    pub fn collect<S: Store>(store: &S) -> Result<Self, StammError> {
        let places = store.all::<Place>()?;
        let conflicts = store.all::<Conflict>()?;
        Ok(Self {
            individuals: store.count::<Individual>()?,
            unions: store.count::<Union>()?,
            events: store.count::<LifeEvent>()?,
            places: places.len(),
            places_geocoded: places
                .iter()
                .filter(|p| p.geocode_status == GeocodeStatus::Success)
                .count(),
            places_pending: places
                .iter()
                .filter(|p| p.geocode_status == GeocodeStatus::Pending)
                .count(),
            conflicts: conflicts.len(),
            conflicts_unresolved: conflicts.iter().filter(|c| !c.is_resolved()).count(),
            individuals_flagged: store
                .filter(|person: &Individual| person.needs_review)?
                .len(),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals == 0 && self.unions == 0 && self.events == 0 && self.places == 0
    }
}
