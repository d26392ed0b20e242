//! # Normalizer
//!
//! Pure functions mapping raw date and place text to structured values.
//! Nothing here touches the store.

mod date;
mod place;

pub use date::{NormalizedDate, format_core_date, normalize_date, sort_key};
pub use place::{NormalizedPlace, canonical_us_state, is_known_country, normalize_place};
