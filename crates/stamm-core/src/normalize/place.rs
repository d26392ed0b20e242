//! Place normalization.
//!
//! Comma-separated place strings are read most-specific first:
//! `City, County, State, Country`. Segment count decides which fields the
//! segments fill. Normalizing a normalized string yields the same fields.

use crate::types::entity::Place;
use crate::types::{GeocodeStatus, PlaceId};

/// Country names and aliases that mark a trailing segment as a country.
const COUNTRIES: &[&str] = &[
    "usa",
    "us",
    "united states",
    "united states of america",
    "canada",
    "mexico",
    "england",
    "scotland",
    "wales",
    "ireland",
    "northern ireland",
    "united kingdom",
    "uk",
    "great britain",
    "france",
    "germany",
    "prussia",
    "italy",
    "spain",
    "portugal",
    "netherlands",
    "holland",
    "belgium",
    "switzerland",
    "austria",
    "sweden",
    "norway",
    "denmark",
    "finland",
    "poland",
    "russia",
    "australia",
    "new zealand",
];

const US_ALIASES: &[&str] = &["usa", "us", "united states", "united states of america"];

const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Structured reading of a raw place string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlace {
    pub raw_text: String,
    /// Comma-joined non-empty fields, or the raw text when none are set.
    pub normalized: String,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl From<NormalizedPlace> for Place {
    fn from(place: NormalizedPlace) -> Self {
        Place {
            id: PlaceId(0),
            raw_text: place.raw_text,
            normalized: place.normalized,
            city: place.city,
            county: place.county,
            state: place.state,
            country: place.country,
            geocode_status: GeocodeStatus::Pending,
            coordinates: None,
        }
    }
}

/// Normalize a raw place string. Blank input has no place.
pub fn normalize_place(raw: &str) -> Option<NormalizedPlace> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let segments: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    let owned = |index: usize| segments.get(index).map(|segment| (*segment).to_string());
    let (city, county, state, country) = match segments.len() {
        0 => (None, None, None, None),
        1 => (owned(0), None, None, None),
        2 => (owned(0), None, owned(1), None),
        3 if segments.get(2).is_some_and(|last| is_known_country(last)) => {
            (owned(0), None, owned(1), owned(2))
        }
        3 => (owned(0), owned(1), owned(2), None),
        _ => (owned(0), owned(1), owned(2), owned(3)),
    };

    let us_locale = country.as_deref().is_none_or(is_us_alias);
    let state = match state {
        Some(state) if us_locale => Some(
            canonical_us_state(&state)
                .map(str::to_string)
                .unwrap_or(state),
        ),
        other => other,
    };

    let fields: Vec<&str> = [&city, &county, &state, &country]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();
    let normalized = if fields.is_empty() {
        raw.to_string()
    } else {
        fields.join(", ")
    };

    Some(NormalizedPlace {
        raw_text: raw.to_string(),
        normalized,
        city,
        county,
        state,
        country,
    })
}

/// Whether a segment names a country in the built-in lexicon.
pub fn is_known_country(segment: &str) -> bool {
    let lowered = segment.trim().to_lowercase();
    COUNTRIES.contains(&lowered.as_str())
}

fn is_us_alias(segment: &str) -> bool {
    let lowered = segment.trim().to_lowercase();
    US_ALIASES.contains(&lowered.as_str())
}

/// Full US state name for a postal abbreviation or full name.
pub fn canonical_us_state(segment: &str) -> Option<&'static str> {
    let needle = segment.trim();
    US_STATES
        .iter()
        .find(|(abbrev, name)| abbrev.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle))
        .map(|(_, name)| *name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn four_segments_fill_every_field() {
        let place = normalize_place("Springfield, Sangamon, IL, USA").unwrap();
        assert_eq!(place.city.as_deref(), Some("Springfield"));
        assert_eq!(place.county.as_deref(), Some("Sangamon"));
        assert_eq!(place.state.as_deref(), Some("Illinois"));
        assert_eq!(place.country.as_deref(), Some("USA"));
        assert_eq!(place.normalized, "Springfield, Sangamon, Illinois, USA");
        assert_eq!(place.raw_text, "Springfield, Sangamon, IL, USA");
    }

    #[test]
    fn three_segments_use_country_lexicon() {
        let with_country = normalize_place("Boston, MA, USA").unwrap();
        assert_eq!(with_country.state.as_deref(), Some("Massachusetts"));
        assert_eq!(with_country.country.as_deref(), Some("USA"));
        assert_eq!(with_country.county, None);

        let with_county = normalize_place("Salem, Essex, Massachusetts").unwrap();
        assert_eq!(with_county.county.as_deref(), Some("Essex"));
        assert_eq!(with_county.state.as_deref(), Some("Massachusetts"));
        assert_eq!(with_county.country, None);
    }

    #[test]
    fn two_and_one_segments() {
        let pair = normalize_place("Boston, ma").unwrap();
        assert_eq!(pair.city.as_deref(), Some("Boston"));
        assert_eq!(pair.state.as_deref(), Some("Massachusetts"));
        assert_eq!(pair.normalized, "Boston, Massachusetts");

        let single = normalize_place("  Dublin ").unwrap();
        assert_eq!(single.city.as_deref(), Some("Dublin"));
        assert_eq!(single.normalized, "Dublin");
    }

    #[test]
    fn foreign_states_are_not_rewritten() {
        let place = normalize_place("Lyon, Rhone, CA, France").unwrap();
        assert_eq!(place.state.as_deref(), Some("CA"));
    }

    #[test]
    fn empty_segments_are_dropped() {
        let place = normalize_place("Boston,, MA,").unwrap();
        assert_eq!(place.normalized, "Boston, Massachusetts");

        let commas = normalize_place(", ,").unwrap();
        assert_eq!(commas.normalized, ", ,");
        assert_eq!(commas.city, None);
    }

    #[test]
    fn blank_has_no_place() {
        assert!(normalize_place("").is_none());
        assert!(normalize_place("   ").is_none());
    }

    #[test]
    fn normalizing_twice_is_stable() {
        for raw in [
            "Boston, MA, USA",
            "Salem, Essex, MA",
            "a, b, c, d, e",
            "Cork, Ireland",
        ] {
            let once = normalize_place(raw).unwrap();
            let twice = normalize_place(&once.normalized).unwrap();
            assert_eq!(
                (once.city, once.county, once.state, once.country),
                (twice.city, twice.county, twice.state, twice.country)
            );
        }
    }

    #[test]
    fn converts_into_pending_place() {
        let place: Place = normalize_place("Boston, MA").unwrap().into();
        assert_eq!(place.geocode_status, GeocodeStatus::Pending);
        assert!(place.coordinates.is_none());
    }
}
