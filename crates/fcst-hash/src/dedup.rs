//! Duplicate detection within a forecast and equivalence across versions.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use fcst_core::entities::Forecast;
use fcst_core::prediction::ElementSet;

use crate::digest::hash_of;

/// A prediction element whose hash matches an earlier one in the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    /// Index of the repeated element.
    pub index: usize,
    /// Index of the first element with the same hash.
    pub first: usize,
}

/// Every non-retraction element whose hash (and therefore unit, target,
/// class, and payload) repeats an earlier element, in set order.
#[must_use]
pub fn find_duplicates(elements: &ElementSet) -> Vec<Duplicate> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        if element.is_retract() {
            continue;
        }
        match seen.entry(hash_of(element)) {
            Entry::Occupied(first) => duplicates.push(Duplicate {
                index,
                first: *first.get(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }
    }
    duplicates
}

/// Distinct element hashes of a set.
#[must_use]
pub fn hash_set(elements: &ElementSet) -> BTreeSet<String> {
    elements.iter().map(hash_of).collect()
}

/// Whether a stored forecast holds exactly the given element hashes.
#[must_use]
pub fn is_equivalent(hashes: &BTreeSet<String>, forecast: &Forecast) -> bool {
    let stored: BTreeSet<&str> = forecast.element_hashes().collect();
    stored.len() == hashes.len() && hashes.iter().all(|hash| stored.contains(hash.as_str()))
}

/// The first version whose element hash set equals `hashes`.
pub fn find_equivalent<'a, I>(hashes: &BTreeSet<String>, versions: I) -> Option<&'a Forecast>
where
    I: IntoIterator<Item = &'a Forecast>,
{
    versions
        .into_iter()
        .find(|forecast| is_equivalent(hashes, forecast))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fcst_core::entities::StoredElement;
    use fcst_core::enums::PredClass;
    use fcst_core::prediction::{PredictionData, PredictionElement, ScalarData};
    use fcst_core::value::PredValue;

    use super::*;
    use crate::digest::assign_hashes;

    fn point(unit: &str, value: i64) -> PredictionElement {
        PredictionElement::new(
            unit,
            "t1",
            PredictionData::Point(ScalarData {
                value: PredValue::Int(value),
            }),
        )
    }

    fn stored(mut elements: ElementSet) -> Forecast {
        assign_hashes(&mut elements);
        Forecast {
            id: "fct-00000001".into(),
            forecast_model_id: "mdl-00000001".into(),
            time_zero_id: "tzr-00000001".into(),
            source: String::new(),
            issued_at: Utc::now(),
            created_at: Utc::now(),
            notes: None,
            elements: elements
                .into_iter()
                .map(|element| StoredElement {
                    unit_id: String::new(),
                    target_id: String::new(),
                    element,
                })
                .collect(),
        }
    }

    #[test]
    fn second_identical_point_is_duplicate() {
        let set: ElementSet = vec![point("u1", 1), point("u2", 1), point("u1", 1)].into();
        assert_eq!(find_duplicates(&set), vec![Duplicate { index: 2, first: 0 }]);
    }

    #[test]
    fn repeated_retractions_are_not_duplicates() {
        let set: ElementSet = vec![
            PredictionElement::retraction("u1", "t1", PredClass::Point),
            PredictionElement::retraction("u1", "t1", PredClass::Point),
        ]
        .into();
        assert!(find_duplicates(&set).is_empty());
    }

    #[test]
    fn equivalence_is_set_equality() {
        let forecast = stored(vec![point("u1", 1), point("u2", 2)].into());
        let same = hash_set(&vec![point("u2", 2), point("u1", 1)].into());
        let subset = hash_set(&vec![point("u1", 1)].into());
        assert!(is_equivalent(&same, &forecast));
        assert!(!is_equivalent(&subset, &forecast));
        assert!(find_equivalent(&same, [&forecast]).is_some());
        assert!(find_equivalent(&subset, [&forecast]).is_none());
    }
}
