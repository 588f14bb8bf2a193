//! Forecast-level rules: duplicates, conflicts, and retraction consistency.
//!
//! These need the complete element sequence, so they run only after the
//! whole candidate has been parsed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use fcst_core::prediction::{ElementKey, ElementSet};
use fcst_hash::find_duplicates;

use crate::report::{Rule, Violation};

/// Keys that are current in earlier versions of the same (model, timezero)
/// forecast. A retraction of one of these keys is not dangling.
pub type PriorKeys = BTreeSet<ElementKey>;

#[derive(Debug, Clone, Copy)]
enum KeyState {
    /// Current in an earlier version only.
    Prior,
    /// Predicted by the element at this index.
    Current(usize),
    Retracted,
}

/// Fold the element sequence per key and report every duplicate, conflict,
/// and dangling retraction.
#[must_use]
pub fn check_forecast(elements: &ElementSet, prior: &PriorKeys) -> Vec<Violation> {
    if elements.is_empty() {
        return vec![Violation::general(
            Rule::EmptyForecast,
            "forecast has no prediction elements",
        )];
    }

    let duplicates: HashMap<usize, usize> = find_duplicates(elements)
        .into_iter()
        .map(|dup| (dup.index, dup.first))
        .collect();
    let mut state: BTreeMap<ElementKey, KeyState> = prior
        .iter()
        .map(|key| (key.clone(), KeyState::Prior))
        .collect();

    let mut violations = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        let key = element.key();
        let current = state.get(&key).copied();

        if element.is_retract() {
            match current {
                Some(KeyState::Current(_) | KeyState::Prior) => {
                    state.insert(key, KeyState::Retracted);
                }
                Some(KeyState::Retracted) | None => violations.push(Violation::at(
                    Rule::DanglingRetraction,
                    index,
                    element,
                    "no current prediction to retract",
                )),
            }
            continue;
        }

        if let Some(first) = duplicates.get(&index) {
            violations.push(Violation::at(
                Rule::DuplicateElement,
                index,
                element,
                format!("repeats element {first}"),
            ));
            continue;
        }
        match current {
            Some(KeyState::Current(first)) => violations.push(Violation::at(
                Rule::Conflict,
                index,
                element,
                format!("element {first} is already current for this key"),
            )),
            _ => {
                state.insert(key, KeyState::Current(index));
            }
        }
    }
    violations
}
