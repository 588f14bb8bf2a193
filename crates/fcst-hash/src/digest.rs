//! `data_hash` computation.

use fcst_core::prediction::{ElementSet, PredictionElement};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalForm;

/// Hex characters kept from the SHA-256 digest.
pub const HASH_LEN: usize = 32;

/// Content digest of an element over its canonical form: class, unit,
/// target, retraction flag, and order-independent payload.
#[must_use]
pub fn data_hash(element: &PredictionElement) -> String {
    let mut hasher = Sha256::new();
    CanonicalForm::of(element).feed(&mut hasher);
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(HASH_LEN);
    hash
}

/// The element's assigned hash, or a freshly computed one.
#[must_use]
pub fn hash_of(element: &PredictionElement) -> String {
    element
        .data_hash
        .clone()
        .unwrap_or_else(|| data_hash(element))
}

/// Set `data_hash` on every element, replacing any earlier value.
pub fn assign_hashes(elements: &mut ElementSet) {
    for element in elements.iter_mut() {
        element.data_hash = Some(data_hash(element));
    }
    tracing::debug!(elements = elements.len(), "assigned data hashes");
}

#[cfg(test)]
mod tests {
    use fcst_core::enums::PredClass;
    use fcst_core::prediction::{PredictionData, ScalarData};
    use fcst_core::value::PredValue;

    use super::*;

    fn point(unit: &str, value: PredValue) -> PredictionElement {
        PredictionElement::new(unit, "t1", PredictionData::Point(ScalarData { value }))
    }

    #[test]
    fn hash_is_32_lowercase_hex() {
        let hash = data_hash(&point("u1", PredValue::Int(1)));
        assert_eq!(hash.len(), HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_covers_scope_and_class() {
        let base = data_hash(&point("u1", PredValue::Int(1)));
        assert_ne!(base, data_hash(&point("u2", PredValue::Int(1))));
        assert_ne!(base, data_hash(&point("u1", PredValue::Int(2))));
        assert_ne!(base, data_hash(&point("u1", PredValue::Float(1.0))));
        let mean = PredictionElement::new(
            "u1",
            "t1",
            PredictionData::Mean(ScalarData {
                value: PredValue::Int(1),
            }),
        );
        assert_ne!(base, data_hash(&mean));
    }

    #[test]
    fn retraction_hash_differs_from_prediction() {
        let retraction = PredictionElement::retraction("u1", "t1", PredClass::Point);
        assert_ne!(
            data_hash(&retraction),
            data_hash(&point("u1", PredValue::Int(1)))
        );
    }

    #[test]
    fn assign_fills_every_element() {
        let mut set: ElementSet = vec![
            point("u1", PredValue::Int(1)),
            PredictionElement::retraction("u1", "t1", PredClass::Bin),
        ]
        .into();
        assign_hashes(&mut set);
        assert!(set.iter().all(|e| e.data_hash.is_some()));
        assert_eq!(hash_of(&set.as_slice()[0]), data_hash(&set.as_slice()[0]));
    }
}
