//! # fcst-hash
//!
//! Content identity for prediction elements.
//!
//! [`data_hash`] digests an element's canonical form with SHA-256 and keeps
//! the first 32 hex characters. Hashing is total: it never fails and never
//! depends on payload entry order. [`dedup`] uses the hashes to find repeated
//! elements within a forecast and stored versions equivalent to an upload.

pub mod canonical;
pub mod dedup;
mod digest;

pub use canonical::{CanonicalForm, CanonicalPayload};
pub use dedup::{Duplicate, find_duplicates, find_equivalent, hash_set, is_equivalent};
pub use digest::{HASH_LEN, assign_hashes, data_hash, hash_of};
