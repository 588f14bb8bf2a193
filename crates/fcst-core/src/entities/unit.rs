use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named measurement location or entity. `abbreviation` is unique within
/// the owning project and is the name predictions refer to.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
}
