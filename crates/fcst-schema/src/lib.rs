//! # fcst-schema
//!
//! JSON Schema generation, validation, and registry for the forecast engine.
//!
//! Exchange and entity types are defined in `fcst-core` with
//! `#[derive(JsonSchema)]`. This crate turns them into a named registry and
//! validates untyped JSON against it, so a submitted document's structural
//! problems can all be listed before the codec converts it.

mod error;
mod registry;

pub use error::SchemaError;
pub use registry::{SchemaRegistry, payload_schema_name};
