//! # fcst-core
//!
//! Core types and error types for the forecast engine.
//!
//! This crate provides the foundational types shared across all engine crates:
//! - Entity structs scoped to a project (units, targets, timezeros, models, forecasts)
//! - Prediction classes, target types, and their compatibility tables
//! - The typed prediction element model and the retraction fold
//! - The structured exchange envelope
//! - Entity reference resolution by human name
//! - ID prefix constants and cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod exchange;
pub mod ids;
pub mod prediction;
pub mod resolve;
pub mod value;
