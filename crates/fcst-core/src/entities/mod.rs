//! Entity structs for the forecast data model.
//!
//! Every entity is scoped to a [`Project`], the tenant boundary. All structs
//! derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema validation.

mod forecast;
mod model;
mod project;
mod target;
mod timezero;
mod unit;

pub use forecast::{CandidateForecast, Forecast, ForecastMeta, StoredElement};
pub use model::ForecastModel;
pub use project::Project;
pub use target::Target;
pub use timezero::TimeZero;
pub use unit::Unit;
