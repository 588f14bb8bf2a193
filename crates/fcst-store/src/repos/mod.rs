//! Repository methods, implemented as `impl ForecastStore` blocks per entity.

pub mod forecast;
pub mod project;
