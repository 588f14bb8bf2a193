//! ID prefix constants and formatting helpers.
//!
//! Every entity identifier is a prefixed string, e.g. `"unt-0000002a"`. The
//! prefix makes identifiers self-describing in logs and error messages; the
//! suffix is an 8-character lowercase hex counter assigned by whoever mints
//! the entity (the store, or a test fixture).

pub const PREFIX_PROJECT: &str = "prj";
pub const PREFIX_UNIT: &str = "unt";
pub const PREFIX_TARGET: &str = "tgt";
pub const PREFIX_TIMEZERO: &str = "tzr";
pub const PREFIX_MODEL: &str = "mdl";
pub const PREFIX_FORECAST: &str = "fct";

/// Format a prefixed identifier from a sequence number.
#[must_use]
pub fn format_id(prefix: &str, seq: u32) -> String {
    format!("{prefix}-{seq:08x}")
}
