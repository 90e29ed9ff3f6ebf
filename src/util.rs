use crate::error::{LimiterError, Result};
use crate::model::velocity::VelocityRange;

pub const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");

/// Fill the form template's default velocity fields.
pub fn render_index(template: &str, defaults: VelocityRange) -> String {
    template
        .replace("{{MIN_V}}", &defaults.min.to_string())
        .replace("{{MAX_V}}", &defaults.max.to_string())
}

/// Parse a velocity bound submitted by the form.
///
/// Surrounding whitespace and a leading sign are accepted, nothing else: the value is not
/// checked against the MIDI velocity range here.
pub fn parse_bound(field: &'static str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| LimiterError::InvalidBound {
            field,
            value: raw.to_string(),
        })
}
