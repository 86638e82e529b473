//! Timestamp classification and the reference "now".

use crate::error::ConfigError;
use crate::template::FormatTemplate;
use chrono::{Local, NaiveDate, NaiveDateTime};

/// What a backup name says about its age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A real timestamp no later than the reference time
    Timestamped(NaiveDateTime),
    /// A real timestamp later than the reference time
    Future(NaiveDateTime),
    /// The name glob-matched but does not encode a real date and time
    Invalid,
}

impl Classification {
    /// The timestamp usable for bucketing, if any
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Classification::Timestamped(ts) => Some(*ts),
            Classification::Future(_) | Classification::Invalid => None,
        }
    }
}

/// Classify a name against a template and reference time
pub fn classify(template: &FormatTemplate, name: &str, now: NaiveDateTime) -> Classification {
    match template.extract(name) {
        Some(ts) if ts > now => Classification::Future(ts),
        Some(ts) => Classification::Timestamped(ts),
        None => Classification::Invalid,
    }
}

/// The local wall clock, without timezone
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a reference time given on the command line.
///
/// Accepts `YYYY-MM-DDThh:mm`, `YYYY-MM-DD hh:mm` and `YYYY-MM-DD` (midnight).
pub fn parse_reference_time(value: &str) -> Result<NaiveDateTime, ConfigError> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ConfigError::InvalidReferenceTime(value.to_string()))
}
