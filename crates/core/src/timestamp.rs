use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::errors::TimestampError;

/// Resolves a Unix-epoch seconds string into an instant localized to an IANA area.
pub fn resolve_timestamp(raw: &str, area: &str) -> Result<DateTime<Tz>, TimestampError> {
    let seconds = raw.parse::<i64>().map_err(|error| TimestampError::InvalidTimestamp {
        raw: raw.to_owned(),
        reason: error.to_string(),
    })?;

    let zone = area.parse::<Tz>().map_err(|_| TimestampError::UnknownArea(area.to_owned()))?;

    let instant: DateTime<Utc> =
        DateTime::from_timestamp(seconds, 0).ok_or_else(|| TimestampError::InvalidTimestamp {
            raw: raw.to_owned(),
            reason: "seconds out of range".to_owned(),
        })?;

    Ok(instant.with_timezone(&zone))
}

/// Whether `area` names a zone in the IANA database.
pub fn is_known_area(area: &str) -> bool {
    area.parse::<Tz>().is_ok()
}
