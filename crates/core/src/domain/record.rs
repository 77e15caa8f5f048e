use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One barometer entry submitted by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Tz>,
    pub user_id: String,
    pub measure: i64,
    pub notes: String,
}

/// Inclusive bounds a measure must fall within. Both ends are optional;
/// the default accepts any integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurePolicy {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl MeasurePolicy {
    pub const fn unbounded() -> Self {
        Self { min: None, max: None }
    }

    pub const fn bounded(min: i64, max: i64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn accepts(&self, measure: i64) -> bool {
        self.min.map_or(true, |min| measure >= min) && self.max.map_or(true, |max| measure <= max)
    }
}

impl fmt::Display for MeasurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min}..={max}"),
            (Some(min), None) => write!(f, "{min}.."),
            (None, Some(max)) => write!(f, "..={max}"),
            (None, None) => f.write_str(".."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MeasurePolicy;

    #[test]
    fn unbounded_policy_accepts_everything() {
        let policy = MeasurePolicy::unbounded();
        for measure in [i64::MIN, -100, 0, 4, 100, i64::MAX] {
            assert!(policy.accepts(measure));
        }
        assert_eq!(policy.to_string(), "..");
    }

    #[test]
    fn bounded_policy_is_inclusive() {
        let policy = MeasurePolicy::bounded(1, 10);
        assert!(policy.accepts(1));
        assert!(policy.accepts(10));
        assert!(!policy.accepts(0));
        assert!(!policy.accepts(100));
        assert!(!policy.accepts(-100));
        assert_eq!(policy.to_string(), "1..=10");
    }

    #[test]
    fn half_open_policies_render_their_bound() {
        assert_eq!(MeasurePolicy { min: Some(1), max: None }.to_string(), "1..");
        assert_eq!(MeasurePolicy { min: None, max: Some(10) }.to_string(), "..=10");
    }
}
