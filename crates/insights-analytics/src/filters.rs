//! Filter specification and the record predicate.

use chrono::Utc;
use insights_core::config::FilterDefaults;
use insights_core::error::InsightsError;
use insights_core::types::{CallStatus, CallType, ConversationRecord};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Either no constraint, or exactly one accepted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T: PartialEq> Choice<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str("all"),
            Choice::Only(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl<T: FromStr<Err = InsightsError>> FromStr for Choice<T> {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Choice::All)
        } else {
            s.parse().map(Choice::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive epoch-millisecond window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn contains(&self, millis: i64) -> bool {
        self.start <= millis && millis <= self.end
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// The full set of active constraints. Every field always holds a value;
/// empty strings and `Choice::All` mean "no constraint".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub date_range: DateRange,
    pub agent: String,
    pub call_type: Choice<CallType>,
    pub status: Choice<CallStatus>,
    pub caller: String,
    pub callee: String,
    pub duration_range: NumericRange,
    pub cost_range: NumericRange,
}

impl FilterSpec {
    /// Defaults with the date window ending at `now_ms`. An out-of-range
    /// window reaches back to the earliest representable time.
    pub fn defaults_at(defaults: &FilterDefaults, now_ms: i64) -> Self {
        let window = defaults.window_millis().unwrap_or(i64::MAX);
        Self {
            date_range: DateRange {
                start: now_ms.saturating_sub(window),
                end: now_ms,
            },
            agent: String::new(),
            call_type: Choice::All,
            status: Choice::All,
            caller: String::new(),
            callee: String::new(),
            duration_range: NumericRange {
                min: 0.0,
                max: defaults.max_duration,
            },
            cost_range: NumericRange {
                min: 0.0,
                max: defaults.max_cost,
            },
        }
    }

    /// Defaults with the date window ending now.
    pub fn from_defaults(defaults: &FilterDefaults) -> Self {
        Self::defaults_at(defaults, Utc::now().timestamp_millis())
    }

    /// Whether `record` satisfies every constraint.
    pub fn matches(&self, record: &ConversationRecord) -> bool {
        if !self.date_range.contains(record.start_time) {
            return false;
        }
        if !self.agent.is_empty() && record.agent != self.agent {
            return false;
        }
        if !self.call_type.admits(&record.call_info.call_type) {
            return false;
        }
        if !self.status.admits(&record.status) {
            return false;
        }
        // Substring matches are case-sensitive.
        if !self.caller.is_empty() && !record.call_info.caller.contains(&self.caller) {
            return false;
        }
        if !self.callee.is_empty() && !record.call_info.callee.contains(&self.callee) {
            return false;
        }
        self.duration_range.contains(record.duration) && self.cost_range.contains(record.cost)
    }
}

/// Records that pass `spec`, in their original order.
pub fn filter_records<'a>(
    records: &'a [ConversationRecord],
    spec: &FilterSpec,
) -> Vec<&'a ConversationRecord> {
    records.iter().filter(|r| spec.matches(r)).collect()
}
