use crate::error::InsightsError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single logged call conversation, as served by the conversations endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    pub agent: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Seconds.
    pub duration: f64,
    pub cost: f64,
    pub status: CallStatus,
    pub call_info: CallInfo,
}

impl ConversationRecord {
    /// Start time as a UTC timestamp, if it is representable.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_time).single()
    }

    pub fn stats(&self) -> Option<&CallStats> {
        self.call_info.stats.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    pub caller: String,
    pub callee: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    /// Absent for calls without latency instrumentation. A malformed value is
    /// read as absent rather than failing the whole collection.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_stats"
    )]
    pub stats: Option<CallStats>,
}

/// Per-call performance instrumentation. Each field may be missing on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub llm_latency: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub tts_latency: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub interruptions: Option<f64>,
}

fn lenient_stats<'de, D>(deserializer: D) -> Result<Option<CallStats>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// Final outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Busy,
    Transfer,
    NoAnswer,
    Dropped,
}

impl CallStatus {
    pub const ALL: [CallStatus; 5] = [
        CallStatus::Success,
        CallStatus::Busy,
        CallStatus::Transfer,
        CallStatus::NoAnswer,
        CallStatus::Dropped,
    ];

    /// Wire name, e.g. `no_answer`.
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Busy => "busy",
            CallStatus::Transfer => "transfer",
            CallStatus::NoAnswer => "no_answer",
            CallStatus::Dropped => "dropped",
        }
    }

    /// Human-readable label, e.g. `No Answer`.
    pub fn label(self) -> &'static str {
        match self {
            CallStatus::Success => "Success",
            CallStatus::Busy => "Busy",
            CallStatus::Transfer => "Transfer",
            CallStatus::NoAnswer => "No Answer",
            CallStatus::Dropped => "Dropped",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InsightsError::InvalidArgument(format!("unknown call status '{}'", s)))
    }
}

/// Direction of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Inbound,
    Outbound,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Inbound => "inbound",
            CallType::Outbound => "outbound",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallType {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(CallType::Inbound),
            "outbound" => Ok(CallType::Outbound),
            other => Err(InsightsError::InvalidArgument(format!(
                "unknown call type '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_json(stats: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "conv-1",
            "agent": "agent_3",
            "startTime": 1_700_000_000_000i64,
            "duration": 61.5,
            "cost": 0.42,
            "status": "no_answer",
            "callInfo": {
                "caller": "+1 555 0100",
                "callee": "+1 555 0199",
                "type": "outbound",
                "stats": stats
            }
        })
    }

    #[test]
    fn test_record_parses_camel_case() {
        let record: ConversationRecord = serde_json::from_value(record_json(json!({
            "llmLatency": 420,
            "ttsLatency": 130.5,
            "interruptions": 0
        })))
        .unwrap();

        assert_eq!(record.agent, "agent_3");
        assert_eq!(record.start_time, 1_700_000_000_000);
        assert_eq!(record.status, CallStatus::NoAnswer);
        assert_eq!(record.call_info.call_type, CallType::Outbound);
        let stats = record.stats().unwrap();
        assert_eq!(stats.llm_latency, Some(420.0));
        assert_eq!(stats.tts_latency, Some(130.5));
        assert_eq!(stats.interruptions, Some(0.0));
    }

    #[test]
    fn test_missing_stats_is_none() {
        let mut value = record_json(json!(null));
        value["callInfo"].as_object_mut().unwrap().remove("stats");
        let record: ConversationRecord = serde_json::from_value(value).unwrap();
        assert!(record.stats().is_none());
    }

    #[test]
    fn test_malformed_stats_is_none() {
        let record: ConversationRecord =
            serde_json::from_value(record_json(json!("not an object"))).unwrap();
        assert!(record.stats().is_none());
    }

    #[test]
    fn test_malformed_stat_field_is_absent() {
        let record: ConversationRecord = serde_json::from_value(record_json(json!({
            "llmLatency": "fast",
            "interruptions": 2
        })))
        .unwrap();
        let stats = record.stats().unwrap();
        assert_eq!(stats.llm_latency, None);
        assert_eq!(stats.tts_latency, None);
        assert_eq!(stats.interruptions, Some(2.0));
    }

    #[test]
    fn test_unknown_status_fails() {
        let mut value = record_json(json!(null));
        value["status"] = json!("voicemail");
        assert!(serde_json::from_value::<ConversationRecord>(value).is_err());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("no_answer".parse::<CallStatus>().unwrap(), CallStatus::NoAnswer);
        assert_eq!("dropped".parse::<CallStatus>().unwrap(), CallStatus::Dropped);
        assert!("Success".parse::<CallStatus>().is_err());
        assert_eq!(CallStatus::NoAnswer.label(), "No Answer");
    }

    #[test]
    fn test_call_type_from_str() {
        assert_eq!("inbound".parse::<CallType>().unwrap(), CallType::Inbound);
        assert!("sideways".parse::<CallType>().is_err());
    }

    #[test]
    fn test_started_at() {
        let record: ConversationRecord =
            serde_json::from_value(record_json(json!(null))).unwrap();
        let started = record.started_at().unwrap();
        assert_eq!(started.timestamp_millis(), 1_700_000_000_000);
    }
}
