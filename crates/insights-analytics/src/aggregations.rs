//! Call metrics over a filtered view of conversation records.
//!
//! Every function here is total: an empty view yields zero (or an empty
//! collection), never NaN or a panic.

use insights_core::types::{CallStats, CallStatus, ConversationRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Earliest and latest start time across a record collection (epoch ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBounds {
    pub min: i64,
    pub max: i64,
}

/// Every dashboard metric at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_calls: usize,
    /// Percentage, 0..=100.
    pub call_success_rate: f64,
    /// Seconds.
    pub average_call_duration: f64,
    pub total_cost: f64,
    /// Milliseconds.
    pub average_llm_latency: f64,
    /// Milliseconds.
    pub average_tts_latency: f64,
    pub average_interruptions: f64,
    pub call_distribution_by_status: BTreeMap<CallStatus, usize>,
    pub unique_agents: Vec<String>,
    pub data_bounds: Option<DataBounds>,
}

impl MetricsSnapshot {
    /// Compute all metrics. `all` is the unfiltered collection, `view` the filtered one.
    pub fn compute(all: &[ConversationRecord], view: &[&ConversationRecord]) -> Self {
        Self {
            total_calls: total_calls(view),
            call_success_rate: call_success_rate(view),
            average_call_duration: average_call_duration(view),
            total_cost: total_cost(view),
            average_llm_latency: average_llm_latency(view),
            average_tts_latency: average_tts_latency(view),
            average_interruptions: average_interruptions(view),
            call_distribution_by_status: call_distribution_by_status(view),
            unique_agents: unique_agents(all),
            data_bounds: data_bounds(all),
        }
    }
}

/// Mean of `values`, or 0 when there are none.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn total_calls(view: &[&ConversationRecord]) -> usize {
    view.len()
}

/// Share of successful calls as a percentage.
pub fn call_success_rate(view: &[&ConversationRecord]) -> f64 {
    if view.is_empty() {
        return 0.0;
    }
    let successful = view
        .iter()
        .filter(|r| r.status == CallStatus::Success)
        .count();
    successful as f64 / view.len() as f64 * 100.0
}

pub fn average_call_duration(view: &[&ConversationRecord]) -> f64 {
    mean(view.iter().map(|r| r.duration))
}

/// Zero for an empty view. Folds from `0.0` because float `sum` starts at
/// `-0.0`, which would render as `$-0`.
pub fn total_cost(view: &[&ConversationRecord]) -> f64 {
    view.iter().fold(0.0, |total, r| total + r.cost)
}

/// A latency counts only when it is present and nonzero. A zero latency is
/// treated like missing instrumentation.
fn nonzero_latency(view: &[&ConversationRecord], pick: fn(&CallStats) -> Option<f64>) -> f64 {
    mean(
        view.iter()
            .filter_map(|r| r.stats().and_then(pick))
            .filter(|v| *v != 0.0 && !v.is_nan()),
    )
}

pub fn average_llm_latency(view: &[&ConversationRecord]) -> f64 {
    nonzero_latency(view, |s| s.llm_latency)
}

pub fn average_tts_latency(view: &[&ConversationRecord]) -> f64 {
    nonzero_latency(view, |s| s.tts_latency)
}

/// Unlike the latency averages, a recorded zero is a real observation here and
/// is included; only calls without the field are skipped.
pub fn average_interruptions(view: &[&ConversationRecord]) -> f64 {
    mean(view.iter().filter_map(|r| r.stats().and_then(|s| s.interruptions)))
}

/// Count per status. Statuses with no calls have no entry.
pub fn call_distribution_by_status(view: &[&ConversationRecord]) -> BTreeMap<CallStatus, usize> {
    let mut distribution = BTreeMap::new();
    for record in view {
        *distribution.entry(record.status).or_insert(0) += 1;
    }
    distribution
}

/// Percentage of `total` represented by `count`; 0 when `total` is 0.
pub fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Distinct agents in order of first appearance.
pub fn unique_agents(records: &[ConversationRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut agents = Vec::new();
    for record in records {
        if seen.insert(record.agent.as_str()) {
            agents.push(record.agent.clone());
        }
    }
    agents
}

/// Numeric suffix of an `agent_<n>` identifier.
fn agent_number(agent: &str) -> Option<u64> {
    agent.strip_prefix("agent_")?.parse().ok()
}

/// Distinct agents ordered for display: `agent_2` before `agent_10`, then any
/// identifiers without a numeric suffix in lexicographic order.
pub fn sorted_agents(records: &[ConversationRecord]) -> Vec<String> {
    let mut agents = unique_agents(records);
    agents.sort_by(|a, b| match (agent_number(a), agent_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    agents
}

/// Start-time bounds of the whole collection, `None` when it is empty.
pub fn data_bounds(records: &[ConversationRecord]) -> Option<DataBounds> {
    let min = records.iter().map(|r| r.start_time).min()?;
    let max = records.iter().map(|r| r.start_time).max()?;
    Some(DataBounds { min, max })
}

/// Most recent calls first, at most `limit` of them.
pub fn recent_calls<'a>(
    view: &[&'a ConversationRecord],
    limit: usize,
) -> Vec<&'a ConversationRecord> {
    let mut sorted = view.to_vec();
    sorted.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    sorted.truncate(limit);
    sorted
}
