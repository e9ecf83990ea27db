//! Markdown dashboard rendering from store state.
//!
//! Produces the KPI overview, the status distribution, and the recent calls
//! table that make up the insights page.

use crate::filters::FilterSpec;
use crate::store::ConversationStore;
use chrono::{TimeZone, Utc};
use insights_core::types::ConversationRecord;

/// Widest status bar, in characters, for a 100% share.
const BAR_WIDTH: usize = 20;

/// Report generator for the dashboard views.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Full dashboard: filters, KPIs, status distribution and recent calls.
    pub fn dashboard(store: &ConversationStore, recent_limit: usize) -> String {
        let mut report = String::new();

        report.push_str("# Call Insights\n\n");
        report.push_str(&format!(
            "**Filters:** {}\n\n",
            Self::filter_summary(store.filters())
        ));
        if let Some(bounds) = store.date_range() {
            report.push_str(&format!(
                "**Data:** {} conversations, {} to {}\n\n",
                store.conversations().len(),
                format_date(bounds.min),
                format_date(bounds.max)
            ));
        }

        report.push_str(&Self::overview(store));
        report.push_str(&Self::status_chart(store));
        report.push_str(&Self::recent_calls_table(store, recent_limit));
        report
    }

    /// KPI cards as a bullet list.
    pub fn overview(store: &ConversationStore) -> String {
        let mut out = String::new();

        out.push_str("## Overview\n\n");
        out.push_str(&format!("- **Total Calls:** {}\n", store.total_calls()));
        out.push_str(&format!(
            "- **Success Rate:** {:.1}%\n",
            store.call_success_rate()
        ));
        out.push_str(&format!(
            "- **Avg Duration:** {}\n",
            format_duration(store.average_call_duration())
        ));
        out.push_str(&format!(
            "- **Total Cost:** {} USD\n\n",
            format_cost(store.total_cost())
        ));

        out.push_str("## Performance\n\n");
        out.push_str(&format!(
            "- **Avg LLM Latency:** {}\n",
            format_latency(store.average_llm_latency())
        ));
        out.push_str(&format!(
            "- **Avg TTS Latency:** {}\n",
            format_latency(store.average_tts_latency())
        ));
        out.push_str(&format!(
            "- **Avg Interruptions:** {:.1} per call\n\n",
            store.average_interruptions()
        ));
        out
    }

    /// Calls per status with their share of the filtered total.
    pub fn status_chart(store: &ConversationStore) -> String {
        let mut out = String::from("## Call Status Distribution\n\n");
        let total = store.total_calls();

        if total == 0 {
            out.push_str("No data available for the selected filters.\n\n");
            return out;
        }

        out.push_str("| Status | Calls | Share | |\n");
        out.push_str("|--------|-------|-------|-|\n");
        for (status, count) in store.call_distribution_by_status() {
            let pct = crate::aggregations::share(count, total);
            let filled = ((pct / 100.0) * BAR_WIDTH as f64).round() as usize;
            out.push_str(&format!(
                "| {} | {} | {:.1}% | {} |\n",
                status.label(),
                count,
                pct,
                "█".repeat(filled)
            ));
        }
        out.push_str(&format!(
            "\nTotal Calls: {}  Success Rate: {:.1}%\n\n",
            total,
            store.call_success_rate()
        ));
        out
    }

    /// The most recent filtered calls, newest first.
    pub fn recent_calls_table(store: &ConversationStore, limit: usize) -> String {
        let mut out = String::from("## Recent Calls\n\n");
        let recent = store.recent_calls(limit);

        if recent.is_empty() {
            out.push_str("No conversations found matching the current filters.\n");
            return out;
        }

        out.push_str("| ID | Agent | Status | Started | Duration | Cost |\n");
        out.push_str("|----|-------|--------|---------|----------|------|\n");
        for record in recent {
            out.push_str(&Self::call_row(record));
        }
        out
    }

    fn call_row(record: &ConversationRecord) -> String {
        format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            record.id,
            record.agent,
            record.status,
            format_started_at(record),
            format_duration(record.duration),
            format_cost(record.cost)
        )
    }

    /// One-line summary, used by the explorer after each command.
    pub fn text_summary(store: &ConversationStore) -> String {
        if store.conversations().is_empty() {
            return "No conversations loaded".into();
        }
        format!(
            "{} of {} calls | {:.1}% success | avg {} | {}",
            store.total_calls(),
            store.conversations().len(),
            store.call_success_rate(),
            format_duration(store.average_call_duration()),
            format_cost(store.total_cost())
        )
    }

    /// Human-readable rendering of the active filters.
    pub fn filter_summary(filters: &FilterSpec) -> String {
        let mut parts = vec![
            format!(
                "{} to {}",
                format_date(filters.date_range.start),
                format_date(filters.date_range.end)
            ),
            format!(
                "agent: {}",
                if filters.agent.is_empty() {
                    "all"
                } else {
                    filters.agent.as_str()
                }
            ),
            format!("type: {}", filters.call_type),
            format!("status: {}", filters.status),
        ];
        if !filters.caller.is_empty() {
            parts.push(format!("caller: *{}*", filters.caller));
        }
        if !filters.callee.is_empty() {
            parts.push(format!("callee: *{}*", filters.callee));
        }
        parts.push(format!(
            "duration: {}-{}s",
            filters.duration_range.min, filters.duration_range.max
        ));
        parts.push(format!(
            "cost: {}-{}",
            format_cost(filters.cost_range.min),
            format_cost(filters.cost_range.max)
        ));
        parts.join(", ")
    }
}

/// `125.5` → `2m 5.50s`.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    let remaining = ((seconds % 60.0) * 100.0).round() / 100.0;
    format!("{}m {:.2}s", minutes, remaining)
}

/// Rounded to cents without trailing zeros: `3.0` → `$3`, `1.456` → `$1.46`.
pub fn format_cost(cost: f64) -> String {
    let cents = (cost * 100.0).round() / 100.0;
    // Tiny negative costs round to -0.0.
    let cents = if cents == 0.0 { 0.0 } else { cents };
    format!("${}", cents)
}

/// Whole milliseconds.
pub fn format_latency(ms: f64) -> String {
    format!("{:.0}ms", ms)
}

fn format_date(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_started_at(record: &ConversationRecord) -> String {
    record
        .started_at()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.start_time.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Choice;
    use insights_core::types::{CallInfo, CallStatus, CallType};

    fn record(id: &str, status: CallStatus, offset_mins: i64) -> ConversationRecord {
        ConversationRecord {
            id: id.into(),
            agent: "agent_4".into(),
            start_time: Utc::now().timestamp_millis() - 3_600_000 + offset_mins * 60_000,
            duration: 95.0,
            cost: 1.25,
            status,
            call_info: CallInfo {
                caller: "555-0100".into(),
                callee: "555-0101".into(),
                call_type: CallType::Outbound,
                stats: None,
            },
        }
    }

    fn store_with(records: Vec<ConversationRecord>) -> ConversationStore {
        let mut store = ConversationStore::default();
        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(records));
        store
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0m 0.00s");
        assert_eq!(format_duration(45.0), "0m 45.00s");
        assert_eq!(format_duration(125.5), "2m 5.50s");
        assert_eq!(format_duration(3600.0), "60m 0.00s");
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(3.0), "$3");
        assert_eq!(format_cost(1.456), "$1.46");
        assert_eq!(format_cost(0.5), "$0.5");
        assert_eq!(format_cost(0.0), "$0");
        assert_eq!(format_cost(-0.001), "$0");
    }

    #[test]
    fn test_empty_store_cost_renders_zero() {
        let mut store = ConversationStore::default();
        assert_eq!(format_cost(store.total_cost()), "$0");

        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(vec![record("a", CallStatus::Success, 0)]));
        store.set_caller("999");
        assert_eq!(store.total_calls(), 0);

        let report = ReportGenerator::dashboard(&store, 5);
        assert!(report.contains("- **Total Cost:** $0 USD"));
        assert!(!report.contains("$-0"));
        assert!(ReportGenerator::text_summary(&store).ends_with("| $0"));
    }

    #[test]
    fn test_call_row_start_time() {
        let mut call = record("c9", CallStatus::Busy, 0);
        call.start_time = 1_700_000_000_000;
        let row = ReportGenerator::call_row(&call);
        assert!(row.contains("| 2023-11-14 22:13 |"));

        call.start_time = i64::MAX;
        let row = ReportGenerator::call_row(&call);
        assert!(row.contains(&format!("| {} |", i64::MAX)));
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(0.0), "0ms");
        assert_eq!(format_latency(412.6), "413ms");
    }

    #[test]
    fn test_dashboard_structure() {
        let store = store_with(vec![
            record("c1", CallStatus::Success, 0),
            record("c2", CallStatus::NoAnswer, 10),
        ]);
        let report = ReportGenerator::dashboard(&store, 5);

        assert!(report.contains("# Call Insights"));
        assert!(report.contains("## Overview"));
        assert!(report.contains("- **Total Calls:** 2"));
        assert!(report.contains("- **Success Rate:** 50.0%"));
        assert!(report.contains("## Call Status Distribution"));
        assert!(report.contains("| No Answer | 1 | 50.0% |"));
        assert!(report.contains("## Recent Calls"));
    }

    #[test]
    fn test_recent_calls_order_and_limit() {
        let store = store_with(vec![
            record("old", CallStatus::Success, 0),
            record("mid", CallStatus::Busy, 10),
            record("new", CallStatus::Dropped, 20),
        ]);
        let table = ReportGenerator::recent_calls_table(&store, 2);

        let new_pos = table.find("| new |").unwrap();
        let mid_pos = table.find("| mid |").unwrap();
        assert!(new_pos < mid_pos);
        assert!(!table.contains("| old |"));
    }

    #[test]
    fn test_empty_dashboard() {
        let store = ConversationStore::default();
        let report = ReportGenerator::dashboard(&store, 5);

        assert!(report.contains("- **Total Calls:** 0"));
        assert!(report.contains("- **Avg LLM Latency:** 0ms"));
        assert!(report.contains("No data available"));
        assert!(report.contains("No conversations found"));
        assert!(!report.contains("**Data:**"));
    }

    #[test]
    fn test_filter_summary() {
        let mut store = ConversationStore::default();
        store.set_status(Choice::Only(CallStatus::Transfer));
        store.set_caller("0100");

        let summary = ReportGenerator::filter_summary(store.filters());
        assert!(summary.contains("agent: all"));
        assert!(summary.contains("status: transfer"));
        assert!(summary.contains("caller: *0100*"));
        assert!(!summary.contains("callee:"));
        assert!(summary.contains("cost: $0-$100"));
    }

    #[test]
    fn test_text_summary() {
        assert_eq!(
            ReportGenerator::text_summary(&ConversationStore::default()),
            "No conversations loaded"
        );

        let store = store_with(vec![record("c1", CallStatus::Success, 0)]);
        let summary = ReportGenerator::text_summary(&store);
        assert!(summary.starts_with("1 of 1 calls | 100.0% success"));
        assert!(summary.ends_with("$1.25"));
    }
}
