//! The conversation store: raw records, the active filter spec, and derived
//! metrics read on demand.
//!
//! Nothing is cached. Every getter recomputes from `(records, filters)`, so a
//! reader always sees values consistent with the latest mutation. Mutations
//! publish a [`StoreEvent`] when an [`EventBus`] is attached, which is how a
//! view learns it should re-read.

use crate::aggregations::{self, DataBounds, MetricsSnapshot};
use crate::filters::{filter_records, Choice, DateRange, FilterSpec, NumericRange};
use insights_core::config::FilterDefaults;
use insights_core::error::Result;
use insights_core::event_bus::{EventBus, StoreEvent};
use insights_core::source::DataSource;
use insights_core::types::{CallStatus, CallType, ConversationRecord};
use std::collections::BTreeMap;

/// Handle for one in-flight load. Only the most recently issued ticket may
/// apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// What happened to a load once it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The collection was replaced with this many records.
    Loaded(usize),
    /// The fetch failed; previous records were kept.
    Failed(String),
    /// A newer load was started before this one finished; its result was dropped.
    Superseded,
}

pub struct ConversationStore {
    conversations: Vec<ConversationRecord>,
    filters: FilterSpec,
    defaults: FilterDefaults,
    loading: bool,
    latest_ticket: u64,
    events: Option<EventBus>,
}

impl ConversationStore {
    pub fn new(defaults: FilterDefaults) -> Self {
        Self {
            conversations: Vec::new(),
            filters: FilterSpec::from_defaults(&defaults),
            defaults,
            loading: false,
            latest_ticket: 0,
            events: None,
        }
    }

    /// Attach an event bus that receives a [`StoreEvent`] after each mutation.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    fn publish(&self, event: StoreEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn filters_changed(&self, field: &str) {
        tracing::debug!("Filter '{}' changed", field);
        self.publish(StoreEvent::FiltersChanged {
            field: field.to_string(),
        });
    }

    // ── State ───────────────────────────────────────────────────────────

    /// The full, unfiltered collection.
    pub fn conversations(&self) -> &[ConversationRecord] {
        &self.conversations
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    // ── Derived views ───────────────────────────────────────────────────

    pub fn filtered_conversations(&self) -> Vec<&ConversationRecord> {
        filter_records(&self.conversations, &self.filters)
    }

    pub fn total_calls(&self) -> usize {
        aggregations::total_calls(&self.filtered_conversations())
    }

    pub fn call_success_rate(&self) -> f64 {
        aggregations::call_success_rate(&self.filtered_conversations())
    }

    pub fn average_call_duration(&self) -> f64 {
        aggregations::average_call_duration(&self.filtered_conversations())
    }

    pub fn total_cost(&self) -> f64 {
        aggregations::total_cost(&self.filtered_conversations())
    }

    pub fn average_llm_latency(&self) -> f64 {
        aggregations::average_llm_latency(&self.filtered_conversations())
    }

    pub fn average_tts_latency(&self) -> f64 {
        aggregations::average_tts_latency(&self.filtered_conversations())
    }

    pub fn average_interruptions(&self) -> f64 {
        aggregations::average_interruptions(&self.filtered_conversations())
    }

    pub fn call_distribution_by_status(&self) -> BTreeMap<CallStatus, usize> {
        aggregations::call_distribution_by_status(&self.filtered_conversations())
    }

    /// Agents across the whole collection, independent of the filters.
    pub fn unique_agents(&self) -> Vec<String> {
        aggregations::unique_agents(&self.conversations)
    }

    /// [`unique_agents`](Self::unique_agents) in display order.
    pub fn sorted_agents(&self) -> Vec<String> {
        aggregations::sorted_agents(&self.conversations)
    }

    /// Start-time bounds of the loaded data; `None` before anything is loaded.
    pub fn date_range(&self) -> Option<DataBounds> {
        aggregations::data_bounds(&self.conversations)
    }

    pub fn recent_calls(&self, limit: usize) -> Vec<&ConversationRecord> {
        aggregations::recent_calls(&self.filtered_conversations(), limit)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::compute(&self.conversations, &self.filtered_conversations())
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_date_range(&mut self, start: i64, end: i64) {
        self.filters.date_range = DateRange { start, end };
        self.filters_changed("dateRange");
    }

    pub fn set_date_start(&mut self, start: i64) {
        self.set_date_range(start, self.filters.date_range.end);
    }

    pub fn set_date_end(&mut self, end: i64) {
        self.set_date_range(self.filters.date_range.start, end);
    }

    pub fn set_agent(&mut self, agent: impl Into<String>) {
        self.filters.agent = agent.into();
        self.filters_changed("agent");
    }

    pub fn set_call_type(&mut self, call_type: Choice<CallType>) {
        self.filters.call_type = call_type;
        self.filters_changed("callType");
    }

    pub fn set_status(&mut self, status: Choice<CallStatus>) {
        self.filters.status = status;
        self.filters_changed("status");
    }

    pub fn set_caller(&mut self, caller: impl Into<String>) {
        self.filters.caller = caller.into();
        self.filters_changed("caller");
    }

    pub fn set_callee(&mut self, callee: impl Into<String>) {
        self.filters.callee = callee.into();
        self.filters_changed("callee");
    }

    pub fn set_duration_range(&mut self, min: f64, max: f64) {
        self.filters.duration_range = NumericRange { min, max };
        self.filters_changed("durationRange");
    }

    pub fn set_cost_range(&mut self, min: f64, max: f64) {
        self.filters.cost_range = NumericRange { min, max };
        self.filters_changed("costRange");
    }

    /// Restore every filter to its default, with a fresh window ending now.
    /// Records are untouched.
    pub fn reset_filters(&mut self) {
        self.filters = FilterSpec::from_defaults(&self.defaults);
        self.publish(StoreEvent::FiltersReset);
    }

    // ── Loading ─────────────────────────────────────────────────────────

    /// Mark a load as started and issue its ticket. Any ticket issued
    /// earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        self.loading = true;
        self.publish(StoreEvent::LoadStarted {
            ticket: self.latest_ticket,
        });
        LoadTicket(self.latest_ticket)
    }

    /// Apply the result of the load identified by `ticket`.
    ///
    /// A stale ticket changes nothing, including the loading flag, which stays
    /// owned by the newest load. A failure keeps the current records.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<ConversationRecord>>,
    ) -> LoadOutcome {
        if ticket.0 != self.latest_ticket {
            tracing::debug!(
                "Discarding load #{} (superseded by #{})",
                ticket.0,
                self.latest_ticket
            );
            self.publish(StoreEvent::LoadSuperseded { ticket: ticket.0 });
            return LoadOutcome::Superseded;
        }

        self.loading = false;
        match result {
            Ok(records) => {
                let count = records.len();
                self.conversations = records;
                tracing::info!("Loaded {} conversations", count);
                self.publish(StoreEvent::RecordsLoaded { count });
                LoadOutcome::Loaded(count)
            }
            Err(e) => {
                tracing::error!("Failed to load conversations: {}", e);
                let message = e.to_string();
                self.publish(StoreEvent::LoadFailed {
                    error: message.clone(),
                });
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Fetch the whole collection from `source` and replace the current one.
    ///
    /// Errors are logged and swallowed; the returned outcome is informational.
    pub async fn load(&mut self, source: &dyn DataSource) -> LoadOutcome {
        let ticket = self.begin_load();
        tracing::debug!("Loading conversations from {}", source.describe());
        let result = source.fetch_all().await;
        self.finish_load(ticket, result)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(FilterDefaults::default())
    }
}
