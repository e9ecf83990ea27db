//! Filtering, aggregation, and reporting over call conversation records.
//!
//! Holds the conversation store with its filter spec, the metric functions it
//! derives from the filtered view, and markdown dashboard rendering.

pub mod aggregations;
pub mod filters;
pub mod reports;
pub mod store;

pub use aggregations::{DataBounds, MetricsSnapshot};
pub use filters::{Choice, DateRange, FilterSpec, NumericRange};
pub use reports::ReportGenerator;
pub use store::{ConversationStore, LoadOutcome, LoadTicket};
