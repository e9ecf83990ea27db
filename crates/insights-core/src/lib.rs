pub mod config;
pub mod error;
pub mod event_bus;
pub mod source;
pub mod types;

pub use config::AppConfig;
pub use error::InsightsError;
pub use event_bus::{EventBus, StoreEvent, StoreEventType};
pub use source::{source_from_config, DataSource, FileSource, HttpSource};
pub use types::{CallInfo, CallStats, CallStatus, CallType, ConversationRecord};
