pub mod event_log_service;
pub mod event_models;

pub use event_log_service::{EventLogError, EventLogService, EventLogStore};
pub use event_models::{EventKind, NewLogRecord, TrackedMessage};
