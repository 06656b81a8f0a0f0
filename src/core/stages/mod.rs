pub mod models;
pub mod report_service;

pub use models::SchedulePayload;
pub use report_service::{ScheduleSource, StageError, StageReport, StageReportService};
