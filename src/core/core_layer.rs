// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "clock.rs"]
pub mod clock;

#[path = "schedule/batch_schedule.rs"]
pub mod schedule;

#[path = "logging/mod.rs"]
pub mod logging;

#[path = "inactivity/inactivity_detector.rs"]
pub mod inactivity;

#[path = "stages/mod.rs"]
pub mod stages;
