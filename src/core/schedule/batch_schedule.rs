// Fixed-clock batch trigger.
//
// Jobs fire when the wall clock, formatted as `HH:MM`, exactly equals one of
// their configured target times. The poll cadence (60s) and the comparison
// granularity (minutes) are deliberately the same; the last-fired guard keeps
// a jittery poll from firing twice inside one minute.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::clock::zoned_now;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid target time '{0}': expected zero-padded 24-hour HH:MM")]
    InvalidTargetTime(String),

    #[error("duplicate target time '{0}'")]
    DuplicateTargetTime(String),
}

/// The target times of one batch job, plus the guard state needed to fire
/// each of them at most once per day.
pub struct BatchSchedule {
    targets: Vec<String>,
    // (date, HH:MM) slot of the last fire.
    last_fired: Option<(NaiveDate, String)>,
}

impl BatchSchedule {
    pub fn new<I, S>(targets: I) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validated: Vec<String> = Vec::new();
        for target in targets {
            let target = target.into();
            let parsed = NaiveTime::parse_from_str(&target, "%H:%M")
                .map_err(|_| ScheduleError::InvalidTargetTime(target.clone()))?;

            // chrono happily parses "9:00", but the clock never formats that
            // way, so unpadded targets would silently never fire.
            if parsed.format("%H:%M").to_string() != target {
                return Err(ScheduleError::InvalidTargetTime(target));
            }
            if validated.contains(&target) {
                return Err(ScheduleError::DuplicateTargetTime(target));
            }
            validated.push(target);
        }

        Ok(Self {
            targets: validated,
            last_fired: None,
        })
    }

    /// Returns the matched target when `now` lands exactly on one of the
    /// target times and this slot has not fired yet today.
    pub fn fire_due(&mut self, now: DateTime<Tz>) -> Option<String> {
        let wall = now.format("%H:%M").to_string();
        if !self.targets.iter().any(|target| *target == wall) {
            return None;
        }

        let slot = (now.date_naive(), wall.clone());
        if self.last_fired.as_ref() == Some(&slot) {
            return None;
        }

        self.last_fired = Some(slot);
        Some(wall)
    }
}

/// Polls the wall clock once a minute for the life of the session and runs
/// `action` whenever the schedule matches. A failed action is logged and
/// contained: it never stops this job, other jobs, or the session.
pub async fn run_batch_job<F, Fut>(name: &'static str, mut schedule: BatchSchedule, mut action: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut ticker = interval(Duration::from_secs(60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if let Some(target) = schedule.fire_due(zoned_now()) {
            tracing::info!(job = name, target = %target, "batch trigger matched");
            if let Err(err) = action().await {
                tracing::error!(job = name, "batch action failed: {err:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::BOT_TIMEZONE;
    use chrono::TimeZone;

    fn clock(hour: u32, minute: u32) -> DateTime<Tz> {
        BOT_TIMEZONE
            .with_ymd_and_hms(2024, 5, 2, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn fires_only_on_exact_match() {
        let mut schedule = BatchSchedule::new(["09:00"]).unwrap();

        assert_eq!(schedule.fire_due(clock(8, 59)), None);
        assert_eq!(schedule.fire_due(clock(9, 0)), Some("09:00".to_string()));
        assert_eq!(schedule.fire_due(clock(9, 1)), None);
    }

    #[test]
    fn rejects_unpadded_target() {
        assert!(matches!(
            BatchSchedule::new(["9:00"]),
            Err(ScheduleError::InvalidTargetTime(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_targets() {
        assert!(matches!(
            BatchSchedule::new(["24:00"]),
            Err(ScheduleError::InvalidTargetTime(_))
        ));
        assert!(matches!(
            BatchSchedule::new(["09:60"]),
            Err(ScheduleError::InvalidTargetTime(_))
        ));
        assert!(matches!(
            BatchSchedule::new(["0900"]),
            Err(ScheduleError::InvalidTargetTime(_))
        ));
    }

    #[test]
    fn rejects_duplicate_targets() {
        assert!(matches!(
            BatchSchedule::new(["09:00", "09:00"]),
            Err(ScheduleError::DuplicateTargetTime(_))
        ));
    }

    #[test]
    fn full_day_sweep_fires_exactly_twice() {
        let mut schedule = BatchSchedule::new(["09:00", "17:00"]).unwrap();

        let mut fired = Vec::new();
        for hour in 0..24 {
            for minute in 0..60 {
                if let Some(target) = schedule.fire_due(clock(hour, minute)) {
                    fired.push(target);
                }
            }
        }

        assert_eq!(fired, ["09:00", "17:00"]);
    }

    #[test]
    fn double_poll_in_the_same_minute_fires_once() {
        let mut schedule = BatchSchedule::new(["12:00"]).unwrap();

        assert!(schedule.fire_due(clock(12, 0)).is_some());
        assert!(schedule.fire_due(clock(12, 0)).is_none());
    }

    #[test]
    fn refires_on_the_next_day() {
        let mut schedule = BatchSchedule::new(["12:00"]).unwrap();

        let today = BOT_TIMEZONE.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let tomorrow = BOT_TIMEZONE.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap();

        assert!(schedule.fire_due(today).is_some());
        assert!(schedule.fire_due(tomorrow).is_some());
    }

    #[test]
    fn jobs_sharing_a_target_fire_independently() {
        let mut first = BatchSchedule::new(["09:00"]).unwrap();
        let mut second = BatchSchedule::new(["09:00", "17:00"]).unwrap();

        assert!(first.fire_due(clock(9, 0)).is_some());
        assert!(second.fire_due(clock(9, 0)).is_some());
    }
}
