use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Every wall-clock read in the bot goes through this zone, so the batch
/// scheduler and the event log agree on what "today" and "09:00" mean.
pub const BOT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

pub fn zoned_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&BOT_TIMEZONE)
}
