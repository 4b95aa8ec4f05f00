use chrono::{LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::components::calendar::models::Window;

/// Resolution window for one report day: local midnight through the last
/// microsecond of the day, both in the reference zone
pub fn day_window(date: NaiveDate, tz: Tz) -> Window {
    let start = local_or_utc(date.and_time(NaiveTime::MIN), tz);
    let last_instant = date.and_time(
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN),
    );
    let end = local_or_utc(last_instant, tz);
    Window { start, end }
}

/// Today's date in the reference zone
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

fn local_or_utc(naive: chrono::NaiveDateTime, tz: Tz) -> chrono::DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => naive.and_utc().with_timezone(&tz),
    }
}
