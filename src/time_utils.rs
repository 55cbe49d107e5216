use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::AppResult;

const COMMIT_DATE_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month padding:zero]-[day padding:zero] [hour padding:zero]:[minute padding:zero]:[second padding:zero] [offset_hour sign:mandatory]:[offset_minute]"
);

/// Build a datetime from a commit's epoch seconds and its recorded UTC offset.
pub fn commit_datetime(seconds: i64, offset_minutes: i32) -> AppResult<OffsetDateTime> {
    let offset = UtcOffset::from_whole_seconds(offset_minutes * 60)?;
    Ok(OffsetDateTime::from_unix_timestamp(seconds)?.to_offset(offset))
}

/// Render a commit timestamp in the author's own timezone, e.g.
/// `2024-05-12 14:33:12 +02:00`.
pub fn human_date(seconds: i64, offset_minutes: i32) -> AppResult<String> {
    Ok(commit_datetime(seconds, offset_minutes)?.format(&COMMIT_DATE_FORMAT)?)
}
