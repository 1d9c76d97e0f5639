//! Calendar date used by every dated write

use chrono::{Local, NaiveDate};

/// Today's date in the local time zone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
