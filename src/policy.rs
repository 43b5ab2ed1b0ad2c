use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use strum_macros::Display;

/// An employee's effective working window. Falls back to the shop default
/// when no active schedule row exists for the employee.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleWindow {
    pub entry: NaiveTime,
    pub exit: NaiveTime,
    pub grace_minutes: u32,
}

impl Default for ScheduleWindow {
    fn default() -> Self {
        Self {
            entry: NaiveTime::from_hms_opt(9, 0, 0).expect("valid literal time"),
            exit: NaiveTime::from_hms_opt(19, 0, 0).expect("valid literal time"),
            grace_minutes: 15,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EntryClass {
    OnTime,
    Late,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ExitClass {
    OnTime,
    Early,
}

/// Wall-clock comparisons only look at HH:MM; seconds are ignored.
fn minutes_since_midnight(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

/// An entry is late strictly after `scheduled + grace`. Arriving exactly on
/// the grace boundary is still on time.
pub fn is_late_entry(entry: NaiveTime, scheduled: NaiveTime, grace_minutes: u32) -> bool {
    minutes_since_midnight(entry) > minutes_since_midnight(scheduled) + grace_minutes as i64
}

/// An exit is early strictly before the scheduled exit. No grace on the way
/// out.
pub fn is_early_exit(exit: NaiveTime, scheduled: NaiveTime) -> bool {
    minutes_since_midnight(exit) < minutes_since_midnight(scheduled)
}

pub fn classify_entry(entry: NaiveTime, window: &ScheduleWindow) -> EntryClass {
    if is_late_entry(entry, window.entry, window.grace_minutes) {
        EntryClass::Late
    } else {
        EntryClass::OnTime
    }
}

pub fn classify_exit(exit: NaiveTime, window: &ScheduleWindow) -> ExitClass {
    if is_early_exit(exit, window.exit) {
        ExitClass::Early
    } else {
        ExitClass::OnTime
    }
}

fn zone(offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// Projects a stored instant into the configured civil zone before the HH:MM
/// is extracted. Comparing raw UTC hour-of-day would misclassify every event.
pub fn local_clock(instant: DateTime<Utc>, offset_minutes: i32) -> NaiveTime {
    instant.with_timezone(&zone(offset_minutes)).time()
}

/// Calendar date of an instant in the configured civil zone. Attendance rows
/// are keyed on this, not on the UTC date.
pub fn local_date(instant: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    instant.with_timezone(&zone(offset_minutes)).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn grace_boundary_is_not_late() {
        // entry at exactly scheduled + grace stays on time
        assert!(!is_late_entry(t(9, 15), t(9, 0), 15));
        // one minute past the boundary is late
        assert!(is_late_entry(t(9, 16), t(9, 0), 15));
    }

    #[test]
    fn zero_grace_is_strict() {
        assert!(!is_late_entry(t(8, 0), t(8, 0), 0));
        assert!(is_late_entry(t(8, 1), t(8, 0), 0));
    }

    #[test]
    fn exit_boundary_is_not_early() {
        assert!(!is_early_exit(t(17, 0), t(17, 0)));
        assert!(is_early_exit(t(16, 59), t(17, 0)));
    }

    #[test]
    fn default_window_classifies_entries() {
        let window = ScheduleWindow::default();
        assert_eq!(classify_entry(t(9, 14), &window), EntryClass::OnTime);
        assert_eq!(classify_entry(t(9, 15), &window), EntryClass::OnTime);
        assert_eq!(classify_entry(t(9, 16), &window), EntryClass::Late);
    }

    #[test]
    fn custom_window_classifies_exits() {
        let window = ScheduleWindow {
            entry: t(8, 0),
            exit: t(17, 0),
            grace_minutes: 0,
        };
        assert_eq!(classify_exit(t(16, 59), &window), ExitClass::Early);
        assert_eq!(classify_exit(t(17, 0), &window), ExitClass::OnTime);
        assert_eq!(classify_entry(t(8, 1), &window), EntryClass::Late);
    }

    #[test]
    fn seconds_do_not_affect_classification() {
        let entry = NaiveTime::from_hms_opt(9, 15, 59).unwrap();
        assert!(!is_late_entry(entry, t(9, 0), 15));
    }

    #[test]
    fn instants_are_projected_before_comparison() {
        // 15:16 UTC is 09:16 in a UTC-6 shop: late against the default window
        let instant = Utc.with_ymd_and_hms(2025, 3, 10, 15, 16, 0).unwrap();
        let clock = local_clock(instant, -360);
        assert_eq!(clock, t(9, 16));
        assert_eq!(
            classify_entry(clock, &ScheduleWindow::default()),
            EntryClass::Late
        );
    }

    #[test]
    fn local_date_shifts_around_midnight() {
        // 03:00 UTC is still the previous day at UTC-6
        let instant = Utc.with_ymd_and_hms(2025, 3, 11, 3, 0, 0).unwrap();
        assert_eq!(
            local_date(instant, -360),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }
}
