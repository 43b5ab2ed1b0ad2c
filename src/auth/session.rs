use chrono::{DateTime, Duration, Utc};

/// Absolute lifetime of an admin session.
pub const SESSION_DURATION_HOURS: i64 = 24;
/// Idle window after which a session is considered abandoned.
pub const INACTIVITY_TIMEOUT_HOURS: i64 = 2;

/// Explicit session record; expiry rules are pure functions over (now,
/// record) so they can be exercised without a browser or a store.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(subject: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            issued_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

pub fn is_expired(now: DateTime<Utc>, record: &SessionRecord) -> bool {
    now - record.issued_at > Duration::hours(SESSION_DURATION_HOURS)
}

pub fn is_inactive(now: DateTime<Utc>, record: &SessionRecord) -> bool {
    now - record.last_activity > Duration::hours(INACTIVITY_TIMEOUT_HOURS)
}

pub fn is_valid(now: DateTime<Utc>, record: &SessionRecord) -> bool {
    !is_expired(now, record) && !is_inactive(now, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    #[test]
    fn fresh_session_is_valid() {
        let rec = SessionRecord::new("carolina", at(9));
        assert!(is_valid(at(9), &rec));
        assert!(is_valid(at(10), &rec));
    }

    #[test]
    fn idle_session_times_out() {
        let rec = SessionRecord::new("carolina", at(9));
        assert!(!is_inactive(at(11), &rec));
        assert!(is_inactive(at(12), &rec));
        assert!(!is_valid(at(12), &rec));
    }

    #[test]
    fn activity_extends_the_idle_window_but_not_the_lifetime() {
        let mut rec = SessionRecord::new("carolina", at(9));
        rec.touch(at(11));
        assert!(is_valid(at(12), &rec));

        // 25h after issue, still recently active: expired regardless
        let mut old = SessionRecord::new("carolina", Utc.with_ymd_and_hms(2025, 3, 9, 8, 0, 0).unwrap());
        old.touch(at(9));
        assert!(is_expired(at(10), &old));
        assert!(!is_valid(at(10), &old));
    }
}
