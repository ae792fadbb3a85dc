use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of "today" for scheduling and "now" for session timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Noon UTC on the given day.
    pub fn on(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self {
            now: noon.and_utc(),
        }
    }

    pub fn plus_days(&self, days: i64) -> Self {
        Self {
            now: self.now + Duration::days(days),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fixed_clock_today_is_its_date() {
        let clock = FixedClock::on(date(2024, 3, 10));
        assert_eq!(clock.today(), date(2024, 3, 10));
    }

    #[test]
    fn plus_days_crosses_month_boundary() {
        let clock = FixedClock::on(date(2024, 1, 30)).plus_days(3);
        assert_eq!(clock.today(), date(2024, 2, 2));
    }

    #[test]
    fn system_clock_today_matches_utc_date() {
        let before = Utc::now().date_naive();
        let today = SystemClock.today();
        let after = Utc::now().date_naive();
        assert!(today == before || today == after);
    }
}
