use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Calendar reference used when no timezone is configured.
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::America::New_York;

const TRAILING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Today,
    Week,
    MonthToDate,
    YearToDate,
}

impl Window {
    pub const fn ordered() -> [Self; 4] {
        [Self::Today, Self::Week, Self::MonthToDate, Self::YearToDate]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "Week",
            Self::MonthToDate => "MTD",
            Self::YearToDate => "YTD",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Today => 0b0001,
            Self::Week => 0b0010,
            Self::MonthToDate => 0b0100,
            Self::YearToDate => 0b1000,
        }
    }
}

/// Set of windows a single record falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSet(u8);

impl WindowSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, window: Window) {
        self.0 |= window.bit();
    }

    pub const fn contains(self, window: Window) -> bool {
        self.0 & window.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Window> {
        Window::ordered()
            .into_iter()
            .filter(move |window| self.contains(*window))
    }
}

impl FromIterator<Window> for WindowSet {
    fn from_iter<I: IntoIterator<Item = Window>>(iter: I) -> Self {
        let mut set = Self::empty();
        for window in iter {
            set.insert(window);
        }
        set
    }
}

/// Lower and upper bounds of every window, resolved once per aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub now: DateTime<Utc>,
    pub today_start: DateTime<Utc>,
    pub tomorrow_start: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    pub year_start: DateTime<Utc>,
}

impl WindowBounds {
    pub fn resolve(now: DateTime<Utc>, timezone: Tz) -> Self {
        let today = now.with_timezone(&timezone).date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        let week = today - Duration::days(TRAILING_WINDOW_DAYS);
        let month = today.with_day(1).unwrap_or(today);
        let year = today.with_ordinal(1).unwrap_or(today);

        Self {
            now,
            today_start: local_midnight(timezone, today),
            tomorrow_start: local_midnight(timezone, tomorrow),
            week_start: local_midnight(timezone, week),
            month_start: local_midnight(timezone, month),
            year_start: local_midnight(timezone, year),
        }
    }

    pub fn classify(&self, occurred_at: DateTime<Utc>) -> WindowSet {
        let mut windows = WindowSet::empty();
        if occurred_at > self.now {
            return windows;
        }

        if occurred_at >= self.today_start && occurred_at < self.tomorrow_start {
            windows.insert(Window::Today);
        }
        if occurred_at >= self.week_start {
            windows.insert(Window::Week);
        }
        if occurred_at >= self.month_start {
            windows.insert(Window::MonthToDate);
        }
        if occurred_at >= self.year_start {
            windows.insert(Window::YearToDate);
        }

        windows
    }

    /// Calendar date of `now` in the reference timezone.
    pub fn report_date(&self, timezone: Tz) -> NaiveDate {
        self.now.with_timezone(&timezone).date_naive()
    }
}

/// Classifies a timestamp against `now` using the New York calendar.
pub fn classify(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> WindowSet {
    WindowBounds::resolve(now, REFERENCE_TIMEZONE).classify(occurred_at)
}

/// First instant of `date` in `timezone`, stepping past a DST gap at midnight.
pub(crate) fn local_midnight(timezone: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hours| {
            timezone
                .from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        REFERENCE_TIMEZONE
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("unambiguous eastern time")
            .with_timezone(&Utc)
    }

    #[test]
    fn record_from_this_morning_is_in_every_window() {
        let now = eastern(2025, 6, 18, 21, 0);
        let windows = classify(eastern(2025, 6, 18, 9, 30), now);
        assert_eq!(windows.iter().count(), 4);
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let now = eastern(2025, 6, 18, 21, 0);
        let midnight = eastern(2025, 6, 18, 0, 0);

        assert!(classify(midnight, now).contains(Window::Today));
        let just_before = midnight - Duration::milliseconds(1);
        let windows = classify(just_before, now);
        assert!(!windows.contains(Window::Today));
        assert!(windows.contains(Window::Week));
    }

    #[test]
    fn utc_evening_is_still_today_in_new_york() {
        // 01:30 UTC on the 19th is 21:30 on the 18th in New York.
        let now = eastern(2025, 6, 18, 23, 0);
        let occurred = Utc.with_ymd_and_hms(2025, 6, 19, 1, 30, 0).unwrap();
        assert!(occurred <= now);
        assert!(classify(occurred, now).contains(Window::Today));
    }

    #[test]
    fn week_window_reaches_back_seven_days_to_midnight() {
        let now = eastern(2025, 6, 18, 21, 0);
        assert!(classify(eastern(2025, 6, 11, 0, 0), now).contains(Window::Week));
        assert!(!classify(eastern(2025, 6, 10, 23, 59), now).contains(Window::Week));
    }

    #[test]
    fn month_and_year_windows_start_on_first_day() {
        let now = eastern(2025, 6, 3, 8, 0);
        let may_end = eastern(2025, 5, 31, 22, 0);
        let windows = classify(may_end, now);
        assert!(windows.contains(Window::Week));
        assert!(!windows.contains(Window::MonthToDate));
        assert!(windows.contains(Window::YearToDate));

        let last_year = eastern(2024, 12, 31, 23, 0);
        assert!(classify(last_year, eastern(2025, 1, 2, 9, 0)).contains(Window::Week));
        assert!(!classify(last_year, eastern(2025, 1, 2, 9, 0)).contains(Window::YearToDate));
    }

    #[test]
    fn future_records_belong_to_no_window() {
        let now = eastern(2025, 6, 18, 12, 0);
        let later_today = eastern(2025, 6, 18, 15, 0);
        assert!(classify(later_today, now).is_empty());
    }

    #[test]
    fn bounds_follow_daylight_saving_offsets() {
        let winter = WindowBounds::resolve(eastern(2025, 1, 15, 12, 0), REFERENCE_TIMEZONE);
        assert_eq!(winter.today_start, Utc.with_ymd_and_hms(2025, 1, 15, 5, 0, 0).unwrap());

        let summer = WindowBounds::resolve(eastern(2025, 7, 15, 12, 0), REFERENCE_TIMEZONE);
        assert_eq!(summer.today_start, Utc.with_ymd_and_hms(2025, 7, 15, 4, 0, 0).unwrap());
        assert_eq!(summer.year_start, Utc.with_ymd_and_hms(2025, 1, 1, 5, 0, 0).unwrap());
    }

    #[test]
    fn window_set_collects_from_iterator() {
        let set: WindowSet = [Window::Today, Window::YearToDate].into_iter().collect();
        assert!(set.contains(Window::Today));
        assert!(!set.contains(Window::Week));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Window::Today, Window::YearToDate]);
    }
}
