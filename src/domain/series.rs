//! Date-indexed series and the analysis window.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::error::{LagError, Result};

/// A single raw timestamped data point (USD liquidity or USD price)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub at: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(at: DateTime<Utc>, value: f64) -> Self {
        Self { at, value }
    }

    /// Build from epoch seconds. Returns None for out-of-range timestamps.
    pub fn from_epoch_secs(secs: i64, value: f64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(|at| Self { at, value })
    }

    /// Build from epoch milliseconds. Returns None for out-of-range timestamps.
    pub fn from_epoch_millis(millis: i64, value: f64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|at| Self { at, value })
    }
}

/// One value per calendar day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    values: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse raw observations to one value per UTC day.
    ///
    /// The observation with the latest timestamp wins; on equal timestamps the
    /// one appearing later in the input wins.
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut latest: BTreeMap<NaiveDate, Observation> = BTreeMap::new();
        for obs in observations {
            let day = obs.at.date_naive();
            match latest.get(&day) {
                Some(current) if current.at > obs.at => {}
                _ => {
                    latest.insert(day, obs);
                }
            }
        }

        Self {
            values: latest
                .into_iter()
                .map(|(day, obs)| (day, obs.value))
                .collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn insert(&mut self, date: NaiveDate, value: f64) {
        self.values.insert(date, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.values.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.values.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(LagError::Validation(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// `days` calendar days ending `end_offset_days` before `today`
    pub fn ending_before(today: NaiveDate, days: u32, end_offset_days: u32) -> Result<Self> {
        if days == 0 {
            return Err(LagError::Validation("window must span at least one day".to_string()));
        }
        let end = today - Duration::days(i64::from(end_offset_days));
        let start = end - Duration::days(i64::from(days) - 1);
        Self::new(start, end)
    }

    /// Every day in the window, ascending
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    pub fn num_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_latest_observation_of_day_wins() {
        let series = DailySeries::from_observations(vec![
            Observation::new(ts(2024, 3, 1, 23), 300.0),
            Observation::new(ts(2024, 3, 1, 1), 100.0),
            Observation::new(ts(2024, 3, 2, 0), 400.0),
            Observation::new(ts(2024, 3, 1, 12), 200.0),
        ]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.get(day(2024, 3, 1)), Some(300.0));
        assert_eq!(series.get(day(2024, 3, 2)), Some(400.0));
        assert_eq!(series.first_date(), Some(day(2024, 3, 1)));
        assert_eq!(series.last_date(), Some(day(2024, 3, 2)));
    }

    #[test]
    fn test_equal_timestamps_keep_later_entry() {
        let at = ts(2024, 3, 1, 6);
        let series = DailySeries::from_observations(vec![
            Observation::new(at, 1.0),
            Observation::new(at, 2.0),
        ]);
        assert_eq!(series.get(day(2024, 3, 1)), Some(2.0));
    }

    #[test]
    fn test_epoch_conversions() {
        let obs = Observation::from_epoch_secs(1_709_251_200, 5.0).unwrap();
        assert_eq!(obs.at.date_naive(), day(2024, 3, 1));

        let obs = Observation::from_epoch_millis(1_709_251_200_000 - 1, 5.0).unwrap();
        assert_eq!(obs.at.date_naive(), day(2024, 2, 29));
    }

    #[test]
    fn test_window_ending_yesterday() {
        let window = DateWindow::ending_before(day(2024, 3, 31), 60, 1).unwrap();
        assert_eq!(window.end, day(2024, 3, 30));
        assert_eq!(window.start, day(2024, 1, 31));
        assert_eq!(window.num_days(), 60);

        let days = window.days();
        assert_eq!(days.len(), 60);
        assert_eq!(days.first(), Some(&window.start));
        assert_eq!(days.last(), Some(&window.end));
        assert!(days.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));

        assert!(window.contains(day(2024, 2, 29)));
        assert!(!window.contains(day(2024, 3, 31)));
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        assert!(DateWindow::new(day(2024, 3, 2), day(2024, 3, 1)).is_err());
        assert!(DateWindow::ending_before(day(2024, 3, 2), 0, 1).is_err());
    }
}
