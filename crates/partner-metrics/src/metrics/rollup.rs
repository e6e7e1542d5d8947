use super::identity::PartnerKey;
use super::status::StatusCategory;
use super::views::{PartnerMetricsView, WindowSnapshot};
use super::window::Window;
use std::collections::btree_map::{self, BTreeMap};

/// Counters for one partner in one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounters {
    pub appointments: u32,
    pub sat: u32,
    pub closed: u32,
    pub revenue_cents: u64,
}

impl WindowCounters {
    pub(crate) fn record(&mut self, status: StatusCategory, revenue_cents: u64) {
        self.appointments += 1;
        match status {
            StatusCategory::Sat => self.sat += 1,
            StatusCategory::Closed => self.closed += 1,
            StatusCategory::None => {}
        }
        self.revenue_cents = self.revenue_cents.saturating_add(revenue_cents);
    }

    pub fn merge(&mut self, other: &Self) {
        self.appointments += other.appointments;
        self.sat += other.sat;
        self.closed += other.closed;
        self.revenue_cents = self.revenue_cents.saturating_add(other.revenue_cents);
    }

    /// Share of appointments that sat, in percent with one decimal.
    pub fn sit_rate(&self) -> f64 {
        percentage(self.sat, self.appointments)
    }

    /// Share of sat appointments that closed, in percent with one decimal.
    pub fn close_rate(&self) -> f64 {
        percentage(self.closed, self.sat)
    }

    pub fn revenue(&self) -> f64 {
        self.revenue_cents as f64 / 100.0
    }
}

/// `part / whole * 100` rounded half-up to one decimal; zero when `whole` is zero.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }

    let part = u64::from(part);
    let whole = u64::from(whole);
    let tenths = (part * 2_000 + whole) / (whole * 2);
    tenths as f64 / 10.0
}

/// Rolled-up metrics for a single partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerMetrics {
    pub key: PartnerKey,
    pub today: WindowCounters,
    pub week: WindowCounters,
    pub month_to_date: WindowCounters,
    pub year_to_date: WindowCounters,
    pub has_activity_in_trailing_window: bool,
}

impl PartnerMetrics {
    pub fn new(key: PartnerKey) -> Self {
        Self {
            key,
            today: WindowCounters::default(),
            week: WindowCounters::default(),
            month_to_date: WindowCounters::default(),
            year_to_date: WindowCounters::default(),
            has_activity_in_trailing_window: false,
        }
    }

    pub fn window(&self, window: Window) -> &WindowCounters {
        match window {
            Window::Today => &self.today,
            Window::Week => &self.week,
            Window::MonthToDate => &self.month_to_date,
            Window::YearToDate => &self.year_to_date,
        }
    }

    pub(crate) fn window_mut(&mut self, window: Window) -> &mut WindowCounters {
        match window {
            Window::Today => &mut self.today,
            Window::Week => &mut self.week,
            Window::MonthToDate => &mut self.month_to_date,
            Window::YearToDate => &mut self.year_to_date,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        for window in Window::ordered() {
            self.window_mut(window).merge(other.window(window));
        }
        self.has_activity_in_trailing_window |= other.has_activity_in_trailing_window;
    }

    pub fn to_view(&self) -> PartnerMetricsView {
        PartnerMetricsView {
            partner: self.key.clone(),
            has_activity_in_trailing_window: self.has_activity_in_trailing_window,
            windows: Window::ordered()
                .into_iter()
                .map(|window| WindowSnapshot::from_counters(window, self.window(window)))
                .collect(),
        }
    }
}

/// Output of an aggregation pass: canonical partner key to metrics, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupTable {
    partners: BTreeMap<PartnerKey, PartnerMetrics>,
}

impl RollupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry(&mut self, key: PartnerKey) -> &mut PartnerMetrics {
        self.partners
            .entry(key)
            .or_insert_with_key(|key| PartnerMetrics::new(key.clone()))
    }

    pub fn get(&self, key: &PartnerKey) -> Option<&PartnerMetrics> {
        self.partners.get(key)
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, PartnerKey, PartnerMetrics> {
        self.partners.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PartnerKey> {
        self.partners.keys()
    }

    /// Partners with at least one appointment in the trailing seven days.
    pub fn active_in_trailing_window(&self) -> impl Iterator<Item = &PartnerMetrics> {
        self.iter()
            .filter(|metrics| metrics.has_activity_in_trailing_window)
    }

    /// Sum of all partners' counters for one window.
    pub fn totals(&self, window: Window) -> WindowCounters {
        self.iter().fold(WindowCounters::default(), |mut total, metrics| {
            total.merge(metrics.window(window));
            total
        })
    }

    /// Combines tables built from disjoint record partitions.
    pub fn merge(mut self, other: RollupTable) -> RollupTable {
        for (key, metrics) in other.partners {
            match self.partners.entry(key) {
                btree_map::Entry::Occupied(mut existing) => existing.get_mut().merge(&metrics),
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(metrics);
                }
            }
        }
        self
    }

    pub fn views(&self) -> Vec<PartnerMetricsView> {
        self.iter().map(PartnerMetrics::to_view).collect()
    }
}

impl<'a> IntoIterator for &'a RollupTable {
    type Item = &'a PartnerMetrics;
    type IntoIter = btree_map::Values<'a, PartnerKey, PartnerMetrics>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
