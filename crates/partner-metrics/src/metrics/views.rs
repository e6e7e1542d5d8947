use super::identity::PartnerKey;
use super::rollup::WindowCounters;
use super::window::Window;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub window: Window,
    pub window_label: &'static str,
    pub appointments: u32,
    pub sat: u32,
    pub closed: u32,
    pub sit_rate: f64,
    pub close_rate: f64,
    pub revenue: f64,
}

impl WindowSnapshot {
    pub fn from_counters(window: Window, counters: &WindowCounters) -> Self {
        Self {
            window,
            window_label: window.label(),
            appointments: counters.appointments,
            sat: counters.sat,
            closed: counters.closed,
            sit_rate: counters.sit_rate(),
            close_rate: counters.close_rate(),
            revenue: counters.revenue(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerMetricsView {
    pub partner: PartnerKey,
    pub has_activity_in_trailing_window: bool,
    pub windows: Vec<WindowSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecordView {
    pub index: usize,
    pub partner: PartnerKey,
    pub reason: String,
}
