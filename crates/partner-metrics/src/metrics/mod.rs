//! Appointment rollups per partner across the today / week / month-to-date / year-to-date windows.
//!
//! Records flow through the identity normalizer, the window and status classifiers, and are folded by
//! the [`Aggregator`] into a [`RollupTable`]. A pass is synchronous and keeps no state between calls.

mod aggregator;
pub mod identity;
mod record;
mod rollup;
pub mod status;
pub mod views;
pub mod window;

pub use aggregator::{
    aggregate, AggregationError, AggregationOutcome, Aggregator, SkipReason, SkippedRecord,
};
pub use identity::PartnerKey;
pub use record::{OccurredAt, RawRecord, DEFAULT_REVENUE_PER_KW};
pub use rollup::{percentage, PartnerMetrics, RollupTable, WindowCounters};
pub use status::StatusCategory;
pub use views::{PartnerMetricsView, SkippedRecordView, WindowSnapshot};
pub use window::{Window, WindowBounds, WindowSet, REFERENCE_TIMEZONE};
