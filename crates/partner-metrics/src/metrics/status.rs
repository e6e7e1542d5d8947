use serde::{Deserialize, Serialize};

const SAT_MARKERS: [&str; 2] = ["sat", "sit"];
const CLOSED_MARKERS: [&str; 2] = ["sold", "close"];

/// Outcome category derived from a free-text status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    None,
    Sat,
    Closed,
}

impl StatusCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "No Outcome",
            Self::Sat => "Sat",
            Self::Closed => "Closed",
        }
    }
}

/// Case-insensitive substring match; a sat marker wins over a closed marker.
pub fn classify(status_label: &str) -> StatusCategory {
    let lowered = status_label.to_lowercase();
    if SAT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        StatusCategory::Sat
    } else if CLOSED_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        StatusCategory::Closed
    } else {
        StatusCategory::None
    }
}
