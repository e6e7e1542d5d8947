use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_PARTNER: &str = "Unknown Partner";
pub const INTERNAL_ROUTES_COMBINED: &str = "Internal Routes (Combined)";
/// Internal-route partner that keeps its own row instead of joining the combined bucket.
pub const INTERNAL_ROUTE_EXEMPT: &str = "MFSM";

const INTERNAL_ROUTE_MARKER: &str = "internal";

/// Deduplicated partner identity used to group appointment records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerKey(String);

impl PartnerKey {
    pub fn unknown() -> Self {
        Self(UNKNOWN_PARTNER.to_string())
    }

    pub fn internal_routes() -> Self {
        Self(INTERNAL_ROUTES_COMBINED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_PARTNER
    }

    /// First word of the key, used to greet a partner by name.
    pub fn first_name(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for PartnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartnerKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps a raw partner identity and its route label onto the canonical key.
pub fn normalize(raw_identity: &str, route_label: Option<&str>) -> PartnerKey {
    let trimmed = trim_identity(raw_identity);
    if trimmed.is_empty() {
        return PartnerKey::unknown();
    }

    let internal_route = route_label
        .map(|label| label.to_lowercase().contains(INTERNAL_ROUTE_MARKER))
        .unwrap_or(false);
    if internal_route && trimmed != INTERNAL_ROUTE_EXEMPT {
        return PartnerKey::internal_routes();
    }

    PartnerKey(trimmed.to_string())
}

/// Looks up an already-canonical identity (e.g. a directory entry) without route merging.
pub fn key_for(identity: &str) -> PartnerKey {
    normalize(identity, None)
}

fn trim_identity(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}' || c == '\u{200b}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_identities_share_a_key() {
        assert_eq!(normalize("Bob Smith ", None), normalize(" Bob Smith", None));
        assert_eq!(normalize("\u{feff}Bob Smith", None).as_str(), "Bob Smith");
    }

    #[test]
    fn blank_identity_maps_to_unknown_partner() {
        assert!(normalize("", None).is_unknown());
        assert!(normalize("   \t", Some("Internal - North")).is_unknown());
    }

    #[test]
    fn internal_routes_collapse_except_exempt_partner() {
        let crew_a = normalize("Crew A", Some("Internal - North"));
        let crew_b = normalize("Crew B", Some("internal"));
        assert_eq!(crew_a, PartnerKey::internal_routes());
        assert_eq!(crew_a, crew_b);

        assert_eq!(normalize("MFSM", Some("Internal")).as_str(), "MFSM");
        assert_eq!(normalize(" MFSM ", Some("INTERNAL")).as_str(), "MFSM");
    }

    #[test]
    fn external_routes_keep_identity() {
        assert_eq!(normalize("Crew A", Some("Dallas North")).as_str(), "Crew A");
        assert_eq!(normalize("Crew A", None).as_str(), "Crew A");
    }

    #[test]
    fn first_name_uses_leading_word() {
        assert_eq!(key_for("Robert Soderholm").first_name(), "Robert");
        assert_eq!(PartnerKey::unknown().first_name(), "Unknown");
    }
}
