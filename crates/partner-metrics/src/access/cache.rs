use crate::metrics::PartnerKey;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Partner { key: PartnerKey, date: NaiveDate },
    Management { date: NaiveDate },
}

impl CacheKey {
    pub fn partner(key: PartnerKey, date: NaiveDate) -> Self {
        Self::Partner { key, date }
    }

    pub fn management(date: NaiveDate) -> Self {
        Self::Management { date }
    }
}

#[derive(Debug, Clone)]
struct CachedReport {
    html: String,
    stored_at: DateTime<Utc>,
}

/// Rendered HTML per partner and report date, dropped once older than the TTL.
#[derive(Debug)]
pub struct ReportCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CachedReport>>,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CachedReport, now: DateTime<Utc>) -> bool {
        match (now - entry.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // stored "in the future" relative to now; treat as fresh
            Err(_) => true,
        }
    }

    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries.get(key).map(|entry| self.is_fresh(entry, now))?;
        if fresh {
            entries.get(key).map(|entry| entry.html.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    /// Stores a page and evicts everything already expired, so keys for past report dates that are
    /// never looked up again still leave the cache.
    pub fn insert(&self, key: CacheKey, html: String, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| self.is_fresh(entry, now));
        entries.insert(key, CachedReport {
            html,
            stored_at: now,
        });
    }

    /// Returns the cached page or renders, stores, and returns a new one.
    pub fn get_or_insert_with<F>(&self, key: CacheKey, now: DateTime<Utc>, render: F) -> String
    where
        F: FnOnce() -> String,
    {
        if let Some(html) = self.get(&key, now) {
            return html;
        }
        let html = render();
        self.insert(key, html.clone(), now);
        html
    }

    /// Drops expired entries; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::identity::key_for;
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 18, 12, 0, 0)
            .single()
            .expect("valid time")
            + chrono::Duration::minutes(minutes)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 18).expect("valid date")
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ReportCache::new(Duration::from_secs(60 * 60));
        let key = CacheKey::partner(key_for("Crew A"), date());
        cache.insert(key.clone(), "<html>a</html>".into(), at(0));

        assert_eq!(cache.get(&key, at(59)).as_deref(), Some("<html>a</html>"));
        assert_eq!(cache.get(&key, at(60)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_separate_partners_dates_and_management() {
        let cache = ReportCache::new(Duration::from_secs(3600));
        let next_day = date().succ_opt().expect("next day");
        cache.insert(CacheKey::partner(key_for("Crew A"), date()), "a".into(), at(0));
        cache.insert(CacheKey::management(date()), "m".into(), at(0));

        assert_eq!(cache.get(&CacheKey::partner(key_for("Crew A"), next_day), at(1)), None);
        assert_eq!(cache.get(&CacheKey::partner(key_for("Crew B"), date()), at(1)), None);
        assert_eq!(cache.get(&CacheKey::management(date()), at(1)).as_deref(), Some("m"));
    }

    #[test]
    fn inserting_evicts_pages_from_earlier_dates() {
        let cache = ReportCache::new(Duration::from_secs(3600));
        let next_day = date().succ_opt().expect("next day");
        cache.insert(CacheKey::partner(key_for("Crew A"), date()), "a".into(), at(0));
        cache.insert(CacheKey::management(date()), "m".into(), at(30));
        assert_eq!(cache.len(), 2);

        cache.insert(CacheKey::partner(key_for("Crew A"), next_day), "a2".into(), at(24 * 60));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache
                .get(&CacheKey::partner(key_for("Crew A"), next_day), at(24 * 60 + 1))
                .as_deref(),
            Some("a2")
        );
    }

    #[test]
    fn get_or_insert_renders_once_while_fresh() {
        let cache = ReportCache::new(Duration::from_secs(3600));
        let key = CacheKey::management(date());
        let mut renders = 0;

        let first = cache.get_or_insert_with(key.clone(), at(0), || {
            renders += 1;
            "v1".to_string()
        });
        let second = cache.get_or_insert_with(key.clone(), at(10), || {
            renders += 1;
            "v2".to_string()
        });

        assert_eq!((first.as_str(), second.as_str()), ("v1", "v1"));
        assert_eq!(renders, 1);
        assert_eq!(cache.purge_expired(at(120)), 1);
    }
}
