//! Per-video 24h unavailability cache (§4.9): short-circuits repeated
//! attempts against a video every fallback method has already failed for.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub struct UnavailabilityCache {
    marked_at: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
}

impl Default for UnavailabilityCache {
    fn default() -> Self {
        Self { marked_at: DashMap::new(), ttl: Duration::hours(24) }
    }
}

impl UnavailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unavailable(&self, video_id: &str) -> bool {
        match self.marked_at.get(video_id) {
            Some(marked) => Utc::now() - *marked < self.ttl,
            None => false,
        }
    }

    pub fn mark_unavailable(&self, video_id: &str) {
        self.marked_at.insert(video_id.to_string(), Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_video_is_unavailable_until_ttl_elapses() {
        let cache = UnavailabilityCache::new();
        assert!(!cache.is_unavailable("v1"));
        cache.mark_unavailable("v1");
        assert!(cache.is_unavailable("v1"));
    }

    #[test]
    fn expired_marks_are_treated_as_available() {
        let cache = UnavailabilityCache::new();
        cache.marked_at.insert("v1".to_string(), Utc::now() - Duration::hours(25));
        assert!(!cache.is_unavailable("v1"));
    }
}
