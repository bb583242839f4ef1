//! The fallback chain itself (§4.9): try each configured method in order,
//! advancing on a miss or a transient failure, short-circuiting on
//! `AccessBlocked`, and caching a total miss for 24h.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::UnavailabilityCache;
use crate::error::TranscriptError;
use crate::method::TranscriptMethod;

pub struct TranscriptPipeline {
    methods: Vec<Arc<dyn TranscriptMethod>>,
    cache: UnavailabilityCache,
}

impl TranscriptPipeline {
    pub fn new(methods: Vec<Arc<dyn TranscriptMethod>>) -> Self {
        Self { methods, cache: UnavailabilityCache::new() }
    }

    /// Returns the formatted transcript, or `None` if every method in the
    /// chain failed (or the video is cached as unavailable).
    pub async fn fetch_transcript(&self, video_id: &str) -> Option<String> {
        if self.cache.is_unavailable(video_id) {
            debug!(video_id, "skipping transcript fetch: cached as unavailable");
            return None;
        }

        for method in &self.methods {
            match method.fetch(video_id).await {
                Ok(Some(transcript)) => {
                    info!(video_id, method = method.name(), "transcript acquired");
                    return Some(transcript);
                }
                Ok(None) => {
                    debug!(video_id, method = method.name(), "method found nothing, advancing");
                }
                Err(TranscriptError::AccessBlocked(reason)) => {
                    warn!(video_id, method = method.name(), reason, "access blocked, short-circuiting remaining methods");
                    break;
                }
                Err(err) => {
                    warn!(video_id, method = method.name(), error = %err, "method failed, advancing");
                }
            }
        }

        self.cache.mark_unavailable(video_id);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MissMethod {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TranscriptMethod for MissMethod {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn fetch(&self, _video_id: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct HitMethod {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TranscriptMethod for HitMethod {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn fetch(&self, _video_id: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("00:00:00 [Alice]: hi".to_string()))
        }
    }

    struct BlockedMethod;

    #[async_trait]
    impl TranscriptMethod for BlockedMethod {
        fn name(&self) -> &'static str {
            "blocked"
        }
        async fn fetch(&self, _video_id: &str) -> Result<Option<String>> {
            Err(TranscriptError::AccessBlocked("403".to_string()))
        }
    }

    #[tokio::test]
    async fn advances_past_a_miss_to_the_next_method() {
        let calls = Arc::new(AtomicUsize::new(0));
        let methods: Vec<Arc<dyn TranscriptMethod>> = vec![
            Arc::new(MissMethod { name: "microservice", calls: calls.clone() }),
            Arc::new(HitMethod { name: "captions", calls: calls.clone() }),
        ];
        let pipeline = TranscriptPipeline::new(methods);
        let result = pipeline.fetch_transcript("v1").await;
        assert!(result.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn access_blocked_short_circuits_remaining_methods() {
        let calls = Arc::new(AtomicUsize::new(0));
        let methods: Vec<Arc<dyn TranscriptMethod>> = vec![
            Arc::new(BlockedMethod),
            Arc::new(HitMethod { name: "never-reached", calls: calls.clone() }),
        ];
        let pipeline = TranscriptPipeline::new(methods);
        let result = pipeline.fetch_transcript("v1").await;
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn total_miss_is_cached_for_subsequent_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let methods: Vec<Arc<dyn TranscriptMethod>> = vec![Arc::new(MissMethod { name: "only", calls: calls.clone() })];
        let pipeline = TranscriptPipeline::new(methods);
        assert!(pipeline.fetch_transcript("v1").await.is_none());
        assert!(pipeline.fetch_transcript("v1").await.is_none());
        // Second call hit the unavailability cache and never called the method again.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
