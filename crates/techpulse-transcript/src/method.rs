//! The trait every fallback-chain method implements (§4.9). `Ok(None)`
//! means "not available via this method, advance to the next"; an
//! `AccessBlocked` error short-circuits the remaining methods outright.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait TranscriptMethod: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, video_id: &str) -> Result<Option<String>>;
}
