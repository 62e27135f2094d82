// Client-side preloaded buffer of ad videos. Single-writer (the owning
// client), refilled in the background once it drains below a threshold.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::models::RewardVideo;
use crate::names::{VIDEO_QUEUE_REFILL_THRESHOLD, VIDEO_QUEUE_TARGET};
use crate::services::AdVideoProvider;

pub struct RewardVideoQueue {
    provider: Arc<dyn AdVideoProvider>,
    videos: Mutex<Vec<RewardVideo>>,
    preload_in_flight: AtomicBool,
    preload_attempted: AtomicBool,
}

impl RewardVideoQueue {
    pub fn new(provider: Arc<dyn AdVideoProvider>) -> Self {
        Self {
            provider,
            videos: Mutex::new(Vec::new()),
            preload_in_flight: AtomicBool::new(false),
            preload_attempted: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.videos.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches a full batch and replaces the queue. Guarded against concurrent
    /// preloads. A provider failure leaves the queue empty and is not retried
    /// here; callers must tolerate an empty queue.
    pub async fn preload(&self) {
        if self.preload_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        self.preload_attempted.store(true, Ordering::SeqCst);

        match self.provider.fetch_batch(VIDEO_QUEUE_TARGET).await {
            Ok(batch) => {
                let count = batch.len();
                *self.videos.lock().unwrap() = batch;
                tracing::info!("reward video queue preloaded with {count} videos");
            }
            Err(e) => {
                tracing::warn!("reward video preload failed: {e}");
            }
        }

        self.preload_in_flight.store(false, Ordering::SeqCst);
    }

    /// Fire-and-forget top-up when the queue is running low. Appends rather
    /// than replaces. Returns the task handle so tests can await completion.
    pub fn refill_if_needed(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.len() > VIDEO_QUEUE_REFILL_THRESHOLD {
            return None;
        }
        if self.preload_in_flight.swap(true, Ordering::SeqCst) {
            return None;
        }

        let queue = Arc::clone(self);
        Some(tokio::spawn(async move {
            queue.refill_append().await;
            queue.preload_in_flight.store(false, Ordering::SeqCst);
        }))
    }

    async fn refill_append(&self) {
        let missing = VIDEO_QUEUE_TARGET.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self.provider.fetch_batch(missing).await {
            Ok(batch) => {
                let count = batch.len();
                self.videos.lock().unwrap().extend(batch);
                tracing::info!("reward video queue refilled with {count} videos");
            }
            Err(e) => {
                tracing::warn!("reward video refill failed: {e}");
            }
        }
    }

    /// Draws `count` videos from the front of the queue. When the queue is
    /// short it attempts one synchronous forced refill, then falls back to
    /// cycling whatever entries exist. Returns `None` only when there is
    /// nothing at all to draw from.
    pub async fn draw(&self, count: usize) -> Option<Vec<RewardVideo>> {
        if self.len() < count {
            // Forced refill, bypassing the in-flight guard check: the caller
            // needs videos now.
            self.refill_append().await;
        }

        let mut videos = self.videos.lock().unwrap();
        if videos.len() >= count {
            return Some(videos.drain(..count).collect());
        }
        if videos.is_empty() {
            return None;
        }

        // Cycle the remaining entries to reach the requested count.
        let mut drawn: Vec<RewardVideo> = videos.drain(..).collect();
        let mut i = 0;
        while drawn.len() < count {
            let again = drawn[i % drawn.len()].clone();
            drawn.push(again);
            i += 1;
        }
        Some(drawn)
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&self, videos: Vec<RewardVideo>) {
        self.videos.lock().unwrap().extend(videos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use async_trait::async_trait;
    use color_eyre::eyre::eyre;
    use color_eyre::Result;
    use std::sync::atomic::AtomicUsize;

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdVideoProvider for CountingProvider {
        async fn fetch_batch(&self, count: usize) -> Result<Vec<RewardVideo>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(eyre!("provider down"));
            }
            Ok((0..count)
                .map(|i| RewardVideo {
                    id: format!("v{call}-{i}"),
                    embed_url: format!("https://videos.example/{call}/{i}"),
                    platform: Platform::Youtube,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn preload_fills_to_target() {
        let provider = CountingProvider::new(false);
        let queue = RewardVideoQueue::new(provider.clone());
        queue.preload().await;
        assert_eq!(queue.len(), VIDEO_QUEUE_TARGET);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn preload_failure_leaves_queue_empty_without_retry() {
        let provider = CountingProvider::new(true);
        let queue = RewardVideoQueue::new(provider.clone());
        queue.preload().await;
        assert!(queue.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn draining_below_threshold_triggers_one_appending_refill() {
        let provider = CountingProvider::new(false);
        let queue = Arc::new(RewardVideoQueue::new(provider.clone()));
        queue.preload().await;

        // Drain down to the threshold.
        let drawn = queue
            .draw(VIDEO_QUEUE_TARGET - VIDEO_QUEUE_REFILL_THRESHOLD)
            .await
            .unwrap();
        let kept_ids: Vec<String> = drawn.iter().map(|v| v.id.clone()).collect();
        assert_eq!(queue.len(), VIDEO_QUEUE_REFILL_THRESHOLD);

        let handle = queue.refill_if_needed().expect("refill should start");
        // A second trigger while the first is in flight is a no-op.
        assert!(queue.refill_if_needed().is_none());
        handle.await.unwrap();

        assert_eq!(queue.len(), VIDEO_QUEUE_TARGET);
        assert_eq!(provider.calls(), 2, "preload + one refill");
        // Appended, not replaced: the surviving head entry is from the preload.
        let next = queue.draw(1).await.unwrap();
        assert!(!kept_ids.contains(&next[0].id));
        assert!(next[0].id.starts_with("v0-"));
    }

    #[tokio::test]
    async fn refill_not_triggered_above_threshold() {
        let provider = CountingProvider::new(false);
        let queue = Arc::new(RewardVideoQueue::new(provider.clone()));
        queue.preload().await;
        assert!(queue.refill_if_needed().is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn draw_from_empty_queue_forces_refill() {
        let provider = CountingProvider::new(false);
        let queue = RewardVideoQueue::new(provider.clone());
        let drawn = queue.draw(2).await.unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn draw_cycles_entries_when_provider_is_down() {
        let provider = CountingProvider::new(true);
        let queue = RewardVideoQueue::new(provider.clone());
        queue.push_for_test(vec![RewardVideo {
            id: "only".to_string(),
            embed_url: "https://videos.example/only".to_string(),
            platform: Platform::Tiktok,
        }]);

        let drawn = queue.draw(2).await.unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0].id, "only");
        assert_eq!(drawn[1].id, "only");
    }

    #[tokio::test]
    async fn draw_returns_none_when_nothing_available() {
        let provider = CountingProvider::new(true);
        let queue = RewardVideoQueue::new(provider);
        assert!(queue.draw(1).await.is_none());
    }
}
