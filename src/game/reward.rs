// The resumable "watch an ad to double/refill" flow. A reward session is
// created instantly from the local video queue and settled exactly once
// against the backend.

use std::sync::{Arc, Mutex};

use ulid::Ulid;

use crate::game::error::GameError;
use crate::game::queue::RewardVideoQueue;
use crate::models::{RewardEvent, RewardVideo};
use crate::services::{RewardClaim, RewardDelta, SettlementClient, WalletService};
use crate::services::WALLET_CHANGED_TOPIC;

/// Ephemeral single-use token binding a queue slice to a reward event.
#[derive(Debug, Clone)]
pub struct RewardSession {
    pub id: String,
    pub event_type: RewardEvent,
    pub videos: Vec<RewardVideo>,
    pub original_reward: i64,
    pub required_ads: usize,
}

pub struct RewardFlow {
    queue: Arc<RewardVideoQueue>,
    settlement: Arc<dyn SettlementClient>,
    wallet: Arc<dyn WalletService>,
    active: Mutex<Option<RewardSession>>,
}

impl RewardFlow {
    pub fn new(
        queue: Arc<RewardVideoQueue>,
        settlement: Arc<dyn SettlementClient>,
        wallet: Arc<dyn WalletService>,
    ) -> Self {
        Self {
            queue,
            settlement,
            wallet,
            active: Mutex::new(None),
        }
    }

    pub fn active_session(&self) -> Option<RewardSession> {
        self.active.lock().unwrap().clone()
    }

    /// Creates a session from the local queue without a backend round-trip.
    /// Only one session may be active at a time; enforcing that is the
    /// caller's job, and a new session here replaces any leftover one.
    pub async fn start_session(
        &self,
        event_type: RewardEvent,
        original_reward: i64,
    ) -> Result<RewardSession, GameError> {
        let required_ads = event_type.required_ads();
        let videos = self
            .queue
            .draw(required_ads)
            .await
            .ok_or(GameError::RewardUnavailable)?;

        let session = RewardSession {
            id: Ulid::new().to_string(),
            event_type,
            videos,
            original_reward,
            required_ads,
        };

        tracing::info!(
            "reward session {} started for {} ({} ads)",
            session.id,
            event_type.as_str(),
            required_ads
        );
        *self.active.lock().unwrap() = Some(session.clone());

        // Top the queue back up in the background; the draw above must never
        // wait on the provider.
        let _ = self.queue.refill_if_needed();

        Ok(session)
    }

    /// Settles the active session against the backend. The local session is
    /// cleared whether settlement succeeds or fails, so a failed claim never
    /// leaves a stuck pending state and can never be retried.
    pub async fn complete_session(
        &self,
        watched_video_ids: Vec<String>,
    ) -> Result<RewardDelta, GameError> {
        let session = self
            .active
            .lock()
            .unwrap()
            .take()
            .ok_or(GameError::RewardUnavailable)?;

        let claim = RewardClaim {
            reward_session_id: session.id.clone(),
            watched_video_ids,
            event_type: session.event_type,
            original_reward: session.original_reward,
        };

        match self.settlement.settle(&claim).await {
            Ok(delta) => {
                tracing::info!(
                    "reward session {} settled: +{} coins, +{} lives",
                    session.id,
                    delta.coins_delta,
                    delta.lives_delta
                );
                // Force-refresh so the UI reflects the credit immediately.
                if let Err(e) = self.wallet.fetch_wallet().await {
                    tracing::warn!("wallet refresh after settlement failed: {e}");
                }
                self.wallet.broadcast(
                    WALLET_CHANGED_TOPIC,
                    serde_json::json!({ "source": "reward_settlement" }),
                );
                Ok(delta)
            }
            Err(e) => {
                tracing::warn!("reward session {} settlement failed: {e}", session.id);
                Err(GameError::SettlementFailed)
            }
        }
    }

    /// Explicit cancel; the session's videos are not returned to the queue.
    pub fn cancel_session(&self) {
        if let Some(session) = self.active.lock().unwrap().take() {
            tracing::info!("reward session {} cancelled", session.id);
        }
    }
}
