// Ports for the external collaborators the engine depends on. The game
// engine is injected with trait objects so tests can swap in mocks and the
// real application can wire up its HTTP clients.

use async_trait::async_trait;
use color_eyre::Result;
use serde::{Deserialize, Serialize};

use thiserror::Error;

use crate::models::{Question, QuestionAnalytics, RewardEvent, RewardVideo, WalletSnapshot};

/// Marker error a collaborator embeds when the player's auth session is no
/// longer valid. The engine downcasts for it to redirect to login.
#[derive(Debug, Error)]
#[error("player session expired")]
pub struct AuthExpired;

pub const WALLET_CHANGED_TOPIC: &str = "wallet_changed";

/// Spends and credits the player's scarce resources. Balance serialization
/// under concurrent mutation is the wallet's own responsibility.
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Returns false when the player has no life to spend.
    async fn spend_life(&self) -> Result<bool>;

    async fn credit_lives(&self, delta: i64, source: &str, idempotency_key: &str) -> Result<()>;

    async fn fetch_wallet(&self) -> Result<WalletSnapshot>;

    /// Returns false when the balance is insufficient; nothing is deducted.
    async fn spend_coins(&self, amount: i64) -> Result<bool>;

    /// Cross-tab / cross-component sync signal. Fire-and-forget.
    fn broadcast(&self, topic: &str, payload: serde_json::Value);
}

#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Fetches a full round of questions tagged with the player's current UI
    /// language.
    async fn fetch_round(&self, language: &str) -> Result<Vec<Question>>;
}

#[async_trait]
pub trait AdVideoProvider: Send + Sync {
    /// May return fewer videos than requested, or none.
    async fn fetch_batch(&self, count: usize) -> Result<Vec<RewardVideo>>;
}

/// Best-effort per-round bookkeeping that accompanies a round start. Failures
/// here are logged and never block the round.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn reset_helpers(&self) -> Result<()>;

    async fn credit_start_reward(&self) -> Result<()>;

    async fn refresh(&self) -> Result<()>;
}

/// A completed round as submitted to the result settlement endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub correct_answers: i64,
    pub total_questions: i64,
    pub average_response_time_ms: f64,
    pub analytics: Vec<QuestionAnalytics>,
}

/// Client for the result settlement endpoint.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record_round(&self, outcome: &RoundOutcome) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    pub reward_session_id: String,
    pub watched_video_ids: Vec<String>,
    pub event_type: RewardEvent,
    pub original_reward: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RewardDelta {
    pub coins_delta: i64,
    pub lives_delta: i64,
}

/// Client for the reward settlement endpoint. The engine calls this exactly
/// once per reward session.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    async fn settle(&self, claim: &RewardClaim) -> Result<RewardDelta>;
}
