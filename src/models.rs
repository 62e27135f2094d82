// Shared domain types used by both the client-side engine and the server
// endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub key: String,
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub topic_id: i64,
    pub answers: Vec<Answer>,
}

impl Question {
    /// Slot index of the correct answer, if the question is well-formed.
    pub fn correct_slot(&self) -> Option<usize> {
        self.answers.iter().position(|a| a.correct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Youtube,
    Instagram,
    Facebook,
}

/// An ad video descriptor as issued by the provider. Immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardVideo {
    pub id: String,
    pub embed_url: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardEvent {
    DailyGift,
    /// Older clients send `game_end`; both spellings settle identically.
    #[serde(alias = "game_end")]
    EndGame,
    Refill,
}

impl RewardEvent {
    pub fn required_ads(self) -> usize {
        match self {
            RewardEvent::Refill => crate::names::ADS_FOR_REFILL,
            RewardEvent::DailyGift | RewardEvent::EndGame => crate::names::ADS_FOR_DOUBLE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RewardEvent::DailyGift => "daily_gift",
            RewardEvent::EndGame => "end_game",
            RewardEvent::Refill => "refill",
        }
    }
}

/// Balance snapshot reported by the wallet service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub lives_current: i64,
    pub lives_max: i64,
    pub coins_current: i64,
    /// Unix timestamp of the next life regeneration, if lives are not full.
    pub next_life_at: Option<i64>,
}

/// Per-question analytics attached to a result submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalytics {
    pub question_id: i64,
    pub topic_id: i64,
    pub is_correct: bool,
    pub response_time_ms: i64,
}
