// Reward settlement endpoint: the single call that finalizes a "watch ads"
// claim. Keyed by the client-generated session id, so a duplicate claim
// returns the recorded payout without crediting twice.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    db,
    extractors::AuthGuard,
    models::RewardEvent,
    rejections::{AppError, ResultExt},
    services::RewardDelta,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SettleRewardBody {
    pub reward_session_id: String,
    pub watched_video_ids: Vec<String>,
    pub event_type: RewardEvent,
    pub original_reward: i64,
}

#[derive(Debug, Serialize)]
pub struct SettleRewardResponse {
    pub success: bool,
    pub reward: RewardDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

pub(crate) async fn settle_reward(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<SettleRewardBody>,
) -> Result<Json<SettleRewardResponse>, AppError> {
    if body.reward_session_id.is_empty() {
        return Err(AppError::InvalidInput("missing reward session id"));
    }
    if body.original_reward < 0 {
        return Err(AppError::InvalidInput("negative original reward"));
    }
    if body.watched_video_ids.len() < body.event_type.required_ads() {
        return Err(AppError::InvalidInput("not enough ads watched"));
    }

    // At-most-once: a session id that was already settled returns the payout
    // recorded at claim time and performs no further writes.
    let existing = state
        .db
        .find_reward_claim(&body.reward_session_id)
        .await
        .reject("could not check reward claim")?;

    if let Some(claim) = existing {
        if claim.user_id != user.id {
            return Err(AppError::Unauthorized);
        }
        return Ok(Json(SettleRewardResponse {
            success: true,
            reward: RewardDelta {
                coins_delta: claim.coins_delta,
                lives_delta: claim.lives_delta,
            },
            cached: Some(true),
        }));
    }

    let delta = match body.event_type {
        // Doubling: the original reward was already credited during play, so
        // the settlement adds the same amount again.
        RewardEvent::DailyGift | RewardEvent::EndGame => RewardDelta {
            coins_delta: body.original_reward,
            lives_delta: 0,
        },
        RewardEvent::Refill => {
            let wallet = state
                .db
                .get_wallet(user.id)
                .await
                .reject("could not load wallet")?;
            RewardDelta {
                coins_delta: 0,
                lives_delta: (wallet.lives_max - wallet.lives).max(0),
            }
        }
    };

    state
        .db
        .insert_reward_claim(
            &body.reward_session_id,
            user.id,
            body.event_type.as_str(),
            body.original_reward,
            delta.coins_delta,
            delta.lives_delta,
            db::now_unix(),
        )
        .await
        .reject("could not settle reward claim")?;

    Ok(Json(SettleRewardResponse {
        success: true,
        reward: delta,
        cached: None,
    }))
}
