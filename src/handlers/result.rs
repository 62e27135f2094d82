// Result settlement endpoint: idempotently persists a completed round and
// feeds the statistics and leaderboard aggregates.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    db,
    extractors::AuthGuard,
    models::QuestionAnalytics,
    names::{self, DEFAULT_COSTS, MAX_AVG_RESPONSE_TIME_MS, ROUND_LENGTH},
    rejections::AppError,
    rejections::ResultExt,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecordResultBody {
    pub category: String,
    pub correct_answers: i64,
    pub total_questions: i64,
    /// Milliseconds.
    pub average_response_time: f64,
    #[serde(default)]
    pub question_analytics: Vec<QuestionAnalytics>,
}

#[derive(Debug, Serialize)]
pub struct RecordResultResponse {
    pub success: bool,
    pub coins_earned: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

pub(crate) async fn record_result(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<RecordResultBody>,
) -> Result<Json<RecordResultResponse>, AppError> {
    validate(&body)?;

    let now = db::now_unix();

    // Window-based duplicate guard: same player, same score, inside the last
    // 10 seconds. Returns the original result without writing anything.
    let duplicate = state
        .db
        .find_recent_duplicate(user.id, body.correct_answers, body.total_questions, now)
        .await
        .reject("could not check for duplicate result")?;

    if let Some(existing) = duplicate {
        tracing::info!(
            "duplicate result for user={} within window, returning cached",
            user.id
        );
        return Ok(Json(RecordResultResponse {
            success: true,
            coins_earned: existing.coins_earned,
            cached: Some(true),
        }));
    }

    let recent = state
        .db
        .results_since(user.id, now - names::RESULT_RATE_WINDOW_SECS)
        .await
        .reject("could not check submission rate")?;
    if recent >= names::RESULT_RATE_LIMIT {
        tracing::warn!("user={} exceeded the result submission rate", user.id);
        return Err(AppError::RateLimited);
    }

    // Informational payout; the player-visible coins were credited
    // incrementally during play.
    let coins_earned = DEFAULT_COSTS.coins_for_round(body.correct_answers);

    let result_id = state
        .db
        .insert_result(
            user.id,
            body.correct_answers,
            body.total_questions,
            coins_earned,
            body.average_response_time,
            now,
        )
        .await
        .reject("could not persist game result")?;

    // Everything below is best-effort: the primary insert stands even if an
    // aggregate update fails.
    if !body.question_analytics.is_empty() {
        if let Err(e) = state
            .db
            .insert_question_analytics(result_id, &body.question_analytics)
            .await
        {
            tracing::warn!("question analytics insert failed for result={result_id}: {e}");
        }

        for entry in &body.question_analytics {
            if let Err(e) = state
                .db
                .bump_topic_stats(user.id, entry.topic_id, entry.is_correct)
                .await
            {
                tracing::warn!(
                    "topic stats update failed for user={} topic={}: {e}",
                    user.id,
                    entry.topic_id
                );
            }
        }
    }

    if let Err(e) = state
        .db
        .upsert_daily_leaderboard(user.id, db::day_of(now), coins_earned)
        .await
    {
        tracing::warn!("daily leaderboard update failed for user={}: {e}", user.id);
    }
    if let Err(e) = state.db.bump_global_leaderboard(user.id, coins_earned).await {
        tracing::warn!("global leaderboard update failed for user={}: {e}", user.id);
    }

    Ok(Json(RecordResultResponse {
        success: true,
        coins_earned,
        cached: None,
    }))
}

fn validate(body: &RecordResultBody) -> Result<(), AppError> {
    if body.category != names::RESULT_CATEGORY {
        return Err(AppError::InvalidInput("unknown category"));
    }
    if body.total_questions != ROUND_LENGTH as i64 {
        return Err(AppError::InvalidInput("total_questions must be 15"));
    }
    if !(0..=ROUND_LENGTH as i64).contains(&body.correct_answers) {
        return Err(AppError::InvalidInput("correct_answers out of range"));
    }
    if !(0.0..=MAX_AVG_RESPONSE_TIME_MS).contains(&body.average_response_time) {
        return Err(AppError::InvalidInput("average_response_time out of range"));
    }
    if body.question_analytics.len() > ROUND_LENGTH {
        return Err(AppError::InvalidInput("too many analytics entries"));
    }
    Ok(())
}
