// Database model structs

#[derive(Clone, sqlx::FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

#[derive(sqlx::FromRow)]
pub struct GameResultRow {
    pub id: i64,
    pub user_id: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub coins_earned: i64,
    pub average_response_time: f64,
    pub completed_at: i64,
}

#[derive(sqlx::FromRow)]
pub struct TopicStatsRow {
    pub topic_id: i64,
    pub answered_count: i64,
    pub correct_count: i64,
}

#[derive(sqlx::FromRow)]
pub struct DailyLeaderboardRow {
    pub day: i64,
    pub coins_earned: i64,
    pub games_played: i64,
}

#[derive(sqlx::FromRow)]
pub struct GlobalLeaderboardRow {
    pub total_coins: i64,
    pub total_games: i64,
}

#[derive(sqlx::FromRow)]
pub struct RewardClaimRow {
    pub session_id: String,
    pub user_id: i64,
    pub event_type: String,
    pub original_reward: i64,
    pub coins_delta: i64,
    pub lives_delta: i64,
    pub claimed_at: i64,
}

#[derive(sqlx::FromRow)]
pub struct WalletRow {
    pub lives: i64,
    pub lives_max: i64,
    pub coins: i64,
}
