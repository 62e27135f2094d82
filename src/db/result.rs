use color_eyre::Result;

use super::models::{GameResultRow, TopicStatsRow};
use super::Db;
use crate::models::QuestionAnalytics;
use crate::names::DUPLICATE_RESULT_WINDOW_SECS;

impl Db {
    /// Duplicate-submission guard: an existing result for the same player
    /// with the same score inside the last 10 seconds. A window heuristic,
    /// not a strict idempotency key.
    pub async fn find_recent_duplicate(
        &self,
        user_id: i64,
        correct_answers: i64,
        total_questions: i64,
        now: i64,
    ) -> Result<Option<GameResultRow>> {
        let row = sqlx::query_as::<_, GameResultRow>(
            r#"
            SELECT id, user_id, correct_answers, total_questions, coins_earned,
                   average_response_time, completed_at
            FROM game_results
            WHERE user_id = $1 AND correct_answers = $2 AND total_questions = $3
                  AND completed_at >= $4
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .bind(correct_answers)
        .bind(total_questions)
        .bind(now - DUPLICATE_RESULT_WINDOW_SECS)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn insert_result(
        &self,
        user_id: i64,
        correct_answers: i64,
        total_questions: i64,
        coins_earned: i64,
        average_response_time: f64,
        completed_at: i64,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO game_results
                (user_id, correct_answers, total_questions, coins_earned,
                 average_response_time, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(correct_answers)
        .bind(total_questions)
        .bind(coins_earned)
        .bind(average_response_time)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "result recorded for user={user_id}: {correct_answers}/{total_questions}, {coins_earned} coins"
        );
        Ok(id)
    }

    pub async fn insert_question_analytics(
        &self,
        result_id: i64,
        analytics: &[QuestionAnalytics],
    ) -> Result<()> {
        for entry in analytics {
            sqlx::query(
                r#"
                INSERT INTO question_analytics
                    (result_id, question_id, topic_id, is_correct, response_time_ms)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(result_id)
            .bind(entry.question_id)
            .bind(entry.topic_id)
            .bind(entry.is_correct)
            .bind(entry.response_time_ms)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Atomic increment-on-conflict; safe under concurrent writers.
    pub async fn bump_topic_stats(
        &self,
        user_id: i64,
        topic_id: i64,
        is_correct: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO topic_stats (user_id, topic_id, answered_count, correct_count)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT(user_id, topic_id) DO UPDATE SET
                answered_count = answered_count + 1,
                correct_count = correct_count + excluded.correct_count
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(if is_correct { 1 } else { 0 })
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Submissions recorded since `since`, for the rate limit check.
    pub async fn results_since(&self, user_id: i64, since: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM game_results WHERE user_id = $1 AND completed_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn results_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM game_results WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn analytics_count(&self, result_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM question_analytics WHERE result_id = $1")
                .bind(result_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn get_topic_stats(
        &self,
        user_id: i64,
        topic_id: i64,
    ) -> Result<Option<TopicStatsRow>> {
        let row = sqlx::query_as::<_, TopicStatsRow>(
            r#"
            SELECT topic_id, answered_count, correct_count
            FROM topic_stats
            WHERE user_id = $1 AND topic_id = $2
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
