use color_eyre::Result;

use super::models::{DailyLeaderboardRow, GlobalLeaderboardRow};
use super::Db;

impl Db {
    /// Idempotent daily aggregate upsert. Rank computation is left to a
    /// periodic batch job; this only maintains the totals.
    pub async fn upsert_daily_leaderboard(
        &self,
        user_id: i64,
        day: i64,
        coins_earned: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard_daily (user_id, day, coins_earned, games_played)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT(user_id, day) DO UPDATE SET
                coins_earned = coins_earned + excluded.coins_earned,
                games_played = games_played + 1
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(coins_earned)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lifetime total, bumped with an atomic increment-on-conflict.
    pub async fn bump_global_leaderboard(&self, user_id: i64, coins_earned: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard_global (user_id, total_coins, total_games)
            VALUES ($1, $2, 1)
            ON CONFLICT(user_id) DO UPDATE SET
                total_coins = total_coins + excluded.total_coins,
                total_games = total_games + 1
            "#,
        )
        .bind(user_id)
        .bind(coins_earned)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_daily_leaderboard(
        &self,
        user_id: i64,
        day: i64,
    ) -> Result<Option<DailyLeaderboardRow>> {
        let row = sqlx::query_as::<_, DailyLeaderboardRow>(
            "SELECT day, coins_earned, games_played FROM leaderboard_daily WHERE user_id = $1 AND day = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_global_leaderboard(
        &self,
        user_id: i64,
    ) -> Result<Option<GlobalLeaderboardRow>> {
        let row = sqlx::query_as::<_, GlobalLeaderboardRow>(
            "SELECT total_coins, total_games FROM leaderboard_global WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
