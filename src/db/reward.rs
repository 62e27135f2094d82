use color_eyre::{eyre::OptionExt, Result};

use super::models::{RewardClaimRow, WalletRow};
use super::Db;

impl Db {
    pub async fn find_reward_claim(&self, session_id: &str) -> Result<Option<RewardClaimRow>> {
        let row = sqlx::query_as::<_, RewardClaimRow>(
            r#"
            SELECT session_id, user_id, event_type, original_reward,
                   coins_delta, lives_delta, claimed_at
            FROM reward_claims
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Records the claim and applies the credit in one transaction. The
    /// primary key on `session_id` makes a racing duplicate fail the insert
    /// instead of crediting twice.
    pub async fn insert_reward_claim(
        &self,
        session_id: &str,
        user_id: i64,
        event_type: &str,
        original_reward: i64,
        coins_delta: i64,
        lives_delta: i64,
        claimed_at: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reward_claims
                (session_id, user_id, event_type, original_reward,
                 coins_delta, lives_delta, claimed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(event_type)
        .bind(original_reward)
        .bind(coins_delta)
        .bind(lives_delta)
        .bind(claimed_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE wallets
            SET coins = coins + $1,
                lives = MIN(lives + $2, lives_max)
            WHERE user_id = $3
            "#,
        )
        .bind(coins_delta)
        .bind(lives_delta)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "reward claim {session_id} settled for user={user_id}: +{coins_delta} coins, +{lives_delta} lives"
        );
        Ok(())
    }

    pub async fn get_wallet(&self, user_id: i64) -> Result<WalletRow> {
        sqlx::query_as::<_, WalletRow>(
            "SELECT lives, lives_max, coins FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_eyre("wallet row missing")
    }

    pub async fn set_wallet(&self, user_id: i64, lives: i64, coins: i64) -> Result<()> {
        sqlx::query("UPDATE wallets SET lives = $1, coins = $2 WHERE user_id = $3")
            .bind(lives)
            .bind(coins)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
