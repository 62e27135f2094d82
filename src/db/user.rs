use color_eyre::Result;
use ulid::Ulid;

use super::models::AuthUser;
use super::Db;

impl Db {
    pub async fn get_user_by_session(&self, session_id: &str) -> Result<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT u.id, u.username
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn create_user(&self, username: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar("INSERT INTO users (username) VALUES ($1) RETURNING id")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        // Every player gets a wallet row; balances start at the defaults.
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!("created user {username} ({id})");
        Ok(id)
    }

    /// Returns the new session token. Token issuance policy lives with the
    /// auth collaborator; this just persists the mapping the guard reads.
    pub async fn create_user_session(&self, user_id: i64) -> Result<String> {
        let token = Ulid::new().to_string();

        sqlx::query("INSERT INTO user_sessions (id, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }
}
