use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::PushToken;

/// Stores the token for the user. A token that is already known is re-pointed at this user, since devices change
/// hands when people log in and out.
pub async fn upsert_token(
    user_id: i64,
    token: &str,
    platform: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PushToken, sqlx::Error> {
    let token = sqlx::query_as(
        r#"
        INSERT INTO push_tokens (user_id, token, platform, created_at) VALUES ($1, $2, $3, $4)
        ON CONFLICT (token) DO UPDATE SET user_id = excluded.user_id, platform = excluded.platform
        RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(platform)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(token)
}

pub async fn fetch_tokens(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PushToken>, sqlx::Error> {
    let tokens = sqlx::query_as("SELECT * FROM push_tokens WHERE user_id = $1 ORDER BY id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(tokens)
}

pub async fn delete_tokens(tokens: &[String], conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    if tokens.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM push_tokens WHERE token IN (");
    let mut list = builder.separated(", ");
    for token in tokens {
        list.push_bind(token.clone());
    }
    list.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
