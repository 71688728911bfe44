use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Amount, MissionId, SettlementSnapshot, SettlementTransaction};

/// Opens a pending transaction for the mission. Returns `None` if the mission already has one (the
/// `mission_id` column is unique).
pub async fn insert_pending(
    mission_id: MissionId,
    snapshot: &SettlementSnapshot,
    client_confirmed: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<SettlementTransaction>, sqlx::Error> {
    let now = Utc::now();
    let tx = sqlx::query_as(
        r#"
        INSERT INTO transactions (
            operator_id,
            mission_id,
            amount,
            currency,
            commission_percent,
            status,
            client_confirmed_at,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $7)
        ON CONFLICT (mission_id) DO NOTHING
        RETURNING *;
        "#,
    )
    .bind(snapshot.operator_id)
    .bind(mission_id)
    .bind(snapshot.amount)
    .bind(snapshot.currency.as_str())
    .bind(snapshot.commission_percent)
    .bind(client_confirmed.then_some(now))
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Records the client's payment confirmation on a pending transaction. The first confirmation time is kept.
pub async fn mark_client_confirmed(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SettlementTransaction>, sqlx::Error> {
    let now = Utc::now();
    let tx = sqlx::query_as(
        r#"
        UPDATE transactions SET client_confirmed_at = COALESCE(client_confirmed_at, $1), updated_at = $1
        WHERE id = $2 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

pub async fn fetch_transaction(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SettlementTransaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

pub async fn fetch_for_mission(
    mission_id: MissionId,
    conn: &mut SqliteConnection,
) -> Result<Option<SettlementTransaction>, sqlx::Error> {
    let tx =
        sqlx::query_as("SELECT * FROM transactions WHERE mission_id = $1").bind(mission_id).fetch_optional(conn).await?;
    Ok(tx)
}

pub async fn fetch_for_operator(
    operator_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SettlementTransaction>, sqlx::Error> {
    let txs = sqlx::query_as("SELECT * FROM transactions WHERE operator_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(operator_id)
        .fetch_all(conn)
        .await?;
    Ok(txs)
}

/// The conditional half of confirmation: flips a pending transaction to confirmed. Returns `None` if the transaction
/// is missing or no longer pending.
pub async fn mark_confirmed(
    id: i64,
    confirmed_by: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SettlementTransaction>, sqlx::Error> {
    let now = Utc::now();
    let tx = sqlx::query_as(
        r#"
        UPDATE transactions SET status = 'confirmed', confirmed_at = $1, confirmed_by = $2, updated_at = $1
        WHERE id = $3 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(now)
    .bind(confirmed_by)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

pub async fn store_split(
    id: i64,
    commission: Amount,
    net: Amount,
    conn: &mut SqliteConnection,
) -> Result<SettlementTransaction, sqlx::Error> {
    let tx = sqlx::query_as("UPDATE transactions SET commission_amount = $1, net_amount = $2 WHERE id = $3 RETURNING *")
        .bind(commission)
        .bind(net)
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(tx)
}

/// Sum of the net amounts of every confirmed transaction for the operator.
pub async fn confirmed_net(operator_id: i64, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(net_amount), 0) FROM transactions WHERE operator_id = $1 AND status = 'confirmed'",
    )
    .bind(operator_id)
    .fetch_one(conn)
    .await?;
    Ok(Amount::from(total))
}
