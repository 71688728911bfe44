use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Amount, NewWithdrawal, Withdrawal, WithdrawalStatus};

/// Inserts the withdrawal only if the requested amount does not exceed
/// `sum(confirmed net) - sum(approved withdrawals)` for the operator. The balance check and the insert are a single
/// statement, so concurrent requests cannot both pass the check against the same balance snapshot.
///
/// Returns `None` if the balance check failed.
pub async fn insert_if_covered(
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let result = sqlx::query_as(
        r#"
        INSERT INTO withdrawals (operator_id, amount, currency, method, phone, status, created_at)
        SELECT $1, $2, $3, $4, $5, 'pending', $6
        WHERE $2 <= (
            SELECT COALESCE(SUM(net_amount), 0) FROM transactions WHERE operator_id = $1 AND status = 'confirmed'
        ) - (
            SELECT COALESCE(SUM(amount), 0) FROM withdrawals WHERE operator_id = $1 AND status = 'approved'
        )
        RETURNING *;
        "#,
    )
    .bind(withdrawal.operator_id)
    .bind(withdrawal.amount)
    .bind(withdrawal.currency)
    .bind(withdrawal.method)
    .bind(withdrawal.phone)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Withdrawal insert result: {result:?}");
    Ok(result)
}

/// Approves a pending withdrawal, but only while its amount is still covered by
/// `sum(confirmed net) - sum(approved withdrawals)`. Other pending requests hold no funds, so two of them can each
/// cover the full balance at request time. Only the first approval passes.
///
/// Returns `None` if the withdrawal is missing, already processed, or no longer covered.
pub async fn approve_if_covered(
    id: i64,
    processed_by: i64,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let withdrawal = sqlx::query_as(
        r#"
        UPDATE withdrawals SET status = 'approved', processed_by = $1, processed_at = $2, note = $3
        WHERE id = $4 AND status = 'pending' AND amount <= (
            SELECT COALESCE(SUM(t.net_amount), 0) FROM transactions t
            WHERE t.operator_id = withdrawals.operator_id AND t.status = 'confirmed'
        ) - (
            SELECT COALESCE(SUM(w.amount), 0) FROM withdrawals w
            WHERE w.operator_id = withdrawals.operator_id AND w.status = 'approved'
        )
        RETURNING *;
        "#,
    )
    .bind(processed_by)
    .bind(Utc::now())
    .bind(note)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(withdrawal)
}

/// Moves a pending withdrawal to `status`. Returns `None` if it is missing or was already processed.
pub async fn mark_processed(
    id: i64,
    status: WithdrawalStatus,
    processed_by: i64,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let withdrawal = sqlx::query_as(
        r#"
        UPDATE withdrawals SET status = $1, processed_by = $2, processed_at = $3, note = $4
        WHERE id = $5 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(status)
    .bind(processed_by)
    .bind(Utc::now())
    .bind(note)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(withdrawal)
}

pub async fn fetch_withdrawal(id: i64, conn: &mut SqliteConnection) -> Result<Option<Withdrawal>, sqlx::Error> {
    let withdrawal = sqlx::query_as("SELECT * FROM withdrawals WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(withdrawal)
}

pub async fn fetch_for_operator(operator_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals =
        sqlx::query_as("SELECT * FROM withdrawals WHERE operator_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(operator_id)
            .fetch_all(conn)
            .await?;
    Ok(withdrawals)
}

pub async fn approved_total(operator_id: i64, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM withdrawals WHERE operator_id = $1 AND status = 'approved'",
    )
    .bind(operator_id)
    .fetch_one(conn)
    .await?;
    Ok(Amount::from(total))
}
