use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{split_zones, Amount, NewOperator, OperatorFlags, OperatorProfile},
    helpers::GeoPoint,
};

/// Creates the operator profile if it does not exist yet. Returns `true` in the second parameter if a new profile was
/// created.
pub async fn idempotent_insert(
    operator: NewOperator,
    conn: &mut SqliteConnection,
) -> Result<(OperatorProfile, bool), sqlx::Error> {
    let now = Utc::now();
    let zones = split_zones(&operator.zones.join(",")).join(",");
    let inserted: Option<OperatorProfile> = sqlx::query_as(
        r#"
        INSERT INTO operators (user_id, lat, lng, zones, internal, location_updated_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *;
        "#,
    )
    .bind(operator.user_id)
    .bind(operator.position.map(|p| p.lat))
    .bind(operator.position.map(|p| p.lng))
    .bind(zones)
    .bind(operator.internal)
    .bind(operator.position.map(|_| now))
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(profile) => {
            debug!("🗃️ Operator profile {} created", profile.user_id);
            Ok((profile, true))
        },
        None => {
            let existing = fetch_operator(operator.user_id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_operator(
    operator_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OperatorProfile>, sqlx::Error> {
    let profile =
        sqlx::query_as("SELECT * FROM operators WHERE user_id = $1").bind(operator_id).fetch_optional(conn).await?;
    Ok(profile)
}

pub async fn update_location(
    operator_id: i64,
    position: GeoPoint,
    conn: &mut SqliteConnection,
) -> Result<Option<OperatorProfile>, sqlx::Error> {
    let now = Utc::now();
    let profile = sqlx::query_as(
        r#"
        UPDATE operators SET lat = $1, lng = $2, location_updated_at = $3, updated_at = $3
        WHERE user_id = $4
        RETURNING *;
        "#,
    )
    .bind(position.lat)
    .bind(position.lng)
    .bind(now)
    .bind(operator_id)
    .fetch_optional(conn)
    .await?;
    Ok(profile)
}

pub async fn update_flags(
    operator_id: i64,
    flags: OperatorFlags,
    conn: &mut SqliteConnection,
) -> Result<Option<OperatorProfile>, sqlx::Error> {
    if flags.is_empty() {
        debug!("🗃️ No flags to update for operator {operator_id}. Update skipped.");
        return fetch_operator(operator_id, conn).await;
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE operators SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(available) = flags.available {
        builder.push(", available = ");
        builder.push_bind(available);
    }
    if let Some(internal) = flags.internal {
        builder.push(", internal = ");
        builder.push_bind(internal);
    }
    if let Some(alerts) = flags.alerts_enabled {
        builder.push(", alerts_enabled = ");
        builder.push_bind(alerts);
    }
    if let Some(zones) = flags.zones {
        builder.push(", zones = ");
        builder.push_bind(split_zones(&zones.join(",")).join(","));
    }
    builder.push(" WHERE user_id = ");
    builder.push_bind(operator_id);
    builder.push(" RETURNING *");
    let profile = builder.build_query_as::<OperatorProfile>().fetch_optional(conn).await?;
    Ok(profile)
}

pub async fn fetch_external_available(conn: &mut SqliteConnection) -> Result<Vec<OperatorProfile>, sqlx::Error> {
    let operators = sqlx::query_as("SELECT * FROM operators WHERE internal = 0 AND available = 1 ORDER BY user_id")
        .fetch_all(conn)
        .await?;
    Ok(operators)
}

pub async fn fetch_alertable(conn: &mut SqliteConnection) -> Result<Vec<OperatorProfile>, sqlx::Error> {
    let operators = sqlx::query_as(
        "SELECT * FROM operators WHERE internal = 0 AND available = 1 AND alerts_enabled = 1 ORDER BY user_id",
    )
    .fetch_all(conn)
    .await?;
    Ok(operators)
}

/// Adds `delta` to the operator's pending balance. The result is never allowed to drop below zero.
pub async fn adjust_pending_balance(
    operator_id: i64,
    delta: Amount,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE operators SET pending_balance = MAX(pending_balance + $1, 0), updated_at = $2 WHERE user_id = $3",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(operator_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Moves `net` from pending into the spendable balance. The pending side is floored at zero.
pub async fn credit_balance(operator_id: i64, net: Amount, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE operators SET
            balance = balance + $1,
            pending_balance = MAX(pending_balance - $1, 0),
            updated_at = $2
        WHERE user_id = $3
        "#,
    )
    .bind(net)
    .bind(Utc::now())
    .bind(operator_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Takes a paid-out withdrawal off the operator's balance. Nothing changes if the balance does not cover it.
///
/// Returns the number of rows updated (0 or 1).
pub async fn debit_balance(operator_id: i64, amount: Amount, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE operators SET balance = balance - $1, updated_at = $2 WHERE user_id = $3 AND balance >= $1")
            .bind(amount)
            .bind(Utc::now())
            .bind(operator_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}
