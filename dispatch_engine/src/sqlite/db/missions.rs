use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::status_list;
use crate::{
    db_types::{Mission, MissionEvent, MissionId, MissionStatus, NewMission, NewMissionEvent},
    helpers::PriceQuote,
    traits::{MissionQueryFilter, MissionSwap, MissionTimestamp, OperatorChange, OperatorGuard},
};

/// Inserts a new mission in `pending_unpublished`, unless the client already has an open mission. Returns `None`
/// in that case.
pub async fn insert_mission(
    mission: NewMission,
    estimate: PriceQuote,
    conn: &mut SqliteConnection,
) -> Result<Option<Mission>, sqlx::Error> {
    let now = Utc::now();
    let distance_km = mission.service_kind.is_towing().then_some(estimate.distance_km);
    let sql = format!(
        r#"
        INSERT INTO missions (
            client_id,
            service_kind,
            status,
            origin_lat,
            origin_lng,
            destination_lat,
            destination_lng,
            zone,
            distance_km,
            estimated_price,
            currency,
            created_at,
            updated_at
        )
        SELECT $1, $2, 'pending_unpublished', $3, $4, $5, $6, $7, $8, $9, $10, $11, $11
        WHERE NOT EXISTS (SELECT 1 FROM missions WHERE client_id = $1 AND status IN ({}))
        RETURNING *;
        "#,
        status_list(&MissionStatus::OPEN)
    );
    let zone = mission.zone.map(|z| z.trim().to_lowercase());
    let mission = sqlx::query_as(sql.as_str())
        .bind(mission.client_id)
        .bind(mission.service_kind)
        .bind(mission.origin.lat)
        .bind(mission.origin.lng)
        .bind(mission.destination.map(|d| d.lat))
        .bind(mission.destination.map(|d| d.lng))
        .bind(zone)
        .bind(distance_km)
        .bind(estimate.price)
        .bind(mission.currency)
        .bind(now)
        .fetch_optional(conn)
        .await?;
    Ok(mission)
}

pub async fn fetch_mission(id: MissionId, conn: &mut SqliteConnection) -> Result<Option<Mission>, sqlx::Error> {
    let mission = sqlx::query_as("SELECT * FROM missions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(mission)
}

/// The compare-and-swap primitive for missions. Returns the updated row, or `None` if the mission did not match the
/// swap's expectations (wrong status, wrong operator, or the operator is busy elsewhere).
///
/// This is a single `UPDATE .. WHERE .. RETURNING` statement, so run it first inside a transaction.
pub async fn swap_mission(swap: &MissionSwap, conn: &mut SqliteConnection) -> Result<Option<Mission>, sqlx::Error> {
    let now = Utc::now();
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE missions SET status = ");
    builder.push_bind(swap.new_status);
    builder.push(", updated_at = ");
    builder.push_bind(now);
    match swap.operator_change {
        OperatorChange::Keep => {},
        OperatorChange::Assign(operator_id) => {
            builder.push(", operator_id = ");
            builder.push_bind(operator_id);
        },
        OperatorChange::Release => {
            builder.push(", operator_id = NULL");
        },
    }
    if let Some(price) = swap.estimated_price {
        builder.push(", estimated_price = ");
        builder.push_bind(price);
        builder.push(", distance_km = ");
        builder.push_bind(swap.distance_km);
    }
    if let Some(price) = swap.final_price {
        builder.push(", final_price = COALESCE(final_price, ");
        builder.push_bind(price);
        builder.push(")");
    }
    if let Some(stamp) = swap.stamp {
        let column = match stamp {
            MissionTimestamp::Published => "published_at",
            MissionTimestamp::Accepted => "accepted_at",
            MissionTimestamp::Finished => "finished_at",
        };
        builder.push(format!(", {column} = "));
        builder.push_bind(now);
    }
    if let Some(reason) = &swap.cancel_reason {
        builder.push(", cancel_reason = ");
        builder.push_bind(reason.clone());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(swap.mission_id);
    builder.push(" AND status = ");
    builder.push_bind(swap.expected_status);
    match swap.operator_guard {
        OperatorGuard::Any => {},
        OperatorGuard::Unassigned => {
            builder.push(" AND operator_id IS NULL");
        },
        OperatorGuard::Is(operator_id) => {
            builder.push(" AND operator_id = ");
            builder.push_bind(operator_id);
        },
        OperatorGuard::UnassignedOr(operator_id) => {
            builder.push(" AND (operator_id IS NULL OR operator_id = ");
            builder.push_bind(operator_id);
            builder.push(")");
        },
    }
    if let Some(operator_id) = swap.require_idle_operator {
        builder.push(" AND NOT EXISTS (SELECT 1 FROM missions busy WHERE busy.operator_id = ");
        builder.push_bind(operator_id);
        builder.push(" AND busy.id <> ");
        builder.push_bind(swap.mission_id);
        builder.push(format!(" AND busy.status IN ({}))", status_list(&MissionStatus::ACTIVE)));
    }
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let mission = builder.build_query_as::<Mission>().fetch_optional(conn).await?;
    Ok(mission)
}

/// Deletes the mission if it is still in `expected_status`.
pub async fn delete_mission(
    id: MissionId,
    expected_status: MissionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Mission>, sqlx::Error> {
    let mission = sqlx::query_as("DELETE FROM missions WHERE id = $1 AND status = $2 RETURNING *")
        .bind(id)
        .bind(expected_status)
        .fetch_optional(conn)
        .await?;
    Ok(mission)
}

pub async fn insert_event(event: NewMissionEvent, conn: &mut SqliteConnection) -> Result<MissionEvent, sqlx::Error> {
    let event = sqlx::query_as(
        r#"
        INSERT INTO mission_events (mission_id, event_type, actor_id, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
        "#,
    )
    .bind(event.mission_id)
    .bind(event.event_type)
    .bind(event.actor_id)
    .bind(event.metadata.to_string())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(event)
}

pub async fn fetch_events(id: MissionId, conn: &mut SqliteConnection) -> Result<Vec<MissionEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM mission_events WHERE mission_id = $1 ORDER BY id ASC")
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(events)
}

/// Fetches missions according to criteria specified in the `MissionQueryFilter`
///
/// Resulting missions are ordered by `created_at` in ascending order
pub async fn search_missions(
    query: MissionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Mission>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM missions ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if !query.statuses.is_empty() {
        where_clause.push(format!("status IN ({})", status_list(&query.statuses)));
    }
    if let Some(client_id) = query.client_id {
        where_clause.push("client_id = ");
        where_clause.push_bind_unseparated(client_id);
    }
    if let Some(operator_id) = query.operator_id {
        where_clause.push("operator_id = ");
        where_clause.push_bind_unseparated(operator_id);
    }
    if let Some(kind) = query.service_kind {
        where_clause.push("service_kind = ");
        where_clause.push_bind_unseparated(kind);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let missions = builder.build_query_as::<Mission>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_missions: {}", missions.len());
    Ok(missions)
}

pub async fn fetch_unassigned_published(conn: &mut SqliteConnection) -> Result<Vec<Mission>, sqlx::Error> {
    let missions = sqlx::query_as(
        "SELECT * FROM missions WHERE status = 'published' AND operator_id IS NULL ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(missions)
}

/// Unassigned published missions whose publication time (or creation time, if never stamped) is before `cutoff`.
pub async fn fetch_stale_published(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Mission>, sqlx::Error> {
    let missions = sqlx::query_as(
        r#"
        SELECT * FROM missions
        WHERE status = 'published' AND operator_id IS NULL AND COALESCE(published_at, created_at) < $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(missions)
}

pub async fn fetch_missions_for_operator(
    operator_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Mission>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM missions WHERE operator_id = $1 AND status IN ({}) ORDER BY created_at ASC, id ASC",
        status_list(&MissionStatus::OPEN)
    );
    let missions = sqlx::query_as(sql.as_str()).bind(operator_id).fetch_all(conn).await?;
    Ok(missions)
}

pub async fn open_mission_for_client(
    client_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Mission>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM missions WHERE client_id = $1 AND status IN ({}) ORDER BY id DESC LIMIT 1",
        status_list(&MissionStatus::OPEN)
    );
    let mission = sqlx::query_as(sql.as_str()).bind(client_id).fetch_optional(conn).await?;
    Ok(mission)
}

/// The active mission held by the operator, ignoring `excluding` if given.
pub async fn active_mission_for_operator(
    operator_id: i64,
    excluding: Option<MissionId>,
    conn: &mut SqliteConnection,
) -> Result<Option<Mission>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM missions WHERE operator_id = $1 AND id <> $2 AND status IN ({}) ORDER BY id DESC LIMIT 1",
        status_list(&MissionStatus::ACTIVE)
    );
    let excluded = excluding.map(|id| id.value()).unwrap_or(-1);
    let mission = sqlx::query_as(sql.as_str()).bind(operator_id).bind(excluded).fetch_optional(conn).await?;
    Ok(mission)
}

pub async fn busy_operator_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let sql = format!(
        "SELECT DISTINCT operator_id FROM missions WHERE operator_id IS NOT NULL AND status IN ({})",
        status_list(&MissionStatus::ACTIVE)
    );
    let ids = sqlx::query_scalar(sql.as_str()).fetch_all(conn).await?;
    Ok(ids)
}
