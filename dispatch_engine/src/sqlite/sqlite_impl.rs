//! `SqliteDatabase` is a concrete implementation of a dispatch engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every multi-statement operation runs inside a single SQLite transaction, with the conditional write
//! issued first.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::{
    db::{db_url, missions, new_pool, operators, push_tokens, settings, transactions, withdrawals},
    SCHEMA_VERSION,
};
use crate::{
    db_types::{
        commission_split,
        Amount,
        LedgerSummary,
        Mission,
        MissionEvent,
        MissionEventType,
        MissionId,
        MissionStatus,
        NewMission,
        NewMissionEvent,
        NewOperator,
        NewWithdrawal,
        OperatorFlags,
        OperatorProfile,
        PushToken,
        SettlementSnapshot,
        SettlementTransaction,
        Withdrawal,
        WithdrawalDecision,
        WithdrawalStatus,
    },
    helpers::{GeoPoint, PriceQuote},
    traits::{
        BusinessRule,
        DispatchDatabase,
        DispatchError,
        LedgerManagement,
        MissionManagement,
        MissionQueryFilter,
        MissionSwap,
        MissionSwapped,
        OperatorManagement,
        PushTokenStore,
        SettingsStore,
        SettlementOpened,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl DispatchDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn check_schema_version(&self) -> Result<i64, DispatchError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_descriptor LIMIT 1").fetch_optional(&self.pool).await?;
        match version {
            Some(v) if v == SCHEMA_VERSION => {
                debug!("🗃️ Database schema version {v} matches this build");
                Ok(v)
            },
            Some(v) => Err(DispatchError::DatabaseError(format!(
                "Database schema version is {v}, but this build requires version {SCHEMA_VERSION}"
            ))),
            None => Err(DispatchError::DatabaseError("The database schema descriptor is empty".to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), DispatchError> {
        self.pool.close().await;
        Ok(())
    }
}

impl MissionManagement for SqliteDatabase {
    async fn insert_mission(&self, mission: NewMission, estimate: PriceQuote) -> Result<Mission, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let client_id = mission.client_id;
        let Some(mission) = missions::insert_mission(mission, estimate, &mut tx).await? else {
            let open = missions::open_mission_for_client(client_id, &mut tx).await?;
            tx.rollback().await?;
            let rule = match open {
                Some(m) => BusinessRule::ClientHasOpenMission(m.id),
                None => BusinessRule::ClientHasOpenMissionUnknown,
            };
            return Err(rule.into());
        };
        let event = NewMissionEvent::new(mission.id, MissionEventType::Created).by(client_id);
        missions::insert_event(event, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Mission {} has been saved in the DB for client {client_id}", mission.id);
        Ok(mission)
    }

    async fn fetch_mission(&self, id: MissionId) -> Result<Option<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let mission = missions::fetch_mission(id, &mut conn).await?;
        Ok(mission)
    }

    async fn swap_mission(&self, swap: MissionSwap) -> Result<Option<MissionSwapped>, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let Some(mission) = missions::swap_mission(&swap, &mut tx).await? else {
            if let Some(operator_id) = swap.require_idle_operator {
                let busy = missions::active_mission_for_operator(operator_id, Some(swap.mission_id), &mut tx).await?;
                if let Some(busy) = busy {
                    tx.rollback().await?;
                    let id = swap.mission_id;
                    debug!("🗃️ Swap on {id} rejected. Operator {operator_id} is busy with {}", busy.id);
                    return Err(BusinessRule::OperatorBusy(busy.id).into());
                }
            }
            tx.rollback().await?;
            trace!("🗃️ Swap on {} from {} matched zero rows", swap.mission_id, swap.expected_status);
            return Ok(None);
        };
        missions::insert_event(swap.event, &mut tx).await?;
        let transaction = match swap.open_settlement {
            Some(snapshot) => {
                let opened = transactions::insert_pending(mission.id, &snapshot, false, &mut tx).await?;
                if opened.is_some() {
                    operators::adjust_pending_balance(snapshot.operator_id, snapshot.expected_net(), &mut tx).await?;
                }
                opened
            },
            None => None,
        };
        tx.commit().await?;
        let swapped = MissionSwapped { old_status: swap.expected_status, mission, transaction };
        debug!("🗃️ {swapped}");
        Ok(Some(swapped))
    }

    async fn delete_mission(
        &self,
        id: MissionId,
        expected_status: MissionStatus,
        event: NewMissionEvent,
    ) -> Result<Option<Mission>, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let deleted = missions::delete_mission(id, expected_status, &mut tx).await?;
        if deleted.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }
        missions::insert_event(event, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Mission {id} deleted");
        Ok(deleted)
    }

    async fn append_mission_event(&self, event: NewMissionEvent) -> Result<MissionEvent, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let event = missions::insert_event(event, &mut conn).await?;
        Ok(event)
    }

    async fn fetch_mission_events(&self, id: MissionId) -> Result<Vec<MissionEvent>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let events = missions::fetch_events(id, &mut conn).await?;
        Ok(events)
    }

    async fn search_missions(&self, query: MissionQueryFilter) -> Result<Vec<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let missions = missions::search_missions(query, &mut conn).await?;
        Ok(missions)
    }

    async fn fetch_unassigned_published(&self) -> Result<Vec<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let missions = missions::fetch_unassigned_published(&mut conn).await?;
        Ok(missions)
    }

    async fn fetch_stale_published(&self, cutoff: DateTime<Utc>) -> Result<Vec<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let missions = missions::fetch_stale_published(cutoff, &mut conn).await?;
        Ok(missions)
    }

    async fn fetch_missions_for_operator(&self, operator_id: i64) -> Result<Vec<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let missions = missions::fetch_missions_for_operator(operator_id, &mut conn).await?;
        Ok(missions)
    }

    async fn active_mission_for_client(&self, client_id: i64) -> Result<Option<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let mission = missions::open_mission_for_client(client_id, &mut conn).await?;
        Ok(mission)
    }

    async fn active_mission_for_operator(&self, operator_id: i64) -> Result<Option<Mission>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let mission = missions::active_mission_for_operator(operator_id, None, &mut conn).await?;
        Ok(mission)
    }

    async fn busy_operator_ids(&self) -> Result<Vec<i64>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let ids = missions::busy_operator_ids(&mut conn).await?;
        Ok(ids)
    }
}

impl OperatorManagement for SqliteDatabase {
    async fn upsert_operator(&self, operator: NewOperator) -> Result<OperatorProfile, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let (profile, _) = operators::idempotent_insert(operator, &mut conn).await?;
        Ok(profile)
    }

    async fn fetch_operator(&self, operator_id: i64) -> Result<Option<OperatorProfile>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let profile = operators::fetch_operator(operator_id, &mut conn).await?;
        Ok(profile)
    }

    async fn update_operator_location(
        &self,
        operator_id: i64,
        position: GeoPoint,
    ) -> Result<OperatorProfile, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        operators::update_location(operator_id, position, &mut conn)
            .await?
            .ok_or(DispatchError::OperatorNotFound(operator_id))
    }

    async fn update_operator_flags(
        &self,
        operator_id: i64,
        flags: OperatorFlags,
    ) -> Result<OperatorProfile, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        operators::update_flags(operator_id, flags, &mut conn)
            .await?
            .ok_or(DispatchError::OperatorNotFound(operator_id))
    }

    async fn fetch_external_available_operators(&self) -> Result<Vec<OperatorProfile>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let operators = operators::fetch_external_available(&mut conn).await?;
        Ok(operators)
    }

    async fn fetch_alertable_operators(&self) -> Result<Vec<OperatorProfile>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let operators = operators::fetch_alertable(&mut conn).await?;
        Ok(operators)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn open_settlement(
        &self,
        mission_id: MissionId,
        snapshot: SettlementSnapshot,
        client_confirmed: bool,
    ) -> Result<SettlementOpened, DispatchError> {
        let mut tx = self.pool.begin().await?;
        if let Some(transaction) = transactions::insert_pending(mission_id, &snapshot, client_confirmed, &mut tx).await?
        {
            operators::adjust_pending_balance(snapshot.operator_id, snapshot.expected_net(), &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Settlement transaction {} opened for mission {mission_id}", transaction.id);
            return Ok(SettlementOpened { transaction, created: true });
        }
        let existing = transactions::fetch_for_mission(mission_id, &mut tx)
            .await?
            .ok_or_else(|| DispatchError::DatabaseError(format!("Transaction for mission {mission_id} vanished")))?;
        let transaction = match (client_confirmed, existing.is_confirmed()) {
            (true, false) => transactions::mark_client_confirmed(existing.id, &mut tx).await?.unwrap_or(existing),
            _ => existing,
        };
        tx.commit().await?;
        Ok(SettlementOpened { transaction, created: false })
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<SettlementTransaction>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_transaction_for_mission(
        &self,
        mission_id: MissionId,
    ) -> Result<Option<SettlementTransaction>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_for_mission(mission_id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_transactions_for_operator(
        &self,
        operator_id: i64,
    ) -> Result<Vec<SettlementTransaction>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let txs = transactions::fetch_for_operator(operator_id, &mut conn).await?;
        Ok(txs)
    }

    /// In a single atomic transaction:
    /// * flips the transaction from `pending` to `confirmed`. If it was not pending, nothing else happens.
    /// * computes the commission split from the snapshotted percentage and stores it.
    /// * credits the operator's balance with the net amount and takes it off the pending balance.
    async fn confirm_transaction(&self, id: i64, confirmed_by: i64) -> Result<SettlementTransaction, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let Some(confirmed) = transactions::mark_confirmed(id, confirmed_by, &mut tx).await? else {
            let existing = transactions::fetch_transaction(id, &mut tx).await?;
            tx.rollback().await?;
            return match existing {
                None => Err(DispatchError::TransactionNotFound(id)),
                Some(t) => Err(DispatchError::AlreadySettled(format!(
                    "Transaction {id} for mission {} is already {}",
                    t.mission_id, t.status
                ))),
            };
        };
        let (commission, net) = commission_split(confirmed.amount, confirmed.commission_percent);
        let confirmed = transactions::store_split(id, commission, net, &mut tx).await?;
        let credited = operators::credit_balance(confirmed.operator_id, net, &mut tx).await?;
        if credited == 0 {
            tx.rollback().await?;
            return Err(DispatchError::OperatorNotFound(confirmed.operator_id));
        }
        tx.commit().await?;
        debug!("🗃️ Transaction {id} confirmed. {net} credited to operator {}", confirmed.operator_id);
        Ok(confirmed)
    }

    async fn request_withdrawal(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let operator_id = withdrawal.operator_id;
        let requested = withdrawal.amount;
        match withdrawals::insert_if_covered(withdrawal, &mut conn).await? {
            Some(w) => {
                debug!("🗃️ Withdrawal {} of {requested} recorded for operator {operator_id}", w.id);
                Ok(w)
            },
            None => {
                let available = withdrawable(operator_id, &mut conn).await?;
                Err(BusinessRule::InsufficientBalance { requested: requested.value(), available: available.value() }
                    .into())
            },
        }
    }

    async fn process_withdrawal(
        &self,
        id: i64,
        decision: WithdrawalDecision,
        processed_by: i64,
        note: Option<String>,
    ) -> Result<Withdrawal, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let processed = match decision {
            WithdrawalDecision::Approve => withdrawals::approve_if_covered(id, processed_by, note, &mut tx).await?,
            WithdrawalDecision::Reject => {
                withdrawals::mark_processed(id, decision.status(), processed_by, note, &mut tx).await?
            },
        };
        let Some(withdrawal) = processed else {
            let existing = withdrawals::fetch_withdrawal(id, &mut tx).await?;
            let result = match existing {
                None => Err(DispatchError::WithdrawalNotFound(id)),
                Some(w) if w.status == WithdrawalStatus::Pending => {
                    let available = withdrawable(w.operator_id, &mut tx).await?;
                    Err(BusinessRule::InsufficientBalance { requested: w.amount.value(), available: available.value() }
                        .into())
                },
                Some(w) => Err(DispatchError::Conflict(format!("Withdrawal {id} was already {}", w.status))),
            };
            tx.rollback().await?;
            return result;
        };
        if decision == WithdrawalDecision::Approve {
            let debited = operators::debit_balance(withdrawal.operator_id, withdrawal.amount, &mut tx).await?;
            if debited == 0 {
                let profile = operators::fetch_operator(withdrawal.operator_id, &mut tx).await?;
                tx.rollback().await?;
                let balance = profile.map(|p| p.balance).unwrap_or_default();
                return Err(BusinessRule::InsufficientBalance {
                    requested: withdrawal.amount.value(),
                    available: balance.value(),
                }
                .into());
            }
        }
        tx.commit().await?;
        debug!("🗃️ Withdrawal {id} is now {}", withdrawal.status);
        Ok(withdrawal)
    }

    async fn fetch_withdrawal(&self, id: i64) -> Result<Option<Withdrawal>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawal = withdrawals::fetch_withdrawal(id, &mut conn).await?;
        Ok(withdrawal)
    }

    async fn fetch_withdrawals_for_operator(&self, operator_id: i64) -> Result<Vec<Withdrawal>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let list = withdrawals::fetch_for_operator(operator_id, &mut conn).await?;
        Ok(list)
    }

    async fn operator_ledger(&self, operator_id: i64) -> Result<LedgerSummary, DispatchError> {
        let mut tx = self.pool.begin().await?;
        let profile =
            operators::fetch_operator(operator_id, &mut tx).await?.ok_or(DispatchError::OperatorNotFound(operator_id))?;
        let confirmed_net = transactions::confirmed_net(operator_id, &mut tx).await?;
        let approved_withdrawals = withdrawals::approved_total(operator_id, &mut tx).await?;
        tx.commit().await?;
        Ok(LedgerSummary {
            operator_id,
            balance: profile.balance,
            pending_balance: profile.pending_balance,
            confirmed_net,
            approved_withdrawals,
        })
    }
}

impl PushTokenStore for SqliteDatabase {
    async fn register_push_token(
        &self,
        user_id: i64,
        token: &str,
        platform: Option<&str>,
    ) -> Result<PushToken, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let token = push_tokens::upsert_token(user_id, token, platform, &mut conn).await?;
        Ok(token)
    }

    async fn push_tokens_for(&self, user_id: i64) -> Result<Vec<PushToken>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let tokens = push_tokens::fetch_tokens(user_id, &mut conn).await?;
        Ok(tokens)
    }

    async fn remove_push_tokens(&self, tokens: &[String]) -> Result<u64, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let removed = push_tokens::delete_tokens(tokens, &mut conn).await?;
        Ok(removed)
    }
}

impl SettingsStore for SqliteDatabase {
    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, DispatchError> {
        let mut conn = self.pool.acquire().await?;
        let value = settings::fetch_setting(key, &mut conn).await?;
        Ok(value)
    }

    async fn store_setting(&self, key: &str, value: &str) -> Result<(), DispatchError> {
        let mut conn = self.pool.acquire().await?;
        settings::store_setting(key, value, &mut conn).await?;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `TDS_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, DispatchError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DispatchError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), DispatchError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Confirmed earnings minus approved withdrawals.
async fn withdrawable(operator_id: i64, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let confirmed = transactions::confirmed_net(operator_id, &mut *conn).await?;
    let approved = withdrawals::approved_total(operator_id, conn).await?;
    Ok(confirmed - approved)
}
