use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        Actor,
        LedgerSummary,
        MissionId,
        MissionStatus,
        NewWithdrawal,
        Role,
        SettlementTransaction,
        Withdrawal,
        WithdrawalDecision,
    },
    dispatch_api::{
        access::{require_admin, require_participant, require_self_or_admin},
        mission_objects::settlement_snapshot,
        DispatchSettings,
    },
    events::{EventProducers, TransactionConfirmedEvent, WithdrawalProcessedEvent},
    realtime::{PushDelivery, RealtimeFanout, RealtimeMessage, TargetSet, Topic},
    traits::{DispatchDatabase, DispatchError},
};

/// `SettlementApi` handles the money that changes hands after a mission: the client's payment confirmation, the
/// admin's confirmation of the transaction (which credits the operator), and operator withdrawals.
///
/// Confirmation and withdrawal processing are one-shot. Repeating them never moves money twice.
pub struct SettlementApi<B, P> {
    db: B,
    fanout: RealtimeFanout<B, P>,
    producers: EventProducers,
}

impl<B, P> Debug for SettlementApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B: Clone, P> Clone for SettlementApi<B, P> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), fanout: self.fanout.clone(), producers: self.producers.clone() }
    }
}

impl<B, P> SettlementApi<B, P> {
    pub fn new(db: B, fanout: RealtimeFanout<B, P>, producers: EventProducers) -> Self {
        Self { db, fanout, producers }
    }
}

impl<B, P> SettlementApi<B, P>
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    /// The client says they paid for a completed mission.
    ///
    /// Creates the pending transaction if completion did not, and records the client's confirmation. Calling it again
    /// while the transaction is pending is harmless. Once an admin has confirmed the transaction, this fails with
    /// `ALREADY_SETTLED`.
    pub async fn confirm_payment(
        &self,
        actor: Actor,
        mission_id: MissionId,
    ) -> Result<SettlementTransaction, DispatchError> {
        let mission = self.db.fetch_mission(mission_id).await?.ok_or(DispatchError::MissionNotFound(mission_id))?;
        if actor.role != Role::Client || mission.client_id != actor.id {
            let msg = format!("Only the client of mission {mission_id} can confirm paying for it.");
            return Err(DispatchError::forbidden(msg));
        }
        if mission.status != MissionStatus::Completed {
            return Err(DispatchError::InvalidTransition {
                mission: mission_id,
                from: mission.status,
                action: "confirm_payment".into(),
            });
        }
        let settings = DispatchSettings::load(&self.db).await?;
        let snapshot = settlement_snapshot(&mission, &settings)?;
        let opened = self.db.open_settlement(mission_id, snapshot, true).await?;
        let transaction = opened.transaction;
        if transaction.is_confirmed() {
            return Err(DispatchError::AlreadySettled(format!(
                "Payment for mission {mission_id} was already confirmed by an admin."
            )));
        }
        info!(
            "💰️ Client {} confirmed paying {} for mission {mission_id} (transaction #{}{})",
            actor.id,
            transaction.amount,
            transaction.id,
            if opened.created { ", newly opened" } else { "" }
        );
        self.broadcast_transaction(&transaction).await;
        Ok(transaction)
    }

    /// An admin confirms the money was received. The commission is taken at the percentage snapshotted when the
    /// transaction was opened, and the operator's balance is credited with the rest.
    pub async fn confirm_transaction(
        &self,
        actor: Actor,
        transaction_id: i64,
    ) -> Result<SettlementTransaction, DispatchError> {
        require_admin(&actor)?;
        let transaction = self.db.confirm_transaction(transaction_id, actor.id).await?;
        info!(
            "💰️ Transaction #{transaction_id} confirmed by admin {}. Operator {} earns {}",
            actor.id,
            transaction.operator_id,
            transaction.net_amount.unwrap_or_default()
        );
        self.broadcast_transaction(&transaction).await;
        debug!("💰️📬️ Notifying transaction confirmed hook subscribers");
        self.producers.transaction_confirmed(TransactionConfirmedEvent::new(transaction.clone())).await;
        Ok(transaction)
    }

    /// An operator asks to be paid out. The amount must not exceed confirmed earnings minus approved withdrawals.
    pub async fn request_withdrawal(&self, actor: Actor, request: NewWithdrawal) -> Result<Withdrawal, DispatchError> {
        if actor.role != Role::Operator || actor.id != request.operator_id {
            return Err(DispatchError::forbidden("Operators can only withdraw their own earnings."));
        }
        if !request.amount.is_positive() {
            return Err(DispatchError::validation(format!("Cannot withdraw {}.", request.amount)));
        }
        if request.method.trim().is_empty() {
            return Err(DispatchError::validation("A payout method is required."));
        }
        let withdrawal = self.db.request_withdrawal(request).await?;
        info!("💰️ Operator {} requested a withdrawal of {} (#{})", actor.id, withdrawal.amount, withdrawal.id);
        let admins = TargetSet::new().with(Topic::Admins);
        self.fanout.publish(&admins, RealtimeMessage::WithdrawalUpdated(withdrawal.clone())).await;
        Ok(withdrawal)
    }

    /// Approves or rejects a pending withdrawal. If two admins race, the second gets a `CONFLICT`.
    pub async fn process_withdrawal(
        &self,
        actor: Actor,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
        note: Option<String>,
    ) -> Result<Withdrawal, DispatchError> {
        require_admin(&actor)?;
        let withdrawal = self.db.process_withdrawal(withdrawal_id, decision, actor.id, note).await?;
        info!("💰️ Withdrawal #{withdrawal_id} {} by admin {}", withdrawal.status, actor.id);
        let targets = TargetSet::new().with(Topic::Admins).with(Topic::Operator(withdrawal.operator_id));
        self.fanout.publish(&targets, RealtimeMessage::WithdrawalUpdated(withdrawal.clone())).await;
        debug!("💰️📬️ Notifying withdrawal processed hook subscribers");
        self.producers.withdrawal_processed(WithdrawalProcessedEvent::new(withdrawal.clone())).await;
        Ok(withdrawal)
    }

    pub async fn operator_ledger(&self, actor: Actor, operator_id: i64) -> Result<LedgerSummary, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        self.db.operator_ledger(operator_id).await
    }

    pub async fn transactions_for_operator(
        &self,
        actor: Actor,
        operator_id: i64,
    ) -> Result<Vec<SettlementTransaction>, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        self.db.fetch_transactions_for_operator(operator_id).await
    }

    pub async fn withdrawals_for_operator(
        &self,
        actor: Actor,
        operator_id: i64,
    ) -> Result<Vec<Withdrawal>, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        self.db.fetch_withdrawals_for_operator(operator_id).await
    }

    pub async fn transaction_for_mission(
        &self,
        actor: Actor,
        mission_id: MissionId,
    ) -> Result<Option<SettlementTransaction>, DispatchError> {
        let mission = self.db.fetch_mission(mission_id).await?.ok_or(DispatchError::MissionNotFound(mission_id))?;
        require_participant(&actor, &mission)?;
        self.db.fetch_transaction_for_mission(mission_id).await
    }

    async fn broadcast_transaction(&self, transaction: &SettlementTransaction) {
        let targets = TargetSet::new().with(Topic::Admins).with(Topic::Operator(transaction.operator_id));
        self.fanout.publish(&targets, RealtimeMessage::TransactionUpdated(transaction.clone())).await;
    }
}
