use crate::{
    db_types::{
        LedgerSummary,
        MissionId,
        NewWithdrawal,
        SettlementSnapshot,
        SettlementTransaction,
        Withdrawal,
        WithdrawalDecision,
    },
    traits::{data_objects::SettlementOpened, DispatchError},
};

/// The money side of the engine: settlement transactions, operator balances and withdrawals.
///
/// Confirmation and withdrawal processing are one-shot conditional transitions. Backends guarantee that the status
/// change and the balance change land together or not at all.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Opens the `pending` transaction for a mission if none exists yet and adds the expected net amount to the
    /// operator's pending balance. An existing transaction is returned as-is with `created == false`.
    ///
    /// If `client_confirmed` is true, the client's payment confirmation time is recorded on a pending transaction.
    async fn open_settlement(
        &self,
        mission_id: MissionId,
        snapshot: SettlementSnapshot,
        client_confirmed: bool,
    ) -> Result<SettlementOpened, DispatchError>;

    async fn fetch_transaction(&self, id: i64) -> Result<Option<SettlementTransaction>, DispatchError>;

    async fn fetch_transaction_for_mission(
        &self,
        mission_id: MissionId,
    ) -> Result<Option<SettlementTransaction>, DispatchError>;

    async fn fetch_transactions_for_operator(
        &self,
        operator_id: i64,
    ) -> Result<Vec<SettlementTransaction>, DispatchError>;

    /// Confirms a pending transaction using its snapshotted commission percent, and credits the operator.
    ///
    /// Fails with `AlreadySettled` if the transaction was already confirmed, and `NotFound` if it does not exist.
    async fn confirm_transaction(&self, id: i64, confirmed_by: i64) -> Result<SettlementTransaction, DispatchError>;

    /// Records a withdrawal request if `amount` does not exceed the operator's available balance at this instant.
    async fn request_withdrawal(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, DispatchError>;

    /// Moves a pending withdrawal to approved or rejected. Only the first call wins; later calls get a `Conflict`.
    async fn process_withdrawal(
        &self,
        id: i64,
        decision: WithdrawalDecision,
        processed_by: i64,
        note: Option<String>,
    ) -> Result<Withdrawal, DispatchError>;

    async fn fetch_withdrawal(&self, id: i64) -> Result<Option<Withdrawal>, DispatchError>;

    async fn fetch_withdrawals_for_operator(&self, operator_id: i64) -> Result<Vec<Withdrawal>, DispatchError>;

    async fn operator_ledger(&self, operator_id: i64) -> Result<LedgerSummary, DispatchError>;
}
