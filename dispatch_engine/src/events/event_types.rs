use serde::{Deserialize, Serialize};

use crate::db_types::{Mission, SettlementTransaction, Withdrawal};

/// A mission reached `completed`. `transaction` is the settlement transaction opened for it, if this completion
/// opened one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionCompletedEvent {
    pub mission: Mission,
    pub transaction: Option<SettlementTransaction>,
}

impl MissionCompletedEvent {
    pub fn new(mission: Mission, transaction: Option<SettlementTransaction>) -> Self {
        Self { mission, transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfirmedEvent {
    pub transaction: SettlementTransaction,
}

impl TransactionConfirmedEvent {
    pub fn new(transaction: SettlementTransaction) -> Self {
        Self { transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalProcessedEvent {
    pub withdrawal: Withdrawal,
}

impl WithdrawalProcessedEvent {
    pub fn new(withdrawal: Withdrawal) -> Self {
        Self { withdrawal }
    }
}
