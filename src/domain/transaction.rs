use super::amount::Amount;
use serde::{Deserialize, Serialize};

/// Lifecycle of a pending transaction. `Done` is terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Active,
    Done,
}

/// A claim for funds, settled from an ETV entity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RequestTx {
    pub code: String,
    pub requester: String,
    pub amount: Amount,
    pub status: TransactionStatus,
}

/// A transfer between two entities.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SendTx {
    pub code: String,
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    pub status: TransactionStatus,
}

/// The two transaction shapes, told apart by their `type` field.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionRecord {
    Request(RequestTx),
    Send(SendTx),
}

impl TransactionRecord {
    pub fn code(&self) -> &str {
        match self {
            TransactionRecord::Request(tx) => &tx.code,
            TransactionRecord::Send(tx) => &tx.code,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            TransactionRecord::Request(tx) => tx.status,
            TransactionRecord::Send(tx) => tx.status,
        }
    }
}
