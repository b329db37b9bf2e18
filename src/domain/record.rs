//! Typed view over the values stored in the shared keyspace.
//!
//! Every value is either an [`Entity`] or a [`TransactionRecord`]; the
//! `type` field decides which. Decoding fails explicitly with a
//! [`DecodeError`], and absence is reported through the same type, because
//! callers treat a missing key and a corrupt one the same way.

use super::entity::Entity;
use super::transaction::{RequestTx, SendTx, TransactionRecord};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no value stored")]
    Missing,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("malformed record: {0}")]
    Shape(String),
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum Record {
    Transaction(TransactionRecord),
    Entity(Entity),
}

impl Record {
    /// Decodes the bytes returned by a store read.
    pub fn decode(raw: Option<&[u8]>) -> Result<Self, DecodeError> {
        let bytes = match raw {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(DecodeError::Missing),
        };
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let is_transaction = {
            let tag = value
                .as_object()
                .ok_or_else(|| DecodeError::Shape("expected a JSON object".to_string()))?
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| DecodeError::Shape("missing type discriminant".to_string()))?;
            matches!(tag, "request" | "send")
        };

        if is_transaction {
            Ok(Record::Transaction(serde_json::from_value(value)?))
        } else {
            Ok(Record::Entity(serde_json::from_value(value)?))
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Record::Transaction(tx) => tx.code(),
            Record::Entity(entity) => &entity.code,
        }
    }

    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Record::Entity(entity) => Some(entity),
            Record::Transaction(_) => None,
        }
    }

    pub fn into_request(self) -> Option<RequestTx> {
        match self {
            Record::Transaction(TransactionRecord::Request(tx)) => Some(tx),
            _ => None,
        }
    }

    pub fn into_send(self) -> Option<SendTx> {
        match self {
            Record::Transaction(TransactionRecord::Send(tx)) => Some(tx),
            _ => None,
        }
    }
}

impl From<Entity> for Record {
    fn from(entity: Entity) -> Self {
        Record::Entity(entity)
    }
}

impl From<TransactionRecord> for Record {
    fn from(tx: TransactionRecord) -> Self {
        Record::Transaction(tx)
    }
}
