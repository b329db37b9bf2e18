use super::amount::{Amount, Balance};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Tag carried by the entities listed by `queryAllORGS`.
pub const ORGS_TAG: &str = "ORGS";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    /// Cash-transport company, the only source of funds for requests.
    Etv,
    Banco,
    Retail,
    Atm,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Active,
    Inactive,
}

/// A named account in the ledger.
///
/// Entities share the keyspace with transaction records and are keyed by
/// `code`. Only settlement changes their balance.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Entity {
    pub code: String,
    pub name: String,
    pub amount: Balance,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub status: EntityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_entity: Option<String>,
}

impl Entity {
    pub fn new(code: &str, name: &str, amount: Balance, kind: EntityType) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            amount,
            kind,
            status: EntityStatus::Active,
            type_entity: None,
        }
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.type_entity = Some(tag.to_string());
        self
    }

    pub fn is_etv(&self) -> bool {
        self.kind == EntityType::Etv
    }

    /// Adds funds to the balance.
    pub fn deposit(&mut self, amount: Amount) {
        self.amount += amount.into();
    }

    /// Removes funds if the balance covers them; the balance never goes negative.
    pub fn withdraw(&mut self, amount: Amount, role: &'static str) -> Result<()> {
        if self.amount >= amount.into() {
            self.amount -= amount.into();
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds {
                role,
                code: self.code.clone(),
                available: self.amount.value(),
                required: amount.value(),
            })
        }
    }
}
