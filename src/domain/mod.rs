//! Domain model: records stored in the ledger keyspace, the values they
//! carry, the selector language and the store port.

pub mod amount;
pub mod cursor;
pub mod entity;
pub mod ports;
pub mod record;
pub mod selector;
pub mod transaction;
