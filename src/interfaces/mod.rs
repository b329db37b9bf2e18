//! Adapters between external formats and ledger invocations.

pub mod csv;
