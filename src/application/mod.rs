//! Application layer containing the transaction protocol.
//!
//! `LedgerEngine` is the entry point. Each operation runs inside an
//! `Invocation`, which buffers writes and commits them to the store as one
//! unit; the `dispatch` module maps named operations with string arguments
//! onto engine calls.

pub mod bootstrap;
pub mod dispatch;
pub mod engine;
pub mod invocation;
pub mod query;
