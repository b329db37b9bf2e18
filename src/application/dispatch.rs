//! Operation table: maps a function name and positional string arguments to
//! the engine call that handles it.

use super::engine::LedgerEngine;
use crate::error::{LedgerError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    QueryCustomer,
    InitLedger,
    QueryAllOrgs,
    QueryAllRequest,
    QueryAllSend,
    CreateRequireRequest,
    CreateSendRequest,
    ReceiveCash,
    SendCash,
    QueryEntity,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Ping,
        Operation::QueryCustomer,
        Operation::InitLedger,
        Operation::QueryAllOrgs,
        Operation::QueryAllRequest,
        Operation::QueryAllSend,
        Operation::CreateRequireRequest,
        Operation::CreateSendRequest,
        Operation::ReceiveCash,
        Operation::SendCash,
        Operation::QueryEntity,
    ];

    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::QueryCustomer => "queryCustomer",
            Operation::InitLedger => "initLedger",
            Operation::QueryAllOrgs => "queryAllORGS",
            Operation::QueryAllRequest => "queryAllRequest",
            Operation::QueryAllSend => "queryAllSend",
            Operation::CreateRequireRequest => "createRequireRequest",
            Operation::CreateSendRequest => "createSendRequest",
            Operation::ReceiveCash => "receiveCash",
            Operation::SendCash => "sendCash",
            Operation::QueryEntity => "queryEntity",
        }
    }

    /// Exact number of positional arguments the operation takes.
    pub fn arity(&self) -> usize {
        match self {
            Operation::Ping
            | Operation::InitLedger
            | Operation::QueryAllOrgs
            | Operation::QueryAllRequest
            | Operation::QueryAllSend => 0,
            Operation::QueryCustomer | Operation::SendCash | Operation::QueryEntity => 1,
            Operation::ReceiveCash => 2,
            Operation::CreateRequireRequest => 3,
            Operation::CreateSendRequest => 4,
        }
    }

    /// Whether a successful call may change ledger state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::InitLedger
                | Operation::CreateRequireRequest
                | Operation::CreateSendRequest
                | Operation::ReceiveCash
                | Operation::SendCash
        )
    }

    fn check_args<'a>(&self, args: &'a [String]) -> Result<&'a [String]> {
        if args.len() == self.arity() {
            Ok(args)
        } else {
            Err(LedgerError::ArgumentCount {
                operation: self.name(),
                expected: self.arity(),
                actual: args.len(),
            })
        }
    }
}

impl FromStr for Operation {
    type Err = LedgerError;

    fn from_str(name: &str) -> Result<Self> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name() == name)
            .ok_or_else(|| LedgerError::UnknownOperation(name.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `function` with `args` and returns the response payload.
///
/// Operations without a result value echo their arguments as a JSON array.
pub async fn invoke(engine: &LedgerEngine, function: &str, args: &[String]) -> Result<Vec<u8>> {
    let op = match function.parse::<Operation>() {
        Ok(op) => op,
        Err(e) => {
            tracing::error!(function, "no function of that name found");
            return Err(e);
        }
    };

    let result = run(engine, op, args).await;
    match &result {
        Ok(_) if op.is_mutating() => tracing::info!(function = op.name(), "ledger state updated"),
        Ok(payload) => tracing::debug!(function = op.name(), bytes = payload.len(), "invocation succeeded"),
        Err(e) => tracing::error!(function = op.name(), error = %e, "invocation failed"),
    }
    result
}

async fn run(engine: &LedgerEngine, op: Operation, args: &[String]) -> Result<Vec<u8>> {
    let args = op.check_args(args)?;
    match op {
        Operation::Ping => Ok(b"pong".to_vec()),
        Operation::QueryCustomer => engine.query_customer(&args[0]).await,
        Operation::InitLedger => {
            engine.init_ledger().await?;
            echo(args)
        }
        Operation::QueryAllOrgs => engine.query_all_orgs().await?.into_payload(),
        Operation::QueryAllRequest => engine.query_all_requests().await?.into_payload(),
        Operation::QueryAllSend => engine.query_all_sends().await?.into_payload(),
        Operation::CreateRequireRequest => {
            engine.create_request(&args[0], &args[1], &args[2]).await?;
            echo(args)
        }
        Operation::CreateSendRequest => {
            engine
                .create_send(&args[0], &args[1], &args[2], &args[3])
                .await?;
            echo(args)
        }
        Operation::ReceiveCash => {
            engine.receive_cash(&args[0], &args[1]).await?;
            echo(args)
        }
        Operation::SendCash => {
            engine.send_cash(&args[0]).await?;
            echo(args)
        }
        Operation::QueryEntity => engine.query_entity(&args[0]).await?.into_payload(),
    }
}

fn echo(args: &[String]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(args)?)
}
