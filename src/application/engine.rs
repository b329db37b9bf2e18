use super::invocation::{Invocation, not_found};
use crate::domain::amount::Amount;
use crate::domain::entity::Entity;
use crate::domain::ports::{KeyValueStore, StoreBox};
use crate::domain::record::Record;
use crate::domain::transaction::{RequestTx, SendTx, TransactionRecord, TransactionStatus};
use crate::error::{LedgerError, Result};

/// Outcome of a successful settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// The transaction record as persisted, with status `DONE`.
    pub transaction: TransactionRecord,
    /// The entity that paid (the ETV for requests, the sender for sends).
    pub debited: Entity,
    /// The entity that received the funds.
    pub credited: Entity,
}

/// The ledger state-transition engine.
///
/// `LedgerEngine` validates and applies requests, sends and their
/// settlements on top of a [`KeyValueStore`]. Every public operation runs as
/// one [`Invocation`]: it reads, validates, and only then commits its whole
/// write set at once.
pub struct LedgerEngine {
    store: StoreBox,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` over the given keyspace.
    pub fn new(store: StoreBox) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub(crate) fn begin(&self, function: &'static str) -> Invocation<'_> {
        Invocation::begin(self.store.as_ref(), function)
    }

    /// Returns the raw bytes stored under `code`.
    pub async fn query_customer(&self, code: &str) -> Result<Vec<u8>> {
        let mut inv = self.begin("queryCustomer");
        match inv.get_state(code).await? {
            Some(bytes) if !bytes.is_empty() => {
                tracing::debug!(parent: inv.span(), code, "customer found");
                Ok(bytes)
            }
            _ => Err(LedgerError::NotFound(format!(
                "Customer {code} does not exist"
            ))),
        }
    }

    /// Reads and decodes whatever record is stored under `code`.
    pub async fn get_record(&self, code: &str) -> Result<Record> {
        let mut inv = self.begin("getRecord");
        inv.read_record(code)
            .await?
            .map_err(|_| not_found("record", code))
    }

    pub async fn get_entity(&self, code: &str) -> Result<Entity> {
        let mut inv = self.begin("getEntity");
        inv.load_entity(code, "entity").await
    }

    /// Records a pending claim of `amount` by `requester`.
    pub async fn create_request(
        &self,
        code: &str,
        requester: &str,
        amount: &str,
    ) -> Result<RequestTx> {
        let mut inv = self.begin("createRequireRequest");
        tracing::info!(parent: inv.span(), code, requester, amount, "creating request");

        inv.load_entity(requester, "requester").await?;
        let amount = Amount::parse(amount)?;
        ensure_code_reusable(&mut inv, code).await?;

        let request = RequestTx {
            code: code.to_string(),
            requester: requester.to_string(),
            amount,
            status: TransactionStatus::Active,
        };
        inv.put_record(code, &TransactionRecord::Request(request.clone()))?;
        let span = inv.span().clone();
        inv.commit().await?;

        tracing::info!(parent: &span, code, "request created");
        Ok(request)
    }

    /// Records a pending transfer of `amount` from `sender` to `receiver`.
    ///
    /// Solvency is not checked here; an underfunded send fails at settlement.
    pub async fn create_send(
        &self,
        code: &str,
        sender: &str,
        receiver: &str,
        amount: &str,
    ) -> Result<SendTx> {
        let mut inv = self.begin("createSendRequest");
        tracing::info!(parent: inv.span(), code, sender, receiver, amount, "creating send");

        inv.load_entity(sender, "sender").await?;
        inv.load_entity(receiver, "receiver").await?;
        let amount = Amount::parse(amount)?;
        if sender == receiver {
            return Err(LedgerError::ValidationError(format!(
                "sender and receiver must differ (both {sender})"
            )));
        }
        ensure_code_reusable(&mut inv, code).await?;

        let send = SendTx {
            code: code.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            status: TransactionStatus::Active,
        };
        inv.put_record(code, &TransactionRecord::Send(send.clone()))?;
        let span = inv.span().clone();
        inv.commit().await?;

        tracing::info!(parent: &span, code, "send created");
        Ok(send)
    }

    /// Settles a request: the ETV pays the requester named in the stored record.
    pub async fn receive_cash(&self, request_code: &str, etv_code: &str) -> Result<Settlement> {
        let mut inv = self.begin("receiveCash");
        tracing::info!(parent: inv.span(), request = request_code, etv = etv_code, "settling request");

        let mut request = inv
            .read_record(request_code)
            .await?
            .ok()
            .and_then(Record::into_request)
            .ok_or_else(|| not_found("request", request_code))?;
        ensure_active(request_code, request.status)?;

        let requester_key = request.requester.clone();
        let mut etv = inv.load_entity(etv_code, "ETV").await?;
        let mut requester = inv.load_entity(&requester_key, "requester").await?;

        if !etv.is_etv() {
            return Err(LedgerError::ValidationError(format!(
                "entity {etv_code} is not an ETV"
            )));
        }
        if etv_code == requester_key {
            return Err(LedgerError::ValidationError(format!(
                "ETV {etv_code} cannot settle its own request"
            )));
        }

        etv.withdraw(request.amount, "ETV")?;
        requester.deposit(request.amount);
        request.status = TransactionStatus::Done;

        let transaction = TransactionRecord::Request(request);
        inv.put_record(etv_code, &etv)?;
        inv.put_record(&requester_key, &requester)?;
        inv.put_record(request_code, &transaction)?;

        let span = inv.span().clone();
        inv.commit().await?;
        tracing::info!(
            parent: &span,
            etv_balance = %etv.amount,
            requester_balance = %requester.amount,
            "request settled"
        );

        Ok(Settlement {
            transaction,
            debited: etv,
            credited: requester,
        })
    }

    /// Settles a send between the entities named in the stored record.
    pub async fn send_cash(&self, send_code: &str) -> Result<Settlement> {
        let mut inv = self.begin("sendCash");
        tracing::info!(parent: inv.span(), send = send_code, "settling send");

        let mut send = inv
            .read_record(send_code)
            .await?
            .ok()
            .and_then(Record::into_send)
            .ok_or_else(|| not_found("send", send_code))?;
        ensure_active(send_code, send.status)?;

        let sender_key = send.sender.clone();
        let receiver_key = send.receiver.clone();
        if sender_key == receiver_key {
            return Err(LedgerError::ValidationError(format!(
                "sender and receiver must differ (both {sender_key})"
            )));
        }
        let mut sender = inv.load_entity(&sender_key, "sender").await?;
        let mut receiver = inv.load_entity(&receiver_key, "receiver").await?;

        sender.withdraw(send.amount, "sender")?;
        receiver.deposit(send.amount);
        send.status = TransactionStatus::Done;

        let transaction = TransactionRecord::Send(send);
        inv.put_record(&sender_key, &sender)?;
        inv.put_record(&receiver_key, &receiver)?;
        inv.put_record(send_code, &transaction)?;

        let span = inv.span().clone();
        inv.commit().await?;
        tracing::info!(
            parent: &span,
            sender_balance = %sender.amount,
            receiver_balance = %receiver.amount,
            "send settled"
        );

        Ok(Settlement {
            transaction,
            debited: sender,
            credited: receiver,
        })
    }
}

fn ensure_active(code: &str, status: TransactionStatus) -> Result<()> {
    match status {
        TransactionStatus::Active => Ok(()),
        TransactionStatus::Done => Err(LedgerError::ValidationError(format!(
            "transaction {code} is already settled"
        ))),
    }
}

/// A new transaction may replace a pending one, but never an entity or a
/// settled transaction.
async fn ensure_code_reusable(inv: &mut Invocation<'_>, code: &str) -> Result<()> {
    match inv.read_record(code).await? {
        Ok(Record::Entity(_)) => Err(LedgerError::ValidationError(format!(
            "code {code} is already used by an entity"
        ))),
        Ok(Record::Transaction(tx)) if tx.status() == TransactionStatus::Done => Err(
            LedgerError::ValidationError(format!("transaction {code} is already settled")),
        ),
        Ok(Record::Transaction(_)) => {
            tracing::warn!(parent: inv.span(), code, "overwriting pending transaction");
            Ok(())
        }
        Err(_) => Ok(()),
    }
}
