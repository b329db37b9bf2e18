//! Predicate queries and their materialization.

use super::engine::LedgerEngine;
use crate::domain::cursor::QueryCursor;
use crate::domain::entity::ORGS_TAG;
use crate::domain::record::Record;
use crate::domain::selector::QueryDocument;
use crate::error::{LedgerError, Result};
use serde::Serialize;

/// Payload returned in place of an empty result set.
pub const NO_RECORD_FOUND: &str = "No record found";

/// Result of draining a query cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    Found(Vec<T>),
    NoRecordFound,
}

impl<T> QueryOutcome<T> {
    fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            QueryOutcome::NoRecordFound
        } else {
            QueryOutcome::Found(items)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryOutcome::Found(items) => items.len(),
            QueryOutcome::NoRecordFound => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::NoRecordFound)
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            QueryOutcome::Found(items) => items,
            QueryOutcome::NoRecordFound => Vec::new(),
        }
    }
}

impl<T: Serialize> QueryOutcome<T> {
    /// A JSON array of the results, or the `No record found` marker.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        match self {
            QueryOutcome::Found(items) => Ok(serde_json::to_vec(&items)?),
            QueryOutcome::NoRecordFound => Ok(NO_RECORD_FOUND.as_bytes().to_vec()),
        }
    }
}

/// Collects every matched value as an opaque UTF-8 string.
pub fn drain_raw(mut cursor: QueryCursor) -> Result<QueryOutcome<String>> {
    let collected = cursor
        .by_ref()
        .map(|entry| {
            let entry = entry?;
            String::from_utf8(entry.value).map_err(|e| {
                LedgerError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("value under {} is not UTF-8: {}", entry.key, e),
                )))
            })
        })
        .collect::<Result<Vec<_>>>();
    cursor.close();

    let outcome = QueryOutcome::from_vec(collected?);
    if outcome.is_empty() {
        tracing::debug!("{}", NO_RECORD_FOUND);
    }
    Ok(outcome)
}

/// Decodes every matched value; the first undecodable one aborts the query.
pub fn drain_parsed(mut cursor: QueryCursor) -> Result<QueryOutcome<Record>> {
    let collected = cursor
        .by_ref()
        .map(|entry| {
            let entry = entry?;
            Record::decode(Some(entry.value.as_slice())).map_err(|e| {
                LedgerError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("record {} failed to decode: {}", entry.key, e),
                )))
            })
        })
        .collect::<Result<Vec<_>>>();
    cursor.close();

    let outcome = QueryOutcome::from_vec(collected?);
    if outcome.is_empty() {
        tracing::debug!("{}", NO_RECORD_FOUND);
    }
    Ok(outcome)
}

impl LedgerEngine {
    async fn query_parsed(&self, function: &'static str, query: QueryDocument) -> Result<QueryOutcome<Record>> {
        let inv = self.begin(function);
        let cursor = inv.query(&query).await?;
        let outcome = drain_parsed(cursor)?;
        tracing::info!(parent: inv.span(), matched = outcome.len(), "query complete");
        Ok(outcome)
    }

    /// All entities tagged `type_entity = "ORGS"`.
    pub async fn query_all_orgs(&self) -> Result<QueryOutcome<Record>> {
        self.query_parsed("queryAllORGS", QueryDocument::field_equals("type_entity", ORGS_TAG))
            .await
    }

    /// All request records, pending or settled.
    pub async fn query_all_requests(&self) -> Result<QueryOutcome<Record>> {
        self.query_parsed("queryAllRequest", QueryDocument::field_equals("type", "request"))
            .await
    }

    /// All send records, pending or settled.
    pub async fn query_all_sends(&self) -> Result<QueryOutcome<Record>> {
        self.query_parsed("queryAllSend", QueryDocument::field_equals("type", "send"))
            .await
    }

    /// Runs a caller-supplied query document and returns raw values.
    pub async fn query_entity(&self, document: &str) -> Result<QueryOutcome<String>> {
        let inv = self.begin("queryEntity");
        tracing::debug!(parent: inv.span(), query = document, "beginning rich query");

        let query = QueryDocument::parse(document)?;
        let cursor = inv.query(&query).await?;
        let outcome = drain_raw(cursor)?;

        tracing::debug!(parent: inv.span(), matched = outcome.len(), "rich query complete");
        Ok(outcome)
    }
}
