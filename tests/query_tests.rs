mod common;

use cashledger::application::query::{NO_RECORD_FOUND, QueryOutcome};
use cashledger::domain::record::Record;
use cashledger::error::ErrorKind;
use common::{harness_with, seeded};
use std::collections::HashSet;

#[tokio::test]
async fn test_orgs_after_bootstrap() {
    let h = seeded().await;

    let orgs = h.engine.query_all_orgs().await.unwrap().into_vec();
    let codes: Vec<&str> = orgs.iter().map(Record::code).collect();
    let unique: HashSet<&str> = codes.iter().copied().collect();

    assert_eq!(codes.len(), unique.len(), "duplicated codes: {codes:?}");
    assert_eq!(
        unique,
        HashSet::from([
            "BRINKS",
            "BANCO_FALABELLA",
            "FALABELLA_RETAIL",
            "RIPLEY_RETAIL",
            "ATM_1",
            "ATM_2",
        ])
    );
}

#[tokio::test]
async fn test_empty_ledger_yields_marker() {
    let h = harness_with(&[]).await;

    let outcome = h.engine.query_all_orgs().await.unwrap();
    assert_eq!(outcome, QueryOutcome::NoRecordFound);
    assert_eq!(outcome.into_payload().unwrap(), NO_RECORD_FOUND.as_bytes());

    assert!(h.engine.query_all_requests().await.unwrap().is_empty());
    assert!(h.engine.query_all_sends().await.unwrap().is_empty());
    assert_eq!(h.store.open_cursors(), 0);
}

#[tokio::test]
async fn test_requests_and_sends_are_listed_separately() {
    let h = seeded().await;

    h.engine.create_request("R1", "ATM_2", "30").await.unwrap();
    h.engine.create_request("R2", "ATM_1", "5").await.unwrap();
    h.engine
        .create_send("S1", "ATM_1", "ATM_2", "1")
        .await
        .unwrap();
    h.engine.receive_cash("R1", "BRINKS").await.unwrap();

    let requests = h.engine.query_all_requests().await.unwrap().into_vec();
    let codes: Vec<&str> = requests.iter().map(Record::code).collect();
    assert_eq!(codes, vec!["R1", "R2"]);

    let sends = h.engine.query_all_sends().await.unwrap().into_vec();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].code(), "S1");
}

#[tokio::test]
async fn test_query_payload_is_array_of_records() {
    let h = seeded().await;
    h.engine.create_request("R1", "ATM_2", "30").await.unwrap();

    let payload = h
        .engine
        .query_all_requests()
        .await
        .unwrap()
        .into_payload()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(parsed[0]["code"], "R1");
    assert_eq!(parsed[0]["type"], "request");
}

#[tokio::test]
async fn test_query_entity_returns_raw_strings() {
    let h = seeded().await;

    let outcome = h
        .engine
        .query_entity(r#"{"selector":{"type":"ATM","amount":{"$gt":0}}}"#)
        .await
        .unwrap();
    let raw = outcome.into_vec();
    assert_eq!(raw.len(), 1);
    let atm: serde_json::Value = serde_json::from_str(&raw[0]).unwrap();
    assert_eq!(atm["code"], "ATM_1");

    let none = h
        .engine
        .query_entity(r#"{"selector":{"type":"SHIP"}}"#)
        .await
        .unwrap();
    assert_eq!(none.into_payload().unwrap(), NO_RECORD_FOUND.as_bytes());
}

#[tokio::test]
async fn test_query_entity_limit_and_combinators() {
    let h = seeded().await;

    let outcome = h
        .engine
        .query_entity(r#"{"selector":{"$or":[{"type":"BANCO"},{"type":"RETAIL"}]},"limit":3}"#)
        .await
        .unwrap();
    assert_eq!(outcome.len(), 3);

    let outcome = h
        .engine
        .query_entity(r#"{"selector":{"type_entity":{"$exists":false},"type":{"$in":["BANCO","ETV"]}}}"#)
        .await
        .unwrap();
    let raw = outcome.into_vec();
    assert_eq!(raw.len(), 1);
    assert!(raw[0].contains("BANCO_CHILE"));
}

#[tokio::test]
async fn test_invalid_query_document() {
    let h = seeded().await;

    for doc in ["", "{}", r#"{"selector":{"amount":{"$near":1}}}"#] {
        let err = h.engine.query_entity(doc).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "document {doc:?}");
    }
}

#[tokio::test]
async fn test_undecodable_match_aborts_parsed_query() {
    let h = seeded().await;
    // Tagged like an org but not a valid entity
    h.store
        .put_raw("ZZZ", r#"{"code":"ZZZ","type_entity":"ORGS","type":"SHIP"}"#)
        .await;

    let err = h.engine.query_all_orgs().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.store.open_cursors(), 0);

    // The raw flavour does not decode, so it still succeeds
    let raw = h
        .engine
        .query_entity(r#"{"selector":{"type_entity":"ORGS"}}"#)
        .await
        .unwrap();
    assert_eq!(raw.len(), 7);
}

#[tokio::test]
async fn test_every_query_releases_its_cursor() {
    let h = seeded().await;
    h.engine.create_request("R1", "ATM_2", "30").await.unwrap();

    assert_eq!(h.engine.query_all_orgs().await.unwrap().len(), 6);
    assert_eq!(h.engine.query_all_requests().await.unwrap().len(), 1);
    assert!(h.engine.query_all_sends().await.unwrap().is_empty());
    h.engine
        .query_entity(r#"{"selector":{"type":"ATM"}}"#)
        .await
        .unwrap();
    assert!(h.engine.query_entity("{}").await.is_err());

    assert_eq!(h.store.open_cursors(), 0);
}
