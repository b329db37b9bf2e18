#![allow(dead_code)]

use cashledger::application::engine::LedgerEngine;
use cashledger::domain::amount::Balance;
use cashledger::domain::entity::{Entity, EntityType};
use cashledger::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

/// An engine plus a handle on its store, for tampering with raw state.
pub struct Harness {
    pub engine: LedgerEngine,
    pub store: InMemoryStore,
}

pub async fn harness_with(entities: &[Entity]) -> Harness {
    let store = InMemoryStore::new();
    for entity in entities {
        store
            .put_raw(&entity.code, serde_json::to_vec(entity).unwrap())
            .await;
    }
    Harness {
        engine: LedgerEngine::new(Box::new(store.clone())),
        store,
    }
}

pub async fn seeded() -> Harness {
    let harness = harness_with(&[]).await;
    harness.engine.init_ledger().await.unwrap();
    harness
}

pub fn entity(code: &str, amount: Decimal, kind: EntityType) -> Entity {
    Entity::new(code, code, Balance::new(amount), kind)
}

pub async fn balance(engine: &LedgerEngine, code: &str) -> Decimal {
    engine.get_entity(code).await.unwrap().amount.value()
}

pub fn script(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}
