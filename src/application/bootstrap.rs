use super::engine::LedgerEngine;
use crate::domain::amount::Balance;
use crate::domain::entity::{Entity, EntityType, ORGS_TAG};
use crate::error::Result;
use rust_decimal_macros::dec;

/// Code of the seeded cash-transport entity.
pub const SEED_ETV: &str = "BRINKS";

/// The organizations written by `initLedger`.
pub fn seed_entities() -> Vec<Entity> {
    vec![
        Entity::new(SEED_ETV, "Brinks", Balance::new(dec!(100)), EntityType::Etv).tagged(ORGS_TAG),
        Entity::new("BANCO_FALABELLA", "Banco Falabella", Balance::new(dec!(100)), EntityType::Banco)
            .tagged(ORGS_TAG),
        // Not tagged, so it stays out of queryAllORGS.
        Entity::new("BANCO_CHILE", "BANCO CHILE", Balance::new(dec!(100)), EntityType::Banco),
        Entity::new("FALABELLA_RETAIL", "Tienda Falabella", Balance::new(dec!(100)), EntityType::Retail)
            .tagged(ORGS_TAG),
        Entity::new("RIPLEY_RETAIL", "Tienda Ripley", Balance::new(dec!(100)), EntityType::Retail)
            .tagged(ORGS_TAG),
        Entity::new("ATM_1", "ATM 1", Balance::new(dec!(100)), EntityType::Atm).tagged(ORGS_TAG),
        Entity::new("ATM_2", "ATM 2", Balance::ZERO, EntityType::Atm).tagged(ORGS_TAG),
    ]
}

impl LedgerEngine {
    /// Writes the seed entities, overwriting whatever is stored at their codes.
    pub async fn init_ledger(&self) -> Result<Vec<Entity>> {
        let mut inv = self.begin("initLedger");
        tracing::info!(parent: inv.span(), "initializing ledger");

        let entities = seed_entities();
        for entity in &entities {
            inv.put_record(&entity.code, entity)?;
            tracing::info!(parent: inv.span(), code = %entity.code, kind = ?entity.kind, "added entity");
        }
        inv.commit().await?;

        Ok(entities)
    }

    /// True once the seed ETV is present.
    pub async fn is_seeded(&self) -> Result<bool> {
        let mut inv = self.begin("isSeeded");
        Ok(inv.get_state(SEED_ETV).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::collections::HashSet;

    #[test]
    fn test_seed_codes_are_unique() {
        let seeds = seed_entities();
        let codes: HashSet<_> = seeds.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes.len(), seeds.len());
        assert_eq!(seeds.iter().filter(|e| e.is_etv()).count(), 1);
    }

    #[tokio::test]
    async fn test_init_ledger_overwrites_existing() {
        let store = InMemoryStore::new();
        store.put_raw("ATM_2", "garbage").await;
        let engine = LedgerEngine::new(Box::new(store));

        assert!(!engine.is_seeded().await.unwrap());
        engine.init_ledger().await.unwrap();
        assert!(engine.is_seeded().await.unwrap());

        let atm = engine.get_entity("ATM_2").await.unwrap();
        assert_eq!(atm.amount, Balance::ZERO);
        assert_eq!(atm.kind, EntityType::Atm);
    }
}
