//! AS-number registry.

use crate::models::AsnRef;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// AS-number entities, created on first use.
#[derive(Debug, Default)]
pub struct AsnRegistry {
    by_number: RwLock<BTreeMap<u32, AsnRef>>,
}

impl AsnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved entries.
    pub fn from_entries(entries: Vec<AsnRef>) -> Self {
        AsnRegistry {
            by_number: RwLock::new(entries.into_iter().map(|a| (a.number, a)).collect()),
        }
    }

    /// The entity for `number`, creating it when missing.
    pub fn get_or_create(&self, number: u32) -> AsnRef {
        if let Some(asn) = self.get(number) {
            return asn;
        }
        let mut by_number = self.by_number.write().unwrap_or_else(|e| e.into_inner());
        let next_id = by_number.values().map(|a| a.id).max().unwrap_or(0) + 1;
        by_number
            .entry(number)
            .or_insert_with(|| {
                log::info!("Registering AS{number}");
                AsnRef {
                    id: next_id,
                    number,
                    name: format!("AS{number}"),
                }
            })
            .clone()
    }

    pub fn get(&self, number: u32) -> Option<AsnRef> {
        self.by_number
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&number)
            .cloned()
    }

    /// All entries ordered by number.
    pub fn entries(&self) -> Vec<AsnRef> {
        self.by_number
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create() {
        let registry = AsnRegistry::new();
        let a = registry.get_or_create(7497);
        let b = registry.get_or_create(4538);
        assert_eq!(a.id, 1);
        assert_eq!(a.name, "AS7497");
        assert_eq!(b.id, 2);
        assert_eq!(registry.get_or_create(7497), a);
        assert_eq!(registry.entries().len(), 2);

        let restored = AsnRegistry::from_entries(registry.entries());
        assert_eq!(restored.get_or_create(1).id, 3);
    }
}
