//! Furniture inventory ledger
//!
//! Single source of truth for ownership counts and the read-side library
//! queries. All mutation goes through the ledger; `decrement` is the only
//! gate for "can the user redeem this item" and performs its check and
//! subtraction under one lock acquisition, so concurrent redemption attempts
//! (rapid double-tap on "place") can never oversell inventory.

use roomtone_common::models::Furniture;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::warn;

/// Library filter selected in the furniture browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    All,
    Unowned,
}

/// In-memory authoritative record of furniture ownership
pub struct InventoryLedger {
    catalog: Mutex<BTreeMap<i64, Furniture>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed the catalog from the one-time remote fetch. Quantities of items
    /// already present are preserved; new items start at their given count.
    pub fn load_catalog(&self, items: Vec<Furniture>) {
        let mut catalog = self.catalog.lock().unwrap();
        for item in items {
            catalog
                .entry(item.id)
                .and_modify(|existing| {
                    let quantity = existing.quantity;
                    *existing = item.clone();
                    existing.quantity = quantity;
                })
                .or_insert(item);
        }
    }

    /// Credit `count` units of a catalog item (reward acquisition).
    /// Returns false if the id is not in the catalog.
    pub fn grant(&self, furniture_id: i64, count: u32) -> bool {
        let mut catalog = self.catalog.lock().unwrap();
        match catalog.get_mut(&furniture_id) {
            Some(item) => {
                item.quantity += count;
                true
            }
            None => {
                warn!(furniture_id, "grant for unknown furniture ignored");
                false
            }
        }
    }

    /// Atomic check-and-subtract of one unit.
    ///
    /// Returns false without mutation when the current quantity is zero (or
    /// the id is unknown). Callers must honor the return value before
    /// creating a diary-furniture link.
    pub fn decrement(&self, furniture_id: i64) -> bool {
        let mut catalog = self.catalog.lock().unwrap();
        match catalog.get_mut(&furniture_id) {
            Some(item) if item.quantity > 0 => {
                item.quantity -= 1;
                true
            }
            _ => false,
        }
    }

    /// Return one unit to the pool (storage deletion refund)
    pub fn increment(&self, furniture_id: i64) {
        let mut catalog = self.catalog.lock().unwrap();
        match catalog.get_mut(&furniture_id) {
            Some(item) => item.quantity += 1,
            None => warn!(furniture_id, "increment for unknown furniture ignored"),
        }
    }

    pub fn quantity(&self, furniture_id: i64) -> u32 {
        let catalog = self.catalog.lock().unwrap();
        catalog.get(&furniture_id).map_or(0, |item| item.quantity)
    }

    pub fn is_owned(&self, furniture_id: i64) -> bool {
        self.quantity(furniture_id) > 0
    }

    /// Items with at least one owned unit, in catalog order
    pub fn owned_items(&self) -> Vec<Furniture> {
        let catalog = self.catalog.lock().unwrap();
        catalog
            .values()
            .filter(|item| item.is_owned())
            .cloned()
            .collect()
    }

    /// Library query: ownership filter plus case-sensitive substring match
    /// on the display name (plain `contains`, not tokenized search).
    pub fn filtered_items(&self, mode: FilterMode, search: &str) -> Vec<Furniture> {
        let catalog = self.catalog.lock().unwrap();
        catalog
            .values()
            .filter(|item| match mode {
                FilterMode::All => true,
                FilterMode::Unowned => !item.is_owned(),
            })
            .filter(|item| search.is_empty() || item.display_name.contains(search))
            .cloned()
            .collect()
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
