/// Session inventory for escape-room items
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::catalog::PuzzleCatalog;
use super::types::ItemId;

/// Items acquired during one session. Items are never removed; the set only
/// empties when the whole session is restarted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStore {
    items: BTreeSet<ItemId>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_items(items: BTreeSet<ItemId>) -> Self {
        Self { items }
    }

    /// Add an item; returns `true` only when it was not already held.
    pub fn add_item(&mut self, item_id: &str) -> bool {
        self.items.insert(item_id.to_string())
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.contains(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }

    pub fn items(&self) -> &BTreeSet<ItemId> {
        &self.items
    }
}

// ============================================================================
// Display Formatting
// ============================================================================

/// Format inventory for compact display (one line per item)
pub fn format_inventory_compact(inventory: &InventoryStore, catalog: &PuzzleCatalog) -> String {
    if inventory.is_empty() {
        return "You are carrying nothing.".to_string();
    }

    let mut lines = vec![format!("Inventory ({}):", inventory.len())];
    for item_id in inventory.iter() {
        match catalog.item(item_id) {
            Some(item) => lines.push(format!("- {}", item.name)),
            None => lines.push(format!("- {}", item_id)),
        }
    }
    lines.join("\n")
}

/// Format detailed item examination
pub fn format_item_examination(inventory: &InventoryStore, catalog: &PuzzleCatalog, item_id: &str) -> Option<String> {
    if !inventory.has_item(item_id) {
        return None;
    }
    let item = catalog.item(item_id)?;
    Some(format!("=== {} ===\n{}", item.name, item.description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::types::{Item, Puzzle, PuzzleKind};
    use std::collections::BTreeMap;

    fn catalog() -> PuzzleCatalog {
        let mut grants = BTreeMap::new();
        grants.insert(1, "vial".to_string());
        PuzzleCatalog::new(
            vec![Puzzle::new(1, "Fridge", PuzzleKind::Code, "42")],
            vec![Item::new("vial", "Sample Vial", "A sealed vial of blue liquid.")],
            grants,
        )
        .unwrap()
    }

    #[test]
    fn add_is_idempotent() {
        let mut inv = InventoryStore::new();
        assert!(inv.add_item("vial"));
        assert!(!inv.add_item("vial"));
        assert_eq!(inv.len(), 1);
        assert!(inv.has_item("vial"));
        assert!(!inv.has_item("keycard"));
    }

    #[test]
    fn compact_format_uses_item_names() {
        let catalog = catalog();
        let mut inv = InventoryStore::new();
        assert_eq!(format_inventory_compact(&inv, &catalog), "You are carrying nothing.");

        inv.add_item("vial");
        let text = format_inventory_compact(&inv, &catalog);
        assert!(text.starts_with("Inventory (1):"));
        assert!(text.contains("- Sample Vial"));
    }

    #[test]
    fn examination_requires_possession() {
        let catalog = catalog();
        let mut inv = InventoryStore::new();
        assert!(format_item_examination(&inv, &catalog, "vial").is_none());
        inv.add_item("vial");
        let text = format_item_examination(&inv, &catalog, "vial").unwrap();
        assert!(text.contains("blue liquid"));
    }
}
