// Inventory ledger: per-product stock records

use crate::error::{CoreResult, WarehouseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
mod tests;

/// Default restock threshold for records created on first unload
pub const DEFAULT_MIN_THRESHOLD: u32 = 5;

/// Default capacity for records created on first unload
pub const DEFAULT_MAX_CAPACITY: u32 = 100;

/// Stock record for a single product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique product identifier (e.g., "P001")
    pub product_id: String,

    pub name: String,

    /// Units on hand, always within `0..=max_capacity`
    pub quantity: u32,

    /// Storage location name (e.g., "storage_a")
    pub location: String,

    /// Restock is needed at or below this level
    pub min_threshold: u32,

    pub max_capacity: u32,

    /// Last successful mutation
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        location: impl Into<String>,
        min_threshold: u32,
        max_capacity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            location: location.into(),
            min_threshold,
            max_capacity,
            last_updated: Utc::now(),
        }
    }

    pub fn needs_restock(&self) -> bool {
        self.quantity <= self.min_threshold
    }

    pub fn can_add(&self, amount: u32) -> bool {
        self.quantity
            .checked_add(amount)
            .map_or(false, |total| total <= self.max_capacity)
    }

    /// Units needed to fill the record to capacity
    pub fn headroom(&self) -> u32 {
        self.max_capacity.saturating_sub(self.quantity)
    }
}

/// Owning store for inventory records.
///
/// Records are kept in insertion order; callers only see the
/// invariant-preserving operations below.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    items: Vec<InventoryItem>,
    index: HashMap<String, usize>,
    writes: u64,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a record.
    ///
    /// A replaced record keeps its original insertion position.
    pub fn register(&mut self, mut item: InventoryItem) -> CoreResult<()> {
        validate(&item)?;

        item.last_updated = Utc::now();
        match self.index.get(&item.product_id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.product_id.clone(), self.items.len());
                self.items.push(item);
            }
        }
        self.writes += 1;
        Ok(())
    }

    pub fn get(&self, product_id: &str) -> Option<&InventoryItem> {
        self.index.get(product_id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.index.contains_key(product_id)
    }

    /// All records in insertion order
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count of committed changes since creation
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Add units to a record. Fails without change if capacity would be exceeded.
    ///
    /// Returns the new quantity.
    pub fn add_quantity(&mut self, product_id: &str, amount: u32) -> CoreResult<u32> {
        if amount == 0 {
            return Err(WarehouseError::InvalidParameters(
                "Quantity to add must be positive".to_string(),
            ));
        }
        let item = self.get_mut(product_id)?;
        if !item.can_add(amount) {
            return Err(WarehouseError::PreconditionFailed(format!(
                "Adding {} units of {} would exceed max capacity {} (current: {})",
                amount, product_id, item.max_capacity, item.quantity
            )));
        }
        item.quantity += amount;
        item.last_updated = Utc::now();
        let quantity = item.quantity;
        self.writes += 1;
        Ok(quantity)
    }

    /// Remove units from a record. Fails without change if stock is insufficient.
    ///
    /// Returns the new quantity.
    pub fn remove_quantity(&mut self, product_id: &str, amount: u32) -> CoreResult<u32> {
        if amount == 0 {
            return Err(WarehouseError::InvalidParameters(
                "Quantity to remove must be positive".to_string(),
            ));
        }
        let item = self.get_mut(product_id)?;
        if amount > item.quantity {
            return Err(WarehouseError::PreconditionFailed(format!(
                "Not enough inventory of {} (requested: {}, available: {})",
                product_id, amount, item.quantity
            )));
        }
        item.quantity -= amount;
        item.last_updated = Utc::now();
        let quantity = item.quantity;
        self.writes += 1;
        Ok(quantity)
    }

    /// Overwrite the quantity of a record, within `0..=max_capacity`
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> CoreResult<()> {
        let item = self.get_mut(product_id)?;
        if quantity > item.max_capacity {
            return Err(WarehouseError::PreconditionFailed(format!(
                "Quantity {} exceeds max capacity {} for {}",
                quantity, item.max_capacity, product_id
            )));
        }
        item.quantity = quantity;
        item.last_updated = Utc::now();
        self.writes += 1;
        Ok(())
    }

    /// Records at or below their restock threshold, in insertion order
    pub fn items_below_threshold(&self) -> Vec<&InventoryItem> {
        self.items.iter().filter(|item| item.needs_restock()).collect()
    }

    /// Replace the whole ledger with recovered records.
    ///
    /// Every record must satisfy the same checks as `register`; on failure
    /// the ledger is left untouched.
    pub fn restore(&mut self, items: Vec<InventoryItem>) -> CoreResult<()> {
        for item in &items {
            validate(item)?;
        }

        self.items.clear();
        self.index.clear();
        for item in items {
            match self.index.get(&item.product_id) {
                Some(&pos) => self.items[pos] = item,
                None => {
                    self.index.insert(item.product_id.clone(), self.items.len());
                    self.items.push(item);
                }
            }
        }
        Ok(())
    }

    fn get_mut(&mut self, product_id: &str) -> CoreResult<&mut InventoryItem> {
        match self.index.get(product_id) {
            Some(&pos) => Ok(&mut self.items[pos]),
            None => Err(WarehouseError::product_not_found(product_id)),
        }
    }
}

fn validate(item: &InventoryItem) -> CoreResult<()> {
    if item.product_id.is_empty() {
        return Err(WarehouseError::InvalidParameters(
            "product_id is required".to_string(),
        ));
    }
    if item.quantity > item.max_capacity {
        return Err(WarehouseError::InvalidParameters(format!(
            "Quantity {} exceeds max capacity {} for {}",
            item.quantity, item.max_capacity, item.product_id
        )));
    }
    Ok(())
}
