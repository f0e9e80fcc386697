//! In-memory implementation of the stock ledger contracts
//!
//! Used by the test suite and by embedders that do not want PostgreSQL.
//! A transaction takes the store-wide async mutex for its whole lifetime
//! and mutates a scratch copy of the state; commit swaps the scratch copy
//! in, so postings against the same store never interleave and an aborted
//! transaction leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::models::{StockItem, StockMovement};

use crate::error::{AppError, AppResult};
use crate::repositories::{
    LocationGate, MovementFilters, ProductGate, StockStore, StockTx,
};

#[derive(Debug, Default, Clone)]
struct LedgerState {
    items: HashMap<Uuid, StockItem>,
    movements: Vec<StockMovement>,
}

impl LedgerState {
    fn item_for(&self, product_id: Uuid, location_id: Uuid) -> Option<&StockItem> {
        self.items
            .values()
            .find(|i| i.product_id() == product_id && i.location_id() == location_id)
    }
}

/// In-memory stock store
#[derive(Clone, Default)]
pub struct MemoryStockStore {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// In-memory unit of work. Holds the store lock until commit or drop.
pub struct MemoryStockTx {
    guard: OwnedMutexGuard<LedgerState>,
    scratch: LedgerState,
}

#[async_trait]
impl StockStore for MemoryStockStore {
    type Tx = MemoryStockTx;

    async fn begin(&self) -> AppResult<Self::Tx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let scratch = guard.clone();
        Ok(MemoryStockTx { guard, scratch })
    }

    async fn find_item(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>> {
        let state = self.state.lock().await;
        Ok(state.item_for(product_id, location_id).cloned())
    }

    async fn find_items_by_product(&self, product_id: Uuid) -> AppResult<Vec<StockItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|i| i.product_id() == product_id)
            .cloned()
            .collect())
    }

    async fn find_all_items(&self) -> AppResult<Vec<StockItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<StockItem> = state.items.values().cloned().collect();
        items.sort_by_key(|i| (i.product_id(), i.location_id()));
        Ok(items)
    }

    async fn total_quantity_for_product(&self, product_id: Uuid) -> AppResult<Decimal> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|i| i.product_id() == product_id)
            .map(|i| i.quantity())
            .sum())
    }

    async fn find_movements_by_item(
        &self,
        stock_item_id: Uuid,
    ) -> AppResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<StockMovement> = state
            .movements
            .iter()
            .filter(|m| m.stock_item_id() == stock_item_id)
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.moved_at().cmp(&a.moved_at()));
        Ok(movements)
    }

    async fn find_movements_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &MovementFilters,
    ) -> AppResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<StockMovement> = state
            .movements
            .iter()
            .filter(|m| m.moved_at() >= start && m.moved_at() <= end)
            .filter(|m| {
                filters
                    .movement_type
                    .map_or(true, |t| m.movement_type() == t)
            })
            .filter(|m| {
                let item = state.items.get(&m.stock_item_id());
                filters
                    .product_id
                    .map_or(true, |p| item.is_some_and(|i| i.product_id() == p))
                    && filters
                        .location_id
                        .map_or(true, |l| item.is_some_and(|i| i.location_id() == l))
            })
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.moved_at().cmp(&a.moved_at()));
        Ok(movements)
    }
}

#[async_trait]
impl StockTx for MemoryStockTx {
    async fn find_item_for_update(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>> {
        Ok(self.scratch.item_for(product_id, location_id).cloned())
    }

    async fn insert_item(&mut self, item: &StockItem) -> AppResult<()> {
        if self
            .scratch
            .item_for(item.product_id(), item.location_id())
            .is_some()
        {
            return Err(AppError::Conflict {
                resource: "stock_items".to_string(),
                message: "A stock item for this product and location already exists".to_string(),
                message_pt: "Já existe um item de estoque para este produto e local".to_string(),
            });
        }
        self.scratch.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &StockItem) -> AppResult<()> {
        if !self.scratch.items.contains_key(&item.id()) {
            return Err(AppError::NotFound("Stock item".to_string()));
        }
        self.scratch.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        self.scratch.movements.push(movement.clone());
        Ok(())
    }

    async fn commit(mut self) -> AppResult<()> {
        *self.guard = self.scratch;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        // Dropping the scratch copy and releasing the lock is the rollback.
        Ok(())
    }
}

/// In-memory registry gate, usable for both products and locations.
///
/// Each entry maps an id to its active flag.
#[derive(Clone, Default)]
pub struct MemoryGate {
    entries: Arc<Mutex<HashMap<Uuid, bool>>>,
}

impl MemoryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an id, returning it for convenience.
    pub async fn register(&self, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.lock().await.insert(id, active);
        id
    }

    pub async fn set_active(&self, id: Uuid, active: bool) {
        self.entries.lock().await.insert(id, active);
    }
}

#[async_trait]
impl ProductGate for MemoryGate {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.entries.lock().await.contains_key(&id))
    }

    async fn is_active(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.entries.lock().await.get(&id).copied().unwrap_or(false))
    }
}

#[async_trait]
impl LocationGate for MemoryGate {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.entries.lock().await.contains_key(&id))
    }

    async fn is_active(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.entries.lock().await.get(&id).copied().unwrap_or(false))
    }
}
