//! Persistence contracts for the stock ledger
//!
//! The posting engine only sees these traits. [`StockStore`] owns the
//! read side and hands out transactions; [`StockTx`] is one unit of work
//! whose writes become visible atomically on [`StockTx::commit`] and vanish
//! on rollback or drop. The gates answer existence/active checks against
//! the product and location registries without exposing those entities.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{MovementType, StockItem, StockMovement};

use crate::error::AppResult;

pub use memory::{MemoryGate, MemoryStockStore};
pub use postgres::{PgLocationGate, PgProductGate, PgStockStore};

/// Optional filters for period queries over the movement ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementFilters {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

/// Read access to the ledger plus the transaction factory
#[async_trait]
pub trait StockStore: Send + Sync {
    type Tx: StockTx;

    /// Open a unit of work for one posting sequence.
    async fn begin(&self) -> AppResult<Self::Tx>;

    async fn find_item(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>>;

    async fn find_items_by_product(&self, product_id: Uuid) -> AppResult<Vec<StockItem>>;

    async fn find_all_items(&self) -> AppResult<Vec<StockItem>>;

    async fn total_quantity_for_product(&self, product_id: Uuid) -> AppResult<Decimal>;

    async fn find_movements_by_item(&self, stock_item_id: Uuid)
        -> AppResult<Vec<StockMovement>>;

    async fn find_movements_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &MovementFilters,
    ) -> AppResult<Vec<StockMovement>>;
}

/// One transactional posting sequence.
///
/// At most one transaction may hold a given stock item between
/// [`find_item_for_update`](StockTx::find_item_for_update) and commit;
/// implementations enforce this with a row lock or an equivalent mutex.
#[async_trait]
pub trait StockTx: Send {
    /// Load the item for a (product, location) pair, locking it for the
    /// lifetime of this transaction.
    async fn find_item_for_update(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>>;

    async fn insert_item(&mut self, item: &StockItem) -> AppResult<()>;

    async fn update_item(&mut self, item: &StockItem) -> AppResult<()>;

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()>;

    /// Make all writes of this transaction visible atomically.
    async fn commit(self) -> AppResult<()>;

    /// Discard all writes. Dropping the transaction has the same effect.
    async fn rollback(self) -> AppResult<()>;
}

/// Existence/active check against the product registry
#[async_trait]
pub trait ProductGate: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn is_active(&self, id: Uuid) -> AppResult<bool>;
}

/// Existence/active check against the storage-location registry
#[async_trait]
pub trait LocationGate: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn is_active(&self, id: Uuid) -> AppResult<bool>;
}
