//! PostgreSQL implementation of the stock ledger contracts
//!
//! The (product_id, location_id) pair is covered by a unique index, and
//! `find_item_for_update` issues a `SELECT ... FOR UPDATE`, so the database
//! serializes concurrent postings against the same item. A concurrent lazy
//! creation of the same item surfaces as a unique violation, mapped to a
//! retryable conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{MovementType, StockItem, StockMovement};

use crate::error::{AppError, AppResult};
use crate::repositories::{
    LocationGate, MovementFilters, ProductGate, StockStore, StockTx,
};

/// Stock ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One PostgreSQL transaction. Rolls back on drop unless committed.
pub struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

/// Row for stock item queries
#[derive(Debug, FromRow)]
struct StockItemRow {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    quantity: Decimal,
    last_purchase_price: Option<Decimal>,
    last_movement_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<StockItemRow> for StockItem {
    fn from(row: StockItemRow) -> Self {
        StockItem::from_stored(
            row.id,
            row.product_id,
            row.location_id,
            row.quantity,
            row.last_purchase_price,
            row.last_movement_at,
            row.created_at,
            row.updated_at,
        )
    }
}

/// Row for movement queries
#[derive(Debug, FromRow)]
struct StockMovementRow {
    id: Uuid,
    stock_item_id: Uuid,
    movement_type: String,
    quantity: Decimal,
    quantity_before: Decimal,
    quantity_after: Decimal,
    notes: Option<String>,
    moved_at: DateTime<Utc>,
}

impl TryFrom<StockMovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: StockMovementRow) -> Result<Self, Self::Error> {
        let movement_type = MovementType::from_str(&row.movement_type)?;
        Ok(StockMovement::from_stored(
            row.id,
            row.stock_item_id,
            movement_type,
            row.quantity,
            row.quantity_before,
            row.quantity_after,
            row.notes,
            row.moved_at,
        ))
    }
}

const ITEM_COLUMNS: &str = "id, product_id, location_id, quantity, last_purchase_price, \
                            last_movement_at, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, stock_item_id, movement_type, quantity, quantity_before, \
                                quantity_after, notes, moved_at";

#[async_trait]
impl StockStore for PgStockStore {
    type Tx = PgStockTx;

    async fn begin(&self) -> AppResult<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgStockTx { tx })
    }

    async fn find_item(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE product_id = $1 AND location_id = $2"
        ))
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StockItem::from))
    }

    async fn find_items_by_product(&self, product_id: Uuid) -> AppResult<Vec<StockItem>> {
        let rows = sqlx::query_as::<_, StockItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE product_id = $1 ORDER BY created_at"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    async fn find_all_items(&self) -> AppResult<Vec<StockItem>> {
        let rows = sqlx::query_as::<_, StockItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items ORDER BY product_id, location_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    async fn total_quantity_for_product(&self, product_id: Uuid) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_items WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn find_movements_by_item(
        &self,
        stock_item_id: Uuid,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE stock_item_id = $1 ORDER BY moved_at DESC"
        ))
        .bind(stock_item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }

    async fn find_movements_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &MovementFilters,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovementRow>(
            r#"
            SELECT m.id, m.stock_item_id, m.movement_type, m.quantity, m.quantity_before,
                   m.quantity_after, m.notes, m.moved_at
            FROM stock_movements m
            JOIN stock_items s ON s.id = m.stock_item_id
            WHERE m.moved_at >= $1 AND m.moved_at <= $2
              AND ($3::uuid IS NULL OR s.product_id = $3)
              AND ($4::uuid IS NULL OR s.location_id = $4)
              AND ($5::text IS NULL OR m.movement_type = $5)
            ORDER BY m.moved_at DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(filters.product_id)
        .bind(filters.location_id)
        .bind(filters.movement_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn find_item_for_update(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items \
             WHERE product_id = $1 AND location_id = $2 FOR UPDATE"
        ))
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(StockItem::from))
    }

    async fn insert_item(&mut self, item: &StockItem) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_items (id, product_id, location_id, quantity,
                                     last_purchase_price, last_movement_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id())
        .bind(item.product_id())
        .bind(item.location_id())
        .bind(item.quantity())
        .bind(item.last_purchase_price())
        .bind(item.last_movement_at())
        .bind(item.created_at())
        .bind(item.updated_at())
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict {
                    resource: "stock_items".to_string(),
                    message: "A stock item for this product and location was created concurrently"
                        .to_string(),
                    message_pt: "Um item de estoque para este produto e local foi criado \
                                 concorrentemente"
                        .to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_item(&mut self, item: &StockItem) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET quantity = $1, last_purchase_price = $2, last_movement_at = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(item.quantity())
        .bind(item.last_purchase_price())
        .bind(item.last_movement_at())
        .bind(item.updated_at())
        .bind(item.id())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock item".to_string()));
        }
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, stock_item_id, movement_type, quantity,
                                         quantity_before, quantity_after, notes, moved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(movement.id())
        .bind(movement.stock_item_id())
        .bind(movement.movement_type().as_str())
        .bind(movement.quantity())
        .bind(movement.quantity_before())
        .bind(movement.quantity_after())
        .bind(movement.notes())
        .bind(movement.moved_at())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Product existence/active checks against the products table
#[derive(Clone)]
pub struct PgProductGate {
    pool: PgPool,
}

impl PgProductGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductGate for PgProductGate {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn is_active(&self, id: Uuid) -> AppResult<bool> {
        let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(active.unwrap_or(false))
    }
}

/// Storage-location existence/active checks against the storage_locations table
#[derive(Clone)]
pub struct PgLocationGate {
    pool: PgPool,
}

impl PgLocationGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationGate for PgLocationGate {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM storage_locations WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn is_active(&self, id: Uuid) -> AppResult<bool> {
        let active =
            sqlx::query_scalar::<_, bool>("SELECT is_active FROM storage_locations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(active.unwrap_or(false))
    }
}
