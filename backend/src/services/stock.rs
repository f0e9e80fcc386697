//! Stock movement posting engine
//!
//! [`StockMovementService::post_movement`] is the single write path into the
//! ledger: it validates the request, re-checks the product and location
//! gates, and applies the movement inside one transaction. Every committed
//! movement carries before/after snapshots taken around the mutation, so the
//! ledger and the audit history cannot diverge.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{MovementType, StockItem, StockMovement};
use shared::validation::{normalize_notes, require_non_negative, require_positive};

use crate::error::{AppError, AppResult};
use crate::repositories::{
    LocationGate, MovementFilters, ProductGate, StockStore, StockTx,
};

/// Input for posting a stock movement
#[derive(Debug, Clone, Deserialize)]
pub struct PostMovementInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    /// Delta for entries and exits; the new absolute quantity for adjustments
    pub quantity: Decimal,
    pub notes: Option<String>,
}

/// Service owning the posting sequence and the ledger read side
#[derive(Clone)]
pub struct StockMovementService<S, P, L> {
    store: S,
    products: P,
    locations: L,
}

impl<S, P, L> StockMovementService<S, P, L>
where
    S: StockStore,
    P: ProductGate,
    L: LocationGate,
{
    pub fn new(store: S, products: P, locations: L) -> Self {
        Self {
            store,
            products,
            locations,
        }
    }

    /// Post a movement against the (product, location) ledger entry.
    ///
    /// The whole sequence from item load to commit runs inside one
    /// transaction; on any failure the transaction is rolled back and no
    /// item or movement mutation survives.
    pub async fn post_movement(&self, input: PostMovementInput) -> AppResult<StockMovement> {
        // Entries and exits are deltas and must be strictly positive; an
        // adjustment is the new absolute quantity and may be zero.
        match input.movement_type {
            MovementType::Entry | MovementType::Exit => {
                require_positive("quantity", input.quantity)?
            }
            MovementType::Adjustment => require_non_negative("quantity", input.quantity)?,
        }
        let notes = normalize_notes(input.notes.as_deref())?;

        if !self.products.exists(input.product_id).await? {
            return Err(AppError::NotFound("Product".to_string()));
        }
        if !self.products.is_active(input.product_id).await? {
            return Err(AppError::Inactive("Product".to_string()));
        }
        if !self.locations.exists(input.location_id).await? {
            return Err(AppError::NotFound("Storage location".to_string()));
        }
        if !self.locations.is_active(input.location_id).await? {
            return Err(AppError::Inactive("Storage location".to_string()));
        }

        let mut tx = self.store.begin().await?;
        match Self::apply(&mut tx, &input, notes.as_deref()).await {
            Ok(movement) => {
                tx.commit().await?;
                tracing::info!(
                    movement_id = %movement.id(),
                    movement_type = %movement.movement_type(),
                    product_id = %input.product_id,
                    location_id = %input.location_id,
                    quantity_before = %movement.quantity_before(),
                    quantity_after = %movement.quantity_after(),
                    "stock movement posted"
                );
                Ok(movement)
            }
            Err(err) => {
                if let AppError::InsufficientStock(_) = &err {
                    tracing::warn!(
                        product_id = %input.product_id,
                        location_id = %input.location_id,
                        quantity = %input.quantity,
                        "stock movement rejected: insufficient stock"
                    );
                }
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        "rollback after failed post also failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn apply(
        tx: &mut S::Tx,
        input: &PostMovementInput,
        notes: Option<&str>,
    ) -> AppResult<StockMovement> {
        let existing = tx
            .find_item_for_update(input.product_id, input.location_id)
            .await?;

        let mut item = match existing {
            Some(item) => item,
            None => {
                // Lazy creation is only legal for movements that can bring
                // stock into existence.
                if input.movement_type == MovementType::Exit {
                    return Err(AppError::InsufficientStock(
                        "Cannot post an exit for a product with no stock at this location"
                            .to_string(),
                    ));
                }
                let item =
                    StockItem::new(input.product_id, input.location_id, Decimal::ZERO)?;
                tx.insert_item(&item).await?;
                item
            }
        };

        let quantity_before = item.quantity();

        match input.movement_type {
            MovementType::Entry => item.add_quantity(input.quantity)?,
            MovementType::Exit => {
                if !item.try_subtract_quantity(input.quantity)? {
                    return Err(AppError::InsufficientStock(format!(
                        "Requested {} but only {} available",
                        input.quantity, quantity_before
                    )));
                }
            }
            MovementType::Adjustment => item.adjust_quantity(input.quantity)?,
        }

        let movement = StockMovement::new(
            item.id(),
            input.movement_type,
            input.quantity,
            quantity_before,
            item.quantity(),
            notes,
        )?;

        tx.update_item(&item).await?;
        tx.insert_movement(&movement).await?;

        Ok(movement)
    }

    /// All ledger entries for a product across locations.
    pub async fn stock_by_product(&self, product_id: Uuid) -> AppResult<Vec<StockItem>> {
        self.store.find_items_by_product(product_id).await
    }

    /// The full stock position report: every ledger entry.
    pub async fn stock_position(&self) -> AppResult<Vec<StockItem>> {
        self.store.find_all_items().await
    }

    /// Total quantity of a product summed over all locations.
    pub async fn total_product_quantity(&self, product_id: Uuid) -> AppResult<Decimal> {
        self.store.total_quantity_for_product(product_id).await
    }

    /// Movement history of one ledger entry, most recent first.
    pub async fn movements_for_item(
        &self,
        stock_item_id: Uuid,
    ) -> AppResult<Vec<StockMovement>> {
        self.store.find_movements_by_item(stock_item_id).await
    }

    /// Movements within a period, optionally filtered by product, location,
    /// or movement type.
    pub async fn movements_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &MovementFilters,
    ) -> AppResult<Vec<StockMovement>> {
        if start > end {
            return Err(AppError::Validation {
                field: "period".to_string(),
                message: "Period start must not be after its end".to_string(),
                message_pt: "Início do período não pode ser posterior ao fim".to_string(),
            });
        }
        self.store.find_movements_by_period(start, end, filters).await
    }
}
