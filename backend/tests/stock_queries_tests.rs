//! Ledger read-side tests
//!
//! Stock position reporting, per-product totals, and period/filter queries
//! over the movement history.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use backend::repositories::{MemoryGate, MemoryStockStore, MovementFilters};
use backend::services::{PostMovementInput, StockMovementService};
use backend::AppError;
use shared::models::MovementType;

type MemoryService = StockMovementService<MemoryStockStore, MemoryGate, MemoryGate>;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct Ctx {
    service: MemoryService,
    products: MemoryGate,
    locations: MemoryGate,
}

async fn ctx() -> Ctx {
    let store = MemoryStockStore::new();
    let products = MemoryGate::new();
    let locations = MemoryGate::new();
    let service =
        StockMovementService::new(store, products.clone(), locations.clone());
    Ctx {
        service,
        products,
        locations,
    }
}

async fn post(
    ctx: &Ctx,
    product_id: Uuid,
    location_id: Uuid,
    movement_type: MovementType,
    quantity: &str,
) {
    ctx.service
        .post_movement(PostMovementInput {
            product_id,
            location_id,
            movement_type,
            quantity: dec(quantity),
            notes: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stock_by_product_spans_locations() {
    let ctx = ctx().await;
    let product = ctx.products.register(true).await;
    let shelf = ctx.locations.register(true).await;
    let depot = ctx.locations.register(true).await;

    post(&ctx, product, shelf, MovementType::Entry, "10").await;
    post(&ctx, product, depot, MovementType::Entry, "4").await;

    let items = ctx.service.stock_by_product(product).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.product_id() == product));

    let total = ctx.service.total_product_quantity(product).await.unwrap();
    assert_eq!(total, dec("14"));
}

#[tokio::test]
async fn test_stock_position_lists_every_item() {
    let ctx = ctx().await;
    let p1 = ctx.products.register(true).await;
    let p2 = ctx.products.register(true).await;
    let location = ctx.locations.register(true).await;

    post(&ctx, p1, location, MovementType::Entry, "1").await;
    post(&ctx, p2, location, MovementType::Entry, "2").await;

    let position = ctx.service.stock_position().await.unwrap();
    assert_eq!(position.len(), 2);
}

#[tokio::test]
async fn test_total_quantity_for_unknown_product_is_zero() {
    let ctx = ctx().await;
    let total = ctx
        .service
        .total_product_quantity(Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(total, Decimal::ZERO);
}

#[tokio::test]
async fn test_movements_for_item_returns_full_history() {
    let ctx = ctx().await;
    let product = ctx.products.register(true).await;
    let location = ctx.locations.register(true).await;

    post(&ctx, product, location, MovementType::Entry, "10").await;
    post(&ctx, product, location, MovementType::Exit, "3").await;
    post(&ctx, product, location, MovementType::Adjustment, "5").await;

    let item = ctx.service.stock_by_product(product).await.unwrap()[0].clone();
    let history = ctx.service.movements_for_item(item.id()).await.unwrap();

    assert_eq!(history.len(), 3);
    assert_eq!(history.iter().filter(|m| m.is_entry()).count(), 1);
    assert_eq!(history.iter().filter(|m| m.is_exit()).count(), 1);
    assert_eq!(history.iter().filter(|m| m.is_adjustment()).count(), 1);
}

#[tokio::test]
async fn test_movements_by_period_filters() {
    let ctx = ctx().await;
    let coffee = ctx.products.register(true).await;
    let sugar = ctx.products.register(true).await;
    let shelf = ctx.locations.register(true).await;
    let depot = ctx.locations.register(true).await;

    post(&ctx, coffee, shelf, MovementType::Entry, "10").await;
    post(&ctx, coffee, shelf, MovementType::Exit, "2").await;
    post(&ctx, sugar, depot, MovementType::Entry, "4").await;

    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);

    let all = ctx
        .service
        .movements_by_period(start, end, &MovementFilters::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let coffee_only = ctx
        .service
        .movements_by_period(
            start,
            end,
            &MovementFilters {
                product_id: Some(coffee),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(coffee_only.len(), 2);

    let exits_only = ctx
        .service
        .movements_by_period(
            start,
            end,
            &MovementFilters {
                movement_type: Some(MovementType::Exit),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(exits_only.len(), 1);
    assert!(exits_only[0].is_exit());

    let depot_only = ctx
        .service
        .movements_by_period(
            start,
            end,
            &MovementFilters {
                location_id: Some(depot),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(depot_only.len(), 1);
}

#[tokio::test]
async fn test_movements_by_period_excludes_out_of_range() {
    let ctx = ctx().await;
    let product = ctx.products.register(true).await;
    let location = ctx.locations.register(true).await;

    post(&ctx, product, location, MovementType::Entry, "10").await;

    let long_ago_start = Utc::now() - Duration::days(30);
    let long_ago_end = Utc::now() - Duration::days(29);

    let none = ctx
        .service
        .movements_by_period(long_ago_start, long_ago_end, &MovementFilters::default())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_movements_by_period_rejects_inverted_range() {
    let ctx = ctx().await;
    let start = Utc::now();
    let end = start - Duration::hours(1);

    let err = ctx
        .service
        .movements_by_period(start, end, &MovementFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}
