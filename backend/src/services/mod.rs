//! Business logic services for the Warehouse Stock Ledger

pub mod stock;

pub use stock::{PostMovementInput, StockMovementService};
