//! Warehouse Stock Ledger - backend
//!
//! The stock-movement posting engine of a warehouse management system:
//! atomically applies entries, exits, and adjustments to the per-location
//! stock ledger while keeping quantities non-negative and recording an
//! immutable movement history. HTTP routing, report rendering, and
//! authentication live outside this crate and consume it through
//! [`services::StockMovementService`].

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::{PostMovementInput, StockMovementService};
