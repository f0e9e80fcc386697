//! Domain models for the Warehouse Stock Ledger

mod stock;

pub use stock::*;
