//! Shared domain types for the Warehouse Stock Ledger
//!
//! This crate contains the stock entities and validation rules shared
//! between the backend and any other components of the system. It performs
//! no I/O; persistence lives in the backend crate.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;
