//! Shared types and pricing engines for the Dairy Cooperative Ledger
//!
//! This crate holds everything that can be computed from inputs alone:
//! milk grading, farmer payment, loyalty tiers and point-of-sale cart
//! pricing. It is used by the backend ledger and, via WASM, by the UI for
//! live previews.

pub mod error;
pub mod models;
pub mod money;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
