//! HTTP handlers

mod collection;
mod health;
mod inventory;
mod production;
mod registry;
mod sales;

pub use collection::*;
pub use health::*;
pub use inventory::*;
pub use production::*;
pub use registry::*;
pub use sales::*;
