//! Domain models for the dairy cooperative ledger

mod cart;
mod customer;
mod delivery;
mod farmer;
mod grading;
mod inventory;
mod loyalty;
mod milk_pricing;
mod product;
mod production;
mod promotion;
mod sale;

pub use cart::*;
pub use customer::*;
pub use delivery::*;
pub use farmer::*;
pub use grading::*;
pub use inventory::*;
pub use loyalty::*;
pub use milk_pricing::*;
pub use product::*;
pub use production::*;
pub use promotion::*;
pub use sale::*;
