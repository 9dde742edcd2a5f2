//! Ledger services
//!
//! Each service wraps a `LedgerContext`; all state changes go through the
//! repository's atomic commits.

pub mod collection;
pub mod inventory;
pub mod ledger;
pub mod notification;
pub mod production;
pub mod registry;
pub mod sales;

pub use collection::CollectionService;
pub use inventory::InventoryService;
pub use ledger::LedgerContext;
pub use notification::{Notification, NotificationSink, PgNotificationSink, RecordingNotificationSink, Recipient};
pub use production::ProductionService;
pub use registry::RegistryService;
pub use sales::SalesService;
