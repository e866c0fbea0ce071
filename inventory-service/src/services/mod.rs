pub mod inventory_service;

pub use inventory_service::{
    InventoryService, ProductInput, ReserveFailedItem, ReserveItem, ReserveOkItem, ReserveOutcome,
};
