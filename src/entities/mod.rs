// Entity Models
//
// Resource: inventory item owned by the inventory system (read-only here)
// Allocation: a project's claim against a resource (created by the submitter)

pub mod resource;
pub mod allocation;

pub use resource::{round_quantity, Resource, StockStatus, LOW_STOCK_RATIO, QUANTITY_DECIMALS};
pub use allocation::{Allocation, NewAllocation};
