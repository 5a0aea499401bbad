// Resource Allocation - Core Library
// Exposes all modules for use in the dialog CLI, API server, and tests

pub mod entities;
pub mod error;
pub mod db;
pub mod store;
pub mod availability;   // Availability Calculator
pub mod allocation;     // Allocation Submitter
pub mod dialog;         // Form state for the "add resource" dialog
pub mod notify;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use entities::{
    Resource, StockStatus, LOW_STOCK_RATIO, QUANTITY_DECIMALS, round_quantity,
    Allocation, NewAllocation,
};
pub use error::{AllocationError, InsufficientQuantity, UnknownResource};
pub use db::{
    open, open_in_memory, setup_database,
    load_resources_csv, insert_resources,
    get_resources_by_name, get_resource,
    get_all_allocations, get_allocations_for_project,
    insert_allocation, insert_allocation_if_available,
    mark_consumed, count_allocations,
};
pub use store::{AllocationStore, SqliteStore, fetch_inputs};
pub use availability::{
    ResourceAvailability,
    allocated_quantity, annotate, annotate_all, compute_availability,
};
pub use allocation::{submit_allocation, validate_allocation};
pub use dialog::{AllocationDialog, LoadTicket, PendingSubmission, DEFAULT_QUANTITY};
pub use notify::{Notification, NotificationSink, Severity, TracingSink};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
