// ⚠️ Errors - allocation failure taxonomy

use thiserror::Error;

/// Failures surfaced by the allocation dialog and submitter.
///
/// Every variant is recovered at the dialog boundary and turned into a
/// notification; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    /// Fetching resources or allocations failed.
    #[error("failed to load resources: {0}")]
    Fetch(String),

    /// Submit attempted without a (known) resource selected.
    #[error("{0}")]
    Selection(String),

    /// Quantity is not positive or exceeds what is available.
    #[error("{0}")]
    Validation(String),

    /// The insert failed.
    #[error("failed to add resource: {0}")]
    Persistence(String),

    /// A submission from this dialog is already in flight.
    #[error("a submission is already in progress")]
    Busy,
}

impl AllocationError {
    /// Notification title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            AllocationError::Fetch(_) => "Error loading resources",
            AllocationError::Selection(_) => "No resource selected",
            AllocationError::Validation(_) => "Invalid quantity",
            AllocationError::Persistence(_) => "Error",
            AllocationError::Busy => "Please wait",
        }
    }
}

/// The conditional insert found less available quantity than requested.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("requested {requested} but only {available} available for resource {resource_id}")]
pub struct InsufficientQuantity {
    pub resource_id: String,
    pub requested: f64,
    pub available: f64,
}

/// An allocation referenced a resource id the store does not know.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown resource: {0}")]
pub struct UnknownResource(pub String);
