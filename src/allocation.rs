// ➕ Allocation Submitter
// Validates a requested quantity and records one allocation
//
// Checks run in a fixed order and all of them happen before the store is
// touched:
//   1. a resource is selected
//   2. quantity is a positive number
//   3. quantity does not exceed the available quantity

use crate::entities::{round_quantity, Allocation, NewAllocation};
use crate::error::{AllocationError, InsufficientQuantity, UnknownResource};
use crate::store::AllocationStore;
use tracing::{info, warn};

/// Pure validation of a submission. Returns the resource id on success.
pub fn validate_allocation(
    resource_id: Option<&str>,
    quantity: f64,
    available_quantity: f64,
) -> Result<String, AllocationError> {
    let resource_id = match resource_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(AllocationError::Selection(
                "Please select a resource".to_string(),
            ))
        }
    };

    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AllocationError::Validation(
            "Quantity must be a positive number".to_string(),
        ));
    }

    // Compared at QUANTITY_DECIMALS so an exact fit of fractional stock passes
    let available_quantity = round_quantity(available_quantity);
    if round_quantity(quantity) > available_quantity {
        return Err(AllocationError::Validation(format!(
            "Quantity cannot exceed available amount ({})",
            available_quantity
        )));
    }

    Ok(resource_id.to_string())
}

/// Validate, then insert `{project_id, resource_id, quantity, consumed = false}`.
///
/// No retry on failure. Store errors are mapped back into the taxonomy: a
/// conditional insert that found too little stock is a validation error, an
/// unknown resource is a selection error, anything else is a persistence
/// error.
pub fn submit_allocation<S: AllocationStore + ?Sized>(
    store: &mut S,
    project_id: &str,
    resource_id: Option<&str>,
    quantity: f64,
    available_quantity: f64,
) -> Result<Allocation, AllocationError> {
    let resource_id = validate_allocation(resource_id, quantity, available_quantity)?;

    let new = NewAllocation {
        project_id: project_id.to_string(),
        resource_id,
        quantity,
    };

    match store.insert_allocation(&new) {
        Ok(allocation) => {
            info!(
                allocation_id = %allocation.id,
                project_id = %allocation.project_id,
                resource_id = %allocation.resource_id,
                quantity = allocation.quantity,
                "allocation recorded"
            );
            Ok(allocation)
        }
        Err(e) => {
            warn!(error = %e, resource_id = %new.resource_id, "allocation insert failed");

            if let Some(insufficient) = e.downcast_ref::<InsufficientQuantity>() {
                return Err(AllocationError::Validation(format!(
                    "Quantity cannot exceed available amount ({})",
                    insufficient.available
                )));
            }
            if let Some(unknown) = e.downcast_ref::<UnknownResource>() {
                return Err(AllocationError::Selection(unknown.to_string()));
            }

            Err(AllocationError::Persistence(format!("{:#}", e)))
        }
    }
}
