// 📊 Availability Calculator
// Projects resources + allocations into per-resource availability views
//
// available = quantity - Σ(quantity of outstanding allocations)
//
// This is recomputed from raw rows on every load. Nothing derived is ever
// stored back on the resource.

use crate::entities::{round_quantity, Allocation, Resource, StockStatus};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// AVAILABILITY VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAvailability {
    pub resource: Resource,

    /// Sum of outstanding (not consumed) allocation quantities
    pub allocated: f64,

    /// quantity - allocated; zero or negative when over-allocated
    pub available: f64,

    /// Recomputed status; overrides `resource.status`
    pub status: StockStatus,
}

impl ResourceAvailability {
    pub fn id(&self) -> &str {
        &self.resource.id
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    /// Exhausted resources are never offered for a new allocation.
    pub fn is_selectable(&self) -> bool {
        self.available > 0.0
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Sum of outstanding allocation quantities for one resource, rounded to
/// `QUANTITY_DECIMALS`.
pub fn allocated_quantity(resource_id: &str, allocations: &[Allocation]) -> f64 {
    let total: f64 = allocations
        .iter()
        .filter(|a| a.is_outstanding_for(resource_id))
        .map(|a| a.quantity)
        .sum();
    round_quantity(total)
}

/// Availability view for a single resource.
pub fn annotate(resource: &Resource, allocations: &[Allocation]) -> ResourceAvailability {
    let allocated = allocated_quantity(&resource.id, allocations);
    let available = round_quantity(resource.quantity - allocated);
    let status = StockStatus::classify(available, resource.quantity);

    if !resource.status.is_empty() && resource.status != status.as_str() {
        debug!(
            resource_id = %resource.id,
            stored = %resource.status,
            computed = %status,
            "stored status disagrees with computed status"
        );
    }

    ResourceAvailability {
        resource: resource.clone(),
        allocated,
        available,
        status,
    }
}

/// Availability views for every resource, exhausted ones included.
/// Input order is preserved.
pub fn annotate_all(resources: &[Resource], allocations: &[Allocation]) -> Vec<ResourceAvailability> {
    resources
        .iter()
        .map(|r| annotate(r, allocations))
        .collect()
}

/// Resources that can still be allocated, with their availability.
///
/// Resources with `available <= 0` are dropped. Input order is preserved,
/// so callers that fetch ordered by name get a list ordered by name.
pub fn compute_availability(
    resources: &[Resource],
    allocations: &[Allocation],
) -> Vec<ResourceAvailability> {
    annotate_all(resources, allocations)
        .into_iter()
        .filter(ResourceAvailability::is_selectable)
        .collect()
}
