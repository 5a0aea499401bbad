// 🔖 Allocation Entity - a project's claim against a resource
//
// Allocations are append-only from this crate's point of view: the submitter
// inserts them with consumed = false and never touches them again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Insert payload for a new allocation. `consumed` is not part of it: new
/// allocations are always outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAllocation {
    pub project_id: String,
    pub resource_id: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub project_id: String,
    pub resource_id: String,
    pub quantity: f64,

    /// Finalized allocations no longer count against availability
    pub consumed: bool,

    pub created_at: DateTime<Utc>,
}

impl Allocation {
    /// Build the outstanding allocation that an insert of `new` produces.
    pub fn from_new(new: &NewAllocation) -> Self {
        Allocation {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: new.project_id.clone(),
            resource_id: new.resource_id.clone(),
            quantity: new.quantity,
            consumed: false,
            created_at: Utc::now(),
        }
    }

    /// Whether this allocation still holds quantity of `resource_id`.
    pub fn is_outstanding_for(&self, resource_id: &str) -> bool {
        !self.consumed && self.resource_id == resource_id
    }
}
