// 🪟 Allocation Dialog - form state for "add resource to project"
//
// Owns everything the form needs between events:
// - the availability list from the last load
// - the selected resource and the quantity bound captured at selection
// - the pending quantity
// - the loading and submitting flags
//
// Loads and submissions are split into begin/finish halves so a caller that
// awaits the store in between can still tear the dialog down safely: a load
// finishing after close() or after a newer load is silently dropped.

use crate::allocation::{submit_allocation, validate_allocation};
use crate::availability::{compute_availability, ResourceAvailability};
use crate::entities::{Allocation, Resource};
use crate::error::AllocationError;
use crate::notify::{Notification, NotificationSink};
use crate::store::{fetch_inputs, AllocationStore};
use anyhow::Result;
use tracing::{debug, warn};

/// Quantity every fresh selection starts at.
pub const DEFAULT_QUANTITY: f64 = 1.0;

/// Handed out by `begin_load`; only the latest ticket of an open dialog is
/// honoured by `finish_load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// A validated submission waiting for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub project_id: String,
    pub resource_id: String,
    pub quantity: f64,
    /// Availability of the selected resource at the moment of submission
    pub available: f64,
}

impl PendingSubmission {
    pub fn execute<S: AllocationStore + ?Sized>(&self, store: &mut S) -> Result<Allocation, AllocationError> {
        submit_allocation(
            store,
            &self.project_id,
            Some(&self.resource_id),
            self.quantity,
            self.available,
        )
    }
}

#[derive(Debug)]
pub struct AllocationDialog {
    project_id: String,
    resources: Vec<ResourceAvailability>,
    loading: bool,
    open: bool,
    generation: u64,
    selected: Option<String>,
    max_quantity: f64,
    quantity: f64,
    submitting: bool,
}

impl AllocationDialog {
    pub fn new(project_id: &str) -> Self {
        AllocationDialog {
            project_id: project_id.to_string(),
            resources: Vec::new(),
            loading: false,
            open: true,
            generation: 0,
            selected: None,
            max_quantity: 0.0,
            quantity: DEFAULT_QUANTITY,
            submitting: false,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Resources offered for selection, ascending by name.
    pub fn available_resources(&self) -> &[ResourceAvailability] {
        &self.resources
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Availability view of the selected resource in the current list.
    pub fn selected_resource(&self) -> Option<&ResourceAvailability> {
        let id = self.selected.as_deref()?;
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Upper bound captured when the current resource was selected.
    pub fn max_quantity(&self) -> f64 {
        self.max_quantity
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.loading = true;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply a finished fetch. Returns false when the result was discarded
    /// because the dialog was closed or a newer load was started.
    pub fn finish_load<N: NotificationSink + ?Sized>(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Vec<Resource>, Vec<Allocation>)>,
        sink: &mut N,
    ) -> bool {
        if !self.open || ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                open = self.open,
                "discarding stale load result"
            );
            return false;
        }

        match result {
            Ok((resources, allocations)) => {
                self.resources = compute_availability(&resources, &allocations);
                debug!(
                    project_id = %self.project_id,
                    selectable = self.resources.len(),
                    total = resources.len(),
                    "availability computed"
                );
            }
            Err(e) => {
                let err = AllocationError::Fetch(format!("{:#}", e));
                warn!(error = %err, "resource fetch failed");
                self.resources.clear();
                sink.notify(Notification::error(err.title(), &err.to_string()));
            }
        }

        self.loading = false;
        true
    }

    /// Fetch resources and allocations and recompute availability.
    pub fn load<S, N>(&mut self, store: &mut S, sink: &mut N) -> bool
    where
        S: AllocationStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let ticket = self.begin_load();
        let result = fetch_inputs(store);
        self.finish_load(ticket, result, sink)
    }

    // ========================================================================
    // FORM STATE
    // ========================================================================

    /// Select a resource. Resets the quantity to 1 and captures the
    /// resource's available quantity as the new upper bound, in one step.
    pub fn select_resource(&mut self, resource_id: &str) -> Result<(), AllocationError> {
        let available = self
            .resources
            .iter()
            .find(|r| r.id() == resource_id)
            .map(|r| r.available)
            .ok_or_else(|| {
                AllocationError::Selection(format!(
                    "Resource {} is not available for allocation",
                    resource_id
                ))
            })?;

        self.selected = Some(resource_id.to_string());
        self.quantity = DEFAULT_QUANTITY;
        self.max_quantity = available;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.quantity = DEFAULT_QUANTITY;
        self.max_quantity = 0.0;
    }

    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = quantity;
    }

    /// Input-level validation against the bound captured at selection.
    pub fn validate_input(&self) -> Result<(), AllocationError> {
        validate_allocation(self.selected.as_deref(), self.quantity, self.max_quantity).map(|_| ())
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Validate the form and mark the dialog busy.
    ///
    /// The quantity is checked twice: against the bound captured at
    /// selection, then against the selected resource's availability in the
    /// current list. Failures are notified and leave the dialog idle.
    pub fn begin_submit<N: NotificationSink + ?Sized>(
        &mut self,
        sink: &mut N,
    ) -> Result<PendingSubmission, AllocationError> {
        let pending = self.prepare_submission();

        match pending {
            Ok(pending) => {
                self.submitting = true;
                Ok(pending)
            }
            Err(err) => {
                sink.notify(Notification::error(err.title(), &err.to_string()));
                Err(err)
            }
        }
    }

    fn prepare_submission(&self) -> Result<PendingSubmission, AllocationError> {
        if self.submitting {
            return Err(AllocationError::Busy);
        }

        self.validate_input()?;

        let current = self.selected_resource().ok_or_else(|| {
            AllocationError::Selection("Selected resource is no longer available".to_string())
        })?;
        let resource_id = validate_allocation(Some(current.id()), self.quantity, current.available)?;

        Ok(PendingSubmission {
            project_id: self.project_id.clone(),
            resource_id,
            quantity: self.quantity,
            available: current.available,
        })
    }

    /// Record the outcome of a submission. Always clears the busy flag;
    /// `on_resource_added` runs exactly once, and only on success.
    pub fn finish_submit<N, F>(
        &mut self,
        result: Result<Allocation, AllocationError>,
        sink: &mut N,
        on_resource_added: F,
    ) -> Result<Allocation, AllocationError>
    where
        N: NotificationSink + ?Sized,
        F: FnOnce(),
    {
        self.submitting = false;

        match &result {
            Ok(_) => {
                sink.notify(Notification::success("Success", "Resource added to project"));
                on_resource_added();
            }
            Err(err) => {
                sink.notify(Notification::error(err.title(), &err.to_string()));
            }
        }

        result
    }

    /// Validate, persist and report one allocation.
    pub fn submit<S, N, F>(
        &mut self,
        store: &mut S,
        sink: &mut N,
        on_resource_added: F,
    ) -> Result<Allocation, AllocationError>
    where
        S: AllocationStore + ?Sized,
        N: NotificationSink + ?Sized,
        F: FnOnce(),
    {
        let pending = self.begin_submit(sink)?;
        let result = pending.execute(store);
        self.finish_submit(result, sink, on_resource_added)
    }

    /// Dismiss the dialog. Loads still in flight become no-ops.
    pub fn close<F: FnOnce()>(&mut self, on_close: F) {
        self.open = false;
        self.loading = false;
        on_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use crate::testing::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::with_resources(vec![
            Resource::new("r-drill", "Drill", 50.0),
            Resource::new("r-cement", "Cement", 10.0),
            Resource::new("r-bricks", "Bricks", 100.0),
        ])
    }

    fn loaded(store: &mut MemoryStore) -> AllocationDialog {
        let mut dialog = AllocationDialog::new("project-1");
        let mut sink: Vec<Notification> = Vec::new();
        assert!(dialog.load(store, &mut sink));
        assert!(sink.is_empty());
        dialog
    }

    #[test]
    fn test_load_orders_and_filters() {
        let mut store = store();
        store
            .insert_allocation(&crate::entities::NewAllocation {
                project_id: "other".to_string(),
                resource_id: "r-cement".to_string(),
                quantity: 10.0,
            })
            .unwrap();

        let dialog = loaded(&mut store);

        let names: Vec<_> = dialog.available_resources().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Bricks", "Drill"], "exhausted Cement is not offered");
        assert!(!dialog.is_loading());
    }

    #[test]
    fn test_load_failure_notifies_and_empties_list() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        store.fail_fetch = true;

        let mut sink: Vec<Notification> = Vec::new();
        assert!(dialog.load(&mut store, &mut sink));

        assert!(dialog.available_resources().is_empty());
        assert!(!dialog.is_loading());
        assert_eq!(sink.len(), 1);
        assert!(sink[0].is_error());
        assert_eq!(sink[0].title, "Error loading resources");
    }

    #[test]
    fn test_load_after_close_is_discarded() {
        let mut store = store();
        let mut dialog = AllocationDialog::new("project-1");
        let mut sink: Vec<Notification> = Vec::new();

        let ticket = dialog.begin_load();
        let mut closed = 0;
        dialog.close(|| closed += 1);

        let applied = dialog.finish_load(ticket, fetch_inputs(&mut store), &mut sink);

        assert!(!applied);
        assert_eq!(closed, 1);
        assert!(dialog.available_resources().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let mut store = store();
        let mut dialog = AllocationDialog::new("project-1");
        let mut sink: Vec<Notification> = Vec::new();

        let old = dialog.begin_load();
        let new = dialog.begin_load();

        assert!(dialog.finish_load(new, fetch_inputs(&mut store), &mut sink));
        assert!(!dialog.finish_load(old, Err(anyhow::anyhow!("late failure")), &mut sink));

        assert_eq!(dialog.available_resources().len(), 3);
        assert!(sink.is_empty(), "stale failure must not notify");
    }

    #[test]
    fn test_selection_resets_quantity_and_bound() {
        let mut store = store();
        store.allocations.push(Allocation::from_new(&crate::entities::NewAllocation {
            project_id: "other".to_string(),
            resource_id: "r-bricks".to_string(),
            quantity: 85.0,
        }));
        let mut dialog = loaded(&mut store);

        dialog.select_resource("r-drill").unwrap();
        dialog.set_quantity(40.0);
        assert_eq!(dialog.max_quantity(), 50.0);

        dialog.select_resource("r-bricks").unwrap();

        assert_eq!(dialog.quantity(), 1.0);
        assert_eq!(dialog.max_quantity(), 15.0);
        assert!(dialog.validate_input().is_ok());
    }

    #[test]
    fn test_unknown_selection_is_rejected() {
        let mut store = store();
        let mut dialog = loaded(&mut store);

        let err = dialog.select_resource("r-ghost").unwrap_err();

        assert!(matches!(err, AllocationError::Selection(_)));
        assert_eq!(dialog.selected_id(), None);
    }

    #[test]
    fn test_submit_success() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();
        let mut added = 0;

        dialog.select_resource("r-drill").unwrap();
        dialog.set_quantity(50.0);
        let allocation = dialog.submit(&mut store, &mut sink, || added += 1).unwrap();

        assert_eq!(added, 1);
        assert!(!allocation.consumed);
        assert_eq!(allocation.project_id, "project-1");
        assert_eq!(store.allocations.len(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].severity, Severity::Success);
        assert!(!dialog.is_submitting());
    }

    #[test]
    fn test_fractional_remaining_stock_can_be_claimed_exactly() {
        let mut store = MemoryStore::with_resources(vec![Resource::new("r-wire", "Copper wire", 0.3)]);
        store
            .insert_allocation(&crate::entities::NewAllocation {
                project_id: "other".to_string(),
                resource_id: "r-wire".to_string(),
                quantity: 0.1,
            })
            .unwrap();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();

        dialog.select_resource("r-wire").unwrap();
        assert_eq!(dialog.max_quantity(), 0.2);

        dialog.set_quantity(0.2);
        dialog.submit(&mut store, &mut sink, || {}).unwrap();

        assert_eq!(store.allocations.len(), 2);
        assert_eq!(sink[0].severity, Severity::Success);
    }

    #[test]
    fn test_submit_without_selection() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();

        let err = dialog.submit(&mut store, &mut sink, || panic!("not added")).unwrap_err();

        assert!(matches!(err, AllocationError::Selection(_)));
        assert_eq!(store.insert_calls, 0);
        assert_eq!(sink[0].title, "No resource selected");
    }

    #[test]
    fn test_submit_above_bound_never_reaches_store() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();

        dialog.select_resource("r-drill").unwrap();
        dialog.set_quantity(51.0);
        let err = dialog.submit(&mut store, &mut sink, || panic!("not added")).unwrap_err();

        assert!(matches!(err, AllocationError::Validation(_)));
        assert_eq!(store.insert_calls, 0);
        assert!(!dialog.is_submitting());
    }

    #[test]
    fn test_current_availability_is_rechecked_before_insert() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();

        // Bound captured at 50, then someone else takes 47 and the list refreshes
        dialog.select_resource("r-drill").unwrap();
        store.allocations.push(Allocation::from_new(&crate::entities::NewAllocation {
            project_id: "other".to_string(),
            resource_id: "r-drill".to_string(),
            quantity: 47.0,
        }));
        assert!(dialog.load(&mut store, &mut sink));
        dialog.set_quantity(5.0);

        assert!(dialog.validate_input().is_ok(), "captured bound still allows 5");
        let err = dialog.submit(&mut store, &mut sink, || panic!("not added")).unwrap_err();

        assert_eq!(
            err,
            AllocationError::Validation("Quantity cannot exceed available amount (3)".to_string())
        );
        assert_eq!(store.insert_calls, 0);
    }

    #[test]
    fn test_failed_submit_returns_to_idle() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();
        store.fail_insert = true;

        dialog.select_resource("r-drill").unwrap();
        let err = dialog.submit(&mut store, &mut sink, || panic!("not added")).unwrap_err();

        assert!(matches!(err, AllocationError::Persistence(_)));
        assert!(!dialog.is_submitting());
        assert_eq!(sink.last().unwrap().title, "Error");

        // Form stays usable for a retry
        store.fail_insert = false;
        let mut added = 0;
        dialog.submit(&mut store, &mut sink, || added += 1).unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn test_second_submission_while_busy_is_refused() {
        let mut store = store();
        let mut dialog = loaded(&mut store);
        let mut sink: Vec<Notification> = Vec::new();

        dialog.select_resource("r-drill").unwrap();
        let pending = dialog.begin_submit(&mut sink).unwrap();
        assert!(dialog.is_submitting());

        let err = dialog.begin_submit(&mut sink).unwrap_err();
        assert_eq!(err, AllocationError::Busy);

        let result = pending.execute(&mut store);
        dialog.finish_submit(result, &mut sink, || {}).unwrap();
        assert!(!dialog.is_submitting());
        assert_eq!(store.insert_calls, 1);
    }
}
