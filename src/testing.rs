// In-memory store for unit tests. Counts calls so tests can assert that
// rejected submissions never reached the store.

use crate::entities::{Allocation, NewAllocation, Resource};
use crate::store::AllocationStore;
use anyhow::{anyhow, Result};

#[derive(Default)]
pub struct MemoryStore {
    pub resources: Vec<Resource>,
    pub allocations: Vec<Allocation>,
    pub fail_fetch: bool,
    pub fail_insert: bool,
    pub insert_calls: usize,
}

impl MemoryStore {
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        MemoryStore {
            resources,
            ..Default::default()
        }
    }
}

impl AllocationStore for MemoryStore {
    fn list_resources_by_name(&mut self) -> Result<Vec<Resource>> {
        if self.fail_fetch {
            return Err(anyhow!("connection refused"));
        }
        let mut resources = self.resources.clone();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    fn list_allocations(&mut self) -> Result<Vec<Allocation>> {
        if self.fail_fetch {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.allocations.clone())
    }

    fn insert_allocation(&mut self, new: &NewAllocation) -> Result<Allocation> {
        self.insert_calls += 1;
        if self.fail_insert {
            return Err(anyhow!("insert rejected by backend"));
        }
        let allocation = Allocation::from_new(new);
        self.allocations.push(allocation.clone());
        Ok(allocation)
    }
}
