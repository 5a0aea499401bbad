// 🗄️ Allocation Store - the request/response boundary the dialog talks to
//
// The dialog only needs three calls: list resources by name, list
// allocations, insert one allocation. SqliteStore backs them with the db
// module; tests plug in their own implementations.

use crate::db;
use crate::entities::{Allocation, NewAllocation, Resource};
use anyhow::Result;
use rusqlite::Connection;

pub trait AllocationStore {
    /// All resources, ascending by name.
    fn list_resources_by_name(&mut self) -> Result<Vec<Resource>>;

    fn list_allocations(&mut self) -> Result<Vec<Allocation>>;

    /// Persist one outstanding allocation. Either the row is fully written or
    /// nothing is.
    fn insert_allocation(&mut self, new: &NewAllocation) -> Result<Allocation>;
}

/// SQLite-backed store. Inserts go through the conditional insert so the
/// database itself refuses over-allocation.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SqliteStore { conn }
    }
}

impl AllocationStore for SqliteStore<'_> {
    fn list_resources_by_name(&mut self) -> Result<Vec<Resource>> {
        db::get_resources_by_name(self.conn)
    }

    fn list_allocations(&mut self) -> Result<Vec<Allocation>> {
        db::get_all_allocations(self.conn)
    }

    fn insert_allocation(&mut self, new: &NewAllocation) -> Result<Allocation> {
        db::insert_allocation_if_available(self.conn, new)
    }
}

/// Fetch both collections the calculator needs.
pub fn fetch_inputs<S: AllocationStore + ?Sized>(store: &mut S) -> Result<(Vec<Resource>, Vec<Allocation>)> {
    let resources = store.list_resources_by_name()?;
    let allocations = store.list_allocations()?;
    Ok((resources, allocations))
}
