use crate::entities::{round_quantity, Allocation, NewAllocation, Resource};
use crate::error::{InsufficientQuantity, UnknownResource};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use tracing::{debug, info};

/// Open (or create) the allocation database and make sure the schema exists.
pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    setup_database(&conn)?;
    info!(path = %db_path.display(), "database opened");
    Ok(conn)
}

/// In-memory database with the schema applied. Used by tests and demos.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Resources Table (owned by the inventory system)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resources (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            unit TEXT NOT NULL,
            quantity REAL NOT NULL CHECK (quantity >= 0),
            cost_per_unit REAL NOT NULL DEFAULT 0,
            returnable INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    // ==========================================================================
    // Allocations Table (append-only from this crate)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resource_allocations (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            resource_id TEXT NOT NULL REFERENCES resources(id),
            quantity REAL NOT NULL CHECK (quantity > 0),
            consumed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resources_name ON resources(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_allocations_resource ON resource_allocations(resource_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_allocations_project ON resource_allocations(project_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// RESOURCES
// ============================================================================

/// Read resources from a CSV export of the inventory system.
///
/// Expected headers: id, name, type, unit, quantity, cost_per_unit,
/// returnable, status (status may be omitted).
pub fn load_resources_csv(csv_path: &Path) -> Result<Vec<Resource>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut resources = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let resource: Resource = result.context("Failed to deserialize resource")?;

        if resource.id.trim().is_empty() {
            bail!("Resource on line {} has an empty id", line + 2);
        }
        if !(resource.quantity >= 0.0) {
            bail!(
                "Resource {} has invalid quantity {}",
                resource.id,
                resource.quantity
            );
        }

        resources.push(resource);
    }

    Ok(resources)
}

/// Insert or update resources by id. Returns the number of rows written.
pub fn insert_resources(conn: &Connection, resources: &[Resource]) -> Result<usize> {
    let mut written = 0;

    for resource in resources {
        written += conn.execute(
            "INSERT INTO resources (id, name, type, unit, quantity, cost_per_unit, returnable, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                type = excluded.type,
                unit = excluded.unit,
                quantity = excluded.quantity,
                cost_per_unit = excluded.cost_per_unit,
                returnable = excluded.returnable,
                status = excluded.status",
            params![
                resource.id,
                resource.name,
                resource.resource_type,
                resource.unit,
                resource.quantity,
                resource.cost_per_unit,
                resource.returnable,
                resource.status,
            ],
        )?;
    }

    debug!(count = written, "resources written");
    Ok(written)
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        name: row.get(1)?,
        resource_type: row.get(2)?,
        unit: row.get(3)?,
        quantity: row.get(4)?,
        cost_per_unit: row.get(5)?,
        returnable: row.get(6)?,
        status: row.get(7)?,
    })
}

/// All resources in ascending name order.
pub fn get_resources_by_name(conn: &Connection) -> Result<Vec<Resource>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, type, unit, quantity, cost_per_unit, returnable, status
         FROM resources
         ORDER BY name ASC",
    )?;

    let resources = stmt
        .query_map([], resource_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(resources)
}

pub fn get_resource(conn: &Connection, resource_id: &str) -> Result<Option<Resource>> {
    let resource = conn
        .query_row(
            "SELECT id, name, type, unit, quantity, cost_per_unit, returnable, status
             FROM resources
             WHERE id = ?1",
            params![resource_id],
            resource_from_row,
        )
        .optional()?;

    Ok(resource)
}

// ============================================================================
// ALLOCATIONS
// ============================================================================

fn allocation_from_row(row: &Row<'_>) -> rusqlite::Result<Allocation> {
    let created_at_str: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Allocation {
        id: row.get(0)?,
        project_id: row.get(1)?,
        resource_id: row.get(2)?,
        quantity: row.get(3)?,
        consumed: row.get(4)?,
        created_at,
    })
}

pub fn get_all_allocations(conn: &Connection) -> Result<Vec<Allocation>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, resource_id, quantity, consumed, created_at
         FROM resource_allocations
         ORDER BY created_at ASC",
    )?;

    let allocations = stmt
        .query_map([], allocation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(allocations)
}

pub fn get_allocations_for_project(conn: &Connection, project_id: &str) -> Result<Vec<Allocation>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, resource_id, quantity, consumed, created_at
         FROM resource_allocations
         WHERE project_id = ?1
         ORDER BY created_at ASC",
    )?;

    let allocations = stmt
        .query_map(params![project_id], allocation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(allocations)
}

fn write_allocation(conn: &Connection, allocation: &Allocation) -> Result<()> {
    conn.execute(
        "INSERT INTO resource_allocations (
            id, project_id, resource_id, quantity, consumed, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            allocation.id,
            allocation.project_id,
            allocation.resource_id,
            allocation.quantity,
            allocation.consumed,
            allocation.created_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

/// Insert one outstanding allocation without looking at availability.
pub fn insert_allocation(conn: &Connection, new: &NewAllocation) -> Result<Allocation> {
    let allocation = Allocation::from_new(new);
    write_allocation(conn, &allocation).context("Failed to insert allocation")?;
    Ok(allocation)
}

/// Insert one outstanding allocation only if the resource still has room.
///
/// Availability is recomputed inside an IMMEDIATE transaction, so a writer
/// that got in between the caller's read and this insert cannot push the
/// resource below zero. Fails with `InsufficientQuantity` or
/// `UnknownResource` (both recoverable through `downcast_ref`).
pub fn insert_allocation_if_available(conn: &Connection, new: &NewAllocation) -> Result<Allocation> {
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let quantity: Option<f64> = tx
        .query_row(
            "SELECT quantity FROM resources WHERE id = ?1",
            params![new.resource_id],
            |row| row.get(0),
        )
        .optional()?;

    let quantity = match quantity {
        Some(q) => q,
        None => return Err(UnknownResource(new.resource_id.clone()).into()),
    };

    let allocated: f64 = tx.query_row(
        "SELECT COALESCE(SUM(quantity), 0.0)
         FROM resource_allocations
         WHERE resource_id = ?1 AND consumed = 0",
        params![new.resource_id],
        |row| row.get(0),
    )?;

    let available = round_quantity(quantity - allocated);
    if round_quantity(new.quantity) > available {
        return Err(InsufficientQuantity {
            resource_id: new.resource_id.clone(),
            requested: new.quantity,
            available,
        }
        .into());
    }

    let allocation = Allocation::from_new(new);
    write_allocation(&tx, &allocation).context("Failed to insert allocation")?;
    tx.commit()?;

    Ok(allocation)
}

/// Finalize an allocation. Called by the inventory side, never by the dialog.
pub fn mark_consumed(conn: &Connection, allocation_id: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE resource_allocations SET consumed = 1 WHERE id = ?1",
        params![allocation_id],
    )?;

    if changed == 0 {
        return Err(anyhow!("Allocation {} not found", allocation_id));
    }

    Ok(())
}

pub fn count_allocations(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM resource_allocations", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        let resources = vec![
            Resource::new("r-cement", "Cement", 10.0),
            Resource::new("r-bricks", "Bricks", 100.0),
            Resource::new("r-anchor", "Anchors", 5.0),
        ];
        insert_resources(&conn, &resources).unwrap();
        conn
    }

    fn request(resource_id: &str, quantity: f64) -> NewAllocation {
        NewAllocation {
            project_id: "project-1".to_string(),
            resource_id: resource_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_resources_are_ordered_by_name() {
        let conn = seeded();

        let names: Vec<_> = get_resources_by_name(&conn)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();

        assert_eq!(names, vec!["Anchors", "Bricks", "Cement"]);
    }

    #[test]
    fn test_insert_resources_upserts_by_id() {
        let conn = seeded();

        let mut updated = Resource::new("r-cement", "Cement", 40.0);
        updated.returnable = true;
        insert_resources(&conn, &[updated]).unwrap();

        let cement = get_resource(&conn, "r-cement").unwrap().unwrap();
        assert_eq!(cement.quantity, 40.0);
        assert!(cement.returnable);
        assert_eq!(get_resources_by_name(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_insert_allocation_roundtrip() {
        let conn = seeded();

        let inserted = insert_allocation(&conn, &request("r-bricks", 12.5)).unwrap();
        let all = get_all_allocations(&conn).unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, inserted.id);
        assert_eq!(all[0].quantity, 12.5);
        assert!(!all[0].consumed);
        assert_eq!(all[0].project_id, "project-1");
    }

    #[test]
    fn test_conditional_insert_rejects_over_allocation() {
        let conn = seeded();

        insert_allocation_if_available(&conn, &request("r-cement", 8.0)).unwrap();
        let err = insert_allocation_if_available(&conn, &request("r-cement", 3.0)).unwrap_err();

        let insufficient = err
            .downcast_ref::<InsufficientQuantity>()
            .expect("should be an InsufficientQuantity error");
        assert_eq!(insufficient.available, 2.0);
        assert_eq!(count_allocations(&conn).unwrap(), 1, "nothing written on rejection");
    }

    #[test]
    fn test_conditional_insert_allows_exact_fit() {
        let conn = seeded();

        insert_allocation_if_available(&conn, &request("r-anchor", 5.0)).unwrap();

        assert_eq!(count_allocations(&conn).unwrap(), 1);
    }

    #[test]
    fn test_conditional_insert_allows_fractional_exact_fit() {
        let conn = open_in_memory().unwrap();
        insert_resources(&conn, &[Resource::new("r-wire", "Copper wire", 0.3)]).unwrap();

        insert_allocation_if_available(&conn, &request("r-wire", 0.1)).unwrap();
        insert_allocation_if_available(&conn, &request("r-wire", 0.2)).unwrap();
        let err = insert_allocation_if_available(&conn, &request("r-wire", 0.000001)).unwrap_err();

        assert_eq!(err.downcast_ref::<InsufficientQuantity>().unwrap().available, 0.0);
        assert_eq!(count_allocations(&conn).unwrap(), 2);
    }

    #[test]
    fn test_conditional_insert_ignores_consumed_allocations() {
        let conn = seeded();

        let first = insert_allocation_if_available(&conn, &request("r-anchor", 5.0)).unwrap();
        mark_consumed(&conn, &first.id).unwrap();

        insert_allocation_if_available(&conn, &request("r-anchor", 5.0)).unwrap();
        assert_eq!(count_allocations(&conn).unwrap(), 2);
    }

    #[test]
    fn test_conditional_insert_unknown_resource() {
        let conn = seeded();

        let err = insert_allocation_if_available(&conn, &request("missing", 1.0)).unwrap_err();

        assert!(err.downcast_ref::<UnknownResource>().is_some());
    }

    #[test]
    fn test_mark_consumed_unknown_allocation() {
        let conn = seeded();

        assert!(mark_consumed(&conn, "nope").is_err());
    }

    #[test]
    fn test_allocations_for_project() {
        let conn = seeded();

        insert_allocation(&conn, &request("r-bricks", 1.0)).unwrap();
        insert_allocation(
            &conn,
            &NewAllocation {
                project_id: "project-2".to_string(),
                resource_id: "r-bricks".to_string(),
                quantity: 2.0,
            },
        )
        .unwrap();

        let project_two = get_allocations_for_project(&conn, "project-2").unwrap();
        assert_eq!(project_two.len(), 1);
        assert_eq!(project_two[0].quantity, 2.0);
    }

    #[test]
    fn test_load_resources_csv() {
        let path = std::env::temp_dir().join(format!("resources-{}.csv", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "id,name,type,unit,quantity,cost_per_unit,returnable,status").unwrap();
            writeln!(file, "r1,Excavator,Equipment,units,2,350.0,true,Available").unwrap();
            writeln!(file, "r2,Cement,Material,bags,120,8.5,false,Available").unwrap();
        }

        let resources = load_resources_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].resource_type, "Equipment");
        assert!(resources[0].returnable);
        assert_eq!(resources[1].quantity, 120.0);
    }

    #[test]
    fn test_load_resources_csv_rejects_negative_quantity() {
        let path = std::env::temp_dir().join(format!("resources-{}.csv", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "id,name,type,unit,quantity,cost_per_unit,returnable,status").unwrap();
            writeln!(file, "r1,Broken,Material,bags,-4,1.0,false,").unwrap();
        }

        let result = load_resources_csv(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
