// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use resource_allocation::{
    annotate_all, get_all_allocations, get_allocations_for_project, get_resources_by_name,
    insert_resources, load_resources_csv, logging, Config,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            logging::init(&config.log_level);
            let csv_path = args.get(2).context("Usage: resource-allocation import <resources.csv>")?;
            run_import(&config, Path::new(csv_path))
        }
        Some("list") => {
            logging::init(&config.log_level);
            let json = args.iter().skip(2).any(|a| a == "--json");
            run_list(&config, json)
        }
        Some("allocations") => {
            logging::init(&config.log_level);
            let project_id = args.get(2).context("Usage: resource-allocation allocations <project_id>")?;
            run_allocations(&config, project_id)
        }
        Some("dialog") => {
            let project_id = args.get(2).context("Usage: resource-allocation dialog <project_id>")?;
            run_dialog(&config, project_id)
        }
        Some("help") | Some("--help") | Some("-h") | None => {
            print_usage();
            Ok(())
        }
        // A bare project id opens the dialog
        Some(project_id) => run_dialog(&config, project_id),
    }
}

fn print_usage() {
    println!("resource-allocation {}", resource_allocation::VERSION);
    println!();
    println!("Usage:");
    println!("  resource-allocation import <resources.csv>   Import resources");
    println!("  resource-allocation list [--json]            Show availability of all resources");
    println!("  resource-allocation allocations <project>    Show a project's allocations");
    println!("  resource-allocation dialog <project>         Add resources to a project");
    println!();
    println!("Environment: ALLOC_DB_PATH, ALLOC_LOG_LEVEL, ALLOC_LOG_FILE");
}

fn open_existing(config: &Config) -> Result<Connection> {
    if !config.db_path.exists() {
        bail!(
            "Database not found at {:?}. Run `resource-allocation import <resources.csv>` first.",
            config.db_path
        );
    }
    resource_allocation::open(&config.db_path)
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📦 Resource Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let resources = load_resources_csv(csv_path)?;
    println!("✓ Loaded {} resources from CSV", resources.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = resource_allocation::open(&config.db_path)?;
    println!("✓ Database ready at {:?}", config.db_path);

    // 3. Upsert resources
    println!("\n💾 Writing resources...");
    let written = insert_resources(&conn, &resources)?;
    println!("✓ Written: {} resources", written);

    Ok(())
}

fn run_list(config: &Config, json: bool) -> Result<()> {
    let conn = open_existing(config)?;
    let resources = get_resources_by_name(&conn)?;
    let allocations = get_all_allocations(&conn)?;
    let views = annotate_all(&resources, &allocations);

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    println!(
        "{:<30} {:>10} {:>10} {:>10}  {:<8} {:<12}",
        "Name", "Quantity", "Allocated", "Available", "Unit", "Status"
    );
    for view in &views {
        println!(
            "{:<30} {:>10} {:>10} {:>10}  {:<8} {:<12}",
            view.name(),
            view.resource.quantity,
            view.allocated,
            view.available,
            view.resource.unit,
            view.status.as_str()
        );
    }

    Ok(())
}

fn run_allocations(config: &Config, project_id: &str) -> Result<()> {
    let conn = open_existing(config)?;
    let allocations = get_allocations_for_project(&conn, project_id)?;

    println!("Allocations for project {}: {}", project_id, allocations.len());
    for allocation in &allocations {
        println!(
            "  {}  {:<20} {:>10}  {}  {}",
            allocation.created_at.format("%Y-%m-%d %H:%M"),
            allocation.resource_id,
            allocation.quantity,
            if allocation.consumed { "consumed" } else { "outstanding" },
            allocation.id
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_dialog(config: &Config, project_id: &str) -> Result<()> {
    logging::init_file(&config.log_level, &config.dialog_log_file())?;

    let conn = open_existing(config)?;
    let mut store = resource_allocation::SqliteStore::new(&conn);

    let mut app = ui::App::new(project_id);
    ui::run_ui(&mut app, &mut store)?;

    println!(
        "\n✅ Dialog closed: {} allocation(s) added to project {}",
        app.added_count, project_id
    );

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_dialog(_config: &Config, _project_id: &str) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin allocation-server --features server");
    std::process::exit(1);
}
