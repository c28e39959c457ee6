//! Export ledger read models as CSV.
//!
//! Reads `STOCKROOM_*` configuration from the environment; a database URL is
//! required. Output goes to stdout unless `--output` is given.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use stockroom_auth::Principal;
use stockroom_core::{Actor, DeviceId, UserId, WarehouseId};
use stockroom_export::{write_audit_log, write_stock, write_timeline};
use stockroom_infra::event_store::PostgresEventStore;
use stockroom_infra::{InventoryService, StockroomConfig};
use stockroom_inventory::{DashboardFilter, SortDirection, SortField};

#[derive(Parser)]
#[command(name = "stockroom-export", about = "Export stockroom ledger views as CSV", version)]
struct Cli {
    /// Write to this file instead of stdout.
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,
    /// Name recorded as the exporting user in logs.
    #[arg(long, global = true, default_value = "export")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Every live device and in-stock part.
    Inventory,
    /// The dashboard as filtered.
    View(ViewArgs),
    /// The audit log, newest first.
    Audit,
    /// One device's history, newest first.
    Timeline {
        #[arg(long)]
        device: DeviceId,
    },
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long)]
    warehouse: Option<WarehouseId>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "name")]
    sort: SortField,
    #[arg(long, default_value = "asc")]
    direction: SortDirection,
}

fn main() -> Result<()> {
    stockroom_observability::init();
    let cli = Cli::parse();

    let config = StockroomConfig::from_env().context("invalid configuration")?;
    let Some(database_url) = config.database_url.as_deref() else {
        bail!("STOCKROOM_DATABASE_URL must be set");
    };
    let store = PostgresEventStore::connect(database_url).context("failed to open event store")?;
    let service = InventoryService::open(store, &config).context("failed to load ledger")?;
    let principal = Principal::operator(Actor::new(UserId::from_uuid(Uuid::nil()), cli.user));

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match cli.command {
        Commands::Inventory => {
            let dashboard = service.export_inventory(&principal)?;
            write_stock(&dashboard, &mut out)?;
        }
        Commands::View(args) => {
            let mut filter = DashboardFilter::default().sorted_by(args.sort, args.direction);
            filter.warehouse = args.warehouse;
            filter.search = args.search;
            let dashboard = service.export_view(&principal, &filter)?;
            write_stock(&dashboard, &mut out)?;
        }
        Commands::Audit => {
            let entries = service.export_audit_log(&principal)?;
            write_audit_log(&entries, &mut out)?;
        }
        Commands::Timeline { device } => {
            let events = service.export_timeline(&principal, device)?;
            write_timeline(&events, &mut out)?;
        }
    }

    info!(version = service.dispatcher().version()?, "export written");
    Ok(())
}
