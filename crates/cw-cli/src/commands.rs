use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use cw_protocol::feedback::{describe_stock, listing_lines, EMPTY_WAREHOUSE};
use cw_server::{RemoteTransport, ServerConfig, WarehouseServer};
use cw_store::{FileDurableStore, SnapshotStore};
use cw_sync::{SessionEvent, ViewerSession};
use cw_types::{ResourceCatalog, ResourceType, Snapshot, Timestamp};
use cw_view::ListView;
use tracing::debug;

use crate::cli::*;

const DEFAULT_CONFIG_FILE: &str = "warehouse.toml";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::List(args) => cmd_list(config, args, &cli.format).await,
        Command::Query(args) => cmd_query(config, args, &cli.format).await,
        Command::Config(args) => cmd_config(config, args, &cli.format),
    }
}

/// The file named by `--config`, else `./warehouse.toml` if it exists, else
/// the defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => Ok(ServerConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(ServerConfig::load(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(ServerConfig::default()),
    }
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(addr) = args.protocol_addr {
        config.protocol_addr = addr;
    }
    if let Some(addr) = args.http_addr {
        config.http_addr = addr;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(world) = args.world {
        config.world = world;
    }
    println!(
        "{} Serving world {} from {}",
        "✓".green().bold(),
        config.world.yellow(),
        config.data_dir.display().to_string().bold()
    );
    println!("  Protocol: {}", config.protocol_addr.to_string().cyan());
    println!("  HTTP:     {}", config.http_addr.to_string().cyan());
    WarehouseServer::new(config)?.serve().await?;
    Ok(())
}

async fn cmd_list(config: ServerConfig, args: ListArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let catalog = config.load_catalog()?;
    let snapshot = read_snapshot(&config, &args.source).await?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let Some(filter) = args.filter else {
        for line in listing_lines(&snapshot, &catalog) {
            println!("{line}");
        }
        return Ok(());
    };

    let mut view = ListView::new();
    view.set_filter(filter);
    let rows = view.rows(Some(&snapshot), &catalog);
    if rows.is_empty() {
        println!("{}", EMPTY_WAREHOUSE.dimmed());
        return Ok(());
    }
    for row in rows {
        println!("{:>3}. {}", row.ordinal.to_string().dimmed(), row.label());
    }
    Ok(())
}

async fn cmd_query(config: ServerConfig, args: QueryArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let resource = ResourceType::new(args.resource.as_str())
        .with_context(|| format!("invalid resource identifier {:?}", args.resource))?;
    let catalog = config.load_catalog()?;
    let snapshot = read_snapshot(&config, &args.source).await?;
    let quantity = snapshot.quantity(&resource);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "resource": resource.as_str(), "quantity": quantity })
        ),
        OutputFormat::Text => {
            println!("{}", describe_stock(&resource, quantity, &catalog));
            if !catalog.contains(&resource) {
                println!("  {}", "(not in the resource catalog)".dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_config(config: ServerConfig, args: ConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = if args.default { ServerConfig::default() } else { config };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

/// Current snapshot of the selected world, from disk or from a server.
async fn read_snapshot(config: &ServerConfig, source: &SourceArgs) -> anyhow::Result<Snapshot> {
    if let Some(addr) = source.remote {
        let catalog: Arc<dyn ResourceCatalog> = Arc::new(config.load_catalog()?);
        return fetch_remote(addr, catalog).await;
    }
    let world = source.world.as_deref().unwrap_or(&config.world);
    let dir = source.data_dir.as_deref().unwrap_or(&config.data_dir);
    debug!(dir = %dir.display(), world, "reading snapshot from disk");
    read_local(dir, world)
}

fn read_local(dir: &Path, world: &str) -> anyhow::Result<Snapshot> {
    if !dir.is_dir() {
        bail!("data directory {} does not exist", dir.display());
    }
    let store = SnapshotStore::new(Arc::new(FileDurableStore::open(dir)?));
    let snapshot = store
        .load(world)
        .with_context(|| format!("reading world {world}"))?;
    Ok(snapshot.unwrap_or_else(|| Snapshot::empty(Timestamp::zero())))
}

async fn fetch_remote(
    addr: std::net::SocketAddr,
    catalog: Arc<dyn ResourceCatalog>,
) -> anyhow::Result<Snapshot> {
    let transport = RemoteTransport::connect(addr, "cw-cli").await?;
    debug!(%addr, world = transport.world(), "connected to warehouse server");
    let mut session = ViewerSession::new(transport, catalog);
    session.request_snapshot().await?;

    let wait = async {
        loop {
            match session.next_event().await? {
                Some(SessionEvent::Snapshot { .. }) => return anyhow::Ok(()),
                Some(SessionEvent::Error { code, message }) => bail!("server error {code}: {message}"),
                Some(_) => {}
                None => bail!("server closed the connection"),
            }
        }
    };
    tokio::time::timeout(REMOTE_TIMEOUT, wait)
        .await
        .with_context(|| format!("no snapshot from {addr}"))??;

    session
        .cache()
        .snapshot()
        .cloned()
        .context("server sent no snapshot")
}
