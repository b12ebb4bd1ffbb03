use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cw",
    about = "Cloud Warehouse: a shared, server-authoritative resource store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Server configuration file [default: ./warehouse.toml when present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the warehouse server
    Serve(ServeArgs),
    /// List the warehouse contents
    List(ListArgs),
    /// Show the stock of one resource type
    Query(QueryArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
}

/// Where to read a warehouse from: a data directory, or a running server.
#[derive(Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// World to read
    #[arg(short, long)]
    pub world: Option<String>,

    /// Data directory holding the snapshot files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Read from a running server's protocol address instead of the files
    #[arg(long)]
    pub remote: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub protocol_addr: Option<SocketAddr>,

    #[arg(long)]
    pub http_addr: Option<SocketAddr>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub world: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only show types whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Resource identifier, e.g. minecraft:wheat
    pub resource: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the loaded file
    #[arg(long)]
    pub default: bool,
}
