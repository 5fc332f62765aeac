//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// nearby - discover devices announcing themselves on the local network
#[derive(Parser, Debug)]
#[command(name = "nearby")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON config file (default: platform config directory)
    #[arg(long, global = true, env = "NEARBY_CONFIG")]
    pub config: Option<PathBuf>,

    /// UDP discovery port
    #[arg(long, global = true, env = "NEARBY_PORT")]
    pub port: Option<u16>,

    /// Staleness interval in milliseconds
    #[arg(long, global = true, env = "NEARBY_STALE_MS")]
    pub stale_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover devices on the network
    Discover(DiscoverArgs),

    /// Broadcast this device's name
    Announce(AnnounceArgs),

    /// List this host's own addresses (filtered from discovery)
    Interfaces,
}

// ==================== Discover ====================

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Watch mode - continuously discover devices
    #[arg(short, long)]
    pub watch: bool,

    /// Discovery duration in seconds (ignored in watch mode)
    #[arg(short, long, default_value = "5")]
    pub duration: u64,

    /// Also list announcements sent from this host
    #[arg(long)]
    pub self_inclusive: bool,

    /// How often watch mode re-reads local addresses, in seconds
    #[arg(long, default_value = "30")]
    pub refresh_interval: u64,
}

// ==================== Announce ====================

#[derive(Args, Debug)]
pub struct AnnounceArgs {
    /// Display name to announce
    pub name: String,

    /// Interval between announcements in milliseconds
    #[arg(short, long, default_value = "2000")]
    pub interval: u64,

    /// Number of announcements to send (default: until Ctrl+C)
    #[arg(short, long)]
    pub count: Option<u64>,

    /// Destination address (default: 255.255.255.255)
    #[arg(long)]
    pub target: Option<std::net::Ipv4Addr>,
}
