//! Discover command implementation.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use colored::*;
use nearby_core::{DiscoveryConfig, DiscoveryEvent, DiscoveryService, HostSnapshot};
use tokio::sync::mpsc;

use crate::cli::DiscoverArgs;
use crate::error::CliError;
use crate::output::{get_formatter, OutputFormatter};

/// Run the discover command
pub async fn run_discover(
    args: DiscoverArgs,
    config: DiscoveryConfig,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    let mut service = DiscoveryService::new(config);
    let (tx, events) = mpsc::unbounded_channel();
    service.set_listener(Some(Arc::new(tx)));
    service.start(args.self_inclusive)?;

    let result = if args.watch {
        run_watch_mode(&service, events, &args, formatter.as_ref()).await
    } else {
        run_oneshot_mode(&service, events, &args).await
    };

    service.stop().await?;
    let hosts = result?;

    if !args.watch {
        println!("{}", formatter.format_hosts(&hosts));
        if hosts.is_empty() {
            return Err(CliError::NoPeersFound);
        }
    }

    Ok(())
}

async fn run_oneshot_mode(
    service: &DiscoveryService,
    mut events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    args: &DiscoverArgs,
) -> Result<HostSnapshot, CliError> {
    eprintln!(
        "Discovering peers on UDP port {} for {} seconds...",
        service.config().port,
        args.duration
    );

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(event) = events.recv() => report_failure(&event),
        }
    }

    Ok(service.hosts().await?)
}

async fn run_watch_mode(
    service: &DiscoveryService,
    mut events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    args: &DiscoverArgs,
    formatter: &dyn OutputFormatter,
) -> Result<HostSnapshot, CliError> {
    eprintln!("Watching for peers (press Ctrl+C to stop)...\n");

    // No OS connectivity notifications here, so poll for address changes.
    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_interval.max(1)));
    refresh.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last = service.hosts().await?;
    render_watch(&last, service.config().port, formatter);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                break;
            }
            _ = refresh.tick() => service.on_network_changed(),
            Some(event) = events.recv() => match event {
                DiscoveryEvent::HostsChanged { hosts } => {
                    render_watch(&hosts, service.config().port, formatter);
                    last = hosts;
                }
                other => report_failure(&other),
            },
        }
    }

    Ok(last)
}

fn render_watch(hosts: &HostSnapshot, port: u16, formatter: &dyn OutputFormatter) {
    // Clear screen and print header
    print!("\x1B[2J\x1B[1;1H");
    println!("{}", "Nearby Peer Watch".bold());
    println!(
        "{}",
        format!(
            "UDP port {} - updated {} - Press Ctrl+C to stop",
            port,
            chrono::Local::now().format("%H:%M:%S")
        )
        .as_str()
        .dimmed()
    );
    println!();
    println!("{}", formatter.format_hosts(hosts));

    io::stdout().flush().ok();
}

fn report_failure(event: &DiscoveryEvent) {
    match event {
        DiscoveryEvent::HostsChanged { hosts } => {
            tracing::debug!(count = hosts.len(), "Hosts changed");
        }
        DiscoveryEvent::ReceiveFailed => {
            eprintln!("{} receive failed, still listening", "warning:".yellow());
        }
        DiscoveryEvent::SetupFailed { cause } => {
            eprintln!("{} {}, retrying", "warning:".yellow(), cause);
        }
    }
}
