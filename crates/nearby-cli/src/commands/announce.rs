//! Announce command implementation.

use std::net::SocketAddr;
use std::time::Duration;

use nearby_core::announce::{broadcast_target, Announcer};
use nearby_core::DiscoveryConfig;

use crate::cli::AnnounceArgs;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the announce command
pub async fn run_announce(
    args: AnnounceArgs,
    config: &DiscoveryConfig,
    json: bool,
) -> Result<(), CliError> {
    if args.interval == 0 {
        return Err(CliError::InvalidArgument(
            "interval must be greater than zero".to_string(),
        ));
    }
    if args.name.trim().is_empty() {
        return Err(CliError::InvalidArgument("name must not be empty".to_string()));
    }

    let formatter = get_formatter(json);
    let target = match args.target {
        Some(ip) => SocketAddr::from((ip, config.port)),
        None => broadcast_target(config.port),
    };
    let interval = Duration::from_millis(args.interval);
    let announcer = Announcer::bind(&args.name, target).await?;

    match args.count {
        Some(count) => {
            for sent in 0..count {
                if sent > 0 {
                    tokio::time::sleep(interval).await;
                }
                announcer.announce_once().await?;
            }
            println!(
                "{}",
                formatter.format_message(&format!(
                    "Sent {} announcement(s) of '{}' to {}",
                    count,
                    args.name.trim(),
                    target
                ))
            );
        }
        None => {
            eprintln!(
                "Announcing '{}' to {} every {} ms (press Ctrl+C to stop)...",
                args.name.trim(),
                target,
                args.interval
            );
            tokio::select! {
                _ = announcer.run(interval) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
    }

    Ok(())
}
