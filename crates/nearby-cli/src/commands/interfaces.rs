//! Interfaces command implementation.

use nearby_core::LocalAddressSet;

use crate::error::CliError;
use crate::output::get_formatter;

/// Print the addresses discovery treats as this host's own.
pub fn run_interfaces(json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let local_addrs = LocalAddressSet::system();

    println!("{}", formatter.format_addresses(&local_addrs.addresses()));

    Ok(())
}
