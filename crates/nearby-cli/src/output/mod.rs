//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use std::net::IpAddr;

use nearby_core::HostSnapshot;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the discovered hosts
    fn format_hosts(&self, hosts: &HostSnapshot) -> String;

    /// Format this host's own addresses
    fn format_addresses(&self, addrs: &[IpAddr]) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
