//! Table-formatted output for CLI.

use std::net::IpAddr;

use comfy_table::{Cell, ContentArrangement, Table};
use nearby_core::HostSnapshot;

use super::OutputFormatter;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_hosts(&self, hosts: &HostSnapshot) -> String {
        if hosts.is_empty() {
            return "No peers found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Address", "Name"]);

        for peer in hosts.iter() {
            table.add_row(vec![
                Cell::new(peer.address().to_string()),
                Cell::new(peer.name()),
            ]);
        }

        format!("{}\n\nFound {} peer(s)", table, hosts.len())
    }

    fn format_addresses(&self, addrs: &[IpAddr]) -> String {
        if addrs.is_empty() {
            return "No local addresses found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Local Address", "Family"]);

        for addr in addrs {
            let family = if addr.is_ipv4() { "IPv4" } else { "IPv6" };
            table.add_row(vec![Cell::new(addr.to_string()), Cell::new(family)]);
        }

        table.to_string()
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}
