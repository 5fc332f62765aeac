//! JSON-formatted output for CLI.

use std::net::IpAddr;

use nearby_core::HostSnapshot;
use serde::Serialize;
use serde_json::json;

use super::OutputFormatter;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_hosts(&self, hosts: &HostSnapshot) -> String {
        Self::to_json(&json!({
            "hosts": hosts,
            "count": hosts.len()
        }))
    }

    fn format_addresses(&self, addrs: &[IpAddr]) -> String {
        Self::to_json(&json!({
            "addresses": addrs,
            "count": addrs.len()
        }))
    }

    fn format_message(&self, message: &str) -> String {
        Self::to_json(&json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearby_core::Peer;

    #[test]
    fn test_format_hosts() {
        let hosts: HostSnapshot = [
            Peer::new("192.168.1.40".parse().unwrap(), "Phone"),
            Peer::new("192.168.1.7".parse().unwrap(), "Laptop"),
        ]
        .into_iter()
        .collect();
        let value: serde_json::Value =
            serde_json::from_str(&JsonOutput::new().format_hosts(&hosts)).unwrap();

        assert_eq!(value["count"], 2);
        assert_eq!(value["hosts"][0]["address"], "192.168.1.7");
        assert_eq!(value["hosts"][0]["name"], "Laptop");
        assert_eq!(value["hosts"][1]["name"], "Phone");
    }

    #[test]
    fn test_format_no_hosts() {
        let hosts: HostSnapshot = std::iter::empty::<Peer>().collect();
        let value: serde_json::Value =
            serde_json::from_str(&JsonOutput::new().format_hosts(&hosts)).unwrap();

        assert_eq!(value["count"], 0);
        assert_eq!(value["hosts"], serde_json::json!([]));
    }

    #[test]
    fn test_format_addresses() {
        let addrs: Vec<IpAddr> = vec!["192.168.1.2".parse().unwrap()];
        let value: serde_json::Value =
            serde_json::from_str(&JsonOutput::new().format_addresses(&addrs)).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["addresses"][0], "192.168.1.2");
    }

    #[test]
    fn test_format_message() {
        let value: serde_json::Value =
            serde_json::from_str(&JsonOutput::new().format_message("sent")).unwrap();
        assert_eq!(value["message"], "sent");
    }
}
