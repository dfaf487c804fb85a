//! DHCP scopes and scope-tag assignment.

use std::collections::{BTreeMap, BTreeSet};

use bootsync_types::{Distribution, InterfaceType, MacAddress};
use serde::Serialize;
use serde_json::Value;

use crate::tables::constants::DEFAULT_TAG;

/// One host entry as handed to the DHCP template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeEntry {
    /// Display name (`web1`, `web1-eth1`, `generic3`).
    pub name: String,
    /// Interface name on the machine.
    pub interface: String,
    pub mac_address: MacAddress,
    pub ip_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub dns_name: Option<String>,
    pub interface_type: InterfaceType,
    pub interface_master: Option<String>,
    pub dhcp_tag: Option<String>,
    /// Distribution record, absent for image-based machines.
    pub distro: Option<Distribution>,
    /// IPv4 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_server: Option<String>,
    pub filename: Option<String>,
    pub netboot_enabled: bool,
    pub hostname: String,
    pub owner: String,
    /// IPv4 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_gpxe: Option<bool>,
    pub name_servers: Vec<String>,
    pub mgmt_parameters: BTreeMap<String, Value>,
}

/// Scope tag → hardware address → entry.
///
/// The `default` scope is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DhcpScopes(BTreeMap<String, BTreeMap<MacAddress, ScopeEntry>>);

impl Default for DhcpScopes {
    fn default() -> Self {
        Self(BTreeMap::from([(DEFAULT_TAG.to_string(), BTreeMap::new())]))
    }
}

impl DhcpScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one scope.
    pub fn scope(&self, tag: &str) -> Option<&BTreeMap<MacAddress, ScopeEntry>> {
        self.0.get(tag)
    }

    /// Finds an entry in any scope, returning its tag with it.
    pub fn find(&self, mac: &MacAddress) -> Option<(&str, &ScopeEntry)> {
        self.0
            .iter()
            .find_map(|(tag, entries)| entries.get(mac).map(|e| (tag.as_str(), e)))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates `(tag, entry)` over every scope.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ScopeEntry)> {
        self.0
            .iter()
            .flat_map(|(tag, entries)| entries.values().map(move |e| (tag.as_str(), e)))
    }

    /// Total entries across scopes.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts an entry, replacing any entry with the same MAC in that scope.
    pub fn insert(&mut self, tag: &str, entry: ScopeEntry) -> Option<ScopeEntry> {
        self.0
            .entry(tag.to_string())
            .or_default()
            .insert(entry.mac_address, entry)
    }

    fn remove_everywhere(&mut self, mac: &MacAddress) -> usize {
        self.0
            .values_mut()
            .filter_map(|entries| entries.remove(mac))
            .count()
    }
}

/// Picks scope tags and drops redundant bond/bridge slaves.
#[derive(Debug, Default)]
pub struct ScopeAssigner {
    ignored: BTreeSet<MacAddress>,
}

impl ScopeAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interface tag, else machine tag, else `default`.
    pub fn resolve_tag<'a>(interface_tag: Option<&'a str>, machine_tag: Option<&'a str>) -> &'a str {
        interface_tag
            .filter(|t| !t.is_empty())
            .or_else(|| machine_tag.filter(|t| !t.is_empty()))
            .unwrap_or(DEFAULT_TAG)
    }

    /// Marks a slave MAC for removal from every scope.
    pub fn ignore(&mut self, mac: MacAddress) {
        self.ignored.insert(mac);
    }

    /// Removes every ignored MAC from every scope.
    pub fn prune(&self, scopes: &mut DhcpScopes) {
        for mac in &self.ignored {
            let removed = scopes.remove_everywhere(mac);
            if removed > 0 {
                tracing::debug!(mac = %mac, removed, "Dropped redundant slave entry");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn entry(name: &str, mac: &str) -> ScopeEntry {
        ScopeEntry {
            name: name.to_string(),
            interface: "eth0".to_string(),
            mac_address: mac.parse().unwrap(),
            ip_address: None,
            ipv6_address: None,
            netmask: None,
            gateway: None,
            is_static: false,
            dns_name: None,
            interface_type: InterfaceType::Na,
            interface_master: None,
            dhcp_tag: None,
            distro: None,
            next_server: None,
            filename: None,
            netboot_enabled: true,
            hostname: String::new(),
            owner: String::new(),
            enable_gpxe: None,
            name_servers: Vec::new(),
            mgmt_parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn test_resolve_tag_order() {
        assert_eq!(ScopeAssigner::resolve_tag(Some("rack1"), Some("dc1")), "rack1");
        assert_eq!(ScopeAssigner::resolve_tag(None, Some("dc1")), "dc1");
        assert_eq!(ScopeAssigner::resolve_tag(Some(""), Some("dc1")), "dc1");
        assert_eq!(ScopeAssigner::resolve_tag(None, None), "default");
        assert_eq!(ScopeAssigner::resolve_tag(None, Some("")), "default");
    }

    #[test]
    fn test_default_scope_always_present() {
        let scopes = DhcpScopes::new();
        assert!(scopes.scope("default").is_some());
        assert!(scopes.is_empty());
        assert_eq!(serde_json::to_value(&scopes).unwrap(), serde_json::json!({"default": {}}));
    }

    #[test]
    fn test_insert_overwrites_same_mac_in_scope() {
        let mut scopes = DhcpScopes::new();
        assert!(scopes.insert("default", entry("a", "aa:00:00:00:00:01")).is_none());
        let old = scopes.insert("default", entry("b", "aa:00:00:00:00:01"));

        assert_eq!(old.unwrap().name, "a");
        assert_eq!(scopes.len(), 1);
        let (tag, found) = scopes.find(&"aa:00:00:00:00:01".parse().unwrap()).unwrap();
        assert_eq!((tag, found.name.as_str()), ("default", "b"));
    }

    #[test]
    fn test_prune_removes_from_every_scope() {
        let mut scopes = DhcpScopes::new();
        scopes.insert("default", entry("a", "aa:00:00:00:00:01"));
        scopes.insert("rack1", entry("b", "aa:00:00:00:00:02"));
        scopes.insert("rack2", entry("c", "aa:00:00:00:00:02"));

        let mut assigner = ScopeAssigner::new();
        assigner.ignore("aa:00:00:00:00:02".parse().unwrap());
        assigner.prune(&mut scopes);

        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes.tags().collect::<Vec<_>>(), vec!["default", "rack1", "rack2"]);
        assert!(scopes.scope("rack1").unwrap().is_empty());
    }

    #[test]
    fn test_entry_serialization_omits_v4_only_fields() {
        let v6 = serde_json::to_value(entry("web1", "aa:bb:cc:dd:ee:ff")).unwrap();
        assert!(v6.get("next_server").is_none());
        assert!(v6.get("enable_gpxe").is_none());
        assert_eq!(v6["mac_address"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(v6["static"], false);
        assert_eq!(v6["interface_type"], "na");

        let mut v4 = entry("web1", "aa:bb:cc:dd:ee:ff");
        v4.next_server = Some("10.0.0.1".to_string());
        v4.enable_gpxe = Some(false);
        let v4 = serde_json::to_value(v4).unwrap();
        assert_eq!(v4["next_server"], "10.0.0.1");
        assert_eq!(v4["enable_gpxe"], false);
    }
}
