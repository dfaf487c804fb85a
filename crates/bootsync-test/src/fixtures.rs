//! Test fixtures for common inventory layouts
//!
//! Provides reusable machines, profiles and distributions for manager
//! testing. Builders panic on malformed input; they are meant for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use bootsync_common::{InventorySnapshot, MemoryInventory};
use bootsync_types::{Arch, Distribution, Interface, InterfaceType, Machine, Profile};

/// Next server handed to [`MemoryInventory`] by the canned inventories
pub const FIXTURE_NEXT_SERVER: &str = "192.168.1.1";

/// Builder for an [`Interface`]
#[derive(Debug, Clone)]
pub struct InterfaceBuilder {
    intf: Interface,
}

impl InterfaceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            intf: Interface::new(name),
        }
    }

    /// Sets the MAC address; panics if `mac` does not parse
    pub fn mac(mut self, mac: &str) -> Self {
        self.intf.mac_address = Some(
            mac.parse()
                .unwrap_or_else(|e| panic!("bad fixture MAC '{}': {}", mac, e)),
        );
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.intf.ip_address = Some(ip.to_string());
        self
    }

    pub fn ipv6(mut self, ip: &str) -> Self {
        self.intf.ipv6_address = Some(ip.to_string());
        self
    }

    pub fn netmask(mut self, netmask: &str) -> Self {
        self.intf.netmask = Some(netmask.to_string());
        self
    }

    pub fn dns(mut self, name: &str) -> Self {
        self.intf.dns_name = Some(name.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.intf.dhcp_tag = Some(tag.to_string());
        self
    }

    pub fn gateway(mut self, gateway: &str) -> Self {
        self.intf.if_gateway = Some(gateway.to_string());
        self
    }

    pub fn fixed(mut self) -> Self {
        self.intf.is_static = true;
        self
    }

    pub fn kind(mut self, interface_type: InterfaceType) -> Self {
        self.intf.interface_type = interface_type;
        self
    }

    /// Enslaves the interface to `master` with the given slave type
    pub fn slave_of(mut self, master: &str, interface_type: InterfaceType) -> Self {
        self.intf.interface_type = interface_type;
        self.intf.interface_master = Some(master.to_string());
        self
    }

    pub fn build(self) -> Interface {
        self.intf
    }
}

/// Builder for a [`Machine`]
#[derive(Debug, Clone)]
pub struct MachineBuilder {
    machine: Machine,
}

impl MachineBuilder {
    pub fn new(name: &str, profile: &str) -> Self {
        Self {
            machine: Machine::new(name, profile),
        }
    }

    pub fn interface(mut self, intf: InterfaceBuilder) -> Self {
        self.machine.interfaces.push(intf.build());
        self
    }

    pub fn gateway(mut self, gateway: &str) -> Self {
        self.machine.gateway = Some(gateway.to_string());
        self
    }

    pub fn hostname(mut self, hostname: &str) -> Self {
        self.machine.hostname = Some(hostname.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.machine.dhcp_tag = Some(tag.to_string());
        self
    }

    pub fn netboot(mut self, enabled: bool) -> Self {
        self.machine.netboot_enabled = enabled;
        self
    }

    pub fn filename(mut self, filename: &str) -> Self {
        self.machine.filename = Some(filename.to_string());
        self
    }

    pub fn build(self) -> Machine {
        self.machine
    }
}

/// Common distribution and profile fixtures
pub mod profile_fixtures {
    use super::*;

    pub fn distro(name: &str, arch: Arch) -> Distribution {
        Distribution {
            name: name.to_string(),
            arch,
            kernel: format!("/var/lib/bootsync/{}/vmlinuz", name),
            initrd: format!("/var/lib/bootsync/{}/initrd.img", name),
            extra: BTreeMap::new(),
        }
    }

    pub fn profile(name: &str, distro: Option<&str>) -> Profile {
        Profile {
            name: name.to_string(),
            distro: distro.map(str::to_string),
            ..Default::default()
        }
    }

    /// aarch64, x86_64 and ppc64 distributions
    pub fn standard_distros() -> Vec<Distribution> {
        vec![
            distro("rhel9-aarch64", Arch::Aarch64),
            distro("rhel9-x86_64", Arch::X86_64),
            distro("rhel9-ppc64", Arch::Ppc64),
        ]
    }

    /// `web` (aarch64), `db` (x86_64), `power` (ppc64) and `image` (no distro)
    pub fn standard_profiles() -> Vec<Profile> {
        vec![
            profile("web", Some("rhel9-aarch64")),
            profile("db", Some("rhel9-x86_64")),
            profile("power", Some("rhel9-ppc64")),
            profile("image", None),
        ]
    }
}

/// Common machine fixtures
pub mod machine_fixtures {
    use super::*;

    /// Web server on aarch64 with a single `eth0`
    pub fn web_server() -> Machine {
        MachineBuilder::new("web1", "web")
            .gateway("10.0.0.254")
            .hostname("web1.example.com")
            .interface(
                InterfaceBuilder::new("eth0")
                    .mac("aa:bb:cc:dd:ee:ff")
                    .ip("10.0.0.10")
                    .netmask("255.255.255.0")
                    .dns("web1"),
            )
            .build()
    }

    /// Database server with `eth1` and `eth2` bonded into `bond0`
    pub fn bonded_db_server() -> Machine {
        MachineBuilder::new("db1", "db")
            .interface(
                InterfaceBuilder::new("bond0")
                    .kind(InterfaceType::Bond)
                    .ip("10.0.1.20")
                    .netmask("255.255.255.0")
                    .dns("db1")
                    .tag("storage"),
            )
            .interface(
                InterfaceBuilder::new("eth1")
                    .mac("52:54:00:00:00:01")
                    .slave_of("bond0", InterfaceType::BondSlave),
            )
            .interface(
                InterfaceBuilder::new("eth2")
                    .mac("52:54:00:00:00:02")
                    .slave_of("bond0", InterfaceType::BondSlave),
            )
            .build()
    }

    /// Image-deployed host with a management interface and a BMC
    pub fn image_host() -> Machine {
        MachineBuilder::new("node7", "image")
            .tag("lab")
            .interface(
                InterfaceBuilder::new("default")
                    .mac("52:54:00:00:07:01")
                    .dns("node7.example.com"),
            )
            .interface(
                InterfaceBuilder::new("bmc")
                    .mac("52:54:00:00:07:02")
                    .kind(InterfaceType::Bmc)
                    .dns("node7-bmc.example.com"),
            )
            .build()
    }

    /// Host carrying a CIDR-qualified address; never managed
    pub fn cidr_host() -> Machine {
        MachineBuilder::new("legacy1", "db")
            .interface(
                InterfaceBuilder::new("eth0")
                    .mac("52:54:00:00:09:01")
                    .ip("10.0.9.1/24")
                    .dns("legacy1"),
            )
            .build()
    }
}

/// Snapshot with the standard distributions and profiles and `systems`
pub fn snapshot(systems: Vec<Machine>) -> InventorySnapshot {
    InventorySnapshot {
        distros: profile_fixtures::standard_distros(),
        profiles: profile_fixtures::standard_profiles(),
        systems,
    }
}

/// In-memory inventory over [`snapshot`]; panics on invalid fixtures
pub fn inventory(systems: Vec<Machine>) -> Arc<MemoryInventory> {
    Arc::new(
        MemoryInventory::new(snapshot(systems), FIXTURE_NEXT_SERVER)
            .unwrap_or_else(|e| panic!("invalid fixture inventory: {}", e)),
    )
}

/// Inventory with every machine fixture
pub fn standard_inventory() -> Arc<MemoryInventory> {
    inventory(vec![
        machine_fixtures::web_server(),
        machine_fixtures::bonded_db_server(),
        machine_fixtures::image_host(),
        machine_fixtures::cidr_host(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootsync_common::Inventory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interface_builder() {
        let intf = InterfaceBuilder::new("eth1")
            .mac("52:54:00:00:00:01")
            .slave_of("bond0", InterfaceType::BondSlave)
            .build();

        assert_eq!(intf.name, "eth1");
        assert_eq!(intf.mac_address.unwrap().to_string(), "52:54:00:00:00:01");
        assert!(intf.is_slave());
        assert_eq!(intf.interface_master.as_deref(), Some("bond0"));
        assert!(intf.netboot_enabled);
    }

    #[test]
    #[should_panic(expected = "bad fixture MAC")]
    fn test_bad_mac_panics() {
        InterfaceBuilder::new("eth0").mac("not-a-mac");
    }

    #[test]
    fn test_standard_inventory_is_valid() {
        let inv = standard_inventory();
        let machines = inv.machines().unwrap();
        let names: Vec<&str> = machines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["web1", "db1", "node7", "legacy1"]);

        assert!(inv.is_management_supported(&machines[0], false));
        assert!(!inv.is_management_supported(&machines[3], false));
        assert_eq!(
            inv.distribution_for(&machines[0]).unwrap().unwrap().arch,
            Arch::Aarch64
        );
        assert_eq!(inv.distribution_for(&machines[2]).unwrap(), None);
    }
}
