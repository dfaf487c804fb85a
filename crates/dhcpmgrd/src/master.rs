//! Bond and bridge master lookup for slave interfaces.

use std::collections::HashSet;

use bootsync_types::{AddressFamily, Interface, MacAddress, Machine};

/// What a slave interface inherits from its master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterView {
    pub master: String,
    /// Master's address for the pass family, or the first `<master>.<vlan>`
    /// sub-interface address when the master has none.
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub dhcp_tag: Option<String>,
    pub dns_name: Option<String>,
}

/// Resolves masters and tracks which slave of each group keeps its entry.
///
/// One resolver lives for one aggregation pass; the first slave MAC seen
/// per (machine, master) wins and every later one is reported redundant.
#[derive(Debug, Default)]
pub struct MasterInterfaceResolver {
    claimed: HashSet<(String, String)>,
}

impl MasterInterfaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `slave`'s master on `machine`.
    ///
    /// Returns `None` when the slave names no master or the master does not
    /// exist; such a slave gets no entry.
    pub fn resolve(machine: &Machine, slave: &Interface, family: AddressFamily) -> Option<MasterView> {
        let master_name = slave.interface_master.as_deref()?;
        let master = machine.interface(master_name)?;

        let address = master
            .address(family)
            .map(str::to_string)
            .or_else(|| Self::sub_interface_address(machine, master_name, family));

        Some(MasterView {
            master: master_name.to_string(),
            address,
            netmask: master.netmask.clone(),
            dhcp_tag: master.dhcp_tag.clone(),
            dns_name: master.dns_name.clone(),
        })
    }

    /// First `<master>.*` interface, in machine order, with an address.
    fn sub_interface_address(machine: &Machine, master: &str, family: AddressFamily) -> Option<String> {
        let prefix = format!("{}.", master);
        machine
            .interfaces
            .iter()
            .filter(|i| i.name.starts_with(&prefix))
            .find_map(|i| i.address(family).map(str::to_string))
    }

    /// Records `mac` as a slave of `master` on `machine`.
    ///
    /// Returns true for the first slave of the group, false for every
    /// later one.
    pub fn claim(&mut self, machine: &str, master: &str, mac: &MacAddress) -> bool {
        let first = self
            .claimed
            .insert((machine.to_string(), master.to_string()));
        if !first {
            tracing::debug!(
                machine = %machine,
                master = %master,
                mac = %mac,
                "Slave is redundant within its group"
            );
        }
        first
    }
}
