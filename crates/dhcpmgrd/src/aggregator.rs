//! Interface aggregation: inventory machines → DHCP scopes.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use bootsync_common::{BootSyncResult, Inventory};
use bootsync_types::{AddressFamily, BlendedAttributes, Distribution, Interface, Machine};

use crate::master::MasterInterfaceResolver;
use crate::scope::{DhcpScopes, ScopeAssigner, ScopeEntry};
use crate::tables::constants::GENERIC_NAME_PREFIX;
use crate::tables::{boot_filename, is_primary_interface};

/// State that lives for exactly one aggregation pass.
#[derive(Default)]
struct Pass {
    /// Entries named so far; drives `genericN`.
    counter: u32,
    /// Blend result per machine name. `None` records a failed blend.
    blend_cache: HashMap<String, Option<BlendedAttributes>>,
    masters: MasterInterfaceResolver,
    assigner: ScopeAssigner,
    scopes: DhcpScopes,
}

/// Builds the DHCP scopes for one address family.
pub struct InterfaceAggregator<'a> {
    inventory: &'a dyn Inventory,
    family: AddressFamily,
    always_write: bool,
}

impl<'a> InterfaceAggregator<'a> {
    /// `always_write` keeps entries for static interfaces on machines that
    /// are not netbooting.
    pub fn new(inventory: &'a dyn Inventory, family: AddressFamily, always_write: bool) -> Self {
        Self {
            inventory,
            family,
            always_write,
        }
    }

    /// Walks every machine and interface and returns the resulting scopes.
    ///
    /// Machines and interfaces that cannot be turned into an entry are
    /// logged and skipped; only a failure to list machines is an error.
    #[instrument(skip(self), fields(family = %self.family))]
    pub fn aggregate(&self) -> BootSyncResult<DhcpScopes> {
        let machines = self.inventory.machines()?;
        let mut pass = Pass::default();

        for machine in &machines {
            if !self.inventory.is_management_supported(machine, false) {
                debug!(machine = %machine.name, "Machine not eligible for management");
                continue;
            }

            let distro = match self.inventory.distribution_for(machine) {
                Ok(distro) => distro,
                Err(e) => {
                    warn!(machine = %machine.name, error = %e, "Skipping machine");
                    continue;
                }
            };

            for intf in &machine.interfaces {
                self.add_interface(&mut pass, machine, distro.as_ref(), intf);
            }
        }

        pass.assigner.prune(&mut pass.scopes);

        info!(entries = pass.scopes.len(), "Aggregated DHCP scopes");
        Ok(pass.scopes)
    }

    fn add_interface(
        &self,
        pass: &mut Pass,
        machine: &Machine,
        distro: Option<&Distribution>,
        intf: &Interface,
    ) {
        let family = self.family;
        let mut copy = intf.clone();
        let gateway = copy.if_gateway.clone().or_else(|| machine.gateway.clone());

        let (tag, host) = if copy.is_slave() {
            let Some(view) = MasterInterfaceResolver::resolve(machine, &copy, family) else {
                debug!(
                    machine = %machine.name,
                    interface = %copy.name,
                    master = ?copy.interface_master,
                    "Master interface missing"
                );
                return;
            };

            if let Some(mac) = copy.mac_address {
                if !pass.masters.claim(&machine.name, &view.master, &mac) {
                    pass.assigner.ignore(mac);
                }
            }

            copy.set_address(family, view.address);
            if family == AddressFamily::V4 {
                copy.netmask = view.netmask;
            }
            (view.dhcp_tag, view.dns_name)
        } else {
            (copy.dhcp_tag.clone(), copy.dns_name.clone())
        };

        let Some(mac) = copy.mac_address else {
            debug!(machine = %machine.name, interface = %copy.name, "No MAC address");
            return;
        };

        pass.counter += 1;
        let name = match host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) if is_primary_interface(&copy.name) => host.to_string(),
            Some(host) => format!("{}-{}", host, copy.name),
            None => format!("{}{}", GENERIC_NAME_PREFIX, pass.counter),
        };

        let Some(blended) = self.blended(pass, machine) else {
            return;
        };

        let filename = blended.filename.clone().or_else(|| {
            distro
                .and_then(|d| boot_filename(family, d.arch))
                .map(str::to_string)
        });

        if !self.always_write && !blended.netboot_enabled && copy.is_static {
            debug!(
                machine = %machine.name,
                interface = %copy.name,
                "Static interface on a machine that is not netbooting"
            );
            return;
        }

        let tag = ScopeAssigner::resolve_tag(tag.as_deref(), blended.dhcp_tag.as_deref()).to_string();
        let v4 = family == AddressFamily::V4;

        let entry = ScopeEntry {
            name,
            interface: copy.name,
            mac_address: mac,
            ip_address: copy.ip_address,
            ipv6_address: copy.ipv6_address,
            netmask: copy.netmask,
            gateway,
            is_static: copy.is_static,
            dns_name: copy.dns_name,
            interface_type: copy.interface_type,
            interface_master: copy.interface_master,
            dhcp_tag: copy.dhcp_tag,
            distro: distro.cloned(),
            next_server: v4.then(|| blended.next_server.clone()),
            filename,
            netboot_enabled: blended.netboot_enabled,
            hostname: blended.hostname.clone(),
            owner: blended.owner.clone(),
            enable_gpxe: v4.then_some(blended.enable_gpxe),
            name_servers: blended.name_servers.clone(),
            mgmt_parameters: blended.mgmt_parameters.clone(),
        };

        if let Some(old) = pass.scopes.insert(&tag, entry) {
            debug!(tag = %tag, mac = %mac, replaced = %old.name, "Replaced scope entry");
        }
    }

    /// Blends `machine` at most once per pass.
    fn blended(&self, pass: &mut Pass, machine: &Machine) -> Option<BlendedAttributes> {
        match pass.blend_cache.entry(machine.name.clone()) {
            Entry::Occupied(cached) => cached.get().clone(),
            Entry::Vacant(slot) => {
                let blended = match self.inventory.blend(machine) {
                    Ok(blended) => Some(blended),
                    Err(e) => {
                        warn!(machine = %machine.name, error = %e, "Failed to blend machine");
                        None
                    }
                };
                slot.insert(blended).clone()
            }
        }
    }
}
