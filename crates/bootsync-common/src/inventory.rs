//! Inventory access.
//!
//! The managers read machines, profiles and distributions through the
//! [`Inventory`] trait. [`MemoryInventory`] is the stock implementation: a
//! JSON snapshot loaded into memory, with the only write path being the
//! addresses filled in by name resolution.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use bootsync_types::{BlendedAttributes, Distribution, Machine, Profile};
use serde::{Deserialize, Serialize};

use crate::error::{BootSyncError, BootSyncResult};
use crate::render::write_atomic;

/// Read access to provisioning records, plus address write-back.
pub trait Inventory: Send + Sync {
    /// All machines, in inventory order.
    fn machines(&self) -> BootSyncResult<Vec<Machine>>;

    /// The distribution behind a machine's profile; `None` for image-based profiles.
    fn distribution_for(&self, machine: &Machine) -> BootSyncResult<Option<Distribution>>;

    /// Flattens machine → profile attributes.
    fn blend(&self, machine: &Machine) -> BootSyncResult<BlendedAttributes>;

    /// Whether bootsync may manage this machine at all.
    ///
    /// Interfaces are checked in order and the first one carrying a MAC or an
    /// IPv4 address decides. With `cidr_ok` false, a `/`-qualified address on
    /// that interface (or on an earlier one) rejects the machine.
    fn is_management_supported(&self, machine: &Machine, cidr_ok: bool) -> bool;

    /// Stores resolved addresses on an interface. `None` leaves a field as it is.
    fn set_interface_addresses(
        &self,
        machine: &str,
        interface: &str,
        ipv4: Option<String>,
        ipv6: Option<String>,
    ) -> BootSyncResult<()>;
}

/// On-disk inventory layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub distros: Vec<Distribution>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub systems: Vec<Machine>,
}

impl InventorySnapshot {
    /// Checks cross references and name uniqueness.
    pub fn validate(&self) -> BootSyncResult<()> {
        let mut distros = HashSet::new();
        for distro in &self.distros {
            if !distros.insert(distro.name.as_str()) {
                return Err(BootSyncError::inventory(format!(
                    "duplicate distro '{}'",
                    distro.name
                )));
            }
        }

        let mut profiles = HashSet::new();
        for profile in &self.profiles {
            if !profiles.insert(profile.name.as_str()) {
                return Err(BootSyncError::inventory(format!(
                    "duplicate profile '{}'",
                    profile.name
                )));
            }
            if let Some(distro) = &profile.distro {
                if !distros.contains(distro.as_str()) {
                    return Err(BootSyncError::inventory(format!(
                        "profile '{}' references unknown distro '{}'",
                        profile.name, distro
                    )));
                }
            }
        }

        let mut systems = HashSet::new();
        for machine in &self.systems {
            if !systems.insert(machine.name.as_str()) {
                return Err(BootSyncError::inventory(format!(
                    "duplicate system '{}'",
                    machine.name
                )));
            }
            if !profiles.contains(machine.profile.as_str()) {
                return Err(BootSyncError::inventory(format!(
                    "system '{}' references unknown profile '{}'",
                    machine.name, machine.profile
                )));
            }
            let mut names = HashSet::new();
            for intf in &machine.interfaces {
                if !names.insert(intf.name.as_str()) {
                    return Err(BootSyncError::inventory(format!(
                        "system '{}' has duplicate interface '{}'",
                        machine.name, intf.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// In-memory inventory backed by a JSON snapshot.
#[derive(Debug)]
pub struct MemoryInventory {
    data: RwLock<InventorySnapshot>,
    /// Used when neither machine nor profile sets `next_server`.
    default_next_server: String,
}

impl MemoryInventory {
    /// Wraps a validated snapshot.
    pub fn new(
        snapshot: InventorySnapshot,
        default_next_server: impl Into<String>,
    ) -> BootSyncResult<Self> {
        snapshot.validate()?;
        Ok(Self {
            data: RwLock::new(snapshot),
            default_next_server: default_next_server.into(),
        })
    }

    /// Loads a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>, default_next_server: impl Into<String>) -> BootSyncResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BootSyncError::inventory(format!("failed to read {}: {}", path.display(), e))
        })?;
        let snapshot: InventorySnapshot = serde_json::from_str(&content).map_err(|e| {
            BootSyncError::inventory(format!("failed to parse {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            distros = snapshot.distros.len(),
            profiles = snapshot.profiles.len(),
            systems = snapshot.systems.len(),
            "Loaded inventory"
        );
        Self::new(snapshot, default_next_server)
    }

    /// Writes the current snapshot back as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> BootSyncResult<()> {
        let path = path.as_ref();
        let content = {
            let data = self.read()?;
            serde_json::to_string_pretty(&*data)
                .map_err(|e| BootSyncError::inventory(format!("failed to serialize: {}", e)))?
        };
        write_atomic(path, content.as_bytes())?;
        tracing::info!(path = %path.display(), "Saved inventory");
        Ok(())
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> BootSyncResult<InventorySnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> BootSyncResult<std::sync::RwLockReadGuard<'_, InventorySnapshot>> {
        self.data
            .read()
            .map_err(|e| BootSyncError::internal(format!("inventory lock poisoned: {}", e)))
    }

    fn profile_for(data: &InventorySnapshot, machine: &Machine) -> BootSyncResult<Profile> {
        data.profiles
            .iter()
            .find(|p| p.name == machine.profile)
            .cloned()
            .ok_or_else(|| {
                BootSyncError::inventory(format!(
                    "system '{}' references unknown profile '{}'",
                    machine.name, machine.profile
                ))
            })
    }
}

impl Inventory for MemoryInventory {
    fn machines(&self) -> BootSyncResult<Vec<Machine>> {
        Ok(self.read()?.systems.clone())
    }

    fn distribution_for(&self, machine: &Machine) -> BootSyncResult<Option<Distribution>> {
        let data = self.read()?;
        let profile = Self::profile_for(&data, machine)?;
        let Some(distro_name) = profile.distro else {
            return Ok(None);
        };
        data.distros
            .iter()
            .find(|d| d.name == distro_name)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                BootSyncError::inventory(format!(
                    "profile '{}' references unknown distro '{}'",
                    profile.name, distro_name
                ))
            })
    }

    fn blend(&self, machine: &Machine) -> BootSyncResult<BlendedAttributes> {
        let profile = Self::profile_for(&*self.read()?, machine)?;

        let mut mgmt_parameters: BTreeMap<_, _> = profile.mgmt_parameters;
        mgmt_parameters.extend(machine.mgmt_parameters.clone());

        Ok(BlendedAttributes {
            next_server: machine
                .next_server
                .clone()
                .or(profile.next_server)
                .unwrap_or_else(|| self.default_next_server.clone()),
            filename: machine.filename.clone().or(profile.filename),
            netboot_enabled: machine.netboot_enabled,
            hostname: machine.hostname.clone().unwrap_or_default(),
            owner: machine.name.clone(),
            enable_gpxe: machine.enable_gpxe.unwrap_or(profile.enable_gpxe),
            name_servers: if machine.name_servers.is_empty() {
                profile.name_servers
            } else {
                machine.name_servers.clone()
            },
            mgmt_parameters,
            dhcp_tag: machine.dhcp_tag.clone().or(profile.dhcp_tag),
        })
    }

    fn is_management_supported(&self, machine: &Machine, cidr_ok: bool) -> bool {
        // first interface with a MAC or an address decides
        for intf in &machine.interfaces {
            let ip = intf.ip_address.as_deref();
            if !cidr_ok && ip.is_some_and(|ip| ip.contains('/')) {
                return false;
            }
            if intf.mac_address.is_some() || ip.is_some() {
                return true;
            }
        }
        false
    }

    fn set_interface_addresses(
        &self,
        machine: &str,
        interface: &str,
        ipv4: Option<String>,
        ipv6: Option<String>,
    ) -> BootSyncResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| BootSyncError::internal(format!("inventory lock poisoned: {}", e)))?;

        let intf = data
            .systems
            .iter_mut()
            .find(|m| m.name == machine)
            .ok_or_else(|| BootSyncError::inventory(format!("unknown system '{}'", machine)))?
            .interface_mut(interface)
            .ok_or_else(|| {
                BootSyncError::inventory(format!(
                    "system '{}' has no interface '{}'",
                    machine, interface
                ))
            })?;

        if let Some(v4) = ipv4 {
            intf.ip_address = Some(v4);
        }
        if let Some(v6) = ipv6 {
            intf.ipv6_address = Some(v6);
        }
        Ok(())
    }
}
