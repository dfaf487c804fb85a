//! Network interface records.

use crate::mac::{self, MacAddress};
use crate::serde_helpers::{default_true, empty_as_none};
use crate::{AddressFamily, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an interface within a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterfaceType {
    /// Plain interface (default).
    #[default]
    Na,
    /// Bond master.
    Bond,
    /// Member of a bond.
    BondSlave,
    /// Bridge master.
    Bridge,
    /// Member of a bridge.
    BridgeSlave,
    /// Bond member that is itself enslaved to a bridge.
    BondedBridgeSlave,
    /// Baseboard management controller.
    Bmc,
    /// InfiniBand port.
    Infiniband,
}

impl InterfaceType {
    /// Returns true for the variants that take their address from a master interface.
    pub const fn is_slave(&self) -> bool {
        matches!(
            self,
            InterfaceType::BondSlave | InterfaceType::BridgeSlave | InterfaceType::BondedBridgeSlave
        )
    }

    /// Returns the inventory spelling of this type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Na => "na",
            InterfaceType::Bond => "bond",
            InterfaceType::BondSlave => "bond_slave",
            InterfaceType::Bridge => "bridge",
            InterfaceType::BridgeSlave => "bridge_slave",
            InterfaceType::BondedBridgeSlave => "bonded_bridge_slave",
            InterfaceType::Bmc => "bmc",
            InterfaceType::Infiniband => "infiniband",
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InterfaceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "na" => Ok(InterfaceType::Na),
            "bond" => Ok(InterfaceType::Bond),
            "bond_slave" => Ok(InterfaceType::BondSlave),
            "bridge" => Ok(InterfaceType::Bridge),
            "bridge_slave" => Ok(InterfaceType::BridgeSlave),
            "bonded_bridge_slave" => Ok(InterfaceType::BondedBridgeSlave),
            "bmc" => Ok(InterfaceType::Bmc),
            "infiniband" => Ok(InterfaceType::Infiniband),
            _ => Err(ParseError::InvalidInterfaceType(s.to_string())),
        }
    }
}

impl TryFrom<String> for InterfaceType {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InterfaceType> for String {
    fn from(t: InterfaceType) -> String {
        t.as_str().to_string()
    }
}

/// One network interface of a machine.
///
/// Optional string attributes are `None` when the inventory left them
/// empty; an interface without a MAC cannot receive a DHCP entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Interface {
    /// Interface name, unique within its machine (e.g. `eth0`, `bond0.100`).
    pub name: String,

    #[serde(default, deserialize_with = "mac::deserialize_optional")]
    pub mac_address: Option<MacAddress>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub ip_address: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub ipv6_address: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub netmask: Option<String>,

    /// Statically configured (not DHCP-managed on the host side).
    #[serde(default, rename = "static")]
    pub is_static: bool,

    /// DNS host name attached to this interface.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dns_name: Option<String>,

    /// Per-interface gateway override.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub if_gateway: Option<String>,

    #[serde(default)]
    pub interface_type: InterfaceType,

    /// Name of the master interface; only meaningful for slave types.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub interface_master: Option<String>,

    /// DHCP scope tag.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dhcp_tag: Option<String>,

    #[serde(default = "default_true")]
    pub netboot_enabled: bool,
}

impl Interface {
    /// Creates an empty interface record with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            netboot_enabled: true,
            ..Default::default()
        }
    }

    /// Returns the address for the given family, if set.
    pub fn address(&self, family: AddressFamily) -> Option<&str> {
        match family {
            AddressFamily::V4 => self.ip_address.as_deref(),
            AddressFamily::V6 => self.ipv6_address.as_deref(),
        }
    }

    /// Sets (or clears) the address for the given family.
    pub fn set_address(&mut self, family: AddressFamily, address: Option<String>) {
        match family {
            AddressFamily::V4 => self.ip_address = address,
            AddressFamily::V6 => self.ipv6_address = address,
        }
    }

    /// Returns true if this interface is enslaved to a bond or bridge.
    pub fn is_slave(&self) -> bool {
        self.interface_type.is_slave()
    }
}
