//! Inventory record types for the bootsync boot-service managers.
//!
//! These are read-only projections of what the provisioning inventory
//! knows about each host:
//!
//! - [`MacAddress`]: 48-bit hardware address, used as the DHCP entry key
//! - [`Interface`] / [`InterfaceType`]: one network interface of a machine
//! - [`Machine`], [`Profile`], [`Distribution`]: the machine → profile →
//!   distribution chain
//! - [`BlendedAttributes`]: the flattened per-machine attribute view
//! - [`AddressFamily`]: selects the IPv4 or IPv6 half of a pass

mod blend;
mod family;
mod interface;
mod mac;
mod machine;
pub mod serde_helpers;

pub use blend::BlendedAttributes;
pub use family::AddressFamily;
pub use interface::{Interface, InterfaceType};
pub use mac::MacAddress;
pub use machine::{Arch, Distribution, Machine, Profile};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid interface type: {0}")]
    InvalidInterfaceType(String),

    #[error("invalid architecture: {0}")]
    InvalidArch(String),
}
