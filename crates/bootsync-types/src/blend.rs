//! Flattened per-machine attributes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The machine → profile → distribution chain collapsed into one view.
///
/// Produced by the inventory; consumers only read it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendedAttributes {
    /// Boot server handed out in DHCP `next-server`.
    pub next_server: String,
    /// Boot filename override; `None` leaves the choice to the template.
    pub filename: Option<String>,
    pub netboot_enabled: bool,
    pub hostname: String,
    /// Owning machine name.
    pub owner: String,
    /// Chainload into gPXE/iPXE.
    pub enable_gpxe: bool,
    pub name_servers: Vec<String>,
    pub mgmt_parameters: BTreeMap<String, Value>,
    /// Machine-level scope tag, if any.
    pub dhcp_tag: Option<String>,
}
