//! Machine, profile and distribution records.

use crate::serde_helpers::{default_true, empty_as_none};
use crate::{Interface, ParseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// CPU architecture of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Arch {
    I386,
    #[default]
    X86_64,
    Ia64,
    Ppc,
    Ppc64,
    Ppc64le,
    Ppc64el,
    Arm,
    Aarch64,
    S390,
    S390x,
}

impl Arch {
    /// Returns the inventory spelling of this architecture.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Arch::I386 => "i386",
            Arch::X86_64 => "x86_64",
            Arch::Ia64 => "ia64",
            Arch::Ppc => "ppc",
            Arch::Ppc64 => "ppc64",
            Arch::Ppc64le => "ppc64le",
            Arch::Ppc64el => "ppc64el",
            Arch::Arm => "arm",
            Arch::Aarch64 => "aarch64",
            Arch::S390 => "s390",
            Arch::S390x => "s390x",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "i386" => Ok(Arch::I386),
            "x86_64" => Ok(Arch::X86_64),
            "ia64" => Ok(Arch::Ia64),
            "ppc" => Ok(Arch::Ppc),
            "ppc64" => Ok(Arch::Ppc64),
            "ppc64le" => Ok(Arch::Ppc64le),
            "ppc64el" => Ok(Arch::Ppc64el),
            "arm" => Ok(Arch::Arm),
            "aarch64" => Ok(Arch::Aarch64),
            "s390" => Ok(Arch::S390),
            "s390x" => Ok(Arch::S390x),
            _ => Err(ParseError::InvalidArch(s.to_string())),
        }
    }
}

impl TryFrom<String> for Arch {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Arch> for String {
    fn from(arch: Arch) -> String {
        arch.as_str().to_string()
    }
}

/// An installable operating system tree.
///
/// Everything beyond the named fields is carried through untouched in
/// `extra`, so the whole record can be handed to templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub name: String,
    pub arch: Arch,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub initrd: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A boot profile; machines inherit its attributes unless they override them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    /// Parent distribution. `None` means the profile deploys an image.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub distro: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub next_server: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub filename: Option<String>,

    #[serde(default)]
    pub enable_gpxe: bool,

    #[serde(default)]
    pub name_servers: Vec<String>,

    #[serde(default)]
    pub mgmt_parameters: BTreeMap<String, Value>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub dhcp_tag: Option<String>,
}

/// A provisioned host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,

    /// Name of the parent profile.
    pub profile: String,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub gateway: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub hostname: Option<String>,

    #[serde(default = "default_true")]
    pub netboot_enabled: bool,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub next_server: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub filename: Option<String>,

    /// Overrides the profile chainload flag when set.
    #[serde(default)]
    pub enable_gpxe: Option<bool>,

    /// Empty means "inherit from the profile".
    #[serde(default)]
    pub name_servers: Vec<String>,

    /// Merged over the profile's parameters.
    #[serde(default)]
    pub mgmt_parameters: BTreeMap<String, Value>,

    /// Machine-level DHCP scope tag.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dhcp_tag: Option<String>,

    /// Interfaces in inventory order.
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Machine {
    /// Creates a machine with no interfaces.
    pub fn new(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile: profile.into(),
            netboot_enabled: true,
            ..Default::default()
        }
    }

    /// Looks up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Looks up an interface by name for modification.
    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name == name)
    }
}
