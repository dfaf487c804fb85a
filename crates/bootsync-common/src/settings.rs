//! Settings file support for bootsync managers.
//!
//! Loads and validates settings from a TOML file.
//! Default location: /etc/bootsync/settings.toml

use crate::error::{BootSyncError, BootSyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file location.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/bootsync/settings.toml";

/// An on/off setting.
///
/// Settings files written for older tooling store these as strings or
/// integers, where only `"0"` means off. They are converted once here;
/// native TOML booleans are taken as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFlag", into = "bool")]
pub struct Flag(bool);

impl Flag {
    pub const ON: Flag = Flag(true);
    pub const OFF: Flag = Flag(false);

    /// Returns true if the setting is enabled.
    pub const fn enabled(self) -> bool {
        self.0
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        Flag(b)
    }
}

impl From<Flag> for bool {
    fn from(flag: Flag) -> bool {
        flag.0
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.0 { "on" } else { "off" })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<RawFlag> for Flag {
    fn from(raw: RawFlag) -> Self {
        match raw {
            RawFlag::Bool(b) => Flag(b),
            RawFlag::Int(i) => Flag(i.to_string() != "0"),
            RawFlag::Str(s) => Flag(s != "0"),
        }
    }
}

/// DHCP feature switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhcpConfig {
    #[serde(default = "default_on")]
    pub enable_dhcpv4: Flag,

    #[serde(default = "default_off")]
    pub enable_dhcpv6: Flag,

    /// Restart the daemon after writing its configuration
    #[serde(default = "default_on")]
    pub restart_dhcp: Flag,

    /// Keep entries for interfaces that are static and not netbooting
    #[serde(default = "default_off")]
    pub always_write_dhcp_entries: Flag,
}

/// Boot server identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the provisioning HTTP server listens on
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Default DHCP next-server
    #[serde(default = "default_server")]
    pub next_server: String,
}

/// Template, output and inventory locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_dhcp_template")]
    pub dhcp_template: PathBuf,

    #[serde(default = "default_dhcp6_template")]
    pub dhcp6_template: PathBuf,

    #[serde(default = "default_dhcpd_conf")]
    pub dhcpd_conf: PathBuf,

    #[serde(default = "default_dhcpd6_conf")]
    pub dhcpd6_conf: PathBuf,

    /// JSON inventory snapshot
    #[serde(default = "default_inventory")]
    pub inventory: PathBuf,
}

/// Daemon control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// dhcpd binary used for the configuration self-check
    #[serde(default = "default_dhcpd_bin")]
    pub dhcpd_bin: PathBuf,

    /// systemd unit for the IPv4 daemon
    #[serde(default = "default_dhcp_service")]
    pub dhcp_service: String,

    /// systemd unit for the IPv6 daemon
    #[serde(default = "default_dhcp6_service")]
    pub dhcp6_service: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// Managers run by `sync`, in order
    #[serde(default = "default_managers")]
    pub managers: Vec<String>,
}

/// Complete bootsync settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dhcp: DhcpConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub service: ServiceConfig,
}

// Default functions
fn default_on() -> Flag {
    Flag::ON
}

fn default_off() -> Flag {
    Flag::OFF
}

fn default_server() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    80
}

fn default_dhcp_template() -> PathBuf {
    PathBuf::from("/etc/bootsync/dhcp.template")
}

fn default_dhcp6_template() -> PathBuf {
    PathBuf::from("/etc/bootsync/dhcp6.template")
}

fn default_dhcpd_conf() -> PathBuf {
    PathBuf::from("/etc/dhcpd.conf")
}

fn default_dhcpd6_conf() -> PathBuf {
    PathBuf::from("/etc/dhcpd6.conf")
}

fn default_inventory() -> PathBuf {
    PathBuf::from("/var/lib/bootsync/inventory.json")
}

fn default_dhcpd_bin() -> PathBuf {
    PathBuf::from("/usr/sbin/dhcpd")
}

fn default_dhcp_service() -> String {
    "dhcpd".to_string()
}

fn default_dhcp6_service() -> String {
    "dhcpd6".to_string()
}

fn default_command_timeout() -> u64 {
    30
}

fn default_resolve_timeout() -> u64 {
    5
}

fn default_managers() -> Vec<String> {
    vec!["isc".to_string()]
}

// Default implementations
impl Default for DhcpConfig {
    fn default() -> Self {
        Self {
            enable_dhcpv4: default_on(),
            enable_dhcpv6: default_off(),
            restart_dhcp: default_on(),
            always_write_dhcp_entries: default_off(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            http_port: default_http_port(),
            next_server: default_server(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dhcp_template: default_dhcp_template(),
            dhcp6_template: default_dhcp6_template(),
            dhcpd_conf: default_dhcpd_conf(),
            dhcpd6_conf: default_dhcpd6_conf(),
            inventory: default_inventory(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dhcpd_bin: default_dhcpd_bin(),
            dhcp_service: default_dhcp_service(),
            dhcp6_service: default_dhcp6_service(),
            command_timeout_secs: default_command_timeout(),
            resolve_timeout_secs: default_resolve_timeout(),
            managers: default_managers(),
        }
    }
}

impl Settings {
    /// Load settings from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> BootSyncResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| match e {
                BootSyncError::InvalidConfig { message, .. } => {
                    BootSyncError::invalid_config(path.display().to_string(), message)
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.display(),
                    "Settings file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(BootSyncError::Io(e)),
        }
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> BootSyncResult<Self> {
        toml::from_str(content)
            .map_err(|e| BootSyncError::invalid_config("settings", format!("failed to parse: {}", e)))
    }

    /// Save settings to file
    pub fn save(&self, path: impl AsRef<Path>) -> BootSyncResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BootSyncError::invalid_config("settings", format!("failed to serialize: {}", e))
        })?;

        fs::write(path.as_ref(), content)?;

        Ok(())
    }

    /// Get process execution timeout as Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.service.command_timeout_secs)
    }

    /// Get name resolution timeout as Duration
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.service.resolve_timeout_secs)
    }

    /// `server:http_port`, as handed to boot loaders
    pub fn boot_server(&self) -> String {
        format!("{}:{}", self.server.server, self.server.http_port)
    }

    /// Validate settings
    pub fn validate(&self) -> BootSyncResult<()> {
        if self.server.server.trim().is_empty() {
            return Err(BootSyncError::invalid_config("server", "must not be empty"));
        }

        if self.server.http_port == 0 {
            return Err(BootSyncError::invalid_config("http_port", "must be > 0"));
        }

        if self.service.command_timeout_secs == 0 {
            return Err(BootSyncError::invalid_config(
                "command_timeout_secs",
                "must be > 0",
            ));
        }

        if self.service.resolve_timeout_secs == 0 {
            return Err(BootSyncError::invalid_config(
                "resolve_timeout_secs",
                "must be > 0",
            ));
        }

        if self.service.managers.is_empty() {
            return Err(BootSyncError::invalid_config(
                "managers",
                "at least one manager is required",
            ));
        }

        Ok(())
    }
}
