//! Name and boot-file tables for dhcpmgrd

use bootsync_types::{AddressFamily, Arch};

/// Manager names as registered
pub const ISC_MANAGER_NAME: &str = "isc";
pub const IP_SYNC_MANAGER_NAME: &str = "ip_sync";

/// Render context keys
pub mod fields {
    pub const DATE: &str = "date";
    pub const BOOT_SERVER: &str = "boot_server";
    pub const NEXT_SERVER: &str = "next_server";
    pub const NEXT_SERVER_V6: &str = "next_server_v6";
    pub const YABOOT: &str = "yaboot";
    pub const DHCP_TAGS: &str = "dhcp_tags";
}

/// Special constants
pub mod constants {
    /// Scope used when neither interface nor machine names one
    pub const DEFAULT_TAG: &str = "default";

    /// Interfaces labelled with the bare host name
    pub const PRIMARY_INTERFACES: &[&str] = &["eth0", "default"];

    /// Prefix for entries whose interface has no DNS name
    pub const GENERIC_NAME_PREFIX: &str = "generic";

    /// Interfaces whose addresses ip_sync fills in
    pub const IP_SYNC_INTERFACES: &[&str] = &["default", "bmc"];

    /// PowerPC boot loader handed out over IPv4
    pub const YABOOT: &str = "/yaboot";

    /// asctime(3) layout used for the generated-file timestamp
    pub const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
}

/// Boot file for architectures whose DHCP requests don't identify them.
///
/// `None` leaves the choice to the template. The IPv6 table gives 32- and
/// 64-bit PowerPC their own GRUB images; IPv4 sends both to yaboot.
pub fn boot_filename(family: AddressFamily, arch: Arch) -> Option<&'static str> {
    match (family, arch) {
        (AddressFamily::V4, Arch::Ppc | Arch::Ppc64) => Some(constants::YABOOT),
        (AddressFamily::V6, Arch::Ppc) => Some("grub/grub.ppc"),
        (AddressFamily::V6, Arch::Ppc64) => Some("grub/grub.ppc64"),
        (_, Arch::Ppc64le) => Some("grub/grub.ppc64le"),
        (_, Arch::Aarch64) => Some("grub/grubaa64.efi"),
        _ => None,
    }
}

/// Returns true if `name` is labelled with the bare host name.
pub fn is_primary_interface(name: &str) -> bool {
    constants::PRIMARY_INTERFACES.contains(&name)
}
