//! IpSyncMgr - fills in interface addresses from DNS

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use bootsync_common::{BootSyncError, BootSyncResult, Manager, ManagerContext};
use bootsync_types::{AddressFamily, Interface};

use crate::constants::IP_SYNC_INTERFACES;
use crate::IP_SYNC_MANAGER_NAME;

/// Which families to look up for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressRequest {
    pub v4: bool,
    pub v6: bool,
}

impl AddressRequest {
    /// Requests each enabled family the interface has no address for.
    pub fn for_interface(intf: &Interface, enable_v4: bool, enable_v6: bool) -> Self {
        Self {
            v4: enable_v4 && intf.address(AddressFamily::V4).is_none(),
            v6: enable_v6 && intf.address(AddressFamily::V6).is_none(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.v4 && !self.v6
    }
}

/// IpSyncMgr resolves missing addresses of `default` and `bmc` interfaces.
///
/// Only interfaces that are DHCP-managed on the host and carry a DNS name
/// are looked up. A lookup that fails is logged and the address stays
/// empty; it never aborts the run.
pub struct IpSyncMgr {
    ctx: ManagerContext,
}

impl IpSyncMgr {
    pub fn new(ctx: ManagerContext) -> Self {
        Self { ctx }
    }

    /// Looks up `intf`'s DNS name and stores what was requested and found.
    ///
    /// Returns the addresses written back.
    pub async fn set_interface_ips(
        &self,
        machine: &str,
        intf: &Interface,
        request: AddressRequest,
    ) -> BootSyncResult<(Option<String>, Option<String>)> {
        let Some(fqdn) = intf.dns_name.as_deref() else {
            return Ok((None, None));
        };

        let resolved = match self
            .ctx
            .resolver
            .resolve(fqdn, self.ctx.settings.resolve_timeout())
            .await
        {
            Ok(resolved) => resolved,
            Err(e @ BootSyncError::Resolution { .. }) => {
                warn!(machine = %machine, interface = %intf.name, error = %e, "Could not fetch IPs");
                return Ok((None, None));
            }
            Err(e) => return Err(e),
        };

        let mut ipv4 = None;
        let mut ipv6 = None;
        if request.v4 {
            match resolved.ipv4 {
                Some(ip) => {
                    info!(fqdn = %fqdn, ip = %ip, "Fetched IPv4");
                    ipv4 = Some(ip.to_string());
                }
                None => warn!(fqdn = %fqdn, "Could not fetch IPv4"),
            }
        }
        if request.v6 {
            match resolved.ipv6 {
                Some(ip) => {
                    info!(fqdn = %fqdn, ip = %ip, "Fetched IPv6");
                    ipv6 = Some(ip.to_string());
                }
                None => warn!(fqdn = %fqdn, "Could not fetch IPv6"),
            }
        }

        if ipv4.is_some() || ipv6.is_some() {
            self.ctx
                .inventory
                .set_interface_addresses(machine, &intf.name, ipv4.clone(), ipv6.clone())?;
        }
        Ok((ipv4, ipv6))
    }
}

#[async_trait]
impl Manager for IpSyncMgr {
    fn what(&self) -> &'static str {
        IP_SYNC_MANAGER_NAME
    }

    #[instrument(skip(self))]
    async fn write_configs(&self) -> BootSyncResult<()> {
        let dhcp = &self.ctx.settings.dhcp;
        let (enable_v4, enable_v6) = (dhcp.enable_dhcpv4.enabled(), dhcp.enable_dhcpv6.enabled());

        for machine in self.ctx.inventory.machines()? {
            for name in IP_SYNC_INTERFACES {
                let Some(intf) = machine.interface(name) else {
                    continue;
                };
                if intf.is_static || intf.dns_name.is_none() {
                    continue;
                }

                let request = AddressRequest::for_interface(intf, enable_v4, enable_v6);
                if request.is_empty() {
                    continue;
                }
                self.set_interface_ips(&machine.name, intf, request).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootsync_common::{Flag, Inventory, InventorySnapshot, MemoryInventory, Settings};
    use bootsync_test::StaticResolver;
    use bootsync_types::{Machine, Profile};
    use pretty_assertions::assert_eq;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::Arc;

    fn intf(name: &str, dns: Option<&str>) -> Interface {
        let mut intf = Interface::new(name);
        intf.dns_name = dns.map(str::to_string);
        intf
    }

    fn inventory() -> Arc<MemoryInventory> {
        let mut web1 = Machine::new("web1", "image");
        web1.interfaces.push(intf("default", Some("web1.example.com")));
        web1.interfaces.push(intf("bmc", Some("web1-bmc.example.com")));
        web1.interfaces.push(intf("eth1", Some("web1-eth1.example.com")));

        let mut web2 = Machine::new("web2", "image");
        let mut fixed = intf("default", Some("web2.example.com"));
        fixed.is_static = true;
        web2.interfaces.push(fixed);
        web2.interfaces.push(intf("bmc", None));

        let mut web3 = Machine::new("web3", "image");
        web3.interfaces.push(intf("default", Some("web3.example.com")));

        let snapshot = InventorySnapshot {
            distros: vec![],
            profiles: vec![Profile {
                name: "image".to_string(),
                ..Default::default()
            }],
            systems: vec![web1, web2, web3],
        };
        Arc::new(MemoryInventory::new(snapshot, "127.0.0.1").unwrap())
    }

    fn resolver() -> StaticResolver {
        StaticResolver::new()
            .with_v4("web1.example.com", Ipv4Addr::new(10, 0, 0, 11))
            .with_v6(
                "web1.example.com",
                Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x11),
            )
            .with_v4("web1-bmc.example.com", Ipv4Addr::new(10, 1, 0, 11))
            .with_v4("web1-eth1.example.com", Ipv4Addr::new(10, 2, 0, 11))
            .with_v4("web2.example.com", Ipv4Addr::new(10, 0, 0, 12))
    }

    fn manager(
        inventory: Arc<MemoryInventory>,
        resolver: Arc<StaticResolver>,
        configure: impl FnOnce(&mut Settings),
    ) -> IpSyncMgr {
        let mut settings = Settings::default();
        configure(&mut settings);
        IpSyncMgr::new(
            ManagerContext::new(inventory, Arc::new(settings)).with_resolver(resolver),
        )
    }

    #[test]
    fn test_address_request() {
        let mut i = intf("default", Some("h"));
        assert_eq!(
            AddressRequest::for_interface(&i, true, true),
            AddressRequest { v4: true, v6: true }
        );
        i.ip_address = Some("10.0.0.1".to_string());
        assert_eq!(
            AddressRequest::for_interface(&i, true, false),
            AddressRequest { v4: false, v6: false }
        );
        assert!(AddressRequest::for_interface(&i, true, false).is_empty());
    }

    #[tokio::test]
    async fn test_fills_default_and_bmc_only() {
        let inv = inventory();
        let resolver = Arc::new(resolver());
        let mgr = manager(inv.clone(), resolver.clone(), |_| {});

        mgr.write_configs().await.unwrap();

        let machines = inv.machines().unwrap();
        let web1 = &machines[0];
        assert_eq!(web1.interface("default").unwrap().ip_address.as_deref(), Some("10.0.0.11"));
        // IPv6 is off by default
        assert_eq!(web1.interface("default").unwrap().ipv6_address, None);
        assert_eq!(web1.interface("bmc").unwrap().ip_address.as_deref(), Some("10.1.0.11"));
        assert_eq!(web1.interface("eth1").unwrap().ip_address, None);

        // static and nameless interfaces are never looked up
        assert_eq!(
            resolver.lookups(),
            vec!["web1.example.com", "web1-bmc.example.com", "web3.example.com"]
        );
    }

    #[tokio::test]
    async fn test_resolution_failure_is_not_an_error() {
        let inv = inventory();
        let mgr = manager(inv.clone(), Arc::new(resolver()), |_| {});

        mgr.write_configs().await.unwrap();

        let web3 = &inv.machines().unwrap()[2];
        assert_eq!(web3.interface("default").unwrap().ip_address, None);
    }

    #[tokio::test]
    async fn test_v6_enabled_fetches_both() {
        let inv = inventory();
        let mgr = manager(inv.clone(), Arc::new(resolver()), |s| {
            s.dhcp.enable_dhcpv6 = Flag::ON;
        });

        mgr.write_configs().await.unwrap();

        let web1 = &inv.machines().unwrap()[0];
        let default = web1.interface("default").unwrap();
        assert_eq!(default.ipv6_address.as_deref(), Some("2001:db8::11"));
        // bmc resolved with no IPv6 keeps it empty
        assert_eq!(web1.interface("bmc").unwrap().ipv6_address, None);
    }

    #[tokio::test]
    async fn test_existing_address_is_kept() {
        let inv = inventory();
        inv.set_interface_addresses("web1", "default", Some("10.9.9.9".to_string()), None)
            .unwrap();
        let resolver = Arc::new(resolver());
        let mgr = manager(inv.clone(), resolver.clone(), |_| {});

        mgr.write_configs().await.unwrap();

        let web1 = &inv.machines().unwrap()[0];
        assert_eq!(web1.interface("default").unwrap().ip_address.as_deref(), Some("10.9.9.9"));
        assert!(!resolver
            .lookups()
            .contains(&"web1.example.com".to_string()));
    }

    #[tokio::test]
    async fn test_unrelated_errors_propagate() {
        let resolver = Arc::new(resolver().broken());
        let mgr = manager(inventory(), resolver, |_| {});

        assert!(matches!(
            mgr.write_configs().await,
            Err(BootSyncError::Internal { .. })
        ));
    }

    #[tokio::test]
    async fn test_restart_is_noop() {
        let mgr = manager(inventory(), Arc::new(resolver()), |_| {});
        assert_eq!(mgr.restart_service().await, 0);
    }
}
