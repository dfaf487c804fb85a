//! # dhcpmgrd - ISC DHCP Configuration Manager
//!
//! This crate generates ISC dhcpd configuration for every provisioned
//! machine in the inventory and keeps the running daemons in step with it.
//!
//! ## Responsibilities
//! - Aggregating machine interfaces into DHCP scopes keyed by MAC address
//! - Collapsing bonded/bridged slave groups to a single entry
//! - Inferring boot files for architectures that don't identify themselves
//! - Rendering `dhcpd.conf` / `dhcpd6.conf` from templates
//! - Validating and restarting dhcpd per address family
//! - Filling missing interface addresses from DNS (`ip_sync`)
//!
//! ## Managers
//! - `isc`: [`IscMgr`], writes and applies the dhcpd configuration
//! - `ip_sync`: [`IpSyncMgr`], resolves `default`/`bmc` addresses before `isc` runs

mod aggregator;
mod ip_sync;
mod isc_mgr;
mod master;
mod scope;
mod service;
mod tables;

use std::sync::Arc;

use bootsync_common::{BootSyncResult, ManagerContext, ManagerRegistry};

pub use aggregator::InterfaceAggregator;
pub use ip_sync::{AddressRequest, IpSyncMgr};
pub use isc_mgr::IscMgr;
pub use master::{MasterInterfaceResolver, MasterView};
pub use scope::{DhcpScopes, ScopeAssigner, ScopeEntry};
pub use service::{ServiceSynchronizer, ServiceTarget, SyncOutcome, SyncReport, SyncState};
pub use tables::*;

/// Registry holding the `isc` and `ip_sync` managers.
pub fn default_registry(ctx: ManagerContext) -> BootSyncResult<ManagerRegistry> {
    let mut registry = ManagerRegistry::new();
    registry.register(Arc::new(IscMgr::new(ctx.clone())))?;
    registry.register(Arc::new(IpSyncMgr::new(ctx)))?;
    Ok(registry)
}
