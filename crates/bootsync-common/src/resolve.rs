//! Host name resolution.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use crate::error::{BootSyncError, BootSyncResult};

/// The first address of each family a lookup returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedAddrs {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl ResolvedAddrs {
    /// Collects the first address of each family, keeping lookup order.
    pub fn from_addrs(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut resolved = Self::default();
        for addr in addrs {
            match addr {
                IpAddr::V4(v4) if resolved.ipv4.is_none() => resolved.ipv4 = Some(v4),
                IpAddr::V6(v6) if resolved.ipv6.is_none() => resolved.ipv6 = Some(v6),
                _ => {}
            }
        }
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }
}

/// Name-resolution seam used by the address resolver.
///
/// Every failure, including a lookup that returns nothing, is reported as
/// [`BootSyncError::Resolution`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, host: &str, timeout: Duration) -> BootSyncResult<ResolvedAddrs>;
}

/// Resolves through the system resolver (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn resolve(&self, host: &str, timeout: Duration) -> BootSyncResult<ResolvedAddrs> {
        tracing::debug!(host = %host, ?timeout, "Resolving host");

        // lookup_host wants a port; it is discarded.
        let lookup = tokio::net::lookup_host((host, 0));
        let addrs = tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| BootSyncError::resolution(host, format!("timed out after {:?}", timeout)))?
            .map_err(|e| BootSyncError::resolution(host, e.to_string()))?;

        let resolved = ResolvedAddrs::from_addrs(addrs.map(|sa| sa.ip()));
        if resolved.is_empty() {
            return Err(BootSyncError::resolution(host, "no addresses returned"));
        }
        Ok(resolved)
    }
}
