//! IscMgr - ISC dhcpd configuration manager

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, instrument};

use bootsync_common::render::read_template;
use bootsync_common::{BootSyncError, BootSyncResult, Manager, ManagerContext};
use bootsync_types::AddressFamily;

use crate::aggregator::InterfaceAggregator;
use crate::constants::{DATE_FORMAT, YABOOT};
use crate::fields;
use crate::scope::DhcpScopes;
use crate::service::{ServiceSynchronizer, SyncReport};
use crate::ISC_MANAGER_NAME;

/// IscMgr writes `dhcpd.conf` / `dhcpd6.conf` and restarts dhcpd.
///
/// Configuration flow:
/// 1. Template: read `dhcp.template` (or `dhcp6.template`)
/// 2. Scopes: aggregate every eligible machine interface by scope tag and MAC
/// 3. Render: template + scopes + server metadata → configuration file
/// 4. Restart: check the file with dhcpd, then restart the unit
pub struct IscMgr {
    ctx: ManagerContext,
    synchronizer: ServiceSynchronizer,
}

impl IscMgr {
    pub fn new(ctx: ManagerContext) -> Self {
        let synchronizer = ServiceSynchronizer::from_settings(ctx.runner.clone(), &ctx.settings);
        Self { ctx, synchronizer }
    }

    /// Template and output paths for a family.
    pub fn paths(&self, family: AddressFamily) -> (&PathBuf, &PathBuf) {
        let paths = &self.ctx.settings.paths;
        match family {
            AddressFamily::V4 => (&paths.dhcp_template, &paths.dhcpd_conf),
            AddressFamily::V6 => (&paths.dhcp6_template, &paths.dhcpd6_conf),
        }
    }

    /// Aggregates the scopes for one family.
    pub fn scopes(&self, family: AddressFamily) -> BootSyncResult<DhcpScopes> {
        InterfaceAggregator::new(
            self.ctx.inventory.as_ref(),
            family,
            self.ctx.settings.dhcp.always_write_dhcp_entries.enabled(),
        )
        .aggregate()
    }

    /// Template context for one family.
    pub fn render_context(
        &self,
        family: AddressFamily,
        scopes: &DhcpScopes,
        now: DateTime<Utc>,
    ) -> BootSyncResult<Value> {
        let settings = &self.ctx.settings;
        let dhcp_tags = serde_json::to_value(scopes)
            .map_err(|e| BootSyncError::internal(format!("failed to serialize scopes: {}", e)))?;

        let mut context = Map::new();
        context.insert(fields::DATE.into(), now.format(DATE_FORMAT).to_string().into());
        match family {
            AddressFamily::V4 => {
                context.insert(fields::BOOT_SERVER.into(), settings.boot_server().into());
                context.insert(
                    fields::NEXT_SERVER.into(),
                    settings.server.next_server.clone().into(),
                );
                context.insert(fields::YABOOT.into(), YABOOT.into());
            }
            AddressFamily::V6 => {
                context.insert(
                    fields::NEXT_SERVER_V6.into(),
                    settings.server.next_server.clone().into(),
                );
            }
        }
        context.insert(fields::DHCP_TAGS.into(), dhcp_tags);
        Ok(Value::Object(context))
    }

    /// Reads the template, aggregates and renders one family's file.
    ///
    /// A missing template fails before any aggregation is done.
    #[instrument(skip(self))]
    pub fn write_config(&self, family: AddressFamily) -> BootSyncResult<()> {
        let (template_path, output) = self.paths(family);
        let template = read_template(template_path)?;

        let scopes = self.scopes(family)?;
        let context = self.render_context(family, &scopes, Utc::now())?;

        info!(path = %output.display(), "Generating DHCP configuration");
        self.ctx.renderer.render(&template, &context, output)
    }

    /// Validates and restarts the enabled daemons, returning every outcome.
    pub async fn synchronize(&self) -> SyncReport {
        self.synchronizer.synchronize_all(&self.ctx.settings).await
    }
}

#[async_trait]
impl Manager for IscMgr {
    fn what(&self) -> &'static str {
        ISC_MANAGER_NAME
    }

    #[instrument(skip(self))]
    async fn write_configs(&self) -> BootSyncResult<()> {
        let dhcp = &self.ctx.settings.dhcp;
        if dhcp.enable_dhcpv4.enabled() {
            self.write_config(AddressFamily::V4)?;
        }
        if dhcp.enable_dhcpv6.enabled() {
            self.write_config(AddressFamily::V6)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restart_service(&self) -> i32 {
        self.synchronize().await.status
    }
}
