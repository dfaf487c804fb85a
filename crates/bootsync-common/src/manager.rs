//! Manager lifecycle trait and the process-wide manager registry.
//!
//! A manager owns one boot service (or one preparatory step such as
//! address resolution). Every manager follows the same lifecycle:
//! [`Manager::write_configs`] produces on-disk state, then
//! [`Manager::restart_service`] reconciles the running daemon with it.
//! [`Manager::sync`] does both.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::error::{BootSyncError, BootSyncResult};
use crate::inventory::Inventory;
use crate::render::{Renderer, TemplateRenderer};
use crate::resolve::{NameResolver, SystemResolver};
use crate::settings::Settings;
use crate::shell::{CommandRunner, ShellRunner};

/// Collaborators handed to every manager at construction.
#[derive(Clone)]
pub struct ManagerContext {
    pub inventory: Arc<dyn Inventory>,
    pub settings: Arc<Settings>,
    pub renderer: Arc<dyn Renderer>,
    pub runner: Arc<dyn CommandRunner>,
    pub resolver: Arc<dyn NameResolver>,
}

impl ManagerContext {
    /// Builds a context with the production renderer, shell runner and resolver.
    pub fn new(inventory: Arc<dyn Inventory>, settings: Arc<Settings>) -> Self {
        Self {
            inventory,
            settings,
            renderer: Arc::new(TemplateRenderer),
            runner: Arc::new(ShellRunner),
            resolver: Arc::new(SystemResolver),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl std::fmt::Debug for ManagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Lifecycle shared by all managers.
///
/// # Example
///
/// ```ignore
/// use bootsync_common::{Manager, BootSyncResult};
///
/// struct NoopMgr;
///
/// #[async_trait]
/// impl Manager for NoopMgr {
///     fn what(&self) -> &'static str { "noop" }
///     async fn write_configs(&self) -> BootSyncResult<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Manager: Send + Sync {
    /// Registry key (e.g. "isc").
    fn what(&self) -> &'static str;

    /// Writes this manager's configuration.
    ///
    /// Per-record problems are logged and skipped; only unreadable
    /// templates and unwritable outputs are returned as errors.
    async fn write_configs(&self) -> BootSyncResult<()>;

    /// Applies written configuration to the running service.
    ///
    /// Returns 0 on success. Failures are reported through the status,
    /// never as an error.
    async fn restart_service(&self) -> i32 {
        0
    }

    /// Regenerates an ethers file. Only managers that keep one override this.
    async fn regen_ethers(&self) -> BootSyncResult<()> {
        Ok(())
    }

    /// Writes configuration, then restarts; returns the restart status.
    async fn sync(&self) -> BootSyncResult<i32> {
        self.write_configs().await?;
        Ok(self.restart_service().await)
    }
}

/// Managers by name.
#[derive(Default)]
pub struct ManagerRegistry {
    managers: BTreeMap<String, Arc<dyn Manager>>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a manager under its [`Manager::what`] name.
    pub fn register(&mut self, manager: Arc<dyn Manager>) -> BootSyncResult<()> {
        let name = manager.what().to_string();
        if self.managers.contains_key(&name) {
            return Err(BootSyncError::registry(format!(
                "manager '{}' already registered",
                name
            )));
        }
        tracing::debug!(manager = %name, "Registered manager");
        self.managers.insert(name, manager);
        Ok(())
    }

    /// Looks up a manager by name.
    pub fn get(&self, name: &str) -> BootSyncResult<Arc<dyn Manager>> {
        self.managers
            .get(name)
            .cloned()
            .ok_or_else(|| BootSyncError::registry(format!("unknown manager '{}'", name)))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.managers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl std::fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("managers", &self.names())
            .finish()
    }
}

static REGISTRY: OnceCell<ManagerRegistry> = OnceCell::new();

/// Installs the process-wide registry. Fails if one is already installed.
pub fn install_registry(registry: ManagerRegistry) -> BootSyncResult<&'static ManagerRegistry> {
    REGISTRY
        .set(registry)
        .map_err(|_| BootSyncError::registry("registry already installed"))?;
    REGISTRY
        .get()
        .ok_or_else(|| BootSyncError::internal("registry missing after install"))
}

/// Returns the process-wide registry, if installed.
pub fn registry() -> Option<&'static ManagerRegistry> {
    REGISTRY.get()
}
