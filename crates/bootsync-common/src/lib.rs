//! Common infrastructure for bootsync boot-service managers.
//!
//! This crate provides the collaborators every manager is built from:
//!
//! - [`shell`]: Command execution with timeouts and proper quoting
//! - [`resolve`]: Host name resolution
//! - [`render`]: Template rendering with atomic file replacement
//! - [`inventory`]: Machine/profile/distribution access and blending
//! - [`settings`]: TOML settings with load-time flag conversion
//! - [`Manager`]: Lifecycle trait and the process-wide registry
//! - [`error`]: Error types for manager operations
//!
//! # Architecture
//!
//! Managers follow this pattern:
//!
//! 1. Read machines from the [`Inventory`]
//! 2. Project them into the data a daemon template needs
//! 3. Render the template to the daemon's configuration file
//! 4. Check the configuration and restart the daemon through a [`CommandRunner`]
//!
//! # Example
//!
//! ```ignore
//! use bootsync_common::{
//!     shell::{shellquote, SYSTEMCTL_CMD},
//!     BootSyncResult, ManagerContext,
//! };
//!
//! async fn restart(ctx: &ManagerContext, unit: &str) -> BootSyncResult<i32> {
//!     let cmd = format!("{} restart {}", SYSTEMCTL_CMD, shellquote(unit));
//!     let result = ctx.runner.run(&cmd, ctx.settings.command_timeout()).await?;
//!     Ok(result.exit_code)
//! }
//! ```

pub mod error;
pub mod inventory;
pub mod manager;
pub mod render;
pub mod resolve;
pub mod settings;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{BootSyncError, BootSyncResult};
pub use inventory::{Inventory, InventorySnapshot, MemoryInventory};
pub use manager::{install_registry, registry, Manager, ManagerContext, ManagerRegistry};
pub use render::{read_template, Renderer, TemplateRenderer};
pub use resolve::{NameResolver, ResolvedAddrs, SystemResolver};
pub use settings::{Flag, Settings};
pub use shell::{CommandRunner, ExecResult, ShellRunner};
