//! DHCP daemon reconciliation.
//!
//! For each enabled address family the synchronizer checks the generated
//! configuration with the daemon binary, then restarts the daemon. The
//! restart is attempted even when the check fails; the check result is
//! only logged.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use bootsync_common::shell::{shellquote, CommandRunner, SYSTEMCTL_CMD};
use bootsync_common::Settings;
use bootsync_types::AddressFamily;

/// States a family passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Idle,
    Validating,
    Valid,
    Invalid,
    Restarting,
    Done,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Validating => "validating",
            SyncState::Valid => "valid",
            SyncState::Invalid => "invalid",
            SyncState::Restarting => "restarting",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One daemon to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub family: AddressFamily,
    /// Generated configuration file
    pub conf: PathBuf,
    /// systemd unit
    pub service: String,
}

impl ServiceTarget {
    /// Targets for every family enabled in `settings`, IPv4 first.
    pub fn enabled(settings: &Settings) -> Vec<ServiceTarget> {
        let mut targets = Vec::new();
        if settings.dhcp.enable_dhcpv4.enabled() {
            targets.push(ServiceTarget {
                family: AddressFamily::V4,
                conf: settings.paths.dhcpd_conf.clone(),
                service: settings.service.dhcp_service.clone(),
            });
        }
        if settings.dhcp.enable_dhcpv6.enabled() {
            targets.push(ServiceTarget {
                family: AddressFamily::V6,
                conf: settings.paths.dhcpd6_conf.clone(),
                service: settings.service.dhcp6_service.clone(),
            });
        }
        targets
    }
}

/// Path one target took and the status it ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub family: AddressFamily,
    pub states: Vec<SyncState>,
    /// Restart exit status; -1 if the command could not run.
    pub status: i32,
}

impl SyncOutcome {
    pub fn state(&self) -> SyncState {
        self.states.last().copied().unwrap_or(SyncState::Idle)
    }
}

/// Result of reconciling every enabled family.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    /// Bitwise OR of every outcome status.
    pub status: i32,
}

/// Runs the validate-then-restart sequence against the DHCP daemons.
#[derive(Clone)]
pub struct ServiceSynchronizer {
    runner: Arc<dyn CommandRunner>,
    dhcpd_bin: PathBuf,
    timeout: Duration,
}

impl ServiceSynchronizer {
    pub fn new(runner: Arc<dyn CommandRunner>, dhcpd_bin: PathBuf, timeout: Duration) -> Self {
        Self {
            runner,
            dhcpd_bin,
            timeout,
        }
    }

    pub fn from_settings(runner: Arc<dyn CommandRunner>, settings: &Settings) -> Self {
        Self::new(
            runner,
            settings.service.dhcpd_bin.clone(),
            settings.command_timeout(),
        )
    }

    /// Non-destructive configuration check.
    pub fn validate_command(&self, target: &ServiceTarget) -> String {
        let family_flag = match target.family {
            AddressFamily::V4 => "",
            AddressFamily::V6 => " -6",
        };
        format!(
            "{}{} -t -q -cf {}",
            shellquote(&self.dhcpd_bin.to_string_lossy()),
            family_flag,
            shellquote(&target.conf.to_string_lossy())
        )
    }

    pub fn restart_command(target: &ServiceTarget) -> String {
        format!("{} restart {}", SYSTEMCTL_CMD, shellquote(&target.service))
    }

    /// Reconciles every family enabled in `settings`.
    ///
    /// With `restart_dhcp` off nothing runs and the status is 0.
    #[instrument(skip_all)]
    pub async fn synchronize_all(&self, settings: &Settings) -> SyncReport {
        if !settings.dhcp.restart_dhcp.enabled() {
            info!("DHCP restart disabled, leaving daemons alone");
            return SyncReport::default();
        }

        let mut report = SyncReport::default();
        for target in ServiceTarget::enabled(settings) {
            let outcome = self.synchronize(&target).await;
            report.status |= outcome.status;
            report.outcomes.push(outcome);
        }
        report
    }

    /// Validates and restarts one daemon.
    #[instrument(skip(self), fields(family = %target.family, service = %target.service))]
    pub async fn synchronize(&self, target: &ServiceTarget) -> SyncOutcome {
        let mut states = vec![SyncState::Idle, SyncState::Validating];

        let check_cmd = self.validate_command(target);
        let check = self
            .runner
            .run(&check_cmd, self.timeout)
            .await
            .and_then(|result| result.checked(&check_cmd));
        match check {
            Ok(_) => states.push(SyncState::Valid),
            Err(e) => {
                warn!(
                    conf = %target.conf.display(),
                    error = %e,
                    "Configuration check failed, restarting anyway"
                );
                states.push(SyncState::Invalid);
            }
        }

        states.push(SyncState::Restarting);
        let status = self.status_of(&Self::restart_command(target)).await;
        if status == 0 {
            info!("Restarted DHCP service");
            states.push(SyncState::Done);
        } else {
            error!(status, "DHCP service restart failed");
            states.push(SyncState::Failed);
        }

        SyncOutcome {
            family: target.family,
            states,
            status,
        }
    }

    async fn status_of(&self, cmd: &str) -> i32 {
        match self.runner.run(cmd, self.timeout).await {
            Ok(result) => result.exit_code,
            Err(e) => {
                error!(command = %cmd, error = %e, "Command did not run");
                -1
            }
        }
    }
}
