//! Mock seams for driving managers without a shell, DNS or filesystem

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use bootsync_common::{
    BootSyncError, BootSyncResult, CommandRunner, ExecResult, NameResolver, Renderer,
    ResolvedAddrs, TemplateRenderer,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records every command; exit codes are scripted by substring.
///
/// A command matching no script exits 0.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<String>>,
    scripts: Vec<(String, i32)>,
    unrunnable: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `code`; first match wins
    pub fn exit_with(mut self, pattern: &str, code: i32) -> Self {
        self.scripts.push((pattern.to_string(), code));
        self
    }

    /// Commands containing `pattern` fail to run at all
    pub fn unrunnable(mut self, pattern: &str) -> Self {
        self.unrunnable.push(pattern.to_string());
        self
    }

    /// Commands run so far, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }

    pub fn clear(&self) {
        lock(&self.commands).clear();
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, cmd: &str, timeout: Duration) -> BootSyncResult<ExecResult> {
        lock(&self.commands).push(cmd.to_string());

        if self.unrunnable.iter().any(|p| cmd.contains(p.as_str())) {
            return Err(BootSyncError::ShellTimeout {
                command: cmd.to_string(),
                timeout,
            });
        }
        let code = self
            .scripts
            .iter()
            .find(|(p, _)| cmd.contains(p.as_str()))
            .map_or(0, |(_, code)| *code);
        Ok(ExecResult::with_code(code))
    }
}

/// Resolves host names from a fixed table.
///
/// Unknown names fail with [`BootSyncError::Resolution`].
#[derive(Debug, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, ResolvedAddrs>,
    lookups: Mutex<Vec<String>>,
    broken: bool,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_v4(mut self, host: &str, ip: Ipv4Addr) -> Self {
        self.hosts.entry(host.to_string()).or_default().ipv4 = Some(ip);
        self
    }

    pub fn with_v6(mut self, host: &str, ip: Ipv6Addr) -> Self {
        self.hosts.entry(host.to_string()).or_default().ipv6 = Some(ip);
        self
    }

    /// Every lookup fails with [`BootSyncError::Internal`]
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// Names looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve(&self, host: &str, _timeout: Duration) -> BootSyncResult<ResolvedAddrs> {
        lock(&self.lookups).push(host.to_string());
        if self.broken {
            return Err(BootSyncError::internal("resolver unavailable"));
        }
        self.hosts
            .get(host)
            .copied()
            .ok_or_else(|| BootSyncError::resolution(host, "no such host"))
    }
}

/// One captured render call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub output: PathBuf,
    pub context: Value,
    /// Template output, when the renderer was built with [`CapturingRenderer::with_text`]
    pub text: Option<String>,
}

/// Captures render calls instead of writing files
#[derive(Debug, Default)]
pub struct CapturingRenderer {
    rendered: Mutex<Vec<RenderedFile>>,
    with_text: bool,
}

impl CapturingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also renders each template to text with [`TemplateRenderer`]
    pub fn with_text() -> Self {
        Self {
            with_text: true,
            ..Default::default()
        }
    }

    /// Every render call, in order
    pub fn rendered(&self) -> Vec<RenderedFile> {
        lock(&self.rendered).clone()
    }

    /// Most recent render whose output file is named `file_name`
    pub fn last_for(&self, file_name: &str) -> Option<RenderedFile> {
        lock(&self.rendered)
            .iter()
            .rev()
            .find(|r| r.output.file_name().is_some_and(|n| n == file_name))
            .cloned()
    }
}

impl Renderer for CapturingRenderer {
    fn render(&self, template: &str, context: &Value, output: &Path) -> BootSyncResult<()> {
        let text = if self.with_text {
            Some(TemplateRenderer.render_to_string(template, context, output)?)
        } else {
            None
        };
        lock(&self.rendered).push(RenderedFile {
            output: output.to_path_buf(),
            context: context.clone(),
            text,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_recording_runner_scripts() {
        let runner = RecordingRunner::new()
            .exit_with("dhcpd6", 3)
            .unrunnable("hang");
        let t = Duration::from_secs(1);

        assert_eq!(runner.run("restart dhcpd", t).await.unwrap().exit_code, 0);
        assert_eq!(runner.run("restart dhcpd6", t).await.unwrap().exit_code, 3);
        assert!(matches!(
            runner.run("hang", t).await,
            Err(BootSyncError::ShellTimeout { .. })
        ));
        assert_eq!(
            runner.commands(),
            vec!["restart dhcpd", "restart dhcpd6", "hang"]
        );

        runner.clear();
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new()
            .with_v4("web1", Ipv4Addr::new(10, 0, 0, 10))
            .with_v6("web1", Ipv6Addr::LOCALHOST);
        let t = Duration::from_secs(1);

        let addrs = resolver.resolve("web1", t).await.unwrap();
        assert_eq!(addrs.ipv4, Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(addrs.ipv6, Some(Ipv6Addr::LOCALHOST));

        let err = resolver.resolve("web2", t).await.unwrap_err();
        assert!(matches!(err, BootSyncError::Resolution { .. }));
        assert_eq!(resolver.lookups(), vec!["web1", "web2"]);

        let broken = StaticResolver::new()
            .with_v4("web1", Ipv4Addr::new(10, 0, 0, 10))
            .broken();
        assert!(matches!(
            broken.resolve("web1", t).await,
            Err(BootSyncError::Internal { .. })
        ));
    }

    #[test]
    fn test_capturing_renderer() {
        let renderer = CapturingRenderer::with_text();
        let ctx = json!({"name": "web1"});

        renderer
            .render("host {{ name }};", &ctx, Path::new("/tmp/a/dhcpd.conf"))
            .unwrap();
        renderer
            .render("v6", &ctx, Path::new("/tmp/a/dhcpd6.conf"))
            .unwrap();

        assert_eq!(renderer.rendered().len(), 2);
        let v4 = renderer.last_for("dhcpd.conf").unwrap();
        assert_eq!(v4.text.as_deref(), Some("host web1;"));
        assert_eq!(v4.context, ctx);
        assert!(renderer.last_for("missing.conf").is_none());
    }
}
