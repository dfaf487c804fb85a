//! IscMgr integration tests
//!
//! Drives `isc` (and `ip_sync` ahead of it) over the canned inventories,
//! checking the rendered scopes and the commands run against dhcpd.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bootsync_common::{
    BootSyncError, Inventory, Manager, ManagerContext, MemoryInventory, Settings, TemplateRenderer,
};
use bootsync_dhcpmgrd::{default_registry, IpSyncMgr, IscMgr, ISC_MANAGER_NAME};
use bootsync_types::InterfaceType;
use bootsync_test::{
    inventory, machine_fixtures, standard_inventory, CapturingRenderer, CommandVerifier,
    InterfaceBuilder, MachineBuilder, RecordingRunner, ScopeVerifier, StaticResolver,
    FIXTURE_NEXT_SERVER,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

const WEB1_MAC: &str = "aa:bb:cc:dd:ee:ff";
const DB1_ETH1: &str = "52:54:00:00:00:01";
const DB1_ETH2: &str = "52:54:00:00:00:02";

const DHCP_TEMPLATE: &str = "\
# generated {{ date }}
next-server {{ next_server }};
{% for tag, scope in dhcp_tags|items %}
group {{ tag }} {
{% for mac, host in scope|items %}
  host {{ host.name }} {
    hardware ethernet {{ mac }};
{% if host.ip_address %}
    fixed-address {{ host.ip_address }};
{% endif %}
{% if host.filename %}
    filename \"{{ host.filename }}\";
{% endif %}
  }
{% endfor %}
}
{% endfor %}
";

struct Harness {
    dir: TempDir,
    inventory: Arc<MemoryInventory>,
    runner: Arc<RecordingRunner>,
    renderer: Arc<CapturingRenderer>,
    ctx: ManagerContext,
}

impl Harness {
    fn new(inventory: Arc<MemoryInventory>, settings_toml: &str) -> Self {
        Self::with_runner(inventory, settings_toml, RecordingRunner::new())
    }

    fn with_runner(
        inventory: Arc<MemoryInventory>,
        settings_toml: &str,
        runner: RecordingRunner,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::from_toml(settings_toml).unwrap();
        settings.paths.dhcp_template = dir.path().join("dhcp.template");
        settings.paths.dhcp6_template = dir.path().join("dhcp6.template");
        settings.paths.dhcpd_conf = dir.path().join("dhcpd.conf");
        settings.paths.dhcpd6_conf = dir.path().join("dhcpd6.conf");
        std::fs::write(&settings.paths.dhcp_template, DHCP_TEMPLATE).unwrap();
        std::fs::write(&settings.paths.dhcp6_template, DHCP_TEMPLATE).unwrap();

        let runner = Arc::new(runner);
        let renderer = Arc::new(CapturingRenderer::new());
        let ctx = ManagerContext::new(inventory.clone(), Arc::new(settings))
            .with_runner(runner.clone())
            .with_renderer(renderer.clone());

        Self {
            dir,
            inventory,
            runner,
            renderer,
            ctx,
        }
    }

    fn isc(&self) -> IscMgr {
        IscMgr::new(self.ctx.clone())
    }

    fn context(&self, file_name: &str) -> Value {
        self.renderer
            .last_for(file_name)
            .unwrap_or_else(|| panic!("{} was not rendered", file_name))
            .context
    }
}

#[tokio::test]
async fn test_web_server_gets_arch_boot_file() {
    let h = Harness::new(inventory(vec![machine_fixtures::web_server()]), "");
    h.isc().write_configs().await.unwrap();

    let ctx = h.context("dhcpd.conf");
    let v = ScopeVerifier::new(&ctx).unwrap();
    v.assert_field("default", WEB1_MAC, "name", "web1").unwrap();
    v.assert_field("default", WEB1_MAC, "filename", "grub/grubaa64.efi")
        .unwrap();
    v.assert_field("default", WEB1_MAC, "ip_address", "10.0.0.10")
        .unwrap();
    v.assert_field("default", WEB1_MAC, "gateway", "10.0.0.254")
        .unwrap();
    v.assert_field("default", WEB1_MAC, "next_server", FIXTURE_NEXT_SERVER)
        .unwrap();
    v.assert_field("default", WEB1_MAC, "owner", "web1").unwrap();
    assert_eq!(ctx["yaboot"], "/yaboot");
    assert_eq!(ctx["boot_server"], "127.0.0.1:80");
}

#[tokio::test]
async fn test_bond_collapses_to_first_slave() {
    let h = Harness::new(inventory(vec![machine_fixtures::bonded_db_server()]), "");
    h.isc().write_configs().await.unwrap();

    let ctx = h.context("dhcpd.conf");
    let v = ScopeVerifier::new(&ctx).unwrap();
    v.assert_scope_size("storage", 1).unwrap();
    v.assert_field("storage", DB1_ETH1, "name", "db1-eth1").unwrap();
    v.assert_field("storage", DB1_ETH1, "ip_address", "10.0.1.20")
        .unwrap();
    v.assert_field("storage", DB1_ETH1, "netmask", "255.255.255.0")
        .unwrap();
    v.assert_absent(DB1_ETH2).unwrap();
    v.assert_scope_size("default", 0).unwrap();
}

#[tokio::test]
async fn test_untagged_bridge_group_in_default_scope() {
    let machine = MachineBuilder::new("db2", "db")
        .interface(InterfaceBuilder::new("br0").kind(InterfaceType::Bridge).dns("db2"))
        .interface(InterfaceBuilder::new("br0.10").ip("10.0.10.2"))
        .interface(
            InterfaceBuilder::new("eth3")
                .mac("52:54:00:00:02:03")
                .slave_of("br0", InterfaceType::BridgeSlave),
        )
        .interface(
            InterfaceBuilder::new("eth4")
                .mac("52:54:00:00:02:04")
                .slave_of("br0", InterfaceType::BridgeSlave),
        )
        .build();
    let h = Harness::new(inventory(vec![machine]), "");
    h.isc().write_configs().await.unwrap();

    let ctx = h.context("dhcpd.conf");
    let v = ScopeVerifier::new(&ctx).unwrap();
    assert_eq!(v.tags(), vec!["default"]);
    v.assert_scope_size("default", 1).unwrap();
    // master has no address of its own; its first sub-interface supplies one
    v.assert_field("default", "52:54:00:00:02:03", "ip_address", "10.0.10.2")
        .unwrap();
    v.assert_absent("52:54:00:00:02:04").unwrap();
}

#[tokio::test]
async fn test_standard_inventory_scopes() {
    let h = Harness::new(standard_inventory(), "");
    h.isc().write_configs().await.unwrap();

    let ctx = h.context("dhcpd.conf");
    let v = ScopeVerifier::new(&ctx).unwrap();
    assert_eq!(v.tags(), vec!["default", "lab", "storage"]);

    // interface tag, then machine tag, then default
    v.assert_entry("storage", DB1_ETH1).unwrap();
    v.assert_field("lab", "52:54:00:00:07:01", "name", "node7.example.com")
        .unwrap();
    v.assert_field(
        "lab",
        "52:54:00:00:07:02",
        "name",
        "node7-bmc.example.com-bmc",
    )
    .unwrap();
    v.assert_field("lab", "52:54:00:00:07:01", "filename", Value::Null)
        .unwrap();
    v.assert_entry("default", WEB1_MAC).unwrap();

    // CIDR-addressed machine is not managed
    v.assert_absent("52:54:00:00:09:01").unwrap();
}

#[tokio::test]
async fn test_interface_without_mac_gets_no_entry() {
    let machine = MachineBuilder::new("nomac", "image")
        .interface(InterfaceBuilder::new("eth0").ip("10.0.5.1").dns("nomac"))
        .build();
    let h = Harness::new(inventory(vec![machine]), "");
    h.isc().write_configs().await.unwrap();

    let ctx = h.context("dhcpd.conf");
    let v = ScopeVerifier::new(&ctx).unwrap();
    assert_eq!(v.tags(), vec!["default"]);
    v.assert_scope_size("default", 0).unwrap();
}

#[tokio::test]
async fn test_aggregation_is_idempotent() {
    let h = Harness::new(standard_inventory(), "[dhcp]\nenable_dhcpv6 = 1\n");
    let isc = h.isc();

    isc.write_configs().await.unwrap();
    isc.write_configs().await.unwrap();

    let rendered = h.renderer.rendered();
    assert_eq!(rendered.len(), 4);
    assert_eq!(rendered[0].context["dhcp_tags"], rendered[2].context["dhcp_tags"]);
    assert_eq!(rendered[1].context["dhcp_tags"], rendered[3].context["dhcp_tags"]);
}

#[tokio::test]
async fn test_v6_scopes() {
    let power = MachineBuilder::new("p1", "power")
        .interface(
            InterfaceBuilder::new("eth0")
                .mac("52:54:00:00:0a:01")
                .ipv6("2001:db8::a1")
                .dns("p1"),
        )
        .build();
    let h = Harness::new(
        inventory(vec![power]),
        "[dhcp]\nenable_dhcpv4 = 0\nenable_dhcpv6 = true\n",
    );
    h.isc().write_configs().await.unwrap();

    assert!(h.renderer.last_for("dhcpd.conf").is_none());
    let ctx = h.context("dhcpd6.conf");
    assert_eq!(ctx["next_server_v6"], "127.0.0.1");
    let v = ScopeVerifier::new(&ctx).unwrap();
    v.assert_field("default", "52:54:00:00:0a:01", "filename", "grub/grub.ppc64")
        .unwrap();
    v.assert_field("default", "52:54:00:00:0a:01", "ipv6_address", "2001:db8::a1")
        .unwrap();
    v.assert_field("default", "52:54:00:00:0a:01", "next_server", Value::Null)
        .unwrap();
}

#[tokio::test]
async fn test_sync_validates_then_restarts() {
    let h = Harness::new(standard_inventory(), "");
    assert_eq!(h.isc().sync().await.unwrap(), 0);

    let commands = h.runner.commands();
    let v = CommandVerifier::new(&commands);
    v.assert_count(2).unwrap();
    v.assert_order(" -t -q -cf ", "systemctl restart \"dhcpd\"")
        .unwrap();
    v.assert_not_ran("dhcpd6").unwrap();
}

#[tokio::test]
async fn test_restart_disabled_by_string_zero() {
    let h = Harness::new(standard_inventory(), "[dhcp]\nrestart_dhcp = \"0\"\n");
    assert_eq!(h.isc().sync().await.unwrap(), 0);

    assert!(h.runner.commands().is_empty());
    assert_eq!(h.renderer.rendered().len(), 1);
}

#[tokio::test]
async fn test_failed_check_still_restarts() {
    let h = Harness::with_runner(
        standard_inventory(),
        "[dhcp]\nenable_dhcpv6 = \"1\"\n",
        RecordingRunner::new()
            .exit_with(" -t -q", 1)
            .exit_with("restart \"dhcpd6\"", 4),
    );
    assert_eq!(h.isc().sync().await.unwrap(), 4);

    let commands = h.runner.commands();
    let v = CommandVerifier::new(&commands);
    v.assert_count(4).unwrap();
    v.assert_ran("-6 -t -q -cf").unwrap();
    v.assert_order("restart \"dhcpd\"", "restart \"dhcpd6\"")
        .unwrap();
}

#[tokio::test]
async fn test_v4_disabled_writes_and_restarts_nothing() {
    let h = Harness::new(standard_inventory(), "[dhcp]\nenable_dhcpv4 = false\n");
    assert_eq!(h.isc().sync().await.unwrap(), 0);

    assert!(h.renderer.rendered().is_empty());
    assert!(h.runner.commands().is_empty());
}

#[tokio::test]
async fn test_missing_template_fails_sync() {
    let h = Harness::new(standard_inventory(), "");
    std::fs::remove_file(h.dir.path().join("dhcp.template")).unwrap();

    let err = h.isc().sync().await.unwrap_err();
    assert!(matches!(err, BootSyncError::TemplateRead { .. }));
    assert!(err.is_configuration_error());
    assert!(h.runner.commands().is_empty());
}

#[tokio::test]
async fn test_ip_sync_then_isc() {
    let machine = MachineBuilder::new("node8", "image")
        .interface(
            InterfaceBuilder::new("default")
                .mac("52:54:00:00:08:01")
                .dns("node8.example.com"),
        )
        .build();
    let h = Harness::new(inventory(vec![machine]), "");
    let resolver = Arc::new(
        StaticResolver::new().with_v4("node8.example.com", Ipv4Addr::new(10, 0, 8, 1)),
    );
    let ctx = h.ctx.clone().with_resolver(resolver.clone());

    IpSyncMgr::new(ctx.clone()).sync().await.unwrap();
    IscMgr::new(ctx).write_configs().await.unwrap();

    assert_eq!(resolver.lookups(), vec!["node8.example.com"]);
    let machines = h.inventory.machines().unwrap();
    assert_eq!(
        machines[0].interface("default").unwrap().ip_address.as_deref(),
        Some("10.0.8.1")
    );

    let ctx = h.context("dhcpd.conf");
    ScopeVerifier::new(&ctx)
        .unwrap()
        .assert_field("default", "52:54:00:00:08:01", "ip_address", "10.0.8.1")
        .unwrap();
}

#[tokio::test]
async fn test_rendered_file_on_disk() {
    let h = Harness::new(standard_inventory(), "");
    let ctx = h.ctx.clone().with_renderer(Arc::new(TemplateRenderer));
    IscMgr::new(ctx).write_configs().await.unwrap();

    let text = std::fs::read_to_string(h.dir.path().join("dhcpd.conf")).unwrap();
    assert!(text.starts_with("# generated "));
    assert!(text.contains("next-server 127.0.0.1;"));
    assert!(text.contains("group storage {"));
    assert!(text.contains("  host db1-eth1 {\n    hardware ethernet 52:54:00:00:00:01;"));
    assert!(text.contains("fixed-address 10.0.1.20;"));
    assert!(text.contains("filename \"grub/grubaa64.efi\";"));
    assert!(!text.contains(DB1_ETH2));
    assert!(!h.dir.path().join("dhcpd6.conf").exists());
}

#[tokio::test]
async fn test_default_registry() {
    let h = Harness::new(standard_inventory(), "");
    let registry = default_registry(h.ctx.clone()).unwrap();

    assert_eq!(registry.names(), vec!["ip_sync", "isc"]);
    let isc = registry.get(ISC_MANAGER_NAME).unwrap();
    assert_eq!(isc.what(), "isc");
    assert!(matches!(
        registry.get("tftp"),
        Err(BootSyncError::Registry { .. })
    ));
}
