/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::snapshot
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Describe the host's current network link as a text block:
    transport, validation, resolvers, address families and
    private DNS state.

  Security / Safety Notes:
    Read-only. Reads procfs, sysfs and resolver configuration;
    never mutates host state and never panics the caller.

  Dependencies:
    libc for getifaddrs.

  Operational Scope:
    Invoked once per recorded failure from a blocking worker.

  Revision History:
    2026-10-19 COD  Added Linux snapshot provider.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Best-effort facts, explicit unknowns
    - Deterministic rendering
============================================================*/

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_HEADER: &str = "== Network Snapshot ==";
pub const UNAVAILABLE: &str = "<unavailable>";

/// Producer of the environment snapshot text. Must not panic.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot_text(&self) -> String;
}

impl<F> SnapshotProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn snapshot_text(&self) -> String {
        self()
    }
}

/// Provider returning fixed text; for embedders that collect facts elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSnapshotProvider(pub String);

impl SnapshotProvider for StaticSnapshotProvider {
    fn snapshot_text(&self) -> String {
        self.0.clone()
    }
}

/// Active transport category of the default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCategory {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    Other,
    None,
}

impl TransportCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportCategory::Wifi => "wifi",
            TransportCategory::Cellular => "cellular",
            TransportCategory::Ethernet => "ethernet",
            TransportCategory::Vpn => "vpn",
            TransportCategory::Other => "other",
            TransportCategory::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateDnsState {
    Off,
    Opportunistic,
    Strict,
    Unknown,
}

impl PrivateDnsState {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivateDnsState::Off => "off",
            PrivateDnsState::Opportunistic => "opportunistic",
            PrivateDnsState::Strict => "strict",
            PrivateDnsState::Unknown => "unknown",
        }
    }
}

/// Point-in-time link facts. `None` means the fact could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFacts {
    pub transport: TransportCategory,
    pub interface: Option<String>,
    pub validated: Option<bool>,
    pub internet: Option<bool>,
    pub captive_portal: Option<bool>,
    pub dns_servers: Vec<String>,
    pub has_ipv4: Option<bool>,
    pub has_ipv6: Option<bool>,
    pub private_dns: PrivateDnsState,
}

impl LinkFacts {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{SNAPSHOT_HEADER}");
        let _ = writeln!(out, "transport={}", self.transport.as_str());
        let _ = writeln!(out, "interface={}", self.interface.as_deref().unwrap_or("-"));
        let _ = writeln!(out, "validated={}", flag(self.validated));
        let _ = writeln!(out, "internet={}", flag(self.internet));
        let _ = writeln!(out, "captivePortal={}", flag(self.captive_portal));
        let dns = if self.dns_servers.is_empty() {
            "-".to_string()
        } else {
            self.dns_servers.join(", ")
        };
        let _ = writeln!(out, "dnsServers={dns}");
        let _ = writeln!(out, "hasIPv4={}", flag(self.has_ipv4));
        let _ = writeln!(out, "hasIPv6={}", flag(self.has_ipv6));
        let _ = write!(out, "privateDns={}", self.private_dns.as_str());
        out
    }
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}

/// Placeholder block used whenever facts cannot be collected.
pub fn unavailable_snapshot() -> String {
    format!("{SNAPSHOT_HEADER}\n{UNAVAILABLE}")
}

/// Snapshot provider backed by the local Linux host.
#[derive(Debug, Clone)]
pub struct SystemSnapshotProvider {
    root: PathBuf,
}

impl Default for SystemSnapshotProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSnapshotProvider {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Read procfs/sysfs/resolver files below `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Collect facts; `None` when the routing table is unreadable.
    pub fn collect(&self) -> Option<LinkFacts> {
        let route_table = read(&self.root, "proc/net/route")?;
        let ipv6_routes = read(&self.root, "proc/net/ipv6_route").unwrap_or_default();

        let interface =
            default_route_interface(&route_table).or_else(|| default_ipv6_interface(&ipv6_routes));

        let (transport, validated) = match interface.as_deref() {
            Some(name) => {
                let class_dir = format!("sys/class/net/{name}");
                let transport = categorize_interface(name, &self.root.join(&class_dir));
                let operstate = read(&self.root, &format!("{class_dir}/operstate"));
                let carrier = read(&self.root, &format!("{class_dir}/carrier"));
                (transport, link_validated(operstate.as_deref(), carrier.as_deref()))
            }
            None => (TransportCategory::None, Some(false)),
        };

        let resolv = read(&self.root, "etc/resolv.conf").unwrap_or_default();
        let mut dns_servers = parse_nameservers(&resolv);
        if dns_servers.iter().all(|server| server.starts_with("127.0.0.5")) {
            // systemd-resolved stub: upstream servers live in the managed copy.
            if let Some(upstream) = read(&self.root, "run/systemd/resolve/resolv.conf") {
                let upstream = parse_nameservers(&upstream);
                if !upstream.is_empty() {
                    dns_servers = upstream;
                }
            }
        }

        let (has_ipv4, has_ipv6) = if self.root == Path::new("/") {
            match interface_address_families() {
                Some((v4, v6)) => (Some(v4), Some(v6)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        Some(LinkFacts {
            transport,
            internet: Some(interface.is_some()),
            interface,
            validated,
            captive_portal: None,
            dns_servers,
            has_ipv4,
            has_ipv6,
            private_dns: self.private_dns_state(),
        })
    }

    fn private_dns_state(&self) -> PrivateDnsState {
        let mut state = read(&self.root, "etc/systemd/resolved.conf")
            .map(|body| parse_dns_over_tls(&body))
            .unwrap_or(PrivateDnsState::Unknown);

        let dropin_dir = self.root.join("etc/systemd/resolved.conf.d");
        if let Ok(entries) = std::fs::read_dir(&dropin_dir) {
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().map(|ext| ext == "conf").unwrap_or(false))
                .collect();
            files.sort();
            for file in files {
                if let Ok(body) = std::fs::read_to_string(&file) {
                    match parse_dns_over_tls(&body) {
                        PrivateDnsState::Unknown => {}
                        found => state = found,
                    }
                }
            }
        }
        state
    }
}

impl SnapshotProvider for SystemSnapshotProvider {
    fn snapshot_text(&self) -> String {
        let collected = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.collect()));
        match collected {
            Ok(Some(facts)) => facts.render(),
            Ok(None) | Err(_) => unavailable_snapshot(),
        }
    }
}

fn read(root: &Path, relative: &str) -> Option<String> {
    std::fs::read_to_string(root.join(relative)).ok()
}

/// Interface of the IPv4 default route in `/proc/net/route` format.
pub(crate) fn default_route_interface(table: &str) -> Option<String> {
    const RTF_UP: u32 = 0x1;
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return None;
        }
        let flags = u32::from_str_radix(fields[3], 16).ok()?;
        if fields[1] == "00000000" && flags & RTF_UP != 0 && fields[0] != "lo" {
            Some(fields[0].to_string())
        } else {
            None
        }
    })
}

/// Interface of the IPv6 default route in `/proc/net/ipv6_route` format.
pub(crate) fn default_ipv6_interface(table: &str) -> Option<String> {
    table.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            return None;
        }
        let is_default = fields[0].chars().all(|c| c == '0') && fields[1] == "00";
        if is_default && fields[9] != "lo" {
            Some(fields[9].to_string())
        } else {
            None
        }
    })
}

pub(crate) fn categorize_interface(name: &str, class_dir: &Path) -> TransportCategory {
    if class_dir.join("wireless").exists() || class_dir.join("phy80211").exists() {
        return TransportCategory::Wifi;
    }
    if class_dir.join("tun_flags").exists() {
        return TransportCategory::Vpn;
    }
    let prefixed = |prefixes: &[&str]| prefixes.iter().any(|prefix| name.starts_with(prefix));
    if prefixed(&["wl"]) {
        TransportCategory::Wifi
    } else if prefixed(&["tun", "tap", "wg", "ppp", "ipsec", "utun"]) {
        TransportCategory::Vpn
    } else if prefixed(&["wwan", "rmnet", "ccmni", "usb"]) {
        TransportCategory::Cellular
    } else if prefixed(&["en", "eth"]) {
        TransportCategory::Ethernet
    } else {
        TransportCategory::Other
    }
}

fn link_validated(operstate: Option<&str>, carrier: Option<&str>) -> Option<bool> {
    match (operstate.map(str::trim), carrier.map(str::trim)) {
        (Some("up"), Some(carrier)) => Some(carrier == "1"),
        (Some("up"), None) => Some(true),
        (Some("unknown"), _) | (None, _) => None,
        (Some(_), _) => Some(false),
    }
}

pub(crate) fn parse_nameservers(resolv: &str) -> Vec<String> {
    let mut servers = Vec::new();
    for line in resolv.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let mut parts = line.split_whitespace();
        if parts.next() == Some("nameserver") {
            if let Some(server) = parts.next() {
                if !servers.iter().any(|known: &String| known == server) {
                    servers.push(server.to_string());
                }
            }
        }
    }
    servers
}

pub(crate) fn parse_dns_over_tls(conf: &str) -> PrivateDnsState {
    let mut state = PrivateDnsState::Unknown;
    for line in conf.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "DNSOverTLS" {
                state = match value.trim().to_ascii_lowercase().as_str() {
                    "yes" | "true" | "1" => PrivateDnsState::Strict,
                    "opportunistic" => PrivateDnsState::Opportunistic,
                    "no" | "false" | "0" => PrivateDnsState::Off,
                    _ => PrivateDnsState::Unknown,
                };
            }
        }
    }
    state
}

/// Whether any non-loopback interface carries an IPv4 / IPv6 address.
#[cfg(unix)]
fn interface_address_families() -> Option<(bool, bool)> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: on success getifaddrs hands us a list released below with freeifaddrs.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return None;
    }

    let mut has_v4 = false;
    let mut has_v6 = false;
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: cursor points at a node of the list returned by getifaddrs.
        let entry = unsafe { &*cursor };
        let loopback = entry.ifa_flags & (libc::IFF_LOOPBACK as libc::c_uint) != 0;
        if !loopback && !entry.ifa_addr.is_null() {
            // SAFETY: ifa_addr was checked for null and points into the same list.
            let family = libc::c_int::from(unsafe { (*entry.ifa_addr).sa_family });
            if family == libc::AF_INET {
                has_v4 = true;
            } else if family == libc::AF_INET6 {
                has_v6 = true;
            }
        }
        cursor = entry.ifa_next;
    }

    // SAFETY: head came from a successful getifaddrs call and is freed once.
    unsafe { libc::freeifaddrs(head) };
    Some((has_v4, has_v6))
}

#[cfg(not(unix))]
fn interface_address_families() -> Option<(bool, bool)> {
    None
}
