//! Machine address lookup used when no instance address is configured.

use std::net::{IpAddr, Ipv4Addr};

/// Environment variable that pins the address reported by [`SystemAddressResolver`].
pub const LOCAL_IP_ENV: &str = "REGKIT_LOCAL_IP";

pub trait LocalAddressResolver: Send + Sync {
    /// Address this machine should be reached at. Looked up on every call.
    fn current_machine_address(&self) -> String;
}

/// Resolves from `REGKIT_LOCAL_IP`, then the first non-loopback interface,
/// then `127.0.0.1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddressResolver;

impl SystemAddressResolver {
    pub fn new() -> Self {
        Self
    }
}

impl LocalAddressResolver for SystemAddressResolver {
    fn current_machine_address(&self) -> String {
        pick_address(
            std::env::var(LOCAL_IP_ENV).ok(),
            local_ip_address::local_ip(),
        )
    }
}

fn pick_address<E: std::fmt::Display>(
    override_ip: Option<String>,
    detected: Result<IpAddr, E>,
) -> String {
    if let Some(ip) = override_ip.map(|s| s.trim().to_string()) {
        if !ip.is_empty() {
            return ip;
        }
    }
    match detected {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not detect local address, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST).to_string()
        }
    }
}

/// Always reports the same address.
#[derive(Debug, Clone)]
pub struct FixedAddressResolver(String);

impl FixedAddressResolver {
    pub fn new(ip: impl Into<String>) -> Self {
        Self(ip.into())
    }
}

impl LocalAddressResolver for FixedAddressResolver {
    fn current_machine_address(&self) -> String {
        self.0.clone()
    }
}
