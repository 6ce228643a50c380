//! Network restriction by IP address or CIDR block.
//!
//! Works for both IPv4 and IPv6. IPv4-mapped IPv6 caller addresses
//! (`::ffff:10.0.0.5`) are compared as their IPv4 form.

use std::net::IpAddr;

use ipnet::IpNet;

/// One configured allowlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowlistEntry {
    /// Entry without a prefix length: exact address match only
    Address(IpAddr),
    /// `subnet/prefix`: match when `ip & mask == subnet & mask`
    Network(IpNet),
}

impl AllowlistEntry {
    /// Parse an entry. Returns `None` for anything unparsable, including
    /// prefix lengths longer than the address family allows.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.contains('/') {
            raw.parse::<IpNet>().ok().map(AllowlistEntry::Network)
        } else {
            raw.parse::<IpAddr>()
                .ok()
                .map(|ip| AllowlistEntry::Address(ip.to_canonical()))
        }
    }

    pub fn matches(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        match self {
            AllowlistEntry::Address(addr) => *addr == ip,
            AllowlistEntry::Network(net) => net.contains(&ip),
        }
    }
}

/// Allowlist as configured through `IP_ALLOWLIST`.
///
/// An empty list disables filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpAllowlist {
    entries: Vec<AllowlistEntry>,
}

impl IpAllowlist {
    /// Build the allowlist from configured strings, skipping blanks.
    ///
    /// Returns the first entry that does not parse so configuration loading
    /// can fail instead of silently dropping a restriction.
    pub fn parse<S: AsRef<str>>(raw_entries: &[S]) -> Result<Self, String> {
        let mut entries = Vec::new();
        for raw in raw_entries.iter().map(AsRef::as_ref) {
            if raw.trim().is_empty() {
                continue;
            }
            entries.push(AllowlistEntry::parse(raw).ok_or_else(|| raw.to_string())?);
        }
        Ok(Self { entries })
    }

    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the caller may connect.
    ///
    /// Always true when the list is empty. An unparsable caller address
    /// never matches.
    pub fn allows(&self, client_ip: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }

        let Ok(ip) = client_ip.trim().parse::<IpAddr>() else {
            return false;
        };

        self.entries.iter().any(|entry| entry.matches(ip))
    }
}

/// Test a single caller address against a single entry string.
///
/// Malformed input on either side is a non-match, never an error.
pub fn cidr_matches(client_ip: &str, entry: &str) -> bool {
    match (
        client_ip.trim().parse::<IpAddr>(),
        AllowlistEntry::parse(entry),
    ) {
        (Ok(ip), Some(entry)) => entry.matches(ip),
        _ => false,
    }
}
