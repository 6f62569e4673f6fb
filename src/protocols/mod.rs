use std::collections::HashMap;

/// Name reported for protocol codes outside the table.
pub const UNKNOWN_PROTOCOL: &str = "unknown";

/// Well-known IANA assigned internet protocol numbers.
const IANA_PROTOCOLS: &[(&str, &str)] = &[
    ("1", "icmp"),
    ("2", "igmp"),
    ("6", "tcp"),
    ("17", "udp"),
    ("41", "ipv6-encapsulation"),
    ("47", "gre"),
    ("50", "esp"),
    ("51", "ah"),
    ("58", "icmpv6"),
    ("89", "ospf"),
    ("132", "sctp"),
];

/// Resolves numeric protocol codes (as found in flow logs) to lowercase names.
///
/// Built once and shared by reference; it is never mutated after construction.
#[derive(Debug, Clone)]
pub struct ProtocolResolver {
    names: HashMap<&'static str, &'static str>,
}

impl ProtocolResolver {
    /// Resolver over the well-known IANA protocol numbers
    pub fn iana() -> Self {
        Self {
            names: IANA_PROTOCOLS.iter().copied().collect(),
        }
    }

    /// Resolve a protocol code, falling back to `"unknown"`
    pub fn resolve(&self, code: &str) -> &'static str {
        self.names.get(code).copied().unwrap_or(UNKNOWN_PROTOCOL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl Default for ProtocolResolver {
    fn default() -> Self {
        Self::iana()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_common_protocols() {
        let resolver = ProtocolResolver::iana();
        assert_eq!(resolver.resolve("6"), "tcp");
        assert_eq!(resolver.resolve("17"), "udp");
        assert_eq!(resolver.resolve("1"), "icmp");
        assert_eq!(resolver.resolve("41"), "ipv6-encapsulation");
        assert_eq!(resolver.resolve("132"), "sctp");
    }

    #[test]
    fn test_resolve_unknown() {
        let resolver = ProtocolResolver::default();
        assert_eq!(resolver.resolve("999"), "unknown");
        assert_eq!(resolver.resolve(""), "unknown");
        // Codes are matched as written, not numerically
        assert_eq!(resolver.resolve("06"), "unknown");
        assert_eq!(resolver.resolve("TCP"), "unknown");
    }

    #[test]
    fn test_table_size() {
        assert_eq!(ProtocolResolver::iana().len(), 11);
    }
}
