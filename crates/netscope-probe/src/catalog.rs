//! Built-in probe target catalogs

use serde::{Deserialize, Serialize};

/// Global latency endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTarget {
    /// Host probed on TCP port 80
    pub host: String,
    /// Country code
    #[serde(default)]
    pub country: String,
    /// Continental region
    #[serde(default)]
    pub region: String,
    /// City
    #[serde(default)]
    pub city: String,
}

/// Public DNS resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServer {
    /// Display name
    pub name: String,
    /// Primary address queried on UDP 53
    pub ip: String,
    /// Secondary address, informational only
    #[serde(default)]
    pub secondary: Option<String>,
}

/// CDN edge with a downloadable test object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnEndpoint {
    /// Display name
    pub name: String,
    /// Edge host probed on TCP 443
    pub host: String,
    /// Test object URL
    pub test_url: String,
}

/// Host used by every protocol test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTarget {
    /// Display name
    pub name: String,
    /// Host name
    pub host: String,
}

/// Outbound port to check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTarget {
    /// Destination port
    pub port: u16,
    /// Service name
    #[serde(default)]
    pub service: String,
    /// Transport label
    #[serde(default = "default_transport")]
    pub protocol: String,
}

fn default_transport() -> String {
    "TCP".into()
}

/// Default destination for outbound port checks
pub const DEFAULT_PORT_TARGET: &str = "8.8.8.8";

/// Domains each resolver is asked about
pub const TEST_DOMAINS: &[&str] = &[
    "google.com",
    "cloudflare.com",
    "github.com",
    "amazon.com",
    "microsoft.com",
];

const GLOBAL_ENDPOINTS: &[(&str, &str, &str, &str)] = &[
    ("speedtest.london.linode.com", "UK", "Europe", "London"),
    ("speedtest.frankfurt.linode.com", "DE", "Europe", "Frankfurt"),
    ("speedtest.amsterdam.linode.com", "NL", "Europe", "Amsterdam"),
    ("ping.online.net", "FR", "Europe", "Paris"),
    ("speedtest.mil01.softlayer.com", "IT", "Europe", "Milan"),
    ("speedtest.newark.linode.com", "US", "North America", "Newark"),
    ("speedtest.dallas.linode.com", "US", "North America", "Dallas"),
    ("speedtest.fremont.linode.com", "US", "North America", "Fremont"),
    ("speedtest.toronto1.linode.com", "CA", "North America", "Toronto"),
    ("speedtest.tokyo2.linode.com", "JP", "Asia", "Tokyo"),
    ("speedtest.singapore.linode.com", "SG", "Asia", "Singapore"),
    ("speedtest.mumbai1.linode.com", "IN", "Asia", "Mumbai"),
    ("speedtest.uaeexchange.com", "AE", "Middle East", "Dubai"),
    ("speedtest.syd1.linode.com", "AU", "Oceania", "Sydney"),
    ("speedtest.sao01.softlayer.com", "BR", "South America", "São Paulo"),
];

const PUBLIC_DNS_SERVERS: &[(&str, &str, &str)] = &[
    ("Google DNS", "8.8.8.8", "8.8.4.4"),
    ("Cloudflare", "1.1.1.1", "1.0.0.1"),
    ("Quad9", "9.9.9.9", "149.112.112.112"),
    ("OpenDNS", "208.67.222.222", "208.67.220.220"),
    ("AdGuard DNS", "94.140.14.14", "94.140.15.15"),
    ("Comodo DNS", "8.26.56.26", "8.20.247.20"),
    ("CleanBrowsing", "185.228.168.9", "185.228.169.9"),
    ("Level3 DNS", "4.2.2.1", "4.2.2.2"),
    ("Yandex DNS", "77.88.8.8", "77.88.8.1"),
    ("Verisign DNS", "64.6.64.6", "64.6.65.6"),
    ("Shecan DNS", "178.22.122.100", "185.51.200.2"),
    ("403 DNS", "10.202.10.202", "10.202.10.102"),
    ("Electro DNS", "78.157.42.101", "78.157.42.100"),
];

const CDN_ENDPOINTS: &[(&str, &str, &str)] = &[
    ("Cloudflare", "speed.cloudflare.com", "https://speed.cloudflare.com/__down?bytes=10000"),
    ("Google CDN", "www.gstatic.com", "https://www.gstatic.com/generate_204"),
    (
        "Amazon CloudFront",
        "d1.awsstatic.com",
        "https://d1.awsstatic.com/logos/aws-logo-lockups/poweredbyaws/PB_AWS_logo_RGB_REV_SQ.8c88ac215fe4e441dc42865dd6962ed4f444a90d.png",
    ),
    ("Fastly", "www.fastly.com", "https://www.fastly.com/"),
    ("Akamai", "www.akamai.com", "https://www.akamai.com/"),
    (
        "Microsoft Azure CDN",
        "ajax.aspnetcdn.com",
        "https://ajax.aspnetcdn.com/ajax/jquery/jquery-3.7.1.min.js",
    ),
    (
        "jsDelivr",
        "cdn.jsdelivr.net",
        "https://cdn.jsdelivr.net/npm/jquery@3.7.1/dist/jquery.min.js",
    ),
    (
        "cdnjs (Cloudflare)",
        "cdnjs.cloudflare.com",
        "https://cdnjs.cloudflare.com/ajax/libs/jquery/3.7.1/jquery.min.js",
    ),
    ("StackPath", "www.stackpath.com", "https://www.stackpath.com/"),
    ("KeyCDN", "www.keycdn.com", "https://www.keycdn.com/"),
];

const PROTOCOL_TARGETS: &[(&str, &str)] = &[
    ("Google", "www.google.com"),
    ("Cloudflare", "cloudflare.com"),
    ("GitHub", "github.com"),
];

const COMMON_PORTS: &[(u16, &str, &str)] = &[
    (80, "HTTP", "TCP"),
    (443, "HTTPS", "TCP"),
    (8080, "HTTP Alt", "TCP"),
    (8443, "HTTPS Alt", "TCP"),
    (53, "DNS", "TCP/UDP"),
    (22, "SSH", "TCP"),
    (21, "FTP", "TCP"),
    (25, "SMTP", "TCP"),
    (587, "SMTP TLS", "TCP"),
    (993, "IMAP SSL", "TCP"),
    (995, "POP3 SSL", "TCP"),
    (3389, "RDP", "TCP"),
    (5222, "XMPP", "TCP"),
    (1194, "OpenVPN", "TCP/UDP"),
    (1723, "PPTP", "TCP"),
    (500, "IKE/IPSec", "UDP"),
    (4500, "IPSec NAT-T", "UDP"),
    (51820, "WireGuard", "UDP"),
    (2083, "cPanel SSL", "TCP"),
    (2096, "Webmail SSL", "TCP"),
];

/// Geographically diverse latency endpoints
pub fn global_endpoints() -> Vec<LocationTarget> {
    GLOBAL_ENDPOINTS
        .iter()
        .map(|(host, country, region, city)| LocationTarget {
            host: (*host).into(),
            country: (*country).into(),
            region: (*region).into(),
            city: (*city).into(),
        })
        .collect()
}

/// Well-known public resolvers
pub fn public_dns_servers() -> Vec<DnsServer> {
    PUBLIC_DNS_SERVERS
        .iter()
        .map(|(name, ip, secondary)| DnsServer {
            name: (*name).into(),
            ip: (*ip).into(),
            secondary: Some((*secondary).into()),
        })
        .collect()
}

/// Major CDN edges
pub fn cdn_endpoints() -> Vec<CdnEndpoint> {
    CDN_ENDPOINTS
        .iter()
        .map(|(name, host, test_url)| CdnEndpoint {
            name: (*name).into(),
            host: (*host).into(),
            test_url: (*test_url).into(),
        })
        .collect()
}

/// Hosts used by the protocol tests
pub fn protocol_targets() -> Vec<ProtocolTarget> {
    PROTOCOL_TARGETS
        .iter()
        .map(|(name, host)| ProtocolTarget {
            name: (*name).into(),
            host: (*host).into(),
        })
        .collect()
}

/// Commonly allowed or blocked service ports
pub fn common_ports() -> Vec<PortTarget> {
    COMMON_PORTS
        .iter()
        .map(|(port, service, protocol)| PortTarget {
            port: *port,
            service: (*service).into(),
            protocol: (*protocol).into(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(global_endpoints().len(), 15);
        assert_eq!(public_dns_servers().len(), 13);
        assert_eq!(cdn_endpoints().len(), 10);
        assert_eq!(protocol_targets().len(), 3);
        assert_eq!(common_ports().len(), 20);
    }

    #[test]
    fn test_ports_are_unique() {
        let ports: HashSet<_> = common_ports().into_iter().map(|p| p.port).collect();
        assert_eq!(ports.len(), 20);
    }

    #[test]
    fn test_port_target_default_transport() {
        let target: PortTarget = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(target.protocol, "TCP");
        assert!(target.service.is_empty());
    }
}
