//! netscope Probe - Active measurement of outbound network paths
//!
//! Every test family runs the same pipeline:
//! - **Catalog**: static targets per family
//! - **Prober**: bounded fan-out with per-attempt deadlines and partial-failure tolerance
//! - **Aggregate**: raw timings reduced to mean/min/max/jitter/stability
//! - **Rank**: reachable first, then the family's metric, contiguous 1-based ranks
//!
//! Families only differ in their probe, their record shape and their
//! ranking key.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod catalog;
pub mod cdn;
pub mod dns;
pub mod location;
pub mod network;
pub mod ports;
pub mod prober;
pub mod protocol;
pub mod ranker;
pub mod settings;
pub mod transport;

pub use aggregate::TimingStats;
pub use cdn::CdnTester;
pub use dns::DnsAnalyzer;
pub use location::{LocationTester, RegionSummary};
pub use network::{NetworkScan, NetworkScanner};
pub use ports::PortScanner;
pub use prober::{Probe, Prober, SampleSet};
pub use protocol::ProtocolTester;
pub use ranker::rank_records;
pub use settings::{ProbeOverrides, ProbeSettings};
