//! netscope Common - Shared types for outbound path measurement
//!
//! This crate provides the value objects that flow through the
//! probe → aggregate → rank → decide pipeline:
//! - Per-family measurement records (location, DNS, CDN, protocol, ports)
//! - The network summary consumed by the decision engine
//! - The optional-everything decision input bundle
//! - Error handling
//!
//! Records are plain structs. Families differ only in which fields they
//! carry and which metric they rank by; there is no behavioural hierarchy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod input;
pub mod records;

pub use error::*;
pub use input::*;
pub use records::*;

/// Latency reported for a target with zero successful samples.
///
/// Large enough that unreachable targets sort last under any
/// ascending-latency comparison, even when `reachable` is ignored.
pub const SENTINEL_MS: f64 = 9999.0;

/// Round to a fixed number of decimal places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// A record that can be placed in a ranked family report.
pub trait Ranked {
    /// Whether at least one sample succeeded
    fn reachable(&self) -> bool;

    /// Current 1-based rank (0 until ranked)
    fn rank(&self) -> u32;

    /// Assign the 1-based rank
    fn set_rank(&mut self, rank: u32);
}
