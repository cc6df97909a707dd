//! netscope Decision - Rule evaluation over ranked measurement reports
//!
//! Three independent generators, each a pure function of whatever reports
//! are available:
//! - [`RecommendationEngine`]: prioritised, human-readable recommendations
//! - [`ArchitectureBuilder`]: a nine-field connection architecture
//! - [`TemplateGenerator`]: tuned connection parameters plus a flat template
//!
//! Missing inputs never fail a generator; every rule has a documented default.

#![warn(clippy::all)]

pub mod architecture;
pub mod recommendation;
pub mod template;

pub use architecture::{ArchitectureBuilder, ArchitecturePlan};
pub use recommendation::{Category, Recommendation, RecommendationEngine};
pub use template::{ConfigTemplate, TemplateGenerator};
