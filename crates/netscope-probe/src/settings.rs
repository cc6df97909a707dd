//! Per-family probe settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a family runs its attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    /// Attempts per target
    pub samples: u32,
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Simultaneously running targets
    pub max_workers: usize,
    /// Throttle between attempts
    pub restricted: bool,
    /// Delay between attempts while restricted
    pub restricted_delay: Duration,
    /// Delay between attempts while unrestricted
    pub pacing: Option<Duration>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::location()
    }
}

impl ProbeSettings {
    /// Global latency targets: 5 connects of 5 s, 10 workers
    pub fn location() -> Self {
        Self {
            samples: 5,
            timeout: Duration::from_secs(5),
            max_workers: 10,
            restricted: false,
            restricted_delay: Duration::from_millis(300),
            pacing: None,
        }
    }

    /// DNS resolvers: `queries_per_domain` queries for each test domain
    pub fn dns(domains: usize, queries_per_domain: u32) -> Self {
        Self {
            samples: domains as u32 * queries_per_domain,
            timeout: Duration::from_secs(3),
            max_workers: 8,
            restricted: false,
            restricted_delay: Duration::from_millis(200),
            pacing: None,
        }
    }

    /// CDN edges: 3 connect+download rounds of 10 s, 6 workers
    pub fn cdn() -> Self {
        Self {
            samples: 3,
            timeout: Duration::from_secs(10),
            max_workers: 6,
            restricted: false,
            restricted_delay: Duration::from_millis(500),
            pacing: None,
        }
    }

    /// Protocol targets: 5 attempts of 5 s, 6 workers
    pub fn protocol() -> Self {
        Self {
            samples: 5,
            timeout: Duration::from_secs(5),
            max_workers: 6,
            restricted: false,
            restricted_delay: Duration::from_millis(300),
            pacing: None,
        }
    }

    /// Outbound ports: 3 connects of 3 s, 8 workers, always paced
    pub fn ports() -> Self {
        Self {
            samples: 3,
            timeout: Duration::from_secs(3),
            max_workers: 8,
            restricted: false,
            restricted_delay: Duration::from_millis(500),
            pacing: Some(Duration::from_millis(100)),
        }
    }

    /// Network scanner latency and stability sampling
    pub fn network() -> Self {
        Self {
            samples: 10,
            timeout: Duration::from_secs(5),
            max_workers: 1,
            restricted: false,
            restricted_delay: Duration::from_millis(200),
            pacing: None,
        }
    }

    /// Set restricted mode
    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Apply caller overrides on top of the family defaults
    pub fn with_overrides(mut self, overrides: &ProbeOverrides) -> Self {
        if let Some(samples) = overrides.samples {
            self.samples = samples.max(1);
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout = Duration::from_millis(timeout_ms.max(1));
        }
        if let Some(workers) = overrides.max_workers {
            self.max_workers = workers.max(1);
        }
        self
    }

    /// Delay to insert after each attempt, if any
    #[inline]
    pub fn attempt_delay(&self) -> Option<Duration> {
        if self.restricted {
            Some(self.restricted_delay)
        } else {
            self.pacing
        }
    }

    /// Upper bound on wall time for `targets` targets
    pub fn worst_case(&self, targets: usize) -> Duration {
        let workers = self.max_workers.max(1);
        let waves = targets.div_ceil(workers) as u32;
        let per_attempt = self.timeout + self.attempt_delay().unwrap_or_default();
        per_attempt * waves * self.samples
    }
}

/// Optional per-family overrides read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeOverrides {
    /// Attempts per target
    pub samples: Option<u32>,
    /// Per-attempt deadline in milliseconds
    pub timeout_ms: Option<u64>,
    /// Worker limit
    pub max_workers: Option<usize>,
}
