//! Sequence-dependent setup times.
//!
//! Changing a machine from one product to another costs non-productive
//! time. The matrix maps directed product pairs to hours and falls back
//! to a default for pairs it does not know.
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sequence-dependent setup time matrix.
///
/// Entries are keyed `"{from}-{to}"` (plain string concatenation, exact
/// match). A machine that has no product mounted yet, or that already
/// carries the requested product, needs no setup at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupMatrix {
    /// Directed transition times: `"A-B"` → hours.
    times: BTreeMap<String, f64>,
    /// Fallback hours for pairs with no explicit entry.
    pub default_hours: f64,
}

impl SetupMatrix {
    /// Creates a matrix with no explicit entries.
    pub fn new(default_hours: f64) -> Self {
        Self {
            times: BTreeMap::new(),
            default_hours,
        }
    }

    /// Creates a matrix from pre-built `"{from}-{to}"` keyed entries.
    pub fn from_entries(times: BTreeMap<String, f64>, default_hours: f64) -> Self {
        Self {
            times,
            default_hours,
        }
    }

    /// Defines the transition time between two products.
    pub fn set(&mut self, from: &str, to: &str, hours: f64) {
        self.times.insert(format!("{from}-{to}"), hours);
    }

    /// Builder: defines a transition and returns self.
    pub fn with_transition(mut self, from: &str, to: &str, hours: f64) -> Self {
        self.set(from, to, hours);
        self
    }

    /// Setup hours needed to go from `prev` to `next`.
    ///
    /// Returns 0 when no product is mounted or the product is unchanged,
    /// the explicit entry when one exists, and the default otherwise.
    pub fn hours(&self, prev: Option<&str>, next: &str) -> f64 {
        match prev {
            None => 0.0,
            Some(p) if p == next => 0.0,
            Some(p) => *self
                .times
                .get(&format!("{p}-{next}"))
                .unwrap_or(&self.default_hours),
        }
    }

    /// Number of explicitly defined transitions.
    pub fn entry_count(&self) -> usize {
        self.times.len()
    }

    /// Iterates the explicit entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.times.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
