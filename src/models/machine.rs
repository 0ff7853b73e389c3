//! Machine model.
//!
//! A machine produces any product at a fixed rate (units/hour) and
//! carries the product it last produced; switching products costs setup
//! time. On the wire machines arrive as a name-keyed mapping; the
//! dispatchers work on a name-sorted list of mutable states so every
//! machine iteration has a defined order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A machine as it appears in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Production rate in units per hour.
    pub capacity: f64,
    /// Earliest hour at which the machine can start its next block.
    #[serde(default)]
    pub available_at: f64,
    /// Product currently mounted, if any.
    #[serde(default)]
    pub last_format: Option<String>,
}

impl Machine {
    /// Creates an idle machine available at t=0 with nothing mounted.
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            available_at: 0.0,
            last_format: None,
        }
    }

    /// Sets the earliest start hour.
    pub fn with_available_at(mut self, hour: f64) -> Self {
        self.available_at = hour;
        self
    }

    /// Sets the currently mounted product.
    pub fn with_last_format(mut self, format: impl Into<String>) -> Self {
        self.last_format = Some(format.into());
        self
    }
}

/// Mutable per-machine dispatch state.
///
/// `available_at` is monotonically non-decreasing across a run;
/// `last_format` tracks the product just produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Machine name (the request map key).
    pub name: String,
    /// Production rate in units per hour.
    pub capacity: f64,
    /// Earliest hour for the next block.
    pub available_at: f64,
    /// Product currently mounted, if any.
    pub last_format: Option<String>,
}

impl MachineState {
    /// Builds the name-sorted state list from the request mapping.
    pub fn from_request(machines: &BTreeMap<String, Machine>) -> Vec<MachineState> {
        machines
            .iter()
            .map(|(name, m)| MachineState {
                name: name.clone(),
                capacity: m.capacity,
                available_at: m.available_at,
                last_format: m.last_format.clone(),
            })
            .collect()
    }

    /// Hours needed to produce `qty` units on this machine.
    #[inline]
    pub fn production_hours(&self, qty: u64) -> f64 {
        qty as f64 / self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_builder() {
        let m = Machine::new(120.0).with_available_at(2.5).with_last_format("A");
        assert_eq!(m.capacity, 120.0);
        assert_eq!(m.available_at, 2.5);
        assert_eq!(m.last_format.as_deref(), Some("A"));
    }

    #[test]
    fn test_machine_defaults_on_deserialize() {
        let m: Machine = serde_json::from_str(r#"{"capacity":90}"#).unwrap();
        assert_eq!(m.available_at, 0.0);
        assert!(m.last_format.is_none());
    }

    #[test]
    fn test_states_sorted_by_name() {
        let mut machines = BTreeMap::new();
        machines.insert("Linea_2".to_string(), Machine::new(90.0));
        machines.insert("Linea_1".to_string(), Machine::new(120.0));
        machines.insert("Linea_10".to_string(), Machine::new(60.0));

        let states = MachineState::from_request(&machines);
        let names: Vec<&str> = states.iter().map(|s| s.name.as_str()).collect();
        // Lexicographic, not numeric
        assert_eq!(names, vec!["Linea_1", "Linea_10", "Linea_2"]);
    }

    #[test]
    fn test_production_hours() {
        let s = MachineState {
            name: "L1".into(),
            capacity: 120.0,
            available_at: 0.0,
            last_format: None,
        };
        assert!((s.production_hours(800) - 800.0 / 120.0).abs() < 1e-12);
        assert_eq!(s.production_hours(0), 0.0);
    }
}
