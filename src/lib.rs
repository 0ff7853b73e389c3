//! Heuristic production scheduling for work orders on non-identical
//! parallel machines with sequence-dependent setup times.
//!
//! Given a batch of work orders (each needing one or more products in
//! given quantities) and a set of machines (units/hour capacity, a
//! mounted product, an availability clock), the scheduler emits a
//! time-ordered program of SETUP and PRODUCTION blocks per machine and
//! a summary of on-time and late orders. Priorities are lexicographic:
//! fewest late orders, then makespan, then total changeover time.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `WorkOrder` (both input dialects),
//!   `Machine`/`MachineState`, `SetupMatrix`, schedule `Block`s
//! - **`scheduler`**: The dispatch algorithms and the
//!   [`HeuristicScheduler`] entry point
//! - **`validation`**: Defensive request checks with named fields
//!
//! # Two input dialects
//!
//! Orders arrive either with a `products` map (product → quantity) or
//! in the older single-`format`/`qty` shape. A batch made up entirely
//! of single-format orders runs through the original greedy dispatcher,
//! which may produce ahead of future same-format demand; any other
//! batch runs through the two-phase product-group dispatcher with
//! optional parallel splitting.
//!
//! # Determinism
//!
//! Equal inputs produce byte-identical output. Every iteration order
//! that can reach the output is fixed (product id, machine name, order
//! id); no unordered-map traversal is observable.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use ot_scheduler::{HeuristicScheduler, Machine, ScheduleRequest, WorkOrder};
//!
//! let orders = vec![
//!     WorkOrder::new("OT0", 20.0, 5).with_product("A", 200).with_product("B", 300),
//!     WorkOrder::new("OT1", 20.0, 4).with_product("B", 250),
//! ];
//! let mut machines = BTreeMap::new();
//! machines.insert("Linea_1".to_string(), Machine::new(120.0));
//! machines.insert("Linea_2".to_string(), Machine::new(90.0));
//!
//! let request = ScheduleRequest::new(orders, machines)
//!     .with_setup_time("A", "B", 1.5)
//!     .with_setup_time("B", "A", 1.5);
//!
//! let result = HeuristicScheduler::new().schedule(&request).unwrap();
//! assert!(result.makespan() > 0.0);
//! assert!(result.summary.atrasos.is_empty());
//! ```

pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::{InputError, ScheduleError};
pub use models::{
    Block, Demand, LegacyOrderInfo, Machine, MachineState, ProductionBlock, SetupBlock,
    SetupMatrix, WorkOrder,
};
pub use scheduler::{
    Delay, HeuristicScheduler, ScheduleRequest, ScheduleResult, Summary, URGENT_DUE_HOURS,
};
pub use validation::validate_request;
