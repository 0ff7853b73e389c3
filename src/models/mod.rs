//! Scheduling domain models.
//!
//! Core data types for the scheduling problem and its solution:
//! work orders (in both accepted input dialects), machines and their
//! mutable dispatch state, the setup-cost matrix, and the emitted
//! schedule blocks.

mod block;
mod machine;
mod order;
mod setup;

pub use block::{Block, LegacyOrderInfo, ProductionBlock, SetupBlock};
pub use machine::{Machine, MachineState};
pub use order::{Demand, WorkOrder};
pub use setup::SetupMatrix;
