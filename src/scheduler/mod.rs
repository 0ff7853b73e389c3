//! Heuristic production scheduling.
//!
//! The entry point is [`HeuristicScheduler::schedule`], a pure function
//! from a [`ScheduleRequest`] to a [`ScheduleResult`]. The batch's
//! input dialect picks the dispatch path: when every order is
//! single-format the original greedy dispatcher with anticipated
//! production runs; otherwise demand is decomposed per product and
//! dispatched in two urgency phases with optional parallel splitting.
//!
//! Lexicographic priority of the heuristic: fewest late orders, then
//! makespan, then total setup time. Output is deterministic: every
//! iteration that can affect it runs in a defined order (product id,
//! machine name, order id), never raw map order.

mod distribution;
mod integrity;
mod legacy;
mod summary;
mod tasks;
mod tracker;
mod two_phase;

pub use summary::{Delay, Summary};
pub use two_phase::URGENT_DUE_HOURS;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::{Block, Machine, MachineState, SetupMatrix, WorkOrder};
use crate::validation::validate_request;
use tracker::CompletionTracker;

fn default_horizon() -> f64 {
    12.0
}

fn default_holding_cost() -> f64 {
    0.002
}

fn default_setup_hours() -> f64 {
    1.5
}

/// Input container for a scheduling call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Work orders to place.
    pub orders: Vec<WorkOrder>,
    /// Machines by name.
    pub machines: BTreeMap<String, Machine>,
    /// Changeover hours keyed `"{from}-{to}"`.
    #[serde(default)]
    pub setup_times: BTreeMap<String, f64>,
    /// Forward window (hours) for anticipated production.
    #[serde(default = "default_horizon")]
    pub horizonte_aprovechamiento: f64,
    /// Holding cost per unit and hour of early stock.
    #[serde(default = "default_holding_cost")]
    pub costo_inventario_unitario: f64,
    /// Changeover hours for pairs missing from `setup_times`.
    #[serde(default = "default_setup_hours")]
    pub default_setup_time: f64,
}

impl ScheduleRequest {
    /// Creates a request with default tuning parameters.
    pub fn new(orders: Vec<WorkOrder>, machines: BTreeMap<String, Machine>) -> Self {
        Self {
            orders,
            machines,
            setup_times: BTreeMap::new(),
            horizonte_aprovechamiento: default_horizon(),
            costo_inventario_unitario: default_holding_cost(),
            default_setup_time: default_setup_hours(),
        }
    }

    /// Adds a changeover time.
    pub fn with_setup_time(mut self, from: &str, to: &str, hours: f64) -> Self {
        self.setup_times.insert(format!("{from}-{to}"), hours);
        self
    }

    /// Sets the anticipation horizon.
    pub fn with_horizon(mut self, hours: f64) -> Self {
        self.horizonte_aprovechamiento = hours;
        self
    }

    /// Sets the unit holding cost.
    pub fn with_holding_cost(mut self, cost: f64) -> Self {
        self.costo_inventario_unitario = cost;
        self
    }

    /// Sets the fallback changeover time.
    pub fn with_default_setup_time(mut self, hours: f64) -> Self {
        self.default_setup_time = hours;
        self
    }

    /// Whether every order uses the single-format dialect.
    pub fn is_single_format_batch(&self) -> bool {
        self.orders.iter().all(WorkOrder::is_single_format)
    }

    fn setup_matrix(&self) -> SetupMatrix {
        SetupMatrix::from_entries(self.setup_times.clone(), self.default_setup_time)
    }
}

/// A complete production program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// All blocks, by start hour (ties by machine name).
    pub schedule: Vec<Block>,
    /// Blocks per machine, each list in start order.
    pub schedule_by_machine: BTreeMap<String, Vec<Block>>,
    /// Run statistics.
    pub summary: Summary,
}

impl ScheduleResult {
    /// Latest block end across the program (hours).
    pub fn makespan(&self) -> f64 {
        self.summary.total_horas
    }

    /// Blocks of one machine, in start order.
    pub fn blocks_for_machine(&self, machine: &str) -> &[Block] {
        self.schedule_by_machine
            .get(machine)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All production blocks in schedule order.
    pub fn production_blocks(&self) -> impl Iterator<Item = &crate::models::ProductionBlock> {
        self.schedule.iter().filter_map(Block::as_production)
    }

    /// Whether an order met its due date (true when it was never late).
    pub fn is_on_time(&self, ot_id: &str) -> bool {
        !self.summary.atrasos.iter().any(|d| d.ot_id == ot_id)
    }
}

/// The two-dialect heuristic scheduler.
///
/// Stateless; a single instance may serve concurrent calls, each of
/// which owns its machine-state copies and output buffers.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use ot_scheduler::{HeuristicScheduler, Machine, ScheduleRequest, WorkOrder};
///
/// let orders = vec![WorkOrder::new("OT1", 12.0, 5).with_product("A", 800)];
/// let mut machines = BTreeMap::new();
/// machines.insert("L1".to_string(), Machine::new(120.0));
///
/// let result = HeuristicScheduler::new()
///     .schedule(&ScheduleRequest::new(orders, machines))
///     .unwrap();
/// assert_eq!(result.summary.total_setups, 0);
/// assert!(result.summary.atrasos.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScheduler;

impl HeuristicScheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Computes a production program for the request.
    ///
    /// Never fails on infeasible due dates; late orders land in
    /// `summary.atrasos`. Fails on invalid input or when the emitted
    /// schedule does not survive its own integrity audit; no partial
    /// schedule is ever returned.
    pub fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleResult, ScheduleError> {
        validate_request(request).map_err(ScheduleError::InvalidInput)?;

        let setup = request.setup_matrix();
        let mut machines = MachineState::from_request(&request.machines);
        let initial = machines.clone();
        let mut tracker = CompletionTracker::new(&request.orders);

        let single_format = request.is_single_format_batch();
        let (mut blocks, qty_extra_total, horizonte_usado) = if single_format {
            let outcome = legacy::dispatch(
                &request.orders,
                &mut machines,
                &setup,
                &mut tracker,
                request.horizonte_aprovechamiento,
                request.costo_inventario_unitario,
            );
            (
                outcome.blocks,
                outcome.qty_extra_total,
                request.horizonte_aprovechamiento,
            )
        } else {
            let blocks = two_phase::dispatch(&request.orders, &mut machines, &setup, &mut tracker);
            (blocks, 0, 0.0)
        };

        // A block is on time only if every order it serves finishes on time.
        for block in &mut blocks {
            if let Block::Production(p) = block {
                p.on_time = p.ot_ids.iter().all(|id| !tracker.is_late(id));
            }
        }

        blocks.sort_by(compare_blocks);

        integrity::audit(&blocks, &initial, &setup, &tracker)?;

        let mut schedule_by_machine: BTreeMap<String, Vec<Block>> = BTreeMap::new();
        for block in &blocks {
            schedule_by_machine
                .entry(block.machine().to_string())
                .or_default()
                .push(block.clone());
        }

        let summary = summary::build(&blocks, &tracker, qty_extra_total, horizonte_usado);
        tracing::info!(
            orders = summary.total_ots,
            setups = summary.total_setups,
            makespan = summary.total_horas,
            late = summary.atrasos.len(),
            single_format,
            "schedule computed"
        );

        Ok(ScheduleResult {
            schedule: blocks,
            schedule_by_machine,
            summary,
        })
    }
}

/// Global block order: start hour, then machine name, setups first.
fn compare_blocks(a: &Block, b: &Block) -> Ordering {
    a.start()
        .partial_cmp(&b.start())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.machine().cmp(b.machine()))
        .then_with(|| a.is_production().cmp(&b.is_production()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_line_machines() -> BTreeMap<String, Machine> {
        let mut machines = BTreeMap::new();
        machines.insert("Linea_1".to_string(), Machine::new(120.0));
        machines.insert("Linea_2".to_string(), Machine::new(90.0));
        machines
    }

    fn one_line_machines() -> BTreeMap<String, Machine> {
        let mut machines = BTreeMap::new();
        machines.insert("L1".to_string(), Machine::new(120.0));
        machines
    }

    fn full_setup_request(orders: Vec<WorkOrder>) -> ScheduleRequest {
        ScheduleRequest::new(orders, two_line_machines())
            .with_setup_time("A", "B", 1.5)
            .with_setup_time("B", "A", 1.5)
            .with_setup_time("A", "C", 2.0)
            .with_setup_time("C", "A", 2.0)
            .with_setup_time("B", "C", 1.0)
            .with_setup_time("C", "B", 1.0)
    }

    #[test]
    fn test_single_order_single_machine() {
        let orders = vec![WorkOrder::new("OT1", 12.0, 5).with_product("A", 800)];
        let request = ScheduleRequest::new(orders, one_line_machines());
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        assert_eq!(result.schedule.len(), 1);
        let p = result.schedule[0].as_production().unwrap();
        assert_eq!(p.start, 0.0);
        assert!((p.end - 800.0 / 120.0).abs() < 1e-6);
        assert!(p.on_time);
        assert_eq!(result.summary.total_setups, 0);
        assert!(result.summary.atrasos.is_empty());
        assert!((result.summary.total_horas - 800.0 / 120.0).abs() < 1e-6);
        assert_eq!(result.summary.qty_total_cliente, 800);
        assert_eq!(result.summary.horizonte_usado, 0.0);
    }

    #[test]
    fn test_legacy_two_orders_one_machine() {
        let orders = vec![
            WorkOrder::single("OT1", 12.0, 5, "A", 800),
            WorkOrder::single("OT2", 18.0, 4, "B", 500),
        ];
        let request = ScheduleRequest::new(orders, one_line_machines())
            .with_setup_time("A", "B", 1.5);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        // OT1 (priority 2.4) then setup then OT2 (priority 4.5)
        assert_eq!(result.schedule.len(), 3);
        let first = result.schedule[0].as_production().unwrap();
        assert_eq!(first.legacy.as_ref().unwrap().id, "OT1");
        assert!((first.end - 6.6667).abs() < 1e-3);

        assert!(result.schedule[1].is_setup());
        let second = result.schedule[2].as_production().unwrap();
        assert_eq!(second.legacy.as_ref().unwrap().id, "OT2");
        assert!((second.end - 12.3333).abs() < 1e-3);
        assert!(first.on_time && second.on_time);
        assert_eq!(result.summary.horizonte_usado, 12.0);
    }

    #[test]
    fn test_multi_product_grouping() {
        let orders = vec![
            WorkOrder::new("OT0", 20.0, 5)
                .with_product("A", 200)
                .with_product("B", 300),
            WorkOrder::new("OT1", 20.0, 4)
                .with_product("B", 250)
                .with_product("C", 150),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        let b_total: u64 = result
            .production_blocks()
            .filter(|p| p.product == "B")
            .map(|p| p.quantity)
            .sum();
        assert_eq!(b_total, 550);
        for p in result.production_blocks().filter(|p| p.product == "B") {
            assert_eq!(p.ot_ids, vec!["OT0", "OT1"]);
        }
        assert!(result.summary.atrasos.is_empty());
        assert_eq!(result.summary.qty_total_extra, 0);
    }

    #[test]
    fn test_infeasible_due_reported_not_raised() {
        let orders = vec![WorkOrder::new("OT9", 1.0, 1).with_product("A", 10000)];
        let mut machines = BTreeMap::new();
        machines.insert("L1".to_string(), Machine::new(100.0));
        let request = ScheduleRequest::new(orders, machines);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        let p = result.schedule[0].as_production().unwrap();
        assert!((p.end - 100.0).abs() < 1e-6);
        assert!(!p.on_time);
        assert_eq!(result.summary.atrasos.len(), 1);
        let delay = &result.summary.atrasos[0];
        assert_eq!(delay.ot_id, "OT9");
        assert!((delay.atraso_horas - 99.0).abs() < 1e-6);
        assert!(!result.is_on_time("OT9"));
    }

    #[test]
    fn test_mixed_batch_uses_multi_product_path() {
        let orders = vec![
            WorkOrder::single("OT1", 12.0, 5, "A", 800),
            WorkOrder::new("OT2", 18.0, 4).with_product("B", 500),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        // Multi-product path: no legacy info on any block, horizon unused
        assert!(result.production_blocks().all(|p| p.legacy.is_none()));
        assert_eq!(result.summary.horizonte_usado, 0.0);
        assert_eq!(result.summary.qty_total_extra, 0);
    }

    #[test]
    fn test_schedule_sorted_by_start_then_machine() {
        let orders = vec![
            WorkOrder::new("OT0", 20.0, 5).with_product("A", 2100),
            WorkOrder::new("OT1", 30.0, 4).with_product("B", 900),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        let mut prev = (f64::NEG_INFINITY, String::new());
        for block in &result.schedule {
            let key = (block.start(), block.machine().to_string());
            assert!(
                key.0 > prev.0 || (key.0 == prev.0 && key.1 >= prev.1),
                "schedule out of order at {key:?}"
            );
            prev = key;
        }
    }

    #[test]
    fn test_schedule_by_machine_consistent() {
        let orders = vec![
            WorkOrder::new("OT0", 20.0, 5).with_product("A", 2100),
            WorkOrder::new("OT1", 30.0, 4).with_product("B", 900),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        let grouped: usize = result.schedule_by_machine.values().map(Vec::len).sum();
        assert_eq!(grouped, result.schedule.len());
        for (name, blocks) in &result.schedule_by_machine {
            let mut prev = f64::NEG_INFINITY;
            for b in blocks {
                assert_eq!(b.machine(), name);
                assert!(b.start() >= prev);
                prev = b.start();
            }
        }
        assert!(result.blocks_for_machine("Linea_1").len() > 0);
        assert!(result.blocks_for_machine("NOPE").is_empty());
    }

    #[test]
    fn test_no_overlap_on_any_machine() {
        let orders = vec![
            WorkOrder::new("OT0", 20.0, 5)
                .with_product("A", 700)
                .with_product("B", 900),
            WorkOrder::new("OT1", 25.0, 3).with_product("C", 1400),
            WorkOrder::new("OT2", 60.0, 1)
                .with_product("A", 500)
                .with_product("C", 800),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        for blocks in result.schedule_by_machine.values() {
            for pair in blocks.windows(2) {
                assert!(pair[1].start() >= pair[0].end() - 1e-9);
            }
        }
    }

    #[test]
    fn test_deterministic_output() {
        let orders = vec![
            WorkOrder::new("OT0", 20.0, 5)
                .with_product("A", 700)
                .with_product("B", 900),
            WorkOrder::new("OT1", 25.0, 3).with_product("C", 1400),
            WorkOrder::single("OT2", 60.0, 1, "A", 500),
        ];
        let request = full_setup_request(orders);

        let scheduler = HeuristicScheduler::new();
        let first = serde_json::to_string(&scheduler.schedule(&request).unwrap()).unwrap();
        let second = serde_json::to_string(&scheduler.schedule(&request).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_makespan_monotone_in_quantity() {
        let base = vec![
            WorkOrder::new("OT0", 20.0, 5).with_product("A", 2000),
            WorkOrder::new("OT1", 30.0, 4).with_product("B", 900),
        ];
        let reduced = vec![
            WorkOrder::new("OT0", 20.0, 5).with_product("A", 1500),
            WorkOrder::new("OT1", 30.0, 4).with_product("B", 900),
        ];
        let scheduler = HeuristicScheduler::new();
        let full = scheduler
            .schedule(&full_setup_request(base))
            .unwrap()
            .makespan();
        let less = scheduler
            .schedule(&full_setup_request(reduced))
            .unwrap()
            .makespan();
        assert!(less <= full + 1e-9);
    }

    #[test]
    fn test_makespan_monotone_in_capacity() {
        let orders = || {
            vec![
                WorkOrder::new("OT0", 20.0, 5).with_product("A", 2000),
                WorkOrder::new("OT1", 30.0, 4).with_product("B", 900),
            ]
        };
        let scheduler = HeuristicScheduler::new();

        let slow = scheduler
            .schedule(&full_setup_request(orders()))
            .unwrap()
            .makespan();

        let mut machines = two_line_machines();
        machines.insert("Linea_1".to_string(), Machine::new(240.0));
        let request = ScheduleRequest::new(orders(), machines)
            .with_setup_time("A", "B", 1.5)
            .with_setup_time("B", "A", 1.5);
        let fast = scheduler.schedule(&request).unwrap().makespan();
        assert!(fast <= slow + 1e-9);
    }

    #[test]
    fn test_on_time_flag_matches_delays() {
        let orders = vec![
            WorkOrder::new("LATE", 1.0, 1).with_product("A", 5000),
            WorkOrder::new("FINE", 200.0, 1).with_product("B", 100),
        ];
        let request = full_setup_request(orders);
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        for p in result.production_blocks() {
            let any_late = p
                .ot_ids
                .iter()
                .any(|id| result.summary.atrasos.iter().any(|d| &d.ot_id == id));
            assert_eq!(p.on_time, !any_late);
        }
    }

    #[test]
    fn test_invalid_input_rejected() {
        let request = ScheduleRequest::new(Vec::new(), one_line_machines());
        let err = HeuristicScheduler::new().schedule(&request);
        assert!(matches!(err, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: ScheduleRequest = serde_json::from_str(
            r#"{
                "orders": [{"id":"OT1","due":12,"qty":800,"cluster":5,"format":"A"}],
                "machines": {"L1":{"capacity":120}}
            }"#,
        )
        .unwrap();
        assert_eq!(request.horizonte_aprovechamiento, 12.0);
        assert_eq!(request.costo_inventario_unitario, 0.002);
        assert_eq!(request.default_setup_time, 1.5);
        assert!(request.setup_times.is_empty());
        assert!(request.is_single_format_batch());
    }

    #[test]
    fn test_result_serializes_contract_fields() {
        let orders = vec![WorkOrder::single("OT1", 12.0, 5, "A", 800)];
        let request = ScheduleRequest::new(orders, one_line_machines());
        let result = HeuristicScheduler::new().schedule(&request).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["schedule"].is_array());
        assert!(json["schedule_by_machine"]["L1"].is_array());
        let summary = &json["summary"];
        for field in [
            "total_ots",
            "total_setups",
            "total_horas",
            "qty_total_cliente",
            "qty_total_extra",
            "atrasos",
            "horizonte_usado",
        ] {
            assert!(summary.get(field).is_some(), "missing summary.{field}");
        }
        let block = &json["schedule"][0];
        assert_eq!(block["type"], "PRODUCTION");
        assert_eq!(block["qty_cliente"], 800);
    }
}
