//! Single-pass dispatch for single-format batches.
//!
//! The older request shape (one `format`/`qty` per order) keeps its
//! original behavior: orders run in ascending `due / cluster` order,
//! each on the one machine that finishes it earliest, and an order may
//! produce extra units now to absorb future same-format demand when
//! the saved changeover outweighs the holding cost ("aprovechamiento").
//! One order lives on exactly one machine; no quantity splitting.

use std::cmp::Ordering;

use super::tracker::CompletionTracker;
use crate::models::{
    Block, LegacyOrderInfo, MachineState, ProductionBlock, SetupBlock, SetupMatrix, WorkOrder,
};

/// Average changeover hours a merged future run is assumed to save.
pub const AVG_SETUP_HOURS_SAVED: f64 = 1.5;
/// Share of eligible future demand produced in advance.
pub const ANTICIPATION_SHARE: f64 = 0.5;

/// Result of a single-format dispatch.
#[derive(Debug)]
pub struct LegacyOutcome {
    /// Emitted blocks in emission order.
    pub blocks: Vec<Block>,
    /// Total units produced in anticipation across the batch.
    pub qty_extra_total: u64,
}

/// Dispatches a batch where every order is single-format.
pub fn dispatch(
    orders: &[WorkOrder],
    machines: &mut [MachineState],
    setup: &SetupMatrix,
    tracker: &mut CompletionTracker,
    horizon: f64,
    unit_holding_cost: f64,
) -> LegacyOutcome {
    let mut ordered: Vec<&WorkOrder> = orders.iter().collect();
    ordered.sort_by(|a, b| {
        let pa = a.due / a.cluster as f64;
        let pb = b.due / b.cluster as f64;
        pa.partial_cmp(&pb)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut blocks = Vec::new();
    let mut qty_extra_total = 0u64;

    for order in ordered {
        let (format, qty) = single_demand(order);

        let qty_extra = anticipated_quantity(order, format, orders, horizon, unit_holding_cost);
        let total_qty = qty + qty_extra;
        qty_extra_total += qty_extra;

        let Some((machine_idx, setup_hours, end)) =
            best_machine(format, total_qty, machines, setup)
        else {
            continue;
        };
        let machine = &mut machines[machine_idx];
        let mut start = machine.available_at;

        if setup_hours > 0.0 {
            blocks.push(Block::Setup(SetupBlock {
                machine: machine.name.clone(),
                start,
                end: start + setup_hours,
                format: format.to_string(),
            }));
            start += setup_hours;
        }

        tracing::debug!(
            ot_id = %order.id,
            machine = %machine.name,
            format,
            qty,
            qty_extra,
            end,
            "placed order"
        );

        blocks.push(Block::Production(ProductionBlock {
            machine: machine.name.clone(),
            start,
            end,
            product: format.to_string(),
            quantity: total_qty,
            ot_ids: vec![order.id.clone()],
            on_time: true,
            legacy: Some(LegacyOrderInfo {
                id: order.id.clone(),
                due: order.due,
                qty_cliente: qty,
                qty_extra,
            }),
        }));

        tracker.record(&order.id, format, total_qty, end);
        machine.available_at = end;
        machine.last_format = Some(format.to_string());
    }

    LegacyOutcome {
        blocks,
        qty_extra_total,
    }
}

/// Units to produce beyond the order's own demand.
///
/// Future same-format orders falling inside `(due, due + horizon]` are
/// worth anticipating when the assumed saved changeover exceeds the
/// cost of holding their combined quantity over the horizon; half of
/// that demand is then pulled forward.
fn anticipated_quantity(
    order: &WorkOrder,
    format: &str,
    all: &[WorkOrder],
    horizon: f64,
    unit_holding_cost: f64,
) -> u64 {
    let qty_future: u64 = all
        .iter()
        .filter(|o| {
            let (f, _) = single_demand(o);
            f == format && o.due > order.due && o.due <= order.due + horizon
        })
        .map(|o| single_demand(o).1)
        .sum();

    if qty_future == 0 {
        return 0;
    }

    let holding_cost = qty_future as f64 * unit_holding_cost * horizon;
    if AVG_SETUP_HOURS_SAVED > holding_cost {
        (qty_future as f64 * ANTICIPATION_SHARE) as u64
    } else {
        0
    }
}

/// The machine finishing `qty` units of `format` earliest.
///
/// Machines come name-sorted, and the strict minimum keeps the first
/// one, so equal finishes resolve lexicographically.
fn best_machine(
    format: &str,
    qty: u64,
    machines: &[MachineState],
    setup: &SetupMatrix,
) -> Option<(usize, f64, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (idx, m) in machines.iter().enumerate() {
        let setup_hours = setup.hours(m.last_format.as_deref(), format);
        let end = m.available_at + setup_hours + m.production_hours(qty);
        if best.map_or(true, |(_, _, best_end)| end < best_end) {
            best = Some((idx, setup_hours, end));
        }
    }
    best
}

/// The (format, qty) pair of a single-format order.
///
/// Multi-product orders never reach this path; their first canonical
/// product is used as a fallback rather than panicking.
fn single_demand(order: &WorkOrder) -> (&str, u64) {
    match &order.demand {
        crate::models::Demand::Single { format, qty } => (format.as_str(), *qty),
        crate::models::Demand::Products { products } => products
            .iter()
            .next()
            .map(|(p, q)| (p.as_str(), *q))
            .unwrap_or(("", 0)),
    }
}
