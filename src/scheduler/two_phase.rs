//! Two-phase dispatch for multi-product batches.
//!
//! # Algorithm
//!
//! 1. Decompose orders into per-(order, product) tasks.
//! 2. Phase 1 takes tasks of urgent orders (due within
//!    [`URGENT_DUE_HOURS`]); phase 2 takes the rest.
//! 3. Within a phase, tasks group by product; groups run in ascending
//!    earliest-due order (ties by product id), so demand needed soonest
//!    mounts its product first.
//! 4. Each group's total quantity goes through the parallel-distribution
//!    evaluator; the chosen slices become SETUP/PRODUCTION blocks and
//!    feed the completion tracker.
//!
//! Infeasible due dates never abort the dispatch; late orders are
//! reported by the tracker afterwards.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::distribution::distribute;
use super::tasks::{decompose, ProductTask};
use super::tracker::CompletionTracker;
use crate::models::{Block, MachineState, ProductionBlock, SetupBlock, SetupMatrix, WorkOrder};

/// Orders due within this many hours are dispatched in phase 1.
pub const URGENT_DUE_HOURS: f64 = 40.0;

/// Dispatches a multi-product batch onto the machines.
///
/// Machines are mutated in place; fulfillment is recorded on `tracker`.
/// The returned blocks are in emission order; `on_time` flags are left
/// `true` and finalized by the caller once all completions are known.
pub fn dispatch(
    orders: &[WorkOrder],
    machines: &mut [MachineState],
    setup: &SetupMatrix,
    tracker: &mut CompletionTracker,
) -> Vec<Block> {
    let breakdown = decompose(orders);
    let (urgent, normal): (Vec<&ProductTask>, Vec<&ProductTask>) = breakdown
        .tasks
        .iter()
        .partition(|t| t.ot_due <= URGENT_DUE_HOURS);

    tracing::debug!(
        orders = breakdown.required.len(),
        urgent_tasks = urgent.len(),
        normal_tasks = normal.len(),
        "partitioned demand by urgency"
    );

    let mut blocks = Vec::new();
    dispatch_phase("urgent", &urgent, machines, setup, tracker, &mut blocks);
    dispatch_phase("normal", &normal, machines, setup, tracker, &mut blocks);

    let complete = orders.iter().filter(|o| tracker.is_complete(&o.id)).count();
    tracing::debug!(complete, total = orders.len(), "demand dispatch finished");
    blocks
}

/// Dispatches one phase's tasks, product group by product group.
fn dispatch_phase(
    phase: &str,
    tasks: &[&ProductTask],
    machines: &mut [MachineState],
    setup: &SetupMatrix,
    tracker: &mut CompletionTracker,
    blocks: &mut Vec<Block>,
) {
    // Group by product, keeping batch order within each group.
    let mut groups: BTreeMap<&str, Vec<&ProductTask>> = BTreeMap::new();
    for &task in tasks {
        groups.entry(task.product.as_str()).or_default().push(task);
    }

    // Earliest due first; product id breaks ties.
    let mut ordered: Vec<(&str, f64, Vec<&ProductTask>)> = groups
        .into_iter()
        .map(|(product, group)| {
            let due = group
                .iter()
                .map(|t| t.ot_due)
                .fold(f64::INFINITY, f64::min);
            (product, due, group)
        })
        .collect();
    ordered.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    for (product, due, group) in ordered {
        let quantity: u64 = group.iter().map(|t| t.quantity).sum();
        tracing::debug!(phase, product, quantity, due, "dispatching product group");
        run_group(product, quantity, &group, machines, setup, tracker, blocks);
    }
}

/// Produces one product group and updates machines and tracker.
fn run_group(
    product: &str,
    quantity: u64,
    group: &[&ProductTask],
    machines: &mut [MachineState],
    setup: &SetupMatrix,
    tracker: &mut CompletionTracker,
    blocks: &mut Vec<Block>,
) {
    let chosen = distribute(product, quantity, machines, setup);

    for slice in &chosen.slices {
        let Some(machine) = machines.iter_mut().find(|m| m.name == slice.machine) else {
            continue;
        };

        if slice.setup_hours > 0.0 {
            blocks.push(Block::Setup(SetupBlock {
                machine: machine.name.clone(),
                start: machine.available_at,
                end: machine.available_at + slice.setup_hours,
                format: product.to_string(),
            }));
        }

        // Orders in this group that still need the product, sorted ids.
        let mut ot_ids: Vec<String> = group
            .iter()
            .filter(|t| tracker.has_unmet(&t.ot_id, product))
            .map(|t| t.ot_id.clone())
            .collect();
        ot_ids.sort();
        ot_ids.dedup();

        blocks.push(Block::Production(ProductionBlock {
            machine: machine.name.clone(),
            start: slice.start,
            end: slice.end,
            product: product.to_string(),
            quantity: slice.quantity,
            ot_ids,
            on_time: true,
            legacy: None,
        }));

        allocate_slice(product, slice.quantity, slice.end, group, tracker);

        machine.available_at = slice.end;
        machine.last_format = Some(product.to_string());
    }
}

/// Distributes a slice's units across the group's orders.
///
/// Shares are proportional to each order's remaining demand, floored,
/// with leftover units handed to the largest fractional parts (ties
/// resolve to the order appearing first in the group). Every listed
/// order has its completion advanced to the slice end, allocation or
/// not.
fn allocate_slice(
    product: &str,
    quantity: u64,
    end: f64,
    group: &[&ProductTask],
    tracker: &mut CompletionTracker,
) {
    let remaining: Vec<u64> = group
        .iter()
        .map(|t| tracker.unmet(&t.ot_id, product))
        .collect();
    let total_remaining: u64 = remaining.iter().sum();

    if total_remaining == 0 {
        for task in group {
            tracker.record(&task.ot_id, product, 0, end);
        }
        return;
    }

    let shares: Vec<f64> = remaining
        .iter()
        .map(|&r| quantity as f64 * r as f64 / total_remaining as f64)
        .collect();
    let mut allocations: Vec<u64> = shares.iter().map(|s| s.floor() as u64).collect();
    let assigned: u64 = allocations.iter().sum();
    let mut leftover = quantity.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..group.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = shares[a] - shares[a].floor();
        let frac_b = shares[b] - shares[b].floor();
        frac_b
            .partial_cmp(&frac_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    let mut pos = 0;
    while leftover > 0 {
        let idx = order[pos % order.len()];
        if allocations[idx] < remaining[idx] {
            allocations[idx] += 1;
            leftover -= 1;
        }
        pos += 1;
        if pos > order.len() * 2 && leftover > 0 {
            // Remaining demand exhausted; surplus units have no owner.
            break;
        }
    }

    for (task, allocation) in group.iter().zip(allocations) {
        tracker.record(&task.ot_id, product, allocation, end);
    }
}
