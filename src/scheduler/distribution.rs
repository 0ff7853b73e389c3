//! Parallel-distribution evaluation.
//!
//! For one product and a total quantity, decides between producing on
//! the single machine that finishes earliest and splitting the quantity
//! across several machines so that all participants finish together.
//! The split is accepted when it stays within a small makespan
//! tolerance of the single-machine option and either clearly improves
//! the makespan or the quantity is large enough that load balancing is
//! worth a marginal cost.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 5: Parallel Machine Models

use std::cmp::Ordering;

use crate::models::{MachineState, SetupMatrix};

/// A split is tolerated up to this factor of the single-machine makespan.
const SPLIT_MAKESPAN_TOLERANCE: f64 = 1.10;
/// A split on its own merits must beat the single machine by 5%.
const SPLIT_IMPROVEMENT_FACTOR: f64 = 0.95;
/// Above this quantity, load balancing is accepted within the tolerance
/// even without the 5% gain.
const SPLIT_QUANTITY_THRESHOLD: u64 = 1000;

/// One machine's share of a product run.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSlice {
    /// Machine name.
    pub machine: String,
    /// Units assigned to this machine.
    pub quantity: u64,
    /// Changeover hours this machine needs first (0 when none).
    pub setup_hours: f64,
    /// Production start hour (after any setup).
    pub start: f64,
    /// Production end hour.
    pub end: f64,
}

/// The chosen assignment for one product run.
#[derive(Debug, Clone)]
pub struct Distribution {
    /// Participating machines in name order.
    pub slices: Vec<MachineSlice>,
    /// Latest finish across the slices.
    pub makespan: f64,
    /// Whether the quantity was split across machines.
    pub split: bool,
}

/// Chooses the assignment of `quantity` units of `product`.
///
/// `machines` must be sorted by name; ties on finish time resolve to
/// the first (lexicographically smallest) machine.
pub fn distribute(
    product: &str,
    quantity: u64,
    machines: &[MachineState],
    setup: &SetupMatrix,
) -> Distribution {
    let Some(single) = best_single(product, quantity, machines, setup) else {
        return Distribution {
            slices: Vec::new(),
            makespan: 0.0,
            split: false,
        };
    };
    let single_makespan = single.end;

    if machines.len() >= 2 {
        if let Some((slices, makespan)) = equal_finish_split(product, quantity, machines, setup) {
            let within_tolerance = makespan <= single_makespan * SPLIT_MAKESPAN_TOLERANCE;
            let worthwhile = makespan <= single_makespan * SPLIT_IMPROVEMENT_FACTOR
                || quantity > SPLIT_QUANTITY_THRESHOLD;
            if within_tolerance && worthwhile {
                tracing::debug!(
                    product,
                    quantity,
                    machines = slices.len(),
                    makespan,
                    single_makespan,
                    "splitting product run across machines"
                );
                return Distribution {
                    slices,
                    makespan,
                    split: true,
                };
            }
        }
    }

    Distribution {
        slices: vec![single],
        makespan: single_makespan,
        split: false,
    }
}

/// The single machine finishing the whole quantity earliest.
fn best_single(
    product: &str,
    quantity: u64,
    machines: &[MachineState],
    setup: &SetupMatrix,
) -> Option<MachineSlice> {
    let mut best: Option<MachineSlice> = None;
    for m in machines {
        let setup_hours = setup.hours(m.last_format.as_deref(), product);
        let start = m.available_at + setup_hours;
        let end = start + m.production_hours(quantity);
        if best.as_ref().map_or(true, |b| end < b.end) {
            best = Some(MachineSlice {
                machine: m.name.clone(),
                quantity,
                setup_hours,
                start,
                end,
            });
        }
    }
    best
}

/// Splits the quantity so all participating machines finish together.
///
/// Solves the common finish `T = (Q + Σ capⱼ·readyⱼ) / Σ capⱼ` where
/// `readyⱼ = available_atⱼ + setupⱼ`, dropping machines whose share
/// would be under one whole unit and re-solving over the rest. Returns
/// `None` when fewer than two machines can contribute.
fn equal_finish_split(
    product: &str,
    quantity: u64,
    machines: &[MachineState],
    setup: &SetupMatrix,
) -> Option<(Vec<MachineSlice>, f64)> {
    let ready: Vec<f64> = machines
        .iter()
        .map(|m| m.available_at + setup.hours(m.last_format.as_deref(), product))
        .collect();

    let mut participants: Vec<usize> = (0..machines.len()).collect();
    loop {
        if participants.len() < 2 {
            return None;
        }

        let capacity_sum: f64 = participants.iter().map(|&i| machines[i].capacity).sum();
        let weighted_ready: f64 = participants
            .iter()
            .map(|&i| machines[i].capacity * ready[i])
            .sum();
        let finish = (quantity as f64 + weighted_ready) / capacity_sum;

        let shares: Vec<f64> = participants
            .iter()
            .map(|&i| machines[i].capacity * (finish - ready[i]))
            .collect();

        if shares.iter().any(|&s| s < 1.0) {
            participants = participants
                .iter()
                .zip(&shares)
                .filter(|(_, &s)| s >= 1.0)
                .map(|(&i, _)| i)
                .collect();
            continue;
        }

        let quantities = round_preserving_sum(&shares, quantity, &participants, machines);
        let slices: Vec<MachineSlice> = participants
            .iter()
            .zip(&quantities)
            .map(|(&i, &q)| {
                let m = &machines[i];
                MachineSlice {
                    machine: m.name.clone(),
                    quantity: q,
                    setup_hours: ready[i] - m.available_at,
                    start: ready[i],
                    end: ready[i] + m.production_hours(q),
                }
            })
            .collect();
        let makespan = slices.iter().map(|s| s.end).fold(0.0_f64, f64::max);
        return Some((slices, makespan));
    }
}

/// Floors fractional shares and hands leftover units to the largest
/// fractional parts (ties by machine name), so the total is preserved
/// and no participant drops to zero.
fn round_preserving_sum(
    shares: &[f64],
    quantity: u64,
    participants: &[usize],
    machines: &[MachineState],
) -> Vec<u64> {
    let mut quantities: Vec<u64> = shares.iter().map(|s| s.floor() as u64).collect();
    let assigned: u64 = quantities.iter().sum();
    let mut leftover = quantity.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = shares[a] - shares[a].floor();
        let frac_b = shares[b] - shares[b].floor();
        frac_b
            .partial_cmp(&frac_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| machines[participants[a]].name.cmp(&machines[participants[b]].name))
    });

    let mut pos = 0;
    while leftover > 0 {
        quantities[order[pos % order.len()]] += 1;
        leftover -= 1;
        pos += 1;
    }
    quantities
}
