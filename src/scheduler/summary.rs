//! Run summary.
//!
//! Aggregate figures computed from the emitted blocks and the
//! completion tracker: block counts, makespan, quantities, and the
//! late-order report.

use serde::{Deserialize, Serialize};

use super::tracker::CompletionTracker;
use crate::models::Block;

/// Statistical summary of a scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Distinct work orders observed in the batch.
    pub total_ots: usize,
    /// Number of SETUP blocks emitted.
    pub total_setups: usize,
    /// Makespan: the latest block end, in hours.
    pub total_horas: f64,
    /// Units requested by customers across the batch.
    pub qty_total_cliente: u64,
    /// Units produced in anticipation of future demand.
    pub qty_total_extra: u64,
    /// Late orders, sorted by order id.
    pub atrasos: Vec<Delay>,
    /// Anticipation horizon employed by this run (0 when none was).
    pub horizonte_usado: f64,
}

/// A work order that finishes after its due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Order id.
    pub ot_id: String,
    /// Hours past due (`completion - due`).
    pub atraso_horas: f64,
    /// Order commercial priority.
    pub cluster: u32,
    /// Order due date (hours).
    pub due: f64,
    /// Hour the order's last contributing block ends.
    pub completion: f64,
}

/// Builds the summary for a finished run.
pub(crate) fn build(
    blocks: &[Block],
    tracker: &CompletionTracker,
    qty_total_extra: u64,
    horizonte_usado: f64,
) -> Summary {
    let total_horas = blocks
        .iter()
        .map(Block::end)
        .fold(0.0_f64, |acc, end| acc.max(end));

    Summary {
        total_ots: tracker.order_count(),
        total_setups: blocks.iter().filter(|b| b.is_setup()).count(),
        total_horas,
        qty_total_cliente: tracker.total_required(),
        qty_total_extra,
        atrasos: tracker.delays(),
        horizonte_usado,
    }
}
