//! Per-order completion tracking.
//!
//! The dispatchers report every produced slice here. The tracker keeps
//! produced-so-far per (order, product) and the hour each order's last
//! contributing block ends, from which lateness and the delay report
//! are derived.

use std::collections::BTreeMap;

use super::summary::Delay;
use crate::models::WorkOrder;

#[derive(Debug, Clone)]
struct OrderProgress {
    due: f64,
    cluster: u32,
    required: BTreeMap<String, u64>,
    produced: BTreeMap<String, u64>,
    completion: Option<f64>,
}

/// Tracks fulfillment and completion time per work order.
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    orders: BTreeMap<String, OrderProgress>,
}

impl CompletionTracker {
    /// Initializes the tracker from the batch.
    pub fn new(orders: &[WorkOrder]) -> Self {
        let orders = orders
            .iter()
            .map(|o| {
                (
                    o.id.clone(),
                    OrderProgress {
                        due: o.due,
                        cluster: o.cluster,
                        required: o.requirements(),
                        produced: BTreeMap::new(),
                        completion: None,
                    },
                )
            })
            .collect();
        Self { orders }
    }

    /// Records units produced for an order and advances its completion.
    ///
    /// A zero quantity still advances completion: the order was listed
    /// on the block and its final state depends on that block's end.
    pub fn record(&mut self, ot_id: &str, product: &str, qty: u64, end: f64) {
        if let Some(progress) = self.orders.get_mut(ot_id) {
            *progress.produced.entry(product.to_string()).or_insert(0) += qty;
            progress.completion = Some(match progress.completion {
                Some(c) => c.max(end),
                None => end,
            });
        }
    }

    /// Units still owed to an order for one product.
    pub fn unmet(&self, ot_id: &str, product: &str) -> u64 {
        let Some(progress) = self.orders.get(ot_id) else {
            return 0;
        };
        let required = progress.required.get(product).copied().unwrap_or(0);
        let produced = progress.produced.get(product).copied().unwrap_or(0);
        required.saturating_sub(produced)
    }

    /// Whether an order still needs units of a product.
    pub fn has_unmet(&self, ot_id: &str, product: &str) -> bool {
        self.unmet(ot_id, product) > 0
    }

    /// Hour the order's last contributing block ends, if any block did.
    pub fn completion(&self, ot_id: &str) -> Option<f64> {
        self.orders.get(ot_id).and_then(|p| p.completion)
    }

    /// Whether the order's completion misses its due date.
    pub fn is_late(&self, ot_id: &str) -> bool {
        match self.orders.get(ot_id) {
            Some(progress) => matches!(progress.completion, Some(c) if c > progress.due),
            None => false,
        }
    }

    /// Whether every required product of the order is fully produced.
    pub fn is_complete(&self, ot_id: &str) -> bool {
        match self.orders.get(ot_id) {
            Some(progress) => progress
                .required
                .iter()
                .all(|(p, req)| progress.produced.get(p).copied().unwrap_or(0) >= *req),
            None => false,
        }
    }

    /// Distinct orders tracked.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Total customer-requested units across the batch.
    pub fn total_required(&self) -> u64 {
        self.orders
            .values()
            .map(|p| p.required.values().sum::<u64>())
            .sum()
    }

    /// Late orders with their delay figures, sorted by order id.
    pub fn delays(&self) -> Vec<Delay> {
        self.orders
            .iter()
            .filter_map(|(id, progress)| {
                let completion = progress.completion?;
                if completion > progress.due {
                    Some(Delay {
                        ot_id: id.clone(),
                        atraso_horas: completion - progress.due,
                        cluster: progress.cluster,
                        due: progress.due,
                        completion,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Shortfalls across all orders: `(ot_id, product, missing_units)`.
    pub fn shortfalls(&self) -> Vec<(String, String, u64)> {
        let mut out = Vec::new();
        for (id, progress) in &self.orders {
            for (product, req) in &progress.required {
                let produced = progress.produced.get(product).copied().unwrap_or(0);
                if produced < *req {
                    out.push((id.clone(), product.clone(), req - produced));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_orders() -> Vec<WorkOrder> {
        vec![
            WorkOrder::new("OT0", 20.0, 5)
                .with_product("A", 200)
                .with_product("B", 300),
            WorkOrder::new("OT1", 18.0, 4).with_product("B", 250),
        ]
    }

    #[test]
    fn test_unmet_and_record() {
        let mut t = CompletionTracker::new(&sample_orders());
        assert_eq!(t.unmet("OT0", "B"), 300);

        t.record("OT0", "B", 120, 4.0);
        assert_eq!(t.unmet("OT0", "B"), 180);
        assert!(t.has_unmet("OT0", "B"));

        t.record("OT0", "B", 180, 6.0);
        assert!(!t.has_unmet("OT0", "B"));
        // A is still owed
        assert!(!t.is_complete("OT0"));

        t.record("OT0", "A", 200, 5.0);
        assert!(t.is_complete("OT0"));
    }

    #[test]
    fn test_completion_advances_monotonically() {
        let mut t = CompletionTracker::new(&sample_orders());
        t.record("OT0", "A", 200, 8.0);
        t.record("OT0", "B", 300, 5.0);
        // Later block with earlier end must not move completion back
        assert_eq!(t.completion("OT0"), Some(8.0));
    }

    #[test]
    fn test_zero_quantity_still_advances_completion() {
        let mut t = CompletionTracker::new(&sample_orders());
        t.record("OT1", "B", 0, 7.5);
        assert_eq!(t.completion("OT1"), Some(7.5));
        assert_eq!(t.unmet("OT1", "B"), 250);
    }

    #[test]
    fn test_lateness() {
        let mut t = CompletionTracker::new(&sample_orders());
        assert!(!t.is_late("OT1"));

        t.record("OT1", "B", 250, 19.0);
        assert!(t.is_late("OT1"));
        assert!(!t.is_late("OT0"));

        let delays = t.delays();
        assert_eq!(delays.len(), 1);
        assert_eq!(delays[0].ot_id, "OT1");
        assert!((delays[0].atraso_horas - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_delays_sorted_by_id() {
        let orders = vec![
            WorkOrder::new("OTB", 1.0, 1).with_product("A", 10),
            WorkOrder::new("OTA", 1.0, 1).with_product("A", 10),
        ];
        let mut t = CompletionTracker::new(&orders);
        t.record("OTB", "A", 10, 5.0);
        t.record("OTA", "A", 10, 6.0);

        let delays = t.delays();
        let ids: Vec<&str> = delays.iter().map(|d| d.ot_id.as_str()).collect();
        assert_eq!(ids, vec!["OTA", "OTB"]);
    }

    #[test]
    fn test_totals_and_shortfalls() {
        let t = CompletionTracker::new(&sample_orders());
        assert_eq!(t.order_count(), 2);
        assert_eq!(t.total_required(), 750);
        assert_eq!(t.shortfalls().len(), 3);

        let mut t2 = CompletionTracker::new(&sample_orders());
        t2.record("OT0", "A", 200, 1.0);
        t2.record("OT0", "B", 300, 1.0);
        t2.record("OT1", "B", 250, 1.0);
        assert!(t2.shortfalls().is_empty());
    }

    #[test]
    fn test_unknown_order_is_inert() {
        let mut t = CompletionTracker::new(&sample_orders());
        t.record("OT9", "A", 100, 1.0);
        assert_eq!(t.completion("OT9"), None);
        assert!(!t.is_late("OT9"));
        assert_eq!(t.unmet("OT9", "A"), 0);
    }
}
