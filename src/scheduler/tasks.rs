//! Demand decomposition.
//!
//! Flattens a batch of work orders into per-(order, product) tasks, the
//! unit the dispatcher groups and sequences. Both input dialects land
//! here already canonicalized by [`WorkOrder::requirements`].

use std::collections::BTreeMap;

use crate::models::WorkOrder;

/// Demand for one product by one work order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTask {
    /// Product required.
    pub product: String,
    /// Units required.
    pub quantity: u64,
    /// Owning order id.
    pub ot_id: String,
    /// Owning order due date (hours).
    pub ot_due: f64,
    /// Owning order commercial priority.
    pub ot_cluster: u32,
}

/// The flattened demand of a batch.
#[derive(Debug, Clone)]
pub struct DemandBreakdown {
    /// One task per (order, product) pair, in batch order; products
    /// within an order follow the canonical (sorted) product order.
    pub tasks: Vec<ProductTask>,
    /// Required units per order and product.
    pub required: BTreeMap<String, BTreeMap<String, u64>>,
}

impl DemandBreakdown {
    /// Required products of an order.
    pub fn products_of(&self, ot_id: &str) -> Option<&BTreeMap<String, u64>> {
        self.required.get(ot_id)
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// Decomposes a batch into product tasks.
pub fn decompose(orders: &[WorkOrder]) -> DemandBreakdown {
    let mut tasks = Vec::new();
    let mut required: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

    for order in orders {
        let reqs = order.requirements();
        for (product, qty) in &reqs {
            tasks.push(ProductTask {
                product: product.clone(),
                quantity: *qty,
                ot_id: order.id.clone(),
                ot_due: order.due,
                ot_cluster: order.cluster,
            });
        }
        required.insert(order.id.clone(), reqs);
    }

    DemandBreakdown { tasks, required }
}
