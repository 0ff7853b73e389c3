//! Work order (OT) model.
//!
//! A work order is one customer-facing demand item: a due date, a
//! commercial priority, and the products it requires. Two demand
//! dialects are accepted on the wire: a product→quantity mapping, and
//! the older single-format form (`format` + `qty`). Both canonicalize
//! to the mapping form; the single-format form additionally unlocks the
//! anticipated-production dispatch path when the whole batch uses it.
//!
//! # Time Representation
//! All times are hours as `f64`, relative to t=0 ("now"). The consumer
//! defines what t=0 means.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A work order to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Unique order identifier within the batch.
    pub id: String,
    /// Deadline in hours from t=0.
    pub due: f64,
    /// Commercial priority (higher = more important).
    pub cluster: u32,
    /// Required products, in either input dialect.
    #[serde(flatten)]
    pub demand: Demand,
}

/// The demanded products of a work order.
///
/// Deserialized untagged: a `products` mapping selects the multi-product
/// form, a `format`/`qty` pair selects the single-format form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Demand {
    /// One or more products with per-product quantities.
    Products {
        /// Product → requested units.
        products: BTreeMap<String, u64>,
    },
    /// A single product (older request shape).
    Single {
        /// The one requested product.
        format: String,
        /// Requested units.
        qty: u64,
    },
}

impl WorkOrder {
    /// Creates a multi-product order with no products yet.
    pub fn new(id: impl Into<String>, due: f64, cluster: u32) -> Self {
        Self {
            id: id.into(),
            due,
            cluster,
            demand: Demand::Products {
                products: BTreeMap::new(),
            },
        }
    }

    /// Creates a single-format order.
    pub fn single(
        id: impl Into<String>,
        due: f64,
        cluster: u32,
        format: impl Into<String>,
        qty: u64,
    ) -> Self {
        Self {
            id: id.into(),
            due,
            cluster,
            demand: Demand::Single {
                format: format.into(),
                qty,
            },
        }
    }

    /// Adds (or accumulates) demand for a product.
    ///
    /// Converts the order to the multi-product form if needed.
    pub fn with_product(mut self, product: impl Into<String>, qty: u64) -> Self {
        let mut products = self.requirements();
        *products.entry(product.into()).or_insert(0) += qty;
        self.demand = Demand::Products { products };
        self
    }

    /// The demand in canonical mapping form.
    pub fn requirements(&self) -> BTreeMap<String, u64> {
        match &self.demand {
            Demand::Products { products } => products.clone(),
            Demand::Single { format, qty } => {
                let mut m = BTreeMap::new();
                m.insert(format.clone(), *qty);
                m
            }
        }
    }

    /// Whether this order uses the single-format dialect.
    pub fn is_single_format(&self) -> bool {
        matches!(self.demand, Demand::Single { .. })
    }

    /// Total requested units across all products.
    pub fn total_quantity(&self) -> u64 {
        match &self.demand {
            Demand::Products { products } => products.values().sum(),
            Demand::Single { qty, .. } => *qty,
        }
    }

    /// Number of distinct products required.
    pub fn product_count(&self) -> usize {
        match &self.demand {
            Demand::Products { products } => products.len(),
            Demand::Single { .. } => 1,
        }
    }
}
