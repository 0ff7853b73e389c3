//! Schedule blocks (solution model).
//!
//! A schedule is a list of machine-bound time blocks. SETUP blocks are
//! non-productive changeover time; PRODUCTION blocks produce a quantity
//! of one product on behalf of one or more work orders. A production
//! block emitted for a single-format batch additionally carries the
//! originating order's identity and quantities.
//!
//! Intervals are half-open `[start, end)` in hours.

use serde::{Deserialize, Serialize};

/// One time block on a machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    /// Machine changeover to a new product.
    #[serde(rename = "SETUP")]
    Setup(SetupBlock),
    /// Production of one product.
    #[serde(rename = "PRODUCTION")]
    Production(ProductionBlock),
}

/// A changeover block. Ends exactly where the prepared production starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupBlock {
    /// Machine being reconfigured.
    pub machine: String,
    /// Start hour.
    pub start: f64,
    /// End hour (`end - start` = setup time).
    pub end: f64,
    /// Product being switched to.
    pub format: String,
}

/// A production block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionBlock {
    /// Machine producing.
    pub machine: String,
    /// Start hour.
    pub start: f64,
    /// End hour.
    pub end: f64,
    /// Product produced.
    pub product: String,
    /// Units produced in this block.
    pub quantity: u64,
    /// Orders whose demand this block serves (sorted, deduplicated).
    pub ot_ids: Vec<String>,
    /// True iff every listed order's final completion meets its due date.
    pub on_time: bool,
    /// Originating-order details, present on the single-format path only.
    #[serde(flatten)]
    pub legacy: Option<LegacyOrderInfo>,
}

/// Order identity attached to a single-format production block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyOrderInfo {
    /// Order id.
    pub id: String,
    /// Order due date (hours).
    pub due: f64,
    /// Units requested by the customer.
    pub qty_cliente: u64,
    /// Units produced in anticipation of future same-format demand.
    pub qty_extra: u64,
}

impl Block {
    /// Machine this block occupies.
    pub fn machine(&self) -> &str {
        match self {
            Block::Setup(b) => &b.machine,
            Block::Production(b) => &b.machine,
        }
    }

    /// Start hour.
    pub fn start(&self) -> f64 {
        match self {
            Block::Setup(b) => b.start,
            Block::Production(b) => b.start,
        }
    }

    /// End hour.
    pub fn end(&self) -> f64 {
        match self {
            Block::Setup(b) => b.end,
            Block::Production(b) => b.end,
        }
    }

    /// Block length in hours.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Whether this is a SETUP block.
    pub fn is_setup(&self) -> bool {
        matches!(self, Block::Setup(_))
    }

    /// Whether this is a PRODUCTION block.
    pub fn is_production(&self) -> bool {
        matches!(self, Block::Production(_))
    }

    /// The production payload, if any.
    pub fn as_production(&self) -> Option<&ProductionBlock> {
        match self {
            Block::Production(b) => Some(b),
            Block::Setup(_) => None,
        }
    }

    /// The setup payload, if any.
    pub fn as_setup(&self) -> Option<&SetupBlock> {
        match self {
            Block::Setup(b) => Some(b),
            Block::Production(_) => None,
        }
    }
}
