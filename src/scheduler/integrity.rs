//! Post-dispatch schedule audit.
//!
//! Replays the emitted blocks per machine from the initial machine
//! states and rejects the whole run if any structural invariant is
//! broken: overlapping blocks, a production missing its changeover, a
//! changeover where none is needed or with the wrong duration, or
//! demand left uncovered. A violation here is a dispatcher bug, never
//! a property of the input.

use std::collections::BTreeMap;

use super::tracker::CompletionTracker;
use crate::error::ScheduleError;
use crate::models::{Block, MachineState, SetupMatrix};

const EPS: f64 = 1e-9;

/// Audits a finished schedule's structural invariants.
///
/// `blocks` must already be in global start order; `initial` is the
/// machine state before dispatch.
pub fn audit(
    blocks: &[Block],
    initial: &[MachineState],
    setup: &SetupMatrix,
    tracker: &CompletionTracker,
) -> Result<(), ScheduleError> {
    let mut by_machine: BTreeMap<&str, Vec<&Block>> = BTreeMap::new();
    for block in blocks {
        by_machine.entry(block.machine()).or_default().push(block);
    }

    for (name, machine_blocks) in &by_machine {
        let Some(start_state) = initial.iter().find(|m| m.name == *name) else {
            return Err(ScheduleError::Inconsistency(format!(
                "block references unknown machine {name}"
            )));
        };
        audit_machine(name, machine_blocks, start_state, setup)?;
    }

    for block in blocks {
        let Block::Production(p) = block else { continue };
        for ot_id in &p.ot_ids {
            match tracker.completion(ot_id) {
                Some(c) if c >= p.end - EPS => {}
                _ => {
                    return Err(ScheduleError::Inconsistency(format!(
                        "order {ot_id} listed on a block ending {:.3} but completed earlier",
                        p.end
                    )));
                }
            }
        }
    }

    let shortfalls = tracker.shortfalls();
    if let Some((ot_id, product, missing)) = shortfalls.first() {
        return Err(ScheduleError::Inconsistency(format!(
            "order {ot_id} short {missing} units of {product}"
        )));
    }

    Ok(())
}

/// Replays one machine's block sequence.
fn audit_machine(
    name: &str,
    blocks: &[&Block],
    start_state: &MachineState,
    setup: &SetupMatrix,
) -> Result<(), ScheduleError> {
    let mut mounted = start_state.last_format.clone();
    let mut prev_end = f64::NEG_INFINITY;
    let mut pending_setup: Option<(&str, f64)> = None;

    for block in blocks {
        if block.start() < prev_end - EPS {
            return Err(ScheduleError::Inconsistency(format!(
                "overlapping blocks on {name} at {:.3}",
                block.start()
            )));
        }
        if block.end() <= block.start() {
            return Err(ScheduleError::Inconsistency(format!(
                "empty or inverted block on {name} at {:.3}",
                block.start()
            )));
        }

        match block {
            Block::Setup(s) => {
                if pending_setup.is_some() {
                    return Err(ScheduleError::Inconsistency(format!(
                        "consecutive setups on {name} at {:.3}",
                        s.start
                    )));
                }
                let expected = setup.hours(mounted.as_deref(), &s.format);
                if expected <= 0.0 {
                    return Err(ScheduleError::Inconsistency(format!(
                        "needless setup to {} on {name} at {:.3}",
                        s.format, s.start
                    )));
                }
                if (s.end - s.start - expected).abs() > EPS {
                    return Err(ScheduleError::Inconsistency(format!(
                        "setup to {} on {name} lasts {:.3}h, oracle says {:.3}h",
                        s.format,
                        s.end - s.start,
                        expected
                    )));
                }
                pending_setup = Some((s.format.as_str(), s.end));
            }
            Block::Production(p) => {
                match pending_setup.take() {
                    Some((format, setup_end)) => {
                        if format != p.product {
                            return Err(ScheduleError::Inconsistency(format!(
                                "setup to {format} on {name} followed by production of {}",
                                p.product
                            )));
                        }
                        if (p.start - setup_end).abs() > EPS {
                            return Err(ScheduleError::Inconsistency(format!(
                                "gap between setup and production of {} on {name}",
                                p.product
                            )));
                        }
                    }
                    None => {
                        let required = setup.hours(mounted.as_deref(), &p.product);
                        if required > 0.0 {
                            return Err(ScheduleError::Inconsistency(format!(
                                "production of {} on {name} at {:.3} missing its setup",
                                p.product, p.start
                            )));
                        }
                    }
                }
                mounted = Some(p.product.clone());
            }
        }
        prev_end = block.end();
    }

    if pending_setup.is_some() {
        return Err(ScheduleError::Inconsistency(format!(
            "trailing setup with no production on {name}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductionBlock, SetupBlock, WorkOrder};

    fn make_machine(name: &str, last: Option<&str>) -> MachineState {
        MachineState {
            name: name.into(),
            capacity: 100.0,
            available_at: 0.0,
            last_format: last.map(String::from),
        }
    }

    fn production(machine: &str, start: f64, end: f64, product: &str, ot: &str) -> Block {
        Block::Production(ProductionBlock {
            machine: machine.into(),
            start,
            end,
            product: product.into(),
            quantity: 100,
            ot_ids: vec![ot.into()],
            on_time: true,
            legacy: None,
        })
    }

    fn setup_block(machine: &str, start: f64, end: f64, format: &str) -> Block {
        Block::Setup(SetupBlock {
            machine: machine.into(),
            start,
            end,
            format: format.into(),
        })
    }

    fn covered_tracker() -> CompletionTracker {
        let orders = vec![WorkOrder::new("OT1", 50.0, 1).with_product("A", 100)];
        let mut t = CompletionTracker::new(&orders);
        t.record("OT1", "A", 100, 1.0);
        t
    }

    #[test]
    fn test_clean_schedule_passes() {
        let blocks = vec![
            production("L1", 0.0, 1.0, "A", "OT1"),
            setup_block("L1", 1.0, 2.5, "B"),
            production("L1", 2.5, 3.5, "B", "OT1"),
        ];
        let initial = vec![make_machine("L1", None)];
        let setup = SetupMatrix::new(1.5);
        let orders = vec![WorkOrder::new("OT1", 50.0, 1)
            .with_product("A", 100)
            .with_product("B", 100)];
        let mut tracker = CompletionTracker::new(&orders);
        tracker.record("OT1", "A", 100, 1.0);
        tracker.record("OT1", "B", 100, 3.5);

        assert!(audit(&blocks, &initial, &setup, &tracker).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let blocks = vec![
            production("L1", 0.0, 2.0, "A", "OT1"),
            production("L1", 1.0, 3.0, "A", "OT1"),
        ];
        let initial = vec![make_machine("L1", None)];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("overlap")));
    }

    #[test]
    fn test_missing_setup_rejected() {
        // Machine mounted with B; producing A without a changeover
        let blocks = vec![production("L1", 0.0, 1.0, "A", "OT1")];
        let initial = vec![make_machine("L1", Some("B"))];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("missing its setup")));
    }

    #[test]
    fn test_needless_setup_rejected() {
        // Machine already mounted with A
        let blocks = vec![
            setup_block("L1", 0.0, 1.5, "A"),
            production("L1", 1.5, 2.5, "A", "OT1"),
        ];
        let initial = vec![make_machine("L1", Some("A"))];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("needless")));
    }

    #[test]
    fn test_wrong_setup_duration_rejected() {
        let blocks = vec![
            setup_block("L1", 0.0, 0.5, "A"),
            production("L1", 0.5, 1.5, "A", "OT1"),
        ];
        let initial = vec![make_machine("L1", Some("B"))];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("oracle")));
    }

    #[test]
    fn test_setup_product_mismatch_rejected() {
        let blocks = vec![
            setup_block("L1", 0.0, 1.5, "B"),
            production("L1", 1.5, 2.5, "C", "OT1"),
        ];
        let initial = vec![make_machine("L1", Some("A"))];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("followed by")));
    }

    #[test]
    fn test_trailing_setup_rejected() {
        let blocks = vec![
            production("L1", 0.0, 1.0, "A", "OT1"),
            setup_block("L1", 1.0, 2.5, "B"),
        ];
        let initial = vec![make_machine("L1", None)];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("trailing")));
    }

    #[test]
    fn test_unknown_machine_rejected() {
        let blocks = vec![production("L9", 0.0, 1.0, "A", "OT1")];
        let initial = vec![make_machine("L1", None)];
        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &covered_tracker());
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("unknown machine")));
    }

    #[test]
    fn test_uncovered_demand_rejected() {
        let blocks = vec![production("L1", 0.0, 1.0, "A", "OT1")];
        let initial = vec![make_machine("L1", None)];
        let orders = vec![WorkOrder::new("OT1", 50.0, 1).with_product("A", 500)];
        let mut tracker = CompletionTracker::new(&orders);
        tracker.record("OT1", "A", 100, 1.0);

        let err = audit(&blocks, &initial, &SetupMatrix::new(1.5), &tracker);
        assert!(matches!(err, Err(ScheduleError::Inconsistency(m)) if m.contains("short")));
    }
}
