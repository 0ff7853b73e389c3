//! Input validation for scheduling requests.
//!
//! The upstream service is expected to reject malformed payloads before
//! they reach the scheduler; these checks are the library's own line of
//! defense so a bad request fails with named fields instead of
//! producing a nonsense program. All problems are collected, not just
//! the first.

use std::collections::BTreeSet;

use crate::error::InputError;
use crate::scheduler::ScheduleRequest;
use crate::models::Demand;

/// Validates a request, returning every detected problem.
///
/// Checks:
/// 1. Non-empty order list and machine map
/// 2. Unique, non-empty order ids
/// 3. Non-negative finite due dates, positive clusters
/// 4. Non-empty demand with positive quantities and non-empty product ids
/// 5. Positive finite capacities, non-negative finite availability
/// 6. Non-negative finite setup times and tuning parameters
pub fn validate_request(request: &ScheduleRequest) -> Result<(), Vec<InputError>> {
    let mut errors = Vec::new();

    if request.orders.is_empty() {
        errors.push(InputError::new("orders", "must not be empty"));
    }
    if request.machines.is_empty() {
        errors.push(InputError::new("machines", "must not be empty"));
    }

    let mut seen_ids = BTreeSet::new();
    for (idx, order) in request.orders.iter().enumerate() {
        let at = |field: &str| format!("orders[{idx}].{field}");

        if order.id.is_empty() {
            errors.push(InputError::new(at("id"), "must not be empty"));
        } else if !seen_ids.insert(order.id.as_str()) {
            errors.push(InputError::new(
                at("id"),
                format!("duplicate order id '{}'", order.id),
            ));
        }

        if !order.due.is_finite() || order.due < 0.0 {
            errors.push(InputError::new(at("due"), "must be a non-negative number"));
        }
        if order.cluster == 0 {
            errors.push(InputError::new(at("cluster"), "must be positive"));
        }

        match &order.demand {
            Demand::Products { products } => {
                if products.is_empty() {
                    errors.push(InputError::new(at("products"), "must not be empty"));
                }
                for (product, qty) in products {
                    if product.is_empty() {
                        errors.push(InputError::new(
                            at("products"),
                            "product id must not be empty",
                        ));
                    }
                    if *qty == 0 {
                        errors.push(InputError::new(
                            at("products"),
                            format!("quantity for '{product}' must be positive"),
                        ));
                    }
                }
            }
            Demand::Single { format, qty } => {
                if format.is_empty() {
                    errors.push(InputError::new(at("format"), "must not be empty"));
                }
                if *qty == 0 {
                    errors.push(InputError::new(at("qty"), "must be positive"));
                }
            }
        }
    }

    for (name, machine) in &request.machines {
        let at = |field: &str| format!("machines.{name}.{field}");
        if name.is_empty() {
            errors.push(InputError::new("machines", "machine name must not be empty"));
        }
        if !machine.capacity.is_finite() || machine.capacity <= 0.0 {
            errors.push(InputError::new(at("capacity"), "must be a positive number"));
        }
        if !machine.available_at.is_finite() || machine.available_at < 0.0 {
            errors.push(InputError::new(
                at("available_at"),
                "must be a non-negative number",
            ));
        }
    }

    for (pair, hours) in &request.setup_times {
        if !hours.is_finite() || *hours < 0.0 {
            errors.push(InputError::new(
                format!("setup_times.{pair}"),
                "must be a non-negative number",
            ));
        }
    }

    if !request.horizonte_aprovechamiento.is_finite() || request.horizonte_aprovechamiento <= 0.0 {
        errors.push(InputError::new(
            "horizonte_aprovechamiento",
            "must be a positive number",
        ));
    }
    if !request.costo_inventario_unitario.is_finite() || request.costo_inventario_unitario < 0.0 {
        errors.push(InputError::new(
            "costo_inventario_unitario",
            "must be a non-negative number",
        ));
    }
    if !request.default_setup_time.is_finite() || request.default_setup_time < 0.0 {
        errors.push(InputError::new(
            "default_setup_time",
            "must be a non-negative number",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
