//! Order modification validation
//!
//! Pure reconciliation of a branch's proposed item changes against the
//! original order. Branches may only reduce counts or remove items while
//! packing; introducing a product or increasing a count rejects the whole
//! batch. The caller persists the outcome and feeds
//! `removed_product_ids` to the catalog disable hook, since omission
//! during packing signals out-of-stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ItemKind, OrderItem};
use std::collections::HashMap;

/// One proposed line from the branch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedItem {
    pub product_id: String,
    /// New count; 0 removes the item
    pub count: u32,
    /// New quantity, required for loose items whenever count is nonzero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
}

/// Validated modification result
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationOutcome {
    /// Surviving items with their new counts/quantities, original order preserved
    pub updated_items: Vec<OrderItem>,
    /// Total recomputed strictly from `updated_items`
    pub new_total: Decimal,
    /// Human-readable diffs, e.g. `"Removed Apples (3x)"`
    pub change_descriptions: Vec<String>,
    /// Products removed either explicitly (count 0) or by omission;
    /// the caller disables these for future orders
    pub removed_product_ids: Vec<String>,
}

impl ModificationOutcome {
    /// Whether the proposal changed nothing
    pub fn is_noop(&self) -> bool {
        self.change_descriptions.is_empty()
    }

    /// Message surfaced to the branch
    pub fn summary_message(&self) -> String {
        if self.is_noop() {
            "No changes made".to_string()
        } else {
            format!("Order modified ({} changes)", self.change_descriptions.len())
        }
    }
}

/// Reconcile proposed changes against the original items
///
/// Never touches storage; rejection leaves nothing partially applied.
pub fn validate(
    original_items: &[OrderItem],
    proposed_items: &[ProposedItem],
) -> AppResult<ModificationOutcome> {
    let mut proposed_by_id: HashMap<&str, &ProposedItem> = HashMap::new();
    for proposed in proposed_items {
        if proposed_by_id
            .insert(proposed.product_id.as_str(), proposed)
            .is_some()
        {
            return Err(AppError::validation(format!(
                "duplicate product {} in proposed items",
                proposed.product_id
            ))
            .with_detail("product_id", proposed.product_id.as_str()));
        }
    }

    // A product not on the original order rejects the whole batch;
    // nothing is partially applied.
    for proposed in proposed_items {
        if !original_items
            .iter()
            .any(|item| item.product_id == proposed.product_id)
        {
            return Err(AppError::with_message(
                ErrorCode::UnknownOrderItem,
                format!(
                    "product {} is not part of the original order",
                    proposed.product_id
                ),
            )
            .with_detail("product_id", proposed.product_id.as_str()));
        }
    }

    let mut updated_items = Vec::new();
    let mut change_descriptions = Vec::new();
    let mut removed_product_ids = Vec::new();

    for original in original_items {
        let original_count = original.count();

        let Some(proposed) = proposed_by_id.get(original.product_id.as_str()) else {
            // Omission during packing is an implicit removal and an
            // out-of-stock signal.
            change_descriptions.push(format!("Removed {} ({}x)", original.name, original_count));
            removed_product_ids.push(original.product_id.clone());
            continue;
        };

        // Counts only go down.
        if proposed.count > original_count {
            return Err(AppError::with_message(
                ErrorCode::ItemCountIncreased,
                format!(
                    "{}: count may only be reduced ({} -> {})",
                    original.name, original_count, proposed.count
                ),
            )
            .with_detail("product_id", original.product_id.as_str()));
        }

        // Reducing to zero removes the item.
        if proposed.count == 0 {
            change_descriptions.push(format!("Removed {} ({}x)", original.name, original_count));
            removed_product_ids.push(original.product_id.clone());
            continue;
        }

        let mut updated = original.clone();
        match (&original.kind, &mut updated.kind) {
            (ItemKind::Loose { quantity, .. }, ItemKind::Loose {
                count: new_count,
                quantity: new_quantity,
                ..
            }) => {
                // A surviving loose item needs a positive quantity.
                let proposed_quantity = match proposed.quantity {
                    Some(q) if q > Decimal::ZERO => q,
                    _ => {
                        return Err(AppError::with_message(
                            ErrorCode::LooseQuantityRequired,
                            format!("{} requires a positive quantity", original.name),
                        )
                        .with_detail("product_id", original.product_id.as_str()));
                    }
                };
                *new_count = proposed.count;
                *new_quantity = proposed_quantity;

                if proposed.count != original_count {
                    change_descriptions.push(format!(
                        "Reduced {} from {} to {}",
                        original.name, original_count, proposed.count
                    ));
                }
                if proposed_quantity != *quantity {
                    let unit = match &original.kind {
                        ItemKind::Loose { unit, .. } => unit.as_str(),
                        ItemKind::Packed { .. } => unreachable!(),
                    };
                    change_descriptions.push(format!(
                        "Adjusted {} quantity to {} {}",
                        original.name, proposed_quantity, unit
                    ));
                }
            }
            (ItemKind::Packed { .. }, ItemKind::Packed { count: new_count }) => {
                *new_count = proposed.count;
                if proposed.count != original_count {
                    change_descriptions.push(format!(
                        "Reduced {} from {} to {}",
                        original.name, original_count, proposed.count
                    ));
                }
            }
            _ => unreachable!("updated is a clone of original"),
        }

        updated_items.push(updated);
    }

    // The total is recomputed from the surviving items, never trusted
    // from the client.
    let new_total = updated_items.iter().map(|item| item.line_total()).sum();

    Ok(ModificationOutcome {
        updated_items,
        new_total,
        change_descriptions,
        removed_product_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn packed(id: &str, name: &str, count: u32, price: i64) -> OrderItem {
        OrderItem {
            product_id: id.to_string(),
            name: name.to_string(),
            unit_price: Decimal::from(price),
            kind: ItemKind::Packed { count },
        }
    }

    fn loose(id: &str, name: &str, quantity: &str, price: i64) -> OrderItem {
        OrderItem {
            product_id: id.to_string(),
            name: name.to_string(),
            unit_price: Decimal::from(price),
            kind: ItemKind::Loose {
                count: 1,
                quantity: Decimal::from_str(quantity).unwrap(),
                unit: "kg".to_string(),
            },
        }
    }

    fn proposed(id: &str, count: u32) -> ProposedItem {
        ProposedItem {
            product_id: id.to_string(),
            count,
            quantity: None,
        }
    }

    fn proposed_loose(id: &str, count: u32, quantity: &str) -> ProposedItem {
        ProposedItem {
            product_id: id.to_string(),
            count,
            quantity: Some(Decimal::from_str(quantity).unwrap()),
        }
    }

    #[test]
    fn test_reduce_and_remove() {
        // Scenario: reduce item1 to zero, item2 from 2 to 1
        let original = vec![
            packed("p1", "item1", 3, 50),
            packed("p2", "item2", 2, 100),
        ];
        let outcome = validate(
            &original,
            &[proposed("p1", 0), proposed("p2", 1)],
        )
        .unwrap();

        assert_eq!(outcome.updated_items.len(), 1);
        assert_eq!(outcome.updated_items[0].product_id, "p2");
        assert_eq!(outcome.updated_items[0].count(), 1);
        assert_eq!(outcome.new_total, Decimal::from(100));
        assert_eq!(
            outcome.change_descriptions,
            vec![
                "Removed item1 (3x)".to_string(),
                "Reduced item2 from 2 to 1".to_string()
            ]
        );
        assert_eq!(outcome.removed_product_ids, vec!["p1".to_string()]);
    }

    #[test]
    fn test_new_product_rejected_outright() {
        let original = vec![packed("p1", "item1", 3, 50)];
        let err = validate(
            &original,
            &[proposed("p1", 2), proposed("p9", 1)],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOrderItem);
    }

    #[test]
    fn test_count_increase_rejected() {
        let original = vec![packed("p1", "item1", 3, 50)];
        let err = validate(&original, &[proposed("p1", 4)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ItemCountIncreased);
    }

    #[test]
    fn test_omitted_item_is_removal_and_availability_signal() {
        let original = vec![
            packed("p1", "item1", 3, 50),
            packed("p2", "item2", 2, 100),
        ];
        let outcome = validate(&original, &[proposed("p2", 2)]).unwrap();

        assert_eq!(outcome.updated_items.len(), 1);
        assert_eq!(outcome.change_descriptions, vec!["Removed item1 (3x)"]);
        assert_eq!(outcome.removed_product_ids, vec!["p1".to_string()]);
        assert_eq!(outcome.new_total, Decimal::from(200));
    }

    #[test]
    fn test_loose_missing_quantity_rejected() {
        let original = vec![loose("p3", "Potatoes", "1.5", 40)];
        let err = validate(&original, &[proposed("p3", 1)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::LooseQuantityRequired);
    }

    #[test]
    fn test_loose_non_positive_quantity_rejected() {
        let original = vec![loose("p3", "Potatoes", "1.5", 40)];
        let err = validate(&original, &[proposed_loose("p3", 1, "0")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::LooseQuantityRequired);
    }

    #[test]
    fn test_loose_quantity_adjustment() {
        let original = vec![loose("p3", "Potatoes", "1.5", 40)];
        let outcome = validate(&original, &[proposed_loose("p3", 1, "1.0")]).unwrap();

        assert_eq!(outcome.new_total, Decimal::from(40));
        assert_eq!(
            outcome.change_descriptions,
            vec!["Adjusted Potatoes quantity to 1.0 kg"]
        );
        assert!(outcome.removed_product_ids.is_empty());
    }

    #[test]
    fn test_loose_removal_does_not_require_quantity() {
        let original = vec![loose("p3", "Potatoes", "1.5", 40)];
        let outcome = validate(&original, &[proposed("p3", 0)]).unwrap();
        assert!(outcome.updated_items.is_empty());
        assert_eq!(outcome.removed_product_ids, vec!["p3".to_string()]);
    }

    #[test]
    fn test_noop_modification() {
        let original = vec![packed("p1", "item1", 3, 50)];
        let outcome = validate(&original, &[proposed("p1", 3)]).unwrap();

        assert!(outcome.is_noop());
        assert_eq!(outcome.summary_message(), "No changes made");
        assert_eq!(outcome.new_total, Decimal::from(150));
        assert_eq!(outcome.updated_items, original);
    }

    #[test]
    fn test_duplicate_proposed_product_rejected() {
        let original = vec![packed("p1", "item1", 3, 50)];
        let err = validate(
            &original,
            &[proposed("p1", 2), proposed("p1", 1)],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_monotonicity_no_foreign_products_no_increases() {
        let original = vec![
            packed("p1", "item1", 3, 50),
            loose("p3", "Potatoes", "1.5", 40),
        ];
        let outcome = validate(
            &original,
            &[proposed("p1", 2), proposed_loose("p3", 1, "1.5")],
        )
        .unwrap();

        for updated in &outcome.updated_items {
            let original_item = original
                .iter()
                .find(|item| item.product_id == updated.product_id)
                .expect("updated item must come from the original order");
            assert!(updated.count() <= original_item.count());
        }
    }

    #[test]
    fn test_total_recomputation_is_deterministic() {
        let original = vec![
            packed("p1", "item1", 3, 50),
            packed("p2", "item2", 2, 100),
        ];
        let proposal = [proposed("p1", 1), proposed("p2", 1)];
        let first = validate(&original, &proposal).unwrap();
        let second = validate(&original, &proposal).unwrap();
        assert_eq!(first.new_total, second.new_total);
        assert_eq!(first.new_total, Decimal::from(150));
    }
}
