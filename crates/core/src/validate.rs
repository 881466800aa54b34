use thiserror::Error;

use crate::model::{CartLineItem, MAX_QUANTITY};

/// A single structural problem found on a cart line item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("product id is missing")]
    MissingProductId,

    #[error("product name is blank")]
    BlankName,

    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("quantity {quantity} exceeds the maximum of {MAX_QUANTITY}")]
    QuantityTooLarge { quantity: u32 },

    #[error("price must not be negative")]
    NegativePrice,
}

/// Check a line item's structural invariants. Pure; reports every
/// violation found, in field order. An empty result means valid.
pub fn validate_line_item(item: &CartLineItem) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if item.product.id.as_str().trim().is_empty() {
        issues.push(ValidationIssue::MissingProductId);
    }
    if item.product.name.trim().is_empty() {
        issues.push(ValidationIssue::BlankName);
    }
    if item.quantity == 0 {
        issues.push(ValidationIssue::ZeroQuantity);
    }
    if item.quantity > MAX_QUANTITY {
        issues.push(ValidationIssue::QuantityTooLarge {
            quantity: item.quantity,
        });
    }
    if item.product.price < 0.0 {
        issues.push(ValidationIssue::NegativePrice);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;

    fn item(product: Product, quantity: u32) -> CartLineItem {
        CartLineItem::new(product, quantity, Vec::new())
    }

    #[test]
    fn a_well_formed_item_passes() {
        assert!(validate_line_item(&item(Product::new("p1", "Burger", 9.5), 1)).is_empty());
    }

    #[test]
    fn missing_id_and_blank_name_are_reported() {
        let issues = validate_line_item(&item(Product::new("", "  ", 1.0), 1));
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingProductId, ValidationIssue::BlankName]
        );
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        let product = Product::new("p1", "Burger", 1.0);
        assert_eq!(
            validate_line_item(&item(product.clone(), 0)),
            vec![ValidationIssue::ZeroQuantity]
        );
        assert_eq!(
            validate_line_item(&item(product.clone(), 101)),
            vec![ValidationIssue::QuantityTooLarge { quantity: 101 }]
        );
        assert!(validate_line_item(&item(product, 100)).is_empty());
    }

    #[test]
    fn negative_price_is_rejected() {
        let issues = validate_line_item(&item(Product::new("p1", "Burger", -0.01), 1));
        assert_eq!(issues, vec![ValidationIssue::NegativePrice]);
    }
}
