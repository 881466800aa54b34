use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::ProductId;
use crate::model::{CartLineItem, ProductOption};

/// Stable identity for a (product, selected options) pair.
///
/// Option names are sorted before serialization, so option sets that are
/// equal as sets produce the same key regardless of the order they were
/// picked in. Two requests for the same product with the same effective
/// options always collapse to one line item; different options stay
/// distinct.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn for_line(product_id: &ProductId, options: &[ProductOption]) -> Self {
        if options.is_empty() {
            return Self(product_id.as_str().to_string());
        }
        let mut names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
        names.sort_unstable();
        Self(format!("{}::{}", product_id, names.join("+")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({})", self.0)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locates an existing line item for remove/update calls: the product id
/// must match, and when an option name is given the item's selections
/// must include it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSelector {
    pub product_id: ProductId,
    pub option_name: Option<String>,
}

impl LineSelector {
    pub fn product(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            option_name: None,
        }
    }

    pub fn with_option(product_id: impl Into<ProductId>, option_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            option_name: Some(option_name.into()),
        }
    }

    pub fn matches(&self, item: &CartLineItem) -> bool {
        item.product.id == self.product_id
            && match &self.option_name {
                None => true,
                Some(name) => item.selected_options.iter().any(|o| o.name == *name),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;

    fn opt(name: &str) -> ProductOption {
        ProductOption::new(name, 0.5)
    }

    #[test]
    fn option_order_does_not_change_the_key() {
        let id = ProductId::from("p1");
        let a = ItemKey::for_line(&id, &[opt("Cheese"), opt("Bacon")]);
        let b = ItemKey::for_line(&id, &[opt("Bacon"), opt("Cheese")]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_options_produce_different_keys() {
        let id = ProductId::from("p1");
        let a = ItemKey::for_line(&id, &[opt("Cheese")]);
        let b = ItemKey::for_line(&id, &[opt("Bacon")]);
        assert_ne!(a, b);
        assert_ne!(a, ItemKey::for_line(&id, &[]));
    }

    #[test]
    fn bare_key_is_the_product_id() {
        let id = ProductId::from("p9");
        assert_eq!(ItemKey::for_line(&id, &[]).as_str(), "p9");
    }

    #[test]
    fn selector_requires_the_named_option() {
        let item = CartLineItem::new(
            Product::new("p1", "Burger", 10.0),
            1,
            vec![opt("Cheese")],
        );
        assert!(LineSelector::product("p1").matches(&item));
        assert!(LineSelector::with_option("p1", "Cheese").matches(&item));
        assert!(!LineSelector::with_option("p1", "Bacon").matches(&item));
        assert!(!LineSelector::product("p2").matches(&item));
    }
}
