use serde::{Deserialize, Serialize};

use crate::identity::{ItemKey, LineSelector};
use crate::ids::ProductId;

/// Hard ceiling on a single line item's quantity.
pub const MAX_QUANTITY: u32 = 100;

/// A selectable product option: a name plus the amount it adds to (or
/// subtracts from) the base price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub price_delta: f64,
}

impl ProductOption {
    pub fn new(name: impl Into<String>, price_delta: f64) -> Self {
        Self {
            name: name.into(),
            price_delta,
        }
    }
}

/// Catalog-level product description. Owned by the catalog service;
/// immutable from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub image: String,
    pub description: String,
    pub rating: f32,
    pub prep_time_minutes: u32,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub dietary: Option<Vec<String>>,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            category: String::new(),
            image: String::new(),
            description: String::new(),
            rating: 0.0,
            prep_time_minutes: 0,
            options: Vec::new(),
            ingredients: Vec::new(),
            dietary: None,
        }
    }

    pub fn with_options(mut self, options: Vec<ProductOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// One line of the cart: a product, how many of it, and which options
/// were chosen. Two lines for the same product with different option
/// selections are distinct entities (see [`ItemKey`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: Product,
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: Vec<ProductOption>,
}

impl CartLineItem {
    pub fn new(product: Product, quantity: u32, selected_options: Vec<ProductOption>) -> Self {
        Self {
            product,
            quantity,
            selected_options,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::for_line(&self.product.id, &self.selected_options)
    }

    /// Base price plus the deltas of every selected option.
    pub fn unit_price(&self) -> f64 {
        self.product.price
            + self
                .selected_options
                .iter()
                .map(|o| o.price_delta)
                .sum::<f64>()
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price() * f64::from(self.quantity)
    }
}

/// The aggregate cart. Items are kept in insertion order (display only;
/// order carries no correctness meaning). `item_count` and `total_price`
/// are caches, recomputed after every mutation and never authoritative.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    items: Vec<CartLineItem>,
    /// Monotonically increasing; used to detect divergence from the server.
    pub version: u64,
    pub last_synced_ms: Option<u64>,
    /// Local mutations not yet confirmed by the server.
    pub is_dirty: bool,
    /// Most recent surfaced failure; cleared by the next successful mutation.
    pub last_error: Option<String>,
    item_count: u32,
    total_price: f64,
}

impl CartState {
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn position_by_key(&self, key: &ItemKey) -> Option<usize> {
        self.items.iter().position(|i| i.key() == *key)
    }

    pub fn position_matching(&self, selector: &LineSelector) -> Option<usize> {
        self.items.iter().position(|i| selector.matches(i))
    }

    pub fn push_item(&mut self, item: CartLineItem) {
        self.items.push(item);
        self.recompute();
    }

    /// Re-insert an item at its original position. Clamped so rollback of a
    /// removal still works after concurrent edits shrank the list.
    pub fn insert_item(&mut self, index: usize, item: CartLineItem) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        self.recompute();
    }

    pub fn remove_item(&mut self, index: usize) -> CartLineItem {
        let item = self.items.remove(index);
        self.recompute();
        item
    }

    pub fn set_quantity(&mut self, index: usize, quantity: u32) {
        self.items[index].quantity = quantity;
        self.recompute();
    }

    pub fn replace_items(&mut self, items: Vec<CartLineItem>) {
        self.items = items;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
        self.total_price = self.items.iter().map(CartLineItem::line_total).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> Product {
        Product::new("p1", "Burger", 10.0)
    }

    #[test]
    fn totals_recompute_after_each_mutation() {
        let mut cart = CartState::default();
        cart.push_item(CartLineItem::new(burger(), 2, Vec::new()));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), 20.0);

        cart.set_quantity(0, 5);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total_price(), 50.0);

        cart.remove_item(0);
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price(), 0.0);
    }

    #[test]
    fn option_deltas_feed_the_unit_price() {
        let item = CartLineItem::new(
            burger(),
            3,
            vec![
                ProductOption::new("Extra cheese", 1.5),
                ProductOption::new("Large", 2.0),
            ],
        );
        assert_eq!(item.unit_price(), 13.5);
        assert_eq!(item.line_total(), 40.5);

        let mut cart = CartState::default();
        cart.push_item(item);
        assert_eq!(cart.total_price(), 40.5);
    }

    #[test]
    fn insert_position_is_clamped() {
        let mut cart = CartState::default();
        cart.insert_item(7, CartLineItem::new(burger(), 1, Vec::new()));
        assert_eq!(cart.len(), 1);
    }
}
