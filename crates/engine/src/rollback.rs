use cartsync_core::identity::ItemKey;
use cartsync_core::model::{CartLineItem, CartState};
use cartsync_core::ops::CartOp;

/// Before-image of a mutation, captured *before* the optimistic write.
/// Rolling back is reapplying this record verbatim — nothing is
/// reconstructed from post-failure state.
#[derive(Debug, Clone)]
pub enum RollbackPoint {
    /// Nothing changed locally (replay of an already-applied mutation).
    Unchanged,
    /// The item did not exist before an add; rollback removes it.
    ItemAbsent { key: ItemKey },
    /// A removed item, with its original position.
    Item { index: usize, item: CartLineItem },
    /// The exact prior quantity of an updated item.
    Quantity { key: ItemKey, quantity: u32 },
    /// The full prior item list, original order.
    AllItems { items: Vec<CartLineItem> },
}

impl RollbackPoint {
    /// Put the cart back exactly as it was before the optimistic write.
    pub fn reapply(self, state: &mut CartState) {
        match self {
            Self::Unchanged => {}
            Self::ItemAbsent { key } => {
                if let Some(index) = state.position_by_key(&key) {
                    state.remove_item(index);
                }
            }
            Self::Item { index, item } => {
                state.insert_item(index, item);
            }
            Self::Quantity { key, quantity } => {
                if let Some(index) = state.position_by_key(&key) {
                    state.set_quantity(index, quantity);
                }
            }
            Self::AllItems { items } => {
                state.replace_items(items);
            }
        }
    }
}

/// Command record for one in-flight mutation: what ran, and what to
/// reapply if the server rejects it.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: &'static str,
    pub before: RollbackPoint,
    pub after: CartOp,
}
