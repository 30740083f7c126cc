//! In-memory shopping cart.
//!
//! The cart holds the line items for the running session. It is never
//! persisted: a restart begins with an empty cart, and a completed checkout
//! clears it.
//!
//! # Invariants
//!
//! - At most one line per product ID; adding an existing product merges by
//!   summing quantities.
//! - No line ever has a quantity below 1. Setting a quantity below 1 removes
//!   the line instead.
//! - Lines keep insertion order.
//!
//! # Observing changes
//!
//! The current [`CartState`] lives in a `watch` channel. Every mutation that
//! changes the cart notifies subscribers before the mutating call returns, so
//! a read after a write always sees the write. Mutations that change nothing
//! (removing an absent product, clearing an empty cart) do not notify.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::types::{Price, ProductId};

/// One product entry in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Display name captured when the product was added.
    pub name: String,
    /// Price of a single unit.
    pub unit_price: Price,
    /// Number of units, always at least 1 inside a cart.
    pub quantity: u32,
}

impl CartLineItem {
    /// Create a line item.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Price, quantity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The ordered list of line items in a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartState {
    items: Vec<CartLineItem>,
}

impl CartState {
    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Sum of `unit_price * quantity` over all lines; zero for an empty cart.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartLineItem::subtotal).sum()
    }
}

/// The authoritative cart for the active session.
///
/// All operations take `&self`; the watch channel is the single cell that
/// holds the cart, so a `CartStore` can be shared between request handlers.
#[derive(Debug)]
pub struct CartStore {
    state: watch::Sender<CartState>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self { state }
    }

    /// A copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Subscribe to cart changes.
    ///
    /// The receiver starts out holding the current cart, marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Add a line, or merge into the existing line for the same product.
    ///
    /// Merging adds `item.quantity` to the existing quantity; the existing
    /// name and unit price are kept. A quantity of 0 changes nothing.
    pub fn add_item(&self, item: CartLineItem) -> CartState {
        if item.quantity == 0 {
            return self.snapshot();
        }

        self.state.send_modify(|cart| {
            if let Some(line) = cart.items.iter_mut().find(|line| line.id == item.id) {
                line.quantity = line.quantity.saturating_add(item.quantity);
                return;
            }
            cart.items.push(item);
        });
        self.snapshot()
    }

    /// Remove the line for `id`. Absent IDs are ignored.
    pub fn remove_item(&self, id: ProductId) -> CartState {
        self.state.send_if_modified(|cart| {
            let before = cart.items.len();
            cart.items.retain(|line| line.id != id);
            cart.items.len() != before
        });
        self.snapshot()
    }

    /// Replace the quantity on the line for `id`.
    ///
    /// A quantity below 1 removes the line. Other lines and the order are left
    /// untouched. Absent IDs are ignored.
    pub fn update_quantity(&self, id: ProductId, new_quantity: i64) -> CartState {
        if new_quantity < 1 {
            return self.remove_item(id);
        }
        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);

        self.state.send_if_modified(|cart| {
            match cart.items.iter_mut().find(|line| line.id == id) {
                Some(line) if line.quantity != quantity => {
                    line.quantity = quantity;
                    true
                }
                _ => false,
            }
        });
        self.snapshot()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.state.borrow().total_price()
    }

    /// Take the lines of `paid` out of the cart.
    ///
    /// Each paid quantity is subtracted from the current line for the same
    /// product, dropping lines that reach zero. Anything added after `paid`
    /// was taken stays in the cart.
    pub fn settle(&self, paid: &CartState) -> CartState {
        self.state.send_if_modified(|cart| {
            let mut changed = false;
            for paid_line in &paid.items {
                if let Some(line) = cart.items.iter_mut().find(|line| line.id == paid_line.id) {
                    line.quantity = line.quantity.saturating_sub(paid_line.quantity);
                    changed = true;
                }
            }
            cart.items.retain(|line| line.quantity > 0);
            changed
        });
        self.snapshot()
    }

    /// Remove every line.
    pub fn clear_cart(&self) -> CartState {
        self.state.send_if_modified(|cart| {
            if cart.items.is_empty() {
                return false;
            }
            cart.items.clear();
            true
        });
        self.snapshot()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn price(s: &str) -> Price {
        Price::new(s.parse::<Decimal>().unwrap()).unwrap()
    }

    fn line(id: i64, unit: &str, quantity: u32) -> CartLineItem {
        CartLineItem::new(ProductId::new(id), format!("Product {id}"), price(unit), quantity)
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = CartStore::new();
        assert!(cart.snapshot().is_empty());
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_add_same_id_merges_quantities() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        let state = cart.add_item(line(1, "10", 3));

        assert_eq!(state.len(), 1);
        assert_eq!(state.get(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_merge_keeps_original_name_and_price() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 1));
        let state = cart.add_item(CartLineItem::new(ProductId::new(1), "Renamed", price("99"), 1));

        let merged = state.get(ProductId::new(1)).unwrap();
        assert_eq!(merged.name, "Product 1");
        assert_eq!(merged.unit_price, price("10"));
        assert_eq!(merged.quantity, 2);
    }

    #[test]
    fn test_add_distinct_ids_one_line_each_in_order() {
        let cart = CartStore::new();
        let adds = [(3, 1), (1, 2), (3, 4), (2, 1), (1, 1)];
        for (id, qty) in adds {
            cart.add_item(line(id, "1", qty));
        }

        let state = cart.snapshot();
        let ids: Vec<i64> = state.items().iter().map(|l| l.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        for id in [1, 2, 3] {
            let expected: u32 = adds
                .iter()
                .filter(|(i, _)| *i == id)
                .map(|(_, q)| q)
                .sum();
            assert_eq!(state.get(ProductId::new(id)).unwrap().quantity, expected);
        }
    }

    #[test]
    fn test_add_zero_quantity_is_ignored() {
        let cart = CartStore::new();
        let state = cart.add_item(line(1, "10", 0));
        assert!(state.is_empty());
    }

    #[test]
    fn test_remove_item() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 1));
        cart.add_item(line(2, "5", 1));

        let state = cart.remove_item(ProductId::new(1));
        assert_eq!(state.len(), 1);
        assert!(state.get(ProductId::new(1)).is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 1));
        let state = cart.remove_item(ProductId::new(99));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_update_quantity_replaces_and_keeps_order() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 1));
        cart.add_item(line(2, "5", 1));
        cart.add_item(line(3, "1", 1));

        let state = cart.update_quantity(ProductId::new(2), 7);
        let quantities: Vec<u32> = state.items().iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![1, 7, 1]);
    }

    #[test]
    fn test_update_quantity_zero_equals_remove() {
        let updated = CartStore::new();
        let removed = CartStore::new();
        for cart in [&updated, &removed] {
            cart.add_item(line(1, "10", 2));
            cart.add_item(line(2, "5", 1));
        }

        assert_eq!(
            updated.update_quantity(ProductId::new(1), 0),
            removed.remove_item(ProductId::new(1))
        );
    }

    #[test]
    fn test_update_quantity_negative_removes() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        assert!(cart.update_quantity(ProductId::new(1), -3).is_empty());
    }

    #[test]
    fn test_update_quantity_absent_is_noop() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        let state = cart.update_quantity(ProductId::new(9), 4);
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(ProductId::new(1)).unwrap().quantity, 2);
    }

    #[test]
    fn test_total_price() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        cart.add_item(line(2, "5.5", 1));
        assert_eq!(cart.total_price(), price("25.5"));
        assert_eq!(cart.total_price().to_string(), "$25.50");
    }

    #[test]
    fn test_clear_then_total_is_zero() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        let state = cart.clear_cart();

        assert!(state.is_empty());
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_item_count() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        cart.add_item(line(2, "5", 3));
        assert_eq!(cart.snapshot().item_count(), 5);
    }

    #[test]
    fn test_subscribers_see_mutations() {
        let cart = CartStore::new();
        let mut rx = cart.subscribe();
        assert!(!rx.has_changed().unwrap());

        cart.add_item(line(1, "10", 1));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_settle_removes_paid_lines() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        cart.add_item(line(2, "5.5", 1));

        let paid = cart.snapshot();
        let state = cart.settle(&paid);
        assert!(state.is_empty());
    }

    #[test]
    fn test_settle_keeps_lines_added_after_snapshot() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        let paid = cart.snapshot();

        cart.add_item(line(1, "10", 3));
        cart.add_item(line(2, "5.5", 1));

        let state = cart.settle(&paid);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get(ProductId::new(1)).unwrap().quantity, 3);
        assert_eq!(state.get(ProductId::new(2)).unwrap().quantity, 1);
    }

    #[test]
    fn test_settle_after_line_removed_is_noop() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 2));
        let paid = cart.snapshot();
        cart.remove_item(ProductId::new(1));
        let mut rx = cart.subscribe();

        assert!(cart.settle(&paid).is_empty());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_noop_mutations_do_not_notify() {
        let cart = CartStore::new();
        cart.add_item(line(1, "10", 1));
        let mut rx = cart.subscribe();

        cart.remove_item(ProductId::new(42));
        cart.update_quantity(ProductId::new(42), 3);
        cart.update_quantity(ProductId::new(1), 1);
        assert!(!rx.has_changed().unwrap());

        cart.clear_cart();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        cart.clear_cart();
        assert!(!rx.has_changed().unwrap());
    }
}
