//! Shopping cart: line items, quantity rules and rupee totals.
//!
//! [`Cart`] is the pure state machine. [`CartSession`] wraps it with the
//! session's [`SessionStorage`], loading on creation and writing the full
//! item list back after every mutation.

use crate::storage::SessionStorage;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

/// Session storage key the cart is mirrored under.
pub const CART_STORAGE_KEY: &str = "cart_items";

/// Most units a single line can hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]+").expect("hard-coded regex is valid"));
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").expect("hard-coded regex is valid")
});

/// One cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id; at most one line per id.
    pub id: String,
    pub name: String,
    /// Display price, e.g. `₹1,200.00`.
    pub price: String,
    pub image: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Short image hint, usually the product's first tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Result of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    Updated,
    Removed,
    /// No line with that id; nothing changed.
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit. An existing line for the same id gains one unit; a new
    /// line always starts at quantity 1 whatever the incoming quantity.
    pub fn add(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1).min(MAX_LINE_QUANTITY),
            None => self.items.push(CartItem { quantity: 1, ..item }),
        }
    }

    /// Remove a line. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        self.items.len() != before
    }

    /// Set a line's quantity. Zero or below removes the line; anything above
    /// [`MAX_LINE_QUANTITY`] is capped.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> QuantityUpdate {
        if quantity <= 0 {
            return if self.remove(id) {
                QuantityUpdate::Removed
            } else {
                QuantityUpdate::Missing
            };
        }

        match self.items.iter_mut().find(|line| line.id == id) {
            Some(line) => {
                let capped = quantity.min(i64::from(MAX_LINE_QUANTITY));
                line.quantity = u32::try_from(capped).unwrap_or(MAX_LINE_QUANTITY);
                QuantityUpdate::Updated
            }
            None => QuantityUpdate::Missing,
        }
    }

    /// Units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of price × quantity. Unparseable prices count as zero.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|line| match parse_price(&line.price) {
                Some(price) => price * f64::from(line.quantity),
                None => {
                    tracing::warn!(id = %line.id, price = %line.price, "cart line has an unparseable price");
                    0.0
                }
            })
            .sum()
    }

    pub fn formatted_total(&self) -> String {
        format_inr(self.total())
    }
}

/// Parse a display price such as `₹1,200.50`. Every character other than
/// digits, `.` and `-` is dropped, then the leading number is read.
pub fn parse_price(price: &str) -> Option<f64> {
    let stripped = NON_NUMERIC.replace_all(price, "");
    let number = LEADING_NUMBER.find(&stripped)?;
    number
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Format rupees the way the Indian locale does: two decimals, the last
/// three integer digits grouped together and pairs before that.
pub fn format_inr(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}₹{}.{fraction}", group_indian(whole))
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (mut head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    while head.len() > 2 {
        let (rest, pair) = head.split_at(head.len() - 2);
        groups.push(pair);
        head = rest;
    }
    if !head.is_empty() {
        groups.push(head);
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

/// A cart bound to its session storage.
pub struct CartSession {
    cart: Cart,
    storage: Arc<dyn SessionStorage>,
}

impl CartSession {
    /// Restore the cart from storage. Missing or unreadable data gives an
    /// empty cart.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let cart = match storage.get(CART_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<Cart>(&raw) {
                Ok(cart) => cart,
                Err(error) => {
                    tracing::warn!(%error, "could not load cart from session storage");
                    Cart::new()
                }
            },
            None => Cart::new(),
        };

        Self { cart, storage }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn add(&mut self, item: CartItem) {
        self.cart.add(item);
        self.persist();
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.cart.remove(id);
        self.persist();
        removed
    }

    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> QuantityUpdate {
        let outcome = self.cart.update_quantity(id, quantity);
        self.persist();
        outcome
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.cart) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(%error, "could not serialize cart");
                return;
            }
        };
        if let Err(error) = self.storage.set(CART_STORAGE_KEY, serialized) {
            tracing::warn!(%error, "could not save cart to session storage");
        }
    }
}
