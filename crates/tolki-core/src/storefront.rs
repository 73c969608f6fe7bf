//! Live storefront state shared with the host page.
//!
//! The engine never owns the cart or order data; it reads a shared snapshot
//! maintained by the embedding site and only derives presence/absence facts
//! from it (command guards, the ephemeral cart notification).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::{Item, ItemBuilder};

/// Load state of the externally-owned cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Snapshot of the live cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub status: CartStatus,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Snapshot of the live orders, grouped by status.
pub type OrdersSnapshot = HashMap<String, Vec<Value>>;

/// Storefront state as last published by the host page. `None` means the
/// host never exposed that piece of state at all.
#[derive(Debug, Clone, Default)]
pub struct StorefrontState {
    pub cart: Option<CartSnapshot>,
    pub orders: Option<OrdersSnapshot>,
}

/// Cheap-to-clone handle to the shared storefront state.
#[derive(Clone, Default)]
pub struct SharedStorefront {
    inner: Arc<RwLock<StorefrontState>>,
}

impl SharedStorefront {
    pub fn new(state: StorefrontState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Replaces the snapshot; called on the host's "loaded" signal.
    pub fn update(&self, state: StorefrontState) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = state;
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StorefrontState) -> T) -> T
    where
        T: Default,
    {
        self.inner.read().map(|guard| f(&guard)).unwrap_or_default()
    }

    /// Whether the host exposes a cart at all.
    pub fn has_cart(&self) -> bool {
        self.read(|state| state.cart.is_some())
    }

    /// Whether the host exposes orders at all.
    pub fn has_orders(&self) -> bool {
        self.read(|state| state.orders.is_some())
    }

    pub fn cart_status(&self) -> CartStatus {
        self.read(|state| {
            state
                .cart
                .as_ref()
                .map(|cart| cart.status)
                .unwrap_or_default()
        })
    }

    pub fn cart_item_count(&self) -> usize {
        self.read(|state| {
            state
                .cart
                .as_ref()
                .map(|cart| cart.items.len())
                .unwrap_or(0)
        })
    }

    pub fn has_cart_items(&self) -> bool {
        self.cart_item_count() > 0
    }

    pub fn order_count(&self) -> usize {
        self.read(|state| {
            state
                .orders
                .as_ref()
                .map(|orders| orders.values().map(Vec::len).sum())
                .unwrap_or(0)
        })
    }

    /// Derives the ephemeral cart notification from the live state.
    ///
    /// Only a loaded, non-empty cart produces a notification; loading,
    /// idle, error and empty states do not.
    pub fn cart_notification_item(&self) -> Option<Item> {
        if self.cart_status() == CartStatus::Loaded && self.has_cart_items() {
            Some(ItemBuilder::cart_notification())
        } else {
            None
        }
    }

    /// Whether the heading messages should seed a cart notification: the
    /// cart already has items, or is still loading and may end up with some.
    pub fn should_seed_cart_notification(&self) -> bool {
        self.has_cart_items() || self.cart_status() == CartStatus::Loading
    }
}
