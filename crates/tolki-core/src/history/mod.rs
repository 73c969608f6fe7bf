//! Conversation history management.
//!
//! `HistoryManager` owns the ordered item log and is the only mutation path
//! for it. Mutations are synchronous and atomic with respect to each other;
//! persistence goes through an injected sink so the storage mechanism stays
//! out of the domain layer.

use std::sync::Arc;

use crate::error::Result;
use crate::item::Item;

/// Persistence sink for the item log.
///
/// Implementations write the persistable subset of the log under the
/// session's `history` key. Writes are snapshot overwrites; a failing sink
/// surfaces to the caller, it is never swallowed.
pub trait HistoryPersistence: Send + Sync {
    /// Persists the given snapshot of persistable items.
    fn persist_history(&self, items: &[Item]) -> Result<()>;
}

/// Callback invoked after every log mutation; the render layer uses it to
/// re-render from the read-only snapshot.
pub type MutationSubscriber = Box<dyn Fn(&[Item]) + Send + Sync>;

/// Centralized history management.
///
/// Owns the append-biased item log and enforces its invariants:
/// - removal is a stable filter, relative order of retained items is kept
/// - `Thinking` and `CartNotification` never reach the persisted subset
pub struct HistoryManager {
    items: Vec<Item>,
    sink: Arc<dyn HistoryPersistence>,
    subscriber: Option<MutationSubscriber>,
}

impl HistoryManager {
    /// Creates a manager with an empty log and the given persistence sink.
    pub fn new(sink: Arc<dyn HistoryPersistence>) -> Self {
        Self {
            items: Vec::new(),
            sink,
            subscriber: None,
        }
    }

    /// Registers the mutation subscriber. At most one is supported.
    pub fn set_subscriber(&mut self, subscriber: MutationSubscriber) {
        self.subscriber = Some(subscriber);
    }

    fn notify(&self) {
        if let Some(subscriber) = &self.subscriber {
            subscriber(&self.items);
        }
    }

    /// Appends a single item.
    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
        self.notify();
    }

    /// Appends multiple items, preserving their order.
    pub fn add_items(&mut self, items: Vec<Item>) {
        self.items.extend(items);
        self.notify();
    }

    /// Inserts multiple items at `index`, preserving their order.
    ///
    /// Used by the round-trip controller to splice a response batch into the
    /// position where the `Thinking` placeholder was removed.
    pub fn insert_items(&mut self, index: usize, items: Vec<Item>) {
        let index = index.min(self.items.len());
        self.items.splice(index..index, items);
        self.notify();
    }

    /// Removes every item matching the predicate (stable filter).
    pub fn remove_items<P>(&mut self, predicate: P)
    where
        P: Fn(&Item) -> bool,
    {
        self.items.retain(|item| !predicate(item));
        self.notify();
    }

    /// Removes the first item equal to `target`, if present.
    pub fn remove_item(&mut self, target: &Item) {
        if let Some(position) = self.items.iter().position(|item| item == target) {
            self.items.remove(position);
            self.notify();
        }
    }

    /// Replaces the entire log.
    pub fn replace_history(&mut self, items: Vec<Item>) {
        self.items = items;
        self.notify();
    }

    /// Removes every `Thinking` and `CartNotification` item.
    pub fn clear_temporary_items(&mut self) {
        self.remove_items(Item::is_ephemeral);
    }

    /// Returns the subset of the log eligible for persistence.
    pub fn get_persistable_items(&self) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| item.is_persistable())
            .cloned()
            .collect()
    }

    /// Persists the current persistable subset through the sink.
    ///
    /// Idempotent: repeated calls with no intervening mutation hand the sink
    /// an identical snapshot each time.
    pub fn persist(&self) -> Result<()> {
        let persistable = self.get_persistable_items();
        self.sink.persist_history(&persistable)
    }

    /// Removes cart notifications in both encodings (the legacy flagged
    /// `Action` and the first-class `CartNotification` kind).
    pub fn remove_cart_notifications(&mut self) {
        self.remove_items(Item::is_cart_notification);
    }

    /// The common "settle and notify" sequence: clear temporary items,
    /// persist, then run the optional callback.
    pub fn execute_standard_flow<F>(&mut self, on_done: Option<F>) -> Result<()>
    where
        F: FnOnce(),
    {
        self.clear_temporary_items();
        self.persist()?;
        if let Some(callback) = on_done {
            callback();
        }
        Ok(())
    }

    /// Read-only snapshot of the current log.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Whether the log holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The last item in the log, if any.
    pub fn last_item(&self) -> Option<&Item> {
        self.items.last()
    }

    /// Position of the `Thinking` placeholder, if present.
    pub fn thinking_index(&self) -> Option<usize> {
        self.items.iter().position(Item::is_thinking)
    }
}
