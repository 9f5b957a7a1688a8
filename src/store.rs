//! The authoritative clipboard history.
//!
//! Every mutation goes through one [`ItemStore`], keyed by item id, so results
//! from unrelated jobs never overwrite each other. Jobs that finish after their
//! item was removed find nothing to update and do nothing.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::cache::fingerprint;
use crate::item::{CapturedContent, ClipboardItem, ItemId, PromptKind, ResultSlot};

pub const DEFAULT_HISTORY_LIMIT: usize = 200;

const EVENT_CAPACITY: usize = 256;

/// Paste timestamps keyed by content fingerprint.
pub type PasteHistory = HashMap<String, Vec<DateTime<Utc>>>;

/// Change notifications for observers such as the persister or a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEvent {
    Added(ItemId),
    Updated(ItemId),
    Removed(ItemId),
    Cleared,
}

/// Point-in-time copy of the history, most recent item first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub items: Vec<ClipboardItem>,
    pub paste_history: PasteHistory,
}

#[derive(Default)]
struct HistoryState {
    items: HashMap<ItemId, ClipboardItem>,
    /// Most recent first.
    order: VecDeque<ItemId>,
    paste_history: PasteHistory,
}

impl HistoryState {
    fn find_duplicate(&self, captured: &CapturedContent) -> Option<ItemId> {
        self.order.iter().copied().find(|id| {
            self.items.get(id).is_some_and(|item| {
                item.item_type == captured.item_type
                    && item.content == captured.content
                    && item.image_data == captured.image_data
            })
        })
    }

    fn move_to_front(&mut self, id: ItemId) {
        self.order.retain(|other| *other != id);
        self.order.push_front(id);
    }

    fn remove(&mut self, id: ItemId) -> bool {
        self.order.retain(|other| *other != id);
        self.items.remove(&id).is_some()
    }
}

struct StoreInner {
    capacity: usize,
    state: RwLock<HistoryState>,
    events: broadcast::Sender<ItemEvent>,
}

#[derive(Clone)]
pub struct ItemStore {
    inner: Arc<StoreInner>,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ItemStore {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                capacity: capacity.max(1),
                state: RwLock::new(HistoryState::default()),
                events,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: ItemEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Adds a captured entry at the front of the history.
    ///
    /// Capturing content identical to an existing item moves that item to the
    /// front with its results intact. The oldest items are evicted past capacity.
    pub async fn capture(&self, captured: CapturedContent, auto_analyze_images: bool) -> ItemId {
        let mut state = self.inner.state.write().await;

        if let Some(existing) = state.find_duplicate(&captured) {
            state.move_to_front(existing);
            drop(state);
            tracing::debug!(item_id = %existing, "duplicate capture moved to front");
            self.emit(ItemEvent::Updated(existing));
            return existing;
        }

        let item = ClipboardItem::new(captured, auto_analyze_images);
        let id = item.id;
        state.items.insert(id, item);
        state.order.push_front(id);

        let mut evicted = Vec::new();
        while state.order.len() > self.inner.capacity {
            if let Some(oldest) = state.order.pop_back() {
                state.items.remove(&oldest);
                evicted.push(oldest);
            }
        }
        drop(state);

        tracing::debug!(item_id = %id, evicted = evicted.len(), "item captured");
        self.emit(ItemEvent::Added(id));
        for oldest in evicted {
            self.emit(ItemEvent::Removed(oldest));
        }
        id
    }

    /// Replaces the whole history, e.g. with what was loaded from disk.
    pub async fn restore(&self, snapshot: HistorySnapshot) {
        let mut state = self.inner.state.write().await;
        let mut restored = HistoryState {
            paste_history: snapshot.paste_history,
            ..HistoryState::default()
        };
        for mut item in snapshot.items.into_iter().take(self.inner.capacity) {
            if restored.items.contains_key(&item.id) {
                continue;
            }
            // Jobs from a previous run will never report back.
            item.discard_in_flight();
            restored.order.push_back(item.id);
            restored.items.insert(item.id, item);
        }
        *state = restored;
    }

    pub async fn get(&self, id: ItemId) -> Option<ClipboardItem> {
        self.inner.state.read().await.items.get(&id).cloned()
    }

    pub async fn contains(&self, id: ItemId) -> bool {
        self.inner.state.read().await.items.contains_key(&id)
    }

    /// All items, most recent first.
    pub async fn items(&self) -> Vec<ClipboardItem> {
        let state = self.inner.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect()
    }

    /// Item at `index` in display order (0 = most recent).
    pub async fn nth(&self, index: usize) -> Option<ClipboardItem> {
        let state = self.inner.state.read().await;
        state
            .order
            .get(index)
            .and_then(|id| state.items.get(id).cloned())
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Mutates one item in place. Returns `None` when the item no longer exists.
    pub async fn update<R>(&self, id: ItemId, f: impl FnOnce(&mut ClipboardItem) -> R) -> Option<R> {
        let result = {
            let mut state = self.inner.state.write().await;
            f(state.items.get_mut(&id)?)
        };
        self.emit(ItemEvent::Updated(id));
        Some(result)
    }

    /// Like [`Self::update`], for closures that may decline to change anything.
    ///
    /// Returning `None` from `f` means the item was left untouched, and no
    /// [`ItemEvent::Updated`] is sent.
    pub async fn update_if<R>(
        &self,
        id: ItemId,
        f: impl FnOnce(&mut ClipboardItem) -> Option<R>,
    ) -> Option<R> {
        let result = {
            let mut state = self.inner.state.write().await;
            f(state.items.get_mut(&id)?)?
        };
        self.emit(ItemEvent::Updated(id));
        Some(result)
    }

    /// Marks `kind` as processing unless a job for it is already running.
    ///
    /// Returns the text to rewrite, or `None` when the item is gone or busy.
    pub async fn begin_prompt(&self, id: ItemId, kind: PromptKind) -> Option<String> {
        self.update_if(id, |item| {
            if item.is_prompt_processing(kind) || !item.item_type.is_textual() {
                return None;
            }
            item.prompt_results.insert(kind, ResultSlot::pending());
            Some(item.plain_text().to_string())
        })
        .await
    }

    pub async fn remove(&self, id: ItemId) -> bool {
        let removed = self.inner.state.write().await.remove(id);
        if removed {
            self.emit(ItemEvent::Removed(id));
        }
        removed
    }

    pub async fn set_useful(&self, id: ItemId, useful: bool) -> bool {
        self.update(id, |item| item.is_useful = useful).await.is_some()
    }

    /// Drops history items, optionally keeping those flagged useful.
    ///
    /// Paste counts survive only for content that is still in the history.
    /// Returns the number of removed items.
    pub async fn clear(&self, keep_useful: bool) -> usize {
        let removed = {
            let mut state = self.inner.state.write().await;
            let before = state.order.len();
            if keep_useful {
                state.items.retain(|_, item| item.is_useful);
                let HistoryState {
                    items,
                    order,
                    paste_history,
                } = &mut *state;
                order.retain(|id| items.contains_key(id));
                let kept: Vec<String> = items.values().map(|i| fingerprint(&i.content)).collect();
                paste_history.retain(|key, _| kept.contains(key));
            } else {
                *state = HistoryState::default();
            }
            before - state.order.len()
        };
        tracing::info!(removed, keep_useful, "history cleared");
        self.emit(ItemEvent::Cleared);
        removed
    }

    /// Records that an item was pasted. Returns its new paste count.
    pub async fn record_paste(&self, id: ItemId) -> Option<usize> {
        let count = {
            let mut state = self.inner.state.write().await;
            let key = fingerprint(&state.items.get(&id)?.content);
            let stamps = state.paste_history.entry(key).or_default();
            stamps.push(Utc::now());
            stamps.len()
        };
        self.emit(ItemEvent::Updated(id));
        Some(count)
    }

    pub async fn paste_count(&self, content: &str) -> usize {
        self.inner
            .state
            .read()
            .await
            .paste_history
            .get(&fingerprint(content))
            .map_or(0, Vec::len)
    }

    pub async fn snapshot(&self) -> HistorySnapshot {
        let state = self.inner.state.read().await;
        HistorySnapshot {
            items: state
                .order
                .iter()
                .filter_map(|id| state.items.get(id).cloned())
                .collect(),
            paste_history: state.paste_history.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_orders_most_recent_first() {
        let store = ItemStore::new(10);
        let a = store.capture(CapturedContent::text("a"), false).await;
        let b = store.capture(CapturedContent::text("b"), false).await;

        let ids: Vec<_> = store.items().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(store.nth(0).await.unwrap().id, b);
    }

    #[tokio::test]
    async fn test_duplicate_capture_moves_to_front() {
        let store = ItemStore::new(10);
        let a = store.capture(CapturedContent::text("a"), false).await;
        store.capture(CapturedContent::text("b"), false).await;
        store
            .update(a, |item| item.is_useful = true)
            .await
            .unwrap();

        let again = store.capture(CapturedContent::text("a"), false).await;
        assert_eq!(again, a);
        assert_eq!(store.len().await, 2);
        let front = store.nth(0).await.unwrap();
        assert_eq!(front.id, a);
        assert!(front.is_useful);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = ItemStore::new(2);
        let a = store.capture(CapturedContent::text("a"), false).await;
        store.capture(CapturedContent::text("b"), false).await;
        store.capture(CapturedContent::text("c"), false).await;

        assert_eq!(store.len().await, 2);
        assert!(!store.contains(a).await);
    }

    #[tokio::test]
    async fn test_update_on_removed_item_is_a_no_op() {
        let store = ItemStore::default();
        let id = store.capture(CapturedContent::text("gone"), false).await;
        assert!(store.remove(id).await);
        assert!(store.update(id, |item| item.is_useful = true).await.is_none());
        assert!(!store.remove(id).await);
    }

    #[tokio::test]
    async fn test_begin_prompt_refuses_second_job() {
        let store = ItemStore::default();
        let id = store.capture(CapturedContent::text(" text "), false).await;
        assert_eq!(
            store.begin_prompt(id, PromptKind::Grammar).await.as_deref(),
            Some("text")
        );
        assert!(store.begin_prompt(id, PromptKind::Grammar).await.is_none());
        assert!(store.begin_prompt(id, PromptKind::Formal).await.is_some());
    }

    #[tokio::test]
    async fn test_refused_update_sends_no_event() {
        let store = ItemStore::default();
        let id = store.capture(CapturedContent::text("busy"), false).await;
        let mut events = store.subscribe();

        assert!(store.begin_prompt(id, PromptKind::Grammar).await.is_some());
        assert!(store.begin_prompt(id, PromptKind::Grammar).await.is_none());
        assert_eq!(store.update_if(id, |_| None::<()>).await, None);

        assert_eq!(events.try_recv().unwrap(), ItemEvent::Updated(id));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_keeping_useful() {
        let store = ItemStore::default();
        let keep = store.capture(CapturedContent::text("keep"), false).await;
        let gone = store.capture(CapturedContent::text("gone"), false).await;
        store.set_useful(keep, true).await;
        store.record_paste(keep).await;
        store.record_paste(gone).await;

        assert_eq!(store.clear(true).await, 1);
        assert_eq!(store.items().await.len(), 1);
        assert_eq!(store.paste_count("keep").await, 1);
        assert_eq!(store.paste_count("gone").await, 0);

        assert_eq!(store.clear(false).await, 1);
        assert!(store.is_empty().await);
        assert_eq!(store.paste_count("keep").await, 0);
    }

    #[tokio::test]
    async fn test_record_paste_counts_by_content() {
        let store = ItemStore::default();
        let id = store.capture(CapturedContent::text("hello"), false).await;
        assert_eq!(store.record_paste(id).await, Some(1));
        assert_eq!(store.record_paste(id).await, Some(2));
        assert_eq!(store.paste_count("hello ").await, 2);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let store = ItemStore::default();
        let mut events = store.subscribe();
        let id = store.capture(CapturedContent::text("x"), false).await;
        store.remove(id).await;

        assert_eq!(events.recv().await.unwrap(), ItemEvent::Added(id));
        assert_eq!(events.recv().await.unwrap(), ItemEvent::Removed(id));
    }

    #[tokio::test]
    async fn test_restore_replaces_state() {
        let source = ItemStore::default();
        source.capture(CapturedContent::text("one"), false).await;
        source.capture(CapturedContent::text("two"), false).await;
        let snapshot = source.snapshot().await;

        let store = ItemStore::new(1);
        store.restore(snapshot.clone()).await;
        assert_eq!(store.items().await, snapshot.items[..1].to_vec());
    }

    #[tokio::test]
    async fn test_restore_drops_stale_processing_slots() {
        let source = ItemStore::default();
        let id = source.capture(CapturedContent::text("half done"), false).await;
        source
            .update(id, |item| {
                item.prompt_results
                    .insert(PromptKind::Grammar, ResultSlot::done("Half done.".to_string()));
                item.prompt_results.insert(PromptKind::Formal, ResultSlot::pending());
                item.translated_results
                    .insert("fr".to_string(), ResultSlot::pending());
            })
            .await;

        let store = ItemStore::default();
        store.restore(source.snapshot().await).await;
        let item = store.get(id).await.unwrap();
        assert_eq!(item.prompt_text(PromptKind::Grammar), Some("Half done."));
        assert!(!item.prompt_results.contains_key(&PromptKind::Formal));
        assert!(item.translated_results.is_empty());
    }
}
