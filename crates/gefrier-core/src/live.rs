//! Live queries
//!
//! A `LiveQuery` keeps the result of a store query current. It runs the
//! query once, then re-runs it whenever a committed write touches one of
//! the collections it depends on. Consumers read the latest state through a
//! `watch` channel.
//!
//! ## Lifecycle
//!
//! - The change feed is subscribed *before* the first run, so a write that
//!   commits while the initial query is in flight still triggers a re-run.
//! - `set_key` switches to a new key: state goes back to `Loading` and the
//!   task for the old key is aborted. Results computed for the old key are
//!   discarded even if they finish late.
//! - Dropping the `LiveQuery` aborts its task.
//!
//! Must be created from within a tokio runtime.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::models::{Drawer, DrawerStats, Freezer, Item, Tag};
use crate::storage::{Collection, StoreResult};
use crate::store::Store;

/// Latest known result of a live query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveState<T> {
    /// The first result for the current key has not arrived yet
    Loading,
    Ready(T),
    /// The last run failed; the message is the store error
    Failed(String),
}

impl<T> LiveState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LiveState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LiveState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The ready value, or an empty one while loading or failed
    pub fn value_or_default(&self) -> T
    where
        T: Clone + Default,
    {
        self.ready().cloned().unwrap_or_default()
    }
}

type QueryFn<K, T> = Arc<dyn Fn(Store, K) -> BoxFuture<'static, StoreResult<T>> + Send + Sync>;

/// A query result kept current by re-running on relevant writes
pub struct LiveQuery<K, T> {
    store: Store,
    key: K,
    deps: Arc<[Collection]>,
    query: QueryFn<K, T>,
    state: Arc<watch::Sender<LiveState<T>>>,
    generation: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl<K, T> LiveQuery<K, T>
where
    K: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Start a live query for `key`, re-run on writes to any of `deps`
    pub fn new<F, Fut>(store: &Store, key: K, deps: &[Collection], query: F) -> Self
    where
        F: Fn(Store, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StoreResult<T>> + Send + 'static,
    {
        let query: QueryFn<K, T> =
            Arc::new(move |store: Store, key: K| query(store, key).boxed());
        let (state, _) = watch::channel(LiveState::Loading);
        let state = Arc::new(state);
        let generation = Arc::new(AtomicU64::new(0));
        let deps: Arc<[Collection]> = deps.into();

        let task = spawn_refresh(
            store.clone(),
            key.clone(),
            deps.clone(),
            query.clone(),
            state.clone(),
            generation.clone(),
        );

        Self {
            store: store.clone(),
            key,
            deps,
            query,
            state,
            generation,
            task,
        }
    }

    /// Watch the state; every re-run result is delivered as a change
    pub fn subscribe(&self) -> watch::Receiver<LiveState<T>> {
        self.state.subscribe()
    }

    /// Clone of the latest state
    pub fn current(&self) -> LiveState<T>
    where
        T: Clone,
    {
        self.state.borrow().clone()
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn dependencies(&self) -> &[Collection] {
        &self.deps
    }

    /// Re-target the query at a new key
    pub fn set_key(&mut self, key: K) {
        // Bump first so a late result for the old key is rejected
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(LiveState::Loading);
        self.task.abort();

        self.key = key;
        self.task = spawn_refresh(
            self.store.clone(),
            self.key.clone(),
            self.deps.clone(),
            self.query.clone(),
            self.state.clone(),
            self.generation.clone(),
        );
    }

    /// Wait until the current key has a result (ready or failed)
    pub async fn settled(&self) -> LiveState<T>
    where
        T: Clone,
    {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so this only happens mid-drop
            Err(_) => LiveState::Loading,
        };
        state
    }
}

impl<K, T> Drop for LiveQuery<K, T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_refresh<K, T>(
    store: Store,
    key: K,
    deps: Arc<[Collection]>,
    query: QueryFn<K, T>,
    state: Arc<watch::Sender<LiveState<T>>>,
    generation: Arc<AtomicU64>,
) -> JoinHandle<()>
where
    K: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    let mut feed = store.subscribe();
    let own_generation = generation.load(Ordering::SeqCst);

    tokio::spawn(async move {
        loop {
            let next = match query(store.clone(), key.clone()).await {
                Ok(value) => LiveState::Ready(value),
                Err(e) => {
                    warn!(error = %e, "Live query failed");
                    LiveState::Failed(e.to_string())
                }
            };

            // Checked under the watch lock, which `set_key` also takes
            state.send_if_modified(|current| {
                if generation.load(Ordering::SeqCst) != own_generation {
                    return false;
                }
                *current = next;
                true
            });

            loop {
                match feed.recv().await {
                    Ok(changes) if changes.intersects(&deps) => {
                        trace!(?changes, "Re-running live query");
                        break;
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Live query lagged behind change feed");
                        break;
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        }
    })
}

// ==================== Ready-made queries ====================

/// All freezers, ordered
pub fn freezers(store: &Store) -> LiveQuery<(), Vec<Freezer>> {
    LiveQuery::new(store, (), &[Collection::Freezers], |store: Store, ()| async move {
        store.list_freezers().await
    })
}

/// The first freezer by order
pub fn first_freezer(store: &Store) -> LiveQuery<(), Option<Freezer>> {
    LiveQuery::new(store, (), &[Collection::Freezers], |store: Store, ()| async move {
        store.first_freezer().await
    })
}

/// Drawers of a freezer; empty while no freezer is selected
pub fn drawers(store: &Store, freezer_id: Option<String>) -> LiveQuery<Option<String>, Vec<Drawer>> {
    LiveQuery::new(
        store,
        freezer_id,
        &[Collection::Drawers],
        |store: Store, freezer_id: Option<String>| async move {
            store.list_drawers(freezer_id.as_deref()).await
        },
    )
}

/// One drawer by id
pub fn drawer(store: &Store, drawer_id: String) -> LiveQuery<String, Option<Drawer>> {
    LiveQuery::new(
        store,
        drawer_id,
        &[Collection::Drawers],
        |store: Store, drawer_id: String| async move { store.get_drawer(&drawer_id).await },
    )
}

/// Items of a drawer
pub fn items(store: &Store, drawer_id: String) -> LiveQuery<String, Vec<Item>> {
    LiveQuery::new(
        store,
        drawer_id,
        &[Collection::Items],
        |store: Store, drawer_id: String| async move { store.list_items(&drawer_id).await },
    )
}

/// Items of a drawer with expiry counts
pub fn drawer_stats(store: &Store, drawer_id: String) -> LiveQuery<String, DrawerStats> {
    LiveQuery::new(
        store,
        drawer_id,
        &[Collection::Items],
        |store: Store, drawer_id: String| async move { store.drawer_stats(&drawer_id).await },
    )
}

/// All tags
pub fn tags(store: &Store) -> LiveQuery<(), Vec<Tag>> {
    LiveQuery::new(store, (), &[Collection::Tags], |store: Store, ()| async move {
        store.list_tags().await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewItem;
    use crate::seed::{initialize_database, reset_database};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn seeded_store() -> (Store, Vec<Drawer>) {
        let store = Store::open_in_memory().unwrap();
        initialize_database(&store).await.unwrap();
        let freezer = store.first_freezer().await.unwrap().unwrap();
        let drawers = store.list_drawers(Some(&freezer.id)).await.unwrap();
        (store, drawers)
    }

    async fn next_state<T: Clone>(rx: &mut watch::Receiver<LiveState<T>>) -> LiveState<T> {
        timeout(WAIT, rx.changed()).await.unwrap().unwrap();
        let state = rx.borrow_and_update().clone();
        state
    }

    #[tokio::test]
    async fn test_starts_loading_then_ready() {
        let (store, drawers) = seeded_store().await;
        store
            .add_item(NewItem::new(&drawers[0].id, "Erbsen"))
            .await
            .unwrap();

        let live = items(&store, drawers[0].id.clone());
        let mut rx = live.subscribe();
        assert!(rx.borrow_and_update().is_loading());

        let state = next_state(&mut rx).await;
        assert_eq!(state.ready().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reruns_after_dependent_write() {
        let (store, drawers) = seeded_store().await;
        let live = items(&store, drawers[0].id.clone());
        let mut rx = live.subscribe();
        assert_eq!(timeout(WAIT, live.settled()).await.unwrap(), LiveState::Ready(vec![]));
        rx.borrow_and_update();

        let item = store
            .add_item(NewItem::new(&drawers[0].id, "Spinat"))
            .await
            .unwrap();

        assert_eq!(next_state(&mut rx).await, LiveState::Ready(vec![item]));
    }

    #[tokio::test]
    async fn test_ignores_unrelated_collections() {
        let (store, drawers) = seeded_store().await;
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let live = LiveQuery::new(
            &store,
            drawers[0].id.clone(),
            &[Collection::Items],
            move |store: Store, drawer_id: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { store.list_items(&drawer_id).await }
            },
        );
        let mut rx = live.subscribe();
        timeout(WAIT, live.settled()).await.unwrap();
        rx.borrow_and_update();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        store.add_tag("Fisch", "#5AC8FA").await.unwrap();
        store
            .add_item(NewItem::new(&drawers[0].id, "Lachs"))
            .await
            .unwrap();

        // The tags write sits ahead of the items write on the feed
        let state = next_state(&mut rx).await;
        assert_eq!(state.ready().unwrap().len(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_key_switches_drawer() {
        let (store, drawers) = seeded_store().await;
        store
            .add_item(NewItem::new(&drawers[1].id, "Brot"))
            .await
            .unwrap();

        let mut live = items(&store, drawers[0].id.clone());
        assert_eq!(timeout(WAIT, live.settled()).await.unwrap(), LiveState::Ready(vec![]));

        live.set_key(drawers[1].id.clone());
        assert!(live.current().is_loading());
        assert_eq!(live.key(), &drawers[1].id);

        let state = timeout(WAIT, live.settled()).await.unwrap();
        let names: Vec<String> = state.value_or_default().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Brot"]);
    }

    #[tokio::test]
    async fn test_drawer_stats_follow_cascade() {
        let (store, drawers) = seeded_store().await;
        for name in ["a", "b", "c"] {
            store
                .add_item(NewItem::new(&drawers[0].id, name))
                .await
                .unwrap();
        }

        let live = drawer_stats(&store, drawers[0].id.clone());
        let mut rx = live.subscribe();
        let initial = timeout(WAIT, live.settled()).await.unwrap();
        assert_eq!(initial.ready().unwrap().item_count, 3);
        rx.borrow_and_update();

        store.delete_drawer(&drawers[0].id).await.unwrap();

        let state = next_state(&mut rx).await;
        assert_eq!(state.ready().unwrap().item_count, 0);
    }

    #[tokio::test]
    async fn test_reset_refreshes_freezer_and_tags() {
        let (store, _drawers) = seeded_store().await;
        let first = first_freezer(&store);
        let all_tags = tags(&store);
        let before = timeout(WAIT, first.settled()).await.unwrap().value_or_default();
        timeout(WAIT, all_tags.settled()).await.unwrap();
        let mut first_rx = first.subscribe();
        let mut tags_rx = all_tags.subscribe();
        first_rx.borrow_and_update();
        tags_rx.borrow_and_update();

        reset_database(&store).await.unwrap();

        let after = next_state(&mut first_rx).await.value_or_default();
        assert_ne!(after.map(|f| f.id), before.map(|f| f.id));
        assert_eq!(next_state(&mut tags_rx).await.value_or_default().len(), 6);
    }

    #[tokio::test]
    async fn test_drawers_without_freezer_is_empty() {
        let (store, _drawers) = seeded_store().await;
        let live = drawers(&store, None);
        assert_eq!(timeout(WAIT, live.settled()).await.unwrap(), LiveState::Ready(vec![]));
    }

    #[test]
    fn test_value_or_default() {
        assert_eq!(LiveState::<Vec<i32>>::Loading.value_or_default(), Vec::<i32>::new());
        assert_eq!(LiveState::Ready(vec![1]).value_or_default(), vec![1]);
        assert!(LiveState::<Vec<i32>>::Failed("boom".into()).ready().is_none());
    }
}
