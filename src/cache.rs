use crate::LoadError;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

/// The slot a waiter watches. `None` until the window holding the key has
/// been flushed.
pub(crate) type Settled<V> = Option<Result<V, LoadError>>;

enum CacheState<V> {
    /// The key is in an open or in-flight window. `entry_id` tells apart two
    /// windows holding the same key after a `clear`.
    Pending {
        entry_id: u64,
        result_rx: watch::Receiver<Settled<V>>,
        gate: Arc<WindowGate>,
    },
    Loaded(V),
}

/// Holds a window's flush back until one of its waiters has been suspended
/// by the task awaiting it. A task can only be polled again after its current
/// poll has returned, so every key that task registers on its way to the
/// suspension point is already in the window when the gate opens.
#[derive(Debug, Default)]
pub(crate) struct WindowGate {
    open: AtomicBool,
    notify: Notify,
}

impl WindowGate {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn open(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            // `notify_one` keeps a permit if the flush isn't waiting yet.
            self.notify.notify_one();
        }
    }

    pub(crate) async fn opened(&self) {
        if !self.is_open() {
            self.notify.notified().await;
        }
    }
}

/// A waiter's handle on its window's gate. Dropping it opens the gate, so a
/// window whose waiters are all abandoned still gets flushed.
pub(crate) struct GateOpener(Arc<WindowGate>);

impl GateOpener {
    async fn open_after_suspend(&self) {
        if self.0.is_open() {
            return;
        }

        // Suspends the calling task once; the gate opens when it is polled
        // again.
        tokio::task::yield_now().await;
        self.0.open();
    }
}

impl Drop for GateOpener {
    fn drop(&mut self) {
        self.0.open();
    }
}

pub(crate) struct WindowEntry<K, V> {
    key: K,
    entry_id: u64,
    result_tx: watch::Sender<Settled<V>>,
}

/// Keys registered between two flush boundaries, in registration order.
pub(crate) struct Window<K, V> {
    entries: Vec<WindowEntry<K, V>>,
}

impl<K, V> Window<K, V>
where
    K: Clone + Hash + Eq,
{
    /// The window's keys with duplicates removed, keeping first occurrences.
    pub(crate) fn unique_keys(&self) -> Vec<K> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut keys = vec![];
        for entry in &self.entries {
            if seen.insert(&entry.key) {
                keys.push(entry.key.clone());
            }
        }
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) enum Lookup<V> {
    Hit(V),
    Joined {
        result_rx: watch::Receiver<Settled<V>>,
        gate: Arc<WindowGate>,
    },
    Queued {
        result_rx: watch::Receiver<Settled<V>>,
        gate: Arc<WindowGate>,
        opens_window: bool,
    },
}

/// The cache and the open window of one loader. Both live behind the same
/// lock so that "check the cache, then queue the key" is a single step.
pub(crate) struct LoaderState<K, V> {
    entries: HashMap<K, CacheState<V>>,
    window: Vec<WindowEntry<K, V>>,
    window_gate: Arc<WindowGate>,
    next_entry_id: u64,
    caching: bool,
}

impl<K, V> LoaderState<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub(crate) fn new(caching: bool) -> Self {
        LoaderState {
            entries: HashMap::new(),
            window: vec![],
            window_gate: Arc::default(),
            next_entry_id: 0,
            caching,
        }
    }

    pub(crate) fn lookup(&mut self, key: K) -> Lookup<V> {
        match self.entries.get(&key) {
            Some(CacheState::Loaded(value)) => return Lookup::Hit(value.clone()),
            // A closed channel means the flush for that window was dropped
            // without settling, so queue the key again instead of joining it.
            Some(CacheState::Pending {
                result_rx, gate, ..
            }) if result_rx.has_changed().is_ok() => {
                return Lookup::Joined {
                    result_rx: result_rx.clone(),
                    gate: gate.clone(),
                };
            }
            _ => {}
        }

        let entry_id = self.next_entry_id;
        self.next_entry_id += 1;

        let (result_tx, result_rx) = watch::channel(None);
        let gate = self.window_gate.clone();
        self.entries.insert(
            key.clone(),
            CacheState::Pending {
                entry_id,
                result_rx: result_rx.clone(),
                gate: gate.clone(),
            },
        );

        let opens_window = self.window.is_empty();
        self.window.push(WindowEntry {
            key,
            entry_id,
            result_tx,
        });

        Lookup::Queued {
            result_rx,
            gate,
            opens_window,
        }
    }

    /// Close the open window. Keys registered from now on go into a new
    /// window with its own gate.
    pub(crate) fn take_window(&mut self) -> Window<K, V> {
        self.window_gate = Arc::default();
        Window {
            entries: std::mem::take(&mut self.window),
        }
    }

    /// Hands `result` (aligned with `keys`) to every window entry for those
    /// keys. Successful values are cached unless the entry was cleared or
    /// replaced in the meantime; failures are never cached.
    pub(crate) fn settle(
        &mut self,
        window: &Window<K, V>,
        keys: &[K],
        result: Result<Vec<V>, LoadError>,
    ) {
        let results: HashMap<&K, Result<V, LoadError>> = match result {
            Ok(values) => keys.iter().zip(values).map(|(key, value)| (key, Ok(value))).collect(),
            Err(error) => keys.iter().map(|key| (key, Err(error.clone()))).collect(),
        };

        for entry in &window.entries {
            let Some(result) = results.get(&entry.key) else {
                continue;
            };

            self.store(entry, result);
            entry.result_tx.send_replace(Some(result.clone()));
        }
    }

    fn store(&mut self, entry: &WindowEntry<K, V>, result: &Result<V, LoadError>) {
        let is_current = matches!(
            self.entries.get(&entry.key),
            Some(CacheState::Pending { entry_id, .. }) if *entry_id == entry.entry_id
        );
        if !is_current {
            return;
        }

        match result {
            Ok(value) if self.caching => {
                self.entries
                    .insert(entry.key.clone(), CacheState::Loaded(value.clone()));
            }
            _ => {
                self.entries.remove(&entry.key);
            }
        }
    }

    pub(crate) fn clear(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub(crate) fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn prime(&mut self, key: K, value: V, force: bool) -> bool {
        if !self.caching {
            return false;
        }

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if force {
                    occupied.insert(CacheState::Loaded(value));
                }
                force
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheState::Loaded(value));
                true
            }
        }
    }
}

/// What a caller waits on after registering a key.
pub(crate) enum PendingLoad<V> {
    Ready(Result<V, LoadError>),
    Waiting {
        result_rx: watch::Receiver<Settled<V>>,
        gate: GateOpener,
    },
}

impl<V> PendingLoad<V>
where
    V: Clone,
{
    pub(crate) fn waiting(result_rx: watch::Receiver<Settled<V>>, gate: Arc<WindowGate>) -> Self {
        PendingLoad::Waiting {
            result_rx,
            gate: GateOpener(gate),
        }
    }

    pub(crate) async fn wait(self) -> Result<V, LoadError> {
        match self {
            PendingLoad::Ready(result) => result,
            PendingLoad::Waiting {
                mut result_rx,
                gate,
            } => {
                gate.open_after_suspend().await;
                drop(gate);

                let settled = result_rx
                    .wait_for(Option::is_some)
                    .await
                    .map_err(|_| LoadError::Cancelled)?;
                let result = match &*settled {
                    Some(result) => result.clone(),
                    None => Err(LoadError::Cancelled),
                };
                result
            }
        }
    }
}
