//! Reactive state instances
//!
//! A [`ReactiveHandle`] wraps one observable container holding a set of named
//! state values plus a set of computed derivations over them. Reads and writes
//! go through the handle; every write schedules the watchers whose tracked
//! dependency set covers the written key and flushes them synchronously, in
//! registration order.
//!
//! Computed values are recomputed on every read, so a computed member can
//! never be stale with respect to the state it derives from.

use crate::error::{ReactiveError, ReactiveResult};
use crate::events::{EventBus, EventDisposer};
use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Getter for a computed member or a watcher; reads state through the tracking reader
pub type ComputedGetter = Arc<dyn Fn(&StateReader<'_>) -> Value + Send + Sync>;

/// Setter for a writable computed member
pub type ComputedSetter =
    Arc<dyn Fn(&StateWriter<'_>, Value) -> ReactiveResult<()> + Send + Sync>;

/// Getter evaluated under dependency tracking for a watcher
pub type WatchGetter = Arc<dyn Fn(&StateReader<'_>) -> Value + Send + Sync>;

/// Watcher callback, invoked with (new, old)
pub type WatchCallback = Box<dyn FnMut(&Value, &Value) + Send>;

/// A computed member: a derivation getter and an optional setter
#[derive(Clone)]
pub struct Computed {
    pub get: ComputedGetter,
    pub set: Option<ComputedSetter>,
}

impl Computed {
    pub fn getter<G>(get: G) -> Self
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: None,
        }
    }

    pub fn with_setter<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
        S: Fn(&StateWriter<'_>, Value) -> ReactiveResult<()> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Some(Arc::new(set)),
        }
    }
}

/// Configuration for one reactive instance
///
/// `data` seeds the state table in declaration order; `computed` installs the
/// derivation set. Key uniqueness across both tables is the caller's
/// responsibility (the module layer validates it before instances exist).
#[derive(Default)]
pub struct InstanceConfig {
    pub data: Vec<(String, Value)>,
    pub computed: Vec<(String, Computed)>,
}

/// Options for a watch subscription
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Traverse nested structure for change detection: compare old and new
    /// values structurally and fire only on a real change. When false,
    /// container values (objects, arrays) fire on every reassignment of a
    /// tracked dependency.
    pub deep: bool,
}

/// Read access to state with dependency tracking
///
/// Every key read through the reader is recorded; a watcher's dependency set
/// is whatever its getter touched on the most recent evaluation. Reads of a
/// computed member re-enter its getter with the same reader, so transitive
/// state dependencies are tracked as well.
pub struct StateReader<'a> {
    values: &'a HashMap<String, Value>,
    computed: &'a HashMap<String, Computed>,
    touched: RefCell<HashSet<String>>,
}

impl StateReader<'_> {
    /// Read a state or computed member; missing keys read as null
    pub fn get(&self, key: &str) -> Value {
        if let Some(c) = self.computed.get(key) {
            return (c.get)(self);
        }
        self.touched.borrow_mut().insert(key.to_string());
        self.values.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Typed read; `None` when the value does not deserialize to `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        serde_json::from_value(self.get(key)).ok()
    }

    pub fn has(&self, key: &str) -> bool {
        self.computed.contains_key(key) || self.values.contains_key(key)
    }
}

/// Write access handed to computed setters
pub struct StateWriter<'a> {
    handle: &'a ReactiveHandle,
}

impl StateWriter<'_> {
    pub fn get(&self, key: &str) -> ReactiveResult<Value> {
        self.handle.get_value(key)
    }

    pub fn set(&self, key: &str, value: Value) -> ReactiveResult<()> {
        self.handle.set_value(key, value)
    }
}

struct StateTable {
    order: Vec<String>,
    values: HashMap<String, Value>,
}

struct WatcherEntry {
    id: u64,
    active: Arc<AtomicBool>,
    deep: bool,
    deps: HashSet<String>,
    getter: WatchGetter,
    cell: Arc<Mutex<WatchCell>>,
}

struct WatchCell {
    last: Value,
    callback: WatchCallback,
}

#[derive(Default)]
struct WatcherTable {
    entries: Vec<WatcherEntry>,
    next_id: u64,
    pending: VecDeque<u64>,
    flushing: bool,
}

struct Inner {
    id: u64,
    state: RwLock<StateTable>,
    computed: HashMap<String, Computed>,
    watchers: Mutex<WatcherTable>,
    events: EventBus,
}

/// Handle to one reactive instance
///
/// Cheaply clonable; all clones address the same store. Instances are created
/// eagerly and never torn down; watcher and event subscriptions are released
/// only through their disposers.
#[derive(Clone)]
pub struct ReactiveHandle {
    inner: Arc<Inner>,
}

impl ReactiveHandle {
    /// Create a standalone instance (id 0); prefer `Engine::create_instance`
    pub fn new(config: InstanceConfig) -> Self {
        Self::with_id(0, config)
    }

    pub(crate) fn with_id(id: u64, config: InstanceConfig) -> Self {
        let mut order = Vec::with_capacity(config.data.len());
        let mut values = HashMap::with_capacity(config.data.len());
        for (key, initial) in config.data {
            if !values.contains_key(&key) {
                order.push(key.clone());
            }
            values.insert(key, initial);
        }

        let computed: HashMap<String, Computed> = config.computed.into_iter().collect();

        tracing::debug!(
            instance = id,
            states = order.len(),
            computeds = computed.len(),
            "created reactive instance"
        );

        Self {
            inner: Arc::new(Inner {
                id,
                state: RwLock::new(StateTable { order, values }),
                computed,
                watchers: Mutex::new(WatcherTable::default()),
                events: EventBus::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.computed.contains_key(key) || self.inner.state.read().values.contains_key(key)
    }

    /// State member names in declaration order
    pub fn state_keys(&self) -> Vec<String> {
        self.inner.state.read().order.clone()
    }

    /// Ordered copy of all state members; detached from the live store
    pub fn snapshot_state(&self) -> Vec<(String, Value)> {
        let state = self.inner.state.read();
        state
            .order
            .iter()
            .map(|k| (k.clone(), state.values.get(k).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    /// Read a state or computed member
    pub fn get_value(&self, key: &str) -> ReactiveResult<Value> {
        if let Some(c) = self.inner.computed.get(key) {
            let state = self.inner.state.read();
            let reader = StateReader {
                values: &state.values,
                computed: &self.inner.computed,
                touched: RefCell::new(HashSet::new()),
            };
            return Ok((c.get)(&reader));
        }

        let state = self.inner.state.read();
        state
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| ReactiveError::UnknownKey(key.to_string()))
    }

    /// Typed read through serde
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ReactiveResult<T> {
        serde_json::from_value(self.get_value(key)?)
            .map_err(|e| ReactiveError::Serialization(e.to_string()))
    }

    /// Write a state member or route through a computed setter
    ///
    /// The write takes effect immediately; affected watchers are flushed
    /// synchronously before this call returns.
    pub fn set_value(&self, key: &str, value: Value) -> ReactiveResult<()> {
        if let Some(c) = self.inner.computed.get(key) {
            let setter = c
                .set
                .as_ref()
                .ok_or_else(|| ReactiveError::ReadOnlyComputed(key.to_string()))?;
            let writer = StateWriter { handle: self };
            return setter(&writer, value);
        }

        {
            let mut state = self.inner.state.write();
            let slot = state
                .values
                .get_mut(key)
                .ok_or_else(|| ReactiveError::UnknownKey(key.to_string()))?;
            *slot = value;
        }

        self.notify_key(key);
        Ok(())
    }

    /// Typed write through serde
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> ReactiveResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| ReactiveError::Serialization(e.to_string()))?;
        self.set_value(key, value)
    }

    /// Subscribe a watcher to the value produced by `getter`
    ///
    /// The getter is evaluated once immediately (without firing the callback)
    /// to seed its dependency set and last-seen value. The callback fires with
    /// `(new, old)` on subsequent changes; see [`WatchOptions`] for the change
    /// detection policy.
    pub fn watch<G, C>(&self, getter: G, callback: C, options: WatchOptions) -> WatchDisposer
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
        C: FnMut(&Value, &Value) + Send + 'static,
    {
        let getter: WatchGetter = Arc::new(getter);
        let (initial, deps) = self.evaluate(&getter);
        let active = Arc::new(AtomicBool::new(true));

        let mut table = self.inner.watchers.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push(WatcherEntry {
            id,
            active: active.clone(),
            deep: options.deep,
            deps,
            getter,
            cell: Arc::new(Mutex::new(WatchCell {
                last: initial,
                callback: Box::new(callback),
            })),
        });
        drop(table);

        WatchDisposer {
            id,
            active,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to this instance's event bus
    pub fn on<F>(&self, event: &str, callback: F) -> EventDisposer
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.events.on(event, Arc::new(callback))
    }

    /// Remove one event subscription by id
    pub fn off(&self, event: &str, id: u64) {
        self.inner.events.off(event, id);
    }

    /// Emit an event to all current subscribers, synchronously
    pub fn emit(&self, event: &str, args: &[Value]) {
        self.inner.events.emit(event, args);
    }

    pub fn event_subscriber_count(&self, event: &str) -> usize {
        self.inner.events.subscriber_count(event)
    }

    fn evaluate(&self, getter: &WatchGetter) -> (Value, HashSet<String>) {
        let state = self.inner.state.read();
        let reader = StateReader {
            values: &state.values,
            computed: &self.inner.computed,
            touched: RefCell::new(HashSet::new()),
        };
        let value = getter(&reader);
        let deps = reader.touched.into_inner();
        (value, deps)
    }

    fn notify_key(&self, key: &str) {
        let run_flush = {
            let mut table = self.inner.watchers.lock();
            let WatcherTable {
                entries,
                pending,
                flushing,
                ..
            } = &mut *table;

            for entry in entries.iter() {
                if entry.active.load(Ordering::SeqCst)
                    && entry.deps.contains(key)
                    && !pending.contains(&entry.id)
                {
                    pending.push_back(entry.id);
                }
            }

            if *flushing {
                // A flush higher on the stack will drain what we queued.
                false
            } else {
                *flushing = true;
                true
            }
        };

        if !run_flush {
            return;
        }

        loop {
            let next = {
                let mut table = self.inner.watchers.lock();
                match table.pending.pop_front() {
                    Some(id) => Some(id),
                    None => {
                        table.flushing = false;
                        None
                    }
                }
            };
            match next {
                Some(id) => self.run_watcher(id),
                None => break,
            }
        }
    }

    fn run_watcher(&self, id: u64) {
        let (getter, deep, active, cell) = {
            let table = self.inner.watchers.lock();
            match table.entries.iter().find(|e| e.id == id) {
                Some(e) => (e.getter.clone(), e.deep, e.active.clone(), e.cell.clone()),
                None => return,
            }
        };

        if !active.load(Ordering::SeqCst) {
            return;
        }

        let (new, deps) = self.evaluate(&getter);

        {
            let mut table = self.inner.watchers.lock();
            if let Some(entry) = table.entries.iter_mut().find(|e| e.id == id) {
                entry.deps = deps;
            }
        }

        let mut cell = cell.lock();
        if value_changed(&cell.last, &new, deep) {
            let old = std::mem::replace(&mut cell.last, new.clone());
            (cell.callback)(&new, &old);
        } else {
            cell.last = new;
        }
    }
}

/// Disposer returned by [`ReactiveHandle::watch`]
///
/// Detaches exactly that watcher. Safe to invoke from inside a watch callback.
/// There is no implicit disposal on drop.
pub struct WatchDisposer {
    id: u64,
    active: Arc<AtomicBool>,
    inner: Weak<Inner>,
}

impl WatchDisposer {
    pub fn dispose(self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(inner) = self.inner.upgrade() {
            let mut table = inner.watchers.lock();
            table.entries.retain(|e| e.id != self.id);
        }
    }
}

fn value_changed(old: &Value, new: &Value, deep: bool) -> bool {
    if deep {
        return old != new;
    }
    if is_container(old) || is_container(new) {
        return true;
    }
    old != new
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
