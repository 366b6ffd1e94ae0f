//! Module interfaces
//!
//! [`ModuleHandle`] is the public object returned in place of a raw
//! declaration: every state and computed member is read and written through
//! the module's private reactive store (never through any non-reactive copy
//! of the initial values), methods run against the live interface, and the
//! cross-cutting capabilities (watch, sample/revert, commit log, events)
//! close over the same store.
//!
//! One handle wraps exactly one reactive instance; the pairing is fixed for
//! the handle's lifetime.

use crate::adapter;
use crate::decl::{MethodFn, ModuleDecl, StartedFn};
use crate::error::{member_error, ModuleError, ModuleResult};
use crate::registry::Registry;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use statemod_reactive::{
    Engine, EventDisposer, ReactiveHandle, StateReader, WatchDisposer, WatchOptions,
};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct ModuleInner {
    name: String,
    store: ReactiveHandle,
    state_keys: Vec<String>,
    methods: HashMap<String, MethodFn>,
    started: StartedFn,
    commits: Mutex<Vec<Value>>,
    registry: OnceCell<Registry>,
}

/// Public interface to one registered module
///
/// Cheaply clonable; all clones address the same store and commit log.
#[derive(Clone)]
pub struct ModuleHandle {
    inner: Arc<ModuleInner>,
}

/// Build the interface for a validated declaration
///
/// Allocates exactly one reactive instance, seeded with the declaration's
/// state members and computed set. Nothing is created lazily.
pub(crate) fn build_module(decl: ModuleDecl, engine: &Engine) -> ModuleHandle {
    let name = decl.name;
    let state_keys: Vec<String> = decl.state.iter().map(|(k, _)| k.clone()).collect();
    let store = engine.create_instance(adapter::instance_config(decl.state, decl.computed));

    tracing::debug!(module = %name, instance = store.id(), "built module interface");

    ModuleHandle {
        inner: Arc::new(ModuleInner {
            name,
            store,
            state_keys,
            methods: decl.methods.into_iter().collect(),
            started: decl.started,
            commits: Mutex::new(Vec::new()),
            registry: OnceCell::new(),
        }),
    }
}

impl ModuleHandle {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// State member names in declaration order
    pub fn state_members(&self) -> &[String] {
        &self.inner.state_keys
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.inner.store.has(name) || self.inner.methods.contains_key(name)
    }

    /// The registry this module was registered under, once registration
    /// has completed
    pub fn registry(&self) -> Option<Registry> {
        self.inner.registry.get().cloned()
    }

    // ===== State and computed access =====

    /// Read a state or computed member
    pub fn get(&self, name: &str) -> ModuleResult<Value> {
        self.inner.store.get_value(name).map_err(member_error)
    }

    /// Typed read through serde
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ModuleResult<T> {
        self.inner.store.get(name).map_err(member_error)
    }

    /// Write a state member, or a computed member with a setter
    pub fn set_value(&self, name: &str, value: Value) -> ModuleResult<()> {
        self.inner.store.set_value(name, value).map_err(member_error)
    }

    /// Typed write through serde
    pub fn set<T: Serialize>(&self, name: &str, value: T) -> ModuleResult<()> {
        self.inner.store.set(name, value).map_err(member_error)
    }

    // ===== Methods =====

    /// Invoke a declared method
    ///
    /// The method body receives a [`ModuleCtx`] whose state reads observe the
    /// live store, so a method reading its "own" fields always sees reactive
    /// values.
    pub fn call(&self, name: &str, args: &[Value]) -> ModuleResult<Value> {
        let method = self
            .inner
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::UnknownMember(name.to_string()))?;
        let ctx = ModuleCtx::new(self.clone());
        method(&ctx, args)
    }

    // ===== Watch =====

    /// Subscribe to the value produced by `getter`; see
    /// [`WatchOptions`] for change detection semantics
    pub fn watch<G, C>(&self, getter: G, callback: C, options: WatchOptions) -> WatchDisposer
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
        C: FnMut(&Value, &Value) + Send + 'static,
    {
        self.inner.store.watch(getter, callback, options)
    }

    // ===== Sample / revert =====

    /// Detached copy of all state members, keyed by member name
    pub fn sample(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in self.inner.store.snapshot_state() {
            map.insert(key, value);
        }
        Value::Object(map)
    }

    /// Overwrite every state member from a sample
    ///
    /// Members absent from the sample become null. Fails with
    /// [`ModuleError::InvalidSample`] (state untouched) when the sample is
    /// not object-shaped. Computed members are derived, never restored.
    pub fn revert(&self, sample: &Value) -> ModuleResult<()> {
        let map = sample.as_object().ok_or(ModuleError::InvalidSample)?;
        for key in &self.inner.state_keys {
            let value = map.get(key).cloned().unwrap_or(Value::Null);
            self.inner.store.set_value(key, value).map_err(member_error)?;
        }
        Ok(())
    }

    // ===== Commit log =====

    /// Append the current state to the commit log; returns its index
    ///
    /// The log is append-only and never pruned; memory grows with commit
    /// count.
    pub fn commit(&self) -> usize {
        let snapshot = self.sample();
        let mut log = self.inner.commits.lock();
        log.push(snapshot);
        log.len() - 1
    }

    /// Restore state from a commit log entry
    pub fn revert_to(&self, index: usize) -> ModuleResult<()> {
        let snapshot = {
            let log = self.inner.commits.lock();
            log.get(index).cloned()
        }
        .ok_or(ModuleError::CommitNotFound(index))?;
        self.revert(&snapshot)
    }

    pub fn commit_count(&self) -> usize {
        self.inner.commits.lock().len()
    }

    // ===== Events =====

    /// Subscribe to a module-scoped event
    pub fn on<F>(&self, event: &str, callback: F) -> EventDisposer
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.store.on(event, callback)
    }

    /// Remove one event subscription by id
    pub fn off(&self, event: &str, id: u64) {
        self.inner.store.off(event, id);
    }

    /// Emit a module-scoped event, invoking subscribers synchronously in
    /// subscription order
    pub fn emit(&self, event: &str, args: &[Value]) {
        self.inner.store.emit(event, args);
    }

    // ===== Internal =====

    pub(crate) fn store(&self) -> &ReactiveHandle {
        &self.inner.store
    }

    pub(crate) fn install_registry(&self, registry: Registry) {
        // A handle belongs to exactly one batch; a second set can't happen.
        let _ = self.inner.registry.set(registry);
    }

    pub(crate) fn run_started(&self) {
        tracing::debug!(module = %self.inner.name, "running started hook");
        let started = self.inner.started.clone();
        let ctx = ModuleCtx::new(self.clone());
        started(&ctx);
    }
}

/// Context handed to method bodies and `started` hooks
///
/// Reads and writes through the context observe the module's live store; the
/// registry becomes reachable once the whole batch has been published, which
/// is guaranteed by the time any `started` hook runs.
pub struct ModuleCtx {
    handle: ModuleHandle,
}

impl ModuleCtx {
    pub(crate) fn new(handle: ModuleHandle) -> Self {
        Self { handle }
    }

    /// The module this context belongs to
    pub fn module(&self) -> &ModuleHandle {
        &self.handle
    }

    /// The registry, once the registration batch has been published
    pub fn registry(&self) -> Option<Registry> {
        self.handle.registry()
    }

    pub fn get(&self, name: &str) -> ModuleResult<Value> {
        self.handle.get(name)
    }

    pub fn set<T: Serialize>(&self, name: &str, value: T) -> ModuleResult<()> {
        self.handle.set(name, value)
    }
}
