//! Statemod Reactive - observable state instances for the module layer
//!
//! This crate provides the reactivity engine that `statemod-core` builds
//! module interfaces on top of. It includes:
//!
//! - **Reactive instances**: a named-value store seeded from a config of
//!   state members and computed derivations
//! - **Dependency-tracked watch**: subscriptions whose getters are evaluated
//!   under a tracking reader, re-fired when a tracked key is written
//! - **Event bus**: synchronous per-instance publish/subscribe
//!
//! ## Model
//!
//! One instance per consumer-facing module, created eagerly through the
//! [`Engine`] factory. Reads and writes go through a [`ReactiveHandle`]:
//! writes take effect immediately and flush affected watchers synchronously,
//! in registration order; computed members recompute on every read and can
//! never go stale.
//!
//! Everything here is push-driven and single-flush: there is no background
//! scheduler, no polling, and no implicit subscription cleanup. Watch and
//! event subscriptions are released only through the disposers they return.
//!
//! ## Example
//!
//! ```rust
//! use statemod_reactive::{Computed, Engine, InstanceConfig, WatchOptions};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let handle = engine.create_instance(InstanceConfig {
//!     data: vec![("count".to_string(), json!(0))],
//!     computed: vec![(
//!         "doubled".to_string(),
//!         Computed::getter(|s| json!(s.get("count").as_i64().unwrap_or(0) * 2)),
//!     )],
//! });
//!
//! handle.set("count", 21).unwrap();
//! assert_eq!(handle.get_value("doubled").unwrap(), json!(42));
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod instance;

pub use engine::Engine;
pub use error::{ReactiveError, ReactiveResult};
pub use events::{EventBus, EventCallback, EventDisposer, SubscriberId};
pub use instance::{
    Computed, ComputedGetter, ComputedSetter, InstanceConfig, ReactiveHandle, StateReader,
    StateWriter, WatchCallback, WatchDisposer, WatchGetter, WatchOptions,
};
