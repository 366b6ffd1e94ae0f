//! Statemod Core - reactive module definitions
//!
//! This crate turns plain module declarations into live, observable state
//! containers backed by the `statemod-reactive` engine. A caller declares a
//! unit of state and behavior once (state fields, computed accessors,
//! methods, a `started` hook) and receives a [`ModuleHandle`] whose fields
//! are reactive, whose computed members recompute automatically, and which
//! carries the cross-cutting capabilities:
//!
//! - **watch**: dependency-tracked change subscriptions
//! - **wait_for**: a one-shot future resolving on the first satisfying change
//! - **sample / revert**: detached snapshots and explicit restore
//! - **commit / revert_to**: append-only snapshot log
//! - **on / off / emit**: synchronous module-scoped events
//!
//! ## Registration
//!
//! Declarations are registered as one batch through a [`ModuleHost`] carrying
//! an installed engine. Registration is two-pass: every interface is built
//! and published before any `started` hook runs, so hooks may read sibling
//! modules through the [`Registry`]. The registry is an explicit handle, not
//! process-global state.
//!
//! ## Example
//!
//! ```rust
//! use statemod_core::{ModuleDecl, ModuleHost};
//! use statemod_reactive::Engine;
//! use serde_json::json;
//!
//! let counter = ModuleDecl::builder("counter")
//!     .state("count", json!(0))
//!     .computed("doubled", |s| json!(s.get("count").as_i64().unwrap_or(0) * 2))
//!     .method("increment", |ctx, _args| {
//!         let next = ctx.module().get_as::<i64>("count")? + 1;
//!         ctx.set("count", next)?;
//!         Ok(json!(next))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut host = ModuleHost::with_engine(Engine::new());
//! let registry = host.register(vec![counter]).unwrap();
//!
//! let counter = registry.get("counter").unwrap();
//! counter.call("increment", &[]).unwrap();
//! assert_eq!(counter.get("doubled").unwrap(), json!(2));
//! ```
//!
//! ## Errors
//!
//! Everything fails synchronously at the call site with a [`ModuleError`]:
//! contract violations at declaration build time, `NotInstalled` when
//! registering without an engine, `InvalidSample`/`CommitNotFound` on bad
//! reverts. The single accepted no-op is a missing devtools root.

pub mod adapter;
pub mod decl;
pub mod devtools;
pub mod error;
pub mod module;
pub mod registry;
pub mod wait;

pub use decl::{MethodFn, ModuleDecl, ModuleDeclBuilder, StartedFn};
pub use devtools::DevtoolsRoot;
pub use error::{ModuleError, ModuleResult};
pub use module::{ModuleCtx, ModuleHandle};
pub use registry::{ModuleHost, Registry};
pub use wait::WaitFor;

// Re-export the engine surface consumers need alongside module handles.
pub use statemod_reactive::{
    Engine, EventDisposer, StateReader, StateWriter, WatchDisposer, WatchOptions,
};
