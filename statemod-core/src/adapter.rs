//! Reactive store adapter
//!
//! Thin translation from classified declaration members to the reactive
//! engine's instance config. Member names carry over unchanged: state and
//! computed members land in disjoint engine tables, so the deterministic
//! name transform is identity-into-namespace, and the `$` prefix is reserved
//! at declaration time so capability operations can never collide with a
//! member name. The module layer touches the engine only through this
//! surface plus the watch/event primitives re-exported from it.

use serde_json::Value;
use statemod_reactive::{Computed, InstanceConfig};

/// Prefix reserved for capability operations on the interface surface
pub const RESERVED_PREFIX: char = '$';

/// Whether a member name is unusable on a module interface
pub(crate) fn is_reserved(name: &str) -> bool {
    name.is_empty() || name.starts_with(RESERVED_PREFIX)
}

/// Build the engine config for one module's store
pub(crate) fn instance_config(
    state: Vec<(String, Value)>,
    computed: Vec<(String, Computed)>,
) -> InstanceConfig {
    InstanceConfig {
        data: state,
        computed,
    }
}
