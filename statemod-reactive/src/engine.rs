//! Engine entry point
//!
//! The [`Engine`] is the factory for reactive instances. Consumers hold it as
//! an explicit value and thread it to whatever layer creates instances; there
//! is no process-global engine.

use crate::instance::{InstanceConfig, ReactiveHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Factory for reactive instances
///
/// Cheaply clonable; clones share the instance id counter.
#[derive(Clone)]
pub struct Engine {
    next_instance_id: Arc<AtomicU64>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            next_instance_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create one reactive instance from a config
    pub fn create_instance(&self, config: InstanceConfig) -> ReactiveHandle {
        let id = self.next_instance_id.fetch_add(1, Ordering::SeqCst);
        ReactiveHandle::with_id(id, config)
    }

    /// Number of instances this engine has created
    pub fn instances_created(&self) -> u64 {
        self.next_instance_id.load(Ordering::SeqCst).saturating_sub(1)
    }
}
