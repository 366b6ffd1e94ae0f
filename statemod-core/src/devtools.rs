//! Devtools introspection hook
//!
//! External tooling can observe each module's store by installing a root on
//! the host before registration. Attachment is purely observational; a host
//! without a root skips it silently.

use serde_json::Value;

/// Introspection tree modules are attached under at registration time
pub trait DevtoolsRoot: Send + Sync {
    /// Called once per module, in declaration order, with an ordered copy of
    /// its initial state members
    fn attach(&self, module: &str, state: Vec<(String, Value)>);
}
