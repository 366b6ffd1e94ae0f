//! Module declarations
//!
//! A [`ModuleDecl`] is the caller-authored definition of one module: named
//! state members, computed derivations, methods, and a `started` lifecycle
//! hook. Declarations are assembled through [`ModuleDeclBuilder`], and
//! `build()` enforces the contract that the original dynamic classifier
//! checked at runtime: member names must be unique across all three member
//! kinds and must not use the reserved capability namespace.
//!
//! A value that was not produced by the builder cannot exist, so "must extend
//! the capability base" holds by construction; `started` defaults to a no-op.

use crate::adapter;
use crate::error::{ModuleError, ModuleResult};
use crate::module::ModuleCtx;
use serde_json::Value;
use statemod_reactive::{Computed, ReactiveResult, StateReader, StateWriter};
use std::collections::HashSet;
use std::sync::Arc;

/// A caller-declared method body
pub type MethodFn = Arc<dyn Fn(&ModuleCtx, &[Value]) -> ModuleResult<Value> + Send + Sync>;

/// The `started` lifecycle hook
pub type StartedFn = Arc<dyn Fn(&ModuleCtx) + Send + Sync>;

/// A validated module declaration
pub struct ModuleDecl {
    pub(crate) name: String,
    pub(crate) state: Vec<(String, Value)>,
    pub(crate) computed: Vec<(String, Computed)>,
    pub(crate) methods: Vec<(String, MethodFn)>,
    pub(crate) started: StartedFn,
}

impl ModuleDecl {
    pub fn builder(name: impl Into<String>) -> ModuleDeclBuilder {
        ModuleDeclBuilder {
            name: name.into(),
            state: Vec::new(),
            computed: Vec::new(),
            methods: Vec::new(),
            started: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_count(&self) -> usize {
        self.state.len()
    }

    pub fn computed_count(&self) -> usize {
        self.computed.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// Builder for [`ModuleDecl`]
///
/// Members are recorded in declaration order; order is observable through
/// snapshots and registration.
pub struct ModuleDeclBuilder {
    name: String,
    state: Vec<(String, Value)>,
    computed: Vec<(String, Computed)>,
    methods: Vec<(String, MethodFn)>,
    started: Option<StartedFn>,
}

impl ModuleDeclBuilder {
    /// Declare a state member with its initial value
    pub fn state(mut self, name: impl Into<String>, initial: Value) -> Self {
        self.state.push((name.into(), initial));
        self
    }

    /// Declare a read-only computed member
    pub fn computed<G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
    {
        self.computed.push((name.into(), Computed::getter(get)));
        self
    }

    /// Declare a computed member with a setter
    pub fn computed_with_setter<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
        S: Fn(&StateWriter<'_>, Value) -> ReactiveResult<()> + Send + Sync + 'static,
    {
        self.computed
            .push((name.into(), Computed::with_setter(get, set)));
        self
    }

    /// Declare a method
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&ModuleCtx, &[Value]) -> ModuleResult<Value> + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Arc::new(body)));
        self
    }

    /// Set the `started` lifecycle hook (defaults to a no-op)
    pub fn on_started<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ModuleCtx) + Send + Sync + 'static,
    {
        self.started = Some(Arc::new(hook));
        self
    }

    /// Validate and produce the declaration
    pub fn build(self) -> ModuleResult<ModuleDecl> {
        if self.name.is_empty() {
            return Err(ModuleError::ContractViolation(
                "module name must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let member_names = self
            .state
            .iter()
            .map(|(n, _)| n)
            .chain(self.computed.iter().map(|(n, _)| n))
            .chain(self.methods.iter().map(|(n, _)| n));

        for name in member_names {
            if adapter::is_reserved(name) {
                return Err(ModuleError::ContractViolation(format!(
                    "member name {name:?} is reserved in module {:?}",
                    self.name
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(ModuleError::ContractViolation(format!(
                    "duplicate member name {name:?} in module {:?}",
                    self.name
                )));
            }
        }

        Ok(ModuleDecl {
            name: self.name,
            state: self.state,
            computed: self.computed,
            methods: self.methods,
            started: self.started.unwrap_or_else(|| Arc::new(|_| {})),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_produces_declaration() {
        let decl = ModuleDecl::builder("session")
            .state("user", json!(null))
            .state("attempts", json!(0))
            .computed("signed_in", |s| json!(!s.get("user").is_null()))
            .method("reset", |ctx, _| {
                ctx.module().set("attempts", 0)?;
                Ok(json!(null))
            })
            .build()
            .unwrap();

        assert_eq!(decl.name(), "session");
        assert_eq!(decl.state_count(), 2);
        assert_eq!(decl.computed_count(), 1);
        assert_eq!(decl.method_count(), 1);
    }

    #[test]
    fn test_empty_module_name_is_contract_violation() {
        let result = ModuleDecl::builder("").build();
        assert!(matches!(result, Err(ModuleError::ContractViolation(_))));
    }

    #[test]
    fn test_duplicate_member_across_kinds_is_contract_violation() {
        let result = ModuleDecl::builder("m")
            .state("value", json!(1))
            .computed("value", |_| json!(0))
            .build();
        assert!(matches!(result, Err(ModuleError::ContractViolation(_))));
    }

    #[test]
    fn test_reserved_member_name_is_contract_violation() {
        let result = ModuleDecl::builder("m")
            .state("$watch", json!(1))
            .build();
        assert!(matches!(result, Err(ModuleError::ContractViolation(_))));

        let result = ModuleDecl::builder("m").state("", json!(1)).build();
        assert!(matches!(result, Err(ModuleError::ContractViolation(_))));
    }

    #[test]
    fn test_started_defaults_to_noop() {
        let decl = ModuleDecl::builder("quiet").build().unwrap();
        assert_eq!(decl.name(), "quiet");
    }
}
