//! Module host and registry
//!
//! The [`ModuleHost`] is the bootstrap entry point: it carries the installed
//! reactivity engine (and optionally a devtools root) and registers one batch
//! of module declarations. Registration is two-pass: every interface is built
//! and published before any `started` hook runs, so a hook may freely read
//! sibling modules through the registry.
//!
//! The resulting [`Registry`] is an explicit handle callers thread through
//! their code; there is no process-global module table.

use crate::decl::ModuleDecl;
use crate::devtools::DevtoolsRoot;
use crate::error::{ModuleError, ModuleResult};
use crate::module::{build_module, ModuleHandle};
use statemod_reactive::Engine;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Bootstrap host for one module batch
pub struct ModuleHost {
    engine: Option<Engine>,
    devtools: Option<Arc<dyn DevtoolsRoot>>,
    registered: bool,
}

impl ModuleHost {
    /// A host with no engine installed; registration fails with
    /// [`ModuleError::NotInstalled`] until [`install`](Self::install) is
    /// called
    pub fn new() -> Self {
        Self {
            engine: None,
            devtools: None,
            registered: false,
        }
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: Some(engine),
            devtools: None,
            registered: false,
        }
    }

    /// Supply the reactivity engine; must happen before registration
    pub fn install(&mut self, engine: Engine) {
        self.engine = Some(engine);
    }

    pub fn is_installed(&self) -> bool {
        self.engine.is_some()
    }

    /// Install an optional devtools root; absence is never an error
    pub fn set_devtools(&mut self, root: Arc<dyn DevtoolsRoot>) {
        self.devtools = Some(root);
    }

    /// Register one batch of declarations
    ///
    /// Builds every interface first, publishes them all at once, then runs
    /// `started` hooks in declaration order. A failing precondition aborts
    /// the whole batch before anything is published; a half-registered batch
    /// can never be observed. A host accepts exactly one batch.
    pub fn register(&mut self, decls: Vec<ModuleDecl>) -> ModuleResult<Registry> {
        let engine = self.engine.as_ref().ok_or(ModuleError::NotInstalled)?;
        if self.registered {
            return Err(ModuleError::AlreadyRegistered);
        }

        let mut names = HashSet::new();
        for decl in &decls {
            if !names.insert(decl.name().to_string()) {
                return Err(ModuleError::DuplicateModule(decl.name().to_string()));
            }
        }

        tracing::info!(modules = decls.len(), "registering module batch");

        // Pass 1: build every interface before any is visible.
        let mut order = Vec::with_capacity(decls.len());
        let mut modules = HashMap::with_capacity(decls.len());
        for decl in decls {
            let name = decl.name().to_string();
            let handle = build_module(decl, engine);
            order.push(name.clone());
            modules.insert(name, handle);
        }

        let registry = Registry {
            inner: Arc::new(RegistryInner { order, modules }),
        };
        for name in &registry.inner.order {
            registry.inner.modules[name].install_registry(registry.clone());
        }

        match &self.devtools {
            Some(root) => {
                for name in &registry.inner.order {
                    let handle = &registry.inner.modules[name];
                    root.attach(name, handle.store().snapshot_state());
                }
            }
            None => tracing::debug!("no devtools root installed, skipping attachment"),
        }

        // Pass 2: every interface exists, so hooks may reach siblings.
        for name in &registry.inner.order {
            registry.inner.modules[name].run_started();
        }

        self.registered = true;
        tracing::info!(modules = registry.len(), "module batch registered");
        Ok(registry)
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

struct RegistryInner {
    order: Vec<String>,
    modules: HashMap<String, ModuleHandle>,
}

/// Immutable table of registered module interfaces
///
/// Cheaply clonable; written once per batch and read-only afterwards.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<ModuleHandle> {
        self.inner.modules.get(name).cloned()
    }

    pub fn module(&self, name: &str) -> ModuleResult<ModuleHandle> {
        self.get(name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_string()))
    }

    /// Module names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.inner.order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[test]
    fn test_register_before_install_fails() {
        let mut host = ModuleHost::new();
        let decl = ModuleDecl::builder("a").build().unwrap();

        let result = host.register(vec![decl]);
        assert!(matches!(result, Err(ModuleError::NotInstalled)));
    }

    #[test]
    fn test_install_then_register() {
        let mut host = ModuleHost::new();
        assert!(!host.is_installed());

        host.install(Engine::new());
        assert!(host.is_installed());

        let decl = ModuleDecl::builder("a").state("x", json!(1)).build().unwrap();
        let registry = host.register(vec![decl]).unwrap();
        assert_eq!(registry.names(), vec!["a"]);
    }

    #[test]
    fn test_second_batch_rejected() {
        let mut host = ModuleHost::with_engine(Engine::new());
        host.register(vec![ModuleDecl::builder("a").build().unwrap()])
            .unwrap();

        let result = host.register(vec![ModuleDecl::builder("b").build().unwrap()]);
        assert!(matches!(result, Err(ModuleError::AlreadyRegistered)));
    }

    #[test]
    fn test_duplicate_module_name_aborts_batch() {
        let mut host = ModuleHost::with_engine(Engine::new());
        let result = host.register(vec![
            ModuleDecl::builder("a").build().unwrap(),
            ModuleDecl::builder("a").build().unwrap(),
        ]);
        assert!(matches!(result, Err(ModuleError::DuplicateModule(_))));

        // The failed batch published nothing; the host still accepts one.
        let registry = host
            .register(vec![ModuleDecl::builder("a").build().unwrap()])
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_started_hooks_see_sibling_modules() {
        let observed = Arc::new(Mutex::new(Value::Null));

        let a = ModuleDecl::builder("a")
            .state("some_field", json!("hello from a"))
            .build()
            .unwrap();

        let sink = observed.clone();
        let b = ModuleDecl::builder("b")
            .on_started(move |ctx| {
                let registry = ctx.registry().unwrap();
                let a = registry.get("a").unwrap();
                *sink.lock() = a.get("some_field").unwrap();
            })
            .build()
            .unwrap();

        let mut host = ModuleHost::with_engine(Engine::new());
        host.register(vec![a, b]).unwrap();

        assert_eq!(*observed.lock(), json!("hello from a"));
    }

    #[test]
    fn test_started_hooks_run_in_declaration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut decls = Vec::new();
        for name in ["first", "second", "third"] {
            let sink = order.clone();
            decls.push(
                ModuleDecl::builder(name)
                    .on_started(move |_| sink.lock().push(name))
                    .build()
                    .unwrap(),
            );
        }

        let mut host = ModuleHost::with_engine(Engine::new());
        host.register(decls).unwrap();

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_devtools_attachment() {
        struct Recorder(Mutex<Vec<(String, Vec<(String, Value)>)>>);
        impl DevtoolsRoot for Recorder {
            fn attach(&self, module: &str, state: Vec<(String, Value)>) {
                self.0.lock().push((module.to_string(), state));
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut host = ModuleHost::with_engine(Engine::new());
        host.set_devtools(recorder.clone());

        host.register(vec![ModuleDecl::builder("a")
            .state("x", json!(5))
            .build()
            .unwrap()])
            .unwrap();

        let attached = recorder.0.lock();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].0, "a");
        assert_eq!(attached[0].1, vec![("x".to_string(), json!(5))]);
    }

    #[test]
    fn test_registry_lookup() {
        let mut host = ModuleHost::with_engine(Engine::new());
        let registry = host
            .register(vec![ModuleDecl::builder("only").build().unwrap()])
            .unwrap();

        assert!(registry.get("only").is_some());
        assert!(registry.get("other").is_none());
        assert!(matches!(
            registry.module("other"),
            Err(ModuleError::UnknownModule(_))
        ));
        assert!(!registry.is_empty());
    }
}
