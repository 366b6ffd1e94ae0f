//! Integration tests for the module layer
//!
//! End-to-end coverage of declaration, registration, and the capability
//! surface: reactive reads and writes, computed recomputation, sample and
//! commit-log revert, events, wait_for, and the two-pass registration
//! guarantee.

use parking_lot::Mutex;
use serde_json::{json, Value};
use statemod_core::{ModuleDecl, ModuleError, ModuleHandle, ModuleHost, WatchOptions};
use statemod_reactive::Engine;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session_decl() -> ModuleDecl {
    ModuleDecl::builder("session")
        .state("user", json!(null))
        .state("attempts", json!(0))
        .computed("signed_in", |s| json!(!s.get("user").is_null()))
        .method("login", |ctx, args| {
            let name = args.first().cloned().unwrap_or(Value::Null);
            ctx.set("user", name.clone())?;
            ctx.module().emit("login", &[name.clone()]);
            Ok(name)
        })
        .method("logout", |ctx, _| {
            ctx.set("user", Value::Null)?;
            Ok(json!(null))
        })
        .build()
        .unwrap()
}

fn register_session() -> ModuleHandle {
    init_tracing();
    let mut host = ModuleHost::with_engine(Engine::new());
    let registry = host.register(vec![session_decl()]).unwrap();
    registry.get("session").unwrap()
}

#[test]
fn test_write_read_consistency() {
    let session = register_session();

    session.set("attempts", 3).unwrap();
    assert_eq!(session.get("attempts").unwrap(), json!(3));

    session.set_value("user", json!("ada")).unwrap();
    assert_eq!(session.get_as::<String>("user").unwrap(), "ada");
}

#[test]
fn test_computed_never_stale() {
    let session = register_session();

    assert_eq!(session.get("signed_in").unwrap(), json!(false));
    session.set("user", "ada").unwrap();
    assert_eq!(session.get("signed_in").unwrap(), json!(true));
    session.call("logout", &[]).unwrap();
    assert_eq!(session.get("signed_in").unwrap(), json!(false));
}

#[test]
fn test_methods_route_through_reactive_store() {
    let session = register_session();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    session.watch(
        |s| s.get("signed_in"),
        move |new, _| sink.lock().push(new.clone()),
        WatchOptions::default(),
    );

    session.call("login", &[json!("ada")]).unwrap();
    assert_eq!(*seen.lock(), vec![json!(true)]);
}

#[test]
fn test_sample_revert_round_trip() {
    let session = register_session();
    session.set("user", "ada").unwrap();
    session.set("attempts", 2).unwrap();

    let before = session.sample();
    session.revert(&session.sample()).unwrap();
    assert_eq!(session.sample(), before);

    session.set("attempts", 9).unwrap();
    session.revert(&before).unwrap();
    assert_eq!(session.get("attempts").unwrap(), json!(2));
}

#[test]
fn test_revert_rejects_non_object_without_side_effects() {
    let session = register_session();
    session.set("attempts", 4).unwrap();

    assert!(matches!(
        session.revert(&json!("not a sample")),
        Err(ModuleError::InvalidSample)
    ));
    assert_eq!(session.get("attempts").unwrap(), json!(4));
}

#[test]
fn test_commit_log_indices_and_bounds() {
    let session = register_session();

    assert_eq!(session.commit(), 0);
    session.set("attempts", 1).unwrap();
    assert_eq!(session.commit(), 1);

    session.set("attempts", 50).unwrap();
    session.revert_to(1).unwrap();
    assert_eq!(session.get("attempts").unwrap(), json!(1));

    assert!(matches!(
        session.revert_to(2),
        Err(ModuleError::CommitNotFound(2))
    ));
}

#[test]
fn test_event_bus_exactly_once_and_disposer() {
    let session = register_session();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let disposer = session.on("login", move |args| sink.lock().push(args.to_vec()));

    session.call("login", &[json!("ada")]).unwrap();
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0], vec![json!("ada")]);

    disposer.dispose();
    session.call("login", &[json!("bob")]).unwrap();
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_wait_for_resolves_on_first_match() {
    let session = register_session();
    let fut = session.wait_for(
        |s| s.get("attempts"),
        |new, _| new.as_i64() == Some(5),
    );

    for n in 1..=7 {
        session.set("attempts", n).unwrap();
    }

    assert_eq!(fut.await, json!(5));
}

#[tokio::test]
async fn test_wait_for_never_resolves_when_unmet() {
    let session = register_session();
    let fut = session.wait_for(|s| s.get("attempts"), |new, _| new.as_i64() == Some(5));

    session.set("attempts", 1).unwrap();

    assert!(tokio::time::timeout(Duration::from_millis(50), fut)
        .await
        .is_err());
}

#[test]
fn test_two_pass_registration_guarantee() {
    let observed = Arc::new(Mutex::new(Value::Null));

    let a = ModuleDecl::builder("a")
        .state("greeting", json!("hello"))
        .build()
        .unwrap();

    let sink = observed.clone();
    let b = ModuleDecl::builder("b")
        .state("copied", json!(null))
        .on_started(move |ctx| {
            let registry = ctx.registry().unwrap();
            let greeting = registry.get("a").unwrap().get("greeting").unwrap();
            ctx.set("copied", greeting.clone()).unwrap();
            *sink.lock() = greeting;
        })
        .build()
        .unwrap();

    let mut host = ModuleHost::with_engine(Engine::new());
    let registry = host.register(vec![a, b]).unwrap();

    assert_eq!(*observed.lock(), json!("hello"));
    assert_eq!(
        registry.get("b").unwrap().get("copied").unwrap(),
        json!("hello")
    );
}

#[test]
fn test_modules_do_not_share_stores() {
    let mut host = ModuleHost::with_engine(Engine::new());
    let registry = host
        .register(vec![
            ModuleDecl::builder("a").state("x", json!(1)).build().unwrap(),
            ModuleDecl::builder("b").state("x", json!(1)).build().unwrap(),
        ])
        .unwrap();

    registry.get("a").unwrap().set("x", 99).unwrap();
    assert_eq!(registry.get("b").unwrap().get("x").unwrap(), json!(1));
}

#[test]
fn test_contract_violation_keeps_module_out_of_registry() {
    // The violating declaration fails at build time and can never be
    // registered at all.
    let bad = ModuleDecl::builder("bad")
        .state("$watch", json!(0))
        .build();
    assert!(matches!(bad, Err(ModuleError::ContractViolation(_))));

    let mut host = ModuleHost::with_engine(Engine::new());
    let registry = host
        .register(vec![ModuleDecl::builder("good").build().unwrap()])
        .unwrap();
    assert_eq!(registry.names(), vec!["good"]);
}
