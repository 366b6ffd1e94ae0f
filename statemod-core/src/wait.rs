//! Wait-until-condition futures
//!
//! [`ModuleHandle::wait_for`] turns a watch subscription into a one-shot
//! future: the first change whose value satisfies the condition resolves the
//! future and detaches the underlying watcher. Purely push-driven; nothing
//! polls the store, and a condition that is never met simply never resolves.

use crate::module::ModuleHandle;
use parking_lot::Mutex;
use serde_json::Value;
use statemod_reactive::{StateReader, WatchDisposer, WatchOptions};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Future returned by [`ModuleHandle::wait_for`]
///
/// Resolves at most once, with the first value for which the condition held.
/// If the module's store is dropped before the condition is met, the future
/// stays pending forever, matching the no-timeout contract.
pub struct WaitFor {
    rx: oneshot::Receiver<Value>,
}

impl Future for WaitFor {
    type Output = Value;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(_)) => Poll::Pending,
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ModuleHandle {
    /// Resolve with the first watched value for which `condition(new, old)`
    /// is true
    ///
    /// Installs a deep watch and disposes it upon the first satisfying
    /// change. The condition is only consulted on changes; a value that
    /// already satisfies it at call time does not resolve the future.
    pub fn wait_for<G, C>(&self, getter: G, condition: C) -> WaitFor
    where
        G: Fn(&StateReader<'_>) -> Value + Send + Sync + 'static,
        C: Fn(&Value, &Value) -> bool + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let slot: Arc<Mutex<Option<WatchDisposer>>> = Arc::new(Mutex::new(None));

        let cb_slot = slot.clone();
        let disposer = self.watch(
            getter,
            move |new, old| {
                if condition(new, old) {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(new.clone());
                    }
                    // Self-dispose; the slot is filled before any change can
                    // fire this callback.
                    if let Some(disposer) = cb_slot.lock().take() {
                        disposer.dispose();
                    }
                }
            },
            WatchOptions { deep: true },
        );
        *slot.lock() = Some(disposer);

        WaitFor { rx }
    }
}
