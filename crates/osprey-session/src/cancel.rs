//! Structured cancellation scopes.
//!
//! Every long-running operation kind owns its own token. Beginning a new
//! instance of the same kind cancels the prior in-flight one, so stale
//! callbacks can never act on torn-down or superseded state:
//! last-issued-wins, never last-completed-wins. Shutdown cancels the root,
//! which sweeps every outstanding token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// The logical operations that may run concurrently with the UI, each
/// independently cancellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Load,
    Autosave,
    Export,
    HealthProbe,
    License,
}

/// A cooperative cancellation token. Cloning shares the underlying flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// A token that is already cancelled, handed out after shutdown.
    pub fn cancelled_token() -> Self {
        let token = Self::new();
        token.cancel();
        token
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            // The sender lives inside this token, so changed() cannot fail
            // while we hold self.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One root scope composed of per-operation-kind tokens.
#[derive(Debug)]
pub struct CancelScopes {
    root: CancelToken,
    current: Mutex<HashMap<OperationKind, CancelToken>>,
}

impl CancelScopes {
    pub fn new() -> Self {
        Self { root: CancelToken::new(), current: Mutex::new(HashMap::new()) }
    }

    /// Begin a new instance of `kind`, cancelling any in-flight prior
    /// instance of the same kind.
    pub fn begin(&self, kind: OperationKind) -> CancelToken {
        if self.root.is_cancelled() {
            return CancelToken::cancelled_token();
        }
        let token = CancelToken::new();
        let mut current = self.current.lock().unwrap();
        if let Some(prior) = current.insert(kind, token.clone()) {
            prior.cancel();
        }
        token
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Tear down the root scope: every outstanding token is signalled and
    /// any token begun afterwards is born cancelled.
    pub fn shutdown(&self) {
        self.root.cancel();
        let current = self.current.lock().unwrap();
        for token in current.values() {
            token.cancel();
        }
    }
}

impl Default for CancelScopes {
    fn default() -> Self {
        Self::new()
    }
}
