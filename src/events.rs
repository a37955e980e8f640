//! In-process notification of authorization progress.
//!
//! Handlers run synchronously on whichever task publishes the event, in the
//! order they were registered. The bus is a fire-and-forget channel: a
//! failing handler is logged and the remaining handlers still run.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Res, error::AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    Started,
    Success,
    Failed,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    Started,
    Success,
    Failed(String),
    /// Terminal signal of every authorization attempt.
    Completed { has_error: bool },
}

impl AuthEvent {
    pub fn kind(&self) -> AuthEventKind {
        match self {
            AuthEvent::Started => AuthEventKind::Started,
            AuthEvent::Success => AuthEventKind::Success,
            AuthEvent::Failed(_) => AuthEventKind::Failed,
            AuthEvent::Completed { .. } => AuthEventKind::Completed,
        }
    }
}

type Handler = Arc<dyn Fn(&AuthEvent) -> Res<()> + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<AuthEventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: AuthEventKind, handler: F)
    where
        F: Fn(&AuthEvent) -> Res<()> + Send + Sync + 'static,
    {
        debug!(?kind, "registering auth event subscriber");
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn publish(&self, event: AuthEvent) {
        // Snapshot so handlers can subscribe or publish without deadlocking.
        let handlers: Vec<Handler> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(?event, "no subscribers registered");
            return;
        }

        debug!(?event, subscribers = handlers.len(), "publishing auth event");
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler(&event) {
                warn!(?event, index, "auth event handler failed: {}", e);
            }
        }
    }

    pub fn subscriber_count(&self, kind: AuthEventKind) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Subscribes a channel to [`AuthEvent::Completed`].
    ///
    /// Create the signal before starting a flow so an immediate completion
    /// is not missed.
    pub fn completion_signal(&self) -> CompletionSignal {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(AuthEventKind::Completed, move |event| {
            if let AuthEvent::Completed { has_error } = event {
                // The receiver is gone once its flow finished; later events are not for it.
                let _ = tx.send(*has_error);
            }
            Ok(())
        });
        CompletionSignal { rx }
    }
}

pub struct CompletionSignal {
    rx: mpsc::UnboundedReceiver<bool>,
}

impl CompletionSignal {
    /// Waits for the next completion and returns its `has_error` flag.
    ///
    /// Without a timeout this waits for as long as the flow takes.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<bool, AuthError> {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.rx.recv())
                .await
                .map_err(|_| AuthError::LoginTimeout(limit))?,
            None => self.rx.recv().await,
        };

        received.ok_or_else(|| {
            AuthError::InvalidOperation("event bus dropped before completion".to_string())
        })
    }

    /// Discards completions that were published but not waited for.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}
