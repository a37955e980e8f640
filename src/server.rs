//! Transient local HTTP server receiving the provider redirect.
//!
//! The listener serves on its own tokio task so [`CallbackListener::start`]
//! returns as soon as the socket is bound. It is stopped after the first
//! `/authcallback` request and can be started again for the next login.

use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, warn};

use crate::{api, error::AuthError, spotify::auth::Authorizer};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStatus {
    Stopped,
    Running,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    /// Why the serve loop ended on its own, if it did.
    failure: Arc<Mutex<Option<io::Error>>>,
}

#[derive(Default)]
struct ListenerState {
    running: Option<RunningServer>,
    /// Server that was told to stop but may still be finishing its last response.
    draining: Option<JoinHandle<()>>,
}

pub struct CallbackListener {
    addr: String,
    state: Mutex<ListenerState>,
}

impl CallbackListener {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            state: Mutex::new(ListenerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> ListenerStatus {
        match &self.lock().running {
            Some(server) if !server.handle.is_finished() => ListenerStatus::Running,
            _ => ListenerStatus::Stopped,
        }
    }

    /// Bound address while running. Differs from the configured one when
    /// port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().running.as_ref().map(|server| server.addr)
    }

    /// Binds the configured address and serves the callback routes.
    ///
    /// Calling `start` on a running listener does nothing.
    ///
    /// # Errors
    ///
    /// [`AuthError::ListenerStartup`] if the address cannot be bound.
    pub async fn start(&self, authorizer: Arc<Authorizer>) -> Result<ListenerStatus, AuthError> {
        let draining = {
            let mut state = self.lock();
            match &state.running {
                Some(server) if !server.handle.is_finished() => {
                    debug!(addr = %server.addr, "authorization server already running");
                    return Ok(ListenerStatus::Running);
                }
                Some(_) => {
                    // serve loop ended on its own
                    state.running = None;
                }
                None => {}
            }
            state.draining.take()
        };

        if let Some(handle) = draining {
            if tokio::time::timeout(DRAIN_TIMEOUT, handle).await.is_err() {
                warn!("previous authorization server did not stop in time");
            }
        }

        debug!(addr = %self.addr, "starting authorization server");
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(AuthError::ListenerStartup)?;
        let addr = listener.local_addr().map_err(AuthError::ListenerStartup)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let failure = Arc::new(Mutex::new(None));
        let task_failure = Arc::clone(&failure);
        let app = api::router(authorizer);
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            match result {
                Ok(()) => debug!(%addr, "authorization server stopped"),
                Err(e) => {
                    warn!(%addr, "authorization server failed: {}", e);
                    *task_failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                }
            }
        });

        self.lock().running = Some(RunningServer {
            addr,
            shutdown: shutdown_tx,
            handle,
            failure,
        });
        debug!(%addr, "authorization server running");
        Ok(ListenerStatus::Running)
    }

    /// Stops accepting connections. A stopped listener ignores the call.
    ///
    /// Does not wait for the server task: it is usually invoked from within
    /// the request the server is still answering.
    ///
    /// # Errors
    ///
    /// [`AuthError::ListenerShutdown`] if the server task is no longer there
    /// to receive the signal; its serve error is the source.
    pub fn shutdown(&self) -> Result<ListenerStatus, AuthError> {
        let mut state = self.lock();
        let Some(server) = state.running.take() else {
            debug!("authorization server not running, ignoring shutdown signal");
            return Ok(ListenerStatus::Stopped);
        };

        if server.shutdown.send(()).is_err() {
            let source = server
                .failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or_else(|| io::Error::other("server task exited before shutdown"));
            return Err(AuthError::ListenerShutdown {
                addr: server.addr,
                source,
            });
        }

        state.draining = Some(server.handle);
        debug!(addr = %server.addr, "authorization server shutdown requested");
        Ok(ListenerStatus::Stopped)
    }

    /// Waits until a stopped server has finished its last connection.
    pub async fn wait_stopped(&self) {
        let draining = self.lock().draining.take();
        if let Some(handle) = draining {
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, handle).await;
        }
    }
}
