//! The single shared browser session.
//!
//! At most one `Session` exists per `SessionManager`. It is created lazily on
//! the first `acquire`, reused afterwards, and torn down by `release`.
//! Callers that need the page for longer than one call hold a `SessionGuard`,
//! which keeps every other caller waiting until it is dropped.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use futures::lock::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    browser::{BrowserLauncher, BrowserPage},
    error::{BrowserError, Result},
};

pub struct Session {
    id: Uuid,
    started_at: Instant,
    page: Box<dyn BrowserPage>,
}

impl Session {
    fn new(page: Box<dyn BrowserPage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            page,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn page(&self) -> &dyn BrowserPage {
        &*self.page
    }
}

pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    slot: Mutex<Option<Session>>,
    acquisitions: AtomicUsize,
    launches: AtomicUsize,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
            acquisitions: AtomicUsize::new(0),
            launches: AtomicUsize::new(0),
        }
    }

    /// Exclusive access to the session slot until the guard is dropped.
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            slot: self.slot.lock().await,
            manager: self,
        }
    }

    /// Return the id of the live session, starting one if needed.
    pub async fn acquire(&self) -> Result<Uuid> {
        let mut guard = self.lock().await;
        Ok(guard.acquire().await?.id())
    }

    /// Close the page and browser if open. Safe to call with no session.
    pub async fn release(&self) {
        self.lock().await.release().await;
    }

    pub async fn current_id(&self) -> Option<Uuid> {
        self.slot.lock().await.as_ref().map(Session::id)
    }

    pub async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Number of `acquire` calls made so far, successful or not.
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of browsers launched so far.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

pub struct SessionGuard<'a> {
    slot: MutexGuard<'a, Option<Session>>,
    manager: &'a SessionManager,
}

impl SessionGuard<'_> {
    pub fn current(&self) -> Option<&Session> {
        self.slot.as_ref()
    }

    pub async fn acquire(&mut self) -> Result<&Session> {
        self.manager.acquisitions.fetch_add(1, Ordering::SeqCst);

        let alive = match self.slot.as_ref() {
            Some(session) => match session.page.current_url().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Browser session {} stopped responding: {}", session.id, e);
                    false
                }
            },
            None => false,
        };

        if !alive {
            if let Some(stale) = self.slot.take() {
                if let Err(e) = stale.page.close().await {
                    debug!("Closing stale session {} failed: {}", stale.id, e);
                }
            }

            self.manager.launches.fetch_add(1, Ordering::SeqCst);
            let page = self.manager.launcher.launch().await.map_err(|e| match e {
                BrowserError::Startup(_) => e,
                other => BrowserError::Startup(other.to_string()),
            })?;

            let session = Session::new(page);
            info!("Started browser session {}", session.id);
            *self.slot = Some(session);
        }

        self.slot
            .as_ref()
            .ok_or_else(|| BrowserError::Startup("browser session missing after launch".into()))
    }

    pub async fn release(&mut self) {
        let Some(session) = self.slot.take() else {
            debug!("No browser session to release");
            return;
        };

        info!(
            "Releasing browser session {} after {:?}",
            session.id,
            session.uptime()
        );
        if let Err(e) = session.page.close().await {
            warn!("Error closing browser session {}: {}", session.id, e);
        }
        self.manager.launcher.shutdown().await;
    }
}
