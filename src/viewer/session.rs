//! Viewer session
//!
//! Runtime state of one open document: liveness flag, lifecycle state,
//! engine handle and synchronizer. Never persisted.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use uuid::Uuid;

use crate::host::{HostContainer, Liveness, RenderingEngine};
use crate::sync::{FieldSynchronizer, FieldValueMap};

use super::error::ViewerError;
use super::state::{ViewerEvent, ViewerState};

/// One live viewer instance
pub struct ViewerSession {
    id: Uuid,
    document: String,
    read_only: bool,
    liveness: Liveness,
    state: watch::Sender<ViewerState>,
    engine: Mutex<Option<Arc<dyn RenderingEngine>>>,
    synchronizer: Mutex<Option<Arc<FieldSynchronizer>>>,
    initial_values: Mutex<FieldValueMap>,
    events: UnboundedSender<ViewerEvent>,
}

impl ViewerSession {
    pub fn new(
        document: String,
        read_only: bool,
        initial_values: FieldValueMap,
        events: UnboundedSender<ViewerEvent>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ViewerState::Unmounted);
        Arc::new(Self {
            id: Uuid::new_v4(),
            document,
            read_only,
            liveness: Liveness::new(),
            state,
            engine: Mutex::new(None),
            synchronizer: Mutex::new(None),
            initial_values: Mutex::new(initial_values),
            events,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn state(&self) -> ViewerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.subscribe()
    }

    pub fn initial_values(&self) -> FieldValueMap {
        self.initial_values.lock().clone()
    }

    /// Move to `next`
    ///
    /// `Ok(false)` means the session is no longer live and the caller must
    /// stop without side effects.
    pub(crate) fn advance(&self, next: ViewerState) -> Result<bool, ViewerError> {
        if !self.is_alive() && next != ViewerState::TornDown {
            return Ok(false);
        }
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(ViewerError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        self.state.send_replace(next);
        tracing::debug!(session_id = %self.id, from = ?current, to = ?next, "Viewer state changed");
        let _ = self.events.send(ViewerEvent::StateChanged {
            session_id: self.id,
            state: next,
        });
        Ok(true)
    }

    /// Keep the engine handle unless the session died meanwhile
    pub(crate) fn attach_engine(&self, engine: Arc<dyn RenderingEngine>) -> bool {
        let mut slot = self.engine.lock();
        if !self.is_alive() {
            engine.destroy();
            return false;
        }
        *slot = Some(engine);
        true
    }

    /// Keep the synchronizer unless the session died meanwhile
    pub(crate) fn attach_synchronizer(&self, synchronizer: Arc<FieldSynchronizer>) -> bool {
        {
            let mut slot = self.synchronizer.lock();
            if !self.is_alive() {
                return false;
            }
            *slot = Some(synchronizer.clone());
        }
        // Values set between construction and attachment would be lost otherwise
        synchronizer.set_initial_values(self.initial_values());
        true
    }

    /// Replace the initial values; forwarded to the synchronizer when present
    pub fn set_initial_values(&self, values: FieldValueMap) {
        *self.initial_values.lock() = values.clone();
        let synchronizer = self.synchronizer.lock().clone();
        if let Some(synchronizer) = synchronizer {
            synchronizer.set_initial_values(values);
        }
    }

    /// Current values, empty before `Ready`
    pub fn collect_values(&self) -> FieldValueMap {
        self.synchronizer
            .lock()
            .as_ref()
            .map(|s| s.collect())
            .unwrap_or_default()
    }

    /// Revoke liveness, drop engine and synchronizer, clear the container
    ///
    /// Synchronous: when this returns no continuation of the session will
    /// touch `container` again.
    pub fn teardown(&self, container: &dyn HostContainer) {
        self.liveness.revoke();

        if let Some(synchronizer) = self.synchronizer.lock().take() {
            synchronizer.deactivate();
        }
        if let Some(engine) = self.engine.lock().take() {
            engine.destroy();
        }
        container.clear();

        match self.advance(ViewerState::TornDown) {
            Ok(_) => tracing::debug!(session_id = %self.id, "Viewer session torn down"),
            Err(e) => tracing::debug!(session_id = %self.id, "Teardown of finished session: {}", e),
        }
    }
}
