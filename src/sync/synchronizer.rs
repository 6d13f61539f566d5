//! Field synchronizer
//!
//! Bridges live controls and the value map. Initial values are pushed into
//! controls once they exist; edits are pulled back out on every change.
//! Controls created later (lazy page rendering) are picked up through
//! structural-change events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::host::{FieldControl, HostContainer, HostEvent, HostEventSink, ListenerId, Liveness, WatchId};

use super::values::{collect_values, inject_values, FieldValueMap};

/// Receives every recollected value map
pub type ValueCallback = Arc<dyn Fn(FieldValueMap) + Send + Sync>;

struct Attachment {
    control: Arc<dyn FieldControl>,
    listener: ListenerId,
}

#[derive(Default)]
struct SyncState {
    active: bool,
    attachments: Vec<Attachment>,
    watch: Option<WatchId>,
    initial_values: FieldValueMap,
    read_only: bool,
}

/// Identity of a control instance, independent of its name
fn control_key(control: &Arc<dyn FieldControl>) -> usize {
    Arc::as_ptr(control) as *const () as usize
}

/// Bidirectional bridge between controls and a [`FieldValueMap`]
pub struct FieldSynchronizer {
    container: Arc<dyn HostContainer>,
    recollect_delay: Duration,
    sink: HostEventSink,
    receiver: Mutex<Option<UnboundedReceiver<HostEvent>>>,
    shutdown: Notify,
    state: Mutex<SyncState>,
}

impl FieldSynchronizer {
    pub fn new(
        container: Arc<dyn HostContainer>,
        recollect_delay: Duration,
        initial_values: FieldValueMap,
        read_only: bool,
    ) -> Arc<Self> {
        let (sink, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            container,
            recollect_delay,
            sink,
            receiver: Mutex::new(Some(receiver)),
            shutdown: Notify::new(),
            state: Mutex::new(SyncState {
                initial_values,
                read_only,
                ..Default::default()
            }),
        })
    }

    /// Fresh map of every named control's current value
    pub fn collect(&self) -> FieldValueMap {
        collect_values(&self.container.controls())
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn attached_count(&self) -> usize {
        self.state.lock().attachments.len()
    }

    /// Start synchronizing
    ///
    /// Injects initial values into the controls present now, applies
    /// read-only, attaches listeners, watches the container subtree and
    /// spawns the event pump. Returns `None` if already activated.
    pub fn activate(
        self: &Arc<Self>,
        liveness: Liveness,
        on_values: ValueCallback,
    ) -> Option<JoinHandle<()>> {
        let receiver = self.receiver.lock().take()?;

        {
            let mut state = self.state.lock();
            let controls = self.container.controls();
            let injected = inject_values(&controls, &state.initial_values);
            if state.read_only {
                for control in &controls {
                    control.set_read_only(true);
                }
            }
            state.attachments = self.attach_all(controls);
            state.watch = Some(self.container.watch_structure(self.sink.clone()));
            state.active = true;

            tracing::debug!(
                controls = state.attachments.len(),
                injected = injected,
                read_only = state.read_only,
                "Field synchronizer activated"
            );
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            this.pump(receiver, liveness, on_values).await;
        }))
    }

    /// Re-attach listeners to the full current control set
    ///
    /// Stale listeners are removed first, so repeated calls leave exactly one
    /// listener per control. Controls not seen before get their initial
    /// value and read-only flag. Returns the number of new controls.
    pub fn resync(&self) -> usize {
        let mut state = self.state.lock();
        if !state.active {
            return 0;
        }

        let previous: HashSet<usize> = state
            .attachments
            .iter()
            .map(|a| control_key(&a.control))
            .collect();
        for attachment in state.attachments.drain(..) {
            attachment.control.remove_listener(attachment.listener);
        }

        let controls = self.container.controls();
        let fresh: Vec<Arc<dyn FieldControl>> = controls
            .iter()
            .filter(|c| !previous.contains(&control_key(c)))
            .cloned()
            .collect();

        inject_values(&fresh, &state.initial_values);
        if state.read_only {
            for control in &fresh {
                control.set_read_only(true);
            }
        }

        state.attachments = self.attach_all(controls);
        fresh.len()
    }

    /// Replace the initial values; re-applied to existing controls when active
    pub fn set_initial_values(&self, values: FieldValueMap) -> usize {
        let mut state = self.state.lock();
        state.initial_values = values;
        if !state.active {
            return 0;
        }
        let written = inject_values(&self.container.controls(), &state.initial_values);
        tracing::debug!(written = written, "Re-applied initial values");
        written
    }

    /// Detach everything and stop the pump. Synchronous.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        for attachment in state.attachments.drain(..) {
            attachment.control.remove_listener(attachment.listener);
        }
        if let Some(watch) = state.watch.take() {
            self.container.unwatch_structure(watch);
        }
        state.active = false;
        self.shutdown.notify_one();
    }

    fn attach_all(&self, controls: Vec<Arc<dyn FieldControl>>) -> Vec<Attachment> {
        controls
            .into_iter()
            .map(|control| {
                let listener = control.add_listener(self.sink.clone());
                Attachment { control, listener }
            })
            .collect()
    }

    async fn pump(
        self: Arc<Self>,
        mut receiver: UnboundedReceiver<HostEvent>,
        liveness: Liveness,
        on_values: ValueCallback,
    ) {
        let mut recollect_at: Option<Instant> = None;

        loop {
            let deadline = recollect_at.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = self.shutdown.notified() => break,
                event = receiver.recv() => {
                    let Some(event) = event else { break };
                    if !liveness.is_alive() {
                        break;
                    }
                    match event {
                        HostEvent::Control { .. } => on_values(self.collect()),
                        HostEvent::Structure { added } => {
                            let fresh = self.resync();
                            tracing::debug!(added = added, fresh = fresh, "Container structure changed");
                            recollect_at = Some(Instant::now() + self.recollect_delay);
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if recollect_at.is_some() => {
                    recollect_at = None;
                    if !liveness.is_alive() {
                        break;
                    }
                    on_values(self.collect());
                }
            }
        }

        tracing::debug!("Field synchronizer stopped");
    }
}
