//! Viewer lifecycle controller
//!
//! Owns at most one [`ViewerSession`] at a time and drives it through
//! dimension detection, engine setup, document load, forced page rendering
//! and field synchronization. Every async continuation re-checks the
//! session's liveness before touching the container.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::ViewerConfig;
use crate::host::{ContainerDimensions, EngineFactory, HostContainer, RenderingEngine};
use crate::sync::{FieldSynchronizer, FieldValueMap, ValueCallback};

use super::error::ViewerError;
use super::session::ViewerSession;
use super::state::{ViewerEvent, ViewerState};

/// Inputs the embedding page hands to the viewer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerProps {
    /// Document locator (URL or path)
    pub document: String,
    pub initial_values: FieldValueMap,
    pub read_only: bool,
}

impl ViewerProps {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            ..Default::default()
        }
    }

    pub fn with_initial_values(mut self, values: FieldValueMap) -> Self {
        self.initial_values = values;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Everything a session task needs besides the session itself
#[derive(Clone)]
struct SessionContext {
    config: ViewerConfig,
    container: Arc<dyn HostContainer>,
    engines: Arc<dyn EngineFactory>,
    events: UnboundedSender<ViewerEvent>,
}

/// Lifecycle owner for one container element
pub struct ViewerLifecycleController {
    context: SessionContext,
    props: ViewerProps,
    visible: bool,
    session: Option<Arc<ViewerSession>>,
}

impl ViewerLifecycleController {
    /// Create a hidden controller; nothing happens until [`set_visible`]
    ///
    /// [`set_visible`]: Self::set_visible
    pub fn new(
        config: ViewerConfig,
        container: Arc<dyn HostContainer>,
        engines: Arc<dyn EngineFactory>,
        props: ViewerProps,
    ) -> (Self, UnboundedReceiver<ViewerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            context: SessionContext {
                config,
                container,
                engines,
                events,
            },
            props,
            visible: false,
            session: None,
        };
        (controller, receiver)
    }

    pub fn props(&self) -> &ViewerProps {
        &self.props
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Most recent session, live or torn down
    pub fn session(&self) -> Option<Arc<ViewerSession>> {
        self.session.clone()
    }

    pub fn state(&self) -> ViewerState {
        self.session
            .as_ref()
            .map(|s| s.state())
            .unwrap_or_default()
    }

    /// Mount on becoming visible, tear down on becoming hidden
    ///
    /// Must be called from within a current-thread tokio runtime: session
    /// tasks check liveness and then touch the container with no lock held.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.mount();
        } else {
            self.teardown_session();
        }
    }

    /// Switch documents; a visible viewer is remounted
    pub fn set_document(&mut self, document: impl Into<String>) {
        let document = document.into();
        if document == self.props.document {
            return;
        }
        self.props.document = document;
        if self.visible {
            self.mount();
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        if read_only == self.props.read_only {
            return;
        }
        self.props.read_only = read_only;
        if self.visible {
            self.mount();
        }
    }

    /// Replace the initial values
    ///
    /// A `Ready` session re-applies them to existing controls at once.
    pub fn set_initial_values(&mut self, values: FieldValueMap) {
        self.props.initial_values = values.clone();
        if let Some(session) = self.session.as_ref().filter(|s| s.is_alive()) {
            session.set_initial_values(values);
        }
    }

    /// Collect current values now
    ///
    /// Also emitted as [`ViewerEvent::Values`] while a session is live.
    /// Empty before `Ready`.
    pub fn collect_values(&self) -> FieldValueMap {
        let Some(session) = self.session.as_ref().filter(|s| s.is_alive()) else {
            return FieldValueMap::new();
        };
        let values = session.collect_values();
        let _ = self.context.events.send(ViewerEvent::Values(values.clone()));
        values
    }

    /// Tear down and forget visibility
    pub fn unmount(&mut self) {
        self.visible = false;
        self.teardown_session();
    }

    /// Replace the current session with a fresh one and start driving it
    fn mount(&mut self) {
        self.teardown_session();

        let session = ViewerSession::new(
            self.props.document.clone(),
            self.props.read_only,
            self.props.initial_values.clone(),
            self.context.events.clone(),
        );
        tracing::info!(
            session_id = %session.id(),
            document = %session.document(),
            read_only = session.read_only(),
            "Mounting viewer"
        );

        if let Err(e) = session.advance(ViewerState::AwaitingDimensions) {
            tracing::warn!(session_id = %session.id(), "Failed to start session: {}", e);
            return;
        }
        self.session = Some(session.clone());
        tokio::spawn(run_session(session, self.context.clone()));
    }

    fn teardown_session(&mut self) {
        if let Some(session) = self.session.as_ref().filter(|s| s.is_alive()) {
            session.teardown(self.context.container.as_ref());
        }
    }
}

impl Drop for ViewerLifecycleController {
    fn drop(&mut self) {
        self.teardown_session();
    }
}

/// Session task entry point; no error escapes it
async fn run_session(session: Arc<ViewerSession>, context: SessionContext) {
    match drive(&session, &context).await {
        Ok(()) => {}
        Err(e) if e.is_load_failure() => {
            tracing::error!(
                session_id = %session.id(),
                document = %session.document(),
                "{}",
                e
            );
            if session.is_alive() {
                let _ = context.events.send(ViewerEvent::LoadFailed {
                    session_id: session.id(),
                    message: e.to_string(),
                });
            }
        }
        Err(e) => {
            tracing::warn!(
                session_id = %session.id(),
                state = ?session.state(),
                "Viewer stopped before ready: {}",
                e
            );
        }
    }
}

async fn drive(session: &Arc<ViewerSession>, context: &SessionContext) -> Result<(), ViewerError> {
    let Some(dimensions) = await_dimensions(session, context).await else {
        return Ok(());
    };

    if !session.advance(ViewerState::Initializing)? {
        return Ok(());
    }
    let Some(engine) = initialize(session, context, dimensions)? else {
        return Ok(());
    };

    if !session.advance(ViewerState::DocumentLoading)? {
        return Ok(());
    }
    let loaded = engine.load_document(session.document()).await;
    if !session.is_alive() {
        return Ok(());
    }
    let info = loaded.map_err(ViewerError::DocumentLoad)?;
    tracing::debug!(session_id = %session.id(), pages = info.page_count, "Document loaded");

    if !session.advance(ViewerState::PagesRendering)? {
        return Ok(());
    }
    let rendered = engine.first_page_ready().await;
    if !session.is_alive() {
        return Ok(());
    }
    rendered.map_err(ViewerError::Render)?;

    if !force_render(session, context).await {
        return Ok(());
    }

    start_synchronizer(session, context)
}

/// Wait for a usable container: settle, check, one retry, then park
async fn await_dimensions(
    session: &ViewerSession,
    context: &SessionContext,
) -> Option<ContainerDimensions> {
    tokio::time::sleep(context.config.settle_delay).await;
    if !session.is_alive() {
        return None;
    }
    let dimensions = context.container.dimensions();
    if dimensions.is_usable() {
        return Some(dimensions);
    }

    tracing::debug!(
        session_id = %session.id(),
        width = dimensions.width,
        height = dimensions.height,
        visible = dimensions.visible,
        "Container not sized yet, retrying"
    );
    tokio::time::sleep(context.config.retry_delay).await;
    if !session.is_alive() {
        return None;
    }
    let dimensions = context.container.dimensions();
    if dimensions.is_usable() {
        return Some(dimensions);
    }

    tracing::info!(
        session_id = %session.id(),
        width = dimensions.width,
        height = dimensions.height,
        visible = dimensions.visible,
        "Container never became usable, viewer parked"
    );
    None
}

/// Size forced onto the rebuilt container
///
/// Hosts often report zero height right after the rebuild, so the size
/// measured before it and finally the configured minimum stand in.
fn forced_size(
    measured: ContainerDimensions,
    before_rebuild: ContainerDimensions,
    min_height: f64,
) -> (f64, f64) {
    let width = if measured.width > 0.0 {
        measured.width
    } else {
        before_rebuild.width
    };
    let height = if measured.height > 0.0 {
        measured.height
    } else if before_rebuild.height > 0.0 {
        before_rebuild.height
    } else {
        min_height
    };
    (width, height)
}

fn initialize(
    session: &ViewerSession,
    context: &SessionContext,
    dimensions: ContainerDimensions,
) -> Result<Option<Arc<dyn RenderingEngine>>, ViewerError> {
    context
        .engines
        .configure_worker(&context.config.worker_src)
        .map_err(ViewerError::Initialization)?;

    context.container.clear();
    context.container.rebuild();
    let (width, height) = forced_size(
        context.container.dimensions(),
        dimensions,
        context.config.min_height,
    );
    context.container.apply_size(width, height);

    let engine = context
        .engines
        .create(context.container.clone())
        .map_err(ViewerError::Initialization)?;
    if !session.attach_engine(engine.clone()) {
        return Ok(None);
    }

    tracing::debug!(session_id = %session.id(), width = width, height = height, "Rendering engine created");
    Ok(Some(engine))
}

/// Scroll to the bottom and back so lazily rendered pages materialize
///
/// Returns false when the session died in between.
async fn force_render(session: &ViewerSession, context: &SessionContext) -> bool {
    let settle = context.config.scroll_settle;

    tokio::time::sleep(settle).await;
    if !session.is_alive() {
        return false;
    }
    context.container.scroll_to(context.container.scroll_height());

    tokio::time::sleep(settle).await;
    if !session.is_alive() {
        return false;
    }
    context.container.scroll_to(0.0);

    tokio::time::sleep(settle).await;
    session.is_alive()
}

fn start_synchronizer(
    session: &Arc<ViewerSession>,
    context: &SessionContext,
) -> Result<(), ViewerError> {
    let synchronizer = FieldSynchronizer::new(
        context.container.clone(),
        context.config.recollect_delay,
        session.initial_values(),
        session.read_only(),
    );
    if !session.attach_synchronizer(synchronizer.clone()) || !session.is_alive() {
        return Ok(());
    }

    let events = context.events.clone();
    let on_values: ValueCallback = Arc::new(move |values| {
        let _ = events.send(ViewerEvent::Values(values));
    });
    synchronizer.activate(session.liveness(), on_values);

    if !session.advance(ViewerState::Ready)? {
        return Ok(());
    }
    let values = synchronizer.collect();
    tracing::info!(session_id = %session.id(), fields = values.len(), "Viewer ready");
    let _ = context.events.send(ViewerEvent::Values(values));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{ControlSpec, MemoryContainer, MemoryDocument, MemoryEngineFactory};
    use crate::host::FieldControl;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        controller: ViewerLifecycleController,
        events: UnboundedReceiver<ViewerEvent>,
        container: Arc<MemoryContainer>,
        factory: Arc<MemoryEngineFactory>,
    }

    fn sheet() -> MemoryDocument {
        MemoryDocument::new(vec![
            vec![
                ControlSpec::text("Name"),
                ControlSpec::checkbox("Inspiration", "Yes"),
            ],
            vec![ControlSpec::text("Backstory")],
        ])
    }

    fn values(pairs: &[(&str, &str)]) -> FieldValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn harness_with(
        container: MemoryContainer,
        props: ViewerProps,
        configure: impl FnOnce(MemoryEngineFactory) -> MemoryEngineFactory,
    ) -> Harness {
        let container = Arc::new(container);
        let factory = Arc::new(configure(
            MemoryEngineFactory::new(container.clone())
                .with_document("sheet.pdf", sheet())
                .with_document(
                    "other.pdf",
                    MemoryDocument::new(vec![vec![ControlSpec::text("Familiar")]]),
                ),
        ));
        let (controller, events) = ViewerLifecycleController::new(
            ViewerConfig::default(),
            container.clone(),
            factory.clone(),
            props,
        );
        Harness {
            controller,
            events,
            container,
            factory,
        }
    }

    fn harness(props: ViewerProps) -> Harness {
        harness_with(MemoryContainer::new(800.0, 600.0), props, |f| f)
    }

    async fn wait_for_state(controller: &ViewerLifecycleController, target: ViewerState) {
        let mut rx = controller.session().unwrap().subscribe();
        timeout(Duration::from_secs(10), rx.wait_for(|s| *s == target))
            .await
            .expect("state not reached")
            .unwrap();
    }

    fn drain(events: &mut UnboundedReceiver<ViewerEvent>) -> Vec<ViewerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn ready_count(events: &[ViewerEvent]) -> usize {
        events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    ViewerEvent::StateChanged {
                        state: ViewerState::Ready,
                        ..
                    }
                )
            })
            .count()
    }

    #[test]
    fn test_forced_size_falls_back_to_minimum() {
        let zero = ContainerDimensions::new(0.0, 0.0, true);
        let sized = ContainerDimensions::new(800.0, 450.0, true);
        assert_eq!(forced_size(sized, zero, 600.0), (800.0, 450.0));
        assert_eq!(forced_size(zero, sized, 600.0), (800.0, 450.0));
        assert_eq!(forced_size(zero, zero, 600.0), (0.0, 600.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_reaches_ready_with_lazy_pages() {
        let mut h = harness(
            ViewerProps::new("sheet.pdf").with_initial_values(values(&[
                ("Name", "Tordek"),
                ("Backstory", "Raised by wolves"),
            ])),
        );
        h.controller.set_visible(true);
        assert_eq!(h.controller.state(), ViewerState::AwaitingDimensions);

        wait_for_state(&h.controller, ViewerState::Ready).await;

        assert_eq!(h.factory.worker_src().as_deref(), Some("/pdf.worker.min.js"));
        assert_eq!(h.container.applied_size(), Some((800.0, 600.0)));
        assert_eq!(h.container.control("Name").unwrap().value(), "Tordek");
        // second page only exists after the forced scroll
        assert_eq!(
            h.container.control("Backstory").unwrap().value(),
            "Raised by wolves"
        );
        assert_eq!(h.container.scroll_top(), 0.0);

        let events = drain(&mut h.events);
        let states: Vec<ViewerState> = events
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::StateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ViewerState::AwaitingDimensions,
                ViewerState::Initializing,
                ViewerState::DocumentLoading,
                ViewerState::PagesRendering,
                ViewerState::Ready,
            ]
        );
        assert_eq!(
            events.last(),
            Some(&ViewerEvent::Values(values(&[
                ("Backstory", "Raised by wolves"),
                ("Inspiration", ""),
                ("Name", "Tordek"),
            ])))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_size_container_parks() {
        let mut h = harness_with(
            MemoryContainer::with_dimensions(ContainerDimensions::new(800.0, 0.0, true)),
            ViewerProps::new("sheet.pdf"),
            |f| f,
        );
        h.controller.set_visible(true);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.controller.state(), ViewerState::AwaitingDimensions);
        assert_eq!(h.factory.created_count(), 0);
        assert_eq!(h.container.stats().rebuilds, 0);
        assert!(drain(&mut h.events)
            .iter()
            .all(|e| !matches!(e, ViewerEvent::LoadFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_container_parks() {
        let mut h = harness_with(
            MemoryContainer::with_dimensions(ContainerDimensions::new(800.0, 600.0, false)),
            ViewerProps::new("sheet.pdf"),
            |f| f,
        );
        h.controller.set_visible(true);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.controller.state(), ViewerState::AwaitingDimensions);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_picks_up_late_layout() {
        let mut h = harness_with(
            MemoryContainer::with_dimensions(ContainerDimensions::new(0.0, 0.0, true)),
            ViewerProps::new("sheet.pdf"),
            |f| f,
        );
        h.controller.set_visible(true);

        // first check at 100ms fails, retry lands at 400ms
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.controller.state(), ViewerState::AwaitingDimensions);
        h.container
            .set_dimensions(ContainerDimensions::new(800.0, 600.0, true));

        wait_for_state(&h.controller, ViewerState::Ready).await;
        assert_eq!(h.factory.created_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_visibility_toggle_mounts_once() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        h.controller.set_visible(true);
        h.controller.set_visible(false);
        h.controller.set_visible(true);

        wait_for_state(&h.controller, ViewerState::Ready).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.factory.created_count(), 1);
        assert_eq!(h.container.stats().rebuilds, 1);
        assert_eq!(ready_count(&drain(&mut h.events)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_load_leaves_container_alone() {
        let mut h = harness_with(
            MemoryContainer::new(800.0, 600.0),
            ViewerProps::new("slow.pdf"),
            |f| f.with_document("slow.pdf", sheet().with_load_delay(Duration::from_secs(1))),
        );
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::DocumentLoading).await;

        h.controller.set_visible(false);
        let clears = h.container.stats().clears;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.controller.state(), ViewerState::TornDown);
        assert!(h.factory.engines()[0].is_destroyed());
        let stats = h.container.stats();
        assert_eq!(stats.scrolls, 0);
        assert_eq!(stats.clears, clears);
        assert!(h.container.controls().is_empty());
        assert!(drain(&mut h.events)
            .iter()
            .all(|e| !matches!(e, ViewerEvent::LoadFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_is_reported_once() {
        let mut h = harness_with(
            MemoryContainer::new(800.0, 600.0),
            ViewerProps::new("bad.pdf"),
            |f| f.with_document("bad.pdf", MemoryDocument::failing("corrupt xref")),
        );
        h.controller.set_visible(true);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.controller.state(), ViewerState::DocumentLoading);
        let failures: Vec<String> = drain(&mut h.events)
            .into_iter()
            .filter_map(|e| match e {
                ViewerEvent::LoadFailed { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("corrupt xref"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialization_failure_is_swallowed() {
        let mut h = harness_with(
            MemoryContainer::new(800.0, 600.0),
            ViewerProps::new("sheet.pdf"),
            |f| f.failing_create("no canvas support"),
        );
        h.controller.set_visible(true);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.controller.state(), ViewerState::Initializing);
        assert!(drain(&mut h.events)
            .iter()
            .all(|e| !matches!(e, ViewerEvent::LoadFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_only_session_locks_controls() {
        let mut h = harness(ViewerProps::new("sheet.pdf").read_only(true));
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::Ready).await;

        assert!(h
            .container
            .controls()
            .iter()
            .all(|c| c.is_read_only()));
        h.container.control("Name").unwrap().type_text("intruder");
        assert_eq!(h.controller.collect_values()["Name"], "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_emit_values() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::Ready).await;
        drain(&mut h.events);

        h.container.control("Name").unwrap().type_text("Lidda");
        let event = timeout(Duration::from_secs(1), h.events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            ViewerEvent::Values(values) => assert_eq!(values["Name"], "Lidda"),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(h.controller.collect_values()["Name"], "Lidda");
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_initial_values_are_applied() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::Ready).await;

        h.controller
            .set_initial_values(values(&[("Name", "Jozan"), ("Inspiration", "Yes")]));
        assert_eq!(h.container.control("Name").unwrap().value(), "Jozan");
        assert!(h.container.control("Inspiration").unwrap().is_checked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_change_remounts() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::Ready).await;
        let first = h.controller.session().unwrap();

        h.controller.set_document("other.pdf");
        assert_eq!(first.state(), ViewerState::TornDown);
        assert!(h.factory.engines()[0].is_destroyed());

        wait_for_state(&h.controller, ViewerState::Ready).await;
        assert_ne!(h.controller.session().unwrap().id(), first.id());
        assert_eq!(h.factory.created_count(), 2);
        assert!(h.container.control("Familiar").is_some());
        assert!(h.container.control("Name").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_without_session_is_empty() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        assert_eq!(h.controller.state(), ViewerState::Unmounted);
        assert!(h.controller.collect_values().is_empty());
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_after_teardown_emits_nothing() {
        let mut h = harness(ViewerProps::new("sheet.pdf"));
        h.controller.set_visible(true);
        wait_for_state(&h.controller, ViewerState::Ready).await;
        h.controller.unmount();
        while h.events.try_recv().is_ok() {}

        assert_eq!(h.controller.state(), ViewerState::TornDown);
        assert!(h.controller.collect_values().is_empty());
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down() {
        let h = harness(ViewerProps::new("sheet.pdf"));
        let container = h.container.clone();
        let Harness { mut controller, .. } = h;
        controller.set_visible(true);
        wait_for_state(&controller, ViewerState::Ready).await;
        let session = controller.session().unwrap();

        drop(controller);
        assert!(!session.is_alive());
        assert!(container.controls().is_empty());
    }
}
