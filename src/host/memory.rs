//! In-memory host
//!
//! A headless container, control set and rendering engine. Pages after the
//! first are materialized lazily when scrolled into view, like the real
//! engine does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::HostError;
use super::traits::{EngineFactory, FieldControl, HostContainer, RenderingEngine};
use super::types::{
    ContainerDimensions, ControlEventKind, ControlKind, DocumentInfo, HostEvent, HostEventSink,
    ListenerId, WatchId,
};

// ============================================================================
// Controls
// ============================================================================

/// Blueprint for a control the engine creates when its page renders
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: Option<String>,
    pub kind: ControlKind,
    pub on_value: String,
}

impl ControlSpec {
    pub fn text(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: ControlKind::Text,
            on_value: String::new(),
        }
    }

    pub fn checkbox(name: &str, on_value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: ControlKind::Checkbox,
            on_value: on_value.to_string(),
        }
    }

    pub fn with_kind(name: &str, kind: ControlKind) -> Self {
        Self {
            name: Some(name.to_string()),
            kind,
            on_value: if kind.is_boolean_like() {
                "Yes".to_string()
            } else {
                String::new()
            },
        }
    }

    /// Control without an identifying attribute
    pub fn anonymous(kind: ControlKind) -> Self {
        Self {
            name: None,
            kind,
            on_value: String::new(),
        }
    }

    pub fn build(&self) -> Arc<MemoryControl> {
        Arc::new(MemoryControl::new(
            self.name.clone(),
            self.kind,
            self.on_value.clone(),
        ))
    }
}

#[derive(Default)]
struct ControlState {
    value: String,
    checked: bool,
    read_only: bool,
    listeners: Vec<(ListenerId, HostEventSink)>,
}

/// Headless input control
pub struct MemoryControl {
    name: Option<String>,
    kind: ControlKind,
    on_value: String,
    state: Mutex<ControlState>,
    next_listener: AtomicU64,
}

impl MemoryControl {
    pub fn new(name: Option<String>, kind: ControlKind, on_value: String) -> Self {
        Self {
            name,
            kind,
            on_value,
            state: Mutex::new(ControlState::default()),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Simulate the user typing into the control
    ///
    /// Ignored when read-only.
    pub fn type_text(&self, text: &str) {
        {
            let mut state = self.state.lock();
            if state.read_only {
                return;
            }
            state.value = text.to_string();
        }
        self.notify(ControlEventKind::Input);
        self.notify(ControlEventKind::Change);
    }

    /// Simulate the user clicking a boolean-like control
    pub fn toggle(&self) {
        {
            let mut state = self.state.lock();
            if state.read_only {
                return;
            }
            state.checked = !state.checked;
        }
        self.notify(ControlEventKind::Change);
    }

    pub fn blur(&self) {
        self.notify(ControlEventKind::Blur);
    }

    fn notify(&self, kind: ControlEventKind) {
        let state = self.state.lock();
        for (_, sink) in &state.listeners {
            // Closed sinks belong to torn-down sessions
            let _ = sink.send(HostEvent::Control {
                kind,
                name: self.name.clone(),
            });
        }
    }
}

impl FieldControl for MemoryControl {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn kind(&self) -> ControlKind {
        self.kind
    }

    fn value(&self) -> String {
        self.state.lock().value.clone()
    }

    fn set_value(&self, value: &str) {
        self.state.lock().value = value.to_string();
    }

    fn is_checked(&self) -> bool {
        self.state.lock().checked
    }

    fn set_checked(&self, checked: bool) {
        self.state.lock().checked = checked;
    }

    fn on_value(&self) -> String {
        self.on_value.clone()
    }

    fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    fn is_read_only(&self) -> bool {
        self.state.lock().read_only
    }

    fn add_listener(&self, sink: HostEventSink) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.state.lock().listeners.push((id, sink));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.state.lock().listeners.retain(|(lid, _)| *lid != id);
    }
}

// ============================================================================
// Container
// ============================================================================

/// Counters for container mutations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub clears: usize,
    pub rebuilds: usize,
    pub resizes: usize,
    pub scrolls: usize,
}

struct LazyPage {
    offset: f64,
    controls: Vec<Arc<MemoryControl>>,
}

struct ContainerState {
    dimensions: ContainerDimensions,
    applied_size: Option<(f64, f64)>,
    built: bool,
    scroll_top: f64,
    scroll_height: f64,
    controls: Vec<Arc<MemoryControl>>,
    lazy_pages: Vec<LazyPage>,
    watchers: Vec<(WatchId, HostEventSink)>,
    stats: ContainerStats,
}

impl ContainerState {
    fn viewport_height(&self) -> f64 {
        self.applied_size
            .map(|(_, h)| h)
            .unwrap_or(self.dimensions.height)
    }

    /// Move lazy pages that intersect the viewport into the live set
    fn materialize_visible(&mut self) -> usize {
        let bottom = self.scroll_top + self.viewport_height();
        let (visible, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.lazy_pages)
            .into_iter()
            .partition(|page| page.offset <= bottom);
        self.lazy_pages = pending;

        let added: usize = visible.iter().map(|p| p.controls.len()).sum();
        for page in visible {
            self.controls.extend(page.controls);
        }
        if added > 0 {
            self.notify_structure(added);
        }
        added
    }

    fn notify_structure(&self, added: usize) {
        for (_, sink) in &self.watchers {
            let _ = sink.send(HostEvent::Structure { added });
        }
    }
}

/// Headless container element
pub struct MemoryContainer {
    state: Mutex<ContainerState>,
    next_watch: AtomicU64,
}

impl MemoryContainer {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_dimensions(ContainerDimensions::new(width, height, true))
    }

    pub fn with_dimensions(dimensions: ContainerDimensions) -> Self {
        Self {
            state: Mutex::new(ContainerState {
                dimensions,
                applied_size: None,
                built: false,
                scroll_top: 0.0,
                scroll_height: 0.0,
                controls: Vec::new(),
                lazy_pages: Vec::new(),
                watchers: Vec::new(),
                stats: ContainerStats::default(),
            }),
            next_watch: AtomicU64::new(1),
        }
    }

    pub fn set_dimensions(&self, dimensions: ContainerDimensions) {
        self.state.lock().dimensions = dimensions;
    }

    pub fn stats(&self) -> ContainerStats {
        self.state.lock().stats
    }

    pub fn applied_size(&self) -> Option<(f64, f64)> {
        self.state.lock().applied_size
    }

    pub fn is_built(&self) -> bool {
        self.state.lock().built
    }

    pub fn scroll_top(&self) -> f64 {
        self.state.lock().scroll_top
    }

    pub fn set_scroll_height(&self, height: f64) {
        self.state.lock().scroll_height = height;
    }

    pub fn watcher_count(&self) -> usize {
        self.state.lock().watchers.len()
    }

    /// Add controls immediately and notify structural watchers
    pub fn insert_controls(&self, controls: Vec<Arc<MemoryControl>>) {
        let mut state = self.state.lock();
        let added = controls.len();
        state.controls.extend(controls);
        if added > 0 {
            state.notify_structure(added);
        }
    }

    /// Register controls that appear once `offset` scrolls into view
    pub fn defer_page(&self, offset: f64, controls: Vec<Arc<MemoryControl>>) {
        self.state.lock().lazy_pages.push(LazyPage { offset, controls });
    }

    pub fn pending_pages(&self) -> usize {
        self.state.lock().lazy_pages.len()
    }

    /// Materialize deferred pages already inside the viewport
    pub fn render_visible(&self) -> usize {
        self.state.lock().materialize_visible()
    }

    pub fn memory_controls(&self) -> Vec<Arc<MemoryControl>> {
        self.state.lock().controls.clone()
    }

    /// First control carrying `name`
    pub fn control(&self, name: &str) -> Option<Arc<MemoryControl>> {
        self.state
            .lock()
            .controls
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .cloned()
    }
}

impl HostContainer for MemoryContainer {
    fn dimensions(&self) -> ContainerDimensions {
        self.state.lock().dimensions
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.controls.clear();
        state.lazy_pages.clear();
        state.built = false;
        state.applied_size = None;
        state.scroll_top = 0.0;
        state.scroll_height = 0.0;
        state.stats.clears += 1;
    }

    fn rebuild(&self) {
        let mut state = self.state.lock();
        state.controls.clear();
        state.lazy_pages.clear();
        state.built = true;
        state.stats.rebuilds += 1;
    }

    fn apply_size(&self, width: f64, height: f64) {
        let mut state = self.state.lock();
        state.applied_size = Some((width, height));
        state.stats.resizes += 1;
    }

    fn scroll_height(&self) -> f64 {
        self.state.lock().scroll_height
    }

    fn scroll_to(&self, top: f64) {
        let mut state = self.state.lock();
        state.scroll_top = top.clamp(0.0, state.scroll_height.max(0.0));
        state.stats.scrolls += 1;
        state.materialize_visible();
    }

    fn controls(&self) -> Vec<Arc<dyn FieldControl>> {
        self.state
            .lock()
            .controls
            .iter()
            .map(|c| c.clone() as Arc<dyn FieldControl>)
            .collect()
    }

    fn watch_structure(&self, sink: HostEventSink) -> WatchId {
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::Relaxed));
        self.state.lock().watchers.push((id, sink));
        id
    }

    fn unwatch_structure(&self, id: WatchId) {
        self.state.lock().watchers.retain(|(wid, _)| *wid != id);
    }
}

// ============================================================================
// Rendering engine
// ============================================================================

/// Document served by the in-memory engine
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    pub pages: Vec<Vec<ControlSpec>>,
    pub page_height: f64,
    pub load_delay: Duration,
    pub render_delay: Duration,
    /// Load fails with this message when set
    pub failure: Option<String>,
}

impl MemoryDocument {
    pub fn new(pages: Vec<Vec<ControlSpec>>) -> Self {
        Self {
            pages,
            page_height: 1284.8,
            load_delay: Duration::from_millis(50),
            render_delay: Duration::from_millis(50),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn with_page_height(mut self, height: f64) -> Self {
        self.page_height = height;
        self
    }
}

/// Engine instance bound to a [`MemoryContainer`]
pub struct MemoryEngine {
    container: Arc<MemoryContainer>,
    documents: Arc<HashMap<String, MemoryDocument>>,
    loaded: Mutex<Option<MemoryDocument>>,
    destroyed: AtomicBool,
}

impl MemoryEngine {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderingEngine for MemoryEngine {
    async fn load_document(&self, locator: &str) -> Result<DocumentInfo, HostError> {
        let document = self
            .documents
            .get(locator)
            .cloned()
            .ok_or_else(|| HostError::Load(format!("Document not found: {}", locator)))?;

        tokio::time::sleep(document.load_delay).await;
        if self.is_destroyed() {
            return Err(HostError::Destroyed);
        }
        if let Some(message) = &document.failure {
            return Err(HostError::Load(message.clone()));
        }

        let info = DocumentInfo {
            locator: locator.to_string(),
            page_count: document.pages.len(),
        };
        *self.loaded.lock() = Some(document);
        Ok(info)
    }

    async fn first_page_ready(&self) -> Result<(), HostError> {
        let document = self
            .loaded
            .lock()
            .clone()
            .ok_or_else(|| HostError::Render("No document loaded".to_string()))?;

        tokio::time::sleep(document.render_delay).await;
        if self.is_destroyed() {
            return Err(HostError::Destroyed);
        }

        self.container
            .set_scroll_height(document.page_height * document.pages.len() as f64);

        let mut pages = document.pages.iter().enumerate();
        if let Some((_, first)) = pages.next() {
            self.container
                .insert_controls(first.iter().map(ControlSpec::build).collect());
        }
        for (index, page) in pages {
            self.container.defer_page(
                document.page_height * index as f64,
                page.iter().map(ControlSpec::build).collect(),
            );
        }
        self.container.render_visible();
        Ok(())
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.loaded.lock().take();
    }
}

/// Factory producing engines for one [`MemoryContainer`]
///
/// The container handed to `create` is ignored in favour of the one the
/// factory was built with, since the engine needs its concrete type to
/// materialize controls.
pub struct MemoryEngineFactory {
    container: Arc<MemoryContainer>,
    documents: Arc<HashMap<String, MemoryDocument>>,
    worker_src: Mutex<Option<String>>,
    engines: Mutex<Vec<Arc<MemoryEngine>>>,
    create_failure: Option<String>,
    created: AtomicUsize,
}

impl MemoryEngineFactory {
    pub fn new(container: Arc<MemoryContainer>) -> Self {
        Self {
            container,
            documents: Arc::new(HashMap::new()),
            worker_src: Mutex::new(None),
            engines: Mutex::new(Vec::new()),
            create_failure: None,
            created: AtomicUsize::new(0),
        }
    }

    pub fn with_document(mut self, locator: &str, document: MemoryDocument) -> Self {
        Arc::make_mut(&mut self.documents).insert(locator.to_string(), document);
        self
    }

    /// Every `create` call fails with `message`
    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_failure = Some(message.to_string());
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn worker_src(&self) -> Option<String> {
        self.worker_src.lock().clone()
    }

    pub fn engines(&self) -> Vec<Arc<MemoryEngine>> {
        self.engines.lock().clone()
    }
}

impl EngineFactory for MemoryEngineFactory {
    fn configure_worker(&self, worker_src: &str) -> Result<(), HostError> {
        if worker_src.trim().is_empty() {
            return Err(HostError::Worker("empty worker source".to_string()));
        }
        *self.worker_src.lock() = Some(worker_src.to_string());
        Ok(())
    }

    fn create(
        &self,
        _container: Arc<dyn HostContainer>,
    ) -> Result<Arc<dyn RenderingEngine>, HostError> {
        if let Some(message) = &self.create_failure {
            return Err(HostError::Engine(message.clone()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let engine = Arc::new(MemoryEngine {
            container: self.container.clone(),
            documents: self.documents.clone(),
            loaded: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        });
        self.engines.lock().push(engine.clone());
        Ok(engine)
    }
}
