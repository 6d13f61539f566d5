//! Character sheet editor
//!
//! Ties a viewer to the record store: persisted values become the viewer's
//! initial values, collected values are saved back. Collaborator errors
//! are returned unchanged.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::collaborators::{AuthProvider, CharacterRecord, CollaboratorError, RecordStore};
use crate::sync::FieldValueMap;
use crate::viewer::{ViewerLifecycleController, ViewerState};

/// Errors raised by [`SheetEditor`]
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Saving needs a `Ready` viewer; any other state would persist an
    /// empty value map over the stored one
    #[error("Viewer is not ready to save (state: {0:?})")]
    ViewerNotReady(ViewerState),
}

pub type Result<T> = std::result::Result<T, EditorError>;

pub struct SheetEditor {
    store: Arc<dyn RecordStore>,
    auth: Arc<dyn AuthProvider>,
    record_id: Option<Uuid>,
}

impl SheetEditor {
    pub fn new(store: Arc<dyn RecordStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            store,
            auth,
            record_id: None,
        }
    }

    /// Record the viewer is currently bound to
    pub fn record_id(&self) -> Option<Uuid> {
        self.record_id
    }

    /// Start a blank sheet
    pub fn new_sheet(&mut self, viewer: &mut ViewerLifecycleController) {
        self.record_id = None;
        viewer.set_initial_values(FieldValueMap::new());
    }

    /// Load a record and push its values into the viewer
    pub async fn open(
        &mut self,
        viewer: &mut ViewerLifecycleController,
        record_id: Uuid,
    ) -> Result<FieldValueMap> {
        let values = self.store.load(record_id).await?;
        tracing::info!(record_id = %record_id, fields = values.len(), "Opened character record");

        viewer.set_initial_values(values.clone());
        self.record_id = Some(record_id);
        Ok(values)
    }

    /// Save the viewer's current values, creating the record on first save
    ///
    /// Refused unless the viewer is `Ready`.
    pub async fn save(&mut self, viewer: &ViewerLifecycleController) -> Result<CharacterRecord> {
        self.require_user()?;
        let state = viewer.state();
        if !state.is_ready() {
            tracing::warn!(record_id = ?self.record_id, state = ?state, "Refusing to save before viewer is ready");
            return Err(EditorError::ViewerNotReady(state));
        }
        let values = viewer.collect_values();
        let record = self.store.save(values, self.record_id).await?;
        self.record_id = Some(record.id);
        Ok(record)
    }

    /// Delete the bound record; a no-op for unsaved sheets
    pub async fn delete(&mut self) -> Result<()> {
        self.require_user()?;
        let Some(record_id) = self.record_id else {
            return Ok(());
        };
        self.store.delete(record_id).await?;
        self.record_id = None;
        Ok(())
    }

    fn require_user(&self) -> Result<()> {
        match self.auth.current_user() {
            Some(_) => Ok(()),
            None => Err(CollaboratorError::Unauthenticated.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{AuthUser, MemoryRecordStore, StaticAuth};
    use crate::config::ViewerConfig;
    use crate::host::memory::{ControlSpec, MemoryContainer, MemoryDocument, MemoryEngineFactory};
    use crate::host::FieldControl;
    use crate::viewer::{ViewerEvent, ViewerProps, ViewerState};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn viewer() -> (
        ViewerLifecycleController,
        UnboundedReceiver<ViewerEvent>,
        Arc<MemoryContainer>,
    ) {
        let container = Arc::new(MemoryContainer::new(800.0, 600.0));
        let factory = MemoryEngineFactory::new(container.clone()).with_document(
            "sheet.pdf",
            MemoryDocument::new(vec![vec![
                ControlSpec::text("Name"),
                ControlSpec::text("Class"),
            ]]),
        );
        let (controller, events) = ViewerLifecycleController::new(
            ViewerConfig::default(),
            container.clone(),
            Arc::new(factory),
            ViewerProps::new("sheet.pdf"),
        );
        (controller, events, container)
    }

    async fn until_ready(controller: &ViewerLifecycleController) {
        let mut rx = controller.session().unwrap().subscribe();
        tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| *s == ViewerState::Ready))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_then_open_round_trip() {
        let store = Arc::new(MemoryRecordStore::new());
        let auth = Arc::new(StaticAuth::signed_in(AuthUser::new("user-1")));

        let (mut first, _events, container) = viewer();
        first.set_visible(true);
        until_ready(&first).await;
        container.control("Name").unwrap().type_text("Mialee");

        let mut editor = SheetEditor::new(store.clone(), auth.clone());
        let record = editor.save(&first).await.unwrap();
        assert_eq!(editor.record_id(), Some(record.id));
        assert_eq!(record.values["Name"], "Mialee");

        // second save updates in place
        container.control("Class").unwrap().type_text("Wizard");
        let updated = editor.save(&first).await.unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(store.len().await, 1);
        drop(first);

        let (mut second, _events, container) = viewer();
        let mut reader = SheetEditor::new(store.clone(), auth);
        let opened = reader.open(&mut second, record.id).await.unwrap();
        assert_eq!(opened["Class"], "Wizard");

        second.set_visible(true);
        until_ready(&second).await;
        assert_eq!(container.control("Name").unwrap().value(), "Mialee");
        assert_eq!(container.control("Class").unwrap().value(), "Wizard");
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_requires_sign_in() {
        let store = Arc::new(MemoryRecordStore::new());
        let auth = Arc::new(StaticAuth::signed_out());
        let (controller, _events, _container) = viewer();

        let mut editor = SheetEditor::new(store.clone(), auth);
        assert_eq!(
            editor.save(&controller).await,
            Err(EditorError::Collaborator(CollaboratorError::Unauthenticated))
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_missing_record_propagates() {
        let store = Arc::new(MemoryRecordStore::new());
        let auth = Arc::new(StaticAuth::signed_in(AuthUser::new("user-1")));
        let (mut controller, _events, _container) = viewer();
        let id = Uuid::new_v4();

        let mut editor = SheetEditor::new(store, auth);
        assert_eq!(
            editor.open(&mut controller, id).await,
            Err(EditorError::Collaborator(CollaboratorError::NotFound(id)))
        );
        assert_eq!(editor.record_id(), None);
        assert!(controller.props().initial_values.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_unbinds_record() {
        let store = Arc::new(MemoryRecordStore::new());
        let auth = Arc::new(StaticAuth::signed_in(AuthUser::new("user-1")));
        let (mut controller, _events, _container) = viewer();

        let mut editor = SheetEditor::new(store.clone(), auth);
        editor.delete().await.unwrap();

        controller.set_visible(true);
        until_ready(&controller).await;
        let record = editor.save(&controller).await.unwrap();
        editor.delete().await.unwrap();
        assert_eq!(editor.record_id(), None);
        assert!(store.get(record.id).await.is_none());

        editor.new_sheet(&mut controller);
        assert!(controller.props().initial_values.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_before_ready_keeps_stored_values() {
        let store = Arc::new(MemoryRecordStore::new());
        let auth = Arc::new(StaticAuth::signed_in(AuthUser::new("user-1")));
        let mut stored = FieldValueMap::new();
        stored.insert("Name".to_string(), "Tordek".to_string());
        let record = store.save(stored.clone(), None).await.unwrap();

        let (mut controller, _events, _container) = viewer();
        let mut editor = SheetEditor::new(store.clone(), auth);
        editor.open(&mut controller, record.id).await.unwrap();
        controller.set_visible(true);

        assert_eq!(
            editor.save(&controller).await,
            Err(EditorError::ViewerNotReady(ViewerState::AwaitingDimensions))
        );
        assert_eq!(store.load(record.id).await.unwrap(), stored);

        // torn down viewers are refused as well
        until_ready(&controller).await;
        controller.unmount();
        assert_eq!(
            editor.save(&controller).await,
            Err(EditorError::ViewerNotReady(ViewerState::TornDown))
        );
        assert_eq!(store.load(record.id).await.unwrap(), stored);
    }
}
