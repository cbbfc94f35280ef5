//! Document session controller
//!
//! Owns the loaded document, its overlays and the undo history, and drives
//! the PDF backend for every byte-level change. Structural page operations
//! are all-or-nothing: new bytes and the page count are obtained from the
//! backend first, and only then are bytes, overlays and page counters
//! replaced together and committed.
//!
//! Every failing operation reports its error through the notifier before
//! returning it.

use crate::backend::{Notifier, PageSize, PdfBackend, Severity};
use crate::config::EditorConfig;
use crate::elements::{ElementPayload, OverlayElement, Overlays, Position, Size, ALL_PAGES};
use crate::error::EditorError;
use crate::history::History;
use crate::renumber::PageEdit;
use std::sync::Arc;

/// The PDF being edited. Bytes are never mutated, only replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

/// State restored by undo/redo
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub overlays: Overlays,
    pub total_pages: u32,
    pub document: PdfDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    /// Export a flattened copy; the session is left as it is
    Download,
    /// Flatten into the session's own bytes
    InPlace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Download { file_name: String, bytes: Vec<u8> },
    InPlace { total_pages: u32 },
}

#[derive(Debug)]
struct DocumentSession {
    document: PdfDocument,
    overlays: Overlays,
    total_pages: u32,
    current_page: u32,
    history: History<Snapshot>,
    /// In-place edits made since the last commit
    dirty: bool,
}

impl DocumentSession {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            overlays: self.overlays.clone(),
            total_pages: self.total_pages,
            document: self.document.clone(),
        }
    }

    /// Commit pending in-place edits so the next commit does not swallow them
    fn checkpoint(&mut self) {
        if self.dirty {
            self.commit();
        }
    }

    fn commit(&mut self) {
        let snapshot = self.snapshot();
        self.history.commit(snapshot);
        self.dirty = false;
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.overlays = snapshot.overlays;
        self.total_pages = snapshot.total_pages;
        self.document = snapshot.document;
        self.current_page = self.current_page.clamp(1, self.total_pages.max(1));
    }

    fn check_page(&self, page: u32) -> Result<(), EditorError> {
        if page == 0 || page > self.total_pages {
            return Err(EditorError::InvalidPageIndex {
                page,
                total: self.total_pages,
            });
        }
        Ok(())
    }

    /// Elements may sit on any existing page; page numbers also on every page
    fn check_anchor(&self, element: &OverlayElement) -> Result<(), EditorError> {
        match element {
            OverlayElement::PageNumber(p) if p.page == ALL_PAGES => Ok(()),
            _ => self.check_page(element.page()),
        }
    }
}

/// Editing controller the UI layer talks to
pub struct DocumentEditor<B: PdfBackend, N: Notifier> {
    backend: B,
    notifier: N,
    config: EditorConfig,
    session: Option<DocumentSession>,
}

impl<B: PdfBackend, N: Notifier> DocumentEditor<B, N> {
    pub fn new(backend: B, notifier: N) -> Self {
        Self::with_config(backend, notifier, EditorConfig::default())
    }

    pub fn with_config(backend: B, notifier: N, config: EditorConfig) -> Self {
        Self {
            backend,
            notifier,
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn report<T>(&self, result: Result<T, EditorError>) -> Result<T, EditorError> {
        if let Err(err) = &result {
            tracing::debug!(error = ?err, "Editor operation failed");
            self.notifier.notify(&err.to_string(), Severity::Error);
        }
        result
    }

    fn session(&self) -> Result<&DocumentSession, EditorError> {
        self.session.as_ref().ok_or(EditorError::NoDocumentLoaded)
    }

    fn session_mut(&mut self) -> Result<&mut DocumentSession, EditorError> {
        self.session.as_mut().ok_or(EditorError::NoDocumentLoaded)
    }

    // ============ Document lifecycle ============

    /// Start a fresh session for `bytes`. The page count is read from the
    /// backend; if that fails the document stays loaded as a single page
    /// and the error is returned.
    pub fn load_document(
        &mut self,
        name: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<(), EditorError> {
        let document = PdfDocument {
            name: name.to_string(),
            bytes: bytes.into(),
        };
        let page_count = self.backend.page_count(&document.bytes);

        let mut session = DocumentSession {
            history: History::with_limit(
                Snapshot {
                    overlays: Overlays::new(),
                    total_pages: 1,
                    document: document.clone(),
                },
                self.config.history_limit,
            ),
            document,
            overlays: Overlays::new(),
            total_pages: 1,
            current_page: 1,
            dirty: false,
        };

        let result = match page_count {
            Ok(count) => {
                session.total_pages = count.max(1);
                Ok(())
            }
            Err(err) => Err(EditorError::from(err)),
        };
        let baseline = session.snapshot();
        session.history.reset(baseline);

        tracing::info!(name, total_pages = session.total_pages, "Loaded document");
        self.session = Some(session);

        if result.is_ok() {
            self.notifier
                .notify(&format!("Loaded document: {}", name), Severity::Success);
        }
        self.report(result)
    }

    /// Drop the current session
    pub fn close_document(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(name = %session.document.name, "Closed document");
        }
    }

    /// Flatten every overlay into the document, either as a download or
    /// into the session's own bytes
    pub fn save_document(&mut self, target: SaveTarget) -> Result<SaveOutcome, EditorError> {
        let result = self.try_save(target);
        self.report(result)
    }

    fn try_save(&mut self, target: SaveTarget) -> Result<SaveOutcome, EditorError> {
        let geometry = self.config.viewer_geometry();
        let session = self.session.as_mut().ok_or(EditorError::NoDocumentLoaded)?;
        let flattened = self.backend.flatten(
            &session.document.bytes,
            &session.overlays,
            session.total_pages,
            &geometry,
        )?;

        match target {
            SaveTarget::Download => {
                let file_name = self.config.download_name(&session.document.name);
                tracing::info!(file_name = %file_name, "Exported document");
                self.notifier
                    .notify(&format!("Downloaded {}", file_name), Severity::Success);
                Ok(SaveOutcome::Download {
                    file_name,
                    bytes: flattened,
                })
            }
            SaveTarget::InPlace => {
                let total_pages = self.backend.page_count(&flattened)?;
                session.checkpoint();
                session.document.bytes = Arc::from(flattened);
                session.overlays = Overlays::new();
                session.total_pages = total_pages.max(1);
                session.current_page = session.current_page.clamp(1, session.total_pages);
                session.commit();
                tracing::info!(total_pages, "Saved document in place");
                self.notifier.notify("Document saved", Severity::Success);
                Ok(SaveOutcome::InPlace { total_pages })
            }
        }
    }

    // ============ Elements ============

    /// Create an element from `payload` on `page` and return its id
    pub fn add_element(
        &mut self,
        payload: ElementPayload,
        page: u32,
        position: Position,
        size: Size,
    ) -> Result<String, EditorError> {
        let result = self.try_add_element(payload, page, position, size);
        self.report(result)
    }

    fn try_add_element(
        &mut self,
        payload: ElementPayload,
        page: u32,
        position: Position,
        size: Size,
    ) -> Result<String, EditorError> {
        let session = self.session_mut()?;
        let element = OverlayElement::create(payload, page, position, size)?;
        session.check_anchor(&element)?;

        let id = element.id().to_string();
        let kind = element.kind_name();
        session.checkpoint();
        session.overlays.push(element);
        session.commit();

        tracing::debug!(id = %id, kind, page, "Added element");
        self.notifier
            .notify(&format!("Added {}", kind), Severity::Success);
        Ok(id)
    }

    pub fn remove_element(&mut self, id: &str) -> Result<OverlayElement, EditorError> {
        let result = self.try_remove_element(id);
        self.report(result)
    }

    fn try_remove_element(&mut self, id: &str) -> Result<OverlayElement, EditorError> {
        let session = self.session_mut()?;
        if !session.overlays.contains(id) {
            return Err(EditorError::ElementNotFound(id.to_string()));
        }
        session.checkpoint();
        let removed = session
            .overlays
            .remove(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.to_string()))?;
        session.commit();
        tracing::debug!(id, kind = removed.kind_name(), "Removed element");
        Ok(removed)
    }

    /// Replace an element's content by id. Not committed to history.
    pub fn update_element(&mut self, element: OverlayElement) -> Result<(), EditorError> {
        let result = self.try_update_element(element);
        self.report(result)
    }

    fn try_update_element(&mut self, element: OverlayElement) -> Result<(), EditorError> {
        let session = self.session_mut()?;
        element.validate()?;
        session.check_anchor(&element)?;
        let id = element.id().to_string();
        if !session.overlays.replace(element) {
            return Err(EditorError::ElementNotFound(id));
        }
        session.dirty = true;
        Ok(())
    }

    /// Drag an element. Not committed to history.
    pub fn move_element(&mut self, id: &str, position: Position) -> Result<(), EditorError> {
        let result = self.session_mut().and_then(|session| {
            if !session.overlays.set_position(id, position) {
                return Err(EditorError::ElementNotFound(id.to_string()));
            }
            session.dirty = true;
            Ok(())
        });
        self.report(result)
    }

    /// Resize a signature or image. Not committed to history.
    pub fn resize_element(&mut self, id: &str, size: Size) -> Result<(), EditorError> {
        let result = self.session_mut().and_then(|session| {
            if size.width <= 0.0 || size.height <= 0.0 {
                return Err(EditorError::InvalidElement(format!(
                    "Size must be positive, got {}x{}",
                    size.width, size.height
                )));
            }
            if session.overlays.set_size(id, size) {
                session.dirty = true;
                Ok(())
            } else if session.overlays.contains(id) {
                Err(EditorError::InvalidElement(
                    "Page numbers cannot be resized".to_string(),
                ))
            } else {
                Err(EditorError::ElementNotFound(id.to_string()))
            }
        });
        self.report(result)
    }

    pub fn element(&self, id: &str) -> Option<OverlayElement> {
        self.session.as_ref().and_then(|s| s.overlays.get(id))
    }

    /// Elements drawn on `page`, in z-order
    pub fn elements_on_page(&self, page: u32) -> Result<Vec<OverlayElement>, EditorError> {
        let result = self.session().and_then(|session| {
            session.check_page(page)?;
            Ok(session.overlays.on_page(page))
        });
        self.report(result)
    }

    // ============ Page structure ============

    /// Insert one blank A4 page after `after` (0 = at the front)
    pub fn add_page(&mut self, after: u32) -> Result<(), EditorError> {
        let result = self.insert_blank(after, 1);
        self.report(result)?;
        self.notifier.notify("Page added", Severity::Success);
        Ok(())
    }

    /// Insert `count` blank pages after `after`
    pub fn add_pages(&mut self, after: u32, count: u32) -> Result<(), EditorError> {
        let max = self.config.max_bulk_pages;
        let result = if count == 0 || count > max {
            Err(EditorError::ImportMismatch { count, max })
        } else {
            self.insert_blank(after, count)
        };
        self.report(result)?;
        self.notifier
            .notify(&format!("Added {} pages", count), Severity::Success);
        Ok(())
    }

    fn insert_blank(&mut self, after: u32, count: u32) -> Result<(), EditorError> {
        let size = PageSize {
            width: self.config.blank_page_width,
            height: self.config.blank_page_height,
        };
        let session = self.session()?;
        let edit = PageEdit::insert(after, count);
        edit.validate(session.total_pages)?;
        let bytes = self
            .backend
            .insert_blank_pages(&session.document.bytes, after, count, size)?;
        self.apply_page_edit(edit, bytes)
    }

    /// Copy every page of another PDF in after `after`.
    /// Returns the number of pages imported.
    pub fn add_pages_from_pdf(&mut self, source: &[u8], after: u32) -> Result<u32, EditorError> {
        let result = self.try_import(source, after);
        let count = self.report(result)?;
        self.notifier
            .notify(&format!("Imported {} pages", count), Severity::Success);
        Ok(count)
    }

    fn try_import(&mut self, source: &[u8], after: u32) -> Result<u32, EditorError> {
        let session = self.session()?;
        PageEdit::insert(after, 0).validate(session.total_pages)?;
        let (bytes, count) = self
            .backend
            .import_pages(&session.document.bytes, source, after)?;
        self.apply_page_edit(PageEdit::insert(after, count), bytes)?;
        Ok(count)
    }

    pub fn delete_page(&mut self, page: u32) -> Result<(), EditorError> {
        self.delete_pages(&[page])
    }

    /// Delete several pages at once. At least one page must remain.
    pub fn delete_pages(&mut self, pages: &[u32]) -> Result<(), EditorError> {
        let result = self.try_delete(pages);
        let count = self.report(result)?;
        let message = if count == 1 {
            "Page deleted".to_string()
        } else {
            format!("Deleted {} pages", count)
        };
        self.notifier.notify(&message, Severity::Success);
        Ok(())
    }

    fn try_delete(&mut self, pages: &[u32]) -> Result<usize, EditorError> {
        let session = self.session()?;
        let edit = PageEdit::delete(pages);
        edit.validate(session.total_pages)?;
        let doomed = match &edit {
            PageEdit::Delete(doomed) => doomed.clone(),
            _ => Vec::new(),
        };
        let bytes = self
            .backend
            .remove_pages(&session.document.bytes, &doomed)?;
        self.apply_page_edit(edit, bytes)?;
        Ok(doomed.len())
    }

    /// Move page `from` to position `to`. Elements travel with their page.
    pub fn reorder_pages(&mut self, from: u32, to: u32) -> Result<(), EditorError> {
        let result = self.try_reorder(from, to);
        let moved = self.report(result)?;
        if moved {
            self.notifier.notify("Page moved", Severity::Success);
        }
        Ok(())
    }

    fn try_reorder(&mut self, from: u32, to: u32) -> Result<bool, EditorError> {
        let session = self.session()?;
        let edit = PageEdit::move_page(from, to);
        edit.validate(session.total_pages)?;
        if from == to {
            return Ok(false);
        }
        let bytes = self
            .backend
            .move_page(&session.document.bytes, from, to)?;
        self.apply_page_edit(edit, bytes)?;
        Ok(true)
    }

    /// Adopt bytes produced by the backend for `edit`, together with the
    /// renumbered overlays and page counters, and commit
    fn apply_page_edit(&mut self, edit: PageEdit, bytes: Vec<u8>) -> Result<(), EditorError> {
        let new_total = self.backend.page_count(&bytes)?.max(1);
        let session = self.session_mut()?;

        let expected = edit.resulting_total(session.total_pages);
        if expected != new_total {
            tracing::warn!(expected, actual = new_total, "Backend page count differs");
        }

        session.checkpoint();
        session.overlays = edit.apply(&session.overlays);
        session.current_page = edit.current_page(session.current_page, new_total);
        session.total_pages = new_total;
        session.document.bytes = Arc::from(bytes);
        session.commit();

        tracing::debug!(edit = ?edit, total_pages = new_total, "Applied page edit");
        Ok(())
    }

    // ============ History ============

    /// Step back to the previous committed state. `Ok(false)` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let result = self.session_mut().map(|session| {
            session.checkpoint();
            match session.history.undo().cloned() {
                Some(snapshot) => {
                    session.restore(snapshot);
                    true
                }
                None => false,
            }
        });
        self.report(result)
    }

    /// Re-apply the state undone last. `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let result = self.session_mut().map(|session| {
            if session.dirty {
                // in-place edits after an undo start a new branch
                session.commit();
                return false;
            }
            match session.history.redo().cloned() {
                Some(snapshot) => {
                    session.restore(snapshot);
                    true
                }
                None => false,
            }
        });
        self.report(result)
    }

    pub fn can_undo(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.dirty || s.history.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.dirty && s.history.can_redo())
    }

    // ============ Navigation ============

    pub fn set_current_page(&mut self, page: u32) -> Result<(), EditorError> {
        let result = self.session_mut().and_then(|session| {
            session.check_page(page)?;
            session.current_page = page;
            Ok(())
        });
        self.report(result)
    }

    /// Page count reported by the viewer after it rendered the document.
    /// A count that would leave an element past the last page is refused.
    pub fn sync_page_count(&mut self, count: u32) -> Result<(), EditorError> {
        let result = self.session_mut().and_then(|session| {
            if count == 0 {
                return Err(EditorError::InvalidPageIndex {
                    page: 0,
                    total: session.total_pages,
                });
            }
            let anchored = session.overlays.max_page();
            if anchored > count {
                return Err(EditorError::InvalidPageIndex {
                    page: anchored,
                    total: count,
                });
            }
            if count == session.total_pages {
                return Ok(false);
            }
            tracing::info!(from = session.total_pages, to = count, "Viewer page count");
            session.total_pages = count;
            session.current_page = session.current_page.clamp(1, count);
            Ok(true)
        });
        if self.report(result)? {
            self.notifier
                .notify(&format!("Document has {} pages", count), Severity::Info);
        }
        Ok(())
    }

    // ============ Accessors ============

    pub fn has_document(&self) -> bool {
        self.session.is_some()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.document.name.as_str())
    }

    pub fn document_bytes(&self) -> Option<Arc<[u8]>> {
        self.session.as_ref().map(|s| Arc::clone(&s.document.bytes))
    }

    /// 0 when no document is loaded
    pub fn total_pages(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.total_pages)
    }

    /// 0 when no document is loaded
    pub fn current_page(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.current_page)
    }

    /// Size of a page of the current document in PDF points
    pub fn page_size(&self, page: u32) -> Result<PageSize, EditorError> {
        let result = self.session().and_then(|session| {
            session.check_page(page)?;
            Ok(self.backend.page_size(&session.document.bytes, page)?)
        });
        self.report(result)
    }

    pub fn overlays(&self) -> Option<&Overlays> {
        self.session.as_ref().map(|s| &s.overlays)
    }

    /// Snapshot of the live state (not necessarily committed)
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.session.as_ref().map(DocumentSession::snapshot)
    }
}
