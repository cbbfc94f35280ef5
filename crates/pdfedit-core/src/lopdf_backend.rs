//! `PdfBackend` implemented on top of lopdf

use crate::backend::{PageSize, PdfBackend};
use crate::coords::ViewerGeometry;
use crate::elements::Overlays;
use crate::error::PdfServiceError;
use crate::flatten::flatten_overlays;
use crate::page_tree::{
    absorb_document, load, new_blank_page, page_ids, page_size, rewrite_page_tree, save,
};
use lopdf::ObjectId;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn check_page(page: u32, total: usize) -> Result<(), PdfServiceError> {
    if page == 0 || page as usize > total {
        return Err(PdfServiceError::OperationError(format!(
            "Page {} out of range (document has {} pages)",
            page, total
        )));
    }
    Ok(())
}

fn check_insertion_point(after: u32, total: usize) -> Result<(), PdfServiceError> {
    if after as usize > total {
        return Err(PdfServiceError::OperationError(format!(
            "Cannot insert after page {} (document has {} pages)",
            after, total
        )));
    }
    Ok(())
}

fn splice(pages: &mut Vec<ObjectId>, after: u32, new_pages: Vec<ObjectId>) {
    let at = after as usize;
    pages.splice(at..at, new_pages);
}

impl PdfBackend for LopdfBackend {
    fn page_count(&self, bytes: &[u8]) -> Result<u32, PdfServiceError> {
        let doc = load(bytes)?;
        Ok(doc.get_pages().len() as u32)
    }

    fn page_size(&self, bytes: &[u8], page: u32) -> Result<PageSize, PdfServiceError> {
        let doc = load(bytes)?;
        let pages = page_ids(&doc);
        check_page(page, pages.len())?;
        Ok(page_size(&doc, pages[page as usize - 1]))
    }

    fn insert_blank_pages(
        &self,
        bytes: &[u8],
        after: u32,
        count: u32,
        size: PageSize,
    ) -> Result<Vec<u8>, PdfServiceError> {
        let mut doc = load(bytes)?;
        let mut pages = page_ids(&doc);
        check_insertion_point(after, pages.len())?;

        let blanks = (0..count).map(|_| new_blank_page(&mut doc, size)).collect();
        splice(&mut pages, after, blanks);
        rewrite_page_tree(&mut doc, &pages)?;

        tracing::debug!(after, count, "Inserted blank pages");
        save(doc)
    }

    fn remove_pages(&self, bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfServiceError> {
        let mut doc = load(bytes)?;
        let current = page_ids(&doc);
        let doomed: BTreeSet<u32> = pages.iter().copied().collect();
        for &page in &doomed {
            check_page(page, current.len())?;
        }
        if doomed.len() >= current.len() {
            return Err(PdfServiceError::OperationError(
                "Cannot remove every page".into(),
            ));
        }

        let kept: Vec<ObjectId> = current
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !doomed.contains(&(*i as u32 + 1)))
            .map(|(_, id)| id)
            .collect();
        rewrite_page_tree(&mut doc, &kept)?;
        let pruned = doc.prune_objects();

        tracing::debug!(removed = doomed.len(), pruned = pruned.len(), "Removed pages");
        save(doc)
    }

    fn move_page(&self, bytes: &[u8], from: u32, to: u32) -> Result<Vec<u8>, PdfServiceError> {
        let mut doc = load(bytes)?;
        let mut pages = page_ids(&doc);
        check_page(from, pages.len())?;
        check_page(to, pages.len())?;

        let page = pages.remove(from as usize - 1);
        pages.insert(to as usize - 1, page);
        rewrite_page_tree(&mut doc, &pages)?;

        tracing::debug!(from, to, "Moved page");
        save(doc)
    }

    fn import_pages(
        &self,
        bytes: &[u8],
        source: &[u8],
        after: u32,
    ) -> Result<(Vec<u8>, u32), PdfServiceError> {
        let mut doc = load(bytes)?;
        let source = load(source)?;
        let mut pages = page_ids(&doc);
        check_insertion_point(after, pages.len())?;

        let imported = absorb_document(&mut doc, source);
        if imported.is_empty() {
            return Err(PdfServiceError::OperationError(
                "Source document has no pages".into(),
            ));
        }
        let count = imported.len() as u32;
        splice(&mut pages, after, imported);
        rewrite_page_tree(&mut doc, &pages)?;
        // drops the source's catalog and page tree nodes
        doc.prune_objects();

        tracing::debug!(after, count, "Imported pages");
        Ok((save(doc)?, count))
    }

    fn flatten(
        &self,
        bytes: &[u8],
        overlays: &Overlays,
        total_pages: u32,
        geometry: &ViewerGeometry,
    ) -> Result<Vec<u8>, PdfServiceError> {
        let mut doc = load(bytes)?;
        flatten_overlays(&mut doc, overlays, total_pages, geometry)?;
        save(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_tree::test_pdf::{create_nested_pdf, create_test_pdf};
    use pretty_assertions::assert_eq;

    const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    /// "Page N" label found in each page's content, or "blank"
    fn page_labels(bytes: &[u8]) -> Vec<String> {
        let doc = load(bytes).unwrap();
        page_ids(&doc)
            .into_iter()
            .map(|id| {
                let content = doc.get_page_content(id).unwrap_or_default();
                let text = String::from_utf8_lossy(&content).to_string();
                match text.find("(Page ") {
                    Some(start) => {
                        let rest = &text[start + 1..];
                        rest[..rest.find(')').unwrap()].to_string()
                    }
                    None => "blank".to_string(),
                }
            })
            .collect()
    }

    #[test]
    fn test_page_count() {
        let backend = LopdfBackend::new();
        assert_eq!(backend.page_count(&create_test_pdf(4)).unwrap(), 4);
        assert!(matches!(
            backend.page_count(b"not a pdf"),
            Err(PdfServiceError::ParseError(_))
        ));
    }

    #[test]
    fn test_page_size_reads_media_box() {
        let backend = LopdfBackend::new();
        let size = backend.page_size(&create_test_pdf(2), 2).unwrap();
        assert_eq!(size, PageSize {
            width: 612.0,
            height: 792.0
        });
        assert!(backend.page_size(&create_test_pdf(2), 3).is_err());
    }

    #[test]
    fn test_insert_blank_pages_in_middle() {
        let backend = LopdfBackend::new();
        let out = backend
            .insert_blank_pages(&create_test_pdf(3), 1, 2, A4)
            .unwrap();
        assert_eq!(
            page_labels(&out),
            vec!["Page 1", "blank", "blank", "Page 2", "Page 3"]
        );
        let size = backend.page_size(&out, 2).unwrap();
        assert!((size.width - 595.28).abs() < 0.01);
    }

    #[test]
    fn test_insert_at_front_and_end() {
        let backend = LopdfBackend::new();
        let front = backend
            .insert_blank_pages(&create_test_pdf(2), 0, 1, A4)
            .unwrap();
        assert_eq!(page_labels(&front), vec!["blank", "Page 1", "Page 2"]);

        let end = backend
            .insert_blank_pages(&create_test_pdf(2), 2, 1, A4)
            .unwrap();
        assert_eq!(page_labels(&end), vec!["Page 1", "Page 2", "blank"]);

        assert!(backend
            .insert_blank_pages(&create_test_pdf(2), 3, 1, A4)
            .is_err());
    }

    #[test]
    fn test_remove_pages() {
        let backend = LopdfBackend::new();
        let out = backend.remove_pages(&create_test_pdf(5), &[2, 4]).unwrap();
        assert_eq!(page_labels(&out), vec!["Page 1", "Page 3", "Page 5"]);
    }

    #[test]
    fn test_remove_every_page_fails() {
        let backend = LopdfBackend::new();
        assert!(backend.remove_pages(&create_test_pdf(2), &[1, 2]).is_err());
        assert!(backend.remove_pages(&create_test_pdf(2), &[3]).is_err());
    }

    #[test]
    fn test_move_page_forward_and_back() {
        let backend = LopdfBackend::new();
        let forward = backend.move_page(&create_test_pdf(4), 1, 3).unwrap();
        assert_eq!(
            page_labels(&forward),
            vec!["Page 2", "Page 3", "Page 1", "Page 4"]
        );

        let back = backend.move_page(&create_test_pdf(4), 4, 2).unwrap();
        assert_eq!(
            page_labels(&back),
            vec!["Page 1", "Page 4", "Page 2", "Page 3"]
        );
    }

    #[test]
    fn test_move_page_in_nested_tree_keeps_size() {
        let backend = LopdfBackend::new();
        let out = backend.move_page(&create_nested_pdf(), 2, 1).unwrap();
        assert_eq!(backend.page_count(&out).unwrap(), 2);
        let size = backend.page_size(&out, 1).unwrap();
        assert_eq!((size.width, size.height), (595.0, 842.0));
    }

    #[test]
    fn test_import_pages() {
        let backend = LopdfBackend::new();
        let (out, count) = backend
            .import_pages(&create_test_pdf(2), &create_test_pdf(3), 1)
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            page_labels(&out),
            vec!["Page 1", "Page 1", "Page 2", "Page 3", "Page 2"]
        );
    }

    #[test]
    fn test_import_garbage_fails() {
        let backend = LopdfBackend::new();
        let result = backend.import_pages(&create_test_pdf(2), b"garbage", 0);
        assert!(matches!(result, Err(PdfServiceError::ParseError(_))));
    }

    #[test]
    fn test_flatten_without_overlays_keeps_pages() {
        let backend = LopdfBackend::new();
        let out = backend
            .flatten(
                &create_test_pdf(3),
                &Overlays::new(),
                3,
                &ViewerGeometry::default(),
            )
            .unwrap();
        assert_eq!(backend.page_count(&out).unwrap(), 3);
    }
}
