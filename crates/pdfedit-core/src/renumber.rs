//! Page-index renumbering for structural page edits
//!
//! Pure functions: given a page edit and the overlays before it, compute the
//! overlays and current page after it. Every non-zero element page stays
//! within `[1, total]` of the edited document.

use crate::elements::{Anchored, Overlays, ALL_PAGES};
use crate::error::EditorError;

/// A structural change to the page list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEdit {
    /// Remove pages; stored sorted descending without duplicates
    Delete(Vec<u32>),
    /// Insert `count` pages so the first new page becomes `after + 1`
    Insert { after: u32, count: u32 },
    /// Move page `from` so it ends up at index `to`
    Move { from: u32, to: u32 },
}

impl PageEdit {
    pub fn delete(pages: &[u32]) -> Self {
        let mut pages = pages.to_vec();
        pages.sort_unstable_by(|a, b| b.cmp(a));
        pages.dedup();
        PageEdit::Delete(pages)
    }

    pub fn insert(after: u32, count: u32) -> Self {
        PageEdit::Insert { after, count }
    }

    pub fn move_page(from: u32, to: u32) -> Self {
        PageEdit::Move { from, to }
    }

    /// Check the edit against a document of `total` pages
    pub fn validate(&self, total: u32) -> Result<(), EditorError> {
        match self {
            PageEdit::Delete(pages) => {
                if total <= 1 {
                    return Err(EditorError::LastPage);
                }
                if pages.is_empty() {
                    return Err(EditorError::InvalidPageIndex { page: 0, total });
                }
                if let Some(&page) = pages.iter().find(|&&p| p == 0 || p > total) {
                    return Err(EditorError::InvalidPageIndex { page, total });
                }
                if pages.len() as u32 >= total {
                    return Err(EditorError::LastPage);
                }
                Ok(())
            }
            PageEdit::Insert { after, .. } => {
                if *after > total {
                    return Err(EditorError::InvalidPageIndex {
                        page: *after,
                        total,
                    });
                }
                Ok(())
            }
            PageEdit::Move { from, to } => {
                for &page in [from, to] {
                    if page == 0 || page > total {
                        return Err(EditorError::InvalidPageIndex { page, total });
                    }
                }
                Ok(())
            }
        }
    }

    /// Page count after the edit
    pub fn resulting_total(&self, total: u32) -> u32 {
        match self {
            PageEdit::Delete(pages) => total.saturating_sub(pages.len() as u32),
            PageEdit::Insert { count, .. } => total + count,
            PageEdit::Move { .. } => total,
        }
    }

    /// Remap every element; elements on deleted pages are dropped
    pub fn apply(&self, overlays: &Overlays) -> Overlays {
        match self {
            PageEdit::Delete(pages) => pages
                .iter()
                .fold(overlays.clone(), |acc, &page| delete_page(&acc, page)),
            PageEdit::Insert { after, count } => insert_pages(overlays, *after, *count),
            PageEdit::Move { from, to } => move_page(overlays, *from, *to),
        }
    }

    /// Page shown after the edit, clamped to `[1, new_total]`
    pub fn current_page(&self, current: u32, new_total: u32) -> u32 {
        let next = match self {
            PageEdit::Delete(pages) => pages
                .iter()
                .fold(current, |cur, &page| current_after_delete(cur, page)),
            PageEdit::Insert { after, .. } => after + 1,
            PageEdit::Move { from, to } => moved_index(current, *from, *to),
        };
        next.clamp(1, new_total.max(1))
    }
}

fn current_after_delete(current: u32, deleted: u32) -> u32 {
    if deleted == current {
        deleted.saturating_sub(1).max(1)
    } else if deleted < current {
        current - 1
    } else {
        current
    }
}

/// Where `page` ends up when page `from` is moved to `to`
pub fn moved_index(page: u32, from: u32, to: u32) -> u32 {
    if page == ALL_PAGES {
        page
    } else if page == from {
        to
    } else if from < to && page > from && page <= to {
        page - 1
    } else if from > to && page < from && page >= to {
        page + 1
    } else {
        page
    }
}

fn remap<T, F>(items: &[T], f: F) -> Vec<T>
where
    T: Anchored + Clone,
    F: Fn(u32) -> Option<u32>,
{
    items
        .iter()
        .filter_map(|item| {
            f(item.page()).map(|page| {
                let mut item = item.clone();
                item.set_page(page);
                item
            })
        })
        .collect()
}

fn remap_all<F>(overlays: &Overlays, f: F) -> Overlays
where
    F: Fn(u32) -> Option<u32>,
{
    Overlays {
        signatures: remap(&overlays.signatures, &f),
        images: remap(&overlays.images, &f),
        page_numbers: remap(&overlays.page_numbers, &f),
    }
}

/// Drop elements on `deleted` and pull later pages down by one
pub fn delete_page(overlays: &Overlays, deleted: u32) -> Overlays {
    remap_all(overlays, |page| {
        if page == ALL_PAGES {
            Some(page)
        } else if page == deleted {
            None
        } else if page > deleted {
            Some(page - 1)
        } else {
            Some(page)
        }
    })
}

/// Push elements after `after` down by `count`
pub fn insert_pages(overlays: &Overlays, after: u32, count: u32) -> Overlays {
    remap_all(overlays, |page| {
        if page != ALL_PAGES && page > after {
            Some(page + count)
        } else {
            Some(page)
        }
    })
}

/// Follow the moved page and shift the pages it passed over
pub fn move_page(overlays: &Overlays, from: u32, to: u32) -> Overlays {
    remap_all(overlays, |page| Some(moved_index(page, from, to)))
}
