//! Document - ordered pages plus the outline tree and save metadata

use crate::{CanvasModelError, OutlineNode, Page, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Save metadata carried alongside the page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// A canvas document: ordered pages, the outline tree, save metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub meta: DocumentMeta,
    pub pages: Vec<Page>,
    /// Top-level outline entries; children nest below
    pub outline: Vec<OutlineNode>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            meta: DocumentMeta::new(title),
            pages: Vec::new(),
            outline: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&Page> {
        self.pages
            .get(index)
            .ok_or(CanvasModelError::PageNotFound(index))
    }

    /// Append a page at the end
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
        self.touch();
    }

    /// Insert a page before `index`; `index == len` appends
    pub fn insert_page(&mut self, index: usize, page: Page) -> Result<()> {
        if index > self.pages.len() {
            return Err(CanvasModelError::PageNotFound(index));
        }
        self.pages.insert(index, page);
        self.touch();
        Ok(())
    }

    pub fn remove_page(&mut self, index: usize) -> Result<Page> {
        if index >= self.pages.len() {
            return Err(CanvasModelError::PageNotFound(index));
        }
        let page = self.pages.remove(index);
        self.touch();
        Ok(page)
    }

    /// Move the page at `from` so it ends up at `to`
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.pages.len() {
            return Err(CanvasModelError::PageNotFound(from));
        }
        if to >= self.pages.len() {
            return Err(CanvasModelError::PageNotFound(to));
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        self.touch();
        Ok(())
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.meta.modified_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_pages(n: usize) -> Document {
        let mut doc = Document::new("Test");
        for _ in 0..n {
            doc.add_page(Page::new(800.0, 600.0));
        }
        doc
    }

    #[test]
    fn test_add_and_remove() {
        let mut doc = doc_with_pages(2);
        assert_eq!(doc.page_count(), 2);

        let removed = doc.remove_page(0).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_ne!(doc.pages[0].id, removed.id);

        assert!(doc.remove_page(5).is_err());
    }

    #[test]
    fn test_insert_page() {
        let mut doc = doc_with_pages(2);
        let page = Page::new(100.0, 100.0);
        let id = page.id;
        doc.insert_page(1, page).unwrap();
        assert_eq!(doc.pages[1].id, id);

        assert!(doc.insert_page(10, Page::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_move_page() {
        let mut doc = doc_with_pages(3);
        let ids: Vec<_> = doc.pages.iter().map(|p| p.id).collect();

        doc.move_page(0, 2).unwrap();
        assert_eq!(doc.pages[2].id, ids[0]);
        assert_eq!(doc.pages[0].id, ids[1]);

        assert!(doc.move_page(0, 9).is_err());
    }
}
