//! PDF Export Options

use serde::{Deserialize, Serialize};

/// Options for PDF export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfExportOptions {
    /// Document title; defaults to the document's own title
    #[serde(default)]
    pub title: Option<String>,
    /// Document author
    #[serde(default)]
    pub author: Option<String>,
    /// Whether to compress content streams
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Whether to include the bookmark tree as a PDF outline
    #[serde(default = "default_include_outline")]
    pub include_outline: bool,
}

fn default_compress() -> bool {
    true
}

fn default_include_outline() -> bool {
    true
}

impl Default for PdfExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            compress: true,
            include_outline: true,
        }
    }
}

impl PdfExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_outline(mut self, include_outline: bool) -> Self {
        self.include_outline = include_outline;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PdfExportOptions::default();
        assert!(options.compress);
        assert!(options.include_outline);
        assert!(options.title.is_none());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let options: PdfExportOptions = serde_json::from_str(r#"{"title":"Notes"}"#).unwrap();
        assert_eq!(options.title.as_deref(), Some("Notes"));
        assert!(options.compress);
    }

    #[test]
    fn test_builder() {
        let options = PdfExportOptions::new()
            .with_title("T")
            .with_author("A")
            .with_compression(false)
            .with_outline(false);
        assert_eq!(options.title.as_deref(), Some("T"));
        assert_eq!(options.author.as_deref(), Some("A"));
        assert!(!options.compress);
        assert!(!options.include_outline);
    }
}
