//! Native document format
//!
//! The app's own save format is pretty-printed JSON of the canvas model.
//! Image payloads are carried base64-encoded by the model's serde impls.

use crate::{Result, StoreError};
use canvas_model::Document;
use std::path::Path;

/// Serialize a document to the native JSON format
pub fn serialize(document: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Deserialize a document from the native JSON format
pub fn deserialize(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

/// Save a document to a file
pub async fn save_document(document: &Document, path: impl AsRef<Path>) -> Result<()> {
    let json = serialize(document)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Load a document from a file
pub async fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }

    let json = tokio::fs::read_to_string(path).await?;
    deserialize(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::{Color, Element, Page, PathElement};

    #[test]
    fn test_serialize_round_trip() {
        let mut doc = Document::new("Trip notes");
        let mut page = Page::new(800.0, 600.0);
        page.layers[1].add_element(Element::Path(PathElement::new(
            "M 10 10 L 20 20",
            Color::black(),
            2.0,
        )));
        doc.add_page(page);

        let json = serialize(&doc).unwrap();
        let back = deserialize(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.ilf");

        let mut doc = Document::new("Saved");
        doc.add_page(Page::new(612.0, 792.0));

        save_document(&doc, &path).await.unwrap();
        let loaded = load_document(&path).await.unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_load_missing() {
        assert!(matches!(
            load_document("/nonexistent/doc.ilf").await,
            Err(StoreError::FileNotFound(_))
        ));
    }
}
