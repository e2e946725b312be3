//! Canvas pages
//!
//! A page has pixel dimensions (used 1:1 as PDF points at export time),
//! a background descriptor and an ordered stack of layers.

use crate::{Color, Layer, BACKGROUND_LAYER_NAME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ruling style of a solid-color page background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStyle {
    #[default]
    Plain,
    Ruled,
    Squared,
    Dotted,
}

/// What sits behind a page's layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Background {
    /// Solid paper color with an optional ruling style. The ruling itself
    /// is stored as vector children of the "Background" layer.
    Solid {
        color: Color,
        style: BackgroundStyle,
    },
    /// A page of a previously imported PDF file supplies the visual
    /// background; the "Background" layer is not painted in this case.
    Pdf {
        /// File name of the imported source PDF
        source_file: String,
        /// 1-based page number within the source file
        page_number: usize,
    },
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid {
            color: Color::white(),
            style: BackgroundStyle::Plain,
        }
    }
}

/// A single canvas page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    /// Width in canvas pixels
    pub width: f64,
    /// Height in canvas pixels
    pub height: f64,
    pub background: Background,
    /// Layers in bottom-to-top paint order
    pub layers: Vec<Layer>,
}

impl Page {
    /// Create a page with a plain white background and an empty
    /// background layer plus one drawing layer.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            background: Background::default(),
            layers: vec![Layer::background(), Layer::new("Layer 1")],
        }
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = layers;
        self
    }

    /// The layer named "Background", if present
    pub fn background_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == BACKGROUND_LAYER_NAME)
    }

    /// Whether this page draws an imported PDF page behind its layers
    pub fn has_pdf_background(&self) -> bool {
        matches!(self.background, Background::Pdf { .. })
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_has_background_layer() {
        let page = Page::new(800.0, 600.0);
        assert!(page.background_layer().is_some());
        assert!(!page.has_pdf_background());
    }

    #[test]
    fn test_pdf_background() {
        let page = Page::new(612.0, 792.0).with_background(Background::Pdf {
            source_file: "lecture.pdf".to_string(),
            page_number: 3,
        });
        assert!(page.has_pdf_background());
    }
}
