//! Layers - ordered groups of drawable elements
//!
//! A page paints its layers bottom-to-top. One layer per page is
//! conventionally named "Background" and receives special treatment at
//! export time (see the store crate's PDF exporter).

use crate::Element;
use serde::{Deserialize, Serialize};

/// Name of the layer that carries the page background content
pub const BACKGROUND_LAYER_NAME: &str = "Background";

/// An ordered group of drawable elements with a visibility flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub elements: Vec<Element>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            elements: Vec::new(),
        }
    }

    /// The conventional background layer
    pub fn background() -> Self {
        Self::new(BACKGROUND_LAYER_NAME)
    }

    pub fn is_background(&self) -> bool {
        self.name == BACKGROUND_LAYER_NAME
    }

    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}
