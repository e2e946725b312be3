//! Drawable elements
//!
//! Elements are the leaves of the page/layer tree. The set is closed:
//! paths (SVG-style path data), text runs, and embedded raster images.
//! Content from a newer file revision that this build does not understand
//! is preserved as `Unsupported` so the exporter can refuse it explicitly
//! instead of dropping it.

use crate::{Color, Point, Rect};
use serde::{Deserialize, Serialize};

/// Font slant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// A stroked vector path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathElement {
    /// SVG-style path data ("M 10 20 L 30 40 ...")
    pub data: String,
    /// Stroke color
    pub color: Color,
    /// Stroke opacity, 0.0 to 1.0
    pub opacity: f64,
    /// Stroke width in canvas pixels
    pub stroke_width: f64,
}

impl PathElement {
    pub fn new(data: impl Into<String>, color: Color, stroke_width: f64) -> Self {
        Self {
            data: data.into(),
            color,
            opacity: 1.0,
            stroke_width,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// A single-line text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    /// Top-left anchor of the text box in canvas coordinates
    pub pos: Point,
    pub font_family: String,
    pub font_size: f64,
    #[serde(default)]
    pub style: FontStyle,
    #[serde(default)]
    pub weight: FontWeight,
    pub color: Color,
}

impl TextElement {
    pub fn new(text: impl Into<String>, pos: Point, font_family: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos,
            font_family: font_family.into(),
            font_size: 12.0,
            style: FontStyle::Normal,
            weight: FontWeight::Normal,
            color: Color::black(),
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_style(mut self, style: FontStyle, weight: FontWeight) -> Self {
        self.style = style;
        self.weight = weight;
        self
    }
}

/// An embedded raster image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    /// Placement rectangle in canvas coordinates
    pub rect: Rect,
    /// Declared mime type ("image/png", "image/jpeg"). The exporter sniffs
    /// the payload and trusts the magic bytes over this field.
    pub mime: String,
    /// Raw encoded image bytes (base64 in the native file format)
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ImageElement {
    pub fn new(rect: Rect, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            rect,
            mime: mime.into(),
            data,
        }
    }
}

/// A drawable element on a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Path(PathElement),
    Text(TextElement),
    Image(ImageElement),
    /// Content this build cannot interpret. Kept so a save/load cycle does
    /// not lose it; export refuses documents containing it.
    Unsupported { kind: String },
}

impl Element {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &str {
        match self {
            Element::Path(_) => "path",
            Element::Text(_) => "text",
            Element::Image(_) => "image",
            Element::Unsupported { kind } => kind,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind() {
        let path = Element::Path(PathElement::new("M 0 0", Color::black(), 1.0));
        assert_eq!(path.kind(), "path");

        let unknown = Element::Unsupported {
            kind: "hologram".to_string(),
        };
        assert_eq!(unknown.kind(), "hologram");
    }

    #[test]
    fn test_opacity_clamped() {
        let path = PathElement::new("M 0 0", Color::black(), 1.0).with_opacity(1.5);
        assert_eq!(path.opacity, 1.0);
    }

    #[test]
    fn test_image_payload_round_trips_as_base64() {
        let image = Element::Image(ImageElement::new(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            "image/png",
            vec![0x89, b'P', b'N', b'G'],
        ));

        let json = serde_json::to_string(&image).unwrap();
        assert!(json.contains("iVBORw"));

        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }
}
