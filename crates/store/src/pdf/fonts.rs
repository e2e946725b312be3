//! Font Embedding Table
//!
//! The app ships a small closed set of font families; text elements pick
//! one by name plus style and weight. Every supported (family, variant)
//! combination is loaded from the static font assets and embedded exactly
//! once per exported document; duplicate font objects waste space and
//! confuse some readers. An unknown family is substituted by the default
//! family with a warning; failing to load font bytes aborts the export,
//! since text cannot be emitted without its font resource.

use super::document::PdfDocument;
use super::exporter::ExportError;
use super::objects::{ObjRef, PdfDictionary, PdfObject, PdfStream};
use canvas_model::{FontStyle, FontWeight};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// Ratio of line height to font size, used when positioning text
pub const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Font families the app ships assets for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFamily {
    Lato,
    Merriweather,
    Roboto,
    RobotoMono,
}

impl SupportedFamily {
    pub const ALL: [SupportedFamily; 4] = [
        SupportedFamily::Lato,
        SupportedFamily::Merriweather,
        SupportedFamily::Roboto,
        SupportedFamily::RobotoMono,
    ];

    /// Family substituted for unknown requests
    pub const DEFAULT: SupportedFamily = SupportedFamily::Lato;

    /// Match a user-facing family name, ignoring case and spacing
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "lato" => Some(SupportedFamily::Lato),
            "merriweather" => Some(SupportedFamily::Merriweather),
            "roboto" => Some(SupportedFamily::Roboto),
            "robotomono" => Some(SupportedFamily::RobotoMono),
            _ => None,
        }
    }

    /// Base of the PostScript and asset file names
    pub fn base_name(&self) -> &'static str {
        match self {
            SupportedFamily::Lato => "Lato",
            SupportedFamily::Merriweather => "Merriweather",
            SupportedFamily::Roboto => "Roboto",
            SupportedFamily::RobotoMono => "RobotoMono",
        }
    }

    fn is_monospace(&self) -> bool {
        matches!(self, SupportedFamily::RobotoMono)
    }

    /// Nominal glyph width in 1/1000 em. Exact metrics would need the
    /// font tables parsed; a per-family approximation is enough for
    /// viewers, which take advances from the embedded font program.
    fn approx_width(&self, bold: bool) -> i64 {
        let base = match self {
            SupportedFamily::Lato => 500,
            SupportedFamily::Merriweather => 540,
            SupportedFamily::Roboto => 500,
            SupportedFamily::RobotoMono => 600,
        };
        if bold && !self.is_monospace() {
            base + 20
        } else {
            base
        }
    }
}

/// Style/weight combination of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontVariant {
    pub italic: bool,
    pub bold: bool,
}

impl FontVariant {
    pub const ALL: [FontVariant; 4] = [
        FontVariant { italic: false, bold: false },
        FontVariant { italic: false, bold: true },
        FontVariant { italic: true, bold: false },
        FontVariant { italic: true, bold: true },
    ];

    pub fn from_attrs(style: FontStyle, weight: FontWeight) -> Self {
        Self {
            italic: style == FontStyle::Italic,
            bold: weight == FontWeight::Bold,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => "Regular",
            (true, false) => "Bold",
            (false, true) => "Italic",
            (true, true) => "BoldItalic",
        }
    }
}

/// Asset file name for a (family, variant) pair, e.g. "Lato-Bold.ttf"
pub fn asset_file_name(family: SupportedFamily, variant: FontVariant) -> String {
    format!("{}-{}.ttf", family.base_name(), variant.suffix())
}

/// Access to the static font assets
pub trait FontProvider {
    /// Load the raw TrueType bytes for a (family, variant) pair
    fn load(
        &self,
        family: SupportedFamily,
        variant: FontVariant,
    ) -> impl std::future::Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Font provider reading assets from a directory
#[derive(Debug, Clone)]
pub struct DirFontProvider {
    root: PathBuf,
}

impl DirFontProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FontProvider for DirFontProvider {
    async fn load(&self, family: SupportedFamily, variant: FontVariant) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.root.join(asset_file_name(family, variant))).await
    }
}

/// An embedded font, addressable from content streams by resource name
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    /// Resource name within page Font dictionaries ("F1", "F2", ...)
    pub res_name: String,
    pub obj_ref: ObjRef,
    pub family: SupportedFamily,
    pub variant: FontVariant,
}

/// Per-export table of embedded fonts
///
/// Scoped to a single export call; concurrent exports build their own
/// tables (see the exporter's cache notes).
#[derive(Debug)]
pub struct FontTable {
    fonts: HashMap<(SupportedFamily, FontVariant), EmbeddedFont>,
    order: Vec<(SupportedFamily, FontVariant)>,
}

impl FontTable {
    /// Load and embed every supported (family, variant) combination into
    /// the output document, once each.
    pub async fn embed_all(
        doc: &mut PdfDocument,
        provider: &impl FontProvider,
    ) -> Result<FontTable, ExportError> {
        let mut fonts = HashMap::new();
        let mut order = Vec::new();
        let mut counter = 0u32;

        for family in SupportedFamily::ALL {
            for variant in FontVariant::ALL {
                let bytes = provider.load(family, variant).await.map_err(|source| {
                    ExportError::FontLoad {
                        family: format!("{}-{}", family.base_name(), variant.suffix()),
                        source,
                    }
                })?;

                counter += 1;
                let res_name = format!("F{}", counter);
                let obj_ref = embed_font(doc, family, variant, bytes);

                fonts.insert(
                    (family, variant),
                    EmbeddedFont {
                        res_name,
                        obj_ref,
                        family,
                        variant,
                    },
                );
                order.push((family, variant));
            }
        }

        Ok(FontTable { fonts, order })
    }

    /// Look up the embedded font for a text element's attributes. Unknown
    /// families substitute the default family and log a warning; the
    /// produced PDF then renders a different typeface than requested.
    pub fn resolve(&self, family_name: &str, style: FontStyle, weight: FontWeight) -> &EmbeddedFont {
        let family = SupportedFamily::from_name(family_name).unwrap_or_else(|| {
            warn!(
                family = family_name,
                fallback = SupportedFamily::DEFAULT.base_name(),
                "unknown font family, substituting default"
            );
            SupportedFamily::DEFAULT
        });
        let variant = FontVariant::from_attrs(style, weight);
        &self.fonts[&(family, variant)]
    }

    /// The /Font resource dictionary shared by every exported page
    pub fn font_resources(&self) -> PdfDictionary {
        let mut dict = PdfDictionary::new();
        for key in &self.order {
            let font = &self.fonts[key];
            dict.insert_ref(font.res_name.clone(), font.obj_ref);
        }
        dict
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }
}

/// Build the font program, descriptor and font dictionary objects
fn embed_font(
    doc: &mut PdfDocument,
    family: SupportedFamily,
    variant: FontVariant,
    bytes: Vec<u8>,
) -> ObjRef {
    let base_font = format!("{}-{}", family.base_name(), variant.suffix());

    // FontFile2: the raw TrueType program
    let mut file_dict = PdfDictionary::new();
    file_dict.insert("Length1", PdfObject::int(bytes.len() as i64));
    let file_ref = doc.add_stream(PdfStream::new(bytes).with_dict(file_dict));

    // Descriptor with nominal metrics; viewers take real metrics from the
    // embedded program.
    let mut descriptor = PdfDictionary::new().with_type("FontDescriptor");
    descriptor.insert("FontName", PdfObject::name(base_font.clone()));
    let mut flags = 1 << 5; // nonsymbolic
    if family.is_monospace() {
        flags |= 1; // fixed pitch
    }
    if variant.italic {
        flags |= 1 << 6;
    }
    descriptor.insert("Flags", PdfObject::int(flags));
    descriptor.insert(
        "FontBBox",
        PdfObject::Array(vec![
            PdfObject::int(-200),
            PdfObject::int(-250),
            PdfObject::int(1200),
            PdfObject::int(1000),
        ]),
    );
    descriptor.insert(
        "ItalicAngle",
        PdfObject::int(if variant.italic { -12 } else { 0 }),
    );
    descriptor.insert("Ascent", PdfObject::int(800));
    descriptor.insert("Descent", PdfObject::int(-200));
    descriptor.insert("CapHeight", PdfObject::int(700));
    descriptor.insert(
        "StemV",
        PdfObject::int(if variant.bold { 160 } else { 80 }),
    );
    descriptor.insert_ref("FontFile2", file_ref);
    let descriptor_ref = doc.add_object(PdfObject::Dictionary(descriptor));

    // The font dictionary itself
    let mut font = PdfDictionary::new().with_type("Font");
    font.insert("Subtype", PdfObject::name("TrueType"));
    font.insert("BaseFont", PdfObject::name(base_font));
    font.insert("FirstChar", PdfObject::int(32));
    font.insert("LastChar", PdfObject::int(255));
    let width = family.approx_width(variant.bold);
    font.insert(
        "Widths",
        PdfObject::Array((32..=255).map(|_| PdfObject::int(width)).collect()),
    );
    font.insert("Encoding", PdfObject::name("WinAnsiEncoding"));
    font.insert_ref("FontDescriptor", descriptor_ref);
    doc.add_object(PdfObject::Dictionary(font))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider handing out placeholder bytes for every variant
    struct StubFontProvider;

    impl FontProvider for StubFontProvider {
        async fn load(
            &self,
            family: SupportedFamily,
            variant: FontVariant,
        ) -> io::Result<Vec<u8>> {
            Ok(asset_file_name(family, variant).into_bytes())
        }
    }

    /// Provider that always fails, for the fatal-path tests
    struct FailingFontProvider;

    impl FontProvider for FailingFontProvider {
        async fn load(&self, _: SupportedFamily, _: FontVariant) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "asset missing"))
        }
    }

    #[test]
    fn test_family_matching() {
        assert_eq!(SupportedFamily::from_name("Lato"), Some(SupportedFamily::Lato));
        assert_eq!(
            SupportedFamily::from_name("roboto mono"),
            Some(SupportedFamily::RobotoMono)
        );
        assert_eq!(
            SupportedFamily::from_name("MERRIWEATHER"),
            Some(SupportedFamily::Merriweather)
        );
        assert_eq!(SupportedFamily::from_name("Comic Sans"), None);
    }

    #[test]
    fn test_asset_file_names() {
        assert_eq!(
            asset_file_name(SupportedFamily::Lato, FontVariant { italic: false, bold: false }),
            "Lato-Regular.ttf"
        );
        assert_eq!(
            asset_file_name(SupportedFamily::RobotoMono, FontVariant { italic: true, bold: true }),
            "RobotoMono-BoldItalic.ttf"
        );
    }

    #[tokio::test]
    async fn test_embed_all_registers_each_combination_once() {
        let mut doc = PdfDocument::new();
        let table = FontTable::embed_all(&mut doc, &StubFontProvider).await.unwrap();

        assert_eq!(table.font_count(), 16);

        let resources = table.font_resources();
        assert!(resources.get("F1").is_some());
        assert!(resources.get("F16").is_some());
        assert!(resources.get("F17").is_none());
    }

    #[tokio::test]
    async fn test_resolve_known_and_fallback() {
        let mut doc = PdfDocument::new();
        let table = FontTable::embed_all(&mut doc, &StubFontProvider).await.unwrap();

        let roboto = table.resolve("Roboto", FontStyle::Normal, FontWeight::Bold);
        assert_eq!(roboto.family, SupportedFamily::Roboto);
        assert!(roboto.variant.bold);

        // Unknown family substitutes the default family, same variant
        let fallback = table.resolve("Nonexistent", FontStyle::Normal, FontWeight::Normal);
        assert_eq!(fallback.family, SupportedFamily::DEFAULT);
        assert!(!fallback.variant.bold);
        assert!(!fallback.variant.italic);
    }

    #[tokio::test]
    async fn test_load_failure_is_fatal() {
        let mut doc = PdfDocument::new();
        let result = FontTable::embed_all(&mut doc, &FailingFontProvider).await;
        assert!(matches!(result, Err(ExportError::FontLoad { .. })));
    }
}
