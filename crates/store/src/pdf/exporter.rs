//! Document to PDF conversion
//!
//! Walks the document's page/layer/element tree in order and emits the
//! equivalent PDF page content. Pages are processed strictly one after
//! another: later pages reuse font and background embeddings cached from
//! earlier ones, and the object store's reference counter must not be
//! raced. Both caches live in the call, not in shared state, so
//! concurrent exports of different documents stay independent.
//!
//! Any unrecoverable per-page or per-element condition unwinds the whole
//! export; no partial PDF buffer is ever returned.

use super::content::{ContentStream, LineCap, LineJoin};
use super::document::{PdfDocument, PdfError};
use super::embed::{embed_pdf_pages, EmbeddedPage};
use super::fonts::{FontProvider, FontTable, LINE_HEIGHT_RATIO};
use super::images::{embed_image, ImageError};
use super::objects::{ObjRef, PdfDictionary, PdfObject};
use super::options::PdfExportOptions;
use super::outline::write_outline;
use super::reader::{ParsedPdf, ReadError};
use super::svg_path::{emit_path, is_axis_aligned_rect, parse_path, PathDataError, PathSegment};
use crate::{FileStore, StoreError};
use canvas_model::{Background, Color, Document, Element, Layer, Page, PathElement, TextElement};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for PDF export
#[derive(Debug, Error)]
pub enum ExportError {
    /// An element kind the exporter cannot express; content is never
    /// silently dropped.
    #[error("Unsupported element of kind \"{kind}\" in layer \"{layer}\"")]
    UnsupportedElement { layer: String, kind: String },

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Failed to load font {family}: {source}")]
    FontLoad {
        family: String,
        #[source]
        source: std::io::Error,
    },

    /// A page background references a source PDF that cannot be found.
    /// Distinct so the application can offer relocating the file or
    /// removing the background before retrying.
    #[error("Source PDF not found: {0}")]
    SourceFileNotFound(String),

    #[error("Failed to read source PDF {file}: {source}")]
    SourcePdf {
        file: String,
        #[source]
        source: ReadError,
    },

    #[error(transparent)]
    InvalidPathData(#[from] PathDataError),

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts documents to PDF byte buffers
pub struct DocumentExporter {
    options: PdfExportOptions,
}

impl DocumentExporter {
    pub fn new(options: PdfExportOptions) -> Self {
        Self { options }
    }

    /// Export a whole document. Fonts are embedded eagerly up front;
    /// PDF-backed page backgrounds are fetched through `files` and
    /// embedded once per source file.
    pub async fn export(
        &self,
        document: &Document,
        files: &impl FileStore,
        fonts: &impl FontProvider,
    ) -> Result<Vec<u8>, ExportError> {
        validate_document(document)?;

        let mut pdf = PdfDocument::new();
        pdf.set_compression(self.options.compress);
        pdf.info.title = self
            .options
            .title
            .clone()
            .or_else(|| Some(document.meta.title.clone()));
        pdf.info.author = self.options.author.clone();

        let font_table = FontTable::embed_all(&mut pdf, fonts).await?;
        let mut backgrounds: HashMap<String, Vec<EmbeddedPage>> = HashMap::new();

        for page in &document.pages {
            self.export_page(&mut pdf, page, &font_table, &mut backgrounds, files)
                .await?;
        }

        if self.options.include_outline {
            write_outline(&mut pdf, &document.outline);
        }

        Ok(pdf.save()?)
    }

    async fn export_page(
        &self,
        pdf: &mut PdfDocument,
        page: &Page,
        font_table: &FontTable,
        backgrounds: &mut HashMap<String, Vec<EmbeddedPage>>,
        files: &impl FileStore,
    ) -> Result<(), ExportError> {
        let mut content = ContentStream::new();
        let mut alpha = AlphaStates::default();
        let mut xobjects: Vec<(String, ObjRef)> = Vec::new();
        let mut image_counter = 0u32;

        // An imported PDF page supplies the visual background, scaled to
        // fill the page from the origin.
        if let Background::Pdf {
            source_file,
            page_number,
        } = &page.background
        {
            if !backgrounds.contains_key(source_file) {
                let bytes = files
                    .read(source_file)
                    .await
                    .map_err(|e| map_file_error(e, source_file))?;
                let mut parsed =
                    ParsedPdf::open(bytes).map_err(|source| ExportError::SourcePdf {
                        file: source_file.clone(),
                        source,
                    })?;
                let pages = embed_pdf_pages(pdf, &mut parsed).map_err(|source| {
                    ExportError::SourcePdf {
                        file: source_file.clone(),
                        source,
                    }
                })?;
                tracing::debug!(
                    file = source_file.as_str(),
                    pages = pages.len(),
                    "embedded background source document"
                );
                backgrounds.insert(source_file.clone(), pages);
            }

            let embedded = &backgrounds[source_file];
            match page_number
                .checked_sub(1)
                .and_then(|i| embedded.get(i))
            {
                Some(src_page) => {
                    let name = "Bg".to_string();
                    xobjects.push((name.clone(), src_page.xobject));
                    content
                        .save_state()
                        .transform(
                            page.width / src_page.width,
                            0.0,
                            0.0,
                            page.height / src_page.height,
                            0.0,
                            0.0,
                        )
                        .draw_xobject(&name)
                        .restore_state();
                }
                None => {
                    tracing::warn!(
                        file = source_file.as_str(),
                        page = page_number,
                        "background page number out of range, leaving page blank"
                    );
                }
            }
        }

        // Layers paint bottom to top; hidden layers are skipped entirely
        for layer in &page.layers {
            if !layer.visible {
                continue;
            }

            if layer.is_background() {
                match &page.background {
                    // The embedded page already supplies the visual
                    Background::Pdf { .. } => continue,
                    Background::Solid { color, .. } => {
                        render_background_layer(&mut content, &mut alpha, layer, *color, page)?;
                    }
                }
                continue;
            }

            for element in &layer.elements {
                match element {
                    Element::Path(path) => {
                        let segments = parse_path(&path.data)?;
                        stroke_segments(&mut content, &mut alpha, path, &segments, page.height);
                    }
                    Element::Text(text) => {
                        draw_text(&mut content, font_table, text, page.height);
                    }
                    Element::Image(img) => {
                        let embedded = embed_image(pdf, &img.data)?;
                        image_counter += 1;
                        let name = format!("Im{}", image_counter);
                        xobjects.push((name.clone(), embedded.obj_ref));
                        content
                            .save_state()
                            .transform(
                                img.rect.width,
                                0.0,
                                0.0,
                                img.rect.height,
                                img.rect.x,
                                page.height - img.rect.y - img.rect.height,
                            )
                            .draw_xobject(&name)
                            .restore_state();
                    }
                    Element::Unsupported { kind } => {
                        return Err(ExportError::UnsupportedElement {
                            layer: layer.name.clone(),
                            kind: kind.clone(),
                        });
                    }
                }
            }
        }

        let resources = build_resources(font_table, &xobjects, &alpha);
        pdf.add_page(page.width, page.height, content, resources);
        Ok(())
    }
}

/// The Background layer of a solid page: a full-page fill in the page
/// color, then the decorative ruling as stroked paths. A plain filled
/// rectangle child duplicates the page fill and is skipped; element
/// kinds the background cannot carry are skipped with a warning.
fn render_background_layer(
    content: &mut ContentStream,
    alpha: &mut AlphaStates,
    layer: &Layer,
    color: Color,
    page: &Page,
) -> Result<(), ExportError> {
    let (r, g, b) = color.to_unit_rgb();
    content
        .save_state()
        .set_fill_rgb(r, g, b)
        .rect(0.0, 0.0, page.width, page.height)
        .fill()
        .restore_state();

    for element in &layer.elements {
        match element {
            Element::Path(path) => {
                let segments = parse_path(&path.data)?;
                if is_axis_aligned_rect(&segments) {
                    continue;
                }
                stroke_segments(content, alpha, path, &segments, page.height);
            }
            other => {
                tracing::warn!(
                    kind = other.kind(),
                    "skipping unsupported element on the background layer"
                );
            }
        }
    }
    Ok(())
}

/// Stroke a parsed path: round caps and joins, no fill, opacity through
/// an ExtGState when below 1.
fn stroke_segments(
    content: &mut ContentStream,
    alpha: &mut AlphaStates,
    path: &PathElement,
    segments: &[PathSegment],
    page_height: f64,
) {
    content.save_state();
    if path.opacity < 1.0 {
        let name = alpha.name_for(path.opacity);
        content.set_ext_g_state(&name);
    }
    let (r, g, b) = path.color.to_unit_rgb();
    content
        .set_stroke_rgb(r, g, b)
        .set_line_width(path.stroke_width)
        .set_line_cap(LineCap::Round)
        .set_line_join(LineJoin::Round);
    emit_path(content, segments, page_height);
    content.stroke().restore_state();
}

/// A text run at its canvas position; the baseline anchor flips to
/// `page_height - y - line_height` in PDF space.
fn draw_text(
    content: &mut ContentStream,
    font_table: &FontTable,
    text: &TextElement,
    page_height: f64,
) {
    let font = font_table.resolve(&text.font_family, text.style, text.weight);
    let line_height = text.font_size * LINE_HEIGHT_RATIO;
    let (r, g, b) = text.color.to_unit_rgb();

    content
        .begin_text()
        .set_font(&font.res_name, text.font_size)
        .set_fill_rgb(r, g, b)
        .set_text_matrix(
            1.0,
            0.0,
            0.0,
            1.0,
            text.pos.x,
            page_height - text.pos.y - line_height,
        )
        .show_text(&text.text)
        .end_text();
}

fn build_resources(
    font_table: &FontTable,
    xobjects: &[(String, ObjRef)],
    alpha: &AlphaStates,
) -> PdfDictionary {
    let mut resources = PdfDictionary::new();
    resources.insert("Font", PdfObject::Dictionary(font_table.font_resources()));

    if !xobjects.is_empty() {
        let mut dict = PdfDictionary::new();
        for (name, obj_ref) in xobjects {
            dict.insert_ref(name.clone(), *obj_ref);
        }
        resources.insert("XObject", PdfObject::Dictionary(dict));
    }

    if let Some(dict) = alpha.to_dictionary() {
        resources.insert("ExtGState", PdfObject::Dictionary(dict));
    }

    resources.insert(
        "ProcSet",
        PdfObject::Array(vec![
            PdfObject::name("PDF"),
            PdfObject::name("Text"),
            PdfObject::name("ImageB"),
            PdfObject::name("ImageC"),
        ]),
    );
    resources
}

/// Per-page registry of ExtGState alpha entries
#[derive(Debug, Default)]
struct AlphaStates {
    entries: Vec<(String, f64)>,
}

impl AlphaStates {
    fn name_for(&mut self, opacity: f64) -> String {
        if let Some((name, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| (existing - opacity).abs() < 1e-6)
        {
            return name.clone();
        }
        let name = format!("GS{}", self.entries.len() + 1);
        self.entries.push((name.clone(), opacity));
        name
    }

    fn to_dictionary(&self) -> Option<PdfDictionary> {
        if self.entries.is_empty() {
            return None;
        }
        let mut dict = PdfDictionary::new();
        for (name, opacity) in &self.entries {
            let mut state = PdfDictionary::new().with_type("ExtGState");
            state.insert("CA", PdfObject::Real(*opacity));
            state.insert("ca", PdfObject::Real(*opacity));
            dict.insert(name.clone(), PdfObject::Dictionary(state));
        }
        Some(dict)
    }
}

fn validate_document(document: &Document) -> Result<(), ExportError> {
    if document.pages.is_empty() {
        return Err(ExportError::InvalidDocument(
            "No pages to export".to_string(),
        ));
    }
    for (i, page) in document.pages.iter().enumerate() {
        if page.width <= 0.0 || page.height <= 0.0 {
            return Err(ExportError::InvalidDocument(format!(
                "Page {} has invalid dimensions {}x{}",
                i, page.width, page.height
            )));
        }
    }
    Ok(())
}

fn map_file_error(error: StoreError, file: &str) -> ExportError {
    match error {
        StoreError::FileNotFound(_) => ExportError::SourceFileNotFound(file.to_string()),
        StoreError::Io(e) => ExportError::Io(e),
        other => ExportError::InvalidDocument(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_states_dedupe() {
        let mut alpha = AlphaStates::default();
        let first = alpha.name_for(0.5);
        let second = alpha.name_for(0.5);
        let third = alpha.name_for(0.25);

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(alpha.entries.len(), 2);
    }

    #[test]
    fn test_empty_alpha_has_no_dictionary() {
        assert!(AlphaStates::default().to_dictionary().is_none());
    }

    #[test]
    fn test_validate_rejects_degenerate_pages() {
        use canvas_model::Page;

        let mut doc = Document::new("Bad");
        assert!(matches!(
            validate_document(&doc),
            Err(ExportError::InvalidDocument(_))
        ));

        doc.add_page(Page::new(0.0, 100.0));
        assert!(matches!(
            validate_document(&doc),
            Err(ExportError::InvalidDocument(_))
        ));
    }
}
