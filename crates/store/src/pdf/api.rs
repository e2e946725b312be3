//! PDF Export/Import Public API

use super::exporter::{DocumentExporter, ExportError};
use super::fonts::FontProvider;
use super::options::PdfExportOptions;
use super::outline::read_outline;
use super::reader::{ParsedPdf, ReadError};
use crate::{FileStore, StoreError};
use canvas_model::{Document, OutlineNode};
use std::path::Path;

/// Export a document to PDF bytes in memory
///
/// # Example
///
/// ```ignore
/// use store::pdf::{export_pdf_bytes, PdfExportOptions};
/// use store::{DirFileStore, pdf::DirFontProvider};
///
/// let files = DirFileStore::new("imports");
/// let fonts = DirFontProvider::new("assets/fonts");
/// let options = PdfExportOptions::new().with_title("My Notes");
///
/// let bytes = export_pdf_bytes(&document, &files, &fonts, options).await?;
/// ```
pub async fn export_pdf_bytes(
    document: &Document,
    files: &impl FileStore,
    fonts: &impl FontProvider,
    options: PdfExportOptions,
) -> Result<Vec<u8>, ExportError> {
    DocumentExporter::new(options)
        .export(document, files, fonts)
        .await
}

/// Export a document to a PDF file on disk
pub async fn export_pdf(
    document: &Document,
    files: &impl FileStore,
    fonts: &impl FontProvider,
    path: impl AsRef<Path>,
    options: PdfExportOptions,
) -> Result<(), ExportError> {
    let bytes = export_pdf_bytes(document, files, fonts, options).await?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Open a PDF held in memory for import
pub fn open_pdf(bytes: Vec<u8>) -> Result<ParsedPdf, ReadError> {
    ParsedPdf::open(bytes)
}

/// Fetch a named file and read its bookmark tree in one step
pub async fn import_outline(
    files: &impl FileStore,
    file_name: &str,
) -> Result<Vec<OutlineNode>, StoreError> {
    let bytes = files.read(file_name).await?;
    let mut pdf = open_pdf(bytes).map_err(|e| StoreError::InvalidFormat(e.to_string()))?;
    read_outline(&mut pdf).map_err(|e| StoreError::InvalidFormat(e.to_string()))
}
