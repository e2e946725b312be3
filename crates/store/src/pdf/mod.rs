//! PDF Export/Import Module
//!
//! Bridges the in-memory canvas model and the PDF object format: the
//! exporter converts pages, layers and drawable elements into a valid
//! PDF file (embedding fonts, raster images and imported source-PDF
//! pages as backgrounds), and the outline codec translates the app's
//! bookmark tree to and from the native outline object graph.
//!
//! # Architecture
//!
//! - `objects`: PDF object model (Dictionary, Array, Stream, Reference)
//! - `document`: the output object store (reference allocation, object
//!   assignment, page creation, serialization)
//! - `content`: content stream generation (text, graphics operators)
//! - `fonts`: the font embedding table
//! - `images`: raster image XObject embedding
//! - `svg_path`: path-data parsing and emission
//! - `reader`: minimal PDF parsing for opened source files
//! - `embed`: source-PDF page embedding as Form XObjects
//! - `outline`: bookmark tree encoding and decoding
//! - `exporter`: the document walk tying it all together
//! - `options`: export configuration
//! - `api`: public entry points

mod api;
mod content;
mod document;
mod embed;
mod exporter;
mod fonts;
mod images;
mod objects;
mod options;
mod outline;
mod reader;
mod svg_path;

pub use api::*;
pub use options::*;

pub use content::{ContentStream, LineCap, LineJoin};
pub use document::{DocumentInfo, MediaBox, PdfDocument, PdfError, PdfVersion};
pub use exporter::{DocumentExporter, ExportError};
pub use fonts::{
    asset_file_name, DirFontProvider, FontProvider, FontVariant, SupportedFamily,
    LINE_HEIGHT_RATIO,
};
pub use images::ImageError;
pub use objects::{ObjRef, PdfDictionary, PdfObject, PdfSerializer, PdfStream, PdfString};
pub use outline::{read_outline, write_outline};
pub use reader::{decode_stream, PageRecord, ParsedPdf, PdfValue, ReadError};
pub use svg_path::PathDataError;
