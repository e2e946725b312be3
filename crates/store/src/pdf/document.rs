//! Output PDF document
//!
//! [`PdfDocument`] is the object store the exporter and the outline
//! encoder build into: an arena of numbered objects with reference
//! allocation decoupled from object assignment. The outline encoder needs
//! that split: a parent's dictionary can only be finalized after all of
//! its descendants have references. `save` serializes the arena into the
//! final file: header, body with recorded byte offsets, cross-reference
//! table and trailer.

use super::content::ContentStream;
use super::objects::{ObjRef, PdfDictionary, PdfObject, PdfSerializer, PdfStream, PdfString};
use std::io::{self, Write};
use thiserror::Error;

/// Error type for PDF assembly and serialization
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Reference {} 0 R allocated but never assigned", .0.num)]
    UnassignedObject(ObjRef),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// PDF version written into the file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdfVersion {
    #[default]
    V1_4,
    V1_7,
}

impl PdfVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfVersion::V1_4 => "1.4",
            PdfVersion::V1_7 => "1.7",
        }
    }
}

/// Document information dictionary
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl DocumentInfo {
    pub fn new() -> Self {
        Self {
            creator: Some("Inkleaf".to_string()),
            producer: Some("Inkleaf PDF Export".to_string()),
            ..Default::default()
        }
    }

    pub fn to_dictionary(&self) -> PdfDictionary {
        let mut dict = PdfDictionary::new();
        if let Some(ref title) = self.title {
            dict.insert("Title", PdfObject::String(PdfString::from_text(title)));
        }
        if let Some(ref author) = self.author {
            dict.insert("Author", PdfObject::String(PdfString::from_text(author)));
        }
        if let Some(ref creator) = self.creator {
            dict.insert("Creator", PdfObject::String(PdfString::from_text(creator)));
        }
        if let Some(ref producer) = self.producer {
            dict.insert("Producer", PdfObject::String(PdfString::from_text(producer)));
        }
        dict
    }
}

/// Page media box (page dimensions, origin at lower-left)
#[derive(Debug, Clone, Copy)]
pub struct MediaBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl MediaBox {
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: width,
            ury: height,
        }
    }

    pub fn to_array(&self) -> PdfObject {
        PdfObject::Array(vec![
            PdfObject::Real(self.llx),
            PdfObject::Real(self.lly),
            PdfObject::Real(self.urx),
            PdfObject::Real(self.ury),
        ])
    }
}

/// In-memory PDF object store and writer
pub struct PdfDocument {
    /// Slot per allocated object number; None until assigned
    objects: Vec<Option<PdfObject>>,
    page_refs: Vec<ObjRef>,
    page_sizes: Vec<(f64, f64)>,
    catalog_ref: ObjRef,
    pages_ref: ObjRef,
    info_ref: ObjRef,
    outline_ref: Option<ObjRef>,
    pub info: DocumentInfo,
    version: PdfVersion,
    compress: bool,
}

impl PdfDocument {
    pub fn new() -> Self {
        let mut doc = Self {
            objects: Vec::new(),
            page_refs: Vec::new(),
            page_sizes: Vec::new(),
            catalog_ref: ObjRef::new(0, 0),
            pages_ref: ObjRef::new(0, 0),
            info_ref: ObjRef::new(0, 0),
            outline_ref: None,
            info: DocumentInfo::new(),
            version: PdfVersion::default(),
            compress: true,
        };
        // Catalog, page tree and info take the first three numbers; their
        // contents are assembled at save time.
        doc.catalog_ref = doc.alloc();
        doc.pages_ref = doc.alloc();
        doc.info_ref = doc.alloc();
        doc
    }

    pub fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }

    /// Allocate a fresh object reference. The object itself may be
    /// assigned later; `save` fails on references left unassigned.
    pub fn alloc(&mut self) -> ObjRef {
        self.objects.push(None);
        ObjRef::new(self.objects.len() as u32, 0)
    }

    /// Assign the object behind a previously allocated reference
    pub fn assign(&mut self, r: ObjRef, object: PdfObject) {
        let slot = (r.num - 1) as usize;
        debug_assert!(slot < self.objects.len(), "assign to unallocated ref");
        self.objects[slot] = Some(object);
    }

    /// Allocate and assign in one step
    pub fn add_object(&mut self, object: PdfObject) -> ObjRef {
        let r = self.alloc();
        self.assign(r, object);
        r
    }

    /// Add a stream object
    pub fn add_stream(&mut self, stream: PdfStream) -> ObjRef {
        self.add_object(PdfObject::Stream(stream))
    }

    /// Create a new page of the given size with the given content stream
    /// and resources, appended to the page tree.
    pub fn add_page(
        &mut self,
        width: f64,
        height: f64,
        content: ContentStream,
        resources: PdfDictionary,
    ) -> ObjRef {
        let content_ref = self.add_stream(PdfStream::new(content.into_bytes()));

        let mut page_dict = PdfDictionary::new().with_type("Page");
        page_dict.insert_ref("Parent", self.pages_ref);
        page_dict.insert("MediaBox", MediaBox::from_dimensions(width, height).to_array());
        page_dict.insert("Resources", PdfObject::Dictionary(resources));
        page_dict.insert_ref("Contents", content_ref);

        let page_ref = self.add_object(PdfObject::Dictionary(page_dict));
        self.page_refs.push(page_ref);
        self.page_sizes.push((width, height));
        page_ref
    }

    pub fn page_count(&self) -> usize {
        self.page_refs.len()
    }

    /// Number of objects allocated so far
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Reference of the page at a 0-based index
    pub fn page_ref(&self, index: usize) -> Option<ObjRef> {
        self.page_refs.get(index).copied()
    }

    /// Dimensions of the page at a 0-based index
    pub fn page_size(&self, index: usize) -> Option<(f64, f64)> {
        self.page_sizes.get(index).copied()
    }

    /// Wire an outline root object into the catalog
    pub fn set_outline_root(&mut self, r: ObjRef) {
        self.outline_ref = Some(r);
    }

    /// The outline root, once one has been set
    pub fn outline_root(&self) -> Option<ObjRef> {
        self.outline_ref
    }

    /// Look at an assigned object
    pub fn object(&self, r: ObjRef) -> Option<&PdfObject> {
        self.objects.get((r.num - 1) as usize)?.as_ref()
    }

    /// Serialize the document to its final byte form
    pub fn save(&mut self) -> Result<Vec<u8>> {
        if self.page_refs.is_empty() {
            return Err(PdfError::InvalidDocument("No pages to export".to_string()));
        }

        // Catalog
        let mut catalog = PdfDictionary::new().with_type("Catalog");
        catalog.insert_ref("Pages", self.pages_ref);
        if let Some(outline_ref) = self.outline_ref {
            catalog.insert_ref("Outlines", outline_ref);
            catalog.insert("PageMode", PdfObject::name("UseOutlines"));
        }
        self.assign(self.catalog_ref, PdfObject::Dictionary(catalog));

        // Page tree root
        let mut pages = PdfDictionary::new().with_type("Pages");
        pages.insert(
            "Kids",
            PdfObject::Array(self.page_refs.iter().map(|&r| r.into()).collect()),
        );
        pages.insert("Count", PdfObject::int(self.page_refs.len() as i64));
        self.assign(self.pages_ref, PdfObject::Dictionary(pages));

        // Info dictionary
        self.assign(self.info_ref, PdfObject::Dictionary(self.info.to_dictionary()));

        let mut out = Vec::new();

        // Header with a binary marker so transports treat the file as binary
        out.extend_from_slice(format!("%PDF-{}\n", self.version.as_str()).as_bytes());
        out.extend_from_slice(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n']);

        // Body, recording the byte offset of every object
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (index, slot) in self.objects.iter().enumerate() {
            let obj_ref = ObjRef::new(index as u32 + 1, 0);
            let object = slot
                .as_ref()
                .ok_or(PdfError::UnassignedObject(obj_ref))?;

            offsets.push(out.len() as u64);
            out.extend_from_slice(format!("{} 0 obj\n", obj_ref.num).as_bytes());

            let mut serializer = PdfSerializer::new(Vec::new());
            match object {
                PdfObject::Stream(stream) => {
                    let prepared = self.prepare_stream(stream)?;
                    serializer.write_object(&PdfObject::Stream(prepared))?;
                }
                other => serializer.write_object(other)?,
            }
            out.extend_from_slice(&serializer.into_inner());
            out.extend_from_slice(b"\nendobj\n");
        }

        // Cross-reference table
        let xref_offset = out.len() as u64;
        out.extend_from_slice(b"xref\n");
        out.extend_from_slice(format!("0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }

        // Trailer
        let mut trailer = PdfDictionary::new();
        trailer.insert("Size", PdfObject::int(self.objects.len() as i64 + 1));
        trailer.insert_ref("Root", self.catalog_ref);
        trailer.insert_ref("Info", self.info_ref);

        out.extend_from_slice(b"trailer\n");
        let mut serializer = PdfSerializer::new(Vec::new());
        serializer.write_object(&PdfObject::Dictionary(trailer))?;
        out.extend_from_slice(&serializer.into_inner());
        out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        Ok(out)
    }

    /// Apply flate compression (if enabled) and fill in the Length entry
    fn prepare_stream(&self, stream: &PdfStream) -> Result<PdfStream> {
        let mut stream = stream.clone();

        if self.compress && !stream.compressed {
            use flate2::write::ZlibEncoder;
            use flate2::Compression;

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&stream.data)?;
            stream.data = encoder.finish()?;
            stream.compressed = true;
            stream
                .dict
                .insert("Filter", PdfObject::name("FlateDecode"));
        }

        stream
            .dict
            .insert("Length", PdfObject::int(stream.data.len() as i64));
        Ok(stream)
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_an_error() {
        let mut doc = PdfDocument::new();
        assert!(matches!(
            doc.save(),
            Err(PdfError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_minimal_document_structure() {
        let mut doc = PdfDocument::new();
        doc.set_compression(false);
        doc.add_page(612.0, 792.0, ContentStream::new(), PdfDictionary::new());

        let bytes = doc.save().unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Type /Pages"));
        assert!(text.contains("/Type /Page"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.contains("startxref"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_unassigned_reference_fails_save() {
        let mut doc = PdfDocument::new();
        doc.add_page(100.0, 100.0, ContentStream::new(), PdfDictionary::new());
        let dangling = doc.alloc();

        match doc.save() {
            Err(PdfError::UnassignedObject(r)) => assert_eq!(r, dangling),
            other => panic!("expected UnassignedObject, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_page_refs_and_sizes() {
        let mut doc = PdfDocument::new();
        let first = doc.add_page(100.0, 200.0, ContentStream::new(), PdfDictionary::new());
        let second = doc.add_page(300.0, 400.0, ContentStream::new(), PdfDictionary::new());

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_ref(0), Some(first));
        assert_eq!(doc.page_ref(1), Some(second));
        assert_eq!(doc.page_size(1), Some((300.0, 400.0)));
        assert_eq!(doc.page_ref(2), None);
    }

    #[test]
    fn test_save_is_deterministic() {
        let build = || {
            let mut doc = PdfDocument::new();
            let mut content = ContentStream::new();
            content.rect(0.0, 0.0, 10.0, 10.0).fill();
            doc.add_page(612.0, 792.0, content, PdfDictionary::new());
            doc.save().unwrap()
        };
        assert_eq!(build(), build());
    }
}
