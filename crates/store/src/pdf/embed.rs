//! Source-PDF page embedding
//!
//! Pages whose background comes from an imported PDF reuse that file's
//! actual page content: every page of the source document is converted
//! into a Form XObject in the output, and the page's resource graph is
//! deep-copied across, object by object, with an old-to-new reference
//! map so shared resources are copied once and reference cycles
//! terminate.

use super::document::PdfDocument;
use super::objects::{ObjRef, PdfDictionary, PdfObject, PdfStream, PdfString};
use super::reader::{ParsedPdf, PdfValue, ReadError};
use std::collections::HashMap;

/// A source page turned into a Form XObject of the output document
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedPage {
    pub xobject: ObjRef,
    /// Source page width in points
    pub width: f64,
    /// Source page height in points
    pub height: f64,
}

/// Copies values from a parsed source PDF into the output object store
pub struct ObjectCopier {
    /// Source object number to output reference
    map: HashMap<u32, ObjRef>,
}

impl ObjectCopier {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Deep-copy a value; indirect references become references into the
    /// output document, fetching and copying their targets on first use.
    pub fn copy_value(
        &mut self,
        doc: &mut PdfDocument,
        src: &mut ParsedPdf,
        value: &PdfValue,
    ) -> Result<PdfObject, ReadError> {
        Ok(match value {
            PdfValue::Null => PdfObject::Null,
            PdfValue::Boolean(b) => PdfObject::Boolean(*b),
            PdfValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    PdfObject::Integer(*n as i64)
                } else {
                    PdfObject::Real(*n)
                }
            }
            PdfValue::String(bytes) => PdfObject::String(PdfString::Literal(bytes.clone())),
            PdfValue::Name(name) => PdfObject::Name(name.clone()),
            PdfValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.copy_value(doc, src, item)?);
                }
                PdfObject::Array(out)
            }
            PdfValue::Dict(dict) => PdfObject::Dictionary(self.copy_dict(doc, src, dict)?),
            PdfValue::Stream { dict, data } => {
                PdfObject::Stream(self.copy_stream(doc, src, dict, data)?)
            }
            PdfValue::Ref(r) => {
                if let Some(&mapped) = self.map.get(&r.num) {
                    return Ok(PdfObject::Reference(mapped));
                }
                // Reserve the target before descending so cycles resolve
                let new_ref = doc.alloc();
                self.map.insert(r.num, new_ref);
                let fetched = src.fetch(*r)?;
                let copied = self.copy_value(doc, src, &fetched)?;
                doc.assign(new_ref, copied);
                PdfObject::Reference(new_ref)
            }
        })
    }

    fn copy_dict(
        &mut self,
        doc: &mut PdfDocument,
        src: &mut ParsedPdf,
        dict: &HashMap<String, PdfValue>,
    ) -> Result<PdfDictionary, ReadError> {
        let mut out = PdfDictionary::new();
        for (key, value) in dict {
            out.insert(key.clone(), self.copy_value(doc, src, value)?);
        }
        Ok(out)
    }

    fn copy_stream(
        &mut self,
        doc: &mut PdfDocument,
        src: &mut ParsedPdf,
        dict: &HashMap<String, PdfValue>,
        data: &[u8],
    ) -> Result<PdfStream, ReadError> {
        let mut out_dict = PdfDictionary::new();
        for (key, value) in dict {
            // Length is recomputed at save time
            if key == "Length" {
                continue;
            }
            out_dict.insert(key.clone(), self.copy_value(doc, src, value)?);
        }
        // Data carrying a Filter entry is kept encoded as-is
        let compressed = dict.contains_key("Filter");
        Ok(PdfStream {
            dict: out_dict,
            data: data.to_vec(),
            compressed,
        })
    }
}

impl Default for ObjectCopier {
    fn default() -> Self {
        Self::new()
    }
}

/// Embed every page of an opened source PDF into the output document as
/// Form XObjects. All pages are converted at once so later output pages
/// referencing the same source file reuse the same objects.
pub fn embed_pdf_pages(
    doc: &mut PdfDocument,
    src: &mut ParsedPdf,
) -> Result<Vec<EmbeddedPage>, ReadError> {
    let mut copier = ObjectCopier::new();
    let mut embedded = Vec::with_capacity(src.page_count());

    for index in 0..src.page_count() {
        let record = src
            .page(index)
            .ok_or_else(|| ReadError::Malformed("page table out of sync".to_string()))?;
        let media_box = record.media_box;
        let width = record.width();
        let height = record.height();

        let content = src.page_content(index)?;

        let mut form_dict = PdfDictionary::new().with_type("XObject");
        form_dict.insert("Subtype", PdfObject::name("Form"));
        form_dict.insert("FormType", PdfObject::int(1));
        form_dict.insert(
            "BBox",
            PdfObject::Array(vec![
                PdfObject::Real(media_box[0]),
                PdfObject::Real(media_box[1]),
                PdfObject::Real(media_box[2]),
                PdfObject::Real(media_box[3]),
            ]),
        );
        // Normalize pages whose media box does not start at the origin,
        // so the exporter can scale from (0, 0).
        if media_box[0] != 0.0 || media_box[1] != 0.0 {
            form_dict.insert(
                "Matrix",
                PdfObject::Array(vec![
                    PdfObject::int(1),
                    PdfObject::int(0),
                    PdfObject::int(0),
                    PdfObject::int(1),
                    PdfObject::Real(-media_box[0]),
                    PdfObject::Real(-media_box[1]),
                ]),
            );
        }
        if let Some(resources) = src.page_resources(index).cloned() {
            let copied = copier.copy_value(doc, src, &resources)?;
            form_dict.insert("Resources", copied);
        }

        let xobject = doc.add_stream(PdfStream::new(content).with_dict(form_dict));
        embedded.push(EmbeddedPage {
            xobject,
            width,
            height,
        });
    }

    Ok(embedded)
}
