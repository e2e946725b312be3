//! PDF Image Handling
//!
//! Raster payloads reach the exporter as encoded bytes with a declared
//! mime type; the actual format is sniffed from the magic bytes. JPEG is
//! passed through untouched as DCTDecode (dimensions read from the SOF
//! marker); PNG is decoded to raw RGB and embedded FlateDecode, with the
//! alpha channel split off into an SMask. Anything else is the fatal
//! unsupported-image error.

use super::document::PdfDocument;
use super::objects::{ObjRef, PdfDictionary, PdfObject, PdfStream};
use thiserror::Error;

/// Error type for image embedding
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image type: {0}")]
    Unsupported(String),

    #[error("Invalid image data: {0}")]
    Invalid(String),
}

/// Image formats the exporter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    Png,
    Jpeg,
}

/// Identify an image payload by its magic bytes
pub fn sniff_format(data: &[u8]) -> Option<SniffedFormat> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(SniffedFormat::Png)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        Some(SniffedFormat::Jpeg)
    } else {
        None
    }
}

/// An image XObject embedded in the output document
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    pub obj_ref: ObjRef,
    pub width: u32,
    pub height: u32,
}

/// Embed an image payload as an XObject, dispatching on the sniffed
/// format. The declared mime type is ignored in favor of the bytes.
pub fn embed_image(doc: &mut PdfDocument, data: &[u8]) -> Result<EmbeddedImage, ImageError> {
    match sniff_format(data) {
        Some(SniffedFormat::Jpeg) => embed_jpeg(doc, data),
        Some(SniffedFormat::Png) => embed_png(doc, data),
        None => Err(ImageError::Unsupported(
            "only PNG and JPEG images can be exported".to_string(),
        )),
    }
}

/// JPEG data goes into the PDF as-is; DCTDecode is native to the format.
fn embed_jpeg(doc: &mut PdfDocument, data: &[u8]) -> Result<EmbeddedImage, ImageError> {
    let (width, height) = parse_jpeg_dimensions(data)?;

    let mut dict = PdfDictionary::new().with_type("XObject");
    dict.insert("Subtype", PdfObject::name("Image"));
    dict.insert("Width", PdfObject::int(width as i64));
    dict.insert("Height", PdfObject::int(height as i64));
    dict.insert("BitsPerComponent", PdfObject::int(8));
    dict.insert("ColorSpace", PdfObject::name("DeviceRGB"));
    dict.insert("Filter", PdfObject::name("DCTDecode"));

    let stream = PdfStream::new(data.to_vec())
        .with_dict(dict)
        .mark_compressed();
    let obj_ref = doc.add_stream(stream);

    Ok(EmbeddedImage {
        obj_ref,
        width,
        height,
    })
}

/// PNG is decoded to raw pixels; transparency becomes an SMask.
fn embed_png(doc: &mut PdfDocument, data: &[u8]) -> Result<EmbeddedImage, ImageError> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| ImageError::Invalid(e.to_string()))?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
        if pixel.0[3] != 255 {
            has_alpha = true;
        }
    }

    let smask_ref = if has_alpha {
        let mut mask_dict = PdfDictionary::new().with_type("XObject");
        mask_dict.insert("Subtype", PdfObject::name("Image"));
        mask_dict.insert("Width", PdfObject::int(width as i64));
        mask_dict.insert("Height", PdfObject::int(height as i64));
        mask_dict.insert("BitsPerComponent", PdfObject::int(8));
        mask_dict.insert("ColorSpace", PdfObject::name("DeviceGray"));
        Some(doc.add_stream(PdfStream::new(alpha).with_dict(mask_dict)))
    } else {
        None
    };

    let mut dict = PdfDictionary::new().with_type("XObject");
    dict.insert("Subtype", PdfObject::name("Image"));
    dict.insert("Width", PdfObject::int(width as i64));
    dict.insert("Height", PdfObject::int(height as i64));
    dict.insert("BitsPerComponent", PdfObject::int(8));
    dict.insert("ColorSpace", PdfObject::name("DeviceRGB"));
    if let Some(mask) = smask_ref {
        dict.insert_ref("SMask", mask);
    }

    let obj_ref = doc.add_stream(PdfStream::new(rgb).with_dict(dict));

    Ok(EmbeddedImage {
        obj_ref,
        width,
        height,
    })
}

/// Extract width and height from a JPEG's SOF marker
fn parse_jpeg_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(ImageError::Invalid("not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err(ImageError::Invalid("invalid JPEG marker".to_string()));
        }

        let marker = data[pos + 1];
        pos += 2;

        // Padding bytes between markers
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }

        // Standalone markers carry no length
        if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = ((data[pos] as usize) << 8) | (data[pos + 1] as usize);

        // SOF0..SOF15 (minus DHT/DAC/markers in between) hold dimensions
        if (0xC0..=0xC3).contains(&marker)
            || (0xC5..=0xC7).contains(&marker)
            || (0xC9..=0xCB).contains(&marker)
            || (0xCD..=0xCF).contains(&marker)
        {
            if pos + 7 > data.len() {
                break;
            }
            let height = ((data[pos + 3] as u32) << 8) | (data[pos + 4] as u32);
            let width = ((data[pos + 5] as u32) << 8) | (data[pos + 6] as u32);
            return Ok((width, height));
        }

        pos += length;
    }

    Err(ImageError::Invalid(
        "could not find dimensions in JPEG".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal JPEG header: SOI + SOF0 declaring 8x4 pixels
    pub(super) fn tiny_jpeg() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, // SOF0
            0x00, 0x0B, // length 11
            0x08, // precision
            0x00, 0x04, // height 4
            0x00, 0x08, // width 8
            0x01, 0x01, 0x11, 0x00, // one component
            0xFF, 0xD9, // EOI
        ]
    }

    /// A valid 1x1 opaque red PNG, produced by the `image` encoder
    pub(super) fn tiny_png() -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff_format(&tiny_png()), Some(SniffedFormat::Png));
        assert_eq!(sniff_format(&tiny_jpeg()), Some(SniffedFormat::Jpeg));
        assert_eq!(sniff_format(b"GIF89a...."), None);
        assert_eq!(sniff_format(&[]), None);
    }

    #[test]
    fn test_jpeg_dimensions() {
        assert_eq!(parse_jpeg_dimensions(&tiny_jpeg()).unwrap(), (8, 4));
        assert!(parse_jpeg_dimensions(b"not a jpeg").is_err());
    }

    #[test]
    fn test_embed_jpeg_passthrough() {
        let mut doc = PdfDocument::new();
        let embedded = embed_image(&mut doc, &tiny_jpeg()).unwrap();
        assert_eq!((embedded.width, embedded.height), (8, 4));
    }

    #[test]
    fn test_embed_png() {
        let mut doc = PdfDocument::new();
        let embedded = embed_image(&mut doc, &tiny_png()).unwrap();
        assert_eq!((embedded.width, embedded.height), (1, 1));
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let mut doc = PdfDocument::new();
        let result = embed_image(&mut doc, b"GIF89a....");
        assert!(matches!(result, Err(ImageError::Unsupported(_))));
    }

    #[test]
    fn test_png_alpha_gets_smask() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 128]));
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();

        let mut doc = PdfDocument::new();
        let before = doc.object_count();
        embed_image(&mut doc, &buffer.into_inner()).unwrap();
        // SMask plus the image itself
        assert_eq!(doc.object_count() - before, 2);
    }
}
