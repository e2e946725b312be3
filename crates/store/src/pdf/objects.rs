//! PDF Object Model
//!
//! The small set of primitive object types PDF composes all document data
//! from, plus a serializer emitting them in PDF syntax. Dictionaries are
//! backed by a BTreeMap so serialization order is deterministic and
//! re-exporting an unchanged document produces identical bytes.

use std::collections::BTreeMap;
use std::io::{self, Write};

/// An indirect object reference ("N G R" in PDF syntax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// Object number
    pub num: u32,
    /// Generation number (always 0 for objects we create)
    pub gen: u16,
}

impl ObjRef {
    pub const fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

/// PDF object types
#[derive(Debug, Clone)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// String (literal or hexadecimal)
    String(PdfString),
    /// Name object (written with a leading /)
    Name(String),
    Array(Vec<PdfObject>),
    Dictionary(PdfDictionary),
    /// Stream (dictionary + byte data)
    Stream(PdfStream),
    /// Indirect reference to another object
    Reference(ObjRef),
}

impl PdfObject {
    pub fn int(n: i64) -> Self {
        PdfObject::Integer(n)
    }

    pub fn real(n: f64) -> Self {
        PdfObject::Real(n)
    }

    pub fn name(s: impl Into<String>) -> Self {
        PdfObject::Name(s.into())
    }

    pub fn string(s: impl Into<Vec<u8>>) -> Self {
        PdfObject::String(PdfString::literal(s))
    }

    pub fn reference(r: ObjRef) -> Self {
        PdfObject::Reference(r)
    }

    pub fn array(objects: Vec<PdfObject>) -> Self {
        PdfObject::Array(objects)
    }
}

/// PDF string encoding
#[derive(Debug, Clone)]
pub enum PdfString {
    /// Literal string enclosed in parentheses
    Literal(Vec<u8>),
    /// Hexadecimal string enclosed in angle brackets
    Hex(Vec<u8>),
}

impl PdfString {
    pub fn literal(data: impl Into<Vec<u8>>) -> Self {
        PdfString::Literal(data.into())
    }

    pub fn from_text(s: &str) -> Self {
        PdfString::Literal(s.as_bytes().to_vec())
    }
}

/// PDF dictionary with deterministic key order
#[derive(Debug, Clone, Default)]
pub struct PdfDictionary {
    entries: BTreeMap<String, PdfObject>,
}

impl PdfDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PdfObject) {
        self.entries.insert(key.into(), value);
    }

    pub fn insert_ref(&mut self, key: impl Into<String>, r: ObjRef) {
        self.entries.insert(key.into(), PdfObject::Reference(r));
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PdfObject)> {
        self.entries.iter()
    }

    /// Set the Type entry, common to most structured PDF objects
    pub fn with_type(mut self, type_name: &str) -> Self {
        self.insert("Type", PdfObject::name(type_name));
        self
    }
}

/// PDF stream (dictionary + data)
#[derive(Debug, Clone)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data: Vec<u8>,
    /// Set when `data` already carries a Filter (e.g. DCT images); the
    /// writer will not flate-compress such streams again.
    pub compressed: bool,
}

impl PdfStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            dict: PdfDictionary::new(),
            data,
            compressed: false,
        }
    }

    pub fn with_dict(mut self, dict: PdfDictionary) -> Self {
        for (key, value) in dict.entries {
            self.dict.insert(key, value);
        }
        self
    }

    pub fn mark_compressed(mut self) -> Self {
        self.compressed = true;
        self
    }
}

/// Serializer for PDF objects
pub struct PdfSerializer<W: Write> {
    writer: W,
}

impl<W: Write> PdfSerializer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_object(&mut self, obj: &PdfObject) -> io::Result<()> {
        match obj {
            PdfObject::Null => write!(self.writer, "null"),
            PdfObject::Boolean(b) => {
                write!(self.writer, "{}", if *b { "true" } else { "false" })
            }
            PdfObject::Integer(n) => write!(self.writer, "{}", n),
            PdfObject::Real(n) => write!(self.writer, "{}", format_real(*n)),
            PdfObject::String(s) => self.write_string(s),
            PdfObject::Name(name) => self.write_name(name),
            PdfObject::Array(arr) => self.write_array(arr),
            PdfObject::Dictionary(dict) => self.write_dictionary(dict),
            PdfObject::Stream(stream) => self.write_stream(stream),
            PdfObject::Reference(r) => write!(self.writer, "{} {} R", r.num, r.gen),
        }
    }

    fn write_string(&mut self, s: &PdfString) -> io::Result<()> {
        match s {
            PdfString::Literal(data) => {
                write!(self.writer, "(")?;
                for &byte in data {
                    match byte {
                        b'(' | b')' | b'\\' => {
                            write!(self.writer, "\\{}", byte as char)?;
                        }
                        0x0A => write!(self.writer, "\\n")?,
                        0x0D => write!(self.writer, "\\r")?,
                        0x09 => write!(self.writer, "\\t")?,
                        0x08 => write!(self.writer, "\\b")?,
                        0x0C => write!(self.writer, "\\f")?,
                        0x20..=0x7E => write!(self.writer, "{}", byte as char)?,
                        _ => write!(self.writer, "\\{:03o}", byte)?,
                    }
                }
                write!(self.writer, ")")
            }
            PdfString::Hex(data) => {
                write!(self.writer, "<")?;
                for byte in data {
                    write!(self.writer, "{:02X}", byte)?;
                }
                write!(self.writer, ">")
            }
        }
    }

    fn write_name(&mut self, name: &str) -> io::Result<()> {
        write!(self.writer, "/")?;
        for byte in name.bytes() {
            match byte {
                0x21..=0x7E
                    if !matches!(
                        byte,
                        b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
                    ) =>
                {
                    write!(self.writer, "{}", byte as char)?;
                }
                _ => write!(self.writer, "#{:02X}", byte)?,
            }
        }
        Ok(())
    }

    fn write_array(&mut self, arr: &[PdfObject]) -> io::Result<()> {
        write!(self.writer, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(self.writer, " ")?;
            }
            self.write_object(obj)?;
        }
        write!(self.writer, "]")
    }

    fn write_dictionary(&mut self, dict: &PdfDictionary) -> io::Result<()> {
        write!(self.writer, "<<")?;
        for (key, value) in dict.iter() {
            write!(self.writer, " ")?;
            self.write_name(key)?;
            write!(self.writer, " ")?;
            self.write_object(value)?;
        }
        write!(self.writer, " >>")
    }

    fn write_stream(&mut self, stream: &PdfStream) -> io::Result<()> {
        self.write_dictionary(&stream.dict)?;
        write!(self.writer, "\nstream\n")?;
        self.writer.write_all(&stream.data)?;
        write!(self.writer, "\nendstream")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Format a real number the way PDF expects: no exponent, trailing zeros
/// trimmed.
pub fn format_real(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.1}", n)
    } else {
        let s = format!("{:.6}", n);
        let s = s.trim_end_matches('0');
        s.trim_end_matches('.').to_string()
    }
}

impl From<bool> for PdfObject {
    fn from(b: bool) -> Self {
        PdfObject::Boolean(b)
    }
}

impl From<i64> for PdfObject {
    fn from(n: i64) -> Self {
        PdfObject::Integer(n)
    }
}

impl From<f64> for PdfObject {
    fn from(n: f64) -> Self {
        PdfObject::Real(n)
    }
}

impl From<ObjRef> for PdfObject {
    fn from(r: ObjRef) -> Self {
        PdfObject::Reference(r)
    }
}

impl From<PdfDictionary> for PdfObject {
    fn from(dict: PdfDictionary) -> Self {
        PdfObject::Dictionary(dict)
    }
}

impl From<PdfStream> for PdfObject {
    fn from(stream: PdfStream) -> Self {
        PdfObject::Stream(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(obj: &PdfObject) -> String {
        let mut serializer = PdfSerializer::new(Vec::new());
        serializer.write_object(obj).unwrap();
        String::from_utf8(serializer.into_inner()).unwrap()
    }

    #[test]
    fn test_serialize_primitives() {
        assert_eq!(serialize(&PdfObject::Null), "null");
        assert_eq!(serialize(&PdfObject::Boolean(true)), "true");
        assert_eq!(serialize(&PdfObject::int(42)), "42");
        assert_eq!(serialize(&PdfObject::real(3.5)), "3.5");
        assert_eq!(serialize(&PdfObject::real(2.0)), "2.0");
        assert_eq!(serialize(&PdfObject::name("Type")), "/Type");
        assert_eq!(
            serialize(&PdfObject::reference(ObjRef::new(7, 0))),
            "7 0 R"
        );
    }

    #[test]
    fn test_serialize_string_escapes() {
        assert_eq!(serialize(&PdfObject::string("Hello")), "(Hello)");
        assert_eq!(serialize(&PdfObject::string("a(b)c")), "(a\\(b\\)c)");
        assert_eq!(serialize(&PdfObject::string("line\nbreak")), "(line\\nbreak)");
        assert_eq!(
            serialize(&PdfObject::String(PdfString::Hex(vec![0xDE, 0xAD]))),
            "<DEAD>"
        );
    }

    #[test]
    fn test_serialize_array_and_dict() {
        let arr = PdfObject::array(vec![PdfObject::int(1), PdfObject::int(2)]);
        assert_eq!(serialize(&arr), "[1 2]");

        let mut dict = PdfDictionary::new().with_type("Page");
        dict.insert("Rotate", PdfObject::int(0));
        let out = serialize(&PdfObject::Dictionary(dict));
        assert!(out.contains("/Type /Page"));
        assert!(out.contains("/Rotate 0"));
    }

    #[test]
    fn test_dictionary_order_is_deterministic() {
        let mut a = PdfDictionary::new();
        a.insert("Zebra", PdfObject::int(1));
        a.insert("Alpha", PdfObject::int(2));

        let mut b = PdfDictionary::new();
        b.insert("Alpha", PdfObject::int(2));
        b.insert("Zebra", PdfObject::int(1));

        assert_eq!(
            serialize(&PdfObject::Dictionary(a)),
            serialize(&PdfObject::Dictionary(b))
        );
    }

    #[test]
    fn test_name_escaping() {
        assert_eq!(serialize(&PdfObject::name("A B")), "/A#20B");
    }
}
