//! PDF reading
//!
//! A deliberately small parser for opened PDF files: enough to embed
//! pages of previously imported documents as export backgrounds and to
//! read their outline trees back in. Classic cross-reference tables
//! (including `/Prev` chains) and FlateDecode streams are supported;
//! cross-reference streams, object streams and encryption are reported
//! as unsupported rather than misparsed.

use super::objects::ObjRef;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use thiserror::Error;

/// Error type for PDF parsing
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Unsupported PDF feature: {0}")]
    Unsupported(String),

    #[error("Missing object: {} {} R", .0.num, .0.gen)]
    MissingObject(ObjRef),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, ReadError>;

/// A parsed PDF value
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Boolean(bool),
    Number(f64),
    /// Literal or hex string, raw bytes
    String(Vec<u8>),
    Name(String),
    Array(Vec<PdfValue>),
    Dict(HashMap<String, PdfValue>),
    Stream {
        dict: HashMap<String, PdfValue>,
        data: Vec<u8>,
    },
    Ref(ObjRef),
}

impl PdfValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_number().map(|n| n as i64)
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfValue::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfValue::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfValue]> {
        match self {
            PdfValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&HashMap<String, PdfValue>> {
        match self {
            PdfValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Option<ObjRef> {
        match self {
            PdfValue::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

/// Byte-level scanner over the raw file
struct Scanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        ReadError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' => self.pos += 1,
                b'%' => {
                    // Comment runs to end of line
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an alphabetic keyword like `obj`, `stream`, `trailer`
    fn keyword(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.data[start..self.pos]
    }

    fn expect_keyword(&mut self, expected: &[u8]) -> Result<()> {
        self.skip_ws();
        let start = self.pos;
        let found = self.keyword();
        if found == expected {
            Ok(())
        } else {
            Err(ReadError::Parse {
                offset: start,
                message: format!(
                    "expected '{}', found '{}'",
                    String::from_utf8_lossy(expected),
                    String::from_utf8_lossy(found)
                ),
            })
        }
    }

    fn parse_unsigned(&mut self) -> Result<u64> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an unsigned integer"));
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("integer out of range"))
    }

    fn parse_number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || b == b'.')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a number"));
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("malformed number"))
    }

    /// Parse any object, including streams
    fn parse_value(&mut self) -> Result<PdfValue> {
        self.skip_ws();
        match self.peek().ok_or_else(|| self.error("unexpected end of data"))? {
            b'/' => self.parse_name().map(PdfValue::Name),
            b'(' => self.parse_literal_string().map(PdfValue::String),
            b'<' => {
                if self.data.get(self.pos + 1) == Some(&b'<') {
                    self.parse_dict_or_stream()
                } else {
                    self.parse_hex_string().map(PdfValue::String)
                }
            }
            b'[' => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.peek() == Some(b']') {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.parse_value()?);
                }
                Ok(PdfValue::Array(items))
            }
            b't' => {
                self.expect_keyword(b"true")?;
                Ok(PdfValue::Boolean(true))
            }
            b'f' => {
                self.expect_keyword(b"false")?;
                Ok(PdfValue::Boolean(false))
            }
            b'n' => {
                self.expect_keyword(b"null")?;
                Ok(PdfValue::Null)
            }
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.parse_number_or_ref(),
            other => Err(self.error(format!("unexpected byte 0x{:02X}", other))),
        }
    }

    /// A bare number, or an `N G R` indirect reference
    fn parse_number_or_ref(&mut self) -> Result<PdfValue> {
        let start = self.pos;
        let first = self.parse_number()?;

        // Only "uint uint R" forms a reference
        if first >= 0.0 && first.fract() == 0.0 && !self.data[start..self.pos].contains(&b'.') {
            let rollback = self.pos;
            self.skip_ws();
            let gen_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos > gen_start {
                let gen: u64 = std::str::from_utf8(&self.data[gen_start..self.pos])
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                self.skip_ws();
                if self.peek() == Some(b'R')
                    && !self
                        .data
                        .get(self.pos + 1)
                        .is_some_and(|b| b.is_ascii_alphanumeric())
                {
                    self.pos += 1;
                    return Ok(PdfValue::Ref(ObjRef::new(first as u32, gen as u16)));
                }
            }
            self.pos = rollback;
        }

        Ok(PdfValue::Number(first))
    }

    fn parse_name(&mut self) -> Result<String> {
        self.pos += 1; // consume '/'
        let mut name = String::new();
        while let Some(byte) = self.peek() {
            match byte {
                b'#' => {
                    let hex = self
                        .data
                        .get(self.pos + 1..self.pos + 3)
                        .and_then(|h| std::str::from_utf8(h).ok())
                        .and_then(|h| u8::from_str_radix(h, 16).ok())
                        .ok_or_else(|| self.error("bad name escape"))?;
                    name.push(hex as char);
                    self.pos += 3;
                }
                b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' | b'/' | b'[' | b']' | b'('
                | b')' | b'<' | b'>' | b'{' | b'}' | b'%' => break,
                other => {
                    name.push(other as char);
                    self.pos += 1;
                }
            }
        }
        Ok(name)
    }

    fn parse_literal_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // consume '('
        let mut bytes = Vec::new();
        let mut depth = 1usize;
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("dangling string escape"))?;
                    self.pos += 1;
                    match escaped {
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0C),
                        b'(' | b')' | b'\\' => bytes.push(escaped),
                        b'\r' => {
                            // Line continuation; swallow a following \n
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            bytes.push(value as u8);
                        }
                        other => bytes.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    bytes.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(bytes);
                    }
                    bytes.push(byte);
                }
                other => bytes.push(other),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_hex_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // consume '<'
        let mut digits = Vec::new();
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'>' => {
                    if digits.len() % 2 == 1 {
                        digits.push(b'0');
                    }
                    return digits
                        .chunks(2)
                        .map(|pair| {
                            let s = std::str::from_utf8(pair).unwrap_or("00");
                            u8::from_str_radix(s, 16)
                                .map_err(|_| self.error("bad hex digit"))
                        })
                        .collect();
                }
                b if b.is_ascii_hexdigit() => digits.push(b),
                b' ' | b'\t' | b'\r' | b'\n' | b'\0' => {}
                _ => return Err(self.error("bad hex string")),
            }
        }
        Err(self.error("unterminated hex string"))
    }

    fn parse_dict_or_stream(&mut self) -> Result<PdfValue> {
        self.pos += 2; // consume '<<'
        let mut dict = HashMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'>') && self.data.get(self.pos + 1) == Some(&b'>') {
                self.pos += 2;
                break;
            }
            if self.peek() != Some(b'/') {
                return Err(self.error("expected a name key in dictionary"));
            }
            let key = self.parse_name()?;
            let value = self.parse_value()?;
            dict.insert(key, value);
        }

        // A stream keyword directly after the dictionary makes this a
        // stream object.
        let rollback = self.pos;
        self.skip_ws();
        if self.data[self.pos..].starts_with(b"stream") {
            self.pos += b"stream".len();
            if self.peek() == Some(b'\r') {
                self.pos += 1;
            }
            if self.peek() == Some(b'\n') {
                self.pos += 1;
            }
            let data = self.read_stream_data(&dict)?;
            return Ok(PdfValue::Stream { dict, data });
        }
        self.pos = rollback;
        Ok(PdfValue::Dict(dict))
    }

    fn read_stream_data(&mut self, dict: &HashMap<String, PdfValue>) -> Result<Vec<u8>> {
        let start = self.pos;

        // Prefer a direct /Length; an indirect one falls back to scanning
        // for the endstream keyword.
        if let Some(length) = dict.get("Length").and_then(|v| v.as_int()) {
            let end = start + length as usize;
            if end <= self.data.len() {
                let candidate = &self.data[start..end];
                let mut probe = Scanner::at(self.data, end);
                probe.skip_ws();
                if probe.data[probe.pos..].starts_with(b"endstream") {
                    self.pos = probe.pos + b"endstream".len();
                    return Ok(candidate.to_vec());
                }
            }
        }

        let haystack = &self.data[start..];
        let found = haystack
            .windows(b"endstream".len())
            .position(|w| w == b"endstream")
            .ok_or_else(|| self.error("unterminated stream"))?;
        let mut end = start + found;
        // Trim the EOL that separates data from the keyword
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        let data = self.data[start..end].to_vec();
        self.pos = start + found + b"endstream".len();
        Ok(data)
    }
}

/// One page of an opened PDF, with inherited attributes resolved
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub obj_ref: ObjRef,
    /// \[llx, lly, urx, ury\]
    pub media_box: [f64; 4],
    resources: Option<PdfValue>,
    contents: Option<PdfValue>,
}

impl PageRecord {
    pub fn width(&self) -> f64 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f64 {
        self.media_box[3] - self.media_box[1]
    }
}

/// An opened, parsed PDF document
///
/// This is the import boundary: page count, page lookup, page-index
/// resolution for references, named destinations and the outline root.
pub struct ParsedPdf {
    data: Vec<u8>,
    xref: HashMap<u32, u64>,
    trailer: HashMap<String, PdfValue>,
    cache: HashMap<u32, PdfValue>,
    pages: Vec<PageRecord>,
    page_index: HashMap<u32, usize>,
}

impl ParsedPdf {
    /// Parse a PDF file held in memory
    pub fn open(data: Vec<u8>) -> Result<Self> {
        if !data.starts_with(b"%PDF-") {
            return Err(ReadError::Malformed("missing %PDF header".to_string()));
        }

        let (xref, trailer) = Self::read_xref_chain(&data)?;

        let mut pdf = Self {
            data,
            xref,
            trailer,
            cache: HashMap::new(),
            pages: Vec::new(),
            page_index: HashMap::new(),
        };
        pdf.build_page_table()?;
        Ok(pdf)
    }

    fn read_xref_chain(data: &[u8]) -> Result<(HashMap<u32, u64>, HashMap<String, PdfValue>)> {
        // startxref lives near the end of the file
        let tail_start = data.len().saturating_sub(2048);
        let tail = &data[tail_start..];
        let marker = tail
            .windows(b"startxref".len())
            .rposition(|w| w == b"startxref")
            .ok_or_else(|| ReadError::Malformed("missing startxref".to_string()))?;

        let mut scanner = Scanner::at(data, tail_start + marker + b"startxref".len());
        let mut offset = scanner.parse_unsigned()? as usize;

        let mut xref: HashMap<u32, u64> = HashMap::new();
        let mut trailer: Option<HashMap<String, PdfValue>> = None;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(offset) {
                break; // cyclic Prev chain
            }
            let mut scanner = Scanner::at(data, offset);
            scanner.skip_ws();
            if !scanner.data[scanner.pos..].starts_with(b"xref") {
                return Err(ReadError::Unsupported(
                    "cross-reference streams".to_string(),
                ));
            }
            scanner.pos += b"xref".len();

            // Subsections until the trailer keyword
            loop {
                scanner.skip_ws();
                if scanner.data[scanner.pos..].starts_with(b"trailer") {
                    scanner.pos += b"trailer".len();
                    break;
                }
                let start_num = scanner.parse_unsigned()? as u32;
                let count = scanner.parse_unsigned()?;
                for i in 0..count {
                    let entry_offset = scanner.parse_unsigned()?;
                    let _gen = scanner.parse_unsigned()?;
                    scanner.skip_ws();
                    let flag = scanner.peek().ok_or_else(|| {
                        scanner.error("truncated xref entry")
                    })?;
                    scanner.pos += 1;
                    let num = start_num + i as u32;
                    // Newest section wins; earlier sections fill gaps only
                    if flag == b'n' && num != 0 {
                        xref.entry(num).or_insert(entry_offset);
                    }
                }
            }

            let section_trailer = match scanner.parse_value()? {
                PdfValue::Dict(dict) => dict,
                _ => return Err(ReadError::Malformed("trailer is not a dictionary".to_string())),
            };

            let prev = section_trailer.get("Prev").and_then(|v| v.as_int());
            if trailer.is_none() {
                trailer = Some(section_trailer);
            }
            match prev {
                Some(prev_offset) => offset = prev_offset as usize,
                None => break,
            }
        }

        Ok((
            xref,
            trailer.ok_or_else(|| ReadError::Malformed("missing trailer".to_string()))?,
        ))
    }

    /// Fetch an indirect object by reference
    pub fn fetch(&mut self, r: ObjRef) -> Result<PdfValue> {
        if let Some(cached) = self.cache.get(&r.num) {
            return Ok(cached.clone());
        }

        let offset = *self
            .xref
            .get(&r.num)
            .ok_or(ReadError::MissingObject(r))? as usize;

        let mut scanner = Scanner::at(&self.data, offset);
        let num = scanner.parse_unsigned()? as u32;
        let _gen = scanner.parse_unsigned()?;
        scanner.expect_keyword(b"obj")?;
        if num != r.num {
            return Err(ReadError::Malformed(format!(
                "object {} found at the offset recorded for {}",
                num, r.num
            )));
        }
        let value = scanner.parse_value()?;

        self.cache.insert(r.num, value.clone());
        Ok(value)
    }

    /// Dereference a value until it is no longer an indirect reference
    pub fn resolve(&mut self, value: &PdfValue) -> Result<PdfValue> {
        let mut current = value.clone();
        for _ in 0..32 {
            match current {
                PdfValue::Ref(r) => current = self.fetch(r)?,
                other => return Ok(other),
            }
        }
        Err(ReadError::Malformed("reference chain too deep".to_string()))
    }

    fn catalog(&mut self) -> Result<HashMap<String, PdfValue>> {
        let root = self
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| ReadError::Malformed("trailer has no Root".to_string()))?;
        match self.resolve(&root)? {
            PdfValue::Dict(dict) => Ok(dict),
            _ => Err(ReadError::Malformed("catalog is not a dictionary".to_string())),
        }
    }

    fn build_page_table(&mut self) -> Result<()> {
        let catalog = self.catalog()?;
        let pages_root = catalog
            .get("Pages")
            .cloned()
            .ok_or_else(|| ReadError::Malformed("catalog has no Pages".to_string()))?;

        let mut visited = HashSet::new();
        self.walk_page_node(&pages_root, None, None, &mut visited)?;

        for (index, record) in self.pages.iter().enumerate() {
            self.page_index.insert(record.obj_ref.num, index);
        }
        Ok(())
    }

    fn walk_page_node(
        &mut self,
        node: &PdfValue,
        inherited_media_box: Option<[f64; 4]>,
        inherited_resources: Option<PdfValue>,
        visited: &mut HashSet<u32>,
    ) -> Result<()> {
        let node_ref = node.as_ref();
        if let Some(r) = node_ref {
            if !visited.insert(r.num) {
                return Ok(()); // cycle in the page tree
            }
        }

        let dict = match self.resolve(node)? {
            PdfValue::Dict(dict) => dict,
            _ => return Ok(()),
        };

        let media_box = match dict.get("MediaBox") {
            Some(value) => Some(self.parse_rect(value)?),
            None => inherited_media_box,
        };
        let resources = dict
            .get("Resources")
            .cloned()
            .or(inherited_resources);

        match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => {
                let kids = dict
                    .get("Kids")
                    .cloned()
                    .and_then(|k| match self.resolve(&k) {
                        Ok(PdfValue::Array(items)) => Some(items),
                        _ => None,
                    })
                    .unwrap_or_default();
                for kid in &kids {
                    self.walk_page_node(kid, media_box, resources.clone(), visited)?;
                }
            }
            Some("Page") => {
                let obj_ref = node_ref.ok_or_else(|| {
                    ReadError::Malformed("page object is not indirect".to_string())
                })?;
                self.pages.push(PageRecord {
                    obj_ref,
                    media_box: media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]),
                    resources,
                    contents: dict.get("Contents").cloned(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_rect(&mut self, value: &PdfValue) -> Result<[f64; 4]> {
        let resolved = self.resolve(value)?;
        let items = resolved
            .as_array()
            .ok_or_else(|| ReadError::Malformed("rectangle is not an array".to_string()))?;
        if items.len() != 4 {
            return Err(ReadError::Malformed("rectangle needs 4 numbers".to_string()));
        }
        let mut out = [0.0; 4];
        for (i, item) in items.iter().enumerate() {
            out[i] = self
                .resolve(item)?
                .as_number()
                .ok_or_else(|| ReadError::Malformed("rectangle entry is not a number".to_string()))?;
        }
        Ok(out)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&PageRecord> {
        self.pages.get(index)
    }

    /// 0-based page index for a page object reference
    pub fn page_index_of(&self, r: ObjRef) -> Option<usize> {
        self.page_index.get(&r.num).copied()
    }

    /// The resources dictionary value of a page (may itself be a
    /// reference; the caller resolves as needed)
    pub fn page_resources(&self, index: usize) -> Option<&PdfValue> {
        self.pages.get(index)?.resources.as_ref()
    }

    /// The concatenated, decoded content of a page
    pub fn page_content(&mut self, index: usize) -> Result<Vec<u8>> {
        let contents = match self.pages.get(index).and_then(|p| p.contents.clone()) {
            Some(value) => value,
            None => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        match self.resolve(&contents)? {
            PdfValue::Stream { dict, data } => {
                out.extend_from_slice(&decode_stream(&dict, &data)?);
            }
            PdfValue::Array(items) => {
                for item in &items {
                    if let PdfValue::Stream { dict, data } = self.resolve(item)? {
                        out.extend_from_slice(&decode_stream(&dict, &data)?);
                        out.push(b'\n');
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }

    /// The `/Outlines` root dictionary, if the document has one
    pub fn outline_root(&mut self) -> Result<Option<HashMap<String, PdfValue>>> {
        let catalog = self.catalog()?;
        let Some(outlines) = catalog.get("Outlines").cloned() else {
            return Ok(None);
        };
        match self.resolve(&outlines)? {
            PdfValue::Dict(dict) => Ok(Some(dict)),
            _ => Ok(None),
        }
    }

    /// Resolve a named destination through the catalog's `/Dests`
    /// dictionary or the `/Names` name tree to an explicit destination
    /// array.
    pub fn resolve_named_destination(&mut self, name: &str) -> Result<Option<Vec<PdfValue>>> {
        let catalog = self.catalog()?;

        if let Some(dests) = catalog.get("Dests").cloned() {
            if let PdfValue::Dict(dict) = self.resolve(&dests)? {
                if let Some(entry) = dict.get(name).cloned() {
                    return self.destination_array(&entry);
                }
            }
        }

        if let Some(names) = catalog.get("Names").cloned() {
            if let PdfValue::Dict(names_dict) = self.resolve(&names)? {
                if let Some(dests_tree) = names_dict.get("Dests").cloned() {
                    let node = self.resolve(&dests_tree)?;
                    if let Some(entry) = self.search_name_tree(&node, name, 0)? {
                        return self.destination_array(&entry);
                    }
                }
            }
        }

        Ok(None)
    }

    /// Flat search of a name tree; fine for the tree sizes outlines see
    fn search_name_tree(
        &mut self,
        node: &PdfValue,
        name: &str,
        depth: usize,
    ) -> Result<Option<PdfValue>> {
        if depth > 32 {
            return Err(ReadError::Malformed("name tree too deep".to_string()));
        }
        let dict = match self.resolve(node)? {
            PdfValue::Dict(dict) => dict,
            _ => return Ok(None),
        };

        if let Some(names) = dict.get("Names").cloned() {
            if let PdfValue::Array(items) = self.resolve(&names)? {
                for pair in items.chunks(2) {
                    if let [key, value] = pair {
                        let key = self.resolve(key)?;
                        if key.as_string_bytes() == Some(name.as_bytes()) {
                            return Ok(Some(value.clone()));
                        }
                    }
                }
            }
        }

        if let Some(kids) = dict.get("Kids").cloned() {
            if let PdfValue::Array(items) = self.resolve(&kids)? {
                for kid in &items {
                    if let Some(found) = self.search_name_tree(kid, name, depth + 1)? {
                        return Ok(Some(found));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Normalize a destination value to its explicit array form
    fn destination_array(&mut self, value: &PdfValue) -> Result<Option<Vec<PdfValue>>> {
        match self.resolve(value)? {
            PdfValue::Array(items) => Ok(Some(items)),
            PdfValue::Dict(dict) => match dict.get("D") {
                Some(d) => match self.resolve(d)? {
                    PdfValue::Array(items) => Ok(Some(items)),
                    _ => Ok(None),
                },
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

/// Decode a stream's data according to its Filter entry
pub fn decode_stream(dict: &HashMap<String, PdfValue>, data: &[u8]) -> Result<Vec<u8>> {
    let filter = match dict.get("Filter") {
        None => return Ok(data.to_vec()),
        Some(PdfValue::Name(name)) => name.clone(),
        Some(PdfValue::Array(items)) => match items.as_slice() {
            [] => return Ok(data.to_vec()),
            [PdfValue::Name(name)] => name.clone(),
            _ => {
                return Err(ReadError::Unsupported(
                    "filter chains".to_string(),
                ))
            }
        },
        Some(_) => return Err(ReadError::Malformed("bad Filter entry".to_string())),
    };

    match filter.as_str() {
        "FlateDecode" => {
            if let Some(PdfValue::Dict(parms)) = dict.get("DecodeParms") {
                let predictor = parms
                    .get("Predictor")
                    .and_then(|p| p.as_int())
                    .unwrap_or(1);
                if predictor > 1 {
                    return Err(ReadError::Unsupported("flate predictors".to_string()));
                }
            }
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| ReadError::Malformed(format!("flate error: {}", e)))?;
            Ok(out)
        }
        other => Err(ReadError::Unsupported(format!("filter {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> PdfValue {
        Scanner::at(input.as_bytes(), 0).parse_value().unwrap()
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(scan("null"), PdfValue::Null);
        assert_eq!(scan("true"), PdfValue::Boolean(true));
        assert_eq!(scan("42"), PdfValue::Number(42.0));
        assert_eq!(scan("-3.5"), PdfValue::Number(-3.5));
        assert_eq!(scan("/Name"), PdfValue::Name("Name".to_string()));
        assert_eq!(scan("5 0 R"), PdfValue::Ref(ObjRef::new(5, 0)));
    }

    #[test]
    fn test_number_not_mistaken_for_ref() {
        // Two numbers followed by a non-R token stay numbers
        let mut scanner = Scanner::at(b"1 2 3", 0);
        assert_eq!(scanner.parse_value().unwrap(), PdfValue::Number(1.0));
        assert_eq!(scanner.parse_value().unwrap(), PdfValue::Number(2.0));
        assert_eq!(scanner.parse_value().unwrap(), PdfValue::Number(3.0));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(
            scan("(hello)"),
            PdfValue::String(b"hello".to_vec())
        );
        assert_eq!(
            scan(r"(a\(b\)c)"),
            PdfValue::String(b"a(b)c".to_vec())
        );
        assert_eq!(
            scan(r"(line\nbreak)"),
            PdfValue::String(b"line\nbreak".to_vec())
        );
        assert_eq!(
            scan(r"(\101)"),
            PdfValue::String(b"A".to_vec())
        );
        assert_eq!(
            scan("<48656C6C6F>"),
            PdfValue::String(b"Hello".to_vec())
        );
        // Odd digit count pads with zero
        assert_eq!(scan("<48F>"), PdfValue::String(vec![0x48, 0xF0]));
    }

    #[test]
    fn test_parse_nested_structures() {
        let value = scan("<< /Kids [1 0 R 2 0 R] /Count 2 >>");
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.get("Count").unwrap().as_int(), Some(2));
        let kids = dict.get("Kids").unwrap().as_array().unwrap();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].as_ref(), Some(ObjRef::new(1, 0)));
    }

    #[test]
    fn test_parse_stream_with_direct_length() {
        let input = b"<< /Length 5 >>\nstream\nabcde\nendstream";
        let value = Scanner::at(input, 0).parse_value().unwrap();
        match value {
            PdfValue::Stream { data, .. } => assert_eq!(data, b"abcde"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_scan_fallback() {
        // Indirect Length forces the endstream scan
        let input = b"<< /Length 9 9 R >>\nstream\nabcde\nendstream";
        let value = Scanner::at(input, 0).parse_value().unwrap();
        match value {
            PdfValue::Stream { data, .. } => assert_eq!(data, b"abcde"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_plain_and_flate() {
        let dict = HashMap::new();
        assert_eq!(decode_stream(&dict, b"raw").unwrap(), b"raw");

        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"inflated contents").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = HashMap::new();
        dict.insert(
            "Filter".to_string(),
            PdfValue::Name("FlateDecode".to_string()),
        );
        assert_eq!(
            decode_stream(&dict, &compressed).unwrap(),
            b"inflated contents"
        );
    }

    #[test]
    fn test_unsupported_filter() {
        let mut dict = HashMap::new();
        dict.insert(
            "Filter".to_string(),
            PdfValue::Name("JBIG2Decode".to_string()),
        );
        assert!(matches!(
            decode_stream(&dict, b""),
            Err(ReadError::Unsupported(_))
        ));
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(matches!(
            ParsedPdf::open(b"not a pdf at all".to_vec()),
            Err(ReadError::Malformed(_))
        ));
    }
}
