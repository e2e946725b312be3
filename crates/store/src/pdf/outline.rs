//! Outline (bookmark) encoding and decoding
//!
//! PDF outlines are a doubly linked object graph: siblings chain via
//! Prev/Next, parents point at First/Last children, children point back
//! at Parent, and every node carries an opening count. Encoding runs in
//! two passes over an arena of nodes: a pre-order pass allocating one
//! reference per node (every node needs an object whether shown or not),
//! then a bottom-up pass assigning dictionaries, since First/Last/Count
//! depend on the children being finished first.
//!
//! Decoding mirrors a source outline's shape 1:1, resolving each entry's
//! destination to a 1-based page number. Entries whose destination
//! cannot be resolved are kept with the sentinel page number and a
//! warning; a malformed bookmark is not worth failing an import over.

use super::document::PdfDocument;
use super::objects::{ObjRef, PdfDictionary, PdfObject, PdfString};
use super::reader::{ParsedPdf, PdfValue, ReadError};
use canvas_model::{OutlineNode, NO_PAGE};
use std::collections::{HashMap, HashSet};
use tracing::warn;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// One outline node flattened into the encoding arena
struct FlatNode<'a> {
    node: &'a OutlineNode,
    obj_ref: ObjRef,
    /// Arena ids of the direct children
    children: Vec<usize>,
}

/// Encode a bookmark forest into the document's outline object graph and
/// wire it into the catalog. An empty forest still writes the root
/// object (readers expect the catalog entry to resolve) with a zero
/// count and no children.
pub fn write_outline(doc: &mut PdfDocument, nodes: &[OutlineNode]) {
    let root_ref = doc.alloc();

    if nodes.is_empty() {
        let mut root = PdfDictionary::new().with_type("Outlines");
        root.insert("Count", PdfObject::int(0));
        doc.assign(root_ref, PdfObject::Dictionary(root));
        doc.set_outline_root(root_ref);
        return;
    }

    // Pass 1: pre-order reference allocation
    let mut arena: Vec<FlatNode> = Vec::new();
    let top_ids = flatten(doc, nodes, &mut arena);

    // Pass 2: bottom-up dictionary assignment
    for (i, &id) in top_ids.iter().enumerate() {
        let prev = (i > 0).then(|| arena[top_ids[i - 1]].obj_ref);
        let next = top_ids.get(i + 1).map(|&n| arena[n].obj_ref);
        assign_node(doc, &arena, id, root_ref, prev, next);
    }

    let mut root = PdfDictionary::new().with_type("Outlines");
    root.insert_ref("First", arena[top_ids[0]].obj_ref);
    root.insert_ref("Last", arena[*top_ids.last().expect("non-empty")].obj_ref);
    // The root is implicitly open, so its count is unsigned
    root.insert("Count", PdfObject::int(opening_count(nodes)));
    doc.assign(root_ref, PdfObject::Dictionary(root));
    doc.set_outline_root(root_ref);
}

fn flatten<'a>(
    doc: &mut PdfDocument,
    nodes: &'a [OutlineNode],
    arena: &mut Vec<FlatNode<'a>>,
) -> Vec<usize> {
    let mut ids = Vec::with_capacity(nodes.len());
    for node in nodes {
        let id = arena.len();
        arena.push(FlatNode {
            node,
            obj_ref: doc.alloc(),
            children: Vec::new(),
        });
        ids.push(id);
        let child_ids = flatten(doc, &node.children, arena);
        arena[id].children = child_ids;
    }
    ids
}

fn assign_node(
    doc: &mut PdfDocument,
    arena: &[FlatNode<'_>],
    id: usize,
    parent_ref: ObjRef,
    prev: Option<ObjRef>,
    next: Option<ObjRef>,
) {
    let obj_ref = arena[id].obj_ref;
    let node = arena[id].node;
    let children = &arena[id].children;

    // Children first; their references and counts feed this node's entry
    for (i, &child_id) in children.iter().enumerate() {
        let child_prev = (i > 0).then(|| arena[children[i - 1]].obj_ref);
        let child_next = children.get(i + 1).map(|&c| arena[c].obj_ref);
        assign_node(doc, arena, child_id, obj_ref, child_prev, child_next);
    }

    let mut dict = PdfDictionary::new();
    dict.insert("Title", PdfObject::String(encode_text_string(&node.title)));
    dict.insert_ref("Parent", parent_ref);
    if let Some(prev) = prev {
        dict.insert_ref("Prev", prev);
    }
    if let Some(next) = next {
        dict.insert_ref("Next", next);
    }
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        dict.insert_ref("First", arena[first].obj_ref);
        dict.insert_ref("Last", arena[last].obj_ref);

        // Count over the children's expanded walk; closed nodes encode it
        // negative to signal "children exist but start hidden".
        let count = opening_count(&node.children);
        dict.insert(
            "Count",
            PdfObject::int(if node.expanded { count } else { -count }),
        );
    }
    if let Some(dest) = destination(doc, node) {
        dict.insert("Dest", dest);
    }

    doc.assign(obj_ref, PdfObject::Dictionary(dict));
}

/// Number of entries revealed when every node in `nodes` is visible:
/// each node counts itself, and contributes its own visible children
/// only while it is expanded.
fn opening_count(nodes: &[OutlineNode]) -> i64 {
    nodes
        .iter()
        .map(|node| {
            1 + if node.expanded {
                opening_count(&node.children)
            } else {
                0
            }
        })
        .sum()
}

/// Build the destination array for a node, if its page resolves
fn destination(doc: &PdfDocument, node: &OutlineNode) -> Option<PdfObject> {
    if node.page_nr < 1 {
        return None;
    }
    let index = (node.page_nr - 1) as usize;
    let page_ref = doc.page_ref(index)?;

    match node.position {
        Some(pos) => {
            let (width, height) = doc.page_size(index)?;
            // The stored fractions are measured from the top-left; PDF
            // wants the top coordinate in y-up space.
            Some(PdfObject::Array(vec![
                page_ref.into(),
                PdfObject::name("XYZ"),
                PdfObject::Real(pos.x_frac * width),
                PdfObject::Real(height * (1.0 - pos.y_frac)),
                PdfObject::Null,
            ]))
        }
        None => Some(PdfObject::Array(vec![
            page_ref.into(),
            PdfObject::name("Fit"),
        ])),
    }
}

/// Encode a title: Latin-1 compatible titles go out as literal strings,
/// everything else as UTF-16BE with a BOM.
fn encode_text_string(text: &str) -> PdfString {
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        PdfString::Literal(text.chars().map(|c| c as u32 as u8).collect())
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        PdfString::Hex(bytes)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read the outline of an opened PDF into a bookmark forest. A document
/// without an outline yields an empty forest.
pub fn read_outline(src: &mut ParsedPdf) -> Result<Vec<OutlineNode>, ReadError> {
    let Some(root) = src.outline_root()? else {
        return Ok(Vec::new());
    };
    let mut visited = HashSet::new();
    read_siblings(src, root.get("First").cloned(), &mut visited)
}

fn read_siblings(
    src: &mut ParsedPdf,
    first: Option<PdfValue>,
    visited: &mut HashSet<u32>,
) -> Result<Vec<OutlineNode>, ReadError> {
    let mut nodes = Vec::new();
    let mut current = first.and_then(|v| v.as_ref());

    while let Some(r) = current {
        // Guards against sibling/child cycles in malformed files
        if !visited.insert(r.num) {
            break;
        }
        let dict = match src.fetch(r)? {
            PdfValue::Dict(dict) => dict,
            _ => break,
        };

        let next = dict.get("Next").and_then(|v| v.as_ref());

        // Title is required; an entry without one is skipped entirely
        let title_bytes = match dict.get("Title").map(|t| src.resolve(t)) {
            Some(Ok(PdfValue::String(bytes))) => bytes,
            _ => {
                current = next;
                continue;
            }
        };
        let title = sanitize_title(&decode_text_string(&title_bytes));

        let page_nr = match destination_page(src, &dict)? {
            Some(index) => index as i32 + 1,
            None => {
                warn!(title = title.as_str(), "bookmark destination does not resolve to a page");
                NO_PAGE
            }
        };

        let children = read_siblings(src, dict.get("First").cloned(), visited)?;
        // Imported nodes start open whenever they have children; the
        // source's own open/closed state is not carried over.
        nodes.push(OutlineNode::with_children(title, page_nr, children));

        current = next;
    }

    Ok(nodes)
}

/// Resolve an outline entry's target to a 0-based page index. Handles a
/// direct /Dest (explicit array, or a named destination to look up
/// first) and the /A GoTo action form.
fn destination_page(
    src: &mut ParsedPdf,
    dict: &HashMap<String, PdfValue>,
) -> Result<Option<usize>, ReadError> {
    let mut dest = match dict.get("Dest") {
        Some(d) => Some(src.resolve(d)?),
        None => None,
    };

    if dest.is_none() {
        if let Some(action) = dict.get("A") {
            if let PdfValue::Dict(action) = src.resolve(action)? {
                if action.get("S").and_then(|s| s.as_name()) == Some("GoTo") {
                    if let Some(d) = action.get("D") {
                        dest = Some(src.resolve(d)?);
                    }
                }
            }
        }
    }

    let array = match dest {
        Some(PdfValue::Array(items)) => items,
        Some(PdfValue::String(bytes)) => {
            let name = String::from_utf8_lossy(&bytes).to_string();
            match src.resolve_named_destination(&name)? {
                Some(items) => items,
                None => return Ok(None),
            }
        }
        Some(PdfValue::Name(name)) => match src.resolve_named_destination(&name)? {
            Some(items) => items,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    let Some(page_ref) = array.first().and_then(|v| v.as_ref()) else {
        return Ok(None);
    };
    Ok(src.page_index_of(page_ref))
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, or PDFDocEncoding
/// treated as Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Outline titles render on a single line; some malformed writers embed
/// raw line breaks in them.
fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::content::ContentStream;

    fn doc_with_pages(n: usize) -> PdfDocument {
        let mut doc = PdfDocument::new();
        doc.set_compression(false);
        for _ in 0..n {
            doc.add_page(500.0, 800.0, ContentStream::new(), PdfDictionary::new());
        }
        doc
    }

    fn root_dict(doc: &PdfDocument) -> &PdfDictionary {
        let root_ref = doc.outline_root().expect("outline written");
        match doc.object(root_ref) {
            Some(PdfObject::Dictionary(dict)) => dict,
            other => panic!("outline root is not a dictionary: {:?}", other),
        }
    }

    fn root_count(doc: &PdfDocument) -> i64 {
        match root_dict(doc).get("Count") {
            Some(PdfObject::Integer(n)) => *n,
            other => panic!("missing root count: {:?}", other),
        }
    }

    #[test]
    fn test_empty_tree_writes_zero_count_root() {
        let mut doc = doc_with_pages(1);
        write_outline(&mut doc, &[]);

        let root = root_dict(&doc);
        assert_eq!(root_count(&doc), 0);
        assert!(root.get("First").is_none());
        assert!(root.get("Last").is_none());
    }

    #[test]
    fn test_flat_siblings_count() {
        let mut doc = doc_with_pages(3);
        let nodes = vec![
            OutlineNode::new("A", 1),
            OutlineNode::new("B", 2),
            OutlineNode::new("C", 3),
        ];
        write_outline(&mut doc, &nodes);
        assert_eq!(root_count(&doc), 3);
    }

    #[test]
    fn test_closed_children_not_counted_through() {
        // One expanded top node with two closed children, each carrying
        // grandchildren: the grandchildren stay hidden, so 1 + 2 = 3.
        let mut doc = doc_with_pages(2);
        let nodes = vec![OutlineNode::with_children(
            "Top",
            1,
            vec![
                OutlineNode::with_children("C1", 1, vec![OutlineNode::new("G1", 2)]).collapsed(),
                OutlineNode::with_children("C2", 2, vec![OutlineNode::new("G2", 2)]).collapsed(),
            ],
        )];
        write_outline(&mut doc, &nodes);
        assert_eq!(root_count(&doc), 3);
    }

    #[test]
    fn test_closed_node_count_is_negative() {
        let mut doc = doc_with_pages(1);
        let nodes = vec![
            OutlineNode::with_children("Closed", 1, vec![OutlineNode::new("Child", 1)]).collapsed(),
        ];
        write_outline(&mut doc, &nodes);

        let root = root_dict(&doc);
        let first_ref = match root.get("First") {
            Some(PdfObject::Reference(r)) => *r,
            other => panic!("missing First: {:?}", other),
        };
        let node = match doc.object(first_ref) {
            Some(PdfObject::Dictionary(dict)) => dict,
            other => panic!("not a dictionary: {:?}", other),
        };
        assert!(matches!(node.get("Count"), Some(PdfObject::Integer(-1))));
        // Root still shows just the closed node itself
        assert_eq!(root_count(&doc), 1);
    }

    #[test]
    fn test_sibling_and_parent_wiring() {
        let mut doc = doc_with_pages(2);
        let nodes = vec![OutlineNode::new("A", 1), OutlineNode::new("B", 2)];
        write_outline(&mut doc, &nodes);

        let root_ref = doc.outline_root().unwrap();
        let root = root_dict(&doc);
        let (first, last) = match (root.get("First"), root.get("Last")) {
            (Some(PdfObject::Reference(f)), Some(PdfObject::Reference(l))) => (*f, *l),
            other => panic!("bad wiring: {:?}", other),
        };
        assert_ne!(first, last);

        let a = match doc.object(first) {
            Some(PdfObject::Dictionary(dict)) => dict,
            _ => panic!("A missing"),
        };
        assert!(matches!(a.get("Next"), Some(PdfObject::Reference(r)) if *r == last));
        assert!(a.get("Prev").is_none());
        assert!(matches!(a.get("Parent"), Some(PdfObject::Reference(r)) if *r == root_ref));

        let b = match doc.object(last) {
            Some(PdfObject::Dictionary(dict)) => dict,
            _ => panic!("B missing"),
        };
        assert!(matches!(b.get("Prev"), Some(PdfObject::Reference(r)) if *r == first));
        assert!(b.get("Next").is_none());
    }

    #[test]
    fn test_unresolvable_page_gets_no_dest() {
        let mut doc = doc_with_pages(1);
        write_outline(&mut doc, &[OutlineNode::new("Nowhere", NO_PAGE)]);

        let root = root_dict(&doc);
        let first_ref = match root.get("First") {
            Some(PdfObject::Reference(r)) => *r,
            _ => panic!("missing First"),
        };
        let node = match doc.object(first_ref) {
            Some(PdfObject::Dictionary(dict)) => dict,
            _ => panic!("missing node"),
        };
        assert!(node.get("Dest").is_none());
    }

    #[test]
    fn test_xyz_destination_scaled_by_page_size() {
        let mut doc = doc_with_pages(1); // 500 x 800
        let node = OutlineNode::new("Spot", 1).with_position(0.5, 0.25);
        write_outline(&mut doc, &[node]);

        let root = root_dict(&doc);
        let first_ref = match root.get("First") {
            Some(PdfObject::Reference(r)) => *r,
            _ => panic!("missing First"),
        };
        let dict = match doc.object(first_ref) {
            Some(PdfObject::Dictionary(dict)) => dict,
            _ => panic!("missing node"),
        };
        let dest = match dict.get("Dest") {
            Some(PdfObject::Array(items)) => items,
            other => panic!("missing Dest: {:?}", other),
        };
        assert!(matches!(&dest[1], PdfObject::Name(n) if n == "XYZ"));
        assert!(matches!(dest[2], PdfObject::Real(x) if x == 250.0));
        // y_frac 0.25 from the top of an 800pt page → 600 in y-up space
        assert!(matches!(dest[3], PdfObject::Real(y) if y == 600.0));
    }

    #[test]
    fn test_text_string_encoding() {
        assert!(matches!(
            encode_text_string("Chapter 1"),
            PdfString::Literal(bytes) if bytes == b"Chapter 1"
        ));
        match encode_text_string("日本語") {
            PdfString::Hex(bytes) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("expected hex, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(
            decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]),
            "Hi"
        );
        // Latin-1 fallback
        assert_eq!(decode_text_string(&[0xE9]), "é");
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("one\r\nline"), "oneline");
        assert_eq!(sanitize_title("clean"), "clean");
    }
}
