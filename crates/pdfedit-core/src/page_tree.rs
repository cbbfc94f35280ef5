//! Page tree surgery on lopdf documents
//!
//! Structural edits rebuild the page tree as a single flat `Pages` node.
//! Attributes a page inherits from its ancestors (MediaBox, CropBox,
//! Resources, Rotate) are copied onto the page first so reparenting does not
//! change how it renders.

use crate::backend::PageSize;
use crate::error::PdfServiceError;
use lopdf::{Dictionary, Document, Object, ObjectId};

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic Parent chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when no MediaBox can be found
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfServiceError> {
    Document::load_mem(bytes).map_err(|e| PdfServiceError::ParseError(e.to_string()))
}

pub(crate) fn save(mut doc: Document) -> Result<Vec<u8>, PdfServiceError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfServiceError::OperationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Page object ids in document order
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Look up `key` on the page or the closest ancestor that defines it
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }
    None
}

fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfServiceError> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key).map(|value| (*key, value)))
        .collect();

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

pub(crate) fn page_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, PdfServiceError> {
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| PdfServiceError::OperationError(format!("Invalid page object: {}", e)))
}

/// Object id of the root `Pages` node
pub(crate) fn root_pages_id(doc: &Document) -> Result<ObjectId, PdfServiceError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|_| PdfServiceError::OperationError("No Root in trailer".into()))?;

    doc.get_object(catalog_id)
        .and_then(|obj| obj.as_dict())
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|_| PdfServiceError::OperationError("Catalog has no Pages reference".into()))
}

/// Replace the page tree with one flat node holding `pages` in order
pub(crate) fn rewrite_page_tree(
    doc: &mut Document,
    pages: &[ObjectId],
) -> Result<(), PdfServiceError> {
    let root_id = root_pages_id(doc)?;

    for &page_id in pages {
        materialize_inherited(doc, page_id)?;
        page_dict_mut(doc, page_id)?.set("Parent", Object::Reference(root_id));
    }

    match doc.objects.get_mut(&root_id) {
        Some(Object::Dictionary(root)) => {
            let kids = pages.iter().map(|&id| Object::Reference(id)).collect();
            root.set("Kids", Object::Array(kids));
            root.set("Count", Object::Integer(pages.len() as i64));
            Ok(())
        }
        _ => Err(PdfServiceError::OperationError(
            "Invalid pages dictionary".into(),
        )),
    }
}

/// Add a blank page object (not yet linked into the tree)
pub(crate) fn new_blank_page(doc: &mut Document, size: PageSize) -> ObjectId {
    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(size.width as f32),
            Object::Real(size.height as f32),
        ]),
    );
    page.set("Resources", Object::Dictionary(Dictionary::new()));
    doc.add_object(Object::Dictionary(page))
}

/// Move every object of `source` into `dest` under fresh ids and return the
/// remapped page ids of `source` in order. The pages still point at the
/// source's own tree nodes until the tree is rewritten.
pub(crate) fn absorb_document(dest: &mut Document, source: Document) -> Vec<ObjectId> {
    let offset = dest.max_id;
    let source_pages = page_ids(&source);
    let source_max = source.max_id;

    for (old_id, mut object) in source.objects.into_iter() {
        remap_refs(&mut object, offset);
        dest.objects.insert((old_id.0 + offset, old_id.1), object);
    }
    dest.max_id = dest.max_id.max(source_max + offset);

    source_pages
        .into_iter()
        .map(|(num, generation)| (num + offset, generation))
        .collect()
}

fn remap_refs(object: &mut Object, offset: u32) {
    match object {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => items.iter_mut().for_each(|item| remap_refs(item, offset)),
        Object::Dictionary(dict) => dict
            .iter_mut()
            .for_each(|(_, value)| remap_refs(value, offset)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, value)| remap_refs(value, offset)),
        _ => {}
    }
}

/// MediaBox of a page as `[x1, y1, x2, y2]`, inherited if necessary
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let array = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(array)) => array,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(array)) => array.clone(),
            _ => return DEFAULT_MEDIA_BOX,
        },
        _ => return DEFAULT_MEDIA_BOX,
    };
    parse_box_array(&array).unwrap_or(DEFAULT_MEDIA_BOX)
}

fn parse_box_array(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut result = [0.0; 4];
    for (slot, obj) in result.iter_mut().zip(array) {
        *slot = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }
    Some(result)
}

pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let [x1, y1, x2, y2] = media_box(doc, page_id);
    PageSize {
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    }
}

#[cfg(test)]
pub(crate) mod test_pdf {
    //! In-memory PDFs for tests
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, Stream};

    /// A flat document whose pages carry "Page N" text and a Letter MediaBox
    pub(crate) fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                    ),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            page_ids.push(doc.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Two pages under an intermediate node that owns the (A4) MediaBox
    pub(crate) fn create_nested_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let root_id = doc.new_object_id();
        let branch_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..2 {
            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(branch_id)),
            ]);
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let branch = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Parent", Object::Reference(root_id)),
            ("Count", Object::Integer(2)),
            ("Kids", Object::Array(kids)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
        ]);
        doc.objects.insert(branch_id, Object::Dictionary(branch));

        let root = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(2)),
            ("Kids", Object::Array(vec![Object::Reference(branch_id)])),
        ]);
        doc.objects.insert(root_id, Object::Dictionary(root));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(root_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::test_pdf::{create_nested_pdf, create_test_pdf};
    use super::*;

    #[test]
    fn test_parse_box_array() {
        let array = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ];
        assert_eq!(parse_box_array(&array), Some([0.0, 0.0, 612.0, 792.0]));
        assert_eq!(parse_box_array(&array[..3]), None);
    }

    #[test]
    fn test_inherited_media_box_survives_flattening() {
        let mut doc = load(&create_nested_pdf()).unwrap();
        let pages = page_ids(&doc);
        assert_eq!(page_size(&doc, pages[0]).width, 595.0);

        let reversed: Vec<ObjectId> = pages.iter().rev().copied().collect();
        rewrite_page_tree(&mut doc, &reversed).unwrap();

        let reloaded = load(&save(doc).unwrap()).unwrap();
        let pages = page_ids(&reloaded);
        assert_eq!(pages.len(), 2);
        for page_id in pages {
            let size = page_size(&reloaded, page_id);
            assert_eq!((size.width, size.height), (595.0, 842.0));
        }
    }

    #[test]
    fn test_absorb_document_remaps_ids() {
        let mut dest = load(&create_test_pdf(2)).unwrap();
        let source = load(&create_test_pdf(3)).unwrap();
        let before = dest.max_id;

        let absorbed = absorb_document(&mut dest, source);
        assert_eq!(absorbed.len(), 3);
        assert!(absorbed.iter().all(|id| id.0 > before));

        let mut pages = page_ids(&dest);
        pages.extend(absorbed);
        rewrite_page_tree(&mut dest, &pages).unwrap();
        let reloaded = load(&save(dest).unwrap()).unwrap();
        assert_eq!(reloaded.get_pages().len(), 5);
    }

    #[test]
    fn test_blank_page_has_requested_size() {
        let mut doc = load(&create_test_pdf(1)).unwrap();
        let blank = new_blank_page(
            &mut doc,
            PageSize {
                width: 595.28,
                height: 841.89,
            },
        );
        let size = page_size(&doc, blank);
        assert!((size.width - 595.28).abs() < 0.01);
        assert!((size.height - 841.89).abs() < 0.01);
    }
}
