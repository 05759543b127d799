//! Page-tree helpers on top of lopdf

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::error::{ExportError, Result};
use crate::geometry::PageBox;

/// Guard against cyclic `Parent` chains
const MAX_TREE_DEPTH: usize = 32;

/// Id of the first page in document order
pub fn first_page(doc: &Document) -> Result<ObjectId> {
    doc.get_pages()
        .into_values()
        .next()
        .ok_or(ExportError::NoPages)
}

/// Follow a reference; other objects are returned as-is
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut node = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(resolve(doc, value)?.clone()));
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node = doc.get_dictionary(*parent)?,
            _ => return Ok(None),
        }
    }
    Err(ExportError::Structure("page tree too deep".to_string()))
}

/// The page's MediaBox
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited(doc, page_id, b"MediaBox")?
        .ok_or_else(|| ExportError::Structure("page has no MediaBox".to_string()))?;
    let values = media_box
        .as_array()
        .map_err(|_| ExportError::Structure("MediaBox is not an array".to_string()))?
        .iter()
        .map(|v| resolve(doc, v).and_then(|v| v.as_float().map_err(ExportError::from)))
        .collect::<Result<Vec<f32>>>()?;
    match values.as_slice() {
        [llx, lly, urx, ury] => Ok(PageBox::from_corners(*llx, *lly, *urx, *ury)),
        _ => Err(ExportError::Structure(format!(
            "MediaBox has {} entries",
            values.len()
        ))),
    }
}

/// The page's resources as an owned dictionary.
///
/// Inherited and indirect dictionaries are copied in, as are indirect
/// `Font` and `ExtGState` sub-dictionaries, so the result can be extended
/// and written back onto the page without touching shared objects.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut resources = match inherited(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => dict,
        Some(_) => return Err(ExportError::Structure("Resources is not a dictionary".to_string())),
        None => Dictionary::new(),
    };

    for category in [b"Font".as_slice(), b"ExtGState".as_slice()] {
        let resolved = match resources.get(category) {
            Ok(obj @ Object::Reference(_)) => Some(resolve(doc, obj)?.clone()),
            _ => None,
        };
        if let Some(obj) = resolved {
            resources.set(category.to_vec(), obj);
        }
    }
    Ok(resources)
}

/// Register `object` under a fresh name in a resource category
pub fn add_resource(
    resources: &mut Dictionary,
    category: &[u8],
    prefix: &str,
    object: Object,
) -> Result<String> {
    if resources.get(category).is_err() {
        resources.set(category.to_vec(), Dictionary::new());
    }
    let entries = resources
        .get_mut(category)?
        .as_dict_mut()
        .map_err(|_| ExportError::Structure("resource category is not a dictionary".to_string()))?;

    let mut key = prefix.to_string();
    let mut n = 1;
    while entries.has(key.as_bytes()) {
        n += 1;
        key = format!("{}{}", prefix, n);
    }
    entries.set(key.clone().into_bytes(), object);
    Ok(key)
}

/// Existing content stream references of a page, flattened
fn content_refs(doc: &Document, page: &Dictionary) -> Result<Vec<Object>> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Ok(Object::Array(items)) => Ok(items.clone()),
        _ => Ok(Vec::new()),
    }
}

/// Append a content stream after the page's existing content.
///
/// The original content is wrapped in `q … Q` so whatever graphics state it
/// leaves behind does not leak into the appended drawing.
pub fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
    content: Vec<u8>,
) -> Result<()> {
    let existing = content_refs(doc, doc.get_dictionary(page_id)?)?;

    let mut contents = Vec::with_capacity(existing.len() + 2);
    let mut appended = Vec::with_capacity(content.len() + 2);
    if !existing.is_empty() {
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        appended.extend_from_slice(b"Q\n");
    }
    appended.extend_from_slice(&content);
    let appended_id = doc.add_object(Stream::new(Dictionary::new(), appended));
    contents.push(Object::Reference(appended_id));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{pdf_with_pages, single_page_pdf};
    use lopdf::dictionary;

    #[test]
    fn test_first_page_and_box() {
        let doc = Document::load_mem(&single_page_pdf(612, 792)).unwrap();
        let page = first_page(&doc).unwrap();
        let media = page_box(&doc, page).unwrap();
        assert_eq!(media.size.width, 612.0);
        assert_eq!(media.size.height, 792.0);
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            }),
        );
        let media = page_box(&doc, page_id).unwrap();
        assert_eq!(media.size.width, 300.0);
        assert_eq!(media.size.height, 400.0);
    }

    #[test]
    fn test_add_resource_avoids_collisions() {
        let mut resources = Dictionary::new();
        let first = add_resource(&mut resources, b"Font", "FAnnota", Object::Null).unwrap();
        let second = add_resource(&mut resources, b"Font", "FAnnota", Object::Null).unwrap();
        assert_eq!(first, "FAnnota");
        assert_eq!(second, "FAnnota2");
    }

    #[test]
    fn test_append_content_wraps_existing_stream() {
        let mut doc = Document::load_mem(&pdf_with_pages(1)).unwrap();
        let page = first_page(&doc).unwrap();
        let resources = page_resources(&doc, page).unwrap();
        append_content(&mut doc, page, resources, b"0 0 m\n".to_vec()).unwrap();

        let contents = doc.get_dictionary(page).unwrap().get(b"Contents").unwrap();
        let refs = contents.as_array().unwrap();
        assert_eq!(refs.len(), 3);

        let combined = doc.get_page_content(page).unwrap();
        let text = String::from_utf8_lossy(&combined);
        assert!(text.starts_with("q"));
        assert!(text.contains("Q\n0 0 m"));
    }
}
