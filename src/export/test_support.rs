//! In-memory PDFs for export tests

use lopdf::{dictionary, Document, Object, Stream};

/// A tiny TrueType face: `.notdef` (500), H (700), e (550), l (250),
/// o (600) and é (550) at glyph ids 0..=5, 1000 units per em
pub const TEST_FONT: &[u8] = include_bytes!("../../tests/fixtures/annota-test.ttf");

/// A document with `count` letter-size pages, each with a small content stream
pub fn pdf_with_pages(count: usize) -> Vec<u8> {
    build(count, 612, 792, true)
}

/// A single page of the given size with no content stream
pub fn single_page_pdf(width: i64, height: i64) -> Vec<u8> {
    build(1, width, height, false)
}

fn build(count: usize, width: i64, height: i64, with_content: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(count);
    for _ in 0..count {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        };
        if with_content {
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                b"0 0 1 rg\n10 10 50 50 re\nf\n".to_vec(),
            ));
            page.set("Contents", content_id);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("in-memory save");
    buffer
}
