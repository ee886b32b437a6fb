//! Test fixtures shared by the unit tests

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// Build a PDF with N pages, each drawing the text "{prefix}-Page-{n}"
pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content_id = add_label_content(&mut doc, &format!("{}-Page-{}", prefix, i + 1));

        // MediaBox lives on the Pages node so inheritance gets exercised
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
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
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    save(doc)
}

fn add_label_content(doc: &mut Document, label: &str) -> ObjectId {
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
                    label.as_bytes().to_vec(),
                    lopdf::StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()))
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn page_box(width: i64, height: i64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(height),
    ])
}

/// Three pages under two intermediate Pages nodes:
/// - pages 1-2 inherit `Resources` and `Rotate 90` from the first node
/// - page 3 inherits a 300x400 `MediaBox` from the second node
///
/// The root carries the 612x792 default.
pub fn create_nested_pdf(prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let root_id = doc.new_object_id();
    let first_id = doc.new_object_id();
    let second_id = doc.new_object_id();

    let leaf = |doc: &mut Document, parent: ObjectId, n: u32| {
        let content_id = add_label_content(doc, &format!("{}-Page-{}", prefix, n));
        doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(parent)),
            ("Contents", Object::Reference(content_id)),
        ]))
    };
    let page1 = leaf(&mut doc, first_id, 1);
    let page2 = leaf(&mut doc, first_id, 2);
    let page3 = leaf(&mut doc, second_id, 3);

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources = Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]);

    doc.objects.insert(
        first_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Parent", Object::Reference(root_id)),
            ("Count", Object::Integer(2)),
            (
                "Kids",
                Object::Array(vec![Object::Reference(page1), Object::Reference(page2)]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Rotate", Object::Integer(90)),
        ])),
    );
    doc.objects.insert(
        second_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Parent", Object::Reference(root_id)),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page3)])),
            ("MediaBox", page_box(300, 400)),
        ])),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(3)),
            (
                "Kids",
                Object::Array(vec![Object::Reference(first_id), Object::Reference(second_id)]),
            ),
            ("MediaBox", page_box(612, 792)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(root_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    save(doc)
}

/// Point the rest of the document at the last page from everywhere a real
/// file might: a link on page 1, a named destination, the structure tree,
/// and a form widget living on the last page.
pub fn with_references_to_last_page(bytes: &[u8]) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    let first = *pages.values().next().unwrap();
    let last = *pages.values().last().unwrap();
    let dest = || {
        Object::Array(vec![
            Object::Reference(last),
            Object::Name(b"Fit".to_vec()),
        ])
    };

    let link_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", page_box(100, 20)),
        ("Dest", dest()),
    ]));
    let widget_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Widget".to_vec())),
        ("Rect", page_box(100, 20)),
        ("FT", Object::Name(b"Tx".to_vec())),
        ("T", Object::string_literal("secret")),
        ("V", Object::string_literal("hidden-field-value")),
        ("P", Object::Reference(last)),
    ]));
    let struct_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"StructElem".to_vec())),
        ("S", Object::Name(b"P".to_vec())),
        ("Pg", Object::Reference(last)),
    ]));
    let struct_root_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"StructTreeRoot".to_vec())),
        ("K", Object::Array(vec![Object::Reference(struct_id)])),
    ]));
    let dests_id = doc.add_object(Dictionary::from_iter(vec![(
        "Names",
        Object::Array(vec![Object::string_literal("last"), dest()]),
    )]));

    let set_annots = |doc: &mut Document, page, annot| {
        doc.get_object_mut(page)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Annots", Object::Array(vec![Object::Reference(annot)]));
    };
    set_annots(&mut doc, first, link_id);
    set_annots(&mut doc, last, widget_id);

    let catalog = doc.catalog_mut().unwrap();
    catalog.set(
        "Names",
        Object::Dictionary(Dictionary::from_iter(vec![("Dests", Object::Reference(dests_id))])),
    );
    catalog.set("StructTreeRoot", Object::Reference(struct_root_id));
    catalog.set(
        "AcroForm",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "Fields",
            Object::Array(vec![Object::Reference(widget_id)]),
        )])),
    );

    save(doc)
}

/// Mark a PDF as encrypted by adding a standard security handler entry
pub fn encrypted(bytes: &[u8]) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).unwrap();
    let encrypt_id = doc.add_object(Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(1)),
        ("R", Object::Integer(2)),
        ("O", Object::string_literal(vec![0u8; 32])),
        ("U", Object::string_literal(vec![0u8; 32])),
        ("P", Object::Integer(-4)),
    ]));
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    save(doc)
}

/// Text drawn on each page of a PDF, in page order
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            let start = text.find('(').map(|i| i + 1).unwrap_or(0);
            let end = text[start..].find(')').map(|i| i + start).unwrap_or(text.len());
            text[start..end].to_string()
        })
        .collect()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub fn png_rgba_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 200, 30]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}
