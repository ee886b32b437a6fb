//! Image-to-PDF conversion
//!
//! Each image becomes one full-bleed page sized to its pixel dimensions.
//! JPEG data is embedded untouched (`DCTDecode`), with the colour space read
//! from its frame header; other formats are decoded and stored as
//! Flate-compressed samples with an `SMask` for alpha.
//!
//! Entries that are not images, or fail to decode, are skipped. Every skip
//! is reported back in [`ImageBatch::skipped`].

use crate::config::TransformOptions;
use crate::error::{PageSetError, Result};
use crate::output::OutputDocument;
use crate::source::{ImageKind, SourceDocument, SourceKind};
use crate::tree::finish;
use flate2::{write::ZlibEncoder, Compression};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, instrument, warn};

/// An input left out of the output, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedImage {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ImageBatch {
    pub output: OutputDocument,
    pub skipped: Vec<SkippedImage>,
}

/// Decoded-enough image ready to become an XObject
struct RasterImage {
    width: u32,
    height: u32,
    stream: Stream,
    smask: Option<Stream>,
}

/// Wrap each image as its own page, in list order
#[instrument(skip_all, fields(images = images.len()))]
pub fn images_to_document(
    images: &[SourceDocument],
    options: &TransformOptions,
) -> Result<ImageBatch> {
    images_to_document_with_skips(images, Vec::new(), options)
}

/// Same as [`images_to_document`], carrying skips already recorded upstream
/// (files that never made it to a [`SourceDocument`])
pub fn images_to_document_with_skips(
    images: &[SourceDocument],
    mut skipped: Vec<SkippedImage>,
    options: &TransformOptions,
) -> Result<ImageBatch> {
    options.validate()?;

    let mut doc = Document::with_version(options.pdf_version.as_str());
    let pages_id = doc.new_object_id();
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut first_stem = None;

    for source in images {
        let raster = match source.kind() {
            SourceKind::Image(kind) => raster_image(source.bytes(), kind),
            SourceKind::Pdf => Err(PageSetError::UnsupportedFormat {
                name: source.name().to_string(),
                mime: source.kind().mime().to_string(),
            }
            .to_string()),
        };

        match raster {
            Ok(raster) => {
                debug!(
                    name = source.name(),
                    width = raster.width,
                    height = raster.height,
                    "embedding image"
                );
                page_ids.push(add_image_page(&mut doc, pages_id, raster, options)?);
                first_stem.get_or_insert_with(|| source.stem().to_string());
            }
            Err(reason) => {
                warn!(name = source.name(), %reason, "skipping image");
                skipped.push(SkippedImage {
                    name: source.name().to_string(),
                    reason,
                });
            }
        }
    }

    if page_ids.is_empty() {
        return Err(PageSetError::EmptySelection("No convertible images".into()));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
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

    let page_count = page_ids.len() as u32;
    let filename = match (page_count, first_stem) {
        (1, Some(stem)) => format!("{}.pdf", stem),
        _ => "images.pdf".to_string(),
    };

    let bytes = finish(doc, options)?;
    info!(page_count, skipped = skipped.len(), "image conversion complete");

    Ok(ImageBatch {
        output: OutputDocument::new(bytes, filename, page_count),
        skipped,
    })
}

/// Add the image XObject(s), a content stream and a page; returns the page id
fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    raster: RasterImage,
    options: &TransformOptions,
) -> Result<ObjectId> {
    let RasterImage {
        width,
        height,
        mut stream,
        smask,
    } = raster;

    if let Some(smask) = smask {
        let smask_id = doc.add_object(smask);
        stream.dict.set("SMask", Object::Reference(smask_id));
    }
    let image_id = doc.add_object(stream);

    let scale = options.points_per_pixel();
    let page_width = width as f32 * scale;
    let page_height = height as f32 * scale;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PageSetError::Operation(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let resources = Dictionary::from_iter(vec![(
        "XObject",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "Im0",
            Object::Reference(image_id),
        )])),
    )]);

    let page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]);

    Ok(doc.add_object(page))
}

fn raster_image(bytes: &[u8], kind: ImageKind) -> std::result::Result<RasterImage, String> {
    let raster = match kind {
        ImageKind::Jpeg => jpeg_passthrough(bytes)?,
        ImageKind::Png | ImageKind::Webp => {
            let img = image::load_from_memory_with_format(bytes, kind.image_format())
                .map_err(|e| format!("Failed to decode image: {}", e))?;
            flate_encoded(&img)?
        }
    };

    if raster.width == 0 || raster.height == 0 {
        return Err("Image has zero width or height".to_string());
    }
    Ok(raster)
}

/// Embed JPEG bytes as-is; only the header is read
fn jpeg_passthrough(bytes: &[u8]) -> std::result::Result<RasterImage, String> {
    let header = read_jpeg_header(bytes)?;
    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => return Err(format!("Unsupported JPEG with {} colour components", n)),
    };

    let mut dict = image_dict(header.width, header.height, color_space, "DCTDecode");
    if header.components == 4 && header.adobe {
        // Adobe writes CMYK inverted
        let decode = [1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer);
        dict.set("Decode", Object::Array(decode.to_vec()));
    }

    Ok(RasterImage {
        width: header.width,
        height: header.height,
        stream: Stream::new(dict, bytes.to_vec()),
        smask: None,
    })
}

/// What the frame header says about a baseline or progressive JPEG
#[derive(Debug, PartialEq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
    /// An Adobe APP14 segment is present
    adobe: bool,
}

/// Walk the marker segments up to the first scan
fn read_jpeg_header(bytes: &[u8]) -> std::result::Result<JpegHeader, String> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err("Invalid JPEG: missing start-of-image marker".to_string());
    }
    let truncated = || "Invalid JPEG: truncated header".to_string();

    let mut pos = 2;
    let mut adobe = false;
    let mut frame: Option<(u32, u32, u8)> = None;

    loop {
        while bytes.get(pos) == Some(&0xFF) && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        let marker = match (bytes.get(pos), bytes.get(pos + 1)) {
            (Some(0xFF), Some(&marker)) => marker,
            _ => return Err(truncated()),
        };
        pos += 2;

        // Standalone markers carry no length
        if matches!(marker, 0x01 | 0xD0..=0xD7) {
            continue;
        }
        if marker == 0xD9 {
            return Err("Invalid JPEG: no image data".to_string());
        }

        let length = match bytes.get(pos..pos + 2) {
            Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]) as usize,
            _ => return Err(truncated()),
        };
        if length < 2 {
            return Err(truncated());
        }
        let segment = bytes.get(pos + 2..pos + length).ok_or_else(truncated)?;

        match marker {
            // SOF0-SOF15; C4, C8 and CC are DHT, JPG and DAC
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let &[precision, h1, h0, w1, w0, components, ..] = segment else {
                    return Err(truncated());
                };
                if precision != 8 {
                    return Err(format!("Unsupported {}-bit JPEG", precision));
                }
                let height = u16::from_be_bytes([h1, h0]) as u32;
                let width = u16::from_be_bytes([w1, w0]) as u32;
                frame = Some((width, height, components));
            }
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            0xDA => {
                let (width, height, components) = frame
                    .ok_or_else(|| "Invalid JPEG: scan before frame header".to_string())?;
                return Ok(JpegHeader {
                    width,
                    height,
                    components,
                    adobe,
                });
            }
            _ => {}
        }
        pos += length;
    }
}

fn flate_encoded(img: &DynamicImage) -> std::result::Result<RasterImage, String> {
    let (width, height) = (img.width(), img.height());
    let color = img.color();

    let (samples, color_space) = if color.has_color() {
        (img.to_rgb8().into_raw(), "DeviceRGB")
    } else {
        (img.to_luma8().into_raw(), "DeviceGray")
    };

    let stream = Stream::new(
        image_dict(width, height, color_space, "FlateDecode"),
        deflate(&samples)?,
    );

    let smask = if color.has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
        Some(Stream::new(
            image_dict(width, height, "DeviceGray", "FlateDecode"),
            deflate(&alpha)?,
        ))
    } else {
        None
    };

    Ok(RasterImage {
        width,
        height,
        stream,
        smask,
    })
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict
}

fn deflate(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| format!("Failed to compress image data: {}", e))?;
    encoder
        .finish()
        .map_err(|e| format!("Failed to finish compression: {}", e))
}
