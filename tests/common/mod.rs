#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Deterministic pseudo-random bytes (xorshift).
pub fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.extend_from_slice(&seed.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

pub enum Img {
    /// DCTDecode stream at high quality.
    Jpeg { width: u32, height: u32 },
    /// Uncompressed 8-bit DeviceRGB samples.
    Raw { width: u32, height: u32 },
    /// Raw RGB with a DeviceGray soft mask.
    RawWithAlpha { width: u32, height: u32 },
    /// Claims to be a JPEG but is not.
    Corrupt,
}

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    padding: Option<ObjectId>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            padding: None,
        }
    }

    pub fn add_image(&mut self, img: Img) -> ObjectId {
        let stream = match img {
            Img::Jpeg { width, height } => {
                let mut bytes = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), 95);
                encoder
                    .encode_image(&DynamicImage::ImageRgb8(gradient(width, height)))
                    .unwrap();
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    bytes,
                )
                .with_compression(false)
            }
            Img::Raw { width, height } => Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                gradient(width, height).into_raw(),
            ),
            Img::RawWithAlpha { width, height } => {
                let mask_id = self.doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![128; (width * height) as usize],
                ));
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "SMask" => mask_id,
                    },
                    gradient(width, height).into_raw(),
                )
            }
            Img::Corrupt => Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 32,
                    "Height" => 32,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                b"this is not a jpeg bitstream".to_vec(),
            )
            .with_compression(false),
        };
        self.doc.add_object(stream)
    }

    /// Add a page drawing `images`, named `Im0`, `Im1`, ... in its resources.
    pub fn add_page(&mut self, images: &[ObjectId]) -> ObjectId {
        let mut xobjects = lopdf::Dictionary::new();
        let mut content = String::new();
        for (i, id) in images.iter().enumerate() {
            let name = format!("Im{i}");
            content.push_str(&format!("q 100 0 0 100 0 {} cm /{} Do Q\n", i * 100, name));
            xobjects.set(name, *id);
        }
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.kids.push(page_id.into());
        page_id
    }

    /// Attach `len` bytes of incompressible data reachable from the catalog.
    pub fn pad(&mut self, len: usize) -> &mut Self {
        let id = self
            .doc
            .add_object(Stream::new(dictionary! {}, noise(len, 0x9E37_79B9_7F4A_7C15)));
        self.padding = Some(id);
        self
    }

    pub fn save(mut self, path: &Path) {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        if let Some(padding) = self.padding {
            catalog.set("Padding", padding);
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", catalog_id);
        self.doc.save(path).unwrap();
    }
}

/// Image dimensions and filter for every image on every page of `path`.
pub fn output_images(path: &Path) -> Vec<(u32, u32, Vec<u8>)> {
    let doc = Document::load(path).unwrap();
    let mut out = Vec::new();
    for (_, page_id) in doc.get_pages() {
        for image in pdf_target_compressor::pdf::page_images(&doc, page_id) {
            let Ok(Object::Stream(stream)) = doc.get_object(image.id) else {
                panic!("image is not a stream");
            };
            let dim = |k: &str| stream.dict.get(k.as_bytes()).unwrap().as_i64().unwrap() as u32;
            let filter = stream
                .dict
                .get(b"Filter")
                .and_then(Object::as_name)
                .map(<[u8]>::to_vec)
                .unwrap_or_default();
            out.push((dim("Width"), dim("Height"), filter));
        }
    }
    out
}
