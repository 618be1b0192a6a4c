//! Turn a PDF image XObject into an `image::DynamicImage`.

use std::io::Read;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Document, Object, Stream};

use crate::error::ImageError;

const UNSUPPORTED_FILTERS: [&[u8]; 3] = [b"JPXDecode", b"JBIG2Decode", b"CCITTFaxDecode"];

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Filter names in application order, with indirect entries resolved.
fn filter_names(doc: &Document, stream: &Stream) -> Vec<Vec<u8>> {
    let Ok(filter) = stream.dict.get(b"Filter") else {
        return Vec::new();
    };
    match resolve(doc, filter) {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut buffer = Vec::new();
    decoder
        .read_to_end(&mut buffer)
        .map_err(|e| ImageError::Stream(format!("manual zlib failed: {e}")))?;
    Ok(buffer)
}

/// Raw sample bytes. Falls back to a plain zlib inflate when lopdf cannot
/// decode a Flate stream (indirect filter entries, broken predictors).
fn decompress(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>, ImageError> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    match stream.decompressed_content() {
        Ok(content) => Ok(content),
        Err(_) if filters.len() == 1 && filters[0] == b"FlateDecode" => inflate(&stream.content),
        Err(e) => Err(ImageError::Stream(format!("{e:?}"))),
    }
}

/// Sample layout of a raw (non-JPEG) image.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorModel>,
        lookup: Vec<u8>,
    },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }

    fn from_components(n: i64) -> Result<Self, ImageError> {
        match n {
            1 => Ok(ColorModel::Gray),
            3 => Ok(ColorModel::Rgb),
            4 => Ok(ColorModel::Cmyk),
            _ => Err(ImageError::Unsupported(format!("{n} color components"))),
        }
    }
}

fn color_model(doc: &Document, obj: &Object) -> Result<ColorModel, ImageError> {
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
            other => Err(ImageError::Unsupported(format!(
                "color space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(arr) => {
            let family = arr
                .first()
                .and_then(|o| resolve(doc, o).as_name().ok())
                .ok_or_else(|| ImageError::Unsupported("empty color space array".into()))?;
            match family {
                b"ICCBased" => {
                    let profile = arr.get(1).map(|o| resolve(doc, o));
                    let Some(Object::Stream(profile)) = profile else {
                        return Err(ImageError::Unsupported("ICCBased without profile".into()));
                    };
                    let n = profile
                        .dict
                        .get(b"N")
                        .and_then(Object::as_i64)
                        .map_err(|_| ImageError::Unsupported("ICCBased without /N".into()))?;
                    ColorModel::from_components(n)
                }
                b"CalGray" => Ok(ColorModel::Gray),
                b"CalRGB" => Ok(ColorModel::Rgb),
                b"Indexed" | b"I" => {
                    let base = arr
                        .get(1)
                        .ok_or_else(|| ImageError::Unsupported("Indexed without base".into()))?;
                    let base = color_model(doc, base)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return Err(ImageError::Unsupported("nested Indexed".into()));
                    }
                    let lookup = match arr.get(3).map(|o| resolve(doc, o)) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => s
                            .decompressed_content()
                            .unwrap_or_else(|_| s.content.clone()),
                        _ => {
                            return Err(ImageError::Unsupported("Indexed without lookup".into()))
                        }
                    };
                    Ok(ColorModel::Indexed {
                        base: Box::new(base),
                        lookup,
                    })
                }
                other => Err(ImageError::Unsupported(format!(
                    "color space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(ImageError::Unsupported("malformed color space".into())),
    }
}

/// Expand packed samples to one byte each. Non-indexed data is rescaled to
/// 0..=255; indexed data keeps raw palette indices.
fn unpack(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bits: u8,
    scale: bool,
) -> Result<Vec<u8>, ImageError> {
    let mismatch = || ImageError::SizeMismatch {
        width: u32::try_from(width).unwrap_or(u32::MAX),
        height: u32::try_from(height).unwrap_or(u32::MAX),
        components,
    };
    let samples_per_row = width.checked_mul(components).ok_or_else(mismatch)?;
    let row_bytes = match bits {
        1 | 2 | 4 | 8 => samples_per_row
            .checked_mul(bits as usize)
            .map(|b| b.div_ceil(8)),
        16 => samples_per_row.checked_mul(2),
        other => {
            return Err(ImageError::Unsupported(format!(
                "{other} bits per component"
            )))
        }
    }
    .ok_or_else(mismatch)?;
    let total = row_bytes.checked_mul(height).ok_or_else(mismatch)?;
    if data.len() < total {
        return Err(mismatch());
    }

    if bits == 8 {
        return Ok(data[..total].to_vec());
    }

    let mut out = Vec::with_capacity(samples_per_row.saturating_mul(height));
    for row in data.chunks_exact(row_bytes).take(height) {
        if bits == 16 {
            // High byte is enough for an 8-bit re-encode.
            out.extend(row.chunks_exact(2).map(|pair| pair[0]));
            continue;
        }
        let max = (1u16 << bits) - 1;
        for i in 0..samples_per_row {
            let bit_offset = i * bits as usize;
            let byte = row[bit_offset / 8];
            let shift = 8 - bits as usize - (bit_offset % 8);
            let value = (byte >> shift) as u16 & max;
            out.push(if scale {
                (value * 255 / max) as u8
            } else {
                value as u8
            });
        }
    }
    Ok(out)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    cmyk.chunks_exact(4)
        .flat_map(|px| {
            let k = 1.0 - px[3] as f32 / 255.0;
            [0, 1, 2].map(|i| ((1.0 - px[i] as f32 / 255.0) * k * 255.0).round() as u8)
        })
        .collect()
}

fn to_image(
    model: &ColorModel,
    samples: Vec<u8>,
    width: u32,
    height: u32,
) -> Result<DynamicImage, ImageError> {
    let mismatch = || ImageError::SizeMismatch {
        width,
        height,
        components: model.components(),
    };
    match model {
        ColorModel::Gray => GrayImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(mismatch),
        ColorModel::Rgb => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(mismatch),
        ColorModel::Cmyk => RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(mismatch),
        ColorModel::Indexed { base, lookup } => {
            let n = base.components();
            let expanded: Vec<u8> = samples
                .iter()
                .flat_map(|&index| {
                    let start = index as usize * n;
                    match lookup.get(start..start + n) {
                        Some(entry) => entry.to_vec(),
                        None => vec![0; n],
                    }
                })
                .collect();
            to_image(base, expanded, width, height)
        }
    }
}

fn dimension(stream: &Stream, key: &[u8]) -> Result<u32, ImageError> {
    stream
        .dict
        .get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
        .ok_or_else(|| {
            ImageError::Unsupported(format!("missing {}", String::from_utf8_lossy(key)))
        })
}

/// `/Decode [1 0 ...]` flips sample values.
fn is_inverted(doc: &Document, stream: &Stream) -> bool {
    let Ok(decode) = stream.dict.get(b"Decode") else {
        return false;
    };
    let Object::Array(arr) = resolve(doc, decode) else {
        return false;
    };
    let bound = |i: usize| arr.get(i).and_then(|o| o.as_float().ok());
    matches!((bound(0), bound(1)), (Some(lo), Some(hi)) if lo > hi)
}

/// Decode the image stream to pixels.
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, ImageError> {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|n| n == b"Image")
        .unwrap_or(false);
    if !is_image {
        return Err(ImageError::NotAnImage);
    }

    let filters = filter_names(doc, stream);
    if let Some(unsupported) = filters
        .iter()
        .find(|f| UNSUPPORTED_FILTERS.contains(&f.as_slice()))
    {
        return Err(ImageError::Unsupported(format!(
            "filter {}",
            String::from_utf8_lossy(unsupported)
        )));
    }

    // JPEG data: hand the bitstream straight to the codec.
    if let Some(position) = filters.iter().position(|f| f == b"DCTDecode") {
        let bytes = match &filters[..position] {
            [] => stream.content.clone(),
            [flate] if flate == b"FlateDecode" => inflate(&stream.content)?,
            _ => {
                return Err(ImageError::Unsupported(
                    "filters before DCTDecode".into(),
                ))
            }
        };
        return Ok(image::load_from_memory(&bytes)?);
    }

    if stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
    {
        return Err(ImageError::Unsupported("stencil mask".into()));
    }

    let width = dimension(stream, b"Width")?;
    let height = dimension(stream, b"Height")?;
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    let bits = u8::try_from(bits)
        .map_err(|_| ImageError::Unsupported(format!("{bits} bits per component")))?;

    let content = decompress(stream, &filters)?;

    let model = match stream.dict.get(b"ColorSpace") {
        Ok(cs) => color_model(doc, cs)?,
        // Guess from the buffer size.
        Err(_) => {
            let pixels = (width as usize).checked_mul(height as usize);
            let holds = |n: usize| pixels.and_then(|p| p.checked_mul(n)) == Some(content.len());
            if bits == 8 && holds(4) {
                ColorModel::Cmyk
            } else if bits == 8 && holds(3) {
                ColorModel::Rgb
            } else {
                ColorModel::Gray
            }
        }
    };

    let indexed = matches!(model, ColorModel::Indexed { .. });
    let mut samples = unpack(
        &content,
        width as usize,
        height as usize,
        model.components(),
        bits,
        !indexed,
    )?;
    if !indexed && is_inverted(doc, stream) {
        samples.iter_mut().for_each(|s| *s = 255 - *s);
    }

    to_image(&model, samples, width, height)
}
