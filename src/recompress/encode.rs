use image::imageops::{self, FilterType};
use image::RgbImage;
use lopdf::{dictionary, Stream};

use crate::error::ImageError;

/// Size after fitting the longest side into `max_dimension`, keeping the
/// aspect ratio. Neither side drops below one pixel.
pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let scaled = |side: u32| ((side as u64 * max_dimension as u64 / longest as u64) as u32).max(1);
    (scaled(width), scaled(height))
}

/// Downscale with Lanczos3 when the image exceeds `max_dimension`.
pub(crate) fn fit_within(img: RgbImage, max_dimension: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height, max_dimension);
    if (new_width, new_height) == (width, height) {
        return img;
    }
    imageops::resize(&img, new_width, new_height, FilterType::Lanczos3)
}

/// Progressive JPEG with optimized Huffman tables.
pub(crate) fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let (width, height) = img.dimensions();
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(ImageError::TooLarge(width, height));
    };

    let mut bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut bytes, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);
    encoder.encode(img.as_raw(), w, h, jpeg_encoder::ColorType::Rgb)?;
    Ok(bytes)
}

/// Fresh image XObject carrying `jpeg`. Marked non-compressible so the save
/// step leaves the DCT data alone.
pub(crate) fn image_stream(jpeg: Vec<u8>, width: u32, height: u32) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    Stream::new(dict, jpeg).with_compression(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_small_images_alone() {
        assert_eq!(fit_dimensions(800, 600, 2600), (800, 600));
        assert_eq!(fit_dimensions(2600, 10, 2600), (2600, 10));
    }

    #[test]
    fn scales_longest_side_to_limit() {
        assert_eq!(fit_dimensions(5200, 2600, 2600), (2600, 1300));
        assert_eq!(fit_dimensions(1000, 3000, 1500), (500, 1500));
    }

    #[test]
    fn extreme_aspect_ratio_keeps_one_pixel() {
        assert_eq!(fit_dimensions(100_000, 1, 1400), (1400, 1));
        assert_eq!(fit_dimensions(3, 50_000, 1400), (1, 1400));
    }

    #[test]
    fn resizes_pixels() {
        let img = RgbImage::from_pixel(400, 200, image::Rgb([10, 20, 30]));
        let out = fit_within(img, 100);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn encodes_progressive_jpeg() {
        let img = RgbImage::from_fn(64, 48, |x, y| image::Rgb([x as u8 * 4, y as u8 * 5, 128]));
        let jpeg = encode_jpeg(&img, 60).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        // SOF2 marks a progressive frame.
        assert!(jpeg.windows(2).any(|w| w == [0xFF, 0xC2]));

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = RgbImage::from_fn(128, 128, |x, y| {
            image::Rgb([(x * y % 256) as u8, (x ^ y) as u8, (x + y) as u8])
        });
        let high = encode_jpeg(&img, 90).unwrap();
        let low = encode_jpeg(&img, 30).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn stream_describes_rgb_jpeg() {
        let stream = image_stream(vec![1, 2, 3], 7, 9);
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 7);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 9);
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert!(!stream.allows_compression);
    }
}
