//! Image decoding and tensor preparation for ImageNet-style classifiers.

use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::ImageFormat;
use service_core::error::AppError;
use std::io::Cursor;

pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

const MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
const STD: [f32; CHANNELS] = [0.229, 0.224, 0.225];

/// A decoded upload ready for classification.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// CHW, normalized, `CHANNELS * INPUT_SIZE * INPUT_SIZE` values.
    pub tensor: Vec<f32>,
    /// File extension matching the uploaded format.
    pub extension: &'static str,
}

impl PreparedImage {
    pub fn shape() -> [usize; 4] {
        [1, CHANNELS, INPUT_SIZE as usize, INPUT_SIZE as usize]
    }
}

fn extension_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::WebP => "webp",
        ImageFormat::Tiff => "tiff",
        _ => "img",
    }
}

/// Header-only read of the declared size, so nothing is allocated for pixels.
fn declared_dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), AppError> {
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| AppError::bad_request(format!("Invalid image: {}", e)))
}

/// Decode, resize to 224x224 RGB and normalize into a CHW tensor.
///
/// Images declaring a side longer than `max_dimension` are rejected before decoding.
pub fn prepare(bytes: &[u8], max_dimension: u32) -> Result<PreparedImage, AppError> {
    if bytes.is_empty() {
        return Err(AppError::bad_request("Empty image"));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| AppError::bad_request(format!("Unsupported image: {}", e)))?;
    let (width, height) = declared_dimensions(bytes, format)?;
    if width > max_dimension || height > max_dimension {
        return Err(AppError::PayloadTooLarge(format!(
            "Image dimensions {}x{} exceed the {}px limit",
            width, height, max_dimension
        )));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AppError::bad_request(format!("Invalid image: {}", e)))?;

    let rgb = decoded
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut tensor = vec![0.0_f32; CHANNELS * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = (y * INPUT_SIZE + x) as usize;
        for c in 0..CHANNELS {
            let value = f32::from(pixel.0[c]) / 255.0;
            tensor[c * plane + offset] = (value - MEAN[c]) / STD[c];
        }
    }

    Ok(PreparedImage {
        tensor,
        extension: extension_for(format),
    })
}

#[cfg(test)]
pub(crate) fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .unwrap();
    buffer
}

/// A BMP header declaring `width`x`height` 24-bit pixels with no pixel data.
#[cfg(test)]
pub(crate) fn forged_bmp_header(width: i32, height: i32) -> Vec<u8> {
    let mut bmp = Vec::with_capacity(54);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&54_u32.to_le_bytes());
    bmp.extend_from_slice(&0_u32.to_le_bytes());
    bmp.extend_from_slice(&54_u32.to_le_bytes());
    bmp.extend_from_slice(&40_u32.to_le_bytes());
    bmp.extend_from_slice(&width.to_le_bytes());
    bmp.extend_from_slice(&height.to_le_bytes());
    bmp.extend_from_slice(&1_u16.to_le_bytes());
    bmp.extend_from_slice(&24_u16.to_le_bytes());
    for _ in 0..6 {
        bmp.extend_from_slice(&0_u32.to_le_bytes());
    }
    bmp
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 8192;

    #[test]
    fn produces_normalized_chw_tensor() {
        let png = solid_png(32, 16, [255, 0, 128]);
        let prepared = prepare(&png, MAX).unwrap();

        let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
        assert_eq!(prepared.tensor.len(), 3 * plane);
        assert_eq!(prepared.extension, "png");

        let red = prepared.tensor[0];
        let green = prepared.tensor[plane];
        let blue = prepared.tensor[2 * plane];
        // Within one intensity step of the source colour after resampling.
        assert!((red - (1.0 - 0.485) / 0.229).abs() < 0.05);
        assert!((green - (0.0 - 0.456) / 0.224).abs() < 0.05);
        assert!((blue - (128.0 / 255.0 - 0.406) / 0.225).abs() < 0.05);
    }

    #[test]
    fn rejects_empty_and_garbage_input() {
        assert!(matches!(prepare(&[], MAX), Err(AppError::BadRequest(_))));
        assert!(matches!(
            prepare(b"definitely not an image", MAX),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_decoding() {
        let bmp = forged_bmp_header(20_000, 20_000);
        match prepare(&bmp, MAX) {
            Err(AppError::PayloadTooLarge(msg)) => assert!(msg.contains("20000x20000")),
            other => panic!("expected PayloadTooLarge, got {:?}", other.map(|p| p.extension)),
        }

        let png = solid_png(32, 16, [0, 0, 0]);
        assert!(matches!(prepare(&png, 16), Err(AppError::PayloadTooLarge(_))));
        assert!(prepare(&png, 32).is_ok());
    }

    #[test]
    fn shape_matches_tensor_layout() {
        assert_eq!(PreparedImage::shape(), [1, 3, 224, 224]);
    }
}
