//! Photo byte validation and JPEG normalization
//!
//! Both providers are told the payload is `image/jpeg`, so anything else the
//! decoder understands is re-encoded before upload.

use std::io::Cursor;

use calorie_types::VisionError;
use image::{ImageFormat, Rgb, RgbImage};

const JPEG_QUALITY: u8 = 90;

/// Validate photo bytes and return them as JPEG
pub fn normalize_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidImageData);
    }

    let format = image::guess_format(bytes).map_err(|_| VisionError::InvalidImageData)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|_| VisionError::InvalidImageData)?;
    if format == ImageFormat::Jpeg {
        return Ok(bytes.to_vec());
    }

    tracing::debug!(?format, "re-encoding photo as JPEG");
    encode_jpeg(&decoded.to_rgb8())
}

/// Small JPEG of a pepperoni pizza on a plate, used to test provider credentials
pub fn sample_meal_image() -> Result<Vec<u8>, VisionError> {
    const WIDTH: u32 = 160;
    const HEIGHT: u32 = 120;
    const PEPPERONI: [(f32, f32); 6] = [
        (-18.0, -14.0),
        (16.0, -18.0),
        (-4.0, 12.0),
        (22.0, 10.0),
        (-26.0, 6.0),
        (2.0, -26.0),
    ];

    let (cx, cy) = (WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);
    let img = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let radius = dx.hypot(dy);
        let on_pepperoni = PEPPERONI
            .iter()
            .any(|&(px, py)| (dx - px).hypot(dy - py) < 6.0);

        if radius < 40.0 && on_pepperoni {
            Rgb([150, 30, 25])
        } else if radius < 40.0 {
            // sauce under melted cheese
            Rgb([235, 170, 70])
        } else if radius < 46.0 {
            Rgb([200, 140, 70])
        } else if radius < 56.0 {
            Rgb([245, 245, 240])
        } else {
            Rgb([120, 85, 55])
        }
    });
    encode_jpeg(&img)
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, VisionError> {
    let mut out = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|_| VisionError::InvalidImageData)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert!(matches!(normalize_to_jpeg(&[]), Err(VisionError::InvalidImageData)));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = normalize_to_jpeg(b"definitely not an image").unwrap_err();
        assert!(matches!(err, VisionError::InvalidImageData));
    }

    #[test]
    fn test_jpeg_passes_through() {
        let jpeg = sample_meal_image().unwrap();
        assert_eq!(normalize_to_jpeg(&jpeg).unwrap(), jpeg);
    }

    #[test]
    fn test_corrupt_jpeg_rejected() {
        let jpeg = sample_meal_image().unwrap();
        let truncated = &jpeg[..20];
        assert_eq!(image::guess_format(truncated).unwrap(), ImageFormat::Jpeg);
        assert!(matches!(normalize_to_jpeg(truncated), Err(VisionError::InvalidImageData)));

        let mut forged = vec![0xFF, 0xD8, 0xFF, 0xE0];
        forged.extend_from_slice(b"only the signature is real");
        assert!(matches!(normalize_to_jpeg(&forged), Err(VisionError::InvalidImageData)));
    }

    #[test]
    fn test_png_is_reencoded() {
        let jpeg = normalize_to_jpeg(&png_bytes()).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_sample_meal_is_jpeg() {
        let jpeg = sample_meal_image().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 120));
    }
}
