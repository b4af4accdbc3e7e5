//! JPEG re-encoding.

use image::{ColorType, DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType as EncodeColor, Encoder};

use super::OptimizeError;

/// Re-encode at `quality` with optimized Huffman tables, progressive when
/// requested. Grayscale input stays grayscale.
pub(crate) fn optimize(
    data: &[u8],
    quality: u8,
    progressive: bool,
) -> Result<Vec<u8>, OptimizeError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
    let width = dimension(decoded.width(), &decoded)?;
    let height = dimension(decoded.height(), &decoded)?;

    let (pixels, color) = match decoded.color() {
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            (decoded.to_luma8().into_raw(), EncodeColor::Luma)
        }
        _ => (decoded.to_rgb8().into_raw(), EncodeColor::Rgb),
    };

    let mut out = Vec::with_capacity(data.len());
    let mut encoder = Encoder::new(&mut out, quality);
    encoder.set_progressive(progressive);
    encoder.set_optimized_huffman_tables(true);
    encoder.encode(&pixels, width, height, color)?;
    Ok(out)
}

fn dimension(value: u32, image: &DynamicImage) -> Result<u16, OptimizeError> {
    u16::try_from(value).map_err(|_| OptimizeError::JpegSize {
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{GenericImageView, Rgb, RgbImage};

    /// Start of frame, progressive DCT.
    const SOF2: [u8; 2] = [0xFF, 0xC2];
    /// Start of frame, baseline DCT.
    const SOF0: [u8; 2] = [0xFF, 0xC0];

    fn gradient_jpeg(quality: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        });
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, quality)
            .encode_image(&img)
            .unwrap();
        data
    }

    fn has_marker(data: &[u8], marker: [u8; 2]) -> bool {
        data.windows(2).any(|w| w == marker)
    }

    #[test]
    fn test_reencode_reduces_high_quality_input() {
        let data = gradient_jpeg(100);

        let optimized = optimize(&data, 75, false).unwrap();

        assert!(optimized.len() < data.len());
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_progressive_output() {
        let data = gradient_jpeg(100);

        let optimized = optimize(&data, 75, true).unwrap();

        assert!(has_marker(&optimized, SOF2), "no progressive frame header");
        assert!(!has_marker(&optimized, SOF0), "baseline frame header present");
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_baseline_output() {
        let data = gradient_jpeg(100);

        let optimized = optimize(&data, 75, false).unwrap();

        assert!(has_marker(&optimized, SOF0));
        assert!(!has_marker(&optimized, SOF2));
    }

    #[test]
    fn test_invalid_jpeg() {
        let result = optimize(b"not a jpeg", 75, true);
        assert!(matches!(result, Err(OptimizeError::Jpeg(_))));
    }
}
