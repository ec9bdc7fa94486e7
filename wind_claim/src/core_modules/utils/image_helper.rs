// Synthetic frames and PNG encoding for exercising the pipeline without a
// camera or a network. The builders produce exact, predictable pixel values
// so quality and fingerprint expectations can be computed by hand.

use image::{ImageEncoder, ImageError, Rgb, RgbImage};

/// A single-pixel checkerboard alternating between `low` and `high` gray levels.
pub fn checkerboard(width: u32, height: u32, low: u8, high: u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = if (x + y) % 2 == 0 { high } else { low };
        Rgb([v, v, v])
    })
}

/// A checkerboard whose cells are `cell` pixels wide.
pub fn block_checkerboard(width: u32, height: u32, cell: u32, low: u8, high: u8) -> RgbImage {
    let cell = cell.max(1);
    RgbImage::from_fn(width, height, |x, y| {
        let v = if (x / cell + y / cell) % 2 == 0 { high } else { low };
        Rgb([v, v, v])
    })
}

/// A frame filled with one gray level.
pub fn uniform(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// A left-to-right intensity ramp from 0 to 255.
pub fn horizontal_ramp(width: u32, height: u32) -> RgbImage {
    let span = width.saturating_sub(1).max(1);
    RgbImage::from_fn(width, height, |x, _| {
        let v = ((x * 255) / span) as u8;
        Rgb([v, v, v])
    })
}

/// Encodes an RGB frame as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}
