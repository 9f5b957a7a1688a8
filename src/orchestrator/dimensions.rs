use image::ImageReader;
use std::io::Cursor;

pub const DEFAULT_MIN_IMAGE_DIMENSION: u32 = 64;

/// Width and height from the image header, without decoding pixels.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// `false` for unreadable images and for images smaller than `min` on either side.
pub fn meets_min_dimension(data: &[u8], min: u32) -> bool {
    image_dimensions(data).is_some_and(|(width, height)| width >= min && height >= min)
}
