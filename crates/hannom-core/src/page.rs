//! Page identity.

use image::RgbImage;
use sha2::{Digest, Sha256};

/// Content key for a page image.
///
/// Lowercase hex SHA-256 over the dimensions and raw RGB bytes. Front ends use
/// it to keep canvas state attached to the page it was drawn on.
pub fn page_key(image: &RgbImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_page_key_is_stable() {
        let image = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
        let key = page_key(&image);

        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, page_key(&image.clone()));
    }

    #[test]
    fn test_page_key_tracks_content() {
        let mut image = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
        let before = page_key(&image);

        image.put_pixel(3, 2, Rgb([10, 20, 31]));
        assert_ne!(before, page_key(&image));
    }

    #[test]
    fn test_page_key_tracks_dimensions() {
        let wide = RgbImage::from_pixel(8, 4, Rgb([0, 0, 0]));
        let tall = RgbImage::from_pixel(4, 8, Rgb([0, 0, 0]));
        assert_ne!(page_key(&wide), page_key(&tall));
    }
}
