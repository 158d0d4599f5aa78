//! Patch extraction: cutting box regions out of a page for recognition.

use image::{Rgb, RgbImage, imageops};
use tracing::{debug, trace};

use super::{BoundingBox, MIN_AREA, Point, Rect, Transform};
use crate::error::GeometryError;

/// An owned RGB pixel buffer cut from a page.
pub type Patch = RgbImage;

/// Extracts patches, de-skewing rotated or skewed boxes.
#[derive(Debug, Clone)]
pub struct PatchExtractor {
    parallelogram_tolerance: f32,
}

impl PatchExtractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self {
            parallelogram_tolerance: 0.5,
        }
    }

    /// Set the tolerance (in pixels) under which a box is treated as a parallelogram
    /// and resampled through an affine rather than a perspective transform.
    pub fn with_parallelogram_tolerance(mut self, tolerance: f32) -> Self {
        self.parallelogram_tolerance = tolerance;
        self
    }

    /// Extract the patch under `bbox`.
    ///
    /// Axis-aligned boxes are cropped without resampling. Other quadrilaterals
    /// are warped onto a rectangle as wide as the box's longer horizontal edge
    /// and as tall as its longer vertical edge. Corners outside the page are
    /// clamped to it.
    ///
    /// # Errors
    ///
    /// [`GeometryError::InvalidGeometry`] when the box is degenerate or lies
    /// entirely outside the page.
    pub fn extract(&self, image: &RgbImage, bbox: &BoundingBox) -> Result<Patch, GeometryError> {
        bbox.validate()?;

        let (width, height) = image.dimensions();
        let page = Rect::new(0.0, 0.0, width as f32, height as f32);
        if bbox.rect().intersection(&page).is_none() {
            return Err(GeometryError::invalid(format!(
                "box {:?} lies outside the {}x{} page",
                bbox.to_flat(),
                width,
                height
            )));
        }

        let clipped = bbox.clamp_to(width, height);
        if clipped.area() < MIN_AREA {
            return Err(GeometryError::invalid(format!(
                "box {:?} collapses to zero area inside the {}x{} page",
                bbox.to_flat(),
                width,
                height
            )));
        }

        if clipped.is_axis_aligned() {
            crop_rect(image, &clipped.rect())
        } else {
            self.warp(image, &clipped.normalized())
        }
    }

    /// Extract one patch per box. A failing box does not affect the others.
    pub fn extract_all(
        &self,
        image: &RgbImage,
        boxes: &[BoundingBox],
    ) -> Vec<Result<Patch, GeometryError>> {
        boxes.iter().map(|bbox| self.extract(image, bbox)).collect()
    }

    fn warp(&self, image: &RgbImage, quad: &BoundingBox) -> Result<Patch, GeometryError> {
        // At least one pixel each way
        let out_width = quad.width().round().max(1.0) as u32;
        let out_height = quad.height().round().max(1.0) as u32;

        let (w, h) = (out_width as f32, out_height as f32);
        let target = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ];

        // Maps patch coordinates back onto the page
        let [tl, tr, _, bl] = quad.points;
        let transform = if quad.is_parallelogram(self.parallelogram_tolerance) {
            Transform::affine(&[target[0], target[1], target[3]], &[tl, tr, bl])?
        } else {
            Transform::perspective(&target, &quad.points)?
        };

        debug!(
            "Warping {:?} into a {}x{} patch",
            quad.to_flat(),
            out_width,
            out_height
        );

        let mut patch = RgbImage::new(out_width, out_height);
        for (x, y, pixel) in patch.enumerate_pixels_mut() {
            *pixel = match transform.apply_f64(x as f64 + 0.5, y as f64 + 0.5) {
                Some((sx, sy)) => sample_bilinear(image, sx, sy),
                None => *image.get_pixel(0, 0),
            };
        }

        Ok(patch)
    }
}

impl Default for PatchExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy the pixels covered by `rect` out of the page.
fn crop_rect(image: &RgbImage, rect: &Rect) -> Result<Patch, GeometryError> {
    let left = rect.left.floor().max(0.0) as u32;
    let top = rect.top.floor().max(0.0) as u32;
    let right = (rect.right.ceil() as u32).min(image.width());
    let bottom = (rect.bottom.ceil() as u32).min(image.height());

    if right <= left || bottom <= top {
        return Err(GeometryError::invalid(format!(
            "crop region ({left}, {top}) to ({right}, {bottom}) is empty"
        )));
    }

    trace!("Cropping ({}, {}) to ({}, {})", left, top, right, bottom);
    Ok(imageops::crop_imm(image, left, top, right - left, bottom - top).to_image())
}

/// Bilinear sample at continuous page coordinates, replicating border pixels.
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    // Pixel centres sit at half-integer coordinates
    let x = x - 0.5;
    let y = y - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = pixel_replicate(image, x0, y0);
    let p10 = pixel_replicate(image, x0 + 1, y0);
    let p01 = pixel_replicate(image, x0, y0 + 1);
    let p11 = pixel_replicate(image, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

fn pixel_replicate(image: &RgbImage, x: i64, y: i64) -> Rgb<u8> {
    let x = x.clamp(0, image.width() as i64 - 1) as u32;
    let y = y.clamp(0, image.height() as i64 - 1) as u32;
    *image.get_pixel(x, y)
}

/// Extract the patch under `bbox` with default settings.
pub fn extract_patch(image: &RgbImage, bbox: &BoundingBox) -> Result<Patch, GeometryError> {
    PatchExtractor::new().extract(image, bbox)
}

/// Extract one patch per box with default settings.
pub fn extract_patches(
    image: &RgbImage,
    boxes: &[BoundingBox],
) -> Vec<Result<Patch, GeometryError>> {
    PatchExtractor::new().extract_all(image, boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    /// Each pixel encodes its own coordinates.
    fn coordinate_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_axis_aligned_crop_is_exact() {
        let image = coordinate_image(100, 80);
        let bbox = BoundingBox::from_rect(10.0, 10.0, 50.0, 40.0);

        let patch = extract_patch(&image, &bbox).unwrap();
        assert_eq!(patch.dimensions(), (40, 30));
        for (x, y, pixel) in patch.enumerate_pixels() {
            assert_eq!(*pixel, *image.get_pixel(x + 10, y + 10));
        }
    }

    #[test]
    fn test_patch_is_independent_of_source() {
        let mut image = coordinate_image(64, 64);
        let bbox = BoundingBox::from_rect(0.0, 0.0, 16.0, 16.0);

        let patch = extract_patch(&image, &bbox).unwrap();
        let before = patch.clone();

        for pixel in image.pixels_mut() {
            *pixel = Rgb([1, 2, 3]);
        }
        assert_eq!(patch, before);
        assert_eq!(*patch.get_pixel(5, 6), Rgb([5, 6, 7]));
    }

    #[test]
    fn test_partially_outside_is_clipped() {
        let image = coordinate_image(100, 60);
        let bbox = BoundingBox::from_rect(60.0, 10.0, 105.0, 40.0);

        let patch = extract_patch(&image, &bbox).unwrap();
        assert_eq!(patch.dimensions(), (40, 30));
        assert_eq!(*patch.get_pixel(39, 0), Rgb([99, 10, 7]));
    }

    #[test]
    fn test_entirely_outside_fails() {
        let image = coordinate_image(100, 60);
        let bbox = BoundingBox::from_rect(120.0, 10.0, 150.0, 40.0);

        assert!(matches!(
            extract_patch(&image, &bbox),
            Err(GeometryError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_zero_area_fails() {
        let image = coordinate_image(100, 60);
        let bbox = BoundingBox::from_rect(20.0, 10.0, 20.0, 40.0);

        assert!(matches!(
            extract_patch(&image, &bbox),
            Err(GeometryError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_rotated_box_is_deskewed() {
        // Left half red, right half blue
        let image = RgbImage::from_fn(100, 100, |x, _| if x < 50 { RED } else { BLUE });

        // A square rotated by 45 degrees around the page centre
        let diamond = BoundingBox::new([
            Point::new(50.0, 20.0),
            Point::new(80.0, 50.0),
            Point::new(50.0, 80.0),
            Point::new(20.0, 50.0),
        ]);

        let patch = extract_patch(&image, &diamond).unwrap();
        assert_eq!(patch.dimensions(), (42, 42));

        // The patch's top edge runs down-right across the page, so the
        // upper-right triangle of the patch comes from the blue half
        assert_eq!(*patch.get_pixel(35, 5), BLUE);
        assert_eq!(*patch.get_pixel(5, 35), RED);
    }

    #[test]
    fn test_thin_rotated_box_yields_one_pixel_strip() {
        let image = coordinate_image(100, 100);

        // A slightly tilted sliver 0.3px tall
        let sliver = BoundingBox::new([
            Point::new(10.0, 10.0),
            Point::new(50.0, 14.0),
            Point::new(50.0, 14.3),
            Point::new(10.0, 10.3),
        ]);
        assert!(sliver.area() > MIN_AREA);
        assert!(!sliver.is_axis_aligned());

        let patch = extract_patch(&image, &sliver).unwrap();
        assert_eq!(patch.dimensions(), (40, 1));
    }

    #[test]
    fn test_perspective_box_maps_corners() {
        let image = coordinate_image(100, 100);
        let trapezoid = BoundingBox::new([
            Point::new(20.0, 20.0),
            Point::new(80.0, 30.0),
            Point::new(80.0, 70.0),
            Point::new(20.0, 80.0),
        ]);

        let patch = extract_patch(&image, &trapezoid).unwrap();
        assert_eq!(patch.dimensions(), (61, 60));

        let near = |actual: u8, expected: u8| (actual as i32 - expected as i32).abs() <= 2;

        let top_left = patch.get_pixel(0, 0);
        assert!(near(top_left[0], 20) && near(top_left[1], 20), "{:?}", top_left);

        let bottom_right = patch.get_pixel(60, 59);
        assert!(
            near(bottom_right[0], 79) && near(bottom_right[1], 69),
            "{:?}",
            bottom_right
        );
    }

    #[test]
    fn test_batch_isolates_failures() {
        let image = coordinate_image(100, 60);
        let boxes = [
            BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0),
            BoundingBox::from_rect(0.0, 0.0, 0.0, 10.0),
            BoundingBox::from_rect(20.0, 20.0, 30.0, 40.0),
        ];

        let patches = extract_patches(&image, &boxes);
        assert_eq!(patches.len(), 3);
        assert!(patches[0].is_ok());
        assert!(patches[1].is_err());
        assert_eq!(patches[2].as_ref().unwrap().dimensions(), (10, 20));
    }
}
