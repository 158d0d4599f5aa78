//! Box geometry for text regions on a page image.
//!
//! Boxes arrive from the detector or from the canvas editor, get ordered into
//! the reading order of the script, and are cut out of the page as patches for
//! the recognizer.

mod order;
mod patch;
mod transform;

pub use order::{ReadingLayout, ReadingOrder, order_for_reading_order};
pub use patch::{Patch, PatchExtractor, extract_patch, extract_patches};
pub use transform::Transform;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Boxes enclosing less than this many square pixels are degenerate.
pub const MIN_AREA: f32 = 1e-3;

/// A point in image pixel coordinates (x to the right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Overlap with another rectangle, if it has a positive area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);

        if right > left && bottom > top {
            Some(Rect::new(left, top, right, bottom))
        } else {
            None
        }
    }
}

/// A quadrilateral text region.
///
/// Corners run clockwise on screen starting at the top-left corner:
/// top-left, top-right, bottom-right, bottom-left. Serialized as
/// `[[x, y], [x, y], [x, y], [x, y]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox {
    pub points: [Point; 4],
}

impl BoundingBox {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Box for the axis-aligned rectangle `[left, top] .. [right, bottom]`.
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    /// Box from flat detector output `(x1, y1, x2, y2, x3, y3, x4, y4)`.
    pub fn from_flat(coords: [f32; 8]) -> Self {
        Self::new([
            Point::new(coords[0], coords[1]),
            Point::new(coords[2], coords[3]),
            Point::new(coords[4], coords[5]),
            Point::new(coords[6], coords[7]),
        ])
    }

    pub fn to_flat(&self) -> [f32; 8] {
        let [a, b, c, d] = self.points;
        [a.x, a.y, b.x, b.y, c.x, c.y, d.x, d.y]
    }

    pub fn x_min(&self) -> f32 {
        self.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min)
    }

    pub fn x_max(&self) -> f32 {
        self.points.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn y_min(&self) -> f32 {
        self.points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min)
    }

    pub fn y_max(&self) -> f32 {
        self.points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max)
    }

    /// Axis-aligned bounding rectangle of the corners.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x_min(), self.y_min(), self.x_max(), self.y_max())
    }

    /// Longer of the top and bottom edges.
    pub fn width(&self) -> f32 {
        let [tl, tr, br, bl] = &self.points;
        tl.distance(tr).max(bl.distance(br))
    }

    /// Longer of the left and right edges.
    pub fn height(&self) -> f32 {
        let [tl, tr, br, bl] = &self.points;
        tl.distance(bl).max(tr.distance(br))
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f32 {
        (self.twice_signed_area() / 2.0).abs()
    }

    /// Positive when the corners run clockwise on screen.
    fn twice_signed_area(&self) -> f32 {
        (0..4)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % 4];
                a.x * b.y - b.x * a.y
            })
            .sum()
    }

    /// Whether the edges are parallel to the image axes.
    pub fn is_axis_aligned(&self) -> bool {
        let [p0, p1, p2, p3] = &self.points;
        (p0.y == p1.y && p2.y == p3.y && p0.x == p3.x && p1.x == p2.x)
            || (p0.x == p1.x && p2.x == p3.x && p0.y == p3.y && p1.y == p2.y)
    }

    /// Whether opposite edges are parallel, within `tolerance` pixels.
    ///
    /// Holds when the diagonals bisect each other.
    pub fn is_parallelogram(&self, tolerance: f32) -> bool {
        let [p0, p1, p2, p3] = &self.points;
        (p0.x + p2.x - p1.x - p3.x).abs() <= tolerance
            && (p0.y + p2.y - p1.y - p3.y).abs() <= tolerance
    }

    /// Whether the quadrilateral does not cross itself.
    pub fn is_simple(&self) -> bool {
        let [p0, p1, p2, p3] = &self.points;
        !segments_cross(p0, p1, p2, p3) && !segments_cross(p1, p2, p3, p0)
    }

    /// Fail with [`GeometryError::InvalidGeometry`] unless the box is usable.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.points.iter().all(Point::is_finite) {
            return Err(GeometryError::invalid(format!(
                "box has non-finite coordinates: {:?}",
                self.to_flat()
            )));
        }

        if !self.is_simple() {
            return Err(GeometryError::invalid(format!(
                "box is self-intersecting: {:?}",
                self.to_flat()
            )));
        }

        if self.area() < MIN_AREA {
            return Err(GeometryError::invalid(format!(
                "box encloses zero area: {:?}",
                self.to_flat()
            )));
        }

        Ok(())
    }

    /// Same region with corners reordered clockwise from the top-left corner.
    ///
    /// The top-left corner is the one with the smallest `x + y`, ties going to
    /// the higher corner.
    pub fn normalized(&self) -> Self {
        let mut points = self.points;
        if self.twice_signed_area() < 0.0 {
            points = [points[0], points[3], points[2], points[1]];
        }

        let start = (0..4)
            .min_by(|&a, &b| {
                let (pa, pb) = (points[a], points[b]);
                (pa.x + pa.y)
                    .total_cmp(&(pb.x + pb.y))
                    .then_with(|| pa.y.total_cmp(&pb.y))
            })
            .unwrap_or(0);

        Self::new(std::array::from_fn(|i| points[(start + i) % 4]))
    }

    /// Clamp every corner into a `width` x `height` page.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::new(
            self.points
                .map(|p| Point::new(p.x.clamp(0.0, w), p.y.clamp(0.0, h))),
        )
    }
}

/// Orientation of `c` relative to the directed line `a -> b`.
fn orientation(a: &Point, b: &Point, c: &Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether segments `a-b` and `c-d` cross at a single interior point.
fn segments_cross(a: &Point, b: &Point, c: &Point, d: &Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    o1 * o2 < 0.0 && o3 * o4 < 0.0
}
