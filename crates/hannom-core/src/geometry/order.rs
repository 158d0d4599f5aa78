//! Reading order for text boxes on a page.
//!
//! Han-Nom pages are written top-to-bottom in columns that progress from the
//! right edge of the page to the left. Quoc Ngu pages use Latin order instead.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::BoundingBox;

/// Layout of the script on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingLayout {
    /// Columns right-to-left, each read top-to-bottom (Han-Nom).
    #[default]
    VerticalRtl,
    /// Rows top-to-bottom, each read left-to-right (Quoc Ngu).
    HorizontalLtr,
}

/// Orders boxes into reading order.
///
/// Ordering is stable: boxes with equal keys keep their input order.
#[derive(Debug, Clone)]
pub struct ReadingOrder {
    layout: ReadingLayout,
    column_tolerance: f32,
    row_tolerance: f32,
}

impl ReadingOrder {
    /// Create an ordering for vertical right-to-left pages.
    pub fn new() -> Self {
        Self {
            layout: ReadingLayout::VerticalRtl,
            column_tolerance: 1.0,
            row_tolerance: 20.0,
        }
    }

    /// Set the page layout.
    pub fn with_layout(mut self, layout: ReadingLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set how far apart (in pixels) two right edges may be and still share a column.
    pub fn with_column_tolerance(mut self, tolerance: f32) -> Self {
        self.column_tolerance = tolerance;
        self
    }

    /// Set how far apart (in pixels) two top edges may be and still share a row.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.row_tolerance = tolerance;
        self
    }

    pub fn layout(&self) -> ReadingLayout {
        self.layout
    }

    /// Return the boxes in reading order as a new vector.
    pub fn order(&self, boxes: &[BoundingBox]) -> Vec<BoundingBox> {
        self.permutation(boxes)
            .into_iter()
            .map(|i| boxes[i])
            .collect()
    }

    /// Indices of `boxes` in reading order.
    ///
    /// Boxes are sorted along the page progression (right edge descending, or
    /// top edge ascending for horizontal pages) and split into lanes: a lane
    /// holds every box whose key lies within the tolerance of the lane's first
    /// key. Each lane is then read by its second key, input order breaking ties.
    pub fn permutation(&self, boxes: &[BoundingBox]) -> Vec<usize> {
        let keys: Vec<(f32, f32)> = boxes.iter().map(|bbox| self.keys(bbox)).collect();
        let tolerance = self.tolerance();

        let mut indices: Vec<usize> = (0..boxes.len()).collect();
        indices.sort_by(|&a, &b| keys[a].0.total_cmp(&keys[b].0));

        let mut start = 0;
        while start < indices.len() {
            let lane_start = keys[indices[start]].0;
            let end = indices[start..]
                .iter()
                .position(|&i| keys[i].0 - lane_start > tolerance)
                .map_or(indices.len(), |offset| start + offset);

            indices[start..end]
                .sort_by(|&a, &b| keys[a].1.total_cmp(&keys[b].1).then(a.cmp(&b)));
            start = end;
        }

        trace!("Reading order ({:?}): {:?}", self.layout, indices);
        indices
    }

    /// Lane key (ascending along the page) and in-lane key of a box.
    fn keys(&self, bbox: &BoundingBox) -> (f32, f32) {
        match self.layout {
            // Rightmost column first, then top of the box first
            ReadingLayout::VerticalRtl => (-bbox.x_max(), bbox.y_min()),
            ReadingLayout::HorizontalLtr => (bbox.y_min(), bbox.x_min()),
        }
    }

    fn tolerance(&self) -> f32 {
        match self.layout {
            ReadingLayout::VerticalRtl => self.column_tolerance,
            ReadingLayout::HorizontalLtr => self.row_tolerance,
        }
    }
}

impl Default for ReadingOrder {
    fn default() -> Self {
        Self::new()
    }
}

/// Order boxes for a vertical right-to-left page with default tolerances.
pub fn order_for_reading_order(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    ReadingOrder::new().order(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use pretty_assertions::assert_eq;

    fn column_box(x_max: f32, y_min: f32) -> BoundingBox {
        BoundingBox::from_rect(x_max - 30.0, y_min, x_max, y_min + 40.0)
    }

    #[test]
    fn test_right_column_first_then_top_down() {
        let box1 = column_box(300.0, 50.0);
        let box2 = column_box(300.0, 10.0);
        let box3 = column_box(100.0, 5.0);

        let ordered = order_for_reading_order(&[box1, box2, box3]);
        assert_eq!(ordered, vec![box2, box1, box3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(order_for_reading_order(&[]).is_empty());
    }

    #[test]
    fn test_column_key_uses_right_edge() {
        // A wide box and a narrow box sharing a right edge belong to one column
        let wide = BoundingBox::from_rect(200.0, 100.0, 300.0, 140.0);
        let narrow = BoundingBox::from_rect(280.0, 20.0, 300.0, 60.0);
        let left = BoundingBox::from_rect(150.0, 0.0, 250.0, 40.0);

        let ordered = order_for_reading_order(&[wide, left, narrow]);
        assert_eq!(ordered, vec![narrow, wide, left]);
    }

    #[test]
    fn test_tolerance_merges_close_columns() {
        let lower = column_box(300.3, 80.0);
        let upper = column_box(299.8, 10.0);

        let ordered = ReadingOrder::new()
            .with_column_tolerance(1.0)
            .order(&[lower, upper]);
        assert_eq!(ordered, vec![upper, lower]);

        let exact = ReadingOrder::new()
            .with_column_tolerance(0.0)
            .order(&[lower, upper]);
        assert_eq!(exact, vec![lower, upper]);
    }

    #[test]
    fn test_close_columns_across_half_pixel() {
        // Right edges 0.2px apart on either side of x = 300.5
        let lower = column_box(300.6, 80.0);
        let upper = column_box(300.4, 10.0);

        assert_eq!(order_for_reading_order(&[lower, upper]), vec![upper, lower]);
        assert_eq!(order_for_reading_order(&[upper, lower]), vec![upper, lower]);
    }

    #[test]
    fn test_lane_is_anchored_at_its_first_key() {
        // 300 and 299.4 share a column, 298.8 is too far from 300 to join it
        let a = column_box(300.0, 50.0);
        let b = column_box(299.4, 10.0);
        let c = column_box(298.8, 0.0);

        assert_eq!(order_for_reading_order(&[c, a, b]), vec![b, a, c]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let a = column_box(300.0, 10.0);
        let b = BoundingBox::new([
            Point::new(280.0, 10.0),
            Point::new(300.0, 10.0),
            Point::new(300.0, 90.0),
            Point::new(280.0, 90.0),
        ]);

        assert_eq!(order_for_reading_order(&[a, b]), vec![a, b]);
        assert_eq!(order_for_reading_order(&[b, a]), vec![b, a]);
    }

    #[test]
    fn test_idempotent() {
        let boxes = vec![
            column_box(120.0, 300.0),
            column_box(400.0, 250.0),
            column_box(120.0, 20.0),
            column_box(400.5, 10.0),
            column_box(260.0, 140.0),
            column_box(260.0, 140.0),
        ];

        let once = order_for_reading_order(&boxes);
        let twice = order_for_reading_order(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_untouched() {
        let boxes = vec![column_box(100.0, 0.0), column_box(300.0, 0.0)];
        let snapshot = boxes.clone();
        let _ = order_for_reading_order(&boxes);
        assert_eq!(boxes, snapshot);
    }

    #[test]
    fn test_horizontal_layout() {
        let first = BoundingBox::from_rect(10.0, 28.0, 90.0, 46.0);
        let second = BoundingBox::from_rect(120.0, 22.0, 200.0, 44.0);
        let third = BoundingBox::from_rect(15.0, 60.0, 95.0, 80.0);

        let ordered = ReadingOrder::new()
            .with_layout(ReadingLayout::HorizontalLtr)
            .with_row_tolerance(20.0)
            .order(&[third, second, first]);
        assert_eq!(ordered, vec![first, second, third]);
    }

    #[test]
    fn test_permutation() {
        let boxes = [column_box(100.0, 0.0), column_box(300.0, 0.0), column_box(200.0, 0.0)];
        assert_eq!(ReadingOrder::new().permutation(&boxes), vec![1, 2, 0]);
    }
}
