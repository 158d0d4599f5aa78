//! Drawings exchanged with the interactive box editor.
//!
//! The editor speaks fabric.js-style JSON: a drawing has a `version` and a list
//! of `objects`, and each rectangle carries `left`, `top`, `width` and `height`
//! plus scale and rotation attributes that change when the user drags its
//! handles. Attributes this crate does not interpret are kept so that an edited
//! drawing can be sent back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::{BoundingBox, Point};

/// Object type of editable rectangles.
pub const RECT: &str = "rect";

/// A single object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasObject {
    /// Object type (`rect`, `path`, ...).
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// X of the top-left corner before rotation.
    #[serde(default)]
    pub left: f32,

    /// Y of the top-left corner before rotation.
    #[serde(default)]
    pub top: f32,

    /// Unscaled width.
    #[serde(default)]
    pub width: f32,

    /// Unscaled height.
    #[serde(default)]
    pub height: f32,

    #[serde(default = "unit_scale")]
    pub scale_x: f32,

    #[serde(default = "unit_scale")]
    pub scale_y: f32,

    /// Clockwise rotation in degrees about the top-left corner.
    #[serde(default)]
    pub angle: f32,

    /// Attributes passed through untouched (fill, stroke, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_kind() -> String {
    RECT.to_string()
}

fn unit_scale() -> f32 {
    1.0
}

impl CanvasObject {
    /// An unrotated, unscaled rectangle.
    pub fn rect(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            kind: RECT.to_string(),
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            extra: Map::new(),
        }
    }

    pub fn is_rect(&self) -> bool {
        self.kind == RECT
    }

    /// Convert to a box in page coordinates.
    ///
    /// An unrotated object yields the rectangle `[left, top] .. [left + w, top + h]`
    /// with `w = width * scaleX` and `h = height * scaleY`, clockwise from the
    /// top-left corner. A rotated object yields the rotated quadrilateral.
    ///
    /// # Errors
    ///
    /// [`GeometryError::InvalidGeometry`] when the scaled width or height is not
    /// positive, or any attribute is not finite.
    pub fn to_box(&self) -> Result<BoundingBox, GeometryError> {
        let width = self.width * self.scale_x;
        let height = self.height * self.scale_y;

        if !(width > 0.0 && width.is_finite() && height > 0.0 && height.is_finite()) {
            return Err(GeometryError::invalid(format!(
                "canvas rectangle has non-positive size {width}x{height}"
            )));
        }

        if !(self.left.is_finite() && self.top.is_finite() && self.angle.is_finite()) {
            return Err(GeometryError::invalid(format!(
                "canvas rectangle has non-finite position ({}, {}) or angle {}",
                self.left, self.top, self.angle
            )));
        }

        let (left, top) = (self.left, self.top);
        if self.angle.rem_euclid(360.0) == 0.0 {
            return Ok(BoundingBox::from_rect(left, top, left + width, top + height));
        }

        let (sin, cos) = self.angle.to_radians().sin_cos();
        let corner =
            |dx: f32, dy: f32| Point::new(left + dx * cos - dy * sin, top + dx * sin + dy * cos);

        Ok(BoundingBox::new([
            corner(0.0, 0.0),
            corner(width, 0.0),
            corner(width, height),
            corner(0.0, height),
        ]))
    }
}

impl TryFrom<&CanvasObject> for BoundingBox {
    type Error = GeometryError;

    fn try_from(object: &CanvasObject) -> Result<Self, Self::Error> {
        object.to_box()
    }
}

/// Styling applied to rectangles in a freshly generated drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasStyle {
    /// Drawing format version expected by the editor.
    pub version: String,

    /// Fill colour.
    pub fill: String,

    /// Stroke colour.
    pub stroke: String,

    /// Stroke width in pixels.
    pub stroke_width: u32,

    /// Keep the stroke width constant while scaling.
    pub stroke_uniform: bool,

    /// Draw resize handles hollow.
    pub transparent_corners: bool,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            version: "4.4.0".to_string(),
            fill: "rgba(76, 175, 80, 0.3)".to_string(),
            stroke: "red".to_string(),
            stroke_width: 2,
            stroke_uniform: true,
            transparent_corners: false,
        }
    }
}

impl CanvasStyle {
    fn attributes(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("fill".to_string(), Value::from(self.fill.clone()));
        map.insert("stroke".to_string(), Value::from(self.stroke.clone()));
        map.insert("strokeWidth".to_string(), Value::from(self.stroke_width));
        map.insert("strokeUniform".to_string(), Value::from(self.stroke_uniform));
        map.insert(
            "transparentCorners".to_string(),
            Value::from(self.transparent_corners),
        );
        map
    }
}

/// A complete canvas drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDrawing {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub objects: Vec<CanvasObject>,
}

impl CanvasDrawing {
    /// Initial drawing for detected boxes: one rectangle per box, covering its
    /// axis-aligned extents rounded to whole pixels.
    pub fn from_boxes(boxes: &[BoundingBox], style: &CanvasStyle) -> Self {
        let attributes = style.attributes();

        let objects = boxes
            .iter()
            .map(|bbox| {
                let rect = bbox.rect();
                let left = rect.left.round();
                let top = rect.top.round();

                let mut object = CanvasObject::rect(
                    left,
                    top,
                    rect.right.round() - left,
                    rect.bottom.round() - top,
                );
                object.extra = attributes.clone();
                object
            })
            .collect();

        Self {
            version: style.version.clone(),
            objects,
        }
    }

    /// Rectangles on the canvas, in drawing order.
    pub fn rects(&self) -> impl Iterator<Item = &CanvasObject> {
        self.objects.iter().filter(|object| object.is_rect())
    }

    /// Convert every rectangle to a box, one result per rectangle.
    ///
    /// Objects of other types are ignored.
    pub fn to_boxes(&self) -> Vec<Result<BoundingBox, GeometryError>> {
        let skipped = self.objects.len() - self.rects().count();
        if skipped > 0 {
            debug!("Ignoring {} non-rectangle canvas objects", skipped);
        }

        self.rects().map(CanvasObject::to_box).collect()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
