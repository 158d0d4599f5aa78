//! WASM bindings for the Han-Nom box editor.
//!
//! The browser editor keeps its rectangles as fabric.js objects. These
//! bindings convert them to page boxes, put boxes into reading order and
//! build the initial drawing for detector output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use hannom_core::{
    BoundingBox, CanvasDrawing, CanvasObject, CanvasStyle, ReadingLayout, ReadingOrder,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Convert one canvas object to a box (`[[x, y], ...]`, clockwise from top-left).
#[wasm_bindgen]
pub fn canvas_to_box(object: JsValue) -> Result<JsValue, JsValue> {
    let object: CanvasObject = from_js(object)?;
    let bbox = object.to_box().map_err(to_js_error)?;
    to_js(&bbox)
}

/// Put boxes into reading order.
///
/// `layout` is `"vertical_rtl"` (default) or `"horizontal_ltr"`.
#[wasm_bindgen]
pub fn order_boxes(boxes: JsValue, layout: Option<String>) -> Result<JsValue, JsValue> {
    let boxes: Vec<BoundingBox> = from_js(boxes)?;
    let ordered = reading_order(layout)?.order(&boxes);
    to_js(&ordered)
}

/// Boxes of an edited drawing in reading order, plus the rectangles that
/// could not be converted.
#[wasm_bindgen]
pub fn order_drawing(drawing: JsValue, layout: Option<String>) -> Result<JsValue, JsValue> {
    let drawing: CanvasDrawing = from_js(drawing)?;

    #[derive(Serialize)]
    struct OrderedDrawing {
        boxes: Vec<BoundingBox>,
        rejected: Vec<String>,
    }

    let mut boxes = Vec::new();
    let mut rejected = Vec::new();
    for (i, converted) in drawing.to_boxes().into_iter().enumerate() {
        match converted {
            Ok(bbox) => boxes.push(bbox),
            Err(e) => rejected.push(format!("canvas rectangle {}: {}", i + 1, e)),
        }
    }

    let output = OrderedDrawing {
        boxes: reading_order(layout)?.order(&boxes),
        rejected,
    };
    to_js(&output)
}

/// Initial drawing for detected boxes, styled with the editor defaults.
#[wasm_bindgen]
pub fn initial_drawing(boxes: JsValue) -> Result<JsValue, JsValue> {
    let boxes: Vec<BoundingBox> = from_js(boxes)?;
    let drawing = CanvasDrawing::from_boxes(&boxes, &CanvasStyle::default());
    to_js(&drawing)
}

fn reading_order(layout: Option<String>) -> Result<ReadingOrder, JsValue> {
    let layout = match layout {
        Some(name) => serde_json::from_value::<ReadingLayout>(serde_json::Value::String(name))
            .map_err(to_js_error)?,
        None => ReadingLayout::default(),
    };
    Ok(ReadingOrder::new().with_layout(layout))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

// Maps are emitted as plain JS objects
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
