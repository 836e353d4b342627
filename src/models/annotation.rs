// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the rectangles drawn on captured frames and the
//! geometry they are stored with.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 2D point with normalized coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in whatever unit space its owner declares.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from two opposite corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }
}

/// Shape drawn by the annotation tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShapeKind {
    #[default]
    Rectangle,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangle => "RECTANGLE",
        }
    }
}

/// Stored rectangle geometry.
///
/// Normalized geometry uses fractions of the source frame (0.0 to 1.0).
/// When the source size was unknown at capture time the raw pixel
/// rectangle is kept instead and `is_pixel_value` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    #[serde(rename = "isPixelValue", default)]
    pub is_pixel_value: bool,
}

impl Geometry {
    pub fn normalized(rect: Rect) -> Self {
        Self {
            rect,
            kind: ShapeKind::Rectangle,
            is_pixel_value: false,
        }
    }

    pub fn pixels(rect: Rect) -> Self {
        Self {
            rect,
            kind: ShapeKind::Rectangle,
            is_pixel_value: true,
        }
    }

    /// Check `0 <= x, y` and `x + width <= 1`, `y + height <= 1`.
    ///
    /// Pixel geometry has no unit square and always reports false.
    pub fn is_within_unit_square(&self) -> bool {
        const EPS: f64 = 1e-9;
        let r = &self.rect;
        !self.is_pixel_value
            && r.x >= 0.0
            && r.y >= 0.0
            && r.width >= 0.0
            && r.height >= 0.0
            && r.x + r.width <= 1.0 + EPS
            && r.y + r.height <= 1.0 + EPS
    }
}

/// A labelled rectangle attached to one captured frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub label: String,
    pub frame_timestamp_ms: u64,
    pub geometry: Geometry,
}

/// Annotation fields supplied when drawing; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    /// Empty or missing labels get a generated "Annotation N" label.
    pub label: Option<String>,
    pub frame_timestamp_ms: u64,
    pub geometry: Geometry,
}
