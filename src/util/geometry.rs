// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides utilities for coordinate transformations between
//! pixel coordinates and normalized coordinates, so annotations survive
//! being displayed at a different size than the frame they were drawn on.

use crate::models::annotation::{Geometry, Point, Rect};

/// Convert a source-pixel position to normalized coordinates (0.0 to 1.0).
///
/// Returns `None` when either source dimension is zero.
pub fn normalize_coordinates(pixel_x: f64, pixel_y: f64, width: u32, height: u32) -> Option<Point> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(Point {
        x: pixel_x / width as f64,
        y: pixel_y / height as f64,
    })
}

/// Convert a rectangle in source-pixel space to normalized geometry.
///
/// With a zero source dimension the raw rectangle is kept and tagged as
/// pixel geometry.
pub fn normalize_rect(rect: Rect, source_width: u32, source_height: u32) -> Geometry {
    if source_width == 0 || source_height == 0 {
        log::warn!(
            "Source size {}x{} unavailable, storing pixel rectangle",
            source_width,
            source_height
        );
        return Geometry::pixels(rect);
    }

    let w = source_width as f64;
    let h = source_height as f64;
    Geometry::normalized(Rect {
        x: rect.x / w,
        y: rect.y / h,
        width: rect.width / w,
        height: rect.height / h,
    })
}

/// Scale geometry to a viewport of the given size.
///
/// Pixel geometry has no reference size and is returned unchanged.
pub fn denormalize_rect(geometry: &Geometry, display_width: f64, display_height: f64) -> Rect {
    if geometry.is_pixel_value {
        return geometry.rect;
    }

    let r = &geometry.rect;
    Rect {
        x: r.x * display_width,
        y: r.y * display_height,
        width: r.width * display_width,
        height: r.height * display_height,
    }
}

/// Convert a rectangle in percentage space (0 to 100) to normalized geometry.
pub fn percent_to_normalized(rect: Rect) -> Geometry {
    Geometry::normalized(Rect {
        x: rect.x / 100.0,
        y: rect.y / 100.0,
        width: rect.width / 100.0,
        height: rect.height / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_close(a: &Rect, b: &Rect) {
        assert!((a.x - b.x).abs() < 1e-9, "x: {} vs {}", a.x, b.x);
        assert!((a.y - b.y).abs() < 1e-9, "y: {} vs {}", a.y, b.y);
        assert!((a.width - b.width).abs() < 1e-9, "width: {} vs {}", a.width, b.width);
        assert!((a.height - b.height).abs() < 1e-9, "height: {} vs {}", a.height, b.height);
    }

    #[test]
    fn test_normalize_corners() {
        let width = 1920;
        let height = 1080;

        // Top-left corner
        let tl = normalize_coordinates(0.0, 0.0, width, height).unwrap();
        assert_eq!(tl.x, 0.0);
        assert_eq!(tl.y, 0.0);

        // Bottom-right corner
        let br = normalize_coordinates(1920.0, 1080.0, width, height).unwrap();
        assert_eq!(br.x, 1.0);
        assert_eq!(br.y, 1.0);

        let center = normalize_coordinates(960.0, 540.0, width, height);
        assert_eq!(center, Some(Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_normalize_coordinates_zero_size() {
        assert_eq!(normalize_coordinates(10.0, 10.0, 0, 1080), None);
        assert_eq!(normalize_coordinates(10.0, 10.0, 1920, 0), None);
    }

    #[test]
    fn test_rect_roundtrip_across_sizes() {
        let sizes = [(1920, 1080), (640, 480), (3, 7), (4096, 2160)];
        let rects = [
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(12.5, 40.25, 300.0, 99.9),
            Rect::new(1.0, 2.0, 0.5, 0.25),
        ];
        for (w, h) in sizes {
            for rect in rects {
                let geometry = normalize_rect(rect, w, h);
                assert!(!geometry.is_pixel_value);
                let back = denormalize_rect(&geometry, w as f64, h as f64);
                assert_rect_close(&back, &rect);
            }
        }
    }

    #[test]
    fn test_full_frame_normalizes_to_unit_square() {
        let geometry = normalize_rect(Rect::new(0.0, 0.0, 1280.0, 720.0), 1280, 720);
        assert_rect_close(&geometry.rect, &Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(geometry.is_within_unit_square());
    }

    #[test]
    fn test_zero_source_size_falls_back_to_pixels() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        let geometry = normalize_rect(rect, 0, 720);
        assert!(geometry.is_pixel_value);
        assert_eq!(geometry.rect, rect);

        let geometry = normalize_rect(rect, 1280, 0);
        assert!(geometry.is_pixel_value);

        // Pixel geometry is not rescaled.
        assert_eq!(denormalize_rect(&geometry, 640.0, 360.0), rect);
    }

    #[test]
    fn test_denormalize_to_smaller_viewport() {
        let geometry = normalize_rect(Rect::new(480.0, 270.0, 960.0, 540.0), 1920, 1080);
        let shown = denormalize_rect(&geometry, 640.0, 360.0);
        assert_rect_close(&shown, &Rect::new(160.0, 90.0, 320.0, 180.0));
    }

    #[test]
    fn test_percent_to_normalized() {
        let geometry = percent_to_normalized(Rect::new(25.0, 10.0, 50.0, 80.0));
        assert!(!geometry.is_pixel_value);
        assert_rect_close(&geometry.rect, &Rect::new(0.25, 0.1, 0.5, 0.8));
    }
}
