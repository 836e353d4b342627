// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame display and rectangle annotation.
//!
//! Shows either the live video frame or a captured frame. On a captured
//! frame the author drags out rectangles; they are reported in source
//! pixels and normalized by the caller.

use crate::models::annotation::{Annotation, Point, Rect};
use crate::util::geometry::{denormalize_rect, normalize_coordinates};
use uuid::Uuid;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    /// A finished drag, in source-pixel coordinates.
    DrawRect(Rect),
    SelectAnnotation(Uuid),
    Deselect,
}

/// What to draw this frame.
pub struct CanvasView<'a> {
    pub texture: Option<&'a egui::TextureHandle>,
    /// Intrinsic size of the displayed frame.
    pub source_size: (u32, u32),
    /// Annotations on the displayed frame.
    pub annotations: Vec<&'a Annotation>,
    pub selected: Option<Uuid>,
    /// True when showing a captured frame that accepts new rectangles.
    pub drawing_enabled: bool,
    pub caption: String,
}

/// Smallest drag, in source pixels, that counts as a rectangle.
const MIN_DRAG: f64 = 3.0;

/// Display the canvas and handle mouse interaction.
///
/// `drag_start` holds the source-pixel anchor of an in-progress drag
/// between frames.
pub fn show(ui: &mut egui::Ui, view: CanvasView<'_>, drag_start: &mut Option<Point>) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size() - egui::vec2(0.0, 24.0);

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);
        let (src_w, src_h) = view.source_size;

        let Some(texture) = view.texture.filter(|_| src_w > 0 && src_h > 0) else {
            show_welcome(ui);
            return;
        };

        let image_rect = fit_image(
            egui::Rect::from_min_size(ui.min_rect().min, available_size),
            src_w,
            src_h,
        );
        ui.painter().image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let scale_x = src_w as f64 / image_rect.width() as f64;
        let scale_y = src_h as f64 / image_rect.height() as f64;
        let to_source = |pos: egui::Pos2| {
            Point::new(
                ((pos.x - image_rect.min.x) as f64 * scale_x).clamp(0.0, src_w as f64),
                ((pos.y - image_rect.min.y) as f64 * scale_y).clamp(0.0, src_h as f64),
            )
        };

        let sense = if view.drawing_enabled {
            egui::Sense::click_and_drag()
        } else {
            egui::Sense::hover()
        };
        let response = ui.allocate_rect(image_rect, sense);

        if view.drawing_enabled {
            if response.drag_started() {
                *drag_start = response.interact_pointer_pos().map(to_source);
            }
            if response.drag_stopped() {
                if let (Some(start), Some(end)) = (drag_start.take(), response.interact_pointer_pos()) {
                    let rect = Rect::from_corners(start, to_source(end));
                    if rect.width >= MIN_DRAG && rect.height >= MIN_DRAG {
                        action = CanvasAction::DrawRect(rect);
                    }
                }
            } else if response.clicked() {
                action = match response
                    .interact_pointer_pos()
                    .and_then(|pos| hit_test(&view.annotations, pos, image_rect))
                {
                    Some(id) => CanvasAction::SelectAnnotation(id),
                    None => CanvasAction::Deselect,
                };
            }
        }

        let painter = ui.painter_at(image_rect);
        for annotation in &view.annotations {
            let color = if Some(annotation.id) == view.selected {
                egui::Color32::LIGHT_BLUE
            } else {
                egui::Color32::YELLOW
            };
            draw_annotation(&painter, annotation, image_rect, color);
        }

        let cursor = response
            .hover_pos()
            .map(&to_source)
            .and_then(|src| normalize_coordinates(src.x, src.y, src_w, src_h));
        if let Some(p) = cursor {
            ui.painter().text(
                image_rect.right_bottom() + egui::vec2(-4.0, -4.0),
                egui::Align2::RIGHT_BOTTOM,
                format!("{:.3}, {:.3}", p.x, p.y),
                egui::FontId::monospace(11.0),
                egui::Color32::from_gray(220),
            );
        }

        // Rubber band for the drag in progress.
        if let (Some(start), Some(pos)) = (*drag_start, response.hover_pos().or(response.interact_pointer_pos())) {
            let a = egui::pos2(
                image_rect.min.x + (start.x / scale_x) as f32,
                image_rect.min.y + (start.y / scale_y) as f32,
            );
            painter.rect_stroke(
                egui::Rect::from_two_pos(a, pos),
                0.0,
                egui::Stroke::new(1.5, egui::Color32::WHITE),
            );
        }
    });

    ui.separator();
    ui.horizontal(|ui| {
        ui.label(view.caption);
        if view.drawing_enabled {
            ui.separator();
            ui.label(egui::RichText::new("Drag on the frame to add an annotation").weak());
        }
    });

    action
}

/// Largest rectangle with the image's aspect ratio, centered in `available`.
pub fn fit_image(available: egui::Rect, img_width: u32, img_height: u32) -> egui::Rect {
    let img_aspect = img_width as f32 / img_height as f32;
    let available_aspect = available.width() / available.height();

    let (display_width, display_height) = if img_aspect > available_aspect {
        // Wider than the viewport: fit to width
        (available.width(), available.width() / img_aspect)
    } else {
        (available.height() * img_aspect, available.height())
    };

    egui::Rect::from_center_size(available.center(), egui::vec2(display_width, display_height))
}

/// Screen rectangle of an annotation inside `image_rect`.
fn screen_rect(annotation: &Annotation, image_rect: egui::Rect) -> egui::Rect {
    let r = denormalize_rect(
        &annotation.geometry,
        image_rect.width() as f64,
        image_rect.height() as f64,
    );
    egui::Rect::from_min_size(
        image_rect.min + egui::vec2(r.x as f32, r.y as f32),
        egui::vec2(r.width as f32, r.height as f32),
    )
}

/// Topmost annotation under `pos`.
fn hit_test(annotations: &[&Annotation], pos: egui::Pos2, image_rect: egui::Rect) -> Option<Uuid> {
    annotations
        .iter()
        .rev()
        .find(|a| screen_rect(a, image_rect).contains(pos))
        .map(|a| a.id)
}

fn draw_annotation(painter: &egui::Painter, annotation: &Annotation, image_rect: egui::Rect, color: egui::Color32) {
    let rect = screen_rect(annotation, image_rect);
    painter.rect_stroke(rect, 0.0, egui::Stroke::new(2.0, color));

    let galley_pos = rect.left_top() + egui::vec2(2.0, -2.0);
    painter.text(
        galley_pos,
        egui::Align2::LEFT_BOTTOM,
        &annotation.label,
        egui::FontId::proportional(13.0),
        color,
    );
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("Stepwright")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Create or open a project, then open its video to begin")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Video Frames...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
