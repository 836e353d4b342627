// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Seek bar and the list of saved steps.

use crate::models::step::Step;
use crate::util::time::{format_ms, ms_to_seconds, seconds_to_ms};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineAction {
    None,
    Seek(f64),
    EditStep(usize),
    DeleteStep(usize),
}

/// Display the timeline panel.
///
/// * `position` / `duration` - playback state in seconds, `None` without a video
/// * `editing` - index of the step loaded in the form
pub fn show(
    ui: &mut egui::Ui,
    position: Option<f64>,
    duration: Option<f64>,
    steps: &[Step],
    editing: Option<usize>,
    locked: bool,
) -> TimelineAction {
    let mut action = TimelineAction::None;
    let playhead = position.map(seconds_to_ms);

    if let (Some(mut pos), Some(duration)) = (position, duration.filter(|d| *d > 0.0)) {
        ui.horizontal(|ui| {
            ui.spacing_mut().slider_width = (ui.available_width() - 20.0).max(100.0);
            let response = ui.add(egui::Slider::new(&mut pos, 0.0..=duration).show_value(false));
            if response.changed() {
                action = TimelineAction::Seek(pos);
            }
        });
        paint_step_ranges(ui, steps, duration);
    }

    ui.separator();
    ui.label(egui::RichText::new(format!("Steps ({})", steps.len())).strong());

    egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
        if steps.is_empty() {
            ui.label(egui::RichText::new("No steps yet").weak().italics());
        }
        for (idx, step) in steps.iter().enumerate() {
            ui.horizontal(|ui| {
                let label = format!(
                    "{}. {}  [{} – {}]",
                    step.step_order + 1,
                    step.name,
                    format_ms(step.start_ms),
                    format_ms(step.end_ms)
                );
                let mut text = egui::RichText::new(label);
                if playhead.is_some_and(|ms| step.contains_ms(ms)) {
                    text = text.color(egui::Color32::from_rgb(90, 160, 230));
                }
                if ui.selectable_label(editing == Some(idx), text).clicked() {
                    action = TimelineAction::Seek(ms_to_seconds(step.start_ms));
                }
                ui.add_enabled_ui(!locked, |ui| {
                    if ui.small_button("Edit").clicked() {
                        action = TimelineAction::EditStep(idx);
                    }
                    if ui.small_button("🗑").on_hover_text("Delete step").clicked() {
                        action = TimelineAction::DeleteStep(idx);
                    }
                });
            });
        }
    });

    action
}

/// Shade each step's time range under the seek bar.
fn paint_step_ranges(ui: &mut egui::Ui, steps: &[Step], duration: f64) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), 6.0), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(60));

    for step in steps {
        let (x0, x1) = range_fraction(step, duration);
        let span = egui::Rect::from_min_max(
            egui::pos2(rect.left() + x0 * rect.width(), rect.top()),
            egui::pos2(rect.left() + x1 * rect.width(), rect.bottom()),
        );
        painter.rect_filled(span, 2.0, egui::Color32::from_rgb(90, 160, 230));
    }
}

/// Start and end of a step as fractions of the video length.
fn range_fraction(step: &Step, duration: f64) -> (f32, f32) {
    let frac = |ms: u64| (ms_to_seconds(ms) / duration).clamp(0.0, 1.0) as f32;
    (frac(step.start_ms), frac(step.end_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_range_fraction_clamps() {
        let step = Step {
            id: Uuid::new_v4(),
            name: "Glue".into(),
            description: "Glue the joint".into(),
            start_ms: 5_000,
            end_ms: 25_000,
            cautionary_notes: String::new(),
            best_practice_notes: String::new(),
            video_index: 0,
            video_path: None,
            step_order: 0,
            annotations: Vec::new(),
            tools: Vec::new(),
            materials: Vec::new(),
            supplementary_files: Vec::new(),
            validation: None,
            result_image: None,
        };
        assert_eq!(range_fraction(&step, 20.0), (0.25, 1.0));
    }
}
