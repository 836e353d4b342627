// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback and capture toolbar.

use crate::authoring::capture::Direction;
use crate::util::time::format_seconds;

/// Button pressed in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    TogglePlay,
    Step(Direction),
    Capture,
    BackToVideo,
    MarkStart,
    MarkEnd,
    SelectVideo(usize),
}

/// State the toolbar reflects.
pub struct ToolbarState<'a> {
    pub has_video: bool,
    pub playing: bool,
    pub position: Option<f64>,
    pub duration: Option<f64>,
    /// A captured frame is on the canvas.
    pub frame_captured: bool,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// Names of the project's videos and the one in use.
    pub videos: Vec<&'a str>,
    pub video_index: usize,
}

/// Display the toolbar and return the pressed button, if any.
pub fn show(ui: &mut egui::Ui, state: &ToolbarState<'_>) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.add_enabled_ui(state.has_video, |ui| {
            if ui.button("⏮").on_hover_text("Previous frame").clicked() {
                action = ToolbarAction::Step(Direction::Backward);
            }
            let play_label = if state.playing { "⏸ Pause" } else { "▶ Play" };
            if ui.button(play_label).clicked() {
                action = ToolbarAction::TogglePlay;
            }
            if ui.button("⏭").on_hover_text("Next frame").clicked() {
                action = ToolbarAction::Step(Direction::Forward);
            }

            ui.label(
                egui::RichText::new(format!(
                    "{} / {}",
                    format_seconds(state.position),
                    format_seconds(state.duration)
                ))
                .monospace(),
            );

            ui.separator();

            if state.frame_captured {
                if ui.button("↩ Back to video").clicked() {
                    action = ToolbarAction::BackToVideo;
                }
            } else if ui.button("📷 Capture frame").clicked() {
                action = ToolbarAction::Capture;
            }

            ui.separator();

            if ui.button("Mark start").clicked() {
                action = ToolbarAction::MarkStart;
            }
            ui.label(egui::RichText::new(format_seconds(state.start_time)).monospace());
            if ui.button("Mark end").clicked() {
                action = ToolbarAction::MarkEnd;
            }
            ui.label(egui::RichText::new(format_seconds(state.end_time)).monospace());
        });

        if !state.videos.is_empty() {
            ui.separator();
            let current = state.videos.get(state.video_index).copied().unwrap_or("-");
            egui::ComboBox::from_id_source("video_select")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for (i, name) in state.videos.iter().enumerate() {
                        if ui.selectable_label(i == state.video_index, *name).clicked() {
                            action = ToolbarAction::SelectVideo(i);
                        }
                    }
                });
        }
    });

    action
}
