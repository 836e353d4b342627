// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! "New project" dialog.

use crate::authoring::creator::NewProject;
use crate::models::step::LocalFile;

/// Video containers offered by the file picker.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

/// Buffers of the dialog while it is open.
#[derive(Debug, Clone, Default)]
pub struct NewProjectDialog {
    pub open: bool,
    pub name: String,
    pub description: String,
    pub tags: String,
    pub videos: Vec<LocalFile>,
}

impl NewProjectDialog {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Input collected so far, with tags split.
    pub fn to_new_project(&self) -> NewProject {
        let mut project = NewProject {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: Default::default(),
            videos: self.videos.clone(),
        };
        project.set_tags(&self.tags);
        project
    }
}

/// Show the dialog; returns the input when "Create" is pressed.
pub fn show(ctx: &egui::Context, dialog: &mut NewProjectDialog, busy: bool) -> Option<NewProject> {
    let mut submitted = None;
    let mut open = dialog.open;

    egui::Window::new("New project")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("new_project_fields").num_columns(2).show(ui, |ui| {
                ui.label("Name:");
                ui.text_edit_singleline(&mut dialog.name);
                ui.end_row();
                ui.label("Description:");
                ui.text_edit_multiline(&mut dialog.description);
                ui.end_row();
                ui.label("Tags:");
                ui.add(egui::TextEdit::singleline(&mut dialog.tags).hint_text("comma separated"));
                ui.end_row();
            });

            ui.separator();
            ui.label(format!("Videos ({})", dialog.videos.len()));
            let mut remove = None;
            for (idx, video) in dialog.videos.iter().enumerate() {
                ui.horizontal(|ui| {
                    ui.label(video.file_name());
                    if ui.small_button("✖").clicked() {
                        remove = Some(idx);
                    }
                });
            }
            if let Some(idx) = remove {
                dialog.videos.remove(idx);
            }
            if ui.button("Add videos...").clicked() {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Videos", VIDEO_EXTENSIONS)
                    .pick_files()
                {
                    dialog.videos.extend(paths.into_iter().map(LocalFile::new));
                }
            }

            ui.separator();
            let ready = !dialog.name.trim().is_empty() && !dialog.videos.is_empty() && !busy;
            if ui.add_enabled(ready, egui::Button::new("Create")).clicked() {
                submitted = Some(dialog.to_new_project());
            }
        });

    dialog.open = open && submitted.is_none();
    submitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_builds_new_project() {
        let dialog = NewProjectDialog {
            open: true,
            name: "Birdhouse".into(),
            description: "Cedar birdhouse".into(),
            tags: "wood, outdoor".into(),
            videos: vec![LocalFile::new("/videos/cut.mp4")],
        };
        let new = dialog.to_new_project();
        assert_eq!(new.name, "Birdhouse");
        assert_eq!(new.tags.len(), 2);
        assert!(new.tags.contains("outdoor"));
        assert_eq!(new.videos.len(), 1);
    }
}
