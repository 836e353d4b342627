// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Step form and project panel.
//!
//! Text fields of the staged step are edited in place. Structural changes
//! (adding or removing items, saving, finalizing) are returned as a
//! [`PropertiesAction`] for the app to apply.

use crate::authoring::assembler::{BuyListDraft, StepAssembler};
use crate::models::project::Project;
use crate::models::step::LocalFile;
use crate::remote::payload::{RepositoryItem, RepositoryKind};
use crate::util::time::format_ms;
use uuid::Uuid;

/// Image types accepted for tool, material, result and buy-list images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Result of properties panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    None,
    SaveStep,
    ClearForm,
    SelectAnnotation(Uuid),
    RemoveAnnotation(Uuid),
    AddItem(RepositoryKind),
    RemoveItem(RepositoryKind, Uuid),
    SaveToRepository(RepositoryKind, Uuid),
    UseRepositoryItem(RepositoryKind, usize),
    DeleteRepositoryItem(RepositoryKind, String),
    RefreshRepository(RepositoryKind),
    AddSupplementaryFile(LocalFile),
    RemoveSupplementaryFile(Uuid),
    SetResultImage(Option<LocalFile>),
    AddBuyListItem,
    RemoveBuyListItem(Uuid),
    Finalize,
}

/// Input buffers for a tool or material.
#[derive(Debug, Clone, Default)]
pub struct ItemForm {
    pub name: String,
    pub specification: String,
    pub image: Option<LocalFile>,
}

impl ItemForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Input buffers that live outside the staged step.
#[derive(Debug, Clone, Default)]
pub struct Forms {
    pub tool: ItemForm,
    pub material: ItemForm,
    pub file_display_name: String,
    pub buy: BuyListDraft,
}

impl Forms {
    pub fn item_mut(&mut self, kind: RepositoryKind) -> &mut ItemForm {
        match kind {
            RepositoryKind::Tools => &mut self.tool,
            RepositoryKind::Materials => &mut self.material,
        }
    }
}

/// The author's saved tools and materials as last fetched.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    pub tools: Vec<RepositoryItem>,
    pub materials: Vec<RepositoryItem>,
}

impl Repository {
    pub fn items(&self, kind: RepositoryKind) -> &[RepositoryItem] {
        match kind {
            RepositoryKind::Tools => &self.tools,
            RepositoryKind::Materials => &self.materials,
        }
    }

    pub fn set(&mut self, kind: RepositoryKind, items: Vec<RepositoryItem>) {
        match kind {
            RepositoryKind::Tools => self.tools = items,
            RepositoryKind::Materials => self.materials = items,
        }
    }
}

/// Read-only context for the panel.
pub struct PanelContext<'a> {
    pub project: Option<&'a Project>,
    /// Timestamp of the captured frame on the canvas.
    pub frame_timestamp: Option<u64>,
    pub selected_annotation: Option<Uuid>,
    pub repository: &'a Repository,
    /// A background job is running.
    pub busy: bool,
    pub signed_in: bool,
}

/// Display the properties panel.
pub fn show(
    ui: &mut egui::Ui,
    assembler: &mut StepAssembler,
    forms: &mut Forms,
    ctx: &PanelContext<'_>,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    let Some(project) = ctx.project else {
        ui.heading("Project");
        ui.separator();
        ui.label(egui::RichText::new("No project loaded").weak().italics());
        return action;
    };

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.heading(&project.name);
        if project.is_finalized() {
            ui.colored_label(egui::Color32::LIGHT_GREEN, "✔ Finalized");
        }
        ui.separator();

        ui.add_enabled_ui(!project.is_finalized() && !ctx.busy, |ui| {
            step_form(ui, assembler, forms, ctx, &mut action);
            ui.separator();
            buy_list(ui, project, &mut forms.buy, &mut action);
        });

        ui.separator();
        let can_finalize = !project.is_finalized() && !ctx.busy && ctx.signed_in;
        let finish = ui
            .add_enabled(can_finalize, egui::Button::new("Finish project"))
            .on_disabled_hover_text(if ctx.signed_in {
                "Unavailable while the project is finalized or busy"
            } else {
                "Set USER_UID to sign in"
            });
        if finish.clicked() {
            action = PropertiesAction::Finalize;
        }
    });

    action
}

fn step_form(
    ui: &mut egui::Ui,
    assembler: &mut StepAssembler,
    forms: &mut Forms,
    ctx: &PanelContext<'_>,
    action: &mut PropertiesAction,
) {
    let title = match assembler.editing_index() {
        Some(i) => format!("Edit step {}", i + 1),
        None => "New step".to_string(),
    };
    ui.label(egui::RichText::new(title).strong());

    egui::Grid::new("step_fields").num_columns(2).show(ui, |ui| {
        ui.label("Name:");
        ui.text_edit_singleline(&mut assembler.name);
        ui.end_row();

        ui.label("Description:");
        ui.text_edit_multiline(&mut assembler.description);
        ui.end_row();

        ui.label("Caution:");
        ui.text_edit_multiline(&mut assembler.cautionary_notes);
        ui.end_row();

        ui.label("Best practice:");
        ui.text_edit_multiline(&mut assembler.best_practice_notes);
        ui.end_row();
    });

    egui::CollapsingHeader::new(format!("Annotations ({})", assembler.annotations.len()))
        .default_open(true)
        .show(ui, |ui| {
            for annotation in assembler.annotations.iter() {
                ui.horizontal(|ui| {
                    let on_frame = ctx.frame_timestamp == Some(annotation.frame_timestamp_ms);
                    let text = format!("{} @ {}", annotation.label, format_ms(annotation.frame_timestamp_ms));
                    let text = if on_frame {
                        egui::RichText::new(text)
                    } else {
                        egui::RichText::new(text).weak()
                    };
                    if ui
                        .selectable_label(ctx.selected_annotation == Some(annotation.id), text)
                        .clicked()
                    {
                        *action = PropertiesAction::SelectAnnotation(annotation.id);
                    }
                    if ui.small_button("✖").clicked() {
                        *action = PropertiesAction::RemoveAnnotation(annotation.id);
                    }
                });
            }
        });

    for kind in [RepositoryKind::Tools, RepositoryKind::Materials] {
        item_section(ui, assembler, forms.item_mut(kind), kind, ctx, action);
    }

    egui::CollapsingHeader::new(format!(
        "Supplementary files ({})",
        assembler.supplementary_files.len()
    ))
    .show(ui, |ui| {
        for file in &assembler.supplementary_files {
            ui.horizontal(|ui| {
                ui.label(&file.display_name)
                    .on_hover_text(file.file.path.display().to_string());
                if ui.small_button("✖").clicked() {
                    *action = PropertiesAction::RemoveSupplementaryFile(file.id);
                }
            });
        }
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut forms.file_display_name).hint_text("Display name"));
            if ui.button("Attach...").clicked() {
                if let Some(path) = rfd::FileDialog::new().pick_file() {
                    *action = PropertiesAction::AddSupplementaryFile(LocalFile::new(path));
                }
            }
        });
    });

    egui::CollapsingHeader::new("Validation").show(ui, |ui| {
        ui.add(egui::TextEdit::singleline(&mut assembler.validation_question).hint_text("Question"));
        ui.add(egui::TextEdit::singleline(&mut assembler.validation_answer).hint_text("Expected answer"));
    });

    ui.horizontal(|ui| {
        ui.label("Result image:");
        match &assembler.result_image {
            Some(image) => {
                ui.label(image.file_name());
                if ui.small_button("✖").clicked() {
                    *action = PropertiesAction::SetResultImage(None);
                }
            }
            None => {
                if ui.button("Choose...").clicked() {
                    if let Some(image) = pick_image() {
                        *action = PropertiesAction::SetResultImage(Some(image));
                    }
                }
            }
        }
    });

    ui.add_space(6.0);
    ui.horizontal(|ui| {
        let save_label = if assembler.editing_index().is_some() {
            "Update step"
        } else {
            "Save step"
        };
        if ui.button(save_label).clicked() {
            *action = PropertiesAction::SaveStep;
        }
        if ui.button("Clear").clicked() {
            *action = PropertiesAction::ClearForm;
        }
    });
}

/// Staged tools or materials, the add form and the saved repository.
fn item_section(
    ui: &mut egui::Ui,
    assembler: &StepAssembler,
    form: &mut ItemForm,
    kind: RepositoryKind,
    ctx: &PanelContext<'_>,
    action: &mut PropertiesAction,
) {
    let (title, staged) = match kind {
        RepositoryKind::Tools => ("Tools", &assembler.tools),
        RepositoryKind::Materials => ("Materials", &assembler.materials),
    };

    egui::CollapsingHeader::new(format!("{} ({})", title, staged.len()))
        .id_source(kind.as_str())
        .show(ui, |ui| {
            for item in staged {
                ui.horizontal(|ui| {
                    let mut text = item.name.clone();
                    if !item.specification.is_empty() {
                        text.push_str(&format!(" ({})", item.specification));
                    }
                    if item.image.is_some() {
                        text.push_str(" 🖼");
                    }
                    ui.label(text);
                    if ui.small_button("✖").clicked() {
                        *action = PropertiesAction::RemoveItem(kind, item.id);
                    }
                    if ui
                        .add_enabled(ctx.signed_in && !ctx.busy, egui::Button::new("⬆").small())
                        .on_hover_text("Save to repository")
                        .clicked()
                    {
                        *action = PropertiesAction::SaveToRepository(kind, item.id);
                    }
                });
            }

            ui.horizontal(|ui| {
                ui.add(egui::TextEdit::singleline(&mut form.name).hint_text("Name").desired_width(90.0));
                ui.add(
                    egui::TextEdit::singleline(&mut form.specification)
                        .hint_text("Specification")
                        .desired_width(90.0),
                );
            });
            ui.horizontal(|ui| {
                let image_label = form
                    .image
                    .as_ref()
                    .map(|i| i.file_name())
                    .unwrap_or_else(|| "Image...".to_string());
                if ui.button(image_label).clicked() {
                    form.image = pick_image();
                }
                if ui.button("Add").clicked() {
                    *action = PropertiesAction::AddItem(kind);
                }
            });

            ui.collapsing("Repository", |ui| {
                if ui
                    .add_enabled(ctx.signed_in && !ctx.busy, egui::Button::new("⟳ Refresh"))
                    .clicked()
                {
                    *action = PropertiesAction::RefreshRepository(kind);
                }
                for (idx, saved) in ctx.repository.items(kind).iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(&saved.name);
                        if ui.small_button("Use").clicked() {
                            *action = PropertiesAction::UseRepositoryItem(kind, idx);
                        }
                        if ui
                            .add_enabled(!ctx.busy, egui::Button::new("🗑").small())
                            .clicked()
                        {
                            *action = PropertiesAction::DeleteRepositoryItem(kind, saved.id_string());
                        }
                    });
                }
            });
        });
}

fn buy_list(ui: &mut egui::Ui, project: &Project, draft: &mut BuyListDraft, action: &mut PropertiesAction) {
    egui::CollapsingHeader::new(format!("Buy list ({})", project.buy_list.len())).show(ui, |ui| {
        for item in &project.buy_list {
            ui.horizontal(|ui| {
                ui.label(format!("{} × {}", item.quantity, item.name));
                if !item.purchase_link.is_empty() {
                    ui.hyperlink_to("🔗", &item.purchase_link);
                }
                if ui.small_button("✖").clicked() {
                    *action = PropertiesAction::RemoveBuyListItem(item.id);
                }
            });
        }

        egui::Grid::new("buy_list_form").num_columns(2).show(ui, |ui| {
            ui.label("Name:");
            ui.text_edit_singleline(&mut draft.name);
            ui.end_row();
            ui.label("Quantity:");
            ui.add(egui::TextEdit::singleline(&mut draft.quantity).hint_text("1"));
            ui.end_row();
            ui.label("Specification:");
            ui.text_edit_singleline(&mut draft.specification);
            ui.end_row();
            ui.label("Link:");
            ui.text_edit_singleline(&mut draft.purchase_link);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            let image_label = draft
                .image
                .as_ref()
                .map(|i| i.file_name())
                .unwrap_or_else(|| "Image...".to_string());
            if ui.button(image_label).clicked() {
                draft.image = pick_image();
            }
            if ui.button("Add to buy list").clicked() {
                *action = PropertiesAction::AddBuyListItem;
            }
        });
    });
}

fn pick_image() -> Option<LocalFile> {
    rfd::FileDialog::new()
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file()
        .map(LocalFile::new)
}
