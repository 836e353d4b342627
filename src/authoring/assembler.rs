// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Step assembly.
//!
//! [`StepAssembler`] holds the staged fields of the step form. Saving
//! validates them, builds a [`Step`] and either appends it or replaces the
//! step being edited, then clears the form for the next step.

use super::store::AnnotationStore;
use crate::models::project::{BuyListItem, Project};
use crate::models::step::{LocalFile, Step, StepItem, SupplementaryFile, ValidationMetric};
use crate::util::time::{ms_to_seconds, seconds_to_ms};
use uuid::Uuid;

/// A staged step that cannot be saved. Shown to the author; nothing changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Step name is required.")]
    EmptyName,
    #[error("Step description is required.")]
    EmptyDescription,
    #[error("Mark start/end times.")]
    MissingTimeRange,
    #[error("End time must be after start time.")]
    EndNotAfterStart,
    #[error("Tool name is required.")]
    EmptyToolName,
    #[error("Material name is required.")]
    EmptyMaterialName,
    #[error("Item name is required for buy list.")]
    EmptyBuyListName,
    #[error("Project has already been finalized.")]
    Finalized,
    #[error("Annotation {0} appears more than once.")]
    DuplicateAnnotation(Uuid),
}

/// Whether a save created a step or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created { index: usize, id: Uuid },
    Updated { index: usize, id: Uuid },
}

impl SaveOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Created { index, .. } | Self::Updated { index, .. } => *index,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Created { id, .. } | Self::Updated { id, .. } => *id,
        }
    }
}

/// Check a stored step against the rules a saved step satisfies.
pub fn check_step(step: &Step) -> Result<(), ValidationError> {
    if step.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if step.description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if step.end_ms <= step.start_ms {
        return Err(ValidationError::EndNotAfterStart);
    }
    Ok(())
}

/// Staged form state for one step.
#[derive(Debug, Clone, Default)]
pub struct StepAssembler {
    pub name: String,
    pub description: String,
    /// Marked start in seconds.
    pub start_time: Option<f64>,
    /// Marked end in seconds.
    pub end_time: Option<f64>,
    pub cautionary_notes: String,
    pub best_practice_notes: String,
    pub annotations: AnnotationStore,
    pub tools: Vec<StepItem>,
    pub materials: Vec<StepItem>,
    pub supplementary_files: Vec<SupplementaryFile>,
    pub validation_question: String,
    pub validation_answer: String,
    pub result_image: Option<LocalFile>,
    /// Index of the step being edited; `None` creates a new step.
    editing: Option<usize>,
    /// Source video of the step being edited, until the author picks another.
    video: Option<(usize, Option<String>)>,
}

impl StepAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.editing
    }

    /// Attach the edited step to another project video.
    pub fn select_video(&mut self, index: usize) {
        if self.video.as_ref().is_some_and(|(current, _)| *current != index) {
            self.video = None;
        }
    }

    /// Mark the step start at `seconds`.
    pub fn mark_start(&mut self, seconds: f64) {
        self.start_time = Some(seconds);
    }

    /// Mark the step end at `seconds`; must lie after the marked start.
    pub fn mark_end(&mut self, seconds: f64) -> Result<(), ValidationError> {
        if let Some(start) = self.start_time {
            if seconds <= start {
                return Err(ValidationError::EndNotAfterStart);
            }
        }
        self.end_time = Some(seconds);
        Ok(())
    }

    /// Check the staged fields and return the rounded time range.
    pub fn validate(&self) -> Result<(u64, u64), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        let (start, end) = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ValidationError::MissingTimeRange),
        };
        let (start_ms, end_ms) = (seconds_to_ms(start), seconds_to_ms(end));
        if end_ms <= start_ms {
            return Err(ValidationError::EndNotAfterStart);
        }
        Ok((start_ms, end_ms))
    }

    /// Validate and store the staged step into `project`.
    ///
    /// In edit mode the step at the edited index is replaced and keeps its
    /// id, order and video unless [`select_video`](Self::select_video) moved
    /// it. `selected_video` is used for new steps. On success the form is
    /// cleared; on error neither the form nor the project changes.
    pub fn save(
        &mut self,
        project: &mut Project,
        selected_video: usize,
    ) -> Result<SaveOutcome, ValidationError> {
        if project.is_finalized() {
            return Err(ValidationError::Finalized);
        }
        let (start_ms, end_ms) = self.validate()?;

        let editing = self.editing.filter(|&i| i < project.steps.len());
        let (id, step_order) = match editing {
            Some(i) => (project.steps[i].id, project.steps[i].step_order),
            None => (Uuid::new_v4(), project.steps.len()),
        };

        let (video_index, video_path) = match (editing, self.video.clone()) {
            (Some(_), Some(kept)) => kept,
            _ => (
                selected_video,
                project.video_path(selected_video).map(str::to_string),
            ),
        };

        let validation = if self.validation_question.trim().is_empty()
            && self.validation_answer.trim().is_empty()
        {
            None
        } else {
            Some(ValidationMetric {
                question: self.validation_question.clone(),
                expected_answer: self.validation_answer.clone(),
            })
        };

        let step = Step {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            start_ms,
            end_ms,
            cautionary_notes: self.cautionary_notes.clone(),
            best_practice_notes: self.best_practice_notes.clone(),
            video_index,
            video_path,
            step_order,
            annotations: self.annotations.to_vec(),
            tools: self.tools.clone(),
            materials: self.materials.clone(),
            supplementary_files: self.supplementary_files.clone(),
            validation,
            result_image: self.result_image.clone(),
        };

        let outcome = match editing {
            Some(index) => {
                project.steps[index] = step;
                log::info!("Step \"{}\" updated at index {}", self.name, index);
                SaveOutcome::Updated { index, id }
            }
            None => {
                project.steps.push(step);
                let index = project.steps.len() - 1;
                log::info!("Step \"{}\" added, total: {}", self.name, project.steps.len());
                SaveOutcome::Created { index, id }
            }
        };

        self.clear();
        Ok(outcome)
    }

    /// Load a saved step into the form for editing.
    pub fn load_for_editing(&mut self, step: &Step, index: usize) {
        self.editing = Some(index);
        self.video = Some((step.video_index, step.video_path.clone()));
        self.name = step.name.clone();
        self.description = step.description.clone();
        self.start_time = Some(ms_to_seconds(step.start_ms));
        self.end_time = Some(ms_to_seconds(step.end_ms));
        self.cautionary_notes = step.cautionary_notes.clone();
        self.best_practice_notes = step.best_practice_notes.clone();
        self.annotations = AnnotationStore::from_vec(step.annotations.clone());
        self.tools = step.tools.clone();
        self.materials = step.materials.clone();
        self.supplementary_files = step.supplementary_files.clone();
        let validation = step.validation.clone().unwrap_or_default();
        self.validation_question = validation.question;
        self.validation_answer = validation.expected_answer;
        self.result_image = step.result_image.clone();
    }

    /// Reset every staged field and leave edit mode.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Delete a step and keep the edit index pointing at the same step.
    pub fn delete_step(&mut self, project: &mut Project, index: usize) -> Option<Step> {
        if project.is_finalized() || index >= project.steps.len() {
            return None;
        }
        let removed = project.steps.remove(index);
        for (order, step) in project.steps.iter_mut().enumerate() {
            step.step_order = order;
        }

        match self.editing {
            Some(i) if i == index => self.clear(),
            Some(i) if i > index => self.editing = Some(i - 1),
            _ => {}
        }
        log::info!("Deleted step \"{}\", total: {}", removed.name, project.steps.len());
        Some(removed)
    }

    pub fn add_tool(
        &mut self,
        name: &str,
        specification: &str,
        image: Option<LocalFile>,
    ) -> Result<Uuid, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyToolName);
        }
        let item = StepItem::new(name, specification, image);
        let id = item.id;
        self.tools.push(item);
        Ok(id)
    }

    pub fn remove_tool(&mut self, id: Uuid) {
        self.tools.retain(|t| t.id != id);
    }

    pub fn add_material(
        &mut self,
        name: &str,
        specification: &str,
        image: Option<LocalFile>,
    ) -> Result<Uuid, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyMaterialName);
        }
        let item = StepItem::new(name, specification, image);
        let id = item.id;
        self.materials.push(item);
        Ok(id)
    }

    pub fn remove_material(&mut self, id: Uuid) {
        self.materials.retain(|m| m.id != id);
    }

    /// Attach a file; a blank display name falls back to the file name.
    pub fn add_supplementary_file(&mut self, file: LocalFile, display_name: &str) -> Uuid {
        let display_name = if display_name.trim().is_empty() {
            file.file_name()
        } else {
            display_name.to_string()
        };
        let id = Uuid::new_v4();
        self.supplementary_files.push(SupplementaryFile {
            id,
            display_name,
            file,
        });
        id
    }

    pub fn remove_supplementary_file(&mut self, id: Uuid) {
        self.supplementary_files.retain(|f| f.id != id);
    }

    pub fn set_result_image(&mut self, image: Option<LocalFile>) {
        self.result_image = image;
    }
}

/// Fields of a buy-list item as typed by the author.
#[derive(Debug, Clone, Default)]
pub struct BuyListDraft {
    pub name: String,
    /// Free text; anything that is not a positive integer counts as 1.
    pub quantity: String,
    pub specification: String,
    pub purchase_link: String,
    pub image: Option<LocalFile>,
}

/// Add an item to the project's buy list.
pub fn add_buy_list_item(project: &mut Project, draft: BuyListDraft) -> Result<Uuid, ValidationError> {
    if project.is_finalized() {
        return Err(ValidationError::Finalized);
    }
    if draft.name.trim().is_empty() {
        return Err(ValidationError::EmptyBuyListName);
    }
    let quantity = draft
        .quantity
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|q| *q > 0)
        .unwrap_or(1);

    let id = Uuid::new_v4();
    project.buy_list.push(BuyListItem {
        id,
        name: draft.name,
        quantity,
        specification: draft.specification,
        purchase_link: draft.purchase_link,
        image: draft.image,
    });
    Ok(id)
}

pub fn remove_buy_list_item(project: &mut Project, id: Uuid) {
    if !project.is_finalized() {
        project.buy_list.retain(|item| item.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{Geometry, NewAnnotation, Rect};
    use crate::models::project::UploadedVideo;
    use assert_matches::assert_matches;

    fn project() -> Project {
        let mut project = Project::new("p1", "Birdhouse");
        project.videos.push(UploadedVideo {
            name: "main.mp4".into(),
            url: "https://cdn/main.mp4".into(),
            path: "users/u/videos/main.mp4".into(),
        });
        project
    }

    fn staged(name: &str, start: f64, end: f64) -> StepAssembler {
        let mut a = StepAssembler::new();
        a.name = name.into();
        a.description = "Do the thing".into();
        a.start_time = Some(start);
        a.end_time = Some(end);
        a
    }

    #[test]
    fn test_save_creates_step_and_clears_form() {
        let mut project = project();
        let mut a = staged("Cut", 1.0, 2.5);
        a.annotations.add(NewAnnotation {
            label: Some("Blade".into()),
            frame_timestamp_ms: 1200,
            geometry: Geometry::normalized(Rect::new(0.1, 0.1, 0.2, 0.2)),
        });
        a.add_tool("Saw", "Fine tooth", None).unwrap();

        let outcome = a.save(&mut project, 0).unwrap();
        assert_matches!(outcome, SaveOutcome::Created { index: 0, .. });

        let step = &project.steps[0];
        assert_eq!(step.id, outcome.id());
        assert_eq!((step.start_ms, step.end_ms), (1000, 2500));
        assert_eq!(step.video_path.as_deref(), Some("users/u/videos/main.mp4"));
        assert_eq!(step.annotations.len(), 1);
        assert_eq!(step.tools[0].name, "Saw");
        assert!(step.validation.is_none());

        assert!(a.name.is_empty());
        assert!(a.annotations.is_empty());
        assert!(a.tools.is_empty());
        assert_eq!(a.start_time, None);
    }

    #[test]
    fn test_rejects_bad_time_range_without_mutation() {
        let mut project = project();
        for (start, end) in [(2.0, 2.0), (3.0, 1.0), (1.0001, 1.0004)] {
            let mut a = staged("Cut", start, end);
            assert_eq!(a.save(&mut project, 0), Err(ValidationError::EndNotAfterStart));
            assert!(project.steps.is_empty());
            assert_eq!(a.name, "Cut");
        }

        let mut a = staged("Cut", 1.0, 2.0);
        a.end_time = None;
        assert_eq!(a.save(&mut project, 0), Err(ValidationError::MissingTimeRange));
        assert!(project.steps.is_empty());
    }

    #[test]
    fn test_rejects_empty_name_and_description() {
        let mut project = project();
        let mut a = staged("   ", 1.0, 2.0);
        assert_eq!(a.save(&mut project, 0), Err(ValidationError::EmptyName));

        let mut a = staged("Cut", 1.0, 2.0);
        a.description = "\t".into();
        assert_eq!(a.save(&mut project, 0), Err(ValidationError::EmptyDescription));
        assert!(project.steps.is_empty());
    }

    #[test]
    fn test_edit_preserves_identity_and_length() {
        let mut project = project();
        staged("One", 0.0, 1.0).save(&mut project, 0).unwrap();
        staged("Two", 1.0, 2.0).save(&mut project, 0).unwrap();
        staged("Three", 2.0, 3.0).save(&mut project, 0).unwrap();
        let original_id = project.steps[1].id;

        let mut a = StepAssembler::new();
        a.load_for_editing(&project.steps[1].clone(), 1);
        assert_eq!(a.editing_index(), Some(1));
        assert_eq!(a.start_time, Some(1.0));
        a.name = "Two, revised".into();

        let outcome = a.save(&mut project, 0).unwrap();
        assert_matches!(outcome, SaveOutcome::Updated { index: 1, .. });
        assert_eq!(outcome.id(), original_id);
        assert_eq!(project.steps.len(), 3);
        assert_eq!(project.steps[1].id, original_id);
        assert_eq!(project.steps[1].step_order, 1);
        assert_eq!(project.steps[1].name, "Two, revised");
        assert_eq!(a.editing_index(), None);
    }

    #[test]
    fn test_edit_keeps_step_video_until_changed() {
        let mut project = project();
        project.videos.push(UploadedVideo {
            name: "closeup.mp4".into(),
            url: "https://cdn/closeup.mp4".into(),
            path: "users/u/videos/closeup.mp4".into(),
        });
        staged("Sand", 0.0, 1.0).save(&mut project, 0).unwrap();

        let mut a = StepAssembler::new();
        a.load_for_editing(&project.steps[0].clone(), 0);
        a.name = "Sand smooth".into();
        a.save(&mut project, 1).unwrap();
        assert_eq!(project.steps[0].video_index, 0);
        assert_eq!(project.steps[0].video_path.as_deref(), Some("users/u/videos/main.mp4"));

        a.load_for_editing(&project.steps[0].clone(), 0);
        a.select_video(0);
        a.save(&mut project, 1).unwrap();
        assert_eq!(project.steps[0].video_index, 0);

        a.load_for_editing(&project.steps[0].clone(), 0);
        a.select_video(1);
        a.save(&mut project, 1).unwrap();
        assert_eq!(project.steps[0].video_index, 1);
        assert_eq!(project.steps[0].video_path.as_deref(), Some("users/u/videos/closeup.mp4"));
    }

    #[test]
    fn test_mark_end_must_follow_start() {
        let mut a = StepAssembler::new();
        a.mark_start(5.0);
        assert_eq!(a.mark_end(4.0), Err(ValidationError::EndNotAfterStart));
        assert_eq!(a.mark_end(5.0), Err(ValidationError::EndNotAfterStart));
        assert_eq!(a.end_time, None);
        assert!(a.mark_end(6.0).is_ok());
        assert_eq!(a.end_time, Some(6.0));
    }

    #[test]
    fn test_delete_shifts_edit_index() {
        let mut project = project();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            staged(name, i as f64, i as f64 + 1.0).save(&mut project, 0).unwrap();
        }

        let mut a = StepAssembler::new();
        a.load_for_editing(&project.steps[2].clone(), 2);
        a.delete_step(&mut project, 0).unwrap();
        assert_eq!(a.editing_index(), Some(1));
        assert_eq!(project.steps[1].name, "c");
        assert_eq!(project.steps[1].step_order, 1);

        a.delete_step(&mut project, 1).unwrap();
        assert_eq!(a.editing_index(), None);
        assert!(a.name.is_empty());
        assert!(a.delete_step(&mut project, 5).is_none());
    }

    #[test]
    fn test_validation_metric_kept_when_filled() {
        let mut project = project();
        let mut a = staged("Check", 0.0, 1.0);
        a.validation_question = "Is it level?".into();
        a.validation_answer = "Yes".into();
        a.save(&mut project, 0).unwrap();

        let metric = project.steps[0].validation.as_ref().unwrap();
        assert_eq!(metric.question, "Is it level?");
        assert_eq!(metric.expected_answer, "Yes");
    }

    #[test]
    fn test_finalized_project_rejects_edits() {
        let mut project = project();
        staged("One", 0.0, 1.0).save(&mut project, 0).unwrap();
        project.mark_finalized();

        let mut a = staged("Two", 1.0, 2.0);
        assert_eq!(a.save(&mut project, 0), Err(ValidationError::Finalized));
        assert!(a.delete_step(&mut project, 0).is_none());
        assert_eq!(project.steps.len(), 1);
    }

    #[test]
    fn test_staged_items_require_names() {
        let mut a = StepAssembler::new();
        assert_eq!(a.add_tool(" ", "", None), Err(ValidationError::EmptyToolName));
        assert_eq!(a.add_material("", "", None), Err(ValidationError::EmptyMaterialName));

        let tool = a.add_tool("Clamp", "", None).unwrap();
        a.add_material("Glue", "PVA", None).unwrap();
        a.remove_tool(tool);
        assert!(a.tools.is_empty());
        assert_eq!(a.materials.len(), 1);
    }

    #[test]
    fn test_supplementary_display_name_defaults_to_file_name() {
        let mut a = StepAssembler::new();
        a.add_supplementary_file(LocalFile::new("/docs/cut-list.pdf"), "");
        let id = a.add_supplementary_file(LocalFile::new("/docs/plan.pdf"), "Plan");
        assert_eq!(a.supplementary_files[0].display_name, "cut-list.pdf");
        assert_eq!(a.supplementary_files[1].display_name, "Plan");
        a.remove_supplementary_file(id);
        assert_eq!(a.supplementary_files.len(), 1);
    }

    #[test]
    fn test_buy_list_quantity_defaults_to_one() {
        let mut project = project();
        let draft = |qty: &str| BuyListDraft {
            name: "Screws".into(),
            quantity: qty.into(),
            ..Default::default()
        };

        add_buy_list_item(&mut project, draft("12")).unwrap();
        add_buy_list_item(&mut project, draft("lots")).unwrap();
        let last = add_buy_list_item(&mut project, draft("0")).unwrap();
        let quantities: Vec<u32> = project.buy_list.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, [12, 1, 1]);

        assert_eq!(
            add_buy_list_item(&mut project, BuyListDraft::default()),
            Err(ValidationError::EmptyBuyListName)
        );

        remove_buy_list_item(&mut project, last);
        assert_eq!(project.buy_list.len(), 2);
    }
}
