// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project draft serialization and deserialization.
//!
//! This module saves and loads in-progress projects in YAML and JSON
//! formats so a failed finalize can be retried later. Local file handles
//! are stored as paths; captured frames are not saved.

use crate::authoring::assembler::{check_step, ValidationError};
use crate::models::project::Project;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Export project data to YAML format.
pub fn export_yaml(data: &Project, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export project data to JSON format.
pub fn export_json(data: &Project, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<Project> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<Project> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Save a draft, picking the format from the file extension.
pub fn save_draft(data: &Project, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

/// Load a draft, picking the format from the file extension.
///
/// Steps are checked like freshly saved ones and renumbered in their
/// stored order.
pub fn load_draft(path: &Path) -> Result<Project> {
    let mut project = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => import_yaml(path)?,
        Some("json") => import_json(path)?,
        other => bail!("Unsupported file extension: {:?}", other),
    };
    check_draft(&mut project)?;
    Ok(project)
}

fn check_draft(project: &mut Project) -> Result<()> {
    project.steps.sort_by_key(|step| step.step_order);

    let mut seen = HashSet::new();
    for (order, step) in project.steps.iter_mut().enumerate() {
        check_step(step).with_context(|| format!("Invalid step {} \"{}\"", order + 1, step.name))?;
        if let Some(annotation) = step.annotations.iter().find(|a| !seen.insert(a.id)) {
            return Err(ValidationError::DuplicateAnnotation(annotation.id))
                .with_context(|| format!("Invalid step {} \"{}\"", order + 1, step.name));
        }
        step.step_order = order;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{Annotation, Geometry, Rect};
    use crate::models::step::{LocalFile, Step, StepItem};
    use uuid::Uuid;

    fn sample_project() -> Project {
        let mut project = Project::new("42", "Shelf build");
        project.tags.insert("woodwork".into());
        project.steps.push(Step {
            id: Uuid::new_v4(),
            name: "Cut boards".into(),
            description: "Cut to length".into(),
            start_ms: 1_000,
            end_ms: 9_500,
            cautionary_notes: "Wear goggles".into(),
            best_practice_notes: String::new(),
            video_index: 0,
            video_path: Some("users/u/videos/a.mp4".into()),
            step_order: 0,
            annotations: vec![Annotation {
                id: Uuid::new_v4(),
                label: "Saw".into(),
                frame_timestamp_ms: 2_000,
                geometry: Geometry::normalized(Rect::new(0.1, 0.2, 0.3, 0.4)),
            }],
            tools: vec![StepItem::new("Saw", "Crosscut", Some(LocalFile::new("/tmp/saw.png")))],
            materials: Vec::new(),
            supplementary_files: Vec::new(),
            validation: None,
            result_image: None,
        });
        project
    }

    #[test]
    fn test_yaml_draft_preserves_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.yaml");
        let project = sample_project();

        save_draft(&project, &path).unwrap();
        assert_eq!(load_draft(&path).unwrap(), project);
    }

    #[test]
    fn test_json_draft_preserves_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.json");
        let project = sample_project();

        save_draft(&project, &path).unwrap();
        assert_eq!(load_draft(&path).unwrap(), project);
    }

    #[test]
    fn test_draft_steps_are_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.json");
        let mut project = sample_project();
        let mut second = project.steps[0].clone();
        second.id = Uuid::new_v4();
        second.name = "Sand edges".into();
        second.annotations.clear();
        second.step_order = 7;
        project.steps[0].step_order = 3;
        project.steps.insert(0, second);

        save_draft(&project, &path).unwrap();
        let loaded = load_draft(&path).unwrap();
        let order: Vec<_> = loaded.steps.iter().map(|s| (s.name.as_str(), s.step_order)).collect();
        assert_eq!(order, [("Cut boards", 0), ("Sand edges", 1)]);
    }

    #[test]
    fn test_invalid_draft_steps_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.json");

        let mut project = sample_project();
        project.steps[0].start_ms = 5_000;
        project.steps[0].end_ms = 1_000;
        save_draft(&project, &path).unwrap();
        let err = load_draft(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EndNotAfterStart)
        );

        let mut project = sample_project();
        project.steps[0].name = "  ".into();
        save_draft(&project, &path).unwrap();
        let err = load_draft(&path).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>(), Some(&ValidationError::EmptyName));

        let mut project = sample_project();
        let mut copy = project.steps[0].clone();
        copy.id = Uuid::new_v4();
        copy.step_order = 1;
        let duplicate = copy.annotations[0].id;
        project.steps.push(copy);
        save_draft(&project, &path).unwrap();
        let err = load_draft(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::DuplicateAnnotation(duplicate))
        );
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.toml");
        assert!(save_draft(&sample_project(), &path).is_err());
        assert!(load_draft(&path).is_err());
    }
}
