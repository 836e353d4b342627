// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Step data structures.
//!
//! A step covers a time range of one source video and carries everything
//! the viewer needs to perform it: notes, annotations, tools, materials,
//! supplementary files and an optional check question.

use super::annotation::Annotation;
use crate::util::mime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file on the author's machine that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, or the whole path if there is none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn mime_type(&self) -> &'static str {
        mime::from_path(&self.path)
    }
}

/// A tool or material used by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepItem {
    pub id: Uuid,
    pub name: String,
    pub specification: String,
    pub image: Option<LocalFile>,
}

impl StepItem {
    pub fn new(name: impl Into<String>, specification: impl Into<String>, image: Option<LocalFile>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            specification: specification.into(),
            image,
        }
    }
}

/// A document or other file attached to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryFile {
    pub id: Uuid,
    pub display_name: String,
    pub file: LocalFile,
}

/// Question shown after the step with the answer the author expects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationMetric {
    pub question: String,
    pub expected_answer: String,
}

/// An assembled step of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    pub cautionary_notes: String,
    #[serde(default)]
    pub best_practice_notes: String,
    pub video_index: usize,
    pub video_path: Option<String>,
    pub step_order: usize,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub tools: Vec<StepItem>,
    #[serde(default)]
    pub materials: Vec<StepItem>,
    #[serde(default)]
    pub supplementary_files: Vec<SupplementaryFile>,
    pub validation: Option<ValidationMetric>,
    pub result_image: Option<LocalFile>,
}

impl Step {
    /// Whether a playback position falls inside this step's range.
    pub fn contains_ms(&self, ms: u64) -> bool {
        ms >= self.start_ms && ms < self.end_ms
    }
}
