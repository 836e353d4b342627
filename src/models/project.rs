// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! This module holds the project being authored: its uploaded videos, the
//! ordered steps and the buy list.

use super::step::{LocalFile, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A project video already stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVideo {
    pub name: String,
    pub url: String,
    pub path: String,
}

/// Something the viewer has to buy before starting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyListItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub specification: String,
    pub purchase_link: String,
    pub image: Option<LocalFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Finalized,
}

/// Complete project data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Identifier assigned by the backend at creation.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub videos: Vec<UploadedVideo>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub buy_list: Vec<BuyListItem>,
    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    /// Create a draft project with the given backend id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            videos: Vec::new(),
            steps: Vec::new(),
            buy_list: Vec::new(),
            status: ProjectStatus::Draft,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.status == ProjectStatus::Finalized
    }

    /// Record a successful finalize. Later step edits are rejected.
    pub fn mark_finalized(&mut self) {
        self.status = ProjectStatus::Finalized;
    }

    pub fn video_path(&self, index: usize) -> Option<&str> {
        self.videos.get(index).map(|v| v.path.as_str())
    }
}
