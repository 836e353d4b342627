// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! JSON bodies exchanged with the backend.

use crate::models::annotation::Geometry;
use crate::models::project::UploadedVideo;
use crate::models::step::ValidationMetric;
use crate::models::user::UserSession;
use serde::{Deserialize, Serialize};

/// Body of `POST /users/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSyncRequest {
    pub firebase_uid: String,
    pub email: String,
    pub username: String,
    pub is_creator: bool,
}

impl From<&UserSession> for UserSyncRequest {
    fn from(user: &UserSession) -> Self {
        Self {
            firebase_uid: user.uid.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            is_creator: true,
        }
    }
}

/// Body of `POST /projects/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub firebase_uid: String,
    #[serde(rename = "UploadVideos")]
    pub upload_videos: Vec<UploadedVideo>,
    pub frame_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectResponse {
    pub project_id: serde_json::Value,
}

impl CreateProjectResponse {
    /// The id as a string, whether the backend sent a number or a string.
    pub fn id_string(&self) -> String {
        match &self.project_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// One annotation of a finalized step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationPayload {
    pub frame_timestamp_ms: u64,
    pub annotation_type: String,
    pub component_name: String,
    pub data: Geometry,
    pub frame_image_path: Option<String>,
}

/// A tool or material with its image replaced by the remote reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPayload {
    pub name: String,
    pub specification: String,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplementaryFilePayload {
    pub display_name: String,
    pub file_url: String,
    pub file_path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPayload {
    pub name: String,
    pub description: String,
    pub video_start_time_ms: u64,
    pub video_end_time_ms: u64,
    pub cautionary_notes: String,
    pub best_practice_notes: String,
    pub associated_video_path: Option<String>,
    pub step_order: usize,
    pub annotations: Vec<AnnotationPayload>,
    pub tools: Vec<ItemPayload>,
    pub materials: Vec<ItemPayload>,
    pub supplementary_files: Vec<SupplementaryFilePayload>,
    pub validation_metric: Option<ValidationMetric>,
    pub result_image_url: Option<String>,
    pub result_image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyListPayload {
    pub name: String,
    pub quantity: u32,
    pub specification: String,
    pub purchase_link: String,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
}

/// Body of `POST /upload_steps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizePayload {
    pub project_id: String,
    pub project_name: String,
    pub user_id: String,
    pub thumbnail_path: Option<String>,
    pub steps: Vec<StepPayload>,
    pub buy_list: Vec<BuyListPayload>,
}

/// Kind of entry in the author's reusable repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Tools,
    Materials,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Materials => "materials",
        }
    }
}

/// A tool or material saved in the author's repository.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryItem {
    #[serde(alias = "tool_id", alias = "material_id")]
    pub id: serde_json::Value,
    pub name: String,
    #[serde(default)]
    pub specification: Option<String>,
    #[serde(default)]
    pub purchase_link: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl RepositoryItem {
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
