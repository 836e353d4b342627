// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! New project creation: upload source videos, then register the project.

use crate::models::project::{Project, UploadedVideo};
use crate::models::step::LocalFile;
use crate::models::user::UserSession;
use crate::remote::api::{ApiError, ProjectsBackend};
use crate::remote::payload::CreateProjectRequest;
use crate::remote::storage::{video_object_path, ObjectStorage, StorageError, Upload};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum CreateProjectError {
    #[error("Project name is required.")]
    EmptyName,

    #[error("Please upload at least one video.")]
    NoVideos,

    #[error("User not authenticated for file upload.")]
    Unauthenticated,

    #[error("Video upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Input for [`create_project`].
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub videos: Vec<LocalFile>,
}

impl NewProject {
    /// Split a comma separated tag string, dropping blanks.
    pub fn set_tags(&mut self, raw: &str) {
        self.tags = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }
}

/// Upload each video in order, then create the project on the backend.
///
/// Returns a draft [`Project`] with the backend id and the uploaded video
/// references. Nothing is created remotely if any upload fails.
pub async fn create_project(
    storage: &dyn ObjectStorage,
    api: &dyn ProjectsBackend,
    user: &UserSession,
    new: NewProject,
) -> Result<Project, CreateProjectError> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(CreateProjectError::EmptyName);
    }
    if new.videos.is_empty() {
        return Err(CreateProjectError::NoVideos);
    }
    if user.uid.trim().is_empty() {
        return Err(CreateProjectError::Unauthenticated);
    }

    let mut videos = Vec::with_capacity(new.videos.len());
    for file in &new.videos {
        let upload = Upload::from_local(file).await?;
        let path = video_object_path(&user.uid, &upload.file_name);
        let stored = storage.upload(upload, &path).await?;
        videos.push(UploadedVideo {
            name: stored.name,
            url: stored.url,
            path: stored.path,
        });
    }

    let request = CreateProjectRequest {
        name: name.to_string(),
        description: new.description.clone(),
        tags: new.tags.iter().cloned().collect(),
        firebase_uid: user.uid.clone(),
        frame_url: videos.first().map(|v| v.url.clone()),
        upload_videos: videos.clone(),
    };
    let id = api.create_project(&request).await?;
    log::info!("Created project {} with {} video(s)", id, videos.len());

    let mut project = Project::new(id, name);
    project.description = new.description;
    project.tags = new.tags;
    project.videos = videos;
    Ok(project)
}
