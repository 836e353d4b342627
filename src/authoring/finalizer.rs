// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project finalization.
//!
//! Uploads every local asset of a project one file at a time, swaps each
//! local handle for the returned `{url, path}` pair and submits the whole
//! project to the backend in one request. Any failure aborts the run and
//! leaves the project as it was, so the author can simply try again.

use super::store::FrameCache;
use crate::models::project::Project;
use crate::models::step::{LocalFile, Step, StepItem};
use crate::models::user::UserSession;
use crate::remote::api::{ApiError, StepsBackend};
use crate::remote::payload::{
    AnnotationPayload, BuyListPayload, FinalizePayload, ItemPayload, StepPayload,
    SupplementaryFilePayload,
};
use crate::remote::storage::{project_object_path, Category, ObjectStorage, StorageError, StoredObject, Upload};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("Please add at least one step before finishing the project.")]
    NoSteps,

    #[error("Project has already been finalized.")]
    AlreadyFinalized,

    #[error("User not authenticated for file upload.")]
    Unauthenticated,

    #[error("Finalization failed: {0}")]
    Upload(#[from] StorageError),

    #[error("Finalization failed: {0}")]
    Submit(#[from] ApiError),
}

/// Result of a successful finalize.
#[derive(Debug, Clone)]
pub struct FinalizeReceipt {
    /// The payload that was submitted.
    pub payload: FinalizePayload,
    /// Backend response body.
    pub response: serde_json::Value,
    /// Number of files uploaded.
    pub uploads: usize,
}

/// Drives uploads and the final submit for one project.
pub struct Finalizer<'a> {
    storage: &'a dyn ObjectStorage,
    backend: &'a dyn StepsBackend,
    progress: Option<Box<dyn Fn(&str) + Send + Sync + 'a>>,
}

impl<'a> Finalizer<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, backend: &'a dyn StepsBackend) -> Self {
        Self {
            storage,
            backend,
            progress: None,
        }
    }

    /// Report human-readable progress messages while running.
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Upload all assets and submit the project.
    ///
    /// `project` is not modified; the caller marks it finalized once this
    /// returns `Ok`.
    pub async fn finalize(
        &self,
        project: &Project,
        frames: &FrameCache,
        user: &UserSession,
    ) -> Result<FinalizeReceipt, FinalizeError> {
        if project.steps.is_empty() {
            return Err(FinalizeError::NoSteps);
        }
        if project.is_finalized() {
            return Err(FinalizeError::AlreadyFinalized);
        }
        if user.uid.trim().is_empty() {
            return Err(FinalizeError::Unauthenticated);
        }

        let mut run = Run {
            finalizer: self,
            project,
            user,
            uploads: 0,
            frame_uploads: HashMap::new(),
        };

        self.report("Finalizing project... Preparing files...");
        let thumbnail = run.upload_thumbnail(frames).await?;

        let mut steps = Vec::with_capacity(project.steps.len());
        for step in &project.steps {
            steps.push(run.process_step(step, frames).await?);
        }

        let mut buy_list = Vec::with_capacity(project.buy_list.len());
        for item in &project.buy_list {
            let image = run.upload_optional(item.image.as_ref(), Category::BuyListImages).await?;
            let (image_url, image_path) = split_ref(image);
            buy_list.push(BuyListPayload {
                name: item.name.clone(),
                quantity: item.quantity,
                specification: item.specification.clone(),
                purchase_link: item.purchase_link.clone(),
                image_url,
                image_path,
            });
        }

        let payload = FinalizePayload {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            user_id: user.uid.clone(),
            thumbnail_path: thumbnail.map(|t| t.path),
            steps,
            buy_list,
        };

        self.report("Saving project...");
        let response = self.backend.upload_steps(user, &payload).await?;
        log::info!(
            "Finalized project {} ({} steps, {} uploads)",
            project.id,
            payload.steps.len(),
            run.uploads
        );

        Ok(FinalizeReceipt {
            payload,
            response,
            uploads: run.uploads,
        })
    }

    fn report(&self, message: &str) {
        log::info!("{}", message);
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }
}

/// State of one finalize run.
struct Run<'r, 'a> {
    finalizer: &'r Finalizer<'a>,
    project: &'r Project,
    user: &'r UserSession,
    uploads: usize,
    /// Annotated frames already uploaded, by timestamp.
    frame_uploads: HashMap<u64, StoredObject>,
}

impl Run<'_, '_> {
    async fn upload(&mut self, upload: Upload, category: Category) -> Result<StoredObject, StorageError> {
        let path = project_object_path(&self.user.uid, &self.project.id, category, &upload.file_name);
        let stored = self.finalizer.storage.upload(upload, &path).await?;
        self.uploads += 1;
        Ok(stored)
    }

    async fn upload_optional(
        &mut self,
        file: Option<&LocalFile>,
        category: Category,
    ) -> Result<Option<StoredObject>, StorageError> {
        match file {
            Some(file) => {
                let upload = Upload::from_local(file).await?;
                Ok(Some(self.upload(upload, category).await?))
            }
            None => Ok(None),
        }
    }

    /// The first annotation of the first annotated step picks the thumbnail.
    async fn upload_thumbnail(&mut self, frames: &FrameCache) -> Result<Option<StoredObject>, StorageError> {
        let first = self
            .project
            .steps
            .iter()
            .find_map(|step| step.annotations.first());
        let Some(frame) = first.and_then(|a| frames.get(a.frame_timestamp_ms)) else {
            return Ok(None);
        };

        self.finalizer.report("Uploading project thumbnail...");
        let stored = self.upload(Upload::from_frame(frame), Category::Thumbnails).await?;
        self.frame_uploads.insert(frame.timestamp_ms, stored.clone());
        Ok(Some(stored))
    }

    async fn process_step(&mut self, step: &Step, frames: &FrameCache) -> Result<StepPayload, StorageError> {
        let mut annotations = Vec::with_capacity(step.annotations.len());
        for ann in &step.annotations {
            let ts = ann.frame_timestamp_ms;
            if !self.frame_uploads.contains_key(&ts) {
                if let Some(frame) = frames.get(ts) {
                    self.finalizer
                        .report(&format!("Uploading frame for annotation: {}...", ann.label));
                    let stored = self.upload(Upload::from_frame(frame), Category::AnnotationFrames).await?;
                    self.frame_uploads.insert(ts, stored);
                }
            }

            annotations.push(AnnotationPayload {
                frame_timestamp_ms: ts,
                annotation_type: ann.geometry.kind.as_str().to_string(),
                component_name: ann.label.clone(),
                data: ann.geometry,
                frame_image_path: self.frame_uploads.get(&ts).map(|s| s.path.clone()),
            });
        }

        let tools = self.process_items(&step.tools, Category::Tools).await?;
        let materials = self.process_items(&step.materials, Category::Materials).await?;

        let mut supplementary_files = Vec::with_capacity(step.supplementary_files.len());
        for sup in &step.supplementary_files {
            let stored = self
                .upload(Upload::from_local(&sup.file).await?, Category::SupplementaryFiles)
                .await?;
            supplementary_files.push(SupplementaryFilePayload {
                display_name: sup.display_name.clone(),
                file_url: stored.url,
                file_path: stored.path,
                original_filename: stored.name,
                mime_type: stored.mime_type,
                file_size_bytes: stored.size,
            });
        }

        let result = self
            .upload_optional(step.result_image.as_ref(), Category::ResultImages)
            .await?;
        let (result_image_url, result_image_path) = split_ref(result);

        Ok(StepPayload {
            name: step.name.clone(),
            description: step.description.clone(),
            video_start_time_ms: step.start_ms,
            video_end_time_ms: step.end_ms,
            cautionary_notes: step.cautionary_notes.clone(),
            best_practice_notes: step.best_practice_notes.clone(),
            associated_video_path: step.video_path.clone(),
            step_order: step.step_order,
            annotations,
            tools,
            materials,
            supplementary_files,
            validation_metric: step.validation.clone(),
            result_image_url,
            result_image_path,
        })
    }

    async fn process_items(
        &mut self,
        items: &[StepItem],
        category: Category,
    ) -> Result<Vec<ItemPayload>, StorageError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let image = self.upload_optional(item.image.as_ref(), category).await?;
            let (image_url, image_path) = split_ref(image);
            out.push(ItemPayload {
                name: item.name.clone(),
                specification: item.specification.clone(),
                image_url,
                image_path,
            });
        }
        Ok(out)
    }
}

fn split_ref(stored: Option<StoredObject>) -> (Option<String>, Option<String>) {
    match stored {
        Some(s) => (Some(s.url), Some(s.path)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{Annotation, Geometry, Rect};
    use crate::models::frame::Frame;
    use crate::models::project::BuyListItem;
    use crate::models::step::{SupplementaryFile, ValidationMetric};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records every upload; fails the n-th one when asked to.
    #[derive(Default)]
    struct FakeStorage {
        paths: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn upload(&self, upload: Upload, path: &str) -> Result<StoredObject, StorageError> {
            let mut paths = self.paths.lock().unwrap();
            if Some(paths.len()) == self.fail_on {
                return Err(StorageError::Status {
                    status: 403,
                    body: "quota exceeded".into(),
                });
            }
            paths.push(path.to_string());
            Ok(StoredObject {
                url: format!("https://cdn.test/{}", path),
                path: path.to_string(),
                name: upload.file_name,
                mime_type: upload.mime_type,
                size: upload.bytes.len() as u64,
            })
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        submitted: Mutex<Vec<FinalizePayload>>,
        reject: bool,
    }

    #[async_trait]
    impl StepsBackend for FakeBackend {
        async fn upload_steps(
            &self,
            _user: &UserSession,
            payload: &FinalizePayload,
        ) -> Result<serde_json::Value, ApiError> {
            if self.reject {
                return Err(ApiError::Api {
                    status: 500,
                    detail: "Failed to save project steps to backend.".into(),
                });
            }
            self.submitted.lock().unwrap().push(payload.clone());
            Ok(serde_json::json!({"status": "ok"}))
        }
    }

    fn user() -> UserSession {
        UserSession::new("uid-1", "maker@example.com", None)
    }

    fn annotation(ts: u64, label: &str) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            label: label.into(),
            frame_timestamp_ms: ts,
            geometry: Geometry::normalized(Rect::new(0.1, 0.2, 0.3, 0.4)),
        }
    }

    fn step(name: &str, order: usize, annotations: Vec<Annotation>) -> Step {
        Step {
            id: Uuid::new_v4(),
            name: name.into(),
            description: format!("{} description", name),
            start_ms: order as u64 * 1000,
            end_ms: order as u64 * 1000 + 900,
            cautionary_notes: String::new(),
            best_practice_notes: String::new(),
            video_index: 0,
            video_path: Some("users/uid-1/videos/v.mp4".into()),
            step_order: order,
            annotations,
            tools: Vec::new(),
            materials: Vec::new(),
            supplementary_files: Vec::new(),
            validation: None,
            result_image: None,
        }
    }

    fn frame(ts: u64) -> Frame {
        Frame {
            image: vec![0xFF, 0xD8, ts as u8],
            timestamp_ms: ts,
            video_index: 0,
            width: 2,
            height: 2,
        }
    }

    fn write_file(dir: &std::path::Path, name: &str, contents: &[u8]) -> LocalFile {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        LocalFile::new(path)
    }

    #[tokio::test]
    async fn test_no_steps_makes_no_calls() {
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();
        let project = Project::new("p1", "Empty");

        let result = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await;

        assert_matches!(result, Err(FinalizeError::NoSteps));
        assert!(storage.paths.lock().unwrap().is_empty());
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finalized_project_is_not_resubmitted() {
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();
        let mut project = Project::new("p1", "Done");
        project.steps.push(step("one", 0, Vec::new()));
        project.mark_finalized();

        let result = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await;
        assert_matches!(result, Err(FinalizeError::AlreadyFinalized));
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uploads_assets_and_substitutes_references() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();

        let mut project = Project::new("p1", "Shelf");
        let mut first = step("Cut", 0, vec![annotation(1200, "Saw"), annotation(1500, "Clamp")]);
        first.tools.push(StepItem::new("Saw", "Crosscut", Some(write_file(dir.path(), "saw.png", b"png"))));
        first.tools.push(StepItem::new("Pencil", "", None));
        first.materials.push(StepItem::new("Pine", "1x4", Some(write_file(dir.path(), "pine.jpg", b"jpg"))));
        first.supplementary_files.push(SupplementaryFile {
            id: Uuid::new_v4(),
            display_name: "Cut list".into(),
            file: write_file(dir.path(), "cuts.pdf", b"%PDF-1.4"),
        });
        first.result_image = Some(write_file(dir.path(), "done.png", b"done"));
        first.validation = Some(ValidationMetric {
            question: "Square?".into(),
            expected_answer: "Yes".into(),
        });
        // Second step annotates the same frame as the thumbnail.
        let second = step("Sand", 1, vec![annotation(1200, "Edge")]);
        project.steps = vec![first, second];
        project.buy_list.push(BuyListItem {
            id: Uuid::new_v4(),
            name: "Screws".into(),
            quantity: 8,
            specification: "#8".into(),
            purchase_link: "https://shop.test/screws".into(),
            image: Some(write_file(dir.path(), "screws.png", b"s")),
        });

        let mut frames = FrameCache::new();
        frames.insert(frame(1200));
        frames.insert(frame(1500));

        let receipt = Finalizer::new(&storage, &backend)
            .finalize(&project, &frames, &user())
            .await
            .unwrap();

        // thumbnail, frame 1500, saw, pine, cuts, result, screws
        assert_eq!(receipt.uploads, 7);
        let paths = storage.paths.lock().unwrap().clone();
        let categories: Vec<&str> = paths.iter().map(|p| p.split('/').nth(3).unwrap()).collect();
        assert_eq!(
            categories,
            [
                "thumbnails",
                "annotation_frames",
                "tools",
                "materials",
                "supplementary_files",
                "result_images",
                "buy_list_images"
            ]
        );
        assert!(paths.iter().all(|p| p.starts_with("users/uid-1/p1/")));

        let submitted = backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let payload = &submitted[0];
        assert_eq!(payload, &receipt.payload);
        assert_eq!(payload.project_id, "p1");
        assert_eq!(payload.user_id, "uid-1");
        assert_eq!(payload.thumbnail_path.as_deref(), Some(paths[0].as_str()));

        let cut = &payload.steps[0];
        assert_eq!(cut.annotations[0].frame_image_path.as_deref(), Some(paths[0].as_str()));
        assert_eq!(cut.annotations[1].frame_image_path.as_deref(), Some(paths[1].as_str()));
        assert_eq!(cut.annotations[0].annotation_type, "RECTANGLE");
        assert_eq!(cut.annotations[0].component_name, "Saw");
        assert_eq!(cut.tools[0].image_path.as_deref(), Some(paths[2].as_str()));
        assert_eq!(cut.tools[0].image_url, Some(format!("https://cdn.test/{}", paths[2])));
        assert_eq!(cut.tools[1].image_path, None);
        assert_eq!(cut.supplementary_files[0].display_name, "Cut list");
        assert_eq!(cut.supplementary_files[0].original_filename, "cuts.pdf");
        assert_eq!(cut.supplementary_files[0].mime_type, "application/pdf");
        assert_eq!(cut.supplementary_files[0].file_size_bytes, 8);
        assert_eq!(cut.result_image_path.as_deref(), Some(paths[5].as_str()));
        assert_eq!(cut.validation_metric.as_ref().unwrap().question, "Square?");

        // Re-annotated frame reuses the earlier upload.
        let sand = &payload.steps[1];
        assert_eq!(sand.annotations[0].frame_image_path.as_deref(), Some(paths[0].as_str()));
        assert_eq!(sand.step_order, 1);

        assert_eq!(payload.buy_list[0].quantity, 8);
        assert_eq!(payload.buy_list[0].image_path.as_deref(), Some(paths[6].as_str()));
    }

    #[tokio::test]
    async fn test_missing_frame_leaves_path_empty() {
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();
        let mut project = Project::new("p1", "No frames");
        project.steps.push(step("one", 0, vec![annotation(10, "a")]));

        let receipt = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await
            .unwrap();

        assert_eq!(receipt.uploads, 0);
        assert_eq!(receipt.payload.thumbnail_path, None);
        assert_eq!(receipt.payload.steps[0].annotations[0].frame_image_path, None);
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_before_submit() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FakeStorage {
            fail_on: Some(1),
            ..Default::default()
        };
        let backend = FakeBackend::default();

        let mut project = Project::new("p1", "Shelf");
        let mut s = step("Cut", 0, Vec::new());
        s.tools.push(StepItem::new("Saw", "", Some(write_file(dir.path(), "a.png", b"a"))));
        s.tools.push(StepItem::new("Drill", "", Some(write_file(dir.path(), "b.png", b"b"))));
        project.steps.push(s);
        let before = project.clone();

        let err = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await
            .unwrap_err();

        assert_matches!(err, FinalizeError::Upload(StorageError::Status { status: 403, .. }));
        assert!(err.to_string().contains("quota exceeded"));
        assert!(backend.submitted.lock().unwrap().is_empty());
        assert_eq!(project, before);
        assert!(!project.is_finalized());
    }

    #[tokio::test]
    async fn test_unreadable_local_file_aborts() {
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();
        let mut project = Project::new("p1", "Shelf");
        let mut s = step("Cut", 0, Vec::new());
        s.result_image = Some(LocalFile::new("/no/such/result.png"));
        project.steps.push(s);

        let err = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await
            .unwrap_err();
        assert_matches!(err, FinalizeError::Upload(StorageError::Read { .. }));
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_rejection_surfaces_detail() {
        let storage = FakeStorage::default();
        let backend = FakeBackend {
            reject: true,
            ..Default::default()
        };
        let mut project = Project::new("p1", "Shelf");
        project.steps.push(step("Cut", 0, Vec::new()));

        let err = Finalizer::new(&storage, &backend)
            .finalize(&project, &FrameCache::new(), &user())
            .await
            .unwrap_err();
        assert_matches!(err, FinalizeError::Submit(_));
        assert_eq!(
            err.to_string(),
            "Finalization failed: Failed to save project steps to backend."
        );
    }

    #[tokio::test]
    async fn test_progress_messages_are_reported() {
        let storage = FakeStorage::default();
        let backend = FakeBackend::default();
        let mut project = Project::new("p1", "Shelf");
        project.steps.push(step("Cut", 0, vec![annotation(5, "Edge")]));
        let mut frames = FrameCache::new();
        frames.insert(frame(5));

        let messages = Mutex::new(Vec::new());
        Finalizer::new(&storage, &backend)
            .with_progress(|m| messages.lock().unwrap().push(m.to_string()))
            .finalize(&project, &frames, &user())
            .await
            .unwrap();

        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.first().map(String::as_str), Some("Finalizing project... Preparing files..."));
        assert!(messages.iter().any(|m| m == "Uploading project thumbnail..."));
        assert_eq!(messages.last().map(String::as_str), Some("Saving project..."));
    }
}
