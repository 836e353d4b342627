// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object storage for project assets.
//!
//! Uploads go through the [`ObjectStorage`] trait. [`HttpObjectStorage`]
//! talks to a Firebase-style storage REST endpoint; [`LocalObjectStorage`]
//! writes into a directory for offline work and tests.

use crate::models::frame::{Frame, FRAME_MIME_TYPE};
use crate::models::step::LocalFile;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Folder under a project's storage prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Thumbnails,
    AnnotationFrames,
    Tools,
    Materials,
    SupplementaryFiles,
    ResultImages,
    BuyListImages,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumbnails => "thumbnails",
            Self::AnnotationFrames => "annotation_frames",
            Self::Tools => "tools",
            Self::Materials => "materials",
            Self::SupplementaryFiles => "supplementary_files",
            Self::ResultImages => "result_images",
            Self::BuyListImages => "buy_list_images",
        }
    }
}

/// `users/{uid}/{project_id}/{category}/{uuid}-{file_name}`
pub fn project_object_path(uid: &str, project_id: &str, category: Category, file_name: &str) -> String {
    format!(
        "users/{}/{}/{}/{}-{}",
        uid,
        project_id,
        category.as_str(),
        Uuid::new_v4(),
        file_name
    )
}

/// `users/{uid}/videos/{file_name}_{uuid}`
pub fn video_object_path(uid: &str, file_name: &str) -> String {
    format!("users/{}/videos/{}_{}", uid, file_name, Uuid::new_v4())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes to upload together with their original name and type.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Read a local file into memory.
    pub async fn from_local(file: &LocalFile) -> Result<Self, StorageError> {
        let bytes = tokio::fs::read(file.path())
            .await
            .map_err(|source| StorageError::Read {
                path: file.path.clone(),
                source,
            })?;
        Ok(Self {
            file_name: file.file_name(),
            mime_type: file.mime_type().to_string(),
            bytes,
        })
    }

    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            file_name: frame.file_name(),
            mime_type: FRAME_MIME_TYPE.to_string(),
            bytes: frame.image.clone(),
        }
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Download URL.
    pub url: String,
    /// Storage path the object was written to.
    pub path: String,
    /// Original file name.
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `upload` at `path` and return its remote reference.
    async fn upload(&self, upload: Upload, path: &str) -> Result<StoredObject, StorageError>;
}

/// Storage behind a Firebase-style REST API.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Metadata returned by the storage endpoint after an upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

impl HttpObjectStorage {
    /// * `base_url` - bucket endpoint, e.g.
    ///   `https://firebasestorage.googleapis.com/v0/b/my-bucket`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Public download URL for an object path.
    pub fn download_url(&self, path: &str, download_token: Option<&str>) -> Result<String, StorageError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("o")
            .push(path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("alt", "media");
            if let Some(token) = download_token {
                query.append_pair("token", token);
            }
        }
        Ok(url.to_string())
    }

    fn upload_url(&self, path: &str) -> Result<reqwest::Url, StorageError> {
        let mut url = reqwest::Url::parse(&format!("{}/o", self.base_url))
            .map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", path);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, upload: Upload, path: &str) -> Result<StoredObject, StorageError> {
        log::info!("Uploading {} to {}...", upload.file_name, path);
        let size = upload.bytes.len() as u64;

        let mut request = self
            .client
            .post(self.upload_url(path)?)
            .header(CONTENT_TYPE, upload.mime_type.as_str())
            .body(upload.bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let meta: UploadMetadata = response.json().await?;
        // Several tokens may be issued; any of them grants access.
        let token = meta
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next());
        let url = self.download_url(path, token)?;
        log::info!("{} uploaded. URL: {}", upload.file_name, url);

        Ok(StoredObject {
            url,
            path: path.to_string(),
            name: upload.file_name,
            mime_type: upload.mime_type,
            size,
        })
    }
}

/// Storage in a local directory; URLs are `file://` URLs.
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, upload: Upload, path: &str) -> Result<StoredObject, StorageError> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = upload.bytes.len() as u64;
        tokio::fs::write(&target, &upload.bytes).await?;
        log::info!("Stored {} at {}", upload.file_name, target.display());

        Ok(StoredObject {
            url: format!("file://{}", target.display()),
            path: path.to_string(),
            name: upload.file_name,
            mime_type: upload.mime_type,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_project_object_path_layout() {
        let path = project_object_path("uid-7", "42", Category::AnnotationFrames, "frame_12346.jpg");
        let parts: Vec<&str> = path.splitn(5, '/').collect();
        assert_eq!(&parts[..4], ["users", "uid-7", "42", "annotation_frames"]);

        let (id, name) = parts[4].split_at(36);
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(name, "-frame_12346.jpg");
    }

    #[test]
    fn test_object_paths_are_unique() {
        let a = project_object_path("u", "p", Category::Tools, "saw.png");
        let b = project_object_path("u", "p", Category::Tools, "saw.png");
        assert_ne!(a, b);
        assert!(video_object_path("u", "clip.mp4").starts_with("users/u/videos/clip.mp4_"));
    }

    #[test]
    fn test_download_url_encodes_path() {
        let storage = HttpObjectStorage::new(
            reqwest::Client::new(),
            "https://storage.example.com/v0/b/bucket/",
            None,
        );
        let url = storage
            .download_url("users/u/p/tools/x-saw.png", Some("tok"))
            .unwrap();
        assert_eq!(
            url,
            "https://storage.example.com/v0/b/bucket/o/users%2Fu%2Fp%2Ftools%2Fx-saw.png?alt=media&token=tok"
        );
    }

    #[test]
    fn test_upload_url_carries_name() {
        let storage = HttpObjectStorage::new(reqwest::Client::new(), "https://s.example.com/b/x", None);
        let url = storage.upload_url("users/u/a b.png").unwrap();
        assert_eq!(url.path(), "/b/x/o");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("name".to_string(), "users/u/a b.png".to_string())));
        assert!(pairs.contains(&("uploadType".to_string(), "media".to_string())));
    }

    #[tokio::test]
    async fn test_local_storage_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path());
        let upload = Upload {
            file_name: "note.txt".into(),
            mime_type: "text/plain".into(),
            bytes: b"hello".to_vec(),
        };

        let stored = storage.upload(upload, "users/u/p/supplementary_files/1-note.txt").await.unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(stored.name, "note.txt");
        assert!(stored.url.starts_with("file://"));
        let written = std::fs::read(dir.path().join("users/u/p/supplementary_files/1-note.txt")).unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_missing_local_file_reports_path() {
        let err = Upload::from_local(&LocalFile::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert_matches!(err, StorageError::Read { .. });
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
