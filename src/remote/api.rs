// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! REST client for the project backend.
//!
//! Wraps user sync, project creation, step upload and the per-user
//! tool/material repository using [`reqwest`].

use super::payload::{
    CreateProjectRequest, CreateProjectResponse, FinalizePayload, RepositoryItem, RepositoryKind,
    UserSyncRequest,
};
use crate::models::step::LocalFile;
use crate::models::user::UserSession;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("{detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` field of the error body, or the raw body.
        detail: String,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Backend endpoint that receives a finalized project.
#[async_trait]
pub trait StepsBackend: Send + Sync {
    async fn upload_steps(
        &self,
        user: &UserSession,
        payload: &FinalizePayload,
    ) -> Result<serde_json::Value, ApiError>;
}

/// Backend endpoint that creates projects.
#[async_trait]
pub trait ProjectsBackend: Send + Sync {
    /// Returns the new project's id.
    async fn create_project(&self, request: &CreateProjectRequest) -> Result<String, ApiError>;
}

/// New repository entry, sent as a multipart form.
#[derive(Debug, Clone, Default)]
pub struct NewRepositoryItem {
    pub name: String,
    pub specification: String,
    pub purchase_link: String,
    pub image: Option<LocalFile>,
}

/// HTTP client for the backend.
#[derive(Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    api_url: String,
}

impl BackendApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Register or refresh the author's backend record.
    ///
    /// A 400 means the user already exists and counts as success.
    pub async fn sync_user(&self, user: &UserSession) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/users/", self.api_url))
            .json(&UserSyncRequest::from(user))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            log::info!("User {} already registered", user.uid);
            return Ok(());
        }
        Self::check_status(response).await
    }

    /// List the author's saved tools or materials.
    pub async fn list_repository(
        &self,
        uid: &str,
        kind: RepositoryKind,
    ) -> Result<Vec<RepositoryItem>, ApiError> {
        let response = self
            .client
            .get(self.repository_url(uid, kind))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Save a tool or material to the author's repository.
    pub async fn add_repository_item(
        &self,
        uid: &str,
        kind: RepositoryKind,
        item: &NewRepositoryItem,
    ) -> Result<(), ApiError> {
        let mut form = Form::new()
            .text("name", item.name.clone())
            .text("specification", item.specification.clone())
            .text("purchase_link", item.purchase_link.clone());

        if let Some(image) = &item.image {
            let bytes = tokio::fs::read(image.path())
                .await
                .map_err(|source| ApiError::Read {
                    path: image.path.display().to_string(),
                    source,
                })?;
            let part = Part::bytes(bytes)
                .file_name(image.file_name())
                .mime_str(image.mime_type())?;
            form = form.part("image", part);
        }

        let response = self
            .client
            .post(self.repository_url(uid, kind))
            .multipart(form)
            .send()
            .await?;

        Self::check_status(response).await
    }

    pub async fn delete_repository_item(
        &self,
        uid: &str,
        kind: RepositoryKind,
        id: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/{}", self.repository_url(uid, kind), id))
            .send()
            .await?;

        Self::check_status(response).await
    }

    fn repository_url(&self, uid: &str, kind: RepositoryKind) -> String {
        format!("{}/users/{}/{}", self.api_url, uid, kind.as_str())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, turning an error
    /// body into [`ApiError::Api`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: error_detail(&body, status),
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl StepsBackend for BackendApi {
    async fn upload_steps(
        &self,
        user: &UserSession,
        payload: &FinalizePayload,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .client
            .post(format!("{}/upload_steps", self.api_url))
            .bearer_auth(&user.uid)
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl ProjectsBackend for BackendApi {
    async fn create_project(&self, request: &CreateProjectRequest) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{}/projects/", self.api_url))
            .bearer_auth(&request.firebase_uid)
            .json(request)
            .send()
            .await?;

        let created: CreateProjectResponse = Self::parse_response(response).await?;
        Ok(created.id_string())
    }
}

/// Message to show for an error body: its `detail` (or `message`) field
/// when the body is JSON, otherwise the body text, otherwise the status.
fn error_detail(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_detail_field() {
        let status = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(error_detail(r#"{"detail": "Project not found"}"#, status), "Project not found");
        assert_eq!(error_detail(r#"{"message": "Bad input"}"#, status), "Bad input");
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body"]}]}"#, status),
            r#"[{"loc":["body"]}]"#
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_body_then_reason() {
        assert_eq!(error_detail("upstream exploded", StatusCode::BAD_GATEWAY), "upstream exploded");
        assert_eq!(error_detail("", StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(error_detail(r#"{"other": 1}"#, StatusCode::NOT_FOUND), r#"{"other": 1}"#);
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let api = BackendApi::with_client(reqwest::Client::new(), "http://localhost:8000/");
        assert_eq!(api.api_url(), "http://localhost:8000");
        assert_eq!(
            api.repository_url("u1", RepositoryKind::Materials),
            "http://localhost:8000/users/u1/materials"
        );
    }

    #[test]
    fn test_api_error_displays_detail_verbatim() {
        let err = ApiError::Api {
            status: 500,
            detail: "Database unavailable".into(),
        };
        assert_eq!(err.to_string(), "Database unavailable");
    }
}
