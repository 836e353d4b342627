// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background network jobs.
//!
//! Each job runs on its own thread driving a current-thread tokio runtime
//! and reports back over a channel that the UI polls once per frame.

use crate::authoring::creator::{create_project, NewProject};
use crate::authoring::finalizer::{FinalizeReceipt, Finalizer};
use crate::authoring::store::FrameCache;
use crate::config::{AppConfig, StorageConfig};
use crate::models::project::Project;
use crate::models::user::UserSession;
use crate::remote::api::{ApiError, BackendApi, NewRepositoryItem};
use crate::remote::payload::{RepositoryItem, RepositoryKind};
use crate::remote::storage::{HttpObjectStorage, LocalObjectStorage, ObjectStorage};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

/// Network collaborators shared by all jobs.
#[derive(Clone)]
pub struct Services {
    pub api: BackendApi,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let storage: Arc<dyn ObjectStorage> = match &config.storage {
            StorageConfig::Http { url, token } => {
                log::info!("Using HTTP object storage at {}", url);
                Arc::new(HttpObjectStorage::new(client.clone(), url.clone(), token.clone()))
            }
            StorageConfig::Local { root } => {
                log::info!("Using local object storage in {}", root.display());
                Arc::new(LocalObjectStorage::new(root.clone()))
            }
        };

        Ok(Self {
            api: BackendApi::with_client(client, config.api_url.clone()),
            storage,
        })
    }
}

/// Work the UI can hand off.
pub enum Job {
    SyncUser(UserSession),
    CreateProject {
        user: UserSession,
        project: NewProject,
    },
    Finalize {
        user: UserSession,
        project: Project,
        frames: FrameCache,
    },
    ListRepository {
        uid: String,
        kind: RepositoryKind,
    },
    AddRepositoryItem {
        uid: String,
        kind: RepositoryKind,
        item: NewRepositoryItem,
    },
    DeleteRepositoryItem {
        uid: String,
        kind: RepositoryKind,
        id: String,
    },
}

impl Job {
    /// Status line shown while the job runs.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::SyncUser(_) => "Syncing user...",
            Self::CreateProject { .. } => "Creating project...",
            Self::Finalize { .. } => "Finalizing project...",
            Self::ListRepository { .. } => "Loading repository...",
            Self::AddRepositoryItem { .. } => "Saving to repository...",
            Self::DeleteRepositoryItem { .. } => "Removing from repository...",
        }
    }
}

/// Messages sent back to the UI. Every job ends with exactly one
/// non-progress event.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(String),
    UserSynced(Result<(), String>),
    ProjectCreated(Result<Project, String>),
    Finalized(Result<FinalizeReceipt, String>),
    Repository {
        kind: RepositoryKind,
        result: Result<Vec<RepositoryItem>, String>,
    },
    RepositoryChanged {
        kind: RepositoryKind,
        result: Result<(), String>,
    },
}

impl WorkerEvent {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Start `job` on a background thread.
///
/// `wake` is called after every event so an idle UI repaints.
pub fn spawn(
    services: Services,
    job: Job,
    wake: impl Fn() + Send + Sync + 'static,
) -> Receiver<WorkerEvent> {
    let (sender, receiver) = channel();

    std::thread::spawn(move || {
        let wake = Arc::new(wake);
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to start background runtime: {}", e);
                let _ = sender.send(failure(&job, e.to_string()));
                (*wake)();
                return;
            }
        };

        let progress = {
            let sender = sender.clone();
            let wake = Arc::clone(&wake);
            move |message: &str| {
                let _ = sender.send(WorkerEvent::Progress(message.to_string()));
                (*wake)();
            }
        };

        let event = runtime.block_on(run(&services, job, progress));
        let _ = sender.send(event);
        (*wake)();
    });

    receiver
}

/// Execute a job to completion.
pub async fn run(
    services: &Services,
    job: Job,
    progress: impl Fn(&str) + Send + Sync,
) -> WorkerEvent {
    match job {
        Job::SyncUser(user) => {
            let result = services.api.sync_user(&user).await;
            WorkerEvent::UserSynced(result.map_err(|e| e.to_string()))
        }
        Job::CreateProject { user, project } => {
            let result = create_project(services.storage.as_ref(), &services.api, &user, project).await;
            WorkerEvent::ProjectCreated(result.map_err(|e| e.to_string()))
        }
        Job::Finalize {
            user,
            project,
            frames,
        } => {
            let result = Finalizer::new(services.storage.as_ref(), &services.api)
                .with_progress(progress)
                .finalize(&project, &frames, &user)
                .await;
            WorkerEvent::Finalized(result.map_err(|e| e.to_string()))
        }
        Job::ListRepository { uid, kind } => {
            let result = services.api.list_repository(&uid, kind).await;
            WorkerEvent::Repository {
                kind,
                result: result.map_err(|e| e.to_string()),
            }
        }
        Job::AddRepositoryItem { uid, kind, item } => {
            let result = services.api.add_repository_item(&uid, kind, &item).await;
            WorkerEvent::RepositoryChanged {
                kind,
                result: result.map_err(|e| e.to_string()),
            }
        }
        Job::DeleteRepositoryItem { uid, kind, id } => {
            let result = services.api.delete_repository_item(&uid, kind, &id).await;
            WorkerEvent::RepositoryChanged {
                kind,
                result: result.map_err(|e| e.to_string()),
            }
        }
    }
}

fn failure(job: &Job, message: String) -> WorkerEvent {
    match job {
        Job::SyncUser(_) => WorkerEvent::UserSynced(Err(message)),
        Job::CreateProject { .. } => WorkerEvent::ProjectCreated(Err(message)),
        Job::Finalize { .. } => WorkerEvent::Finalized(Err(message)),
        Job::ListRepository { kind, .. } => WorkerEvent::Repository {
            kind: *kind,
            result: Err(message),
        },
        Job::AddRepositoryItem { kind, .. } | Job::DeleteRepositoryItem { kind, .. } => {
            WorkerEvent::RepositoryChanged {
                kind: *kind,
                result: Err(message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring::finalizer::FinalizeError;
    use assert_matches::assert_matches;

    fn services(dir: &std::path::Path) -> Services {
        let config = AppConfig {
            storage: StorageConfig::Local {
                root: dir.to_path_buf(),
            },
            ..Default::default()
        };
        Services::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_finalize_without_steps_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::Finalize {
            user: UserSession::new("u", "u@example.com", None),
            project: Project::new("p", "Empty"),
            frames: FrameCache::new(),
        };

        let event = run(&services(dir.path()), job, |_| {}).await;
        assert_matches!(
            event,
            WorkerEvent::Finalized(Err(ref msg)) if *msg == FinalizeError::NoSteps.to_string()
        );
        assert!(event.is_final());
    }

    #[test]
    fn test_spawned_job_sends_final_event() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::CreateProject {
            user: UserSession::new("u", "u@example.com", None),
            project: NewProject::default(),
        };
        assert_eq!(job.describe(), "Creating project...");

        let receiver = spawn(services(dir.path()), job, || {});
        let event = receiver.recv().unwrap();
        assert_matches!(event, WorkerEvent::ProjectCreated(Err(ref msg)) if msg == "Project name is required.");
    }

    #[test]
    fn test_progress_is_not_final() {
        assert!(!WorkerEvent::Progress("Uploading...".into()).is_final());
        assert!(WorkerEvent::UserSynced(Ok(())).is_final());
    }
}
