// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The UI thread owns every piece of mutable state. Network work is handed
//! to [`crate::worker`] and its results are applied when they arrive.

use crate::authoring::assembler::{add_buy_list_item, remove_buy_list_item, SaveOutcome, StepAssembler};
use crate::authoring::capture::{capture_frame, step_frame, VideoSource};
use crate::authoring::store::{FrameCache, History};
use crate::config::AppConfig;
use crate::io::{media, serialization};
use crate::models::annotation::{NewAnnotation, Point, Rect};
use crate::models::frame::Frame;
use crate::models::project::Project;
use crate::models::user::UserSession;
use crate::remote::api::NewRepositoryItem;
use crate::remote::payload::RepositoryKind;
use crate::ui::properties::{Forms, PanelContext, PropertiesAction, Repository};
use crate::ui::{canvas, new_project, properties, timeline, toolbar};
use crate::util::geometry::normalize_rect;
use crate::util::time::format_ms;
use crate::worker::{self, Job, Services, WorkerEvent};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use uuid::Uuid;

/// Main application state.
pub struct StepwrightApp {
    config: AppConfig,
    services: Option<Services>,
    user: Option<UserSession>,

    /// Project being authored
    project: Option<Project>,
    assembler: StepAssembler,
    history: History,
    frames: FrameCache,

    /// Local playback source for the selected project video
    video: Option<Box<dyn VideoSource>>,
    video_index: usize,
    video_texture: Option<egui::TextureHandle>,
    /// Position the video texture was rendered at
    rendered_at: Option<f64>,

    /// Captured frame on the canvas, with its texture
    captured: Option<(Frame, egui::TextureHandle)>,
    selected_annotation: Option<Uuid>,
    drag_start: Option<Point>,

    forms: Forms,
    repository: Repository,
    new_project: new_project::NewProjectDialog,

    /// Receiver for the running background job
    job: Option<Receiver<WorkerEvent>>,
    /// Project as handed to the running finalize job
    finalizing: Option<Project>,
    busy_message: Option<String>,
    status: Option<String>,
    error: Option<String>,
}

impl StepwrightApp {
    /// Create the application and start syncing the configured user.
    pub fn new(config: AppConfig, ctx: &egui::Context) -> Self {
        let (services, error) = match Services::from_config(&config) {
            Ok(services) => (Some(services), None),
            Err(e) => {
                log::error!("Failed to set up network client: {}", e);
                (None, Some(format!("Network client unavailable: {}", e)))
            }
        };

        let mut app = Self {
            user: config.user.clone(),
            config,
            services,
            project: None,
            assembler: StepAssembler::new(),
            history: History::new(),
            frames: FrameCache::new(),
            video: None,
            video_index: 0,
            video_texture: None,
            rendered_at: None,
            captured: None,
            selected_annotation: None,
            drag_start: None,
            forms: Forms::default(),
            repository: Repository::default(),
            new_project: Default::default(),
            job: None,
            finalizing: None,
            busy_message: None,
            status: None,
            error,
        };

        match app.user.clone() {
            Some(user) => app.start_job(Job::SyncUser(user), ctx),
            None => log::warn!("USER_UID is not set; uploads are disabled"),
        }
        app
    }

    // ---- background jobs ----

    fn start_job(&mut self, job: Job, ctx: &egui::Context) {
        if self.job.is_some() {
            self.status = Some("Please wait for the current operation to finish.".into());
            return;
        }
        let Some(services) = self.services.clone() else {
            self.error = Some("Network client unavailable.".into());
            return;
        };

        self.busy_message = Some(job.describe().to_string());
        let ctx = ctx.clone();
        self.job = Some(worker::spawn(services, job, move || ctx.request_repaint()));
    }

    fn poll_job(&mut self, ctx: &egui::Context) {
        while let Some(receiver) = &self.job {
            let event = match receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.job = None;
                    self.finalizing = None;
                    self.busy_message = None;
                    self.error = Some("Background operation stopped unexpectedly.".into());
                    return;
                }
            };

            if let WorkerEvent::Progress(message) = event {
                self.busy_message = Some(message);
                continue;
            }
            self.job = None;
            self.busy_message = None;
            self.handle_event(event, ctx);
        }
    }

    fn handle_event(&mut self, event: WorkerEvent, ctx: &egui::Context) {
        match event {
            WorkerEvent::Progress(_) => {}
            WorkerEvent::UserSynced(Ok(())) => log::info!("User synced with backend"),
            WorkerEvent::UserSynced(Err(e)) => {
                log::error!("User sync failed: {}", e);
                self.error = Some(format!("User sync failed: {}", e));
            }
            WorkerEvent::ProjectCreated(Ok(project)) => {
                self.status = Some(format!("Project \"{}\" created.", project.name));
                self.new_project.reset();
                self.set_project(project);
            }
            WorkerEvent::ProjectCreated(Err(e)) => {
                log::error!("Project creation failed: {}", e);
                self.error = Some(e);
            }
            WorkerEvent::Finalized(Ok(receipt)) => {
                let submitted = self.finalizing.take();
                match self.project.as_mut() {
                    Some(project)
                        if project.id == receipt.payload.project_id
                            && submitted.as_ref() == Some(&*project) =>
                    {
                        project.mark_finalized();
                        self.status = Some(format!(
                            "Project finalized and saved successfully! ({} files uploaded)",
                            receipt.uploads
                        ));
                    }
                    _ => {
                        log::warn!(
                            "Project {} changed while it was being finalized; keeping it as a draft",
                            receipt.payload.project_id
                        );
                        self.error = Some(
                            "The project changed during finalization. The submitted version was saved; the open project stays a draft.".into(),
                        );
                    }
                }
            }
            WorkerEvent::Finalized(Err(e)) => {
                self.finalizing = None;
                log::error!("{}", e);
                self.error = Some(e);
            }
            WorkerEvent::Repository { kind, result } => match result {
                Ok(items) => {
                    log::info!("Loaded {} saved {}", items.len(), kind.as_str());
                    self.repository.set(kind, items);
                }
                Err(e) => self.error = Some(format!("Could not load {}: {}", kind.as_str(), e)),
            },
            WorkerEvent::RepositoryChanged { kind, result } => match result {
                Ok(()) => {
                    if let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) {
                        self.start_job(Job::ListRepository { uid, kind }, ctx);
                    }
                }
                Err(e) => self.error = Some(format!("Could not update {}: {}", kind.as_str(), e)),
            },
        }
    }

    // ---- project lifecycle ----

    /// Whether project content may change; not while a background job runs.
    fn ensure_idle(&mut self) -> bool {
        if self.job.is_some() {
            self.status = Some("Please wait for the current operation to finish.".into());
            return false;
        }
        true
    }

    fn set_project(&mut self, project: Project) {
        self.project = Some(project);
        self.assembler.clear();
        self.history.clear();
        self.frames = FrameCache::new();
        self.captured = None;
        self.selected_annotation = None;
        self.video_index = 0;
    }

    fn save_draft(&mut self, path: PathBuf) {
        let Some(project) = &self.project else { return };
        match serialization::save_draft(project, &path) {
            Ok(()) => {
                log::info!("Saved draft to {}", path.display());
                self.status = Some(format!("Draft saved to {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to save draft: {}", e);
                self.error = Some(format!("Failed to save draft: {}", e));
            }
        }
    }

    fn load_draft(&mut self, path: PathBuf) {
        if !self.ensure_idle() {
            return;
        }
        match serialization::load_draft(&path) {
            Ok(project) => {
                log::info!(
                    "Loaded draft {} with {} steps from {}",
                    project.id,
                    project.steps.len(),
                    path.display()
                );
                let has_annotations = project.steps.iter().any(|s| !s.annotations.is_empty());
                self.set_project(project);
                self.status = Some(if has_annotations {
                    "Draft loaded. Captured frames are not stored in drafts; re-capture them to upload annotation images.".into()
                } else {
                    "Draft loaded.".into()
                });
            }
            Err(e) => {
                log::error!("Failed to load draft: {:#}", e);
                self.error = Some(format!("Failed to load draft: {:#}", e));
            }
        }
    }

    fn finalize(&mut self, ctx: &egui::Context) {
        if !self.ensure_idle() {
            return;
        }
        let (Some(project), Some(user)) = (&self.project, &self.user) else {
            self.error = Some("User not authenticated for file upload.".into());
            return;
        };
        let snapshot = project.clone();
        let job = Job::Finalize {
            user: user.clone(),
            project: snapshot.clone(),
            frames: self.frames.clone(),
        };
        self.start_job(job, ctx);
        if self.job.is_some() {
            self.finalizing = Some(snapshot);
        }
    }

    // ---- video ----

    fn open_frame_directory(&mut self, dir: PathBuf) {
        match media::FrameSequence::open(&dir, self.config.frame_rate) {
            Ok(sequence) => self.set_video(Box::new(sequence)),
            Err(e) => {
                log::error!("Failed to open frames: {}", e);
                self.error = Some(format!("Failed to open video frames: {:#}", e));
            }
        }
    }

    #[cfg(feature = "video-opencv")]
    fn open_video_file(&mut self, path: PathBuf) {
        match crate::io::video::OpenCvVideo::open(&path) {
            Ok(video) => self.set_video(Box::new(video)),
            Err(e) => {
                log::error!("Failed to open video: {}", e);
                self.error = Some(format!("Failed to open video: {:#}", e));
            }
        }
    }

    fn set_video(&mut self, video: Box<dyn VideoSource>) {
        self.video = Some(video);
        self.video_texture = None;
        self.rendered_at = None;
        self.captured = None;
        self.selected_annotation = None;
    }

    fn current_time(&self) -> Option<f64> {
        self.video.as_ref().map(|v| v.current_time())
    }

    /// Re-render the live frame when the position changed.
    fn refresh_video_texture(&mut self, ctx: &egui::Context) {
        if self.captured.is_some() {
            return;
        }
        let Some(video) = self.video.as_mut() else { return };
        let position = video.current_time();
        if self.rendered_at == Some(position) {
            return;
        }
        self.rendered_at = Some(position);

        match video.render() {
            Ok(rgba) => {
                let size = [rgba.width() as usize, rgba.height() as usize];
                let image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                match &mut self.video_texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.video_texture =
                            Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
                    }
                }
            }
            Err(e) => log::warn!("Failed to render frame at {:.3}s: {}", position, e),
        }
    }

    fn capture(&mut self, ctx: &egui::Context) {
        let Some(video) = self.video.as_mut() else { return };
        match capture_frame(video.as_mut(), self.video_index) {
            Ok(frame) => match decode_frame(&frame) {
                Ok(image) => {
                    let texture = ctx.load_texture("captured_frame", image, egui::TextureOptions::LINEAR);
                    self.status = Some(format!("Frame captured at {}", format_ms(frame.timestamp_ms)));
                    self.frames.insert(frame.clone());
                    self.captured = Some((frame, texture));
                    self.selected_annotation = None;
                    self.drag_start = None;
                }
                Err(e) => self.error = Some(format!("Could not display captured frame: {}", e)),
            },
            Err(e) => {
                log::warn!("Capture failed: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn back_to_video(&mut self) {
        self.captured = None;
        self.selected_annotation = None;
        self.drag_start = None;
        self.rendered_at = None;
        self.prune_frames();
    }

    // ---- annotations ----

    fn add_annotation(&mut self, rect: Rect) {
        let Some((frame, _)) = &self.captured else { return };
        let geometry = normalize_rect(rect, frame.width, frame.height);
        let new = NewAnnotation {
            label: None,
            frame_timestamp_ms: frame.timestamp_ms,
            geometry,
        };
        self.history.push(self.assembler.annotations.to_vec());
        let id = self.assembler.annotations.add(new);
        self.selected_annotation = Some(id);
    }

    fn remove_annotation(&mut self, id: Uuid) {
        if self.assembler.annotations.get(id).is_none() {
            return;
        }
        self.history.push(self.assembler.annotations.to_vec());
        self.assembler.annotations.remove(id);
        if self.selected_annotation == Some(id) {
            self.selected_annotation = None;
        }
    }

    fn undo(&mut self) {
        let current = self.assembler.annotations.to_vec();
        if let Some(previous) = self.history.undo(current) {
            self.assembler.annotations.replace_all(previous);
            self.selected_annotation = None;
            log::info!("Undo");
        }
    }

    fn redo(&mut self) {
        let current = self.assembler.annotations.to_vec();
        if let Some(next) = self.history.redo(current) {
            self.assembler.annotations.replace_all(next);
            self.selected_annotation = None;
            log::info!("Redo");
        }
    }

    /// Drop cached frames nothing refers to any more.
    fn prune_frames(&mut self) {
        let mut keep: std::collections::HashSet<u64> = self
            .assembler
            .annotations
            .iter()
            .map(|a| a.frame_timestamp_ms)
            .collect();
        if let Some(project) = &self.project {
            keep.extend(
                project
                    .steps
                    .iter()
                    .flat_map(|s| s.annotations.iter().map(|a| a.frame_timestamp_ms)),
            );
        }
        if let Some((frame, _)) = &self.captured {
            keep.insert(frame.timestamp_ms);
        }
        self.frames.retain(|ts| keep.contains(&ts));
    }

    // ---- steps ----

    fn save_step(&mut self) {
        if !self.ensure_idle() {
            return;
        }
        let Some(project) = self.project.as_mut() else { return };
        match self.assembler.save(project, self.video_index) {
            Ok(SaveOutcome::Created { index, .. }) => {
                self.status = Some(format!("Step {} added.", index + 1));
            }
            Ok(SaveOutcome::Updated { index, .. }) => {
                self.status = Some(format!("Step {} updated.", index + 1));
            }
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        }
        self.history.clear();
        self.selected_annotation = None;
        self.prune_frames();
    }

    fn edit_step(&mut self, index: usize) {
        if !self.ensure_idle() {
            return;
        }
        let Some(step) = self.project.as_ref().and_then(|p| p.steps.get(index)) else { return };
        let start = step.start_ms;
        self.video_index = step.video_index;
        self.assembler.load_for_editing(step, index);
        self.history.clear();
        self.selected_annotation = None;
        self.seek(crate::util::time::ms_to_seconds(start));
    }

    fn delete_step(&mut self, index: usize) {
        if !self.ensure_idle() {
            return;
        }
        let Some(project) = self.project.as_mut() else { return };
        if let Some(step) = self.assembler.delete_step(project, index) {
            self.status = Some(format!("Step \"{}\" deleted.", step.name));
            self.prune_frames();
        }
    }

    fn seek(&mut self, seconds: f64) {
        if let Some(video) = self.video.as_mut() {
            video.pause();
            video.seek(seconds);
            self.captured = None;
        }
    }

    fn apply_toolbar(&mut self, action: toolbar::ToolbarAction, ctx: &egui::Context) {
        use toolbar::ToolbarAction;

        match action {
            ToolbarAction::None => {}
            ToolbarAction::TogglePlay => self.toggle_play(),
            ToolbarAction::Step(direction) => {
                if let Some(video) = self.video.as_mut() {
                    step_frame(video.as_mut(), direction);
                    self.captured = None;
                }
            }
            ToolbarAction::Capture => self.capture(ctx),
            ToolbarAction::BackToVideo => self.back_to_video(),
            ToolbarAction::MarkStart => {
                if let Some(t) = self.current_time() {
                    self.assembler.mark_start(t);
                }
            }
            ToolbarAction::MarkEnd => {
                if let Some(t) = self.current_time() {
                    if let Err(e) = self.assembler.mark_end(t) {
                        self.status = Some(e.to_string());
                    }
                }
            }
            ToolbarAction::SelectVideo(index) => {
                self.video_index = index;
                self.assembler.select_video(index);
                log::info!("Authoring against project video {}", index);
            }
        }
    }

    fn toggle_play(&mut self) {
        if let Some(video) = self.video.as_mut() {
            if video.is_paused() {
                self.captured = None;
                video.play();
            } else {
                video.pause();
            }
        }
    }

    fn apply_properties(&mut self, action: PropertiesAction, ctx: &egui::Context) {
        match action {
            PropertiesAction::None => {}
            PropertiesAction::SaveStep => self.save_step(),
            PropertiesAction::ClearForm => {
                self.assembler.clear();
                self.history.clear();
                self.selected_annotation = None;
            }
            PropertiesAction::SelectAnnotation(id) => self.selected_annotation = Some(id),
            PropertiesAction::RemoveAnnotation(id) => self.remove_annotation(id),
            PropertiesAction::AddItem(kind) => {
                let form = self.forms.item_mut(kind);
                let added = match kind {
                    RepositoryKind::Tools => {
                        self.assembler
                            .add_tool(&form.name, &form.specification, form.image.clone())
                    }
                    RepositoryKind::Materials => {
                        self.assembler
                            .add_material(&form.name, &form.specification, form.image.clone())
                    }
                };
                match added {
                    Ok(_) => form.clear(),
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            PropertiesAction::RemoveItem(kind, id) => match kind {
                RepositoryKind::Tools => self.assembler.remove_tool(id),
                RepositoryKind::Materials => self.assembler.remove_material(id),
            },
            PropertiesAction::SaveToRepository(kind, id) => {
                let staged = match kind {
                    RepositoryKind::Tools => &self.assembler.tools,
                    RepositoryKind::Materials => &self.assembler.materials,
                };
                let (Some(item), Some(user)) = (staged.iter().find(|i| i.id == id), &self.user) else {
                    return;
                };
                let job = Job::AddRepositoryItem {
                    uid: user.uid.clone(),
                    kind,
                    item: NewRepositoryItem {
                        name: item.name.clone(),
                        specification: item.specification.clone(),
                        purchase_link: String::new(),
                        image: item.image.clone(),
                    },
                };
                self.start_job(job, ctx);
            }
            PropertiesAction::UseRepositoryItem(kind, index) => {
                let Some(saved) = self.repository.items(kind).get(index).cloned() else { return };
                let spec = saved.specification.unwrap_or_default();
                let added = match kind {
                    RepositoryKind::Tools => self.assembler.add_tool(&saved.name, &spec, None),
                    RepositoryKind::Materials => self.assembler.add_material(&saved.name, &spec, None),
                };
                if let Err(e) = added {
                    self.status = Some(e.to_string());
                }
            }
            PropertiesAction::DeleteRepositoryItem(kind, id) => {
                if let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) {
                    self.start_job(Job::DeleteRepositoryItem { uid, kind, id }, ctx);
                }
            }
            PropertiesAction::RefreshRepository(kind) => {
                if let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) {
                    self.start_job(Job::ListRepository { uid, kind }, ctx);
                }
            }
            PropertiesAction::AddSupplementaryFile(file) => {
                self.assembler
                    .add_supplementary_file(file, &self.forms.file_display_name);
                self.forms.file_display_name.clear();
            }
            PropertiesAction::RemoveSupplementaryFile(id) => self.assembler.remove_supplementary_file(id),
            PropertiesAction::SetResultImage(image) => self.assembler.set_result_image(image),
            PropertiesAction::AddBuyListItem => {
                if !self.ensure_idle() {
                    return;
                }
                let Some(project) = self.project.as_mut() else { return };
                match add_buy_list_item(project, self.forms.buy.clone()) {
                    Ok(_) => self.forms.buy = Default::default(),
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            PropertiesAction::RemoveBuyListItem(id) => {
                if !self.ensure_idle() {
                    return;
                }
                if let Some(project) = self.project.as_mut() {
                    remove_buy_list_item(project, id);
                }
            }
            PropertiesAction::Finalize => self.finalize(ctx),
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.drag_start = None;
            self.selected_annotation = None;
        }

        // Shortcuts only while no text field has focus
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            if let Some(id) = self.selected_annotation {
                self.remove_annotation(id);
            }
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.undo();
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.redo();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.toggle_play();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
            self.apply_toolbar(
                toolbar::ToolbarAction::Step(crate::authoring::capture::Direction::Backward),
                ctx,
            );
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
            self.apply_toolbar(
                toolbar::ToolbarAction::Step(crate::authoring::capture::Direction::Forward),
                ctx,
            );
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New Project...").clicked() {
                    self.new_project.open = true;
                    ui.close_menu();
                }
                if ui.button("Open Video Frames...").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.open_frame_directory(dir);
                    }
                    ui.close_menu();
                }
                #[cfg(feature = "video-opencv")]
                if ui.button("Open Video File...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Videos", &["mp4", "mov", "webm", "mkv", "avi"])
                        .pick_file()
                    {
                        self.open_video_file(path);
                    }
                    ui.close_menu();
                }
                ui.separator();
                if ui
                    .add_enabled(self.project.is_some(), egui::Button::new("Save Draft..."))
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Draft", &["yaml", "yml", "json"])
                        .set_file_name("project.yaml")
                        .save_file()
                    {
                        self.save_draft(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Load Draft...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Draft", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.load_draft(path);
                    }
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui
                    .add_enabled(self.history.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                    .clicked()
                {
                    self.undo();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(self.history.can_redo(), egui::Button::new("Redo (Ctrl+Shift+Z)"))
                    .clicked()
                {
                    self.redo();
                    ui.close_menu();
                }
                ui.separator();
                if ui
                    .add_enabled(
                        self.selected_annotation.is_some(),
                        egui::Button::new("Delete Selected Annotation"),
                    )
                    .clicked()
                {
                    if let Some(id) = self.selected_annotation {
                        self.remove_annotation(id);
                    }
                    ui.close_menu();
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match &self.user {
                    Some(user) => ui.label(format!("👤 {}", user.username)),
                    None => ui.label(egui::RichText::new("Not signed in").weak()),
                };
            });
        });
    }
}

/// Decode a captured JPEG for display.
fn decode_frame(frame: &Frame) -> Result<egui::ColorImage, image::ImageError> {
    let rgba = image::load_from_memory(&frame.image)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

impl eframe::App for StepwrightApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_job(ctx);

        // Advance playback
        let dt = ctx.input(|i| i.stable_dt) as f64;
        if let Some(video) = self.video.as_mut() {
            if !video.is_paused() {
                video.advance(dt);
                ctx.request_repaint();
            }
        }
        self.refresh_video_texture(ctx);

        if self.busy_message.is_some() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.menu_bar(ctx, ui));

        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                let state = toolbar::ToolbarState {
                    has_video: self.video.is_some(),
                    playing: self.video.as_ref().map(|v| !v.is_paused()).unwrap_or(false),
                    position: self.current_time(),
                    duration: self.video.as_ref().map(|v| v.duration()),
                    frame_captured: self.captured.is_some(),
                    start_time: self.assembler.start_time,
                    end_time: self.assembler.end_time,
                    videos: self
                        .project
                        .as_ref()
                        .map(|p| p.videos.iter().map(|v| v.name.as_str()).collect())
                        .unwrap_or_default(),
                    video_index: self.video_index,
                };
                toolbar::show(ui, &state)
            })
            .inner;
        self.apply_toolbar(toolbar_action, ctx);

        // Status line
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(message) = &self.busy_message {
                    ui.spinner();
                    ui.label(message);
                } else if let Some(status) = &self.status {
                    ui.label(status);
                }
                if let Some(error) = self.error.clone() {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, error);
                    if ui.small_button("Dismiss").clicked() {
                        self.error = None;
                    }
                }
            });
        });

        let timeline_action = egui::TopBottomPanel::bottom("timeline")
            .resizable(true)
            .show(ctx, |ui| {
                let (steps, locked) = match &self.project {
                    Some(p) => (p.steps.as_slice(), p.is_finalized() || self.job.is_some()),
                    None => (&[][..], true),
                };
                timeline::show(
                    ui,
                    self.current_time(),
                    self.video.as_ref().map(|v| v.duration()),
                    steps,
                    self.assembler.editing_index(),
                    locked,
                )
            })
            .inner;
        match timeline_action {
            timeline::TimelineAction::None => {}
            timeline::TimelineAction::Seek(t) => self.seek(t),
            timeline::TimelineAction::EditStep(i) => self.edit_step(i),
            timeline::TimelineAction::DeleteStep(i) => self.delete_step(i),
        }

        let properties_action = egui::SidePanel::right("properties")
            .default_width(320.0)
            .show(ctx, |ui| {
                let panel = PanelContext {
                    project: self.project.as_ref(),
                    frame_timestamp: self.captured.as_ref().map(|(f, _)| f.timestamp_ms),
                    selected_annotation: self.selected_annotation,
                    repository: &self.repository,
                    busy: self.job.is_some(),
                    signed_in: self.user.is_some(),
                };
                properties::show(ui, &mut self.assembler, &mut self.forms, &panel)
            })
            .inner;
        self.apply_properties(properties_action, ctx);

        if let Some(new) = new_project::show(ctx, &mut self.new_project, self.job.is_some()) {
            match self.user.clone() {
                Some(user) => self.start_job(Job::CreateProject { user, project: new }, ctx),
                None => self.error = Some("User not authenticated for file upload.".into()),
            }
        }

        self.handle_keyboard(ctx);

        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let drawing_enabled = self
                    .project
                    .as_ref()
                    .map(|p| !p.is_finalized())
                    .unwrap_or(false);
                let view = match &self.captured {
                    Some((frame, texture)) => canvas::CanvasView {
                        texture: Some(texture),
                        source_size: (frame.width, frame.height),
                        annotations: self.assembler.annotations.for_frame(frame.timestamp_ms).collect(),
                        selected: self.selected_annotation,
                        drawing_enabled,
                        caption: format!("Captured frame at {}", format_ms(frame.timestamp_ms)),
                    },
                    None => canvas::CanvasView {
                        texture: self.video_texture.as_ref(),
                        source_size: self.video.as_ref().map(|v| v.intrinsic_size()).unwrap_or((0, 0)),
                        annotations: Vec::new(),
                        selected: None,
                        drawing_enabled: false,
                        caption: if self.video.is_some() {
                            "Capture a frame to annotate it".to_string()
                        } else {
                            "No video loaded".to_string()
                        },
                    },
                };
                canvas::show(ui, view, &mut self.drag_start)
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::None => {}
            canvas::CanvasAction::DrawRect(rect) => self.add_annotation(rect),
            canvas::CanvasAction::SelectAnnotation(id) => self.selected_annotation = Some(id),
            canvas::CanvasAction::Deselect => self.selected_annotation = None,
        }
    }
}
