// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image-sequence video playback.
//!
//! Plays back a directory of extracted frames as a video source,
//! converting frames to RGBA so they can be displayed in egui and
//! captured for annotation.

use crate::authoring::capture::{RenderError, VideoSource};
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// File extensions accepted as frames of an image sequence.
pub const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// A video made of numbered still frames played back at a fixed rate.
///
/// Frames are ordered by file name, so `frame_0001.png`, `frame_0002.png`
/// and so on play in sequence.
pub struct FrameSequence {
    frames: Vec<PathBuf>,
    frame_rate: f64,
    position: f64,
    paused: bool,
    width: u32,
    height: u32,
}

impl FrameSequence {
    /// Open every frame file in `dir`.
    pub fn open(dir: &Path, frame_rate: f64) -> Result<Self> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        frames.sort();

        Self::from_frames(frames, frame_rate)
    }

    /// Build a sequence from an explicit, already ordered list of frames.
    pub fn from_frames(frames: Vec<PathBuf>, frame_rate: f64) -> Result<Self> {
        anyhow::ensure!(!frames.is_empty(), "No frames found");
        anyhow::ensure!(frame_rate > 0.0, "Frame rate must be positive");

        // Intrinsic size comes from the first frame; it stays unknown (0x0)
        // if the header cannot be read.
        let (width, height) = image::image_dimensions(&frames[0]).unwrap_or((0, 0));
        log::info!(
            "Opened image sequence: {} frames at {} fps ({}x{})",
            frames.len(),
            frame_rate,
            width,
            height
        );

        Ok(Self {
            frames,
            frame_rate,
            position: 0.0,
            paused: true,
            width,
            height,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame shown at the current position.
    pub fn current_index(&self) -> usize {
        let idx = (self.position * self.frame_rate).floor() as usize;
        idx.min(self.frames.len() - 1)
    }
}

impl VideoSource for FrameSequence {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.frame_rate
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_seeking(&self) -> bool {
        // Seeking is synchronous for still frames.
        false
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn play(&mut self) {
        self.paused = false;
    }

    /// Stops at the end.
    fn advance(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        self.position += dt;
        let duration = self.duration();
        if self.position >= duration {
            self.position = duration;
            self.paused = true;
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration());
    }

    fn render(&mut self) -> Result<RgbaImage, RenderError> {
        let path = &self.frames[self.current_index()];
        let img = image::open(path)
            .map_err(|e| RenderError(format!("{}: {}", path.display(), e)))?
            .to_rgba8();
        Ok(img)
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
