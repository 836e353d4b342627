// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Direct video decoding through OpenCV.
//!
//! Only built with the `video-opencv` feature. Seeking uses the container's
//! millisecond position, which OpenCV resolves to the nearest decodable
//! frame.

use crate::authoring::capture::{RenderError, VideoSource};
use anyhow::{Context, Result};
use image::RgbaImage;
use opencv::{core::Mat, imgproc, prelude::*, videoio};
use std::path::Path;

pub struct OpenCvVideo {
    capture: videoio::VideoCapture,
    position: f64,
    duration: f64,
    paused: bool,
    width: u32,
    height: u32,
}

impl OpenCvVideo {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path.to_string_lossy();
        let capture = videoio::VideoCapture::from_file(&path_str, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {}", path.display()))?;
        anyhow::ensure!(
            capture.is_opened()?,
            "Video could not be opened: {}",
            path.display()
        );

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frames = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let duration = if fps > 0.0 { frames / fps } else { 0.0 };

        log::info!(
            "Opened video {} ({}x{}, {:.3}s)",
            path.display(),
            width,
            height,
            duration
        );

        Ok(Self {
            capture,
            position: 0.0,
            duration,
            paused: true,
            width,
            height,
        })
    }
}

impl VideoSource for OpenCvVideo {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_seeking(&self) -> bool {
        false
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn advance(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        self.position = (self.position + dt).min(self.duration);
        if self.position >= self.duration {
            self.paused = true;
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    fn render(&mut self) -> Result<RgbaImage, RenderError> {
        let err = |e: opencv::Error| RenderError(e.to_string());

        self.capture
            .set(videoio::CAP_PROP_POS_MSEC, self.position * 1000.0)
            .map_err(err)?;

        let mut bgr = Mat::default();
        if !self.capture.read(&mut bgr).map_err(err)? || bgr.empty() {
            return Err(RenderError(format!(
                "No frame decoded at {:.3}s",
                self.position
            )));
        }

        let mut rgba = Mat::default();
        imgproc::cvt_color_def(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA).map_err(err)?;

        let width = rgba.cols() as u32;
        let height = rgba.rows() as u32;
        let bytes = rgba.data_bytes().map_err(err)?.to_vec();
        RgbaImage::from_raw(width, height, bytes)
            .ok_or_else(|| RenderError("Decoded frame has unexpected size".to_string()))
    }
}
