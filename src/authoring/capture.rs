// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame capture and frame-by-frame navigation.
//!
//! A [`VideoSource`] is anything that can report a playback position and
//! render the frame at that position. Capturing pauses playback first so
//! the stored frame always matches its timestamp.

use crate::models::frame::Frame;
use crate::util::time::seconds_to_ms;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Nominal frame duration used for stepping (1/30 second).
pub const FRAME_DURATION: f64 = 1.0 / 30.0;

/// Failure while rendering the current frame of a source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// A playable video the author can scrub and capture from.
pub trait VideoSource {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Total length in seconds; zero when unknown.
    fn duration(&self) -> f64;

    /// Intrinsic frame size; `(0, 0)` until metadata is loaded.
    fn intrinsic_size(&self) -> (u32, u32);

    fn is_paused(&self) -> bool;

    fn is_seeking(&self) -> bool;

    fn pause(&mut self);

    fn play(&mut self);

    /// Move playback forward by `dt` seconds of wall time while playing.
    fn advance(&mut self, dt: f64);

    fn seek(&mut self, seconds: f64);

    /// Render the frame at the current position.
    fn render(&mut self) -> Result<RgbaImage, RenderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FrameCaptureError {
    #[error("Video is not ready (frame size {width}x{height}). Please wait a moment and try again.")]
    NotReady { width: u32, height: u32 },

    #[error("Video is still seeking. Please try again.")]
    Seeking,

    #[error("Could not capture frame: {0}")]
    Draw(#[from] RenderError),

    #[error("Could not encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Capture the frame at the source's current position.
///
/// Playback is paused before the position is read. On error nothing is
/// returned and the caller's frame state stays as it was.
pub fn capture_frame(
    source: &mut dyn VideoSource,
    video_index: usize,
) -> Result<Frame, FrameCaptureError> {
    let (width, height) = source.intrinsic_size();
    if width == 0 || height == 0 {
        return Err(FrameCaptureError::NotReady { width, height });
    }
    if source.is_seeking() {
        return Err(FrameCaptureError::Seeking);
    }

    if !source.is_paused() {
        source.pause();
    }
    let timestamp_ms = seconds_to_ms(source.current_time());

    let rgba = source.render()?;
    let image = encode_jpeg(rgba)?;

    log::info!(
        "Captured frame at {} ms from video {} ({} bytes)",
        timestamp_ms,
        video_index,
        image.len()
    );

    Ok(Frame {
        image,
        timestamp_ms,
        video_index,
        width,
        height,
    })
}

fn encode_jpeg(rgba: RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)?;
    Ok(buf.into_inner())
}

/// Direction for frame stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Move the position one nominal frame forward or backward.
///
/// Pauses playback and clamps to `[0, duration]`. Does nothing while the
/// duration is unknown. Returns the new position when a seek happened.
pub fn step_frame(source: &mut dyn VideoSource, direction: Direction) -> Option<f64> {
    let duration = source.duration();
    if duration.is_nan() || duration <= 0.0 {
        return None;
    }

    source.pause();
    let delta = match direction {
        Direction::Forward => FRAME_DURATION,
        Direction::Backward => -FRAME_DURATION,
    };
    let target = (source.current_time() + delta).clamp(0.0, duration);
    source.seek(target);
    Some(target)
}
