// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Captured video frames.

/// Mime type of every encoded frame.
pub const FRAME_MIME_TYPE: &str = "image/jpeg";

/// An encoded still captured from one of the project's videos.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// JPEG-encoded image bytes.
    pub image: Vec<u8>,
    /// Millisecond offset into the source video.
    pub timestamp_ms: u64,
    /// Index of the source video in the project's video list.
    pub video_index: usize,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// File name used when the frame is uploaded.
    pub fn file_name(&self) -> String {
        format!("frame_{}.jpg", self.timestamp_ms)
    }
}
