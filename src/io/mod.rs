// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for media and project drafts.

pub mod media;
pub mod serialization;
#[cfg(feature = "video-opencv")]
pub mod video;
