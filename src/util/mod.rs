// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Small helpers shared across the crate.

pub mod geometry;
pub mod mime;
pub mod time;
