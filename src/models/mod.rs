// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model for projects, steps, frames and annotations.

pub mod annotation;
pub mod frame;
pub mod project;
pub mod step;
pub mod user;
