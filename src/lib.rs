// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stepwright: authoring tool for step-by-step how-to video projects.
//!
//! The authoring pipeline (capture, annotation, step assembly and
//! publishing) lives in [`authoring`] and runs without a window; [`app`]
//! and [`ui`] wrap it in an egui desktop application.

pub mod app;
pub mod authoring;
pub mod config;
pub mod io;
pub mod models;
pub mod remote;
pub mod ui;
pub mod util;
pub mod worker;
