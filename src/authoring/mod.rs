// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Authoring pipeline: capture, annotate, assemble steps and publish.

pub mod assembler;
pub mod capture;
pub mod creator;
pub mod finalizer;
pub mod store;
