// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Backend API and object storage collaborators.

pub mod api;
pub mod payload;
pub mod storage;
