// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stepwright desktop application.
//!
//! Scrub a project's videos, capture and annotate frames, assemble steps
//! and publish the finished project to the backend.

use anyhow::{Context, Result};
use stepwright::app::StepwrightApp;
use stepwright::config::AppConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    log::info!("Backend API at {}", config.api_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 900.0])
            .with_min_inner_size([960.0, 640.0])
            .with_title("Stepwright"),
        ..Default::default()
    };

    eframe::run_native(
        "Stepwright",
        options,
        Box::new(|cc| Ok(Box::new(StepwrightApp::new(config, &cc.egui_ctx)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
