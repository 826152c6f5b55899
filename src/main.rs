#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use teamworks_gantt::config::{Cli, Settings};
use teamworks_gantt::EditController;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("teamworks_gantt=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    info!(backend = ?settings.backend, project = %settings.project_id, "starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let (store, directory) = {
        let _guard = runtime.enter();
        settings.open_stores()?
    };
    let controller = EditController::new(
        store,
        directory,
        settings.project_id.clone(),
        settings.current_user(),
        settings.default_scale,
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Teamworks Gantt"),
        ..Default::default()
    };

    eframe::run_native(
        "Teamworks Gantt",
        options,
        Box::new(move |cc| Ok(Box::new(app::GanttApp::new(cc, runtime, controller, &settings)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
