// src/main.rs
use anyhow::Result;
use eframe::egui;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod analysis;
mod app;
mod auth;
mod config;
mod file;
mod state;
mod ui;

use app::AnalyzerApp;
use auth::{AuthProvider, DeviceCodeAuth, MockAuth};
use config::AppConfig;
use state::AppState;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    tracing::info!(mock_auth = config.use_mock_auth, "starting document analyzer");

    // Mock-vs-real is decided exactly once, right here; everything else
    // talks to the provider trait.
    let (auth, login_prompts) = if config.use_mock_auth {
        let auth: Arc<dyn AuthProvider> = Arc::new(MockAuth::new());
        (auth, None)
    } else {
        let (prompt_tx, prompt_rx) = crossbeam_channel::unbounded();
        let auth: Arc<dyn AuthProvider> = Arc::new(DeviceCodeAuth::new(
            config.client_id.clone(),
            config.authority.clone(),
            prompt_tx,
        ));
        (auth, Some(prompt_rx))
    };

    let state = AppState::new(config, auth, login_prompts);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_title("Document Analyzer"),
        ..Default::default()
    };

    eframe::run_native(
        "Document Analyzer",
        options,
        Box::new(|_cc| Box::new(AnalyzerApp::new(state))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
