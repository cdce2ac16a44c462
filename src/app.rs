// src/app.rs
use eframe::egui;
use std::time::Duration;

use crate::state::AppState;
use crate::ui;

pub struct AnalyzerApp {
    state: AppState,
}

impl AnalyzerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for AnalyzerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_workers();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui::header::show_header(ui, &mut self.state);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.small("© 2025 Document Analyzer - Powered by Azure Functions, Cosmos DB & Azure OpenAI");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                if !self.state.auth.is_authenticated() {
                    ui::login::show_login_view(ui, &mut self.state);
                    return;
                }

                ui::uploader::show_uploader_view(ui, &mut self.state);

                if let Some(error) = self.state.error_message.clone() {
                    ui.add_space(8.0);
                    ui.group(|ui| {
                        ui.set_width(ui.available_width());
                        ui.strong("Error");
                        ui.colored_label(egui::Color32::RED, error);
                    });
                }

                // Results stay hidden while a new submission is in flight.
                if self.state.result.is_some() && !self.state.is_loading {
                    ui.add_space(8.0);
                    ui::results::show_results_view(ui, &mut self.state);
                }
            });
        });

        // Keep polling worker channels and animating the spinner while
        // background work is running.
        if self.state.is_loading || self.state.signing_in {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
